//! CLI для файлов в формате cereal.
//!
//! Просмотр потока записей, сжатие и распаковка целых файлов (LZ4 frame),
//! подсчёт CRC-32.

use std::{
    fs,
    io::{self, BufReader},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use cereal::{logging::LogFormat, HashWriter, Reader, Settings, StackError, Writer};
use cereal_error::LogLevel;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, trace, warn};

/// Основная структура CLI аргументов
#[derive(Parser)]
#[command(name = "cereal-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect, compress and checksum cereal record streams", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML-файл настроек (переменные CEREAL_* имеют приоритет)
    #[arg(short, long, global = true, env = "CEREAL_CONFIG")]
    config: Option<PathBuf>,
    /// Формат логов: pretty, compact или json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

/// Подкоманды CLI
#[derive(Subcommand)]
enum Commands {
    /// Декодировать и напечатать все записи файла
    Dump {
        file: PathBuf,
    },
    /// Сжать файл целиком одним LZ4-потоком
    Compress {
        input: PathBuf,
        output: PathBuf,
    },
    /// Распаковать файл, сжатый командой `compress`
    Decompress {
        input: PathBuf,
        output: PathBuf,
    },
    /// Напечатать размер и CRC-32 файла
    Checksum {
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = cereal::logging::init_logging(&settings.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&cli.command, &settings) {
        Ok(()) => {
            debug!("Команда выполнена успешно");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    Ok(settings)
}

fn run(
    command: &Commands,
    settings: &Settings,
) -> Result<()> {
    match command {
        Commands::Dump { file } => dump(file, settings),
        Commands::Compress { input, output } => compress(input, output, settings),
        Commands::Decompress { input, output } => decompress(input, output, settings),
        Commands::Checksum { file } => checksum(file),
    }
}

fn dump(
    file: &Path,
    settings: &Settings,
) -> Result<()> {
    let handle = open(file)?;
    let mut reader = Reader::with_settings(BufReader::new(handle), settings);

    let mut count = 0usize;
    for record in reader.records() {
        let (offset, value, ty) =
            record.with_context(|| format!("Failed to decode {}", file.display()))?;
        println!("{offset:#010x}  {:<8} {value}", ty.name());
        count += 1;
    }

    info!(file = %file.display(), records = count, "dump finished");
    Ok(())
}

fn compress(
    input: &Path,
    output: &Path,
    settings: &Settings,
) -> Result<()> {
    let data =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let out = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = Writer::with_settings(out, settings);
    let written = writer.write_compressed_stream(&data)?;
    let crc = writer.crc32();
    writer.close()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        original = data.len(),
        compressed = written.length,
        "file compressed"
    );
    println!(
        "{} -> {} bytes (crc32 {crc:08x})",
        data.len(),
        written.length
    );
    Ok(())
}

fn decompress(
    input: &Path,
    output: &Path,
    settings: &Settings,
) -> Result<()> {
    let handle = open(input)?;
    let mut reader = Reader::with_settings(BufReader::new(handle), settings);
    let n = reader
        .decompress_to_file(output)
        .with_context(|| format!("Failed to decompress {}", input.display()))?;

    info!(input = %input.display(), output = %output.display(), bytes = n, "file decompressed");
    println!("{n} bytes written to {}", output.display());
    Ok(())
}

fn checksum(file: &Path) -> Result<()> {
    let mut handle = open(file)?;
    let mut sink = HashWriter::new(io::sink());
    io::copy(&mut handle, &mut sink)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    trace!(file = %file.display(), "checksum computed");
    println!("{}  {} bytes  crc32 {:08x}", file.display(), sink.count(), sink.crc32());
    Ok(())
}

fn open(path: &Path) -> Result<fs::File> {
    fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Логирует ошибку на уровне, который задаёт её `StatusCode`.
fn report(e: &anyhow::Error) {
    let Some(stack) = e.chain().find_map(|cause| cause.downcast_ref::<StackError>()) else {
        error!(error = %e, "command failed");
        return;
    };

    let code = stack.status_code();
    match stack.log_level() {
        LogLevel::Error => error!(%code, error = %stack, "command failed"),
        LogLevel::Warn => warn!(%code, error = %stack, "command failed"),
        LogLevel::Info => info!(%code, error = %stack, "command failed"),
        LogLevel::Debug => debug!(%code, error = %stack, "command failed"),
        LogLevel::Trace => trace!(%code, error = %stack, "command failed"),
    }
}
