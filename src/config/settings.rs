use std::path::Path;

use cereal_error::{ensure, CerealResult, GenericError, StatusCode};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Ёмкость буфера checksum-sink по умолчанию.
pub const DEFAULT_WRITE_BUFFER_CAPACITY: usize = 4096;
/// Размер фрагмента для `write_compressed_block` по умолчанию (64 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 << 10;
/// Верхняя граница размера блока.
pub const MAX_BLOCK_SIZE: usize = 4 << 20;
/// Лимит декодируемого префикса длины (256 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u64 = 256 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub write_buffer_capacity: usize,
    pub block_size: usize,
    /// Максимальная длина/кол-во элементов в любом префиксе при чтении
    pub max_payload_len: u64,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            write_buffer_capacity: DEFAULT_WRITE_BUFFER_CAPACITY,
            block_size: DEFAULT_BLOCK_SIZE,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем TOML-файл (если
    /// указан), затем переменные окружения с префиксом `CEREAL_`
    /// (вложенные ключи через `__`, например `CEREAL_LOGGING__LEVEL`).
    pub fn load(path: Option<&Path>) -> CerealResult<Self> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            // Добавляем значения по умолчанию
            .set_default(
                "write_buffer_capacity",
                defaults.write_buffer_capacity as i64,
            )
            .and_then(|b| b.set_default("block_size", defaults.block_size as i64))
            .and_then(|b| b.set_default("max_payload_len", defaults.max_payload_len as i64))
            .and_then(|b| b.set_default("logging.level", defaults.logging.level.clone()))
            .and_then(|b| b.set_default("logging.format", defaults.logging.format.as_str()))
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        // Добавляем переменные окружения с префиксом CEREAL_
        let cfg = builder
            .add_source(
                Environment::with_prefix("CEREAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        let settings: Settings = cfg.try_deserialize().map_err(config_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> CerealResult<()> {
        ensure!(
            self.write_buffer_capacity > 0,
            StatusCode::InvalidArgs,
            "write_buffer_capacity must be positive"
        );
        ensure!(
            self.block_size > 0,
            StatusCode::InvalidArgs,
            "block_size must be positive"
        );
        ensure!(
            self.block_size <= MAX_BLOCK_SIZE,
            StatusCode::InvalidArgs,
            "block_size {} exceeds {}",
            self.block_size,
            MAX_BLOCK_SIZE
        );
        ensure!(
            self.max_payload_len > 0,
            StatusCode::InvalidArgs,
            "max_payload_len must be positive"
        );
        self.logging.validate()
    }
}

fn config_error(e: config::ConfigError) -> cereal_error::StackError {
    GenericError::new(StatusCode::ParseError, format!("Config error: {e}")).into()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_defaults_are_valid() {
        let s = Settings::default();
        assert_eq!(s.write_buffer_capacity, 4096);
        assert_eq!(s.block_size, 65536);
        assert_eq!(s.max_payload_len, 256 * 1024 * 1024);
        s.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        for s in [
            Settings {
                write_buffer_capacity: 0,
                ..Settings::default()
            },
            Settings {
                block_size: 0,
                ..Settings::default()
            },
            Settings {
                block_size: MAX_BLOCK_SIZE + 1,
                ..Settings::default()
            },
            Settings {
                max_payload_len: 0,
                ..Settings::default()
            },
        ] {
            let err = s.validate().unwrap_err();
            assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        }
    }

    #[test]
    #[serial]
    fn test_load_without_file() {
        let s = Settings::load(None).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "block_size = 1024\nmax_payload_len = 10\n[logging]\nformat = \"json\"\nlevel = \"debug\""
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.block_size, 1024);
        assert_eq!(s.max_payload_len, 10);
        assert_eq!(s.write_buffer_capacity, DEFAULT_WRITE_BUFFER_CAPACITY);
        assert_eq!(s.logging.format, LogFormat::Json);
        assert_eq!(s.logging.level, "debug");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "block_size = 1024").unwrap();

        std::env::set_var("CEREAL_BLOCK_SIZE", "2048");
        let result = Settings::load(Some(file.path()));
        std::env::remove_var("CEREAL_BLOCK_SIZE");

        assert_eq!(result.unwrap().block_size, 2048);
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "block_size = 0").unwrap();
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }
}
