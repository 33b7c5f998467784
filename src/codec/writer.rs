use std::{
    fs::File,
    io::{Seek, SeekFrom, Write},
    path::Path,
};

use cereal_error::{CerealResult, ResultExt};
use tracing::{debug, trace};

use super::{
    compression::{compress_block, compress_stream},
    hasher::HashWriter,
    types::Value,
    varint::{encode_uvarint, encode_varint, MAX_VARINT_LEN64},
};
use crate::config::Settings;

/// Положение записи в потоке, возвращаемое каждой операцией записи.
///
/// Из этих пар вызывающий код может построить внешний индекс смещений.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteInfo {
    /// Смещение первого байта записи
    pub offset: u64,
    /// Количество записанных байт
    pub length: u64,
}

/// Кодировщик записей: тег (опционально) + payload.
///
/// После каждой операции буфер сбрасывается в sink, поэтому возвращённые
/// смещения сразу видны читателю того же файла.
pub struct Writer<W: Write> {
    sink: HashWriter<W>,
    varint_buf: [u8; MAX_VARINT_LEN64],
    compress_buf: Vec<u8>,
    block_size: usize,
}

impl Writer<Vec<u8>> {
    /// Writer поверх растущего буфера в памяти.
    pub fn from_buffer() -> Self {
        Self::new(Vec::new())
    }
}

impl Writer<File> {
    /// Создаёт (или перезаписывает) файл и открывает Writer поверх него.
    pub fn create<P: AsRef<Path>>(path: P) -> CerealResult<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W) -> Self {
        Self::with_settings(sink, &Settings::default())
    }

    pub fn with_settings(
        sink: W,
        settings: &Settings,
    ) -> Self {
        Self {
            sink: HashWriter::with_capacity(settings.write_buffer_capacity, sink),
            varint_buf: [0; MAX_VARINT_LEN64],
            compress_buf: Vec::new(),
            block_size: settings.block_size.max(1),
        }
    }

    /// Записывает значение с тегом.
    pub fn write(
        &mut self,
        value: &Value,
    ) -> CerealResult<WriteInfo> {
        self.write_tagged(value, true)
    }

    /// Записывает значение; `include_tag = false` опускает байт тега
    /// (так пишутся ключи `KeyValueMap`).
    pub fn write_tagged(
        &mut self,
        value: &Value,
        include_tag: bool,
    ) -> CerealResult<WriteInfo> {
        let offset = self.offset();
        self.encode_record(value, include_tag)?;
        self.flush()?;

        let info = WriteInfo {
            offset,
            length: self.offset() - offset,
        };
        trace!(
            ty = %value.data_type(),
            offset = info.offset,
            length = info.length,
            include_tag,
            "record written"
        );
        Ok(info)
    }

    /// Дописывает байты без тега и интерпретации. Возвращает смещение до
    /// записи.
    pub fn write_raw(
        &mut self,
        bytes: &[u8],
    ) -> CerealResult<u64> {
        let offset = self.offset();
        self.put(bytes)?;
        self.flush()?;
        Ok(offset)
    }

    pub fn write_raw_byte(
        &mut self,
        byte: u8,
    ) -> CerealResult<u64> {
        self.write_raw(&[byte])
    }

    /// Режет `data` на фрагменты по `block_size` байт и пишет каждый как
    /// независимо сжатый блок.
    pub fn write_compressed_block(
        &mut self,
        data: &[u8],
    ) -> CerealResult<WriteInfo> {
        let offset = self.offset();
        let mut blocks = 0usize;

        for chunk in data.chunks(self.block_size) {
            let framed = compress_block(chunk, &mut self.compress_buf)?;
            self.sink
                .write_all(framed)
                .context("Failed to write compressed block")?;
            blocks += 1;
        }
        self.flush()?;

        let info = WriteInfo {
            offset,
            length: self.offset() - offset,
        };
        debug!(
            input = data.len(),
            blocks,
            compressed = info.length,
            "compressed blocks written"
        );
        Ok(info)
    }

    /// Сжимает `data` одним LZ4 frame (пара для
    /// [`Reader::decompress_to_file`](crate::Reader::decompress_to_file)).
    pub fn write_compressed_stream(
        &mut self,
        data: &[u8],
    ) -> CerealResult<WriteInfo> {
        let offset = self.offset();
        let compressed = compress_stream(data)?;
        self.put(&compressed)?;
        self.flush()?;

        debug!(
            input = data.len(),
            compressed = compressed.len(),
            "compressed stream written"
        );
        Ok(WriteInfo {
            offset,
            length: compressed.len() as u64,
        })
    }

    /// Текущая позиция записи: всего байт, прошедших через этот Writer
    /// (или позиция после последнего `seek`).
    pub fn offset(&self) -> u64 {
        self.sink.count()
    }

    /// CRC-32 всех записанных байт.
    pub fn crc32(&self) -> u32 {
        self.sink.crc32()
    }

    pub fn get_ref(&self) -> &W {
        self.sink.get_ref()
    }

    /// Сбрасывает буфер и возвращает sink.
    pub fn into_inner(self) -> CerealResult<W> {
        self.sink
            .into_inner()
            .context("Failed to flush writer")
    }

    /// Сбрасывает буфер и освобождает sink (для файла закрывает дескриптор).
    pub fn close(self) -> CerealResult<()> {
        let sink = self.into_inner()?;
        drop(sink);
        Ok(())
    }

    fn encode_record(
        &mut self,
        value: &Value,
        include_tag: bool,
    ) -> CerealResult<()> {
        if include_tag {
            self.put(&[value.data_type().tag()])?;
        }

        match value {
            Value::Boolean(b) => self.put(&[u8::from(*b)]),
            Value::Integer(n) => {
                let len = encode_varint(&mut self.varint_buf, *n);
                self.sink
                    .write_all(&self.varint_buf[..len])
                    .context("Failed to write varint")
            }
            Value::UnsignedInteger(n) => self.put_uvarint(*n),
            Value::Float(f) => self.put(&f.to_be_bytes()),
            Value::Byte(b) => self.put(&[*b]),
            Value::Bytes(bytes) => self.put_len_prefixed(bytes),
            Value::String(s) => self.put_len_prefixed(s.as_bytes()),
            Value::StringSlice(items) => {
                self.put_uvarint(items.len() as u64)?;
                for s in items {
                    self.put_len_prefixed(s.as_bytes())?;
                }
                Ok(())
            }
            Value::KeyValueMap(map) => {
                self.put_uvarint(map.len() as u64)?;
                // ключи сортируются: одинаковые карты дают одинаковые байты
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                for (key, val) in entries {
                    self.put_len_prefixed(key.as_bytes())?;
                    self.encode_record(val, true)?;
                }
                Ok(())
            }
        }
    }

    fn put(
        &mut self,
        bytes: &[u8],
    ) -> CerealResult<()> {
        self.sink
            .write_all(bytes)
            .context("Failed to write to sink")
    }

    fn put_uvarint(
        &mut self,
        value: u64,
    ) -> CerealResult<()> {
        let len = encode_uvarint(&mut self.varint_buf, value);
        self.sink
            .write_all(&self.varint_buf[..len])
            .context("Failed to write varint")
    }

    fn put_len_prefixed(
        &mut self,
        bytes: &[u8],
    ) -> CerealResult<()> {
        self.put_uvarint(bytes.len() as u64)?;
        self.put(bytes)
    }

    fn flush(&mut self) -> CerealResult<()> {
        self.sink.flush().context("Failed to flush writer")
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Перемещает позицию записи в sink и выставляет `offset()` равным
    /// `offset`. Контрольная сумма продолжает накапливаться.
    pub fn seek(
        &mut self,
        offset: u64,
    ) -> CerealResult<u64> {
        self.flush()?;
        let pos = self
            .sink
            .get_mut()
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("Failed to seek writer to {offset}"))?;
        self.sink.set_count(pos);
        debug!(offset = pos, "writer repositioned");
        Ok(pos)
    }
}
