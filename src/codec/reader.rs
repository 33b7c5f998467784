use std::{
    collections::HashMap,
    fs,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use cereal_error::{CerealResult, CodecError, Offset, ResultExt, StackError};
use tracing::{debug, trace, warn};

use super::{
    compression::{block_len, decompress_block, decompress_stream, BLOCK_HEADER_LEN},
    seeker::ByteSeeker,
    types::{DataType, Value},
    varint::{read_uvarint, read_varint},
};
use crate::config::Settings;

/// Декодер записей, зеркальный к [`Writer`](crate::Writer).
///
/// Источник обязан поддерживать `Seek`: декодер varint возвращает лишние
/// байты окна, а при несовпадении типа Reader откатывается на байт тега.
pub struct Reader<R: Read + Seek> {
    src: R,
    max_payload_len: u64,
    block_buf: Vec<u8>,
    depth: usize,
}

/// Максимальная вложенность `KeyValueMap` при чтении.
pub const MAX_NESTING_DEPTH: u64 = 64;

impl Reader<ByteSeeker> {
    /// Reader поверх байт в памяти.
    pub fn from_buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(ByteSeeker::new(bytes))
    }
}

impl Reader<fs::File> {
    pub fn open<P: AsRef<Path>>(path: P) -> CerealResult<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Seek> Reader<R> {
    pub fn new(src: R) -> Self {
        Self::with_settings(src, &Settings::default())
    }

    pub fn with_settings(
        src: R,
        settings: &Settings,
    ) -> Self {
        Self {
            src,
            max_payload_len: settings.max_payload_len,
            block_buf: Vec::new(),
            depth: 0,
        }
    }

    /// Читает тег и значение.
    ///
    /// Если `expected` не [`DataType::Any`] и тег на проводе другой,
    /// возвращает `TypeMismatch`; позиция остаётся на начале записи.
    pub fn read(
        &mut self,
        expected: DataType,
    ) -> CerealResult<(Value, DataType)> {
        let offset = self.position()?;

        let mut tag = [0u8; 1];
        self.fill(&mut tag, "tag", offset)?;

        let ty = DataType::from_tag(tag[0]).map_err(|e| {
            warn!(tag = tag[0], offset, "unknown tag");
            e.with_offset(offset)
        })?;

        if expected != DataType::Any && expected != ty {
            self.src
                .seek(SeekFrom::Start(offset))
                .context("Failed to rewind over tag")?;
            warn!(wanted = %expected, got = %ty, offset, "type mismatch");
            return Err(CodecError::TypeMismatch {
                wanted: expected.name(),
                got: ty.name(),
                offset: offset.into(),
            }
            .into());
        }

        let decoded = self.read_given_type(ty)?;
        trace!(ty = %ty, offset, "record read");
        Ok(decoded)
    }

    /// Декодирует payload заданного типа без чтения тега.
    pub fn read_given_type(
        &mut self,
        ty: DataType,
    ) -> CerealResult<(Value, DataType)> {
        let offset = self.position()?;

        let value = match ty {
            DataType::Any => {
                return Err(CodecError::UnknownTag {
                    tag: DataType::Any.tag(),
                    offset: offset.into(),
                }
                .into())
            }
            DataType::Boolean => {
                let mut b = [0u8; 1];
                self.fill(&mut b, "bool", offset)?;
                Value::Boolean(b[0] != 0)
            }
            DataType::Integer => Value::Integer(at_offset(read_varint(&mut self.src), offset)?),
            DataType::UnsignedInteger => {
                Value::UnsignedInteger(at_offset(read_uvarint(&mut self.src), offset)?)
            }
            DataType::Float => {
                let mut b = [0u8; 8];
                self.fill(&mut b, "float", offset)?;
                Value::Float(f64::from_be_bytes(b))
            }
            DataType::Byte => {
                let mut b = [0u8; 1];
                self.fill(&mut b, "byte", offset)?;
                Value::Byte(b[0])
            }
            DataType::Bytes => Value::Bytes(self.read_len_prefixed("bytes")?),
            DataType::String => Value::String(self.read_string()?),
            DataType::StringSlice => {
                let count = self.read_len("strings")?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.read_string()?);
                }
                Value::StringSlice(items)
            }
            DataType::KeyValueMap => {
                let depth = self.depth as u64 + 1;
                self.check_limit("kvmap nesting", depth, MAX_NESTING_DEPTH, offset)?;
                self.depth += 1;
                let map = self.read_map();
                self.depth -= 1;
                Value::KeyValueMap(map?)
            }
        };

        Ok((value, ty))
    }

    /// Читает байты без интерпретации; возвращает, сколько прочитано.
    pub fn read_raw(
        &mut self,
        buf: &mut [u8],
    ) -> CerealResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.src.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read raw bytes"),
            }
        }
        Ok(filled)
    }

    /// Читает один сжатый блок и распаковывает его в `out`.
    ///
    /// `out` должен иметь размер исходного фрагмента.
    pub fn read_compressed_block(
        &mut self,
        out: &mut [u8],
    ) -> CerealResult<usize> {
        let offset = self.position()?;

        let mut header = [0u8; BLOCK_HEADER_LEN];
        self.fill(&mut header, "compressed block header", offset)?;
        let len = block_len(&header);
        self.check_len("compressed block", len as u64, offset)?;

        let mut body = std::mem::take(&mut self.block_buf);
        body.resize(len, 0);
        let filled = self.fill(&mut body, "compressed block", offset);
        let result = filled.and_then(|_| decompress_block(&body, out));
        self.block_buf = body;

        let n = result.map_err(|e| e.context(format!("block at offset {offset}")))?;
        debug!(offset, compressed = len, decompressed = n, "block decompressed");
        Ok(n)
    }

    /// Распаковывает весь остаток источника как один LZ4-поток и пишет
    /// результат в `path` (файл перезаписывается).
    pub fn decompress_to_file<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> CerealResult<u64> {
        let path = path.as_ref();
        let data = decompress_stream(&mut self.src)?;
        fs::write(path, &data)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(path = %path.display(), bytes = data.len(), "stream decompressed");
        Ok(data.len() as u64)
    }

    /// Текущая позиция чтения.
    pub fn position(&mut self) -> CerealResult<u64> {
        self.src
            .stream_position()
            .context("Failed to query reader position")
    }

    /// Позиционирует источник, например по смещению из
    /// [`WriteInfo`](crate::WriteInfo).
    pub fn seek(
        &mut self,
        pos: SeekFrom,
    ) -> CerealResult<u64> {
        let at = self.src.seek(pos).context("Failed to seek reader")?;
        debug!(offset = at, "reader repositioned");
        Ok(at)
    }

    pub fn into_inner(self) -> R {
        self.src
    }

    /// Итератор по записям до конца данных.
    ///
    /// Каждый элемент: `(offset, value, type)`. Конец данных на границе
    /// записи завершает итерацию; любая другая ошибка отдаётся один раз,
    /// после чего итератор останавливается.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            reader: self,
            done: false,
        }
    }

    fn fill(
        &mut self,
        buf: &mut [u8],
        what: &str,
        offset: u64,
    ) -> CerealResult<()> {
        match self.src.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(CodecError::end_of_data(what, offset).into())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {what}")),
        }
    }

    fn read_len(
        &mut self,
        what: &'static str,
    ) -> CerealResult<usize> {
        let offset = self.position()?;
        let len = at_offset(read_uvarint(&mut self.src), offset)?;
        self.check_len(what, len, offset)?;
        Ok(len as usize)
    }

    fn read_len_prefixed(
        &mut self,
        what: &'static str,
    ) -> CerealResult<Vec<u8>> {
        let len = self.read_len(what)?;
        let offset = self.position()?;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf, what, offset)?;
        Ok(buf)
    }

    fn read_map(&mut self) -> CerealResult<HashMap<String, Value>> {
        let count = self.read_len("kvmap")?;
        let mut map = HashMap::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.read_string()?;
            let (value, _) = self.read(DataType::Any)?;
            // при повторе ключа побеждает последнее значение
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_string(&mut self) -> CerealResult<String> {
        let bytes = self.read_len_prefixed("string")?;
        Ok(String::from_utf8(bytes)?)
    }

    fn check_len(
        &self,
        what: &'static str,
        size: u64,
        offset: u64,
    ) -> CerealResult<()> {
        self.check_limit(what, size, self.max_payload_len, offset)
    }

    fn check_limit(
        &self,
        what: &'static str,
        size: u64,
        limit: u64,
        offset: u64,
    ) -> CerealResult<()> {
        if size > limit {
            return Err(CodecError::SizeLimit {
                what,
                size,
                limit,
                offset: Offset::from(offset),
            }
            .into());
        }
        Ok(())
    }
}

/// Итератор, возвращаемый [`Reader::records`].
pub struct Records<'a, R: Read + Seek> {
    reader: &'a mut Reader<R>,
    done: bool,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = CerealResult<(u64, Value, DataType)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = match self.reader.position() {
            Ok(o) => o,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match self.reader.read(DataType::Any) {
            Ok((value, ty)) => Some(Ok((offset, value, ty))),
            Err(e) => {
                self.done = true;
                match e.downcast_ref::<CodecError>() {
                    Some(CodecError::EndOfData {
                        offset: Offset(Some(at)),
                        ..
                    }) if *at == offset => None,
                    _ => Some(Err(e)),
                }
            }
        }
    }
}

/// Проставляет смещение в ошибку кодека, если его там ещё нет.
fn at_offset<T>(
    result: CerealResult<T>,
    offset: u64,
) -> CerealResult<T> {
    result.map_err(|e| match e.downcast_ref::<CodecError>() {
        Some(codec) if codec_offset(codec).is_none() => {
            StackError::new(codec.clone().with_offset(offset))
        }
        _ => e,
    })
}

fn codec_offset(err: &CodecError) -> Option<u64> {
    match err {
        CodecError::TypeMismatch { offset, .. }
        | CodecError::UnknownTag { offset, .. }
        | CodecError::VarintOverflow { offset }
        | CodecError::BufferTooSmall { offset, .. }
        | CodecError::EndOfData { offset, .. }
        | CodecError::SizeLimit { offset, .. } => offset.get(),
        CodecError::InvalidSeek { .. } | CodecError::CompressionFailure { .. } => None,
    }
}
