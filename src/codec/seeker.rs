//! Буфер в памяти с контрактом `Read + Seek`, как у файла.
//!
//! Нужен [`Reader`](crate::Reader), когда источник — не файл: декодер varint
//! возвращает непрочитанные байты окна через `seek`.

use std::io::{self, Read, Seek, SeekFrom};

use cereal_error::CodecError;

#[derive(Debug, Clone, Default)]
pub struct ByteSeeker {
    buf: Vec<u8>,
    offset: u64,
}

impl ByteSeeker {
    pub fn new(buf: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: buf.into(),
            offset: 0,
        }
    }

    /// Текущая позиция чтения.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Сколько байт осталось до конца буфера.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset as usize)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Read for ByteSeeker {
    /// Копирует байты с текущей позиции; в конце буфера возвращает `Ok(0)`.
    fn read(
        &mut self,
        out: &mut [u8],
    ) -> io::Result<usize> {
        let from = self.offset as usize;
        if from >= self.buf.len() {
            return Ok(0);
        }

        let to = (from + out.len()).min(self.buf.len());
        let n = to - from;
        out[..n].copy_from_slice(&self.buf[from..to]);
        self.offset = to as u64;
        Ok(n)
    }
}

impl Seek for ByteSeeker {
    /// Позиционирует курсор.
    ///
    /// Допустимые позиции: `0..=len`. Отрицательная позиция даёт
    /// `InvalidSeek`, позиция за концом буфера — `EndOfData`. В случае
    /// ошибки позиция не меняется.
    fn seek(
        &mut self,
        pos: SeekFrom,
    ) -> io::Result<u64> {
        let len = self.buf.len() as i128;
        let target = match pos {
            SeekFrom::Start(off) => i128::from(off),
            SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => len + i128::from(delta),
        };

        if target < 0 {
            return Err(CodecError::InvalidSeek {
                reason: format!("invalid offset {target}"),
            }
            .into());
        }
        if target > len {
            return Err(CodecError::end_of_data(format!("seek to {target}"), self.offset).into());
        }

        self.offset = target as u64;
        Ok(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use cereal_error::StackError;

    use super::*;

    fn codec_err(e: io::Error) -> CodecError {
        let stack: StackError = e.into();
        stack.downcast_ref::<CodecError>().cloned().unwrap()
    }

    #[test]
    fn test_read_clips_to_buffer() {
        let mut s = ByteSeeker::new(vec![1, 2, 3]);
        let mut out = [0u8; 8];
        assert_eq!(s.read(&mut out).unwrap(), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(s.offset(), 3);

        // конец данных: ноль байт
        assert_eq!(s.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_read_clips_to_output() {
        let mut s = ByteSeeker::new(vec![1, 2, 3, 4]);
        let mut out = [0u8; 3];
        assert_eq!(s.read(&mut out).unwrap(), 3);
        assert_eq!(s.remaining(), 1);
        assert_eq!(s.read(&mut out).unwrap(), 1);
        assert_eq!(out[0], 4);
    }

    #[test]
    fn test_seek_whences() {
        let mut s = ByteSeeker::new(vec![0u8; 10]);
        assert_eq!(s.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(s.seek(SeekFrom::Current(3)).unwrap(), 7);
        assert_eq!(s.seek(SeekFrom::Current(-7)).unwrap(), 0);
        assert_eq!(s.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert_eq!(s.seek(SeekFrom::End(0)).unwrap(), 10);
    }

    #[test]
    fn test_seek_negative_is_invalid() {
        let mut s = ByteSeeker::new(vec![0u8; 4]);
        s.seek(SeekFrom::Start(2)).unwrap();
        let err = codec_err(s.seek(SeekFrom::Current(-3)).unwrap_err());
        assert!(matches!(err, CodecError::InvalidSeek { .. }));
        // позиция не изменилась
        assert_eq!(s.offset(), 2);
    }

    #[test]
    fn test_seek_past_end_is_end_of_data() {
        let mut s = ByteSeeker::new(vec![0u8; 4]);
        let err = codec_err(s.seek(SeekFrom::Start(5)).unwrap_err());
        assert!(err.is_end_of_data());
        assert_eq!(s.offset(), 0);
    }
}
