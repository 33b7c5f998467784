use std::io::{self, BufWriter, Write};

use crc32fast::Hasher;

/// Буферизующий sink, считающий CRC-32 (IEEE) и количество записанных байт.
///
/// Счётчик байт служит источником смещений для [`Writer`](crate::Writer).
pub struct HashWriter<W: Write> {
    inner: BufWriter<W>,
    hasher: Hasher,
    count: u64,
}

impl<W: Write> HashWriter<W> {
    /// Оборачивает `w` с буфером размера по умолчанию.
    pub fn new(w: W) -> Self {
        Self::with_capacity(crate::config::DEFAULT_WRITE_BUFFER_CAPACITY, w)
    }

    pub fn with_capacity(
        capacity: usize,
        w: W,
    ) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, w),
            hasher: Hasher::new(),
            count: 0,
        }
    }

    /// CRC-32 всех байт, прошедших через sink.
    pub fn crc32(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Количество записанных байт.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Переустанавливает счётчик (после seek нижележащего sink).
    /// Контрольная сумма при этом не сбрасывается.
    pub fn set_count(
        &mut self,
        count: u64,
    ) {
        self.count = count;
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut()
    }

    /// Сбрасывает буфер и возвращает нижележащий sink.
    pub fn into_inner(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> Write for HashWriter<W> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_checksums() {
        let mut h = HashWriter::new(Vec::new());
        h.write_all(b"1234").unwrap();
        h.write_all(b"56789").unwrap();
        assert_eq!(h.count(), 9);
        // эталонное значение CRC-32/IEEE для "123456789"
        assert_eq!(h.crc32(), 0xCBF4_3926);

        let out = h.into_inner().unwrap();
        assert_eq!(out, b"123456789");
    }

    #[test]
    fn test_buffering_until_flush() {
        let mut h = HashWriter::with_capacity(64, Vec::new());
        h.write_all(&[1, 2, 3]).unwrap();
        assert!(h.get_ref().is_empty());
        h.flush().unwrap();
        assert_eq!(h.get_ref(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_set_count_keeps_checksum() {
        let mut h = HashWriter::new(Vec::new());
        h.write_all(b"abc").unwrap();
        let crc = h.crc32();
        h.set_count(0);
        assert_eq!(h.count(), 0);
        assert_eq!(h.crc32(), crc);
    }

    #[test]
    fn test_empty_checksum() {
        let h = HashWriter::new(Vec::new());
        assert_eq!(h.crc32(), 0);
        assert_eq!(h.count(), 0);
    }
}
