//! Variable-length integer encoding (LEB128-style) с zigzag для знаковых.
//!
//! Экономит место для маленьких чисел:
//! - 0-127: 1 байт
//! - 128-16383: 2 байта
//! - 16384-2097151: 3 байта
//! - до u64::MAX: 10 байт максимум
//!
//! Чтение выполняется окном фиксированного размера [`MAX_VARINT_LEN64`]:
//! источник может отдать больше байт, чем занимает значение, поэтому
//! непрочитанный хвост окна возвращается обратно через `Seek`.

use std::io::{Read, Seek, SeekFrom, Write};

use cereal_error::{CerealResult, CodecError, Offset, ResultExt};

/// Максимальное кол-во байт для u64 в varint encoding (10 байт)
pub const MAX_VARINT_LEN64: usize = 10;

/// Zigzag: `n >= 0 -> 2n`, `n < 0 -> -2n - 1`.
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Кодирует `value` в `buf` и возвращает кол-во записанных байт.
///
/// `buf` должен вмещать не меньше [`MAX_VARINT_LEN64`] байт.
pub fn encode_uvarint(
    buf: &mut [u8],
    mut value: u64,
) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Кодирует знаковое значение через zigzag.
pub fn encode_varint(
    buf: &mut [u8],
    value: i64,
) -> usize {
    encode_uvarint(buf, zigzag_encode(value))
}

/// Декодирует varint из начала `buf`.
///
/// Возвращает значение и кол-во прочитанных байт.
///
/// # Errors
/// - `BufferTooSmall` если в `buf` нет завершающего байта, а сам `buf`
///   короче [`MAX_VARINT_LEN64`];
/// - `VarintOverflow` если значение не помещается в 64 бита.
pub fn decode_uvarint(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN64 {
            return Err(CodecError::VarintOverflow {
                offset: Offset::UNKNOWN,
            });
        }
        if byte < 0x80 {
            // 10-й байт может нести только старший бит u64
            if i == MAX_VARINT_LEN64 - 1 && byte > 1 {
                return Err(CodecError::VarintOverflow {
                    offset: Offset::UNKNOWN,
                });
            }
            return Ok((result | (u64::from(byte) << shift), i + 1));
        }
        result |= u64::from(byte & 0x7F) << shift;
        shift += 7;
    }

    if buf.len() >= MAX_VARINT_LEN64 {
        return Err(CodecError::VarintOverflow {
            offset: Offset::UNKNOWN,
        });
    }
    Err(CodecError::BufferTooSmall {
        read: buf.len(),
        offset: Offset::UNKNOWN,
    })
}

/// Декодирует знаковый (zigzag) varint из начала `buf`.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize), CodecError> {
    let (ux, n) = decode_uvarint(buf)?;
    Ok((zigzag_decode(ux), n))
}

/// Вычисляет размер varint для числа (без записи).
pub fn varint_size(mut value: u64) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Записывает u64 в varint формате, возвращает кол-во байт.
pub fn write_uvarint<W: Write>(
    w: &mut W,
    value: u64,
) -> CerealResult<usize> {
    let mut buf = [0u8; MAX_VARINT_LEN64];
    let n = encode_uvarint(&mut buf, value);
    w.write_all(&buf[..n])
        .context("Failed to write varint")?;
    Ok(n)
}

/// Читает u64 из varint формата окном фиксированного размера.
///
/// После декодирования лишние байты окна возвращаются назад, так что
/// следующее значение начинается ровно за varint.
pub fn read_uvarint<R: Read + Seek>(r: &mut R) -> CerealResult<u64> {
    let mut window = [0u8; MAX_VARINT_LEN64];
    let n = read_window(r, &mut window)?;
    if n == 0 {
        return Err(CodecError::end_of_data("varint", Offset::UNKNOWN).into());
    }

    let (value, used) = decode_uvarint(&window[..n])?;
    rewind(r, n - used)?;
    Ok(value)
}

/// Читает знаковый (zigzag) varint, см. [`read_uvarint`].
pub fn read_varint<R: Read + Seek>(r: &mut R) -> CerealResult<i64> {
    read_uvarint(r).map(zigzag_decode)
}

/// Заполняет окно, пока источник отдаёт данные.
fn read_window<R: Read>(
    r: &mut R,
    window: &mut [u8],
) -> CerealResult<usize> {
    let mut filled = 0;
    while filled < window.len() {
        match r.read(&mut window[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read varint window"),
        }
    }
    Ok(filled)
}

fn rewind<S: Seek>(
    s: &mut S,
    unread: usize,
) -> CerealResult<()> {
    if unread > 0 {
        s.seek(SeekFrom::Current(-(unread as i64)))
            .context("Failed to rewind after varint")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut buf = [0u8; MAX_VARINT_LEN64];
        let n = encode_uvarint(&mut buf, value);
        buf[..n].to_vec()
    }

    #[test]
    fn test_zigzag_mapping() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(-4), 7);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);

        for n in [0, 1, -1, 63, -64, i64::MIN, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(n)), n);
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(123123), vec![0xF3, 0xC1, 0x07]);

        let mut buf = [0u8; MAX_VARINT_LEN64];
        let n = encode_varint(&mut buf, 123123);
        assert_eq!(&buf[..n], &[0xE6, 0x83, 0x0F]);

        let n = encode_varint(&mut buf, 87);
        assert_eq!(&buf[..n], &[0xAE, 0x01]);
    }

    #[test]
    fn test_varint_size_boundaries() {
        // k байт вмещают 7k бит
        for k in 1..MAX_VARINT_LEN64 {
            let max = (1u64 << (7 * k)) - 1;
            assert_eq!(varint_size(max), k, "max for {k} bytes");
            assert_eq!(varint_size(max + 1), k + 1, "min for {} bytes", k + 1);
            assert_eq!(encode(max).len(), k);
        }
        assert_eq!(varint_size(u64::MAX), MAX_VARINT_LEN64);
    }

    #[test]
    fn test_decode_rejects_overflow() {
        // 10-й байт со значением > 1
        let mut bad = vec![0xFF; 9];
        bad.push(0x02);
        assert!(matches!(
            decode_uvarint(&bad),
            Err(CodecError::VarintOverflow { .. })
        ));

        // 11 байт с continuation-битом
        let bad = vec![0x80; 11];
        assert!(matches!(
            decode_uvarint(&bad),
            Err(CodecError::VarintOverflow { .. })
        ));
    }

    #[test]
    fn test_decode_incomplete_is_buffer_too_small() {
        for case in [vec![], vec![0x80], vec![0x80, 0x80, 0x80]] {
            let err = decode_uvarint(&case).unwrap_err();
            assert!(
                matches!(err, CodecError::BufferTooSmall { read, .. } if read == case.len()),
                "got {err:?}"
            );
        }
    }

    #[test]
    fn test_read_rewinds_unused_window() {
        // varint(300) + лишний байт 0x42
        let mut cursor = Cursor::new(vec![0xAC, 0x02, 0x42]);
        assert_eq!(read_uvarint(&mut cursor).unwrap(), 300);
        assert_eq!(cursor.position(), 2);

        let mut next = [0u8; 1];
        cursor.read_exact(&mut next).unwrap();
        assert_eq!(next[0], 0x42);
    }

    #[test]
    fn test_read_consecutive_values() {
        let mut data = Vec::new();
        for v in [0u64, 1, 127, 128, 16384, u64::MAX, 5] {
            write_uvarint(&mut data, v).unwrap();
        }
        let mut cursor = Cursor::new(data);
        for v in [0u64, 1, 127, 128, 16384, u64::MAX, 5] {
            assert_eq!(read_uvarint(&mut cursor).unwrap(), v);
        }
    }

    #[test]
    fn test_read_signed() {
        let mut buf = [0u8; MAX_VARINT_LEN64];
        let n = encode_varint(&mut buf, -4);
        let mut data = buf[..n].to_vec();
        data.push(0x01);

        let mut cursor = Cursor::new(data);
        assert_eq!(read_varint(&mut cursor).unwrap(), -4);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_read_empty_is_end_of_data() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_uvarint(&mut cursor).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::EndOfData { .. })
        ));
    }
}
