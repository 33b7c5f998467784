//! Модуль для сжатия и распаковки данных с помощью LZ4 (`lz4_flex`).
//!
//! Два независимых формата:
//! - блочный: каждый фрагмент сжимается отдельно (без общего словаря) и
//!   предваряется длиной сжатого блока (u32 big-endian), поэтому блок
//!   самоограничен и декодируется независимо;
//! - потоковый: один LZ4 frame на весь оставшийся поток.
//!
//! Форматы не взаимозаменяемы.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};
use cereal_error::{CerealResult, CodecError, CompressionOp};
use lz4_flex::{
    block,
    frame::{FrameDecoder, FrameEncoder},
};

/// Размер несжатого фрагмента для блочного сжатия (64 KiB).
pub const LZ4_BLOCK_SIZE: usize = 64 << 10;

/// Длина заголовка сжатого блока (u32 BE).
pub const BLOCK_HEADER_LEN: usize = 4;

/// Сжимает `src` в `scratch` и возвращает кадр блока:
/// `[compressed_len: u32 BE][lz4 block]`.
///
/// `scratch` принадлежит вызывающему (обычно [`Writer`](crate::Writer)) и
/// переиспользуется между вызовами.
pub fn compress_block<'a>(
    src: &[u8],
    scratch: &'a mut Vec<u8>,
) -> CerealResult<&'a [u8]> {
    let bound = block::get_maximum_output_size(src.len());
    scratch.resize(BLOCK_HEADER_LEN + bound, 0);

    let n = block::compress_into(src, &mut scratch[BLOCK_HEADER_LEN..])
        .map_err(|e| CodecError::compression(CompressionOp::Compress, e.to_string()))?;
    BigEndian::write_u32(&mut scratch[..BLOCK_HEADER_LEN], n as u32);

    Ok(&scratch[..BLOCK_HEADER_LEN + n])
}

/// Читает длину сжатого блока из заголовка.
pub fn block_len(header: &[u8; BLOCK_HEADER_LEN]) -> usize {
    BigEndian::read_u32(header) as usize
}

/// Распаковывает тело блока (без заголовка) ровно в `dst`.
///
/// # Errors
/// `CompressionFailure`, если данные повреждены или размер распакованных
/// данных отличается от `dst.len()`.
pub fn decompress_block(
    compressed: &[u8],
    dst: &mut [u8],
) -> CerealResult<usize> {
    let n = block::decompress_into(compressed, dst)
        .map_err(|e| CodecError::compression(CompressionOp::Decompress, e.to_string()))?;
    if n != dst.len() {
        return Err(CodecError::compression(
            CompressionOp::Decompress,
            format!("block decompressed to {n} bytes, expected {}", dst.len()),
        )
        .into());
    }
    Ok(n)
}

/// Сжимает `src` целиком в один LZ4 frame.
pub fn compress_stream(src: &[u8]) -> CerealResult<Vec<u8>> {
    let mut encoder = FrameEncoder::new(Vec::new());
    encoder
        .write_all(src)
        .map_err(|e| CodecError::compression(CompressionOp::Compress, e.to_string()))?;
    let out = encoder
        .finish()
        .map_err(|e| CodecError::compression(CompressionOp::Compress, e.to_string()))?;
    Ok(out)
}

/// Распаковывает весь оставшийся поток `r` как LZ4 frame.
pub fn decompress_stream<R: Read>(r: R) -> CerealResult<Vec<u8>> {
    let mut decoder = FrameDecoder::new(r);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::compression(CompressionOp::Decompress, e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_block_roundtrip() {
        let data = sample(LZ4_BLOCK_SIZE);
        let mut scratch = Vec::new();
        let framed = compress_block(&data, &mut scratch).unwrap().to_vec();

        let header: [u8; BLOCK_HEADER_LEN] = framed[..BLOCK_HEADER_LEN].try_into().unwrap();
        assert_eq!(block_len(&header), framed.len() - BLOCK_HEADER_LEN);

        let mut out = vec![0u8; data.len()];
        let n = decompress_block(&framed[BLOCK_HEADER_LEN..], &mut out).unwrap();
        assert_eq!(n, data.len());
        assert_eq!(out, data);
    }

    #[test]
    fn test_scratch_is_reused() {
        let mut scratch = Vec::new();
        let first = compress_block(&sample(1000), &mut scratch).unwrap().len();
        let cap = scratch.capacity();
        let second = compress_block(&sample(10), &mut scratch).unwrap().len();
        assert!(second < first);
        assert_eq!(scratch.capacity(), cap);
    }

    #[test]
    fn test_decompress_size_mismatch() {
        let data = sample(100);
        let mut scratch = Vec::new();
        let framed = compress_block(&data, &mut scratch).unwrap().to_vec();

        let mut out = vec![0u8; 200];
        let err = decompress_block(&framed[BLOCK_HEADER_LEN..], &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::CompressionFailure { .. })
        ));
    }

    #[test]
    fn test_decompress_invalid_data() {
        let bad = vec![0xFFu8; 10];
        let mut out = vec![0u8; 64];
        let err = decompress_block(&bad, &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::CompressionFailure {
                operation: CompressionOp::Decompress,
                ..
            })
        ));
    }

    #[test]
    fn test_stream_roundtrip() {
        let data = sample(LZ4_BLOCK_SIZE * 3 + 17);
        let compressed = compress_stream(&data).unwrap();
        assert!(compressed.len() < data.len());
        let out = decompress_stream(compressed.as_slice()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_stream_rejects_garbage() {
        let err = decompress_stream(&b"definitely not lz4"[..]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::CompressionFailure { .. })
        ));
    }
}
