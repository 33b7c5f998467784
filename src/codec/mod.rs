//! Самоописывающий бинарный кодек записей.
//!
//! Запись на проводе: `[tag]? payload`. Поверх sink [`Writer`] дописывает
//! значения и возвращает их смещения, [`Reader`] читает их обратно по
//! тегам или с проверкой ожидаемого типа.

pub mod compression;
pub mod hasher;
pub mod numeric;
pub mod reader;
pub mod seeker;
pub mod types;
pub mod varint;
pub mod writer;

pub use compression::{
    compress_block, compress_stream, decompress_block, decompress_stream, BLOCK_HEADER_LEN,
    LZ4_BLOCK_SIZE,
};
pub use hasher::HashWriter;
pub use reader::{Reader, Records, MAX_NESTING_DEPTH};
pub use seeker::ByteSeeker;
pub use types::{DataType, Value};
pub use varint::{
    decode_uvarint, decode_varint, encode_uvarint, encode_varint, read_uvarint, read_varint,
    varint_size, write_uvarint, zigzag_decode, zigzag_encode, MAX_VARINT_LEN64,
};
pub use writer::{WriteInfo, Writer};
