use std::{any::Any, fmt};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Позиция в потоке, к которой относится ошибка (если известна).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset(pub Option<u64>);

impl Offset {
    pub const UNKNOWN: Offset = Offset(None);

    pub fn get(self) -> Option<u64> {
        self.0
    }
}

impl From<u64> for Offset {
    fn from(v: u64) -> Self {
        Offset(Some(v))
    }
}

impl From<Option<u64>> for Offset {
    fn from(v: Option<u64>) -> Self {
        Offset(v)
    }
}

impl fmt::Display for Offset {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.0 {
            Some(o) => write!(f, " [offset: 0x{o:X}]"),
            None => Ok(()),
        }
    }
}

/// Тип операции сжатия для контекста ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOp {
    Compress,
    Decompress,
}

impl fmt::Display for CompressionOp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Compress => write!(f, "Compression"),
            Self::Decompress => write!(f, "Decompression"),
        }
    }
}

/// Ошибки кодирования и декодирования потока записей.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Тег на проводе не совпадает с ожидаемым типом
    #[error("Expected data type mismatch: wanted '{wanted}', got '{got}'{offset}")]
    TypeMismatch {
        wanted: &'static str,
        got: &'static str,
        offset: Offset,
    },

    /// Байт тега вне закрытого набора типов
    #[error("Unknown tag 0x{tag:02X}{offset}")]
    UnknownTag { tag: u8, offset: Offset },

    /// Значение varint не помещается в целевую разрядность
    #[error("Varint overflow{offset}")]
    VarintOverflow { offset: Offset },

    /// В окне чтения нет завершающего байта varint
    #[error("Buffer too small: no varint terminator in {read} bytes{offset}")]
    BufferTooSmall { read: usize, offset: Offset },

    /// Недопустимое смещение или режим позиционирования
    #[error("Invalid seek: {reason}")]
    InvalidSeek { reason: String },

    /// Чтение или позиционирование за пределами данных
    #[error("End of data: {context}{offset}")]
    EndOfData { context: String, offset: Offset },

    /// Ошибка сжатия/распаковки
    #[error("{operation} error: {reason}")]
    CompressionFailure {
        operation: CompressionOp,
        reason: String,
    },

    /// Префикс длины превышает настроенный лимит
    #[error("{what} size {size} exceeds limit {limit}{offset}")]
    SizeLimit {
        what: &'static str,
        size: u64,
        limit: u64,
        offset: Offset,
    },
}

impl CodecError {
    /// Конструктор для `EndOfData`.
    pub fn end_of_data(
        context: impl Into<String>,
        offset: impl Into<Offset>,
    ) -> Self {
        Self::EndOfData {
            context: context.into(),
            offset: offset.into(),
        }
    }

    /// Конструктор для `CompressionFailure`.
    pub fn compression(
        operation: CompressionOp,
        reason: impl Into<String>,
    ) -> Self {
        Self::CompressionFailure {
            operation,
            reason: reason.into(),
        }
    }

    /// Добавляет контекст offset к ошибке.
    pub fn with_offset(
        mut self,
        at: u64,
    ) -> Self {
        match &mut self {
            Self::TypeMismatch { offset, .. }
            | Self::UnknownTag { offset, .. }
            | Self::VarintOverflow { offset }
            | Self::BufferTooSmall { offset, .. }
            | Self::EndOfData { offset, .. }
            | Self::SizeLimit { offset, .. } => {
                *offset = Offset(Some(at));
            }
            Self::InvalidSeek { .. } | Self::CompressionFailure { .. } => {}
        }
        self
    }

    /// Является ли ошибка концом данных (нормальное завершение потока).
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::EndOfData { .. })
    }
}

impl ErrorExt for CodecError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TypeMismatch { .. } => StatusCode::TypeError,
            Self::UnknownTag { .. } => StatusCode::InvalidTag,
            Self::VarintOverflow { .. } | Self::BufferTooSmall { .. } => {
                StatusCode::InvalidInteger
            }
            Self::InvalidSeek { .. } => StatusCode::InvalidSeek,
            Self::EndOfData { .. } => StatusCode::UnexpectedEof,
            Self::CompressionFailure { .. } => StatusCode::CompressionFailed,
            Self::SizeLimit { .. } => StatusCode::SizeLimit,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// Конверсия в std::io::Error для реализаций Read/Seek
impl From<CodecError> for std::io::Error {
    fn from(e: CodecError) -> Self {
        let kind = match &e {
            CodecError::EndOfData { .. } => std::io::ErrorKind::UnexpectedEof,
            CodecError::InvalidSeek { .. } => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::InvalidData,
        };

        std::io::Error::new(kind, e)
    }
}
