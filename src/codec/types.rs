//! Определение типов значений и тегов бинарного формата.
//!
//! Каждая запись помечается однобайтовым тегом [`DataType`].
//! Коды тегов фиксированы: новый тип добавляется в конец, существующие
//! коды никогда не перенумеровываются.

use std::{collections::HashMap, fmt};

use cereal_error::{CodecError, Offset};
use num_enum::TryFromPrimitive;

/// Закрытый набор типов значений с постоянными кодами на проводе.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum DataType {
    /// Подстановочный тип: используется только при чтении, на проводе не
    /// встречается.
    Any = 0x00,
    Boolean = 0x01,
    /// Знаковое целое (zigzag varint)
    Integer = 0x02,
    /// Беззнаковое целое (varint)
    UnsignedInteger = 0x03,
    /// f64, 8 байт big-endian
    Float = 0x04,
    Bytes = 0x05,
    String = 0x06,
    StringSlice = 0x07,
    /// Один сырой байт
    Byte = 0x08,
    KeyValueMap = 0x09,
}

impl DataType {
    /// Каноническое имя типа для сообщений об ошибках.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Boolean => "bool",
            Self::Integer => "int",
            Self::UnsignedInteger => "uint",
            Self::Float => "float",
            Self::Byte => "byte",
            Self::Bytes => "bytes",
            Self::String => "string",
            Self::StringSlice => "strings",
            Self::KeyValueMap => "kvmap",
        }
    }

    /// Код тега на проводе.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Разбирает байт тега. `Any` (0x00) на проводе недопустим.
    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match DataType::try_from(tag) {
            Ok(DataType::Any) | Err(_) => Err(CodecError::UnknownTag {
                tag,
                offset: Offset::UNKNOWN,
            }),
            Ok(ty) => Ok(ty),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Значение одного из поддерживаемых типов.
///
/// Набор вариантов закрыт: неизвестный тип значения не может быть передан
/// в [`Writer`](crate::Writer) на этапе компиляции.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Byte(u8),
    Bytes(Vec<u8>),
    String(String),
    StringSlice(Vec<String>),
    KeyValueMap(HashMap<String, Value>),
}

impl Value {
    /// Тип значения (тег, под которым оно будет записано).
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::UnsignedInteger(_) => DataType::UnsignedInteger,
            Value::Float(_) => DataType::Float,
            Value::Byte(_) => DataType::Byte,
            Value::Bytes(_) => DataType::Bytes,
            Value::String(_) => DataType::String,
            Value::StringSlice(_) => DataType::StringSlice,
            Value::KeyValueMap(_) => DataType::KeyValueMap,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UnsignedInteger(u) => Some(*u),
            _ => None,
        }
    }
}

/// Человекочитаемое представление (используется `cereal-cli dump`).
impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::UnsignedInteger(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Byte(b) => write!(f, "0x{b:02x}"),
            Value::Bytes(bytes) => {
                f.write_str("[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                f.write_str("]")
            }
            Value::String(s) => write!(f, "{s:?}"),
            Value::StringSlice(items) => write!(f, "{items:?}"),
            Value::KeyValueMap(map) => {
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {}", map[key])?;
                }
                f.write_str("}")
            }
        }
    }
}
