use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrimitiveError;
use crate::value::PrimitiveValue;

/// Wire primitive types.
///
/// The serialized names (`"uint32"`, `"double"`, ...) are the names schema
/// definitions use to reference primitives directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
}

impl PrimitiveType {
    /// All primitive types, in code order.
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::UInt8,
        PrimitiveType::UInt16,
        PrimitiveType::UInt32,
        PrimitiveType::UInt64,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            PrimitiveType::Char | PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Double => 8,
        }
    }

    /// Schema name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Resolve a schema name to a primitive type.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.name() == name)
    }

    /// Stable one-byte code used by the persisted IR form.
    pub const fn code(self) -> u8 {
        match self {
            PrimitiveType::Char => 1,
            PrimitiveType::Int8 => 2,
            PrimitiveType::Int16 => 3,
            PrimitiveType::Int32 => 4,
            PrimitiveType::Int64 => 5,
            PrimitiveType::UInt8 => 6,
            PrimitiveType::UInt16 => 7,
            PrimitiveType::UInt32 => 8,
            PrimitiveType::UInt64 => 9,
            PrimitiveType::Float => 10,
            PrimitiveType::Double => 11,
        }
    }

    /// Inverse of [`PrimitiveType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.code() == code)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveType::Char
                | PrimitiveType::UInt8
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
        )
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Integer types, including `char`.
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Sentinel written for an absent optional value.
    ///
    /// Integers use the value just outside their valid range (`MIN` for signed,
    /// `MAX` for unsigned), floats use NaN and `char` uses NUL.
    pub fn null_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0),
            PrimitiveType::Int8 => PrimitiveValue::Int8(i8::MIN),
            PrimitiveType::Int16 => PrimitiveValue::Int16(i16::MIN),
            PrimitiveType::Int32 => PrimitiveValue::Int32(i32::MIN),
            PrimitiveType::Int64 => PrimitiveValue::Int64(i64::MIN),
            PrimitiveType::UInt8 => PrimitiveValue::UInt8(u8::MAX),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(u16::MAX),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(u32::MAX),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(u64::MAX),
            PrimitiveType::Float => PrimitiveValue::Float(f32::NAN),
            PrimitiveType::Double => PrimitiveValue::Double(f64::NAN),
        }
    }

    /// Smallest non-null value.
    pub fn min_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x20),
            PrimitiveType::Int8 => PrimitiveValue::Int8(i8::MIN + 1),
            PrimitiveType::Int16 => PrimitiveValue::Int16(i16::MIN + 1),
            PrimitiveType::Int32 => PrimitiveValue::Int32(i32::MIN + 1),
            PrimitiveType::Int64 => PrimitiveValue::Int64(i64::MIN + 1),
            PrimitiveType::UInt8 => PrimitiveValue::UInt8(0),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(0),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(0),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(0),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MIN),
            PrimitiveType::Double => PrimitiveValue::Double(f64::MIN),
        }
    }

    /// Largest non-null value.
    pub fn max_value(self) -> PrimitiveValue {
        match self {
            PrimitiveType::Char => PrimitiveValue::Char(0x7e),
            PrimitiveType::Int8 => PrimitiveValue::Int8(i8::MAX),
            PrimitiveType::Int16 => PrimitiveValue::Int16(i16::MAX),
            PrimitiveType::Int32 => PrimitiveValue::Int32(i32::MAX),
            PrimitiveType::Int64 => PrimitiveValue::Int64(i64::MAX),
            PrimitiveType::UInt8 => PrimitiveValue::UInt8(u8::MAX - 1),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(u16::MAX - 1),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(u32::MAX - 1),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(u64::MAX - 1),
            PrimitiveType::Float => PrimitiveValue::Float(f32::MAX),
            PrimitiveType::Double => PrimitiveValue::Double(f64::MAX),
        }
    }

    /// Largest raw value an unsigned integer type can carry, if unsigned.
    pub const fn unsigned_max(self) -> Option<u64> {
        match self {
            PrimitiveType::Char | PrimitiveType::UInt8 => Some(u8::MAX as u64),
            PrimitiveType::UInt16 => Some(u16::MAX as u64),
            PrimitiveType::UInt32 => Some(u32::MAX as u64),
            PrimitiveType::UInt64 => Some(u64::MAX),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveType {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PrimitiveError::UnknownType(s.to_string()))
    }
}

/// Byte order of every multi-byte value in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub const fn code(self) -> u8 {
        match self {
            ByteOrder::LittleEndian => 0,
            ByteOrder::BigEndian => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ByteOrder::LittleEndian),
            1 => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => f.write_str("littleEndian"),
            ByteOrder::BigEndian => f.write_str("bigEndian"),
        }
    }
}

/// Presence semantics of a field or type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// A value must always be supplied.
    #[default]
    Required,
    /// The null sentinel marks an absent value.
    Optional,
    /// The value is fixed by the schema and occupies no wire space.
    Constant,
}

impl Presence {
    pub const fn code(self) -> u8 {
        match self {
            Presence::Required => 0,
            Presence::Optional => 1,
            Presence::Constant => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Presence::Required),
            1 => Some(Presence::Optional),
            2 => Some(Presence::Constant),
            _ => None,
        }
    }
}
