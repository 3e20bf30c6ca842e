use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PrimitiveError, Result};
use crate::types::{ByteOrder, PrimitiveType};

/// A single decoded (or to-be-encoded) primitive value.
///
/// Each variant carries exactly the Rust type matching its wire width, so a
/// value that exists is always encodable without truncation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveValue {
    Char(u8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
}

macro_rules! write_ordered {
    ($value:expr, $dst:expr, $order:expr) => {{
        let bytes = match $order {
            ByteOrder::LittleEndian => $value.to_le_bytes(),
            ByteOrder::BigEndian => $value.to_be_bytes(),
        };
        $dst.copy_from_slice(&bytes);
    }};
}

macro_rules! read_ordered {
    ($ty:ty, $src:expr, $order:expr) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice($src);
        match $order {
            ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
            ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
        }
    }};
}

impl PrimitiveValue {
    /// The primitive type this value encodes as.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            PrimitiveValue::Char(_) => PrimitiveType::Char,
            PrimitiveValue::Int8(_) => PrimitiveType::Int8,
            PrimitiveValue::Int16(_) => PrimitiveType::Int16,
            PrimitiveValue::Int32(_) => PrimitiveType::Int32,
            PrimitiveValue::Int64(_) => PrimitiveType::Int64,
            PrimitiveValue::UInt8(_) => PrimitiveType::UInt8,
            PrimitiveValue::UInt16(_) => PrimitiveType::UInt16,
            PrimitiveValue::UInt32(_) => PrimitiveType::UInt32,
            PrimitiveValue::UInt64(_) => PrimitiveType::UInt64,
            PrimitiveValue::Float(_) => PrimitiveType::Float,
            PrimitiveValue::Double(_) => PrimitiveType::Double,
        }
    }

    /// Build a value of type `ty` from a signed integer.
    ///
    /// Fails with `Range` if `value` does not fit `ty`.
    pub fn from_i64(ty: PrimitiveType, value: i64) -> Result<Self> {
        let out_of_range = || PrimitiveError::range(ty, value);
        Ok(match ty {
            PrimitiveType::Char => {
                PrimitiveValue::Char(u8::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::Int8 => {
                PrimitiveValue::Int8(i8::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::Int16 => {
                PrimitiveValue::Int16(i16::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::Int32 => {
                PrimitiveValue::Int32(i32::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::Int64 => PrimitiveValue::Int64(value),
            PrimitiveType::UInt8 => {
                PrimitiveValue::UInt8(u8::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::UInt16 => {
                PrimitiveValue::UInt16(u16::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::UInt32 => {
                PrimitiveValue::UInt32(u32::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::UInt64 => {
                PrimitiveValue::UInt64(u64::try_from(value).map_err(|_| out_of_range())?)
            }
            PrimitiveType::Float => PrimitiveValue::Float(value as f32),
            PrimitiveType::Double => PrimitiveValue::Double(value as f64),
        })
    }

    /// Build a value of type `ty` from an unsigned integer.
    pub fn from_u64(ty: PrimitiveType, value: u64) -> Result<Self> {
        match ty {
            PrimitiveType::UInt64 => Ok(PrimitiveValue::UInt64(value)),
            PrimitiveType::Float => Ok(PrimitiveValue::Float(value as f32)),
            PrimitiveType::Double => Ok(PrimitiveValue::Double(value as f64)),
            _ => {
                let signed = i64::try_from(value).map_err(|_| PrimitiveError::range(ty, value))?;
                Self::from_i64(ty, signed)
            }
        }
    }

    /// Build a value of type `ty` from a float.
    ///
    /// Integer targets accept only integral values within range. `float`
    /// targets reject finite values beyond `f32` range.
    pub fn from_f64(ty: PrimitiveType, value: f64) -> Result<Self> {
        match ty {
            PrimitiveType::Double => Ok(PrimitiveValue::Double(value)),
            PrimitiveType::Float => {
                if value.is_finite() && value.abs() > f32::MAX as f64 {
                    return Err(PrimitiveError::range(ty, value));
                }
                Ok(PrimitiveValue::Float(value as f32))
            }
            _ => {
                if !value.is_finite() || value.fract() != 0.0 {
                    return Err(PrimitiveError::range(ty, value));
                }
                if value < 0.0 {
                    if value < i64::MIN as f64 {
                        return Err(PrimitiveError::range(ty, value));
                    }
                    Self::from_i64(ty, value as i64)
                } else {
                    if value >= u64::MAX as f64 {
                        return Err(PrimitiveError::range(ty, value));
                    }
                    Self::from_u64(ty, value as u64)
                }
            }
        }
    }

    /// Convert to another primitive type, failing with `Range` rather than
    /// truncating.
    pub fn cast_to(self, ty: PrimitiveType) -> Result<Self> {
        if self.primitive_type() == ty {
            return Ok(self);
        }
        match self {
            PrimitiveValue::Float(v) => Self::from_f64(ty, v as f64),
            PrimitiveValue::Double(v) => Self::from_f64(ty, v),
            PrimitiveValue::Char(v) | PrimitiveValue::UInt8(v) => Self::from_u64(ty, v as u64),
            PrimitiveValue::UInt16(v) => Self::from_u64(ty, v as u64),
            PrimitiveValue::UInt32(v) => Self::from_u64(ty, v as u64),
            PrimitiveValue::UInt64(v) => Self::from_u64(ty, v),
            PrimitiveValue::Int8(v) => Self::from_i64(ty, v as i64),
            PrimitiveValue::Int16(v) => Self::from_i64(ty, v as i64),
            PrimitiveValue::Int32(v) => Self::from_i64(ty, v as i64),
            PrimitiveValue::Int64(v) => Self::from_i64(ty, v),
        }
    }

    /// Integer value as `i64`, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PrimitiveValue::Char(v) | PrimitiveValue::UInt8(v) => Some(v as i64),
            PrimitiveValue::Int8(v) => Some(v as i64),
            PrimitiveValue::Int16(v) => Some(v as i64),
            PrimitiveValue::Int32(v) => Some(v as i64),
            PrimitiveValue::Int64(v) => Some(v),
            PrimitiveValue::UInt16(v) => Some(v as i64),
            PrimitiveValue::UInt32(v) => Some(v as i64),
            PrimitiveValue::UInt64(v) => i64::try_from(v).ok(),
            PrimitiveValue::Float(_) | PrimitiveValue::Double(_) => None,
        }
    }

    /// Integer value as `u64`, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PrimitiveValue::UInt64(v) => Some(v),
            PrimitiveValue::Float(_) | PrimitiveValue::Double(_) => None,
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// Numeric value widened to `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            PrimitiveValue::Float(v) => v as f64,
            PrimitiveValue::Double(v) => v,
            PrimitiveValue::UInt64(v) => v as f64,
            _ => self.as_i64().map(|v| v as f64).unwrap_or(f64::NAN),
        }
    }

    /// True if this is the null sentinel of its type.
    pub fn is_null(&self) -> bool {
        match *self {
            PrimitiveValue::Float(v) => v.is_nan(),
            PrimitiveValue::Double(v) => v.is_nan(),
            other => other == other.primitive_type().null_value(),
        }
    }

    /// Bitwise equality (treats identical NaN payloads as equal).
    pub fn bit_eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (PrimitiveValue::Float(a), PrimitiveValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PrimitiveValue::Double(a), PrimitiveValue::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Write exactly `size()` bytes. `dst` must be that long.
    pub(crate) fn write_to(&self, dst: &mut [u8], order: ByteOrder) {
        match *self {
            PrimitiveValue::Char(v) | PrimitiveValue::UInt8(v) => dst[0] = v,
            PrimitiveValue::Int8(v) => dst[0] = v as u8,
            PrimitiveValue::Int16(v) => write_ordered!(v, dst, order),
            PrimitiveValue::Int32(v) => write_ordered!(v, dst, order),
            PrimitiveValue::Int64(v) => write_ordered!(v, dst, order),
            PrimitiveValue::UInt16(v) => write_ordered!(v, dst, order),
            PrimitiveValue::UInt32(v) => write_ordered!(v, dst, order),
            PrimitiveValue::UInt64(v) => write_ordered!(v, dst, order),
            PrimitiveValue::Float(v) => write_ordered!(v, dst, order),
            PrimitiveValue::Double(v) => write_ordered!(v, dst, order),
        }
    }

    /// Read a value of `ty`. `src` must be exactly `ty.size()` bytes.
    pub(crate) fn read_from(ty: PrimitiveType, src: &[u8], order: ByteOrder) -> Self {
        match ty {
            PrimitiveType::Char => PrimitiveValue::Char(src[0]),
            PrimitiveType::UInt8 => PrimitiveValue::UInt8(src[0]),
            PrimitiveType::Int8 => PrimitiveValue::Int8(src[0] as i8),
            PrimitiveType::Int16 => PrimitiveValue::Int16(read_ordered!(i16, src, order)),
            PrimitiveType::Int32 => PrimitiveValue::Int32(read_ordered!(i32, src, order)),
            PrimitiveType::Int64 => PrimitiveValue::Int64(read_ordered!(i64, src, order)),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(read_ordered!(u16, src, order)),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(read_ordered!(u32, src, order)),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(read_ordered!(u64, src, order)),
            PrimitiveType::Float => PrimitiveValue::Float(read_ordered!(f32, src, order)),
            PrimitiveType::Double => PrimitiveValue::Double(read_ordered!(f64, src, order)),
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PrimitiveValue::Char(v) if v.is_ascii_graphic() || v == b' ' => {
                write!(f, "'{}'", v as char)
            }
            PrimitiveValue::Char(v) => write!(f, "0x{v:02x}"),
            PrimitiveValue::Int8(v) => write!(f, "{v}"),
            PrimitiveValue::Int16(v) => write!(f, "{v}"),
            PrimitiveValue::Int32(v) => write!(f, "{v}"),
            PrimitiveValue::Int64(v) => write!(f, "{v}"),
            PrimitiveValue::UInt8(v) => write!(f, "{v}"),
            PrimitiveValue::UInt16(v) => write!(f, "{v}"),
            PrimitiveValue::UInt32(v) => write!(f, "{v}"),
            PrimitiveValue::UInt64(v) => write!(f, "{v}"),
            PrimitiveValue::Float(v) => write!(f, "{v}"),
            PrimitiveValue::Double(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_i64_rejects_out_of_range() {
        assert_eq!(
            PrimitiveValue::from_i64(PrimitiveType::UInt8, 255).unwrap(),
            PrimitiveValue::UInt8(255)
        );
        assert!(matches!(
            PrimitiveValue::from_i64(PrimitiveType::UInt8, 256),
            Err(PrimitiveError::Range { .. })
        ));
        assert!(matches!(
            PrimitiveValue::from_i64(PrimitiveType::UInt32, -1),
            Err(PrimitiveError::Range { .. })
        ));
        assert!(matches!(
            PrimitiveValue::from_i64(PrimitiveType::Int16, 40_000),
            Err(PrimitiveError::Range { .. })
        ));
    }

    #[test]
    fn from_u64_rejects_values_above_i64_for_narrow_types() {
        assert!(matches!(
            PrimitiveValue::from_u64(PrimitiveType::Int64, u64::MAX),
            Err(PrimitiveError::Range { .. })
        ));
        assert_eq!(
            PrimitiveValue::from_u64(PrimitiveType::UInt64, u64::MAX).unwrap(),
            PrimitiveValue::UInt64(u64::MAX)
        );
    }

    #[test]
    fn from_f64_requires_integral_values_for_integers() {
        assert_eq!(
            PrimitiveValue::from_f64(PrimitiveType::Int32, -12.0).unwrap(),
            PrimitiveValue::Int32(-12)
        );
        assert!(PrimitiveValue::from_f64(PrimitiveType::Int32, 1.5).is_err());
        assert!(PrimitiveValue::from_f64(PrimitiveType::UInt8, f64::NAN).is_err());
        assert!(PrimitiveValue::from_f64(PrimitiveType::Float, 1e300).is_err());
        assert!(PrimitiveValue::from_f64(PrimitiveType::Float, f64::NAN).is_ok());
    }

    #[test]
    fn cast_never_truncates() {
        let wide = PrimitiveValue::UInt64(5_000_000_000);
        assert!(wide.cast_to(PrimitiveType::UInt32).is_err());
        let narrow = PrimitiveValue::UInt64(42);
        assert_eq!(
            narrow.cast_to(PrimitiveType::Int8).unwrap(),
            PrimitiveValue::Int8(42)
        );
        assert!(PrimitiveValue::Int8(-1).cast_to(PrimitiveType::UInt16).is_err());
    }

    #[test]
    fn null_detection() {
        assert!(PrimitiveValue::UInt16(u16::MAX).is_null());
        assert!(!PrimitiveValue::UInt16(7).is_null());
        assert!(PrimitiveValue::Float(f32::NAN).is_null());
        assert!(PrimitiveValue::Char(0).is_null());
    }

    #[test]
    fn bit_eq_handles_nan() {
        let a = PrimitiveValue::Double(f64::NAN);
        assert!(a.bit_eq(&a));
        assert_ne!(a, a);
    }

    #[test]
    fn display_formats_chars() {
        assert_eq!(PrimitiveValue::Char(b'A').to_string(), "'A'");
        assert_eq!(PrimitiveValue::Char(0).to_string(), "0x00");
        assert_eq!(PrimitiveValue::Int64(-3).to_string(), "-3");
    }
}
