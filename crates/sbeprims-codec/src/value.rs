//! Owned message values for the reflective encode/decode API.

use std::collections::BTreeMap;
use std::fmt;

use sbeprims_primitive::PrimitiveValue;
use serde::Serialize;

/// A decoded enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumValue {
    /// A valid value, by name.
    Known(String),
    /// A raw value with no valid value at the acting version.
    Unknown(i64),
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Known(name) => f.write_str(name),
            EnumValue::Unknown(raw) => write!(f, "<unknown {raw}>"),
        }
    }
}

/// The value of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    /// Absent: an optional field holding its null value, or a field the
    /// acting version does not carry.
    Null,
    Primitive(PrimitiveValue),
    /// A non-character primitive array.
    Array(Vec<PrimitiveValue>),
    /// A character or single-byte array, NUL padded.
    Bytes(Vec<u8>),
    Enum(EnumValue),
    /// Names of the set's choices whose bits are set.
    Set(Vec<String>),
    Composite(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            FieldValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Character content up to the first NUL, if this is a byte array.
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(bytes) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Some(&bytes[..end])
            }
            _ => None,
        }
    }
}

impl From<PrimitiveValue> for FieldValue {
    fn from(value: PrimitiveValue) -> Self {
        FieldValue::Primitive(value)
    }
}

impl From<EnumValue> for FieldValue {
    fn from(value: EnumValue) -> Self {
        FieldValue::Enum(value)
    }
}

/// Fields, groups and var-data of a message or group element, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockValue {
    pub fields: BTreeMap<String, FieldValue>,
    pub groups: BTreeMap<String, Vec<BlockValue>>,
    pub data: BTreeMap<String, Vec<u8>>,
}

/// The root block of a message.
pub type MessageValue = BlockValue;

impl BlockValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_group(mut self, name: impl Into<String>, elements: Vec<BlockValue>) -> Self {
        self.groups.insert(name.into(), elements);
        self
    }

    pub fn with_data(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.data.insert(name.into(), bytes.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&[BlockValue]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn data(&self, name: &str) -> Option<&[u8]> {
        self.data.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_stops_at_nul() {
        let value = FieldValue::Bytes(b"AB\0\0".to_vec());
        assert_eq!(value.as_text(), Some(&b"AB"[..]));
        assert_eq!(FieldValue::Null.as_text(), None);
    }

    #[test]
    fn builder_setters() {
        let value = BlockValue::new()
            .with_field("id", PrimitiveValue::UInt64(7))
            .with_group("legs", vec![BlockValue::new()])
            .with_data("note", b"hi".to_vec());
        assert_eq!(
            value.field("id"),
            Some(&FieldValue::Primitive(PrimitiveValue::UInt64(7)))
        );
        assert_eq!(value.group("legs").map(<[BlockValue]>::len), Some(1));
        assert_eq!(value.data("note"), Some(&b"hi"[..]));
    }

    #[test]
    fn enum_display() {
        assert_eq!(EnumValue::Known("Buy".into()).to_string(), "Buy");
        assert_eq!(EnumValue::Unknown(9).to_string(), "<unknown 9>");
    }
}
