//! Schema definitions as handed over by a schema compiler.
//!
//! These mirror the structure of a message schema document but leave offsets,
//! sizes and type references unresolved. They deserialize from JSON:
//!
//! ```json
//! {
//!   "package": "orders", "id": 1, "version": 1,
//!   "types": [{ "kind": "enum", "name": "Side", "encoding": "uint8",
//!               "values": [{ "name": "Buy", "value": 1 }] }],
//!   "messages": [{ "name": "Order", "id": 1, "fields": [
//!     { "name": "id", "id": 1, "type": "uint64" },
//!     { "name": "side", "id": 2, "type": "Side" }
//!   ]}]
//! }
//! ```

use std::fmt;

use sbeprims_primitive::{ByteOrder, Presence, PrimitiveType};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level schema definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDef {
    pub package: String,
    /// Schema id written into every message header.
    pub id: u16,
    /// Current schema version.
    #[serde(default)]
    pub version: u16,
    #[serde(default)]
    pub semantic_version: String,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Message header layout. Defaults to four `uint16` fields.
    #[serde(default)]
    pub header: HeaderDef,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub messages: Vec<MessageDef>,
}

impl SchemaDef {
    /// Parse a definition document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Encoding of the message header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderDef {
    pub block_length: PrimitiveType,
    pub template_id: PrimitiveType,
    pub schema_id: PrimitiveType,
    pub version: PrimitiveType,
}

impl Default for HeaderDef {
    fn default() -> Self {
        Self {
            block_length: PrimitiveType::UInt16,
            template_id: PrimitiveType::UInt16,
            schema_id: PrimitiveType::UInt16,
            version: PrimitiveType::UInt16,
        }
    }
}

/// Encoding of a group's dimension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionDef {
    pub block_length: PrimitiveType,
    pub num_in_group: PrimitiveType,
}

impl Default for DimensionDef {
    fn default() -> Self {
        Self {
            block_length: PrimitiveType::UInt16,
            num_in_group: PrimitiveType::UInt16,
        }
    }
}

/// A literal in a definition: integer, float, or text (chars, names).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::UInt(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Text(v) => write!(f, "\"{v}\""),
        }
    }
}

/// A named type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    /// A primitive, optionally an array, with presence and limits.
    Type {
        name: String,
        primitive: PrimitiveType,
        #[serde(default = "default_length")]
        length: usize,
        #[serde(default)]
        presence: Presence,
        #[serde(default, rename = "nullValue", skip_serializing_if = "Option::is_none")]
        null_value: Option<Literal>,
        #[serde(default, rename = "minValue", skip_serializing_if = "Option::is_none")]
        min_value: Option<Literal>,
        #[serde(default, rename = "maxValue", skip_serializing_if = "Option::is_none")]
        max_value: Option<Literal>,
        /// Constant value when `presence` is `constant`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Literal>,
        #[serde(
            default,
            rename = "characterEncoding",
            skip_serializing_if = "Option::is_none"
        )]
        character_encoding: Option<String>,
    },
    /// A closed set of named values.
    Enum {
        name: String,
        encoding: PrimitiveType,
        values: Vec<EnumValueDef>,
    },
    /// Named bits of an unsigned integer.
    Set {
        name: String,
        encoding: PrimitiveType,
        choices: Vec<ChoiceDef>,
    },
    /// A fixed-size aggregate of members.
    Composite { name: String, members: Vec<FieldDef> },
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Type { name, .. }
            | TypeDef::Enum { name, .. }
            | TypeDef::Set { name, .. }
            | TypeDef::Composite { name, .. } => name,
        }
    }
}

fn default_length() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueDef {
    pub name: String,
    pub value: Literal,
    #[serde(default)]
    pub since_version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceDef {
    pub name: String,
    pub bit: u8,
    #[serde(default)]
    pub since_version: u16,
}

/// A field of a message or group, or a member of a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    #[serde(default)]
    pub id: u16,
    /// A primitive name (`"uint32"`) or the name of a declared type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit offset. When absent the field follows the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Overrides the presence of the referenced type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    #[serde(default)]
    pub since_version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<u16>,
    /// Constant value (or enum value name) for constant fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A message definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDef {
    pub name: String,
    /// Template id.
    pub id: u16,
    /// Declared block length. Must cover every field; defaults to the end of
    /// the last field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_length: Option<usize>,
    #[serde(default)]
    pub since_version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub data: Vec<DataDef>,
}

/// A repeating group definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDef {
    pub name: String,
    #[serde(default)]
    pub id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_length: Option<usize>,
    #[serde(default)]
    pub dimension: DimensionDef,
    #[serde(default)]
    pub since_version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub data: Vec<DataDef>,
}

/// A variable-length data definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDef {
    pub name: String,
    #[serde(default)]
    pub id: u16,
    /// Width of the length prefix. Defaults to `uint32`.
    #[serde(default = "default_length_type")]
    pub length_type: PrimitiveType,
    #[serde(default)]
    pub since_version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_length_type() -> PrimitiveType {
    PrimitiveType::UInt32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let def = SchemaDef::from_json(
            r#"{
                "package": "orders",
                "id": 7,
                "messages": [
                    { "name": "Ping", "id": 1, "fields": [{ "name": "seq", "type": "uint32" }] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(def.id, 7);
        assert_eq!(def.version, 0);
        assert_eq!(def.byte_order, ByteOrder::LittleEndian);
        assert_eq!(def.header, HeaderDef::default());
        assert_eq!(def.messages[0].fields[0].type_name, "uint32");
        assert_eq!(def.messages[0].fields[0].offset, None);
    }

    #[test]
    fn parses_type_kinds_and_literals() {
        let def = SchemaDef::from_json(
            r#"{
                "package": "p", "id": 1, "byteOrder": "bigEndian",
                "types": [
                    { "kind": "type", "name": "Sym", "primitive": "char", "length": 8 },
                    { "kind": "type", "name": "Qty", "primitive": "uint32", "presence": "optional", "nullValue": 0 },
                    { "kind": "enum", "name": "Side", "encoding": "char",
                      "values": [{ "name": "Buy", "value": "B" }, { "name": "Sell", "value": "S" }] },
                    { "kind": "set", "name": "Flags", "encoding": "uint8",
                      "choices": [{ "name": "Urgent", "bit": 0 }] },
                    { "kind": "composite", "name": "Dec",
                      "members": [{ "name": "m", "type": "int64" }, { "name": "e", "type": "int8", "presence": "constant", "value": -4 }] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(def.byte_order, ByteOrder::BigEndian);
        assert_eq!(def.types.len(), 5);
        match &def.types[0] {
            TypeDef::Type { length, .. } => assert_eq!(*length, 8),
            other => panic!("unexpected {other:?}"),
        }
        match &def.types[2] {
            TypeDef::Enum { values, .. } => {
                assert_eq!(values[0].value, Literal::Text("B".to_string()))
            }
            other => panic!("unexpected {other:?}"),
        }
        match &def.types[4] {
            TypeDef::Composite { members, .. } => {
                assert_eq!(members[1].value, Some(Literal::Int(-4)))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_primitive_names() {
        let result = SchemaDef::from_json(
            r#"{ "package": "p", "id": 1,
                 "types": [{ "kind": "type", "name": "X", "primitive": "uint128" }] }"#,
        );
        assert!(result.is_err());
    }
}
