use std::collections::HashMap;

use sbeprims_primitive::{ByteOrder, Presence, PrimitiveType, PrimitiveValue};
use serde::Serialize;

/// Layout of the message header that precedes every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderLayout {
    pub block_length: PrimitiveType,
    pub template_id: PrimitiveType,
    pub schema_id: PrimitiveType,
    pub version: PrimitiveType,
}

impl HeaderLayout {
    /// Encoded header size in bytes.
    pub fn size(&self) -> usize {
        self.block_length.size()
            + self.template_id.size()
            + self.schema_id.size()
            + self.version.size()
    }

    pub fn block_length_offset(&self) -> usize {
        0
    }

    pub fn template_id_offset(&self) -> usize {
        self.block_length.size()
    }

    pub fn schema_id_offset(&self) -> usize {
        self.template_id_offset() + self.template_id.size()
    }

    pub fn version_offset(&self) -> usize {
        self.schema_id_offset() + self.schema_id.size()
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            block_length: PrimitiveType::UInt16,
            template_id: PrimitiveType::UInt16,
            schema_id: PrimitiveType::UInt16,
            version: PrimitiveType::UInt16,
        }
    }
}

/// Layout of a group's dimension header: element block length then count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionLayout {
    pub block_length: PrimitiveType,
    pub num_in_group: PrimitiveType,
}

impl DimensionLayout {
    pub fn size(&self) -> usize {
        self.block_length.size() + self.num_in_group.size()
    }

    pub fn num_in_group_offset(&self) -> usize {
        self.block_length.size()
    }
}

impl Default for DimensionLayout {
    fn default() -> Self {
        Self {
            block_length: PrimitiveType::UInt16,
            num_in_group: PrimitiveType::UInt16,
        }
    }
}

/// A value fixed by the schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Constant {
    Primitive(PrimitiveValue),
    /// Character or byte array, padded to the array length.
    Bytes(Vec<u8>),
    /// Name of an enum value.
    Enum(String),
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Primitive(a), Constant::Primitive(b)) => a.bit_eq(b),
            (Constant::Bytes(a), Constant::Bytes(b)) => a == b,
            (Constant::Enum(a), Constant::Enum(b)) => a == b,
            _ => false,
        }
    }
}

/// A primitive (or fixed-length primitive array) type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedType {
    pub name: String,
    pub primitive: PrimitiveType,
    /// Array length; `1` for scalars.
    pub length: usize,
    pub presence: Presence,
    pub null_value: PrimitiveValue,
    pub min_value: PrimitiveValue,
    pub max_value: PrimitiveValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<Constant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_encoding: Option<String>,
}

impl EncodedType {
    /// A plain scalar of `primitive` named after it, as used when a field
    /// references a primitive directly.
    pub fn scalar(primitive: PrimitiveType) -> Self {
        Self {
            name: primitive.name().to_string(),
            primitive,
            length: 1,
            presence: Presence::Required,
            null_value: primitive.null_value(),
            min_value: primitive.min_value(),
            max_value: primitive.max_value(),
            constant: None,
            character_encoding: None,
        }
    }

    pub fn size(&self) -> usize {
        self.primitive.size() * self.length
    }

    /// `None` when the array is too large to address.
    pub fn checked_size(&self) -> Option<usize> {
        self.primitive.size().checked_mul(self.length)
    }

    pub fn is_array(&self) -> bool {
        self.length > 1
    }
}

// Float null values are NaN, so limits compare bitwise.
impl PartialEq for EncodedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.primitive == other.primitive
            && self.length == other.length
            && self.presence == other.presence
            && self.null_value.bit_eq(&other.null_value)
            && self.min_value.bit_eq(&other.min_value)
            && self.max_value.bit_eq(&other.max_value)
            && self.constant == other.constant
            && self.character_encoding == other.character_encoding
    }
}

/// A named valid value of an enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidValue {
    pub name: String,
    /// Encoded value, widened to `i64` (chars use their byte value).
    pub value: i64,
    pub since_version: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A closed mapping from encoded values to names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumType {
    pub name: String,
    pub encoding: PrimitiveType,
    pub null_value: PrimitiveValue,
    pub values: Vec<ValidValue>,
}

impl EnumType {
    pub fn size(&self) -> usize {
        self.encoding.size()
    }

    /// The valid value for `raw`, if it exists at `acting_version`.
    pub fn value_for(&self, raw: i64, acting_version: u16) -> Option<&ValidValue> {
        self.values
            .iter()
            .find(|v| v.value == raw && v.since_version <= acting_version)
    }

    pub fn value_named(&self, name: &str) -> Option<&ValidValue> {
        self.values.iter().find(|v| v.name == name)
    }
}

/// A named bit of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub name: String,
    pub bit: u8,
    pub since_version: u16,
}

/// Named bits over an unsigned integer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetType {
    pub name: String,
    pub encoding: PrimitiveType,
    pub choices: Vec<Choice>,
}

impl SetType {
    pub fn size(&self) -> usize {
        self.encoding.size()
    }

    pub fn choice_named(&self, name: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.name == name)
    }
}

/// A fixed-size aggregate. Members are [`Field`]s with offsets relative to
/// the start of the composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeType {
    pub name: String,
    pub members: Vec<Field>,
    pub size: usize,
}

impl CompositeType {
    pub fn member(&self, name: &str) -> Option<&Field> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Resolved encoding of a field or composite member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Encoding {
    Primitive(EncodedType),
    Enum(EnumType),
    Set(SetType),
    Composite(CompositeType),
}

impl Encoding {
    pub fn name(&self) -> &str {
        match self {
            Encoding::Primitive(t) => &t.name,
            Encoding::Enum(t) => &t.name,
            Encoding::Set(t) => &t.name,
            Encoding::Composite(t) => &t.name,
        }
    }

    /// Wire size ignoring field-level constant presence.
    pub fn size(&self) -> usize {
        match self {
            Encoding::Primitive(t) => t.size(),
            Encoding::Enum(t) => t.size(),
            Encoding::Set(t) => t.size(),
            Encoding::Composite(t) => t.size,
        }
    }

    pub fn checked_size(&self) -> Option<usize> {
        match self {
            Encoding::Primitive(t) => t.checked_size(),
            _ => Some(self.size()),
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Encoding::Primitive(_) => 1,
            Encoding::Enum(_) => 2,
            Encoding::Set(_) => 3,
            Encoding::Composite(_) => 4,
        }
    }
}

/// A field at a fixed offset within its block (or composite).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub id: u16,
    pub offset: usize,
    pub since_version: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<u16>,
    pub presence: Presence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<Constant>,
    pub encoding: Encoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    /// Bytes occupied on the wire. Constant fields occupy none.
    pub fn size(&self) -> usize {
        if self.presence == Presence::Constant {
            0
        } else {
            self.encoding.size()
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.size()
    }

    /// `None` when the field ends past the addressable range.
    pub fn checked_end(&self) -> Option<usize> {
        let size = match self.presence {
            Presence::Constant => 0,
            _ => self.encoding.checked_size()?,
        };
        self.offset.checked_add(size)
    }

    pub fn is_constant(&self) -> bool {
        self.presence == Presence::Constant
    }

    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }

    /// Visible to a decoder acting at `acting_version`.
    pub fn in_version(&self, acting_version: u16) -> bool {
        self.since_version <= acting_version
    }
}

/// A variable-length data section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarData {
    pub name: String,
    pub id: u16,
    pub since_version: u16,
    pub length_type: PrimitiveType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VarData {
    /// Largest payload the length prefix can describe.
    pub fn max_length(&self) -> u64 {
        self.length_type.unsigned_max().unwrap_or(0)
    }

    pub fn in_version(&self, acting_version: u16) -> bool {
        self.since_version <= acting_version
    }
}

/// Fixed fields followed by repeating groups and var-data, in wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub fields: Vec<Field>,
    pub groups: Vec<Group>,
    pub data: Vec<VarData>,
    pub block_length: usize,
    #[serde(skip)]
    pub(crate) schema_version: u16,
    #[serde(skip)]
    pub(crate) field_index: HashMap<String, usize>,
    #[serde(skip)]
    pub(crate) group_index: HashMap<String, usize>,
    #[serde(skip)]
    pub(crate) data_index: HashMap<String, usize>,
}

impl Block {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.group_index.get(name).map(|&i| &self.groups[i])
    }

    pub fn data(&self, name: &str) -> Option<&VarData> {
        self.data_index.get(name).map(|&i| &self.data[i])
    }

    /// Position of `group` among this block's groups, by identity.
    pub fn group_position(&self, group: &Group) -> Option<usize> {
        self.group_index
            .get(&group.name)
            .copied()
            .filter(|&i| std::ptr::eq(&self.groups[i], group))
    }

    /// Position of `data` among this block's var-data sections, by identity.
    pub fn data_position(&self, data: &VarData) -> Option<usize> {
        self.data_index
            .get(&data.name)
            .copied()
            .filter(|&i| std::ptr::eq(&self.data[i], data))
    }

    /// True if `field` is one of this block's fields, by identity.
    pub fn owns_field(&self, field: &Field) -> bool {
        self.field_index
            .get(&field.name)
            .is_some_and(|&i| std::ptr::eq(&self.fields[i], field))
    }

    /// Block length as encoded by a schema at `version`.
    ///
    /// At the current schema version this is the declared block length. Older
    /// versions end after the last field they knew about, so the length never
    /// shrinks as versions increase.
    pub fn block_length_at(&self, version: u16) -> usize {
        if version >= self.schema_version {
            return self.block_length;
        }
        self.fields
            .iter()
            .filter(|f| f.in_version(version))
            .map(Field::end)
            .max()
            .unwrap_or(0)
    }
}

/// A repeating group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    pub id: u16,
    pub since_version: u16,
    pub dimension: DimensionLayout,
    pub block: Block,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Group {
    pub fn in_version(&self, acting_version: u16) -> bool {
        self.since_version <= acting_version
    }
}

/// A message template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub name: String,
    /// Template id.
    pub id: u16,
    pub since_version: u16,
    pub block: Block,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Message {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.block.field(name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.block.group(name)
    }

    pub fn data(&self, name: &str) -> Option<&VarData> {
        self.block.data(name)
    }

    pub fn block_length(&self) -> usize {
        self.block.block_length
    }

    pub fn block_length_at(&self, version: u16) -> usize {
        self.block.block_length_at(version)
    }
}

/// The frozen intermediate representation of one schema.
///
/// Constructed only by [`SchemaBuilder`](crate::SchemaBuilder) or
/// [`decode_ir`](crate::decode_ir); immutable afterwards and safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ir {
    pub(crate) package: String,
    pub(crate) schema_id: u16,
    pub(crate) version: u16,
    pub(crate) semantic_version: String,
    pub(crate) byte_order: ByteOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    pub(crate) header: HeaderLayout,
    pub(crate) types: Vec<Encoding>,
    pub(crate) messages: Vec<Message>,
    #[serde(skip)]
    pub(crate) by_template: HashMap<u16, usize>,
    #[serde(skip)]
    pub(crate) by_name: HashMap<String, usize>,
    #[serde(skip)]
    pub(crate) types_by_name: HashMap<String, usize>,
}

impl Ir {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn schema_id(&self) -> u16 {
        self.schema_id
    }

    /// Current schema version.
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn semantic_version(&self) -> &str {
        &self.semantic_version
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn header(&self) -> &HeaderLayout {
        &self.header
    }

    /// Named types in declaration order.
    pub fn types(&self) -> &[Encoding] {
        &self.types
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_by_id(&self, template_id: u16) -> Option<&Message> {
        self.by_template.get(&template_id).map(|&i| &self.messages[i])
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.by_name.get(name).map(|&i| &self.messages[i])
    }

    pub fn find_type(&self, name: &str) -> Option<&Encoding> {
        self.types_by_name.get(name).map(|&i| &self.types[i])
    }
}
