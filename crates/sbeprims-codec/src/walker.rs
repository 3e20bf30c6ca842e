//! Layout walking shared by the cursor decoder and the OTF decoder.
//!
//! Everything here is a pure function of the buffer, a block's start offset
//! and the IR, so any section's extent can be recomputed from where it
//! starts without cursor state.

use std::collections::BTreeMap;

use sbeprims_ir::{Block, Constant, EncodedType, Encoding, Field, Group, Ir, VarData};
use sbeprims_primitive::{
    get, get_bytes, get_uint, ByteOrder, Presence, PrimitiveType, PrimitiveValue,
};

use crate::config::DecoderConfig;
use crate::error::{CodecError, Result};
use crate::value::{EnumValue, FieldValue};

/// One wire element of a block, in wire order.
#[derive(Debug, Clone, Copy)]
pub enum Element<'a> {
    Field(&'a Field),
    Group(&'a Group),
    Data(&'a VarData),
}

/// Fields, then groups, then var-data.
pub fn elements(block: &Block) -> impl Iterator<Item = Element<'_>> {
    block
        .fields
        .iter()
        .map(Element::Field)
        .chain(block.groups.iter().map(Element::Group))
        .chain(block.data.iter().map(Element::Data))
}

/// A decoded group dimension header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    /// Block length of each element as encoded.
    pub block_length: usize,
    pub count: usize,
}

/// Bounds-checked reads and skips at one acting version.
///
/// Two versions are tracked. Sections are sized by the version the message
/// was encoded with, since everything that version carries is on the wire.
/// Only what the acting version carries is reported.
#[derive(Debug, Clone, Copy)]
pub struct Walker {
    order: ByteOrder,
    acting_version: u16,
    encoded_version: u16,
    config: DecoderConfig,
}

impl Walker {
    /// A walker for messages encoded at `acting_version`.
    pub fn new(ir: &Ir, acting_version: u16, config: DecoderConfig) -> Self {
        Self {
            order: ir.byte_order(),
            acting_version,
            encoded_version: acting_version,
            config,
        }
    }

    /// Report the view of an older reader at `acting_version`. Versions at or
    /// above the encoded version leave the walker unchanged.
    pub fn viewed_as(self, acting_version: u16) -> Self {
        Self {
            acting_version: acting_version.min(self.encoded_version),
            ..self
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn acting_version(&self) -> u16 {
        self.acting_version
    }

    pub fn encoded_version(&self) -> u16 {
        self.encoded_version
    }

    /// True if `group` is on the wire.
    pub fn group_on_wire(&self, group: &Group) -> bool {
        group.in_version(self.encoded_version)
    }

    /// True if `data` is on the wire.
    pub fn data_on_wire(&self, data: &VarData) -> bool {
        data.in_version(self.encoded_version)
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// True if `field` was encoded: it exists at the acting version and lies
    /// within the acting block length.
    pub fn is_visible(&self, field: &Field, acting_block_length: usize) -> bool {
        field.in_version(self.acting_version) && field.end() <= acting_block_length
    }

    /// Decode `field` from a block starting at `block_start`.
    pub fn read_field(
        &self,
        buf: &[u8],
        block_start: usize,
        acting_block_length: usize,
        field: &Field,
    ) -> Result<FieldValue> {
        if field.is_constant() {
            return Ok(match field.in_version(self.acting_version) {
                true => constant_value(field),
                false => FieldValue::Null,
            });
        }
        if !self.is_visible(field, acting_block_length) {
            return Ok(FieldValue::Null);
        }
        self.read_encoding(
            buf,
            offset_of(block_start, field.offset)?,
            &field.encoding,
            field.presence,
        )
    }

    /// Decode a scalar primitive, enum or set field as its raw value.
    ///
    /// Returns `None` for null and invisible fields.
    pub fn read_raw(
        &self,
        buf: &[u8],
        block_start: usize,
        acting_block_length: usize,
        field: &Field,
    ) -> Result<Option<PrimitiveValue>> {
        let scalar = match &field.encoding {
            Encoding::Primitive(ty) if ty.length == 1 => (ty.primitive, ty.null_value),
            Encoding::Enum(ty) => (ty.encoding, ty.null_value),
            Encoding::Set(ty) => (ty.encoding, ty.encoding.null_value()),
            _ => {
                return Err(CodecError::Range(format!(
                    "field '{}' is not a scalar",
                    field.name
                )))
            }
        };
        if field.is_constant() {
            return Ok(match (&field.constant, field.in_version(self.acting_version)) {
                (Some(Constant::Primitive(value)), true) => Some(*value),
                (Some(Constant::Enum(name)), true) => match &field.encoding {
                    Encoding::Enum(ty) => ty
                        .value_named(name)
                        .and_then(|v| PrimitiveValue::from_i64(ty.encoding, v.value).ok()),
                    _ => None,
                },
                _ => None,
            });
        }
        if !self.is_visible(field, acting_block_length) {
            return Ok(None);
        }
        let (ty, null) = scalar;
        let value = get(buf, offset_of(block_start, field.offset)?, ty, self.order)?;
        let optional =
            field.presence == Presence::Optional || matches!(field.encoding, Encoding::Enum(_));
        if optional && is_null(&value, &null) {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn read_encoding(
        &self,
        buf: &[u8],
        offset: usize,
        encoding: &Encoding,
        presence: Presence,
    ) -> Result<FieldValue> {
        match encoding {
            Encoding::Primitive(ty) => self.read_primitive(buf, offset, ty, presence),
            Encoding::Enum(ty) => {
                let raw = get(buf, offset, ty.encoding, self.order)?;
                if raw == ty.null_value {
                    return Ok(FieldValue::Null);
                }
                let raw = raw.as_i64().ok_or_else(|| {
                    CodecError::Range(format!("enum '{}' holds a non-integer value", ty.name))
                })?;
                Ok(FieldValue::Enum(match ty.value_for(raw, self.acting_version) {
                    Some(valid) => EnumValue::Known(valid.name.clone()),
                    None => EnumValue::Unknown(raw),
                }))
            }
            Encoding::Set(ty) => {
                let raw = get_uint(buf, offset, ty.encoding, self.order)?;
                Ok(FieldValue::Set(
                    ty.choices
                        .iter()
                        .filter(|c| {
                            c.since_version <= self.acting_version && raw & (1u64 << c.bit) != 0
                        })
                        .map(|c| c.name.clone())
                        .collect(),
                ))
            }
            Encoding::Composite(ty) => {
                let mut members = BTreeMap::new();
                for member in &ty.members {
                    let value = if member.is_constant() {
                        match member.in_version(self.acting_version) {
                            true => constant_value(member),
                            false => FieldValue::Null,
                        }
                    } else if member.in_version(self.acting_version) {
                        self.read_encoding(
                            buf,
                            offset_of(offset, member.offset)?,
                            &member.encoding,
                            member.presence,
                        )?
                    } else {
                        FieldValue::Null
                    };
                    members.insert(member.name.clone(), value);
                }
                Ok(FieldValue::Composite(members))
            }
        }
    }

    fn read_primitive(
        &self,
        buf: &[u8],
        offset: usize,
        ty: &EncodedType,
        presence: Presence,
    ) -> Result<FieldValue> {
        let optional = presence == Presence::Optional;
        if ty.length == 1 {
            let value = get(buf, offset, ty.primitive, self.order)?;
            if optional && is_null(&value, &ty.null_value) {
                return Ok(FieldValue::Null);
            }
            return Ok(FieldValue::Primitive(value));
        }

        if matches!(ty.primitive, PrimitiveType::Char | PrimitiveType::UInt8) {
            let bytes = get_bytes(buf, offset, ty.size())?;
            if optional && bytes.first().copied() == ty.null_value.as_u64().map(|n| n as u8) {
                return Ok(FieldValue::Null);
            }
            return Ok(FieldValue::Bytes(bytes.to_vec()));
        }

        let size = ty.primitive.size();
        let mut values = Vec::with_capacity(ty.length);
        for i in 0..ty.length {
            values.push(get(buf, offset_of(offset, i * size)?, ty.primitive, self.order)?);
        }
        if optional && values.iter().all(|v| is_null(v, &ty.null_value)) {
            return Ok(FieldValue::Null);
        }
        Ok(FieldValue::Array(values))
    }

    /// Read a group's dimension header at `offset`.
    pub fn read_dimension(&self, buf: &[u8], offset: usize, group: &Group) -> Result<Dimension> {
        let layout = &group.dimension;
        let block_length = get_uint(buf, offset, layout.block_length, self.order)?;
        let count = get_uint(
            buf,
            offset_of(offset, layout.num_in_group_offset())?,
            layout.num_in_group,
            self.order,
        )?;
        let count = to_usize(count)?;
        if count > self.config.max_group_count {
            return Err(CodecError::Range(format!(
                "group '{}' count {count} exceeds limit {}",
                group.name, self.config.max_group_count
            )));
        }
        Ok(Dimension {
            block_length: to_usize(block_length)?,
            count,
        })
    }

    /// Borrow a var-data payload at `offset`.
    ///
    /// Returns the payload and the total bytes occupied (prefix + payload).
    /// A section that is not on the wire occupies nothing. One that is on the
    /// wire but newer than the acting version is measured and its payload
    /// reported as empty.
    pub fn read_var_data<'b>(
        &self,
        buf: &'b [u8],
        offset: usize,
        data: &VarData,
    ) -> Result<(&'b [u8], usize)> {
        if !self.data_on_wire(data) {
            return Ok((&[], 0));
        }
        let len = to_usize(get_uint(buf, offset, data.length_type, self.order)?)?;
        if len > self.config.max_var_data_length {
            return Err(CodecError::Range(format!(
                "var-data '{}' length {len} exceeds limit {}",
                data.name, self.config.max_var_data_length
            )));
        }
        let prefix = data.length_type.size();
        let payload = get_bytes(buf, offset_of(offset, prefix)?, len)?;
        let size = offset_of(prefix, len)?;
        match data.in_version(self.acting_version) {
            true => Ok((payload, size)),
            false => Ok((&[], size)),
        }
    }

    /// Offset just past the group starting at `offset`.
    pub fn group_end(
        &self,
        buf: &[u8],
        offset: usize,
        group: &Group,
        depth: usize,
    ) -> Result<usize> {
        if !self.group_on_wire(group) {
            return Ok(offset);
        }
        self.check_depth(depth)?;
        let dimension = self.read_dimension(buf, offset, group)?;
        let mut position = offset_of(offset, group.dimension.size())?;
        for _ in 0..dimension.count {
            position =
                self.element_end(buf, position, dimension.block_length, &group.block, depth + 1)?;
        }
        Ok(position)
    }

    /// Offset just past a block (message root or group element) starting at
    /// `start` whose fixed part is `acting_block_length` bytes.
    pub fn element_end(
        &self,
        buf: &[u8],
        start: usize,
        acting_block_length: usize,
        block: &Block,
        depth: usize,
    ) -> Result<usize> {
        let fixed_end = self.fixed_end(buf, start, acting_block_length)?;
        self.sections_end(buf, fixed_end, block, 0, 0, depth)
    }

    /// Walk groups from index `first_group` and var-data from `first_data`,
    /// starting at `offset`. Returns the offset past the last one.
    pub fn sections_end(
        &self,
        buf: &[u8],
        offset: usize,
        block: &Block,
        first_group: usize,
        first_data: usize,
        depth: usize,
    ) -> Result<usize> {
        let mut position = offset;
        for group in block.groups.iter().skip(first_group) {
            position = self.group_end(buf, position, group, depth)?;
        }
        for data in block.data.iter().skip(first_data) {
            position = offset_of(position, self.read_var_data(buf, position, data)?.1)?;
        }
        Ok(position)
    }

    /// End of a fixed block, checked against the buffer.
    pub fn fixed_end(&self, buf: &[u8], start: usize, acting_block_length: usize) -> Result<usize> {
        match start.checked_add(acting_block_length) {
            Some(end) if end <= buf.len() => Ok(end),
            _ => Err(CodecError::BufferUnderflow {
                offset: start,
                len: acting_block_length,
                available: buf.len(),
            }),
        }
    }

    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(CodecError::Range(format!(
                "group nesting exceeds limit {}",
                self.config.max_depth
            )));
        }
        Ok(())
    }
}

/// The value a constant field always decodes to.
pub fn constant_value(field: &Field) -> FieldValue {
    match &field.constant {
        Some(Constant::Primitive(value)) => FieldValue::Primitive(*value),
        Some(Constant::Bytes(bytes)) => FieldValue::Bytes(bytes.clone()),
        Some(Constant::Enum(name)) => FieldValue::Enum(EnumValue::Known(name.clone())),
        None => FieldValue::Null,
    }
}

/// Null comparison that treats every NaN as the float null.
pub(crate) fn is_null(value: &PrimitiveValue, null: &PrimitiveValue) -> bool {
    match (value, null) {
        (PrimitiveValue::Float(v), PrimitiveValue::Float(n)) if n.is_nan() => v.is_nan(),
        (PrimitiveValue::Double(v), PrimitiveValue::Double(n)) if n.is_nan() => v.is_nan(),
        _ => value.bit_eq(null),
    }
}

/// Checked `base + relative`.
pub fn offset_of(base: usize, relative: usize) -> Result<usize> {
    base.checked_add(relative)
        .ok_or_else(|| CodecError::Range(format!("offset {base} + {relative} overflows")))
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| CodecError::Range(format!("{value} exceeds addressable size")))
}
