//! Cursor encoder over a caller-owned buffer.
//!
//! A [`MessageEncoder`] writes the header and reserves the root block up
//! front. Groups and var-data are appended at a shared limit in wire order;
//! any in-version section the caller skips is written empty when a later
//! section is opened or the encoder finishes.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sbeprims_ir::{Block, CompositeType, EncodedType, Encoding, Field, Group, Ir, Message, VarData};
use sbeprims_primitive::{put, ByteOrder, Presence, PrimitiveValue};
use tracing::{debug, trace};

use crate::error::{CodecError, Result};
use crate::header::MessageHeader;
use crate::section::Section;
use crate::value::{EnumValue, FieldValue};
use crate::walker::{is_null, offset_of};

/// Buffer and write limit shared by a message encoder and its open groups.
#[derive(Debug)]
struct EncodeCursor<'a> {
    buf: &'a mut [u8],
    limit: usize,
    order: ByteOrder,
    acting_version: u16,
    open_groups: usize,
}

impl EncodeCursor<'_> {
    /// Claim `len` bytes at the limit. Returns their offset.
    fn reserve(&mut self, len: usize) -> Result<usize> {
        let start = self.limit;
        match start.checked_add(len) {
            Some(end) if end <= self.buf.len() => {
                self.limit = end;
                Ok(start)
            }
            _ => Err(CodecError::BufferOverflow {
                offset: start,
                len,
                capacity: self.buf.len(),
            }),
        }
    }

    /// Reserve a zeroed fixed block with optional fields set to null.
    fn reserve_block(&mut self, block: &Block, block_length: usize) -> Result<usize> {
        let start = self.reserve(block_length)?;
        self.buf[start..start + block_length].fill(0);
        write_nulls(self.buf, self.order, start, &block.fields, self.acting_version)?;
        Ok(start)
    }

    fn check_open(&self, level: usize, scope: &str) -> Result<()> {
        if self.open_groups != level {
            return Err(CodecError::Sequence(format!(
                "{scope} used while a nested group is unfinished"
            )));
        }
        Ok(())
    }

    fn write_dimension(&mut self, group: &Group, count: usize) -> Result<()> {
        if !group.in_version(self.acting_version) {
            return Ok(());
        }
        let layout = &group.dimension;
        let block_length = group.block.block_length_at(self.acting_version);
        let block_length = PrimitiveValue::from_u64(layout.block_length, block_length as u64)?;
        let count = PrimitiveValue::from_u64(layout.num_in_group, count as u64).map_err(|_| {
            CodecError::Range(format!(
                "group '{}' count {count} does not fit {}",
                group.name, layout.num_in_group
            ))
        })?;
        let start = self.reserve(layout.size())?;
        put(self.buf, start, &block_length, self.order)?;
        put(self.buf, start + layout.num_in_group_offset(), &count, self.order)?;
        Ok(())
    }

    fn write_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()> {
        if !data.in_version(self.acting_version) {
            return Ok(());
        }
        if bytes.len() as u64 > data.max_length() {
            return Err(CodecError::Range(format!(
                "var-data '{}' length {} exceeds {}",
                data.name,
                bytes.len(),
                data.max_length()
            )));
        }
        let prefix = PrimitiveValue::from_u64(data.length_type, bytes.len() as u64)?;
        let prefix_size = data.length_type.size();
        let start = self.reserve(prefix_size + bytes.len())?;
        put(self.buf, start, &prefix, self.order)?;
        self.buf[start + prefix_size..start + prefix_size + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Section state of one block being encoded.
#[derive(Debug)]
struct BlockState<'a> {
    block: &'a Block,
    scope: &'a str,
    start: usize,
    /// Open group count at which this block is the innermost writer.
    level: usize,
    section: Section,
    /// Element of a group the acting version does not carry.
    omitted: bool,
}

impl<'a> BlockState<'a> {
    fn check_field(&self, cursor: &EncodeCursor<'_>, field: &Field) -> Result<()> {
        if !self.block.owns_field(field) {
            return Err(CodecError::unknown_name(self.scope, &field.name));
        }
        cursor.check_open(self.level, self.scope)?;
        self.section.check_fields(self.scope)
    }

    fn writes(&self, cursor: &EncodeCursor<'_>, field: &Field) -> bool {
        if self.omitted || field.is_constant() {
            return false;
        }
        if !field.in_version(cursor.acting_version) {
            trace!(
                scope = self.scope,
                field = %field.name,
                "omitting field newer than acting version"
            );
            return false;
        }
        true
    }

    fn put(
        &mut self,
        cursor: &mut EncodeCursor<'_>,
        field: &Field,
        value: &FieldValue,
    ) -> Result<()> {
        self.check_field(cursor, field)?;
        if !self.writes(cursor, field) {
            return Ok(());
        }
        write_encoding(
            cursor.buf,
            cursor.order,
            offset_of(self.start, field.offset)?,
            &field.encoding,
            field.presence,
            value,
            &field.name,
            cursor.acting_version,
        )
    }

    fn put_bytes(
        &mut self,
        cursor: &mut EncodeCursor<'_>,
        field: &Field,
        bytes: &[u8],
    ) -> Result<()> {
        self.check_field(cursor, field)?;
        if !self.writes(cursor, field) {
            return Ok(());
        }
        write_padded(
            cursor.buf,
            offset_of(self.start, field.offset)?,
            bytes,
            field.size(),
            &field.name,
        )
    }

    /// Move to `target`, writing every skipped in-version section empty.
    fn enter(&mut self, cursor: &mut EncodeCursor<'_>, target: Section) -> Result<()> {
        cursor.check_open(self.level, self.scope)?;
        let groups = self.block.groups.len();
        let data = self.block.data.len();
        self.section.check_forward(target, groups, self.scope)?;

        let first_group = self.section.next_group(groups);
        let first_data = self.section.next_data(data);
        let (group_end, data_end) = match target {
            Section::AtGroup(i) => (i, first_data),
            Section::AtVarData(j) => (groups, j),
            Section::Done => (groups, data),
            Section::Unstarted | Section::AtFixedFields => (first_group, first_data),
        };
        if !self.omitted {
            for group in &self.block.groups[first_group..group_end] {
                cursor.write_dimension(group, 0)?;
            }
            for data in &self.block.data[first_data..data_end] {
                cursor.write_var_data(data, &[])?;
            }
        }
        trace!(
            scope = self.scope,
            from = %self.section,
            to = %target,
            limit = cursor.limit,
            "section transition"
        );
        self.section = target;
        Ok(())
    }

    /// Write a group's dimension header. Returns true if the group is
    /// omitted at the acting version.
    fn open_group(
        &mut self,
        cursor: &mut EncodeCursor<'_>,
        group: &Group,
        count: usize,
    ) -> Result<bool> {
        let position = self
            .block
            .group_position(group)
            .ok_or_else(|| CodecError::unknown_name(self.scope, &group.name))?;
        self.enter(cursor, Section::AtGroup(position))?;
        if self.omitted {
            return Ok(true);
        }
        if !group.in_version(cursor.acting_version) {
            trace!(
                scope = self.scope,
                group = %group.name,
                "omitting group newer than acting version"
            );
            return Ok(true);
        }
        cursor.write_dimension(group, count)?;
        Ok(false)
    }

    fn put_var_data(
        &mut self,
        cursor: &mut EncodeCursor<'_>,
        data: &VarData,
        bytes: &[u8],
    ) -> Result<()> {
        let position = self
            .block
            .data_position(data)
            .ok_or_else(|| CodecError::unknown_name(self.scope, &data.name))?;
        self.enter(cursor, Section::AtVarData(position))?;
        if self.omitted {
            return Ok(());
        }
        if !data.in_version(cursor.acting_version) {
            trace!(
                scope = self.scope,
                data = %data.name,
                "omitting var-data newer than acting version"
            );
            return Ok(());
        }
        cursor.write_var_data(data, bytes)
    }
}

/// Cursor encoder for one message.
#[derive(Debug)]
pub struct MessageEncoder<'a> {
    message: &'a Message,
    offset: usize,
    cursor: EncodeCursor<'a>,
    root: BlockState<'a>,
}

impl<'a> MessageEncoder<'a> {
    /// Write the header for `message` at `offset` and reserve its block.
    ///
    /// Fails with `BufferOverflow`, leaving the buffer untouched, if header
    /// and block do not fit.
    pub fn wrap(
        ir: &'a Ir,
        message: &'a Message,
        buf: &'a mut [u8],
        offset: usize,
        acting_version: u16,
    ) -> Result<Self> {
        if acting_version > ir.version() {
            return Err(CodecError::Range(format!(
                "acting version {acting_version} is newer than schema version {}",
                ir.version()
            )));
        }
        if message.since_version > acting_version {
            return Err(CodecError::Range(format!(
                "message '{}' does not exist at version {acting_version}",
                message.name
            )));
        }

        let block_length = message.block_length_at(acting_version);
        let header_size = ir.header().size();
        let len = header_size + block_length;
        match offset.checked_add(len) {
            Some(end) if end <= buf.len() => {}
            _ => {
                return Err(CodecError::BufferOverflow {
                    offset,
                    len,
                    capacity: buf.len(),
                })
            }
        }

        let header = MessageHeader {
            block_length,
            template_id: message.id,
            schema_id: ir.schema_id(),
            version: acting_version,
        };
        header.write(ir, buf, offset)?;
        if acting_version < ir.version() {
            debug!(
                message = %message.name,
                acting_version,
                schema_version = ir.version(),
                "encoding for an older schema version, newer fields are omitted"
            );
        }

        let mut cursor = EncodeCursor {
            buf,
            limit: offset + header_size,
            order: ir.byte_order(),
            acting_version,
            open_groups: 0,
        };
        let start = cursor.reserve_block(&message.block, block_length)?;
        Ok(Self {
            message,
            offset,
            cursor,
            root: BlockState {
                block: &message.block,
                scope: &message.name,
                start,
                level: 0,
                section: Section::AtFixedFields,
                omitted: false,
            },
        })
    }

    pub fn message(&self) -> &'a Message {
        self.message
    }

    pub fn acting_version(&self) -> u16 {
        self.cursor.acting_version
    }

    /// Write a fixed field. Fields newer than the acting version and constant
    /// fields are accepted and not written.
    pub fn put(&mut self, field: &Field, value: impl Into<FieldValue>) -> Result<()> {
        self.put_value(field, &value.into())
    }

    pub fn put_value(&mut self, field: &Field, value: &FieldValue) -> Result<()> {
        self.root.put(&mut self.cursor, field, value)
    }

    /// Copy raw bytes into a fixed field, zero padding to its size.
    pub fn put_bytes(&mut self, field: &Field, bytes: &[u8]) -> Result<()> {
        self.root.put_bytes(&mut self.cursor, field, bytes)
    }

    /// Open a group of `count` elements. The returned encoder must be
    /// [`finish`](GroupEncoder::finish)ed before the next section.
    pub fn group(&mut self, group: &'a Group, count: usize) -> Result<GroupEncoder<'_, 'a>> {
        let omitted = self.root.open_group(&mut self.cursor, group, count)?;
        Ok(GroupEncoder::open(&mut self.cursor, group, count, omitted))
    }

    pub fn put_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()> {
        self.root.put_var_data(&mut self.cursor, data, bytes)
    }

    /// Bytes written so far, header included.
    pub fn encoded_length(&self) -> usize {
        self.cursor.limit - self.offset
    }

    /// Write any remaining sections empty and return the total length.
    pub fn finish(mut self) -> Result<usize> {
        self.root.enter(&mut self.cursor, Section::Done)?;
        Ok(self.encoded_length())
    }
}

/// Writer for the elements of one group.
#[derive(Debug)]
pub struct GroupEncoder<'s, 'a> {
    cursor: &'s mut EncodeCursor<'a>,
    group: &'a Group,
    count: usize,
    index: usize,
    level: usize,
    omitted: bool,
    element: Option<BlockState<'a>>,
}

impl<'s, 'a> GroupEncoder<'s, 'a> {
    fn open(
        cursor: &'s mut EncodeCursor<'a>,
        group: &'a Group,
        count: usize,
        omitted: bool,
    ) -> Self {
        cursor.open_groups += 1;
        let level = cursor.open_groups;
        Self {
            cursor,
            group,
            count,
            index: 0,
            level,
            omitted,
            element: None,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of elements started so far.
    pub fn index(&self) -> usize {
        self.index
    }

    fn close_element(&mut self) -> Result<()> {
        if let Some(mut element) = self.element.take() {
            element.enter(&mut *self.cursor, Section::Done)?;
        }
        Ok(())
    }

    /// Start the next element.
    pub fn next(&mut self) -> Result<()> {
        self.cursor.check_open(self.level, &self.group.name)?;
        self.close_element()?;
        if self.index == self.count {
            return Err(CodecError::Sequence(format!(
                "group '{}' declared {} elements",
                self.group.name, self.count
            )));
        }
        let start = if self.omitted {
            self.cursor.limit
        } else {
            let block_length = self.group.block.block_length_at(self.cursor.acting_version);
            self.cursor.reserve_block(&self.group.block, block_length)?
        };
        self.index += 1;
        self.element = Some(BlockState {
            block: &self.group.block,
            scope: &self.group.name,
            start,
            level: self.level,
            section: Section::AtFixedFields,
            omitted: self.omitted,
        });
        Ok(())
    }

    fn parts(&mut self) -> Result<(&mut BlockState<'a>, &mut EncodeCursor<'a>)> {
        match self.element.as_mut() {
            Some(element) => Ok((element, &mut *self.cursor)),
            None => Err(CodecError::Sequence(format!(
                "group '{}' written before next()",
                self.group.name
            ))),
        }
    }

    pub fn put(&mut self, field: &Field, value: impl Into<FieldValue>) -> Result<()> {
        self.put_value(field, &value.into())
    }

    pub fn put_value(&mut self, field: &Field, value: &FieldValue) -> Result<()> {
        let (element, cursor) = self.parts()?;
        element.put(cursor, field, value)
    }

    pub fn put_bytes(&mut self, field: &Field, bytes: &[u8]) -> Result<()> {
        let (element, cursor) = self.parts()?;
        element.put_bytes(cursor, field, bytes)
    }

    /// Open a group nested in the current element.
    pub fn group(&mut self, group: &'a Group, count: usize) -> Result<GroupEncoder<'_, 'a>> {
        let (element, cursor) = self.parts()?;
        let omitted = element.open_group(cursor, group, count)?;
        Ok(GroupEncoder::open(&mut *self.cursor, group, count, omitted))
    }

    pub fn put_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()> {
        let (element, cursor) = self.parts()?;
        element.put_var_data(cursor, data, bytes)
    }

    /// Close the group. Fails if fewer elements than declared were written.
    pub fn finish(mut self) -> Result<()> {
        self.cursor.check_open(self.level, &self.group.name)?;
        self.close_element()?;
        if self.index != self.count {
            return Err(CodecError::Sequence(format!(
                "group '{}' finished after {} of {} elements",
                self.group.name, self.index, self.count
            )));
        }
        self.cursor.open_groups -= 1;
        Ok(())
    }
}

/// Sections a value encoder can write into: a message root or a group
/// element.
pub(crate) trait BlockWriter<'a> {
    fn put_value(&mut self, field: &Field, value: &FieldValue) -> Result<()>;
    fn group(&mut self, group: &'a Group, count: usize) -> Result<GroupEncoder<'_, 'a>>;
    fn put_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()>;
}

impl<'a> BlockWriter<'a> for MessageEncoder<'a> {
    fn put_value(&mut self, field: &Field, value: &FieldValue) -> Result<()> {
        MessageEncoder::put_value(self, field, value)
    }

    fn group(&mut self, group: &'a Group, count: usize) -> Result<GroupEncoder<'_, 'a>> {
        MessageEncoder::group(self, group, count)
    }

    fn put_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()> {
        MessageEncoder::put_var_data(self, data, bytes)
    }
}

impl<'a> BlockWriter<'a> for GroupEncoder<'_, 'a> {
    fn put_value(&mut self, field: &Field, value: &FieldValue) -> Result<()> {
        GroupEncoder::put_value(self, field, value)
    }

    fn group(&mut self, group: &'a Group, count: usize) -> Result<GroupEncoder<'_, 'a>> {
        GroupEncoder::group(self, group, count)
    }

    fn put_var_data(&mut self, data: &VarData, bytes: &[u8]) -> Result<()> {
        GroupEncoder::put_var_data(self, data, bytes)
    }
}

fn write_nulls(
    buf: &mut [u8],
    order: ByteOrder,
    base: usize,
    fields: &[Field],
    acting_version: u16,
) -> Result<()> {
    for field in fields {
        if field.is_constant() || !field.in_version(acting_version) {
            continue;
        }
        let offset = offset_of(base, field.offset)?;
        match &field.encoding {
            Encoding::Primitive(ty) if field.is_optional() => {
                let size = ty.primitive.size();
                for i in 0..ty.length {
                    put(buf, offset + i * size, &ty.null_value, order)?;
                }
            }
            Encoding::Enum(ty) if field.is_optional() => {
                put(buf, offset, &ty.null_value, order)?;
            }
            Encoding::Composite(ty) => {
                write_nulls(buf, order, offset, &ty.members, acting_version)?
            }
            _ => {}
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_encoding(
    buf: &mut [u8],
    order: ByteOrder,
    offset: usize,
    encoding: &Encoding,
    presence: Presence,
    value: &FieldValue,
    name: &str,
    acting_version: u16,
) -> Result<()> {
    let optional = presence == Presence::Optional;
    match (encoding, value) {
        (Encoding::Set(ty), FieldValue::Null) => {
            put(buf, offset, &PrimitiveValue::from_u64(ty.encoding, 0)?, order)?;
        }
        (Encoding::Composite(ty), FieldValue::Null) => {
            write_composite(buf, order, offset, ty, &BTreeMap::new(), acting_version)?;
        }
        (Encoding::Primitive(ty), FieldValue::Null) if optional => {
            let size = ty.primitive.size();
            for i in 0..ty.length {
                put(buf, offset + i * size, &ty.null_value, order)?;
            }
        }
        (Encoding::Enum(ty), FieldValue::Null) if optional => {
            put(buf, offset, &ty.null_value, order)?;
        }
        (_, FieldValue::Null) => {
            return Err(CodecError::Range(format!("field '{name}' is required")));
        }
        (Encoding::Primitive(ty), FieldValue::Primitive(value)) if ty.length == 1 => {
            let value = checked(ty, *value, optional, name)?;
            put(buf, offset, &value, order)?;
        }
        (Encoding::Primitive(ty), FieldValue::Bytes(bytes)) if ty.primitive.size() == 1 => {
            write_padded(buf, offset, bytes, ty.size(), name)?;
        }
        (Encoding::Primitive(ty), FieldValue::Array(values)) => {
            if values.len() > ty.length {
                return Err(CodecError::Range(format!(
                    "field '{name}' holds {} elements, got {}",
                    ty.length,
                    values.len()
                )));
            }
            check_extent(buf, offset, ty.size())?;
            let size = ty.primitive.size();
            let pad = match optional {
                true => ty.null_value,
                false => PrimitiveValue::from_u64(ty.primitive, 0)?,
            };
            for i in 0..ty.length {
                let value = match values.get(i) {
                    Some(value) => checked(ty, *value, optional, name)?,
                    None => pad,
                };
                put(buf, offset + i * size, &value, order)?;
            }
        }
        (Encoding::Enum(ty), FieldValue::Enum(value)) => {
            let raw = match value {
                EnumValue::Known(valid) => {
                    ty.value_named(valid)
                        .ok_or_else(|| CodecError::unknown_name(&ty.name, valid))?
                        .value
                }
                EnumValue::Unknown(raw) => *raw,
            };
            put(buf, offset, &PrimitiveValue::from_i64(ty.encoding, raw)?, order)?;
        }
        (Encoding::Enum(ty), FieldValue::Primitive(raw)) => {
            put(buf, offset, &raw.cast_to(ty.encoding)?, order)?;
        }
        (Encoding::Set(ty), FieldValue::Set(names)) => {
            let mut bits = 0u64;
            for choice in names {
                let choice = ty
                    .choice_named(choice)
                    .ok_or_else(|| CodecError::unknown_name(&ty.name, choice))?;
                bits |= 1u64 << choice.bit;
            }
            put(buf, offset, &PrimitiveValue::from_u64(ty.encoding, bits)?, order)?;
        }
        (Encoding::Set(ty), FieldValue::Primitive(raw)) => {
            put(buf, offset, &raw.cast_to(ty.encoding)?, order)?;
        }
        (Encoding::Composite(ty), FieldValue::Composite(members)) => {
            write_composite(buf, order, offset, ty, members, acting_version)?;
        }
        (encoding, other) => {
            return Err(CodecError::Range(format!(
                "field '{name}' of type '{}' cannot hold {}",
                encoding.name(),
                describe(other)
            )));
        }
    }
    Ok(())
}

fn write_composite(
    buf: &mut [u8],
    order: ByteOrder,
    offset: usize,
    ty: &CompositeType,
    members: &BTreeMap<String, FieldValue>,
    acting_version: u16,
) -> Result<()> {
    if let Some(unknown) = members.keys().find(|key| ty.member(key).is_none()) {
        return Err(CodecError::unknown_name(&ty.name, unknown));
    }
    for member in &ty.members {
        if member.is_constant() || !member.in_version(acting_version) {
            continue;
        }
        let value = members.get(&member.name).unwrap_or(&FieldValue::Null);
        write_encoding(
            buf,
            order,
            offset_of(offset, member.offset)?,
            &member.encoding,
            member.presence,
            value,
            &member.name,
            acting_version,
        )?;
    }
    Ok(())
}

/// Cast `value` to the field's type and check its declared limits.
fn checked(
    ty: &EncodedType,
    value: PrimitiveValue,
    optional: bool,
    name: &str,
) -> Result<PrimitiveValue> {
    let value = value.cast_to(ty.primitive)?;
    if optional && is_null(&value, &ty.null_value) {
        return Ok(value);
    }
    let below = compare(&value, &ty.min_value).is_none_or(|o| o == Ordering::Less);
    let above = compare(&value, &ty.max_value).is_none_or(|o| o == Ordering::Greater);
    if below || above {
        return Err(CodecError::Range(format!(
            "field '{name}' value {value} outside [{}, {}]",
            ty.min_value, ty.max_value
        )));
    }
    Ok(value)
}

fn compare(a: &PrimitiveValue, b: &PrimitiveValue) -> Option<Ordering> {
    if a.primitive_type().is_float() {
        return a.as_f64().partial_cmp(&b.as_f64());
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => Some(a.as_u64()?.cmp(&b.as_u64()?)),
    }
}

fn check_extent(buf: &[u8], offset: usize, len: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(end),
        _ => Err(CodecError::BufferOverflow {
            offset,
            len,
            capacity: buf.len(),
        }),
    }
}

fn write_padded(
    buf: &mut [u8],
    offset: usize,
    bytes: &[u8],
    size: usize,
    name: &str,
) -> Result<()> {
    if bytes.len() > size {
        return Err(CodecError::Range(format!(
            "field '{name}' holds {size} bytes, got {}",
            bytes.len()
        )));
    }
    let end = check_extent(buf, offset, size)?;
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    buf[offset + bytes.len()..end].fill(0);
    Ok(())
}

fn describe(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Primitive(_) => "a primitive",
        FieldValue::Array(_) => "an array",
        FieldValue::Bytes(_) => "bytes",
        FieldValue::Enum(_) => "an enum",
        FieldValue::Set(_) => "a set",
        FieldValue::Composite(_) => "a composite",
    }
}
