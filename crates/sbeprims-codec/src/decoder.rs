//! Zero-copy cursor decoder.
//!
//! Decoders borrow the buffer and the IR. Sections are visited forward only;
//! the start of each group or var-data section is recomputed from the end of
//! the previous one by the shared [`Walker`], so group decoders hold no
//! reference back into their parent.

use sbeprims_ir::{Block, Encoding, Field, Group, Ir, Message, VarData};
use sbeprims_primitive::{get_bytes, PrimitiveValue};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::error::{CodecError, Result};
use crate::header::MessageHeader;
use crate::section::Section;
use crate::value::{EnumValue, FieldValue};
use crate::walker::{offset_of, Dimension, Walker};

/// Cursor over one block: a message root or one group element.
#[derive(Debug)]
pub struct BlockDecoder<'a> {
    walker: Walker,
    buf: &'a [u8],
    block: &'a Block,
    scope: &'a str,
    start: usize,
    acting_block_length: usize,
    depth: usize,
    section: Section,
    section_start: usize,
}

impl<'a> BlockDecoder<'a> {
    fn new(
        walker: Walker,
        buf: &'a [u8],
        block: &'a Block,
        scope: &'a str,
        start: usize,
        acting_block_length: usize,
        depth: usize,
    ) -> Self {
        Self {
            walker,
            buf,
            block,
            scope,
            start,
            acting_block_length,
            depth,
            section: Section::AtFixedFields,
            section_start: start,
        }
    }

    /// Offset of the block's first byte.
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn acting_block_length(&self) -> usize {
        self.acting_block_length
    }

    pub fn acting_version(&self) -> u16 {
        self.walker.acting_version()
    }

    pub fn section(&self) -> Section {
        self.section
    }

    fn check_field(&self, field: &Field) -> Result<()> {
        if !self.block.owns_field(field) {
            return Err(CodecError::unknown_name(self.scope, &field.name));
        }
        self.section.check_fields(self.scope)
    }

    /// Decode `field` as an owned value. Invisible fields decode as
    /// [`FieldValue::Null`].
    pub fn get(&self, field: &Field) -> Result<FieldValue> {
        self.check_field(field)?;
        self.walker
            .read_field(self.buf, self.start, self.acting_block_length, field)
    }

    /// Decode a scalar primitive, enum or set field without allocating.
    ///
    /// Returns `None` for null and invisible fields.
    pub fn get_primitive(&self, field: &Field) -> Result<Option<PrimitiveValue>> {
        self.check_field(field)?;
        self.walker
            .read_raw(self.buf, self.start, self.acting_block_length, field)
    }

    /// Borrow a fixed field's raw bytes. Invisible and constant fields yield
    /// an empty slice.
    pub fn get_bytes(&self, field: &Field) -> Result<&'a [u8]> {
        self.check_field(field)?;
        if field.is_constant() || !self.walker.is_visible(field, self.acting_block_length) {
            return Ok(&[]);
        }
        Ok(get_bytes(
            self.buf,
            offset_of(self.start, field.offset)?,
            field.size(),
        )?)
    }

    pub fn get_enum(&self, field: &Field) -> Result<Option<EnumValue>> {
        if !matches!(field.encoding, Encoding::Enum(_)) {
            return Err(CodecError::Range(format!("field '{}' is not an enum", field.name)));
        }
        match self.get(field)? {
            FieldValue::Enum(value) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Move to `target`, walking over every section in between. Returns the
    /// offset where `target` starts.
    fn seek(&mut self, target: Section) -> Result<usize> {
        let groups = self.block.groups.len();
        self.section.check_forward(target, groups, self.scope)?;

        let mut offset = match self.section {
            Section::Unstarted | Section::AtFixedFields => {
                self.walker
                    .fixed_end(self.buf, self.start, self.acting_block_length)?
            }
            Section::AtGroup(i) => self.walker.group_end(
                self.buf,
                self.section_start,
                &self.block.groups[i],
                self.depth,
            )?,
            Section::AtVarData(j) => {
                let (_, size) =
                    self.walker
                        .read_var_data(self.buf, self.section_start, &self.block.data[j])?;
                offset_of(self.section_start, size)?
            }
            Section::Done => self.section_start,
        };

        let first_group = self.section.next_group(groups);
        let first_data = self.section.next_data(self.block.data.len());
        match target {
            Section::AtGroup(i) => {
                for group in &self.block.groups[first_group..i] {
                    offset = self.walker.group_end(self.buf, offset, group, self.depth)?;
                }
            }
            Section::AtVarData(j) => {
                for group in &self.block.groups[first_group..] {
                    offset = self.walker.group_end(self.buf, offset, group, self.depth)?;
                }
                for data in &self.block.data[first_data..j] {
                    let (_, size) = self.walker.read_var_data(self.buf, offset, data)?;
                    offset = offset_of(offset, size)?;
                }
            }
            Section::Done => {
                offset = self.walker.sections_end(
                    self.buf,
                    offset,
                    self.block,
                    first_group,
                    first_data,
                    self.depth,
                )?;
            }
            Section::Unstarted | Section::AtFixedFields => {}
        }

        trace!(
            scope = self.scope,
            from = %self.section,
            to = %target,
            offset,
            "section transition"
        );
        self.section = target;
        self.section_start = offset;
        Ok(offset)
    }

    /// Open a repeating group. Groups the acting version does not carry
    /// yield an empty decoder.
    pub fn group(&mut self, group: &'a Group) -> Result<GroupDecoder<'a>> {
        let position = self
            .block
            .group_position(group)
            .ok_or_else(|| CodecError::unknown_name(self.scope, &group.name))?;
        let offset = self.seek(Section::AtGroup(position))?;

        if !group.in_version(self.walker.acting_version()) {
            return Ok(GroupDecoder::empty(self.walker, self.buf, group, offset, self.depth + 1));
        }
        self.walker.check_depth(self.depth)?;
        let dimension = self.walker.read_dimension(self.buf, offset, group)?;
        Ok(GroupDecoder {
            walker: self.walker,
            buf: self.buf,
            group,
            depth: self.depth + 1,
            dimension,
            offset,
            index: 0,
            next_start: offset_of(offset, group.dimension.size())?,
            current: None,
        })
    }

    /// Borrow a var-data payload. Sections the acting version does not carry
    /// yield an empty slice.
    pub fn var_data(&mut self, data: &VarData) -> Result<&'a [u8]> {
        let position = self
            .block
            .data_position(data)
            .ok_or_else(|| CodecError::unknown_name(self.scope, &data.name))?;
        let offset = self.seek(Section::AtVarData(position))?;
        let (payload, _) = self.walker.read_var_data(self.buf, offset, data)?;
        Ok(payload)
    }

    /// Offset just past this block and everything nested in it.
    ///
    /// Walks from the block start, so it does not depend on how far the
    /// cursor has moved.
    pub fn end_offset(&self) -> Result<usize> {
        self.walker.element_end(
            self.buf,
            self.start,
            self.acting_block_length,
            self.block,
            self.depth,
        )
    }

    /// Bytes from the block start to the end of its last section.
    pub fn encoded_length(&self) -> Result<usize> {
        Ok(self.end_offset()? - self.start)
    }
}

/// Iterator-like cursor over the elements of one group.
#[derive(Debug)]
pub struct GroupDecoder<'a> {
    walker: Walker,
    buf: &'a [u8],
    group: &'a Group,
    depth: usize,
    dimension: Dimension,
    offset: usize,
    index: usize,
    next_start: usize,
    current: Option<usize>,
}

impl<'a> GroupDecoder<'a> {
    fn empty(walker: Walker, buf: &'a [u8], group: &'a Group, offset: usize, depth: usize) -> Self {
        Self {
            walker,
            buf,
            group,
            depth,
            dimension: Dimension {
                block_length: 0,
                count: 0,
            },
            offset,
            index: 0,
            next_start: offset,
            current: None,
        }
    }

    pub fn group(&self) -> &'a Group {
        self.group
    }

    /// Element count from the dimension header.
    pub fn count(&self) -> usize {
        self.dimension.count
    }

    /// Element block length from the dimension header.
    pub fn block_length(&self) -> usize {
        self.dimension.block_length
    }

    /// Number of elements returned so far.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance to the next element, or `None` when all have been visited.
    ///
    /// Each element starts where the previous one ends, including any
    /// trailing fields, groups and var-data it carries.
    pub fn next(&mut self) -> Result<Option<BlockDecoder<'a>>> {
        if let Some(start) = self.current.take() {
            self.next_start = self.walker.element_end(
                self.buf,
                start,
                self.dimension.block_length,
                &self.group.block,
                self.depth,
            )?;
        }
        if self.index == self.dimension.count {
            return Ok(None);
        }
        let start = self.next_start;
        self.walker
            .fixed_end(self.buf, start, self.dimension.block_length)?;
        self.current = Some(start);
        self.index += 1;
        Ok(Some(BlockDecoder::new(
            self.walker,
            self.buf,
            &self.group.block,
            &self.group.name,
            start,
            self.dimension.block_length,
            self.depth,
        )))
    }

    /// Offset just past the whole group.
    pub fn end_offset(&self) -> Result<usize> {
        self.walker
            .group_end(self.buf, self.offset, self.group, self.depth - 1)
    }
}

/// Cursor decoder for one message.
#[derive(Debug)]
pub struct MessageDecoder<'a> {
    message: &'a Message,
    header: Option<MessageHeader>,
    message_start: usize,
    root: BlockDecoder<'a>,
}

impl<'a> MessageDecoder<'a> {
    /// Decode the block of `message` starting at `offset` (just past any
    /// header), as encoded with `acting_block_length` and `acting_version`.
    pub fn wrap(
        ir: &'a Ir,
        message: &'a Message,
        buf: &'a [u8],
        offset: usize,
        acting_block_length: usize,
        acting_version: u16,
    ) -> Result<Self> {
        Self::wrap_with_config(
            ir,
            message,
            buf,
            offset,
            acting_block_length,
            acting_version,
            DecoderConfig::default(),
        )
    }

    pub fn wrap_with_config(
        ir: &'a Ir,
        message: &'a Message,
        buf: &'a [u8],
        offset: usize,
        acting_block_length: usize,
        acting_version: u16,
        config: DecoderConfig,
    ) -> Result<Self> {
        let walker = Walker::new(ir, acting_version, config);
        walker.fixed_end(buf, offset, acting_block_length)?;
        if acting_block_length > message.block_length() {
            debug!(
                message = %message.name,
                acting_block_length,
                block_length = message.block_length(),
                "skipping trailing block bytes from a newer schema"
            );
        }
        Ok(Self {
            message,
            header: None,
            message_start: offset,
            root: BlockDecoder::new(
                walker,
                buf,
                &message.block,
                &message.name,
                offset,
                acting_block_length,
                0,
            ),
        })
    }

    /// Read the message header at `offset` and decode the message it names.
    pub fn from_header(ir: &'a Ir, buf: &'a [u8], offset: usize) -> Result<Self> {
        Self::from_header_with_config(ir, buf, offset, DecoderConfig::default())
    }

    pub fn from_header_with_config(
        ir: &'a Ir,
        buf: &'a [u8],
        offset: usize,
        config: DecoderConfig,
    ) -> Result<Self> {
        let header = MessageHeader::read(ir, buf, offset)?;
        if header.schema_id != ir.schema_id() {
            return Err(CodecError::SchemaMismatch {
                expected: ir.schema_id(),
                actual: header.schema_id,
            });
        }
        let message = ir
            .message_by_id(header.template_id)
            .ok_or(CodecError::UnknownTemplate(header.template_id))?;
        if header.version != ir.version() {
            debug!(
                message = %message.name,
                encoded_version = header.version,
                schema_version = ir.version(),
                "decoding across schema versions"
            );
        }
        let block_start = offset_of(offset, ir.header().size())?;
        let mut decoder = Self::wrap_with_config(
            ir,
            message,
            buf,
            block_start,
            header.block_length,
            header.version,
            config,
        )?;
        decoder.header = Some(header);
        decoder.message_start = offset;
        Ok(decoder)
    }

    /// Report only what a reader at `acting_version` knows, while sections
    /// are still sized by the version the message was encoded with.
    ///
    /// Must be called before any section is read. Versions at or above the
    /// encoded version change nothing.
    pub fn viewed_as(mut self, acting_version: u16) -> Self {
        self.root.walker = self.root.walker.viewed_as(acting_version);
        self
    }

    pub fn message(&self) -> &'a Message {
        self.message
    }

    /// The header, when built with [`from_header`](Self::from_header).
    pub fn header(&self) -> Option<&MessageHeader> {
        self.header.as_ref()
    }

    pub fn acting_version(&self) -> u16 {
        self.root.acting_version()
    }

    pub fn acting_block_length(&self) -> usize {
        self.root.acting_block_length()
    }

    /// The root block cursor.
    pub fn root(&mut self) -> &mut BlockDecoder<'a> {
        &mut self.root
    }

    pub fn get(&self, field: &Field) -> Result<FieldValue> {
        self.root.get(field)
    }

    pub fn get_primitive(&self, field: &Field) -> Result<Option<PrimitiveValue>> {
        self.root.get_primitive(field)
    }

    pub fn get_bytes(&self, field: &Field) -> Result<&'a [u8]> {
        self.root.get_bytes(field)
    }

    pub fn get_enum(&self, field: &Field) -> Result<Option<EnumValue>> {
        self.root.get_enum(field)
    }

    pub fn group(&mut self, group: &'a Group) -> Result<GroupDecoder<'a>> {
        self.root.group(group)
    }

    pub fn var_data(&mut self, data: &VarData) -> Result<&'a [u8]> {
        self.root.var_data(data)
    }

    /// Total encoded length from the message start (the header, when
    /// present) to the end of its last section.
    pub fn encoded_length(&self) -> Result<usize> {
        Ok(self.root.end_offset()? - self.message_start)
    }
}
