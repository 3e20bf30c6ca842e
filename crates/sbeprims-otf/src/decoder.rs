//! Interpreting decoder: walks a message straight from the IR and reports
//! everything it finds to a [`Visitor`].

use sbeprims_codec::{elements, offset_of, CodecError, Element, MessageHeader, Walker};
use sbeprims_ir::{Block, Ir, IrRegistry, Message};
use tracing::debug;

use crate::config::OtfConfig;
use crate::error::{OtfError, Result};
use crate::visitor::Visitor;

/// Decodes messages of one schema without generated code.
#[derive(Debug, Clone, Copy)]
pub struct OtfDecoder<'a> {
    ir: &'a Ir,
    config: OtfConfig,
}

impl<'a> OtfDecoder<'a> {
    pub fn new(ir: &'a Ir) -> Self {
        Self::with_config(ir, OtfConfig::default())
    }

    pub fn with_config(ir: &'a Ir, config: OtfConfig) -> Self {
        Self { ir, config }
    }

    pub fn ir(&self) -> &'a Ir {
        self.ir
    }

    /// Read the header at `offset`, then walk the message it names.
    ///
    /// Returns the bytes consumed, header included.
    pub fn decode<V: Visitor>(&self, buf: &[u8], offset: usize, visitor: V) -> Result<usize> {
        self.decode_as(buf, offset, u16::MAX, visitor)
    }

    /// Like [`decode`](Self::decode), reporting only what a reader at
    /// `acting_version` knows. Newer sections are still walked over.
    ///
    /// Returns the bytes consumed, header included.
    pub fn decode_as<V: Visitor>(
        &self,
        buf: &[u8],
        offset: usize,
        acting_version: u16,
        mut visitor: V,
    ) -> Result<usize> {
        let header = MessageHeader::read(self.ir, buf, offset)?;
        if header.schema_id != self.ir.schema_id() {
            return Err(CodecError::SchemaMismatch {
                expected: self.ir.schema_id(),
                actual: header.schema_id,
            }
            .into());
        }
        let message = self
            .ir
            .message_by_id(header.template_id)
            .ok_or(CodecError::UnknownTemplate(header.template_id))?;
        if header.version != self.ir.version() {
            debug!(
                message = %message.name,
                encoded_version = header.version,
                schema_version = self.ir.version(),
                "decoding across schema versions"
            );
        }
        let start = offset_of(offset, self.ir.header().size())?;
        let walker = Walker::new(self.ir, header.version, self.config.decoder)
            .viewed_as(acting_version);
        let end = self.walk(
            &walker,
            buf,
            start,
            message,
            header.block_length,
            Some(&header),
            &mut visitor,
        )?;
        Ok(end - offset)
    }

    /// Walk a bare message block at `offset` with no header.
    ///
    /// Returns the bytes consumed.
    pub fn decode_template<V: Visitor>(
        &self,
        buf: &[u8],
        offset: usize,
        template_id: u16,
        acting_block_length: usize,
        acting_version: u16,
        mut visitor: V,
    ) -> Result<usize> {
        let message = self
            .ir
            .message_by_id(template_id)
            .ok_or(CodecError::UnknownTemplate(template_id))?;
        let walker = Walker::new(self.ir, acting_version, self.config.decoder);
        let end = self.walk(
            &walker,
            buf,
            offset,
            message,
            acting_block_length,
            None,
            &mut visitor,
        )?;
        Ok(end - offset)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk<V: Visitor>(
        &self,
        walker: &Walker,
        buf: &[u8],
        start: usize,
        message: &Message,
        acting_block_length: usize,
        header: Option<&MessageHeader>,
        visitor: &mut V,
    ) -> Result<usize> {
        walker.fixed_end(buf, start, acting_block_length)?;
        if acting_block_length > message.block_length() {
            debug!(
                message = %message.name,
                acting_block_length,
                block_length = message.block_length(),
                "skipping trailing block bytes from a newer schema"
            );
        }
        visitor.on_begin_message(message, header);
        let end = walk_block(walker, buf, start, acting_block_length, &message.block, 0, visitor)?;
        visitor.on_end_message(message);
        Ok(end)
    }
}

/// Report one block and everything nested in it. Returns the offset just
/// past it.
fn walk_block<V: Visitor>(
    walker: &Walker,
    buf: &[u8],
    start: usize,
    acting_block_length: usize,
    block: &Block,
    depth: usize,
    visitor: &mut V,
) -> Result<usize> {
    let version = walker.acting_version();
    let mut position = walker.fixed_end(buf, start, acting_block_length)?;
    for element in elements(block) {
        match element {
            Element::Field(field) => {
                if field.in_version(version) {
                    let value = walker.read_field(buf, start, acting_block_length, field)?;
                    visitor.on_field(field, &value);
                }
            }
            Element::Group(group) => {
                if !walker.group_on_wire(group) {
                    continue;
                }
                if !group.in_version(version) {
                    position = walker.group_end(buf, position, group, depth)?;
                    continue;
                }
                walker.check_depth(depth)?;
                let dimension = walker.read_dimension(buf, position, group)?;
                position = offset_of(position, group.dimension.size())?;
                visitor.on_begin_group(group, dimension.count);
                for index in 0..dimension.count {
                    visitor.on_begin_group_element(group, index);
                    position = walk_block(
                        walker,
                        buf,
                        position,
                        dimension.block_length,
                        &group.block,
                        depth + 1,
                        visitor,
                    )?;
                    visitor.on_end_group_element(group, index);
                }
                visitor.on_end_group(group);
            }
            Element::Data(data) => {
                let (payload, size) = walker.read_var_data(buf, position, data)?;
                if data.in_version(version) {
                    visitor.on_var_data(data, payload);
                }
                position = offset_of(position, size)?;
            }
        }
    }
    Ok(position)
}

/// Decode a message with whichever registered schema its header names.
///
/// Each registered IR reads the header with its own layout; the first whose
/// schema id matches decodes the message.
pub fn decode_with_registry<V: Visitor>(
    registry: &IrRegistry,
    buf: &[u8],
    offset: usize,
    config: OtfConfig,
    visitor: V,
) -> Result<usize> {
    for schema_id in registry.schema_ids() {
        let ir = registry.get(schema_id)?;
        match MessageHeader::read(&ir, buf, offset) {
            Ok(header) if header.schema_id == schema_id => {
                return OtfDecoder::with_config(&ir, config).decode(buf, offset, visitor);
            }
            _ => continue,
        }
    }
    Err(OtfError::NoMatchingSchema { offset })
}
