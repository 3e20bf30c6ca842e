use sbeprims_ir::Ir;
use sbeprims_primitive::{get_uint, put_uint};
use serde::Serialize;

use crate::error::{CodecError, Result};

/// The header preceding every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    /// Root block length of the encoded message.
    pub block_length: usize,
    pub template_id: u16,
    pub schema_id: u16,
    /// Schema version the message was encoded with.
    pub version: u16,
}

impl MessageHeader {
    /// Read a header laid out per `ir`'s header layout.
    pub fn read(ir: &Ir, buf: &[u8], offset: usize) -> Result<Self> {
        let layout = ir.header();
        let order = ir.byte_order();
        let at = |field_offset: usize| {
            offset
                .checked_add(field_offset)
                .ok_or_else(|| CodecError::BufferUnderflow {
                    offset,
                    len: layout.size(),
                    available: buf.len(),
                })
        };

        let block_length = get_uint(
            buf,
            at(layout.block_length_offset())?,
            layout.block_length,
            order,
        )?;
        let template_id = get_uint(
            buf,
            at(layout.template_id_offset())?,
            layout.template_id,
            order,
        )?;
        let schema_id = get_uint(buf, at(layout.schema_id_offset())?, layout.schema_id, order)?;
        let version = get_uint(buf, at(layout.version_offset())?, layout.version, order)?;

        Ok(Self {
            block_length: narrow(block_length, "block length")?,
            template_id: narrow(template_id, "template id")?,
            schema_id: narrow(schema_id, "schema id")?,
            version: narrow(version, "version")?,
        })
    }

    /// Write this header at `offset`. Returns the header size.
    ///
    /// Fails without writing if the header does not fit.
    pub fn write(&self, ir: &Ir, buf: &mut [u8], offset: usize) -> Result<usize> {
        let layout = ir.header();
        let size = layout.size();
        match offset.checked_add(size) {
            Some(end) if end <= buf.len() => {}
            _ => {
                return Err(CodecError::BufferOverflow {
                    offset,
                    len: size,
                    capacity: buf.len(),
                })
            }
        }
        let order = ir.byte_order();
        put_uint(
            buf,
            offset + layout.block_length_offset(),
            layout.block_length,
            self.block_length as u64,
            order,
        )?;
        put_uint(
            buf,
            offset + layout.template_id_offset(),
            layout.template_id,
            self.template_id as u64,
            order,
        )?;
        put_uint(
            buf,
            offset + layout.schema_id_offset(),
            layout.schema_id,
            self.schema_id as u64,
            order,
        )?;
        put_uint(
            buf,
            offset + layout.version_offset(),
            layout.version,
            self.version as u64,
            order,
        )?;
        Ok(size)
    }
}

fn narrow<T: TryFrom<u64>>(value: u64, what: &str) -> Result<T> {
    T::try_from(value)
        .map_err(|_| CodecError::Range(format!("header {what} {value} is out of range")))
}
