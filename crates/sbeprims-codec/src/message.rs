//! Reflective encode/decode of whole messages as owned [`MessageValue`]s.
//!
//! Built on the cursor API: encoding drives a [`MessageEncoder`] in IR order,
//! decoding drains a [`MessageDecoder`].

use sbeprims_ir::{Block, Ir};
use sbeprims_primitive::Presence;
use tracing::debug;

use crate::config::DecoderConfig;
use crate::decoder::{BlockDecoder, MessageDecoder};
use crate::encoder::{BlockWriter, MessageEncoder};
use crate::error::{CodecError, Result};
use crate::header::MessageHeader;
use crate::value::{BlockValue, MessageValue};
use crate::walker::offset_of;

/// Encode `value` as message `template_id` at `offset`. Returns the total
/// length written, header included.
///
/// Missing optional fields encode as null. Missing required fields fail with
/// `Range`; names the block does not define fail with `UnknownName`.
pub fn encode_message(
    ir: &Ir,
    template_id: u16,
    value: &MessageValue,
    buf: &mut [u8],
    offset: usize,
    acting_version: u16,
) -> Result<usize> {
    let message = ir
        .message_by_id(template_id)
        .ok_or(CodecError::UnknownTemplate(template_id))?;
    let mut encoder = MessageEncoder::wrap(ir, message, buf, offset, acting_version)?;
    write_block(&mut encoder, &message.block, &message.name, value, acting_version)?;
    encoder.finish()
}

fn write_block<'a, W: BlockWriter<'a>>(
    writer: &mut W,
    block: &'a Block,
    scope: &str,
    value: &BlockValue,
    acting_version: u16,
) -> Result<()> {
    check_names(block, scope, value)?;
    for field in &block.fields {
        match value.fields.get(&field.name) {
            Some(field_value) => writer.put_value(field, field_value)?,
            None if field.presence == Presence::Required && field.in_version(acting_version) => {
                return Err(CodecError::Range(format!(
                    "required field '{}' of {scope} is missing",
                    field.name
                )));
            }
            None => {}
        }
    }
    for group in &block.groups {
        let elements = value.group(&group.name).unwrap_or_default();
        let mut encoder = writer.group(group, elements.len())?;
        for element in elements {
            encoder.next()?;
            write_block(&mut encoder, &group.block, &group.name, element, acting_version)?;
        }
        encoder.finish()?;
    }
    for data in &block.data {
        if let Some(bytes) = value.data(&data.name) {
            writer.put_var_data(data, bytes)?;
        }
    }
    Ok(())
}

fn check_names(block: &Block, scope: &str, value: &BlockValue) -> Result<()> {
    if let Some(name) = value.fields.keys().find(|name| block.field(name).is_none()) {
        return Err(CodecError::unknown_name(scope, name));
    }
    if let Some(name) = value.groups.keys().find(|name| block.group(name).is_none()) {
        return Err(CodecError::unknown_name(scope, name));
    }
    if let Some(name) = value.data.keys().find(|name| block.data(name).is_none()) {
        return Err(CodecError::unknown_name(scope, name));
    }
    Ok(())
}

/// Exact buffer size [`encode_message`] needs for `value`.
pub fn encoded_size(
    ir: &Ir,
    template_id: u16,
    value: &MessageValue,
    acting_version: u16,
) -> Result<usize> {
    let message = ir
        .message_by_id(template_id)
        .ok_or(CodecError::UnknownTemplate(template_id))?;
    let body = block_size(&message.block, &message.name, value, acting_version)?;
    offset_of(ir.header().size(), body)
}

fn block_size(
    block: &Block,
    scope: &str,
    value: &BlockValue,
    acting_version: u16,
) -> Result<usize> {
    check_names(block, scope, value)?;
    let mut size = block.block_length_at(acting_version);
    for group in block.groups.iter().filter(|g| g.in_version(acting_version)) {
        size = offset_of(size, group.dimension.size())?;
        for element in value.group(&group.name).unwrap_or_default() {
            let element_size = block_size(&group.block, &group.name, element, acting_version)?;
            size = offset_of(size, element_size)?;
        }
    }
    for data in block.data.iter().filter(|d| d.in_version(acting_version)) {
        let len = value.data(&data.name).map_or(0, <[u8]>::len);
        size = offset_of(size, data.length_type.size() + len)?;
    }
    Ok(size)
}

/// Decode the message at `offset` using the version in its header.
pub fn decode_message(ir: &Ir, buf: &[u8], offset: usize) -> Result<(MessageHeader, MessageValue)> {
    decode_message_with_config(ir, buf, offset, u16::MAX, DecoderConfig::default())
}

/// Decode the message at `offset` as a reader that only knows schema
/// version `acting_version`.
///
/// Fields, groups and var-data newer than `acting_version` are left out even
/// when present on the wire. Messages encoded with an older version still
/// decode at their own version.
pub fn decode_message_as(
    ir: &Ir,
    buf: &[u8],
    offset: usize,
    acting_version: u16,
) -> Result<(MessageHeader, MessageValue)> {
    decode_message_with_config(ir, buf, offset, acting_version, DecoderConfig::default())
}

pub fn decode_message_with_config(
    ir: &Ir,
    buf: &[u8],
    offset: usize,
    acting_version: u16,
    config: DecoderConfig,
) -> Result<(MessageHeader, MessageValue)> {
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
    let version = acting_version.min(header.version);
    if version != header.version {
        debug!(
            message = %message.name,
            encoded_version = header.version,
            acting_version = version,
            "decoding with an older acting version"
        );
    }
    let mut decoder = MessageDecoder::wrap_with_config(
        ir,
        message,
        buf,
        offset_of(offset, ir.header().size())?,
        header.block_length,
        header.version,
        config,
    )?
    .viewed_as(version);
    let value = read_block(decoder.root(), &message.block)?;
    Ok((header, value))
}

fn read_block<'a>(decoder: &mut BlockDecoder<'a>, block: &'a Block) -> Result<BlockValue> {
    let version = decoder.acting_version();
    let mut value = BlockValue::new();
    for field in block.fields.iter().filter(|f| f.in_version(version)) {
        value.fields.insert(field.name.clone(), decoder.get(field)?);
    }
    for group in block.groups.iter().filter(|g| g.in_version(version)) {
        let mut elements = decoder.group(group)?;
        let mut decoded = Vec::with_capacity(elements.count());
        while let Some(mut element) = elements.next()? {
            decoded.push(read_block(&mut element, &group.block)?);
        }
        value.groups.insert(group.name.clone(), decoded);
    }
    for data in block.data.iter().filter(|d| d.in_version(version)) {
        value.data.insert(data.name.clone(), decoder.var_data(data)?.to_vec());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use sbeprims_ir::{SchemaBuilder, SchemaDef};
    use sbeprims_primitive::PrimitiveValue;

    use super::*;
    use crate::value::{EnumValue, FieldValue};

    fn ir() -> Ir {
        SchemaBuilder::default()
            .build(
                &SchemaDef::from_json(
                    r#"{ "package": "v", "id": 2, "version": 1,
                    "types": [
                        { "kind": "enum", "name": "Side", "encoding": "uint8",
                          "values": [{ "name": "Buy", "value": 1 }, { "name": "Sell", "value": 2 }] },
                        { "kind": "composite", "name": "Price", "members": [
                            { "name": "mantissa", "type": "int64" },
                            { "name": "exponent", "type": "int8", "presence": "constant", "value": -4 }
                        ] }
                    ],
                    "messages": [{ "name": "Quote", "id": 3, "fields": [
                        { "name": "id", "type": "uint32" },
                        { "name": "side", "type": "Side" },
                        { "name": "px", "type": "Price" },
                        { "name": "venue", "type": "uint16", "presence": "optional", "sinceVersion": 1 }
                    ],
                    "groups": [{ "name": "legs", "fields": [{ "name": "qty", "type": "uint16" }],
                                 "groups": [{ "name": "fills", "fields": [{ "name": "n", "type": "uint8" }] }] }],
                    "data": [{ "name": "note", "lengthType": "uint16", "sinceVersion": 1 }] }]
                }"#,
                )
                .unwrap(),
            )
            .unwrap()
    }

    fn leg(qty: u16, fills: &[u8]) -> BlockValue {
        BlockValue::new()
            .with_field("qty", PrimitiveValue::UInt16(qty))
            .with_group(
                "fills",
                fills
                    .iter()
                    .map(|&n| BlockValue::new().with_field("n", PrimitiveValue::UInt8(n)))
                    .collect(),
            )
    }

    fn quote() -> MessageValue {
        let px = [("mantissa".to_string(), FieldValue::Primitive(PrimitiveValue::Int64(12_345)))];
        MessageValue::new()
            .with_field("id", PrimitiveValue::UInt32(77))
            .with_field("side", EnumValue::Known("Sell".into()))
            .with_field("px", FieldValue::Composite(px.into_iter().collect()))
            .with_field("venue", PrimitiveValue::UInt16(4))
            .with_group("legs", vec![leg(10, &[1, 2]), leg(20, &[])])
            .with_data("note", b"hello".to_vec())
    }

    #[test]
    fn round_trips_at_the_current_version() {
        let ir = ir();
        let value = quote();
        let size = encoded_size(&ir, 3, &value, 1).unwrap();
        let mut buf = vec![0u8; size];
        assert_eq!(encode_message(&ir, 3, &value, &mut buf, 0, 1).unwrap(), size);

        let (header, decoded) = decode_message(&ir, &buf, 0).unwrap();
        assert_eq!(header.template_id, 3);
        assert_eq!(header.version, 1);
        assert_eq!(decoded.field("id"), value.field("id"));
        assert_eq!(decoded.field("side"), value.field("side"));
        assert_eq!(decoded.field("venue"), value.field("venue"));
        assert_eq!(decoded.group("legs"), value.group("legs"));
        assert_eq!(decoded.data("note"), Some(&b"hello"[..]));

        // The constant member comes back even though it was never written.
        let Some(FieldValue::Composite(px)) = decoded.field("px") else {
            panic!("px is not a composite");
        };
        assert_eq!(px["exponent"], FieldValue::Primitive(PrimitiveValue::Int8(-4)));
    }

    #[test]
    fn older_versions_leave_out_newer_parts() {
        let ir = ir();
        let value = quote();
        let size = encoded_size(&ir, 3, &value, 0).unwrap();
        let mut buf = vec![0u8; size];
        encode_message(&ir, 3, &value, &mut buf, 0, 0).unwrap();

        let (header, decoded) = decode_message(&ir, &buf, 0).unwrap();
        assert_eq!(header.version, 0);
        assert_eq!(decoded.field("venue"), None);
        assert_eq!(decoded.data("note"), None);
        assert_eq!(decoded.group("legs").map(<[BlockValue]>::len), Some(2));
    }

    #[test]
    fn decodes_as_an_older_reader() {
        let ir = ir();
        let value = quote();
        let mut buf = vec![0u8; encoded_size(&ir, 3, &value, 1).unwrap()];
        encode_message(&ir, 3, &value, &mut buf, 0, 1).unwrap();

        let (header, decoded) = decode_message_as(&ir, &buf, 0, 0).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(decoded.field("venue"), None);
        assert_eq!(decoded.field("id"), value.field("id"));
        assert_eq!(decoded.data("note"), None);
    }

    #[test]
    fn missing_and_unknown_names() {
        let ir = ir();
        let mut buf = vec![0u8; 256];

        let mut missing = quote();
        missing.fields.remove("id");
        assert!(matches!(
            encode_message(&ir, 3, &missing, &mut buf, 0, 1),
            Err(CodecError::Range(_))
        ));

        let mut optional = quote();
        optional.fields.remove("venue");
        encode_message(&ir, 3, &optional, &mut buf, 0, 1).unwrap();
        let (_, decoded) = decode_message(&ir, &buf, 0).unwrap();
        assert_eq!(decoded.field("venue"), Some(&FieldValue::Null));

        let unknown = quote().with_field("bogus", PrimitiveValue::UInt8(1));
        assert!(matches!(
            encode_message(&ir, 3, &unknown, &mut buf, 0, 1),
            Err(CodecError::UnknownName { .. })
        ));
        assert!(matches!(
            encode_message(&ir, 9, &quote(), &mut buf, 0, 1),
            Err(CodecError::UnknownTemplate(9))
        ));
    }

    #[test]
    fn exact_size_buffers() {
        let ir = ir();
        let value = quote();
        let size = encoded_size(&ir, 3, &value, 1).unwrap();
        let mut short = vec![0u8; size - 1];
        assert!(matches!(
            encode_message(&ir, 3, &value, &mut short, 0, 1),
            Err(CodecError::BufferOverflow { .. })
        ));
    }
}
