//! Persisted binary form of an [`Ir`].
//!
//! Stream layout (all integers little-endian):
//!
//! ```text
//! ┌────────────┬──────────────┬───────────┬────────────┬──────────┬────────────┐
//! │ Magic (4B) │ Version (2B) │ Flags(2B) │ Length(4B) │ Body     │ Adler (4B) │
//! │ "SBIR"     │ 1            │ 0         │ body bytes │          │ over body  │
//! └────────────┴──────────────┴───────────┴────────────┴──────────┴────────────┘
//! ```
//!
//! Strings are a `u16` length plus UTF-8 bytes, optional values a one-byte
//! presence flag, collections a `u32` count. Primitive types use
//! [`PrimitiveType::code`]. Decoding re-runs every structural check the
//! builder applies, so a stream can never produce an IR the builder would
//! reject.

use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};
use sbeprims_primitive::{ByteOrder, Presence, PrimitiveType, PrimitiveValue};
use tracing::debug;

use crate::config::IrCodecConfig;
use crate::error::{IrError, Result, ValidationError};
use crate::ir::{
    Block, Choice, Constant, DimensionLayout, EncodedType, Encoding, EnumType, Field, Group,
    HeaderLayout, Ir, Message, SetType, ValidValue, VarData,
};
use crate::validate::{self, GroupParts, IrParts};

/// Stream magic: "SBIR".
pub const MAGIC: [u8; 4] = *b"SBIR";

/// Current stream format version.
pub const FORMAT_VERSION: u16 = 1;

/// Magic (4) + version (2) + flags (2) + body length (4).
pub const STREAM_HEADER_SIZE: usize = 12;

const CHECKSUM_SIZE: usize = 4;

const TAG_PRIMITIVE: u8 = 1;
const TAG_ENUM: u8 = 2;
const TAG_SET: u8 = 3;
const TAG_COMPOSITE: u8 = 4;

const CONSTANT_NONE: u8 = 0;
const CONSTANT_PRIMITIVE: u8 = 1;
const CONSTANT_BYTES: u8 = 2;
const CONSTANT_ENUM: u8 = 3;

/// Append the persisted form of `ir` to `dst`.
pub fn encode_ir(ir: &Ir, dst: &mut BytesMut) -> Result<()> {
    let mut body = BytesMut::new();
    write_ir_body(ir, &mut body)?;

    let body_len = u32::try_from(body.len())
        .map_err(|_| IrError::Format(format!("IR body too large: {} bytes", body.len())))?;

    dst.reserve(STREAM_HEADER_SIZE + body.len() + CHECKSUM_SIZE);
    dst.put_slice(&MAGIC);
    dst.put_u16_le(FORMAT_VERSION);
    dst.put_u16_le(0);
    dst.put_u32_le(body_len);
    dst.put_slice(&body);
    dst.put_u32_le(adler32(&body));
    Ok(())
}

pub fn encode_ir_to_vec(ir: &Ir) -> Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    encode_ir(ir, &mut buf)?;
    Ok(buf.to_vec())
}

/// Decode a persisted IR stream with default limits.
pub fn decode_ir(src: &[u8]) -> Result<Ir> {
    decode_ir_with_config(src, &IrCodecConfig::default())
}

pub fn decode_ir_with_config(src: &[u8], config: &IrCodecConfig) -> Result<Ir> {
    if src.len() > config.max_ir_size {
        return Err(format_error(format!(
            "stream of {} bytes exceeds limit of {}",
            src.len(),
            config.max_ir_size
        )));
    }
    if src.len() < STREAM_HEADER_SIZE {
        return Err(format_error("truncated stream header"));
    }

    let mut header = &src[..STREAM_HEADER_SIZE];
    let mut magic = [0u8; 4];
    header.copy_to_slice(&mut magic);
    if magic != MAGIC {
        return Err(format_error("bad magic"));
    }
    let version = header.get_u16_le();
    if version != FORMAT_VERSION {
        return Err(format_error(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let flags = header.get_u16_le();
    if flags != 0 {
        return Err(format_error(format!("unsupported flags 0x{flags:04x}")));
    }
    let body_len = header.get_u32_le() as usize;

    let expected = STREAM_HEADER_SIZE
        .checked_add(body_len)
        .and_then(|n| n.checked_add(CHECKSUM_SIZE))
        .ok_or_else(|| format_error("body length overflows"))?;
    if src.len() < expected {
        return Err(format_error(format!(
            "truncated stream: {} of {expected} bytes",
            src.len()
        )));
    }
    if src.len() > expected {
        return Err(format_error(format!(
            "{} trailing bytes after stream",
            src.len() - expected
        )));
    }

    let body = &src[STREAM_HEADER_SIZE..STREAM_HEADER_SIZE + body_len];
    let mut trailer = &src[STREAM_HEADER_SIZE + body_len..];
    let stored = trailer.get_u32_le();
    let computed = adler32(body);
    if stored != computed {
        return Err(format_error(format!(
            "checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}"
        )));
    }

    let mut reader = Reader {
        buf: body,
        depth: 0,
        max_depth: config.max_depth,
    };
    let ir = reader.ir()?;
    if reader.buf.has_remaining() {
        return Err(format_error(format!(
            "{} unread bytes in body",
            reader.buf.remaining()
        )));
    }

    debug!(
        package = %ir.package(),
        schema_id = ir.schema_id(),
        version = ir.version(),
        bytes = src.len(),
        "decoded schema IR"
    );
    Ok(ir)
}

/// Persist `ir` to `path`.
pub fn write_ir_file(path: &Path, ir: &Ir) -> Result<()> {
    let bytes = encode_ir_to_vec(ir)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Load an IR file with default limits.
pub fn read_ir_file(path: &Path) -> Result<Ir> {
    let config = IrCodecConfig::default();
    let len = std::fs::metadata(path)?.len();
    if len > config.max_ir_size as u64 {
        return Err(format_error(format!(
            "{} is {len} bytes, limit is {}",
            path.display(),
            config.max_ir_size
        )));
    }
    let bytes = std::fs::read(path)?;
    decode_ir_with_config(&bytes, &config)
}

/// Adler-32 over `data`.
fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65_521;
    let (mut a, mut b) = (1u32, 0u32);
    // 5552 is the longest run before `b` can overflow a u32.
    for chunk in data.chunks(5552) {
        for &byte in chunk {
            a += byte as u32;
            b += a;
        }
        a %= MOD;
        b %= MOD;
    }
    (b << 16) | a
}

fn format_error(reason: impl Into<String>) -> IrError {
    IrError::Format(reason.into())
}

fn invalid(err: ValidationError) -> IrError {
    IrError::Format(format!("decoded IR failed validation: {err}"))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn write_ir_body(ir: &Ir, dst: &mut BytesMut) -> Result<()> {
    put_str(dst, ir.package())?;
    dst.put_u16_le(ir.schema_id());
    dst.put_u16_le(ir.version());
    put_str(dst, ir.semantic_version())?;
    dst.put_u8(ir.byte_order().code());
    put_opt_str(dst, ir.description())?;

    let header = ir.header();
    for ty in [
        header.block_length,
        header.template_id,
        header.schema_id,
        header.version,
    ] {
        dst.put_u8(ty.code());
    }

    put_count(dst, ir.types().len())?;
    for encoding in ir.types() {
        put_encoding(dst, encoding)?;
    }
    put_count(dst, ir.messages().len())?;
    for message in ir.messages() {
        put_str(dst, &message.name)?;
        dst.put_u16_le(message.id);
        dst.put_u16_le(message.since_version);
        put_block(dst, &message.block)?;
        put_opt_str(dst, message.description.as_deref())?;
    }
    Ok(())
}

fn put_block(dst: &mut BytesMut, block: &Block) -> Result<()> {
    put_count(dst, block.block_length)?;
    put_count(dst, block.fields.len())?;
    for field in &block.fields {
        put_field(dst, field)?;
    }
    put_count(dst, block.groups.len())?;
    for group in &block.groups {
        put_str(dst, &group.name)?;
        dst.put_u16_le(group.id);
        dst.put_u16_le(group.since_version);
        dst.put_u8(group.dimension.block_length.code());
        dst.put_u8(group.dimension.num_in_group.code());
        put_block(dst, &group.block)?;
        put_opt_str(dst, group.description.as_deref())?;
    }
    put_count(dst, block.data.len())?;
    for data in &block.data {
        put_str(dst, &data.name)?;
        dst.put_u16_le(data.id);
        dst.put_u16_le(data.since_version);
        dst.put_u8(data.length_type.code());
        put_opt_str(dst, data.character_encoding.as_deref())?;
        put_opt_str(dst, data.description.as_deref())?;
    }
    Ok(())
}

fn put_field(dst: &mut BytesMut, field: &Field) -> Result<()> {
    put_str(dst, &field.name)?;
    dst.put_u16_le(field.id);
    put_count(dst, field.offset)?;
    dst.put_u16_le(field.since_version);
    match field.deprecated {
        Some(version) => {
            dst.put_u8(1);
            dst.put_u16_le(version);
        }
        None => dst.put_u8(0),
    }
    dst.put_u8(field.presence.code());
    put_constant(dst, field.constant.as_ref())?;
    put_encoding(dst, &field.encoding)?;
    put_opt_str(dst, field.description.as_deref())
}

fn put_encoding(dst: &mut BytesMut, encoding: &Encoding) -> Result<()> {
    dst.put_u8(encoding.tag());
    match encoding {
        Encoding::Primitive(ty) => {
            put_str(dst, &ty.name)?;
            dst.put_u8(ty.primitive.code());
            put_count(dst, ty.length)?;
            dst.put_u8(ty.presence.code());
            put_value(dst, &ty.null_value);
            put_value(dst, &ty.min_value);
            put_value(dst, &ty.max_value);
            put_constant(dst, ty.constant.as_ref())?;
            put_opt_str(dst, ty.character_encoding.as_deref())?;
        }
        Encoding::Enum(ty) => {
            put_str(dst, &ty.name)?;
            dst.put_u8(ty.encoding.code());
            put_value(dst, &ty.null_value);
            put_count(dst, ty.values.len())?;
            for value in &ty.values {
                put_str(dst, &value.name)?;
                dst.put_i64_le(value.value);
                dst.put_u16_le(value.since_version);
                put_opt_str(dst, value.description.as_deref())?;
            }
        }
        Encoding::Set(ty) => {
            put_str(dst, &ty.name)?;
            dst.put_u8(ty.encoding.code());
            put_count(dst, ty.choices.len())?;
            for choice in &ty.choices {
                put_str(dst, &choice.name)?;
                dst.put_u8(choice.bit);
                dst.put_u16_le(choice.since_version);
            }
        }
        Encoding::Composite(ty) => {
            put_str(dst, &ty.name)?;
            put_count(dst, ty.members.len())?;
            for member in &ty.members {
                put_field(dst, member)?;
            }
        }
    }
    Ok(())
}

fn put_constant(dst: &mut BytesMut, constant: Option<&Constant>) -> Result<()> {
    match constant {
        None => dst.put_u8(CONSTANT_NONE),
        Some(Constant::Primitive(value)) => {
            dst.put_u8(CONSTANT_PRIMITIVE);
            put_value(dst, value);
        }
        Some(Constant::Bytes(bytes)) => {
            dst.put_u8(CONSTANT_BYTES);
            put_count(dst, bytes.len())?;
            dst.put_slice(bytes);
        }
        Some(Constant::Enum(name)) => {
            dst.put_u8(CONSTANT_ENUM);
            put_str(dst, name)?;
        }
    }
    Ok(())
}

fn put_value(dst: &mut BytesMut, value: &PrimitiveValue) {
    dst.put_u8(value.primitive_type().code());
    match *value {
        PrimitiveValue::Char(v) | PrimitiveValue::UInt8(v) => dst.put_u8(v),
        PrimitiveValue::Int8(v) => dst.put_i8(v),
        PrimitiveValue::Int16(v) => dst.put_i16_le(v),
        PrimitiveValue::Int32(v) => dst.put_i32_le(v),
        PrimitiveValue::Int64(v) => dst.put_i64_le(v),
        PrimitiveValue::UInt16(v) => dst.put_u16_le(v),
        PrimitiveValue::UInt32(v) => dst.put_u32_le(v),
        PrimitiveValue::UInt64(v) => dst.put_u64_le(v),
        PrimitiveValue::Float(v) => dst.put_f32_le(v),
        PrimitiveValue::Double(v) => dst.put_f64_le(v),
    }
}

fn put_str(dst: &mut BytesMut, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| format_error(format!("string of {} bytes is too long", value.len())))?;
    dst.put_u16_le(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}

fn put_opt_str(dst: &mut BytesMut, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => {
            dst.put_u8(1);
            put_str(dst, value)
        }
        None => {
            dst.put_u8(0);
            Ok(())
        }
    }
}

fn put_count(dst: &mut BytesMut, count: usize) -> Result<()> {
    let count = u32::try_from(count).map_err(|_| format_error(format!("count {count} too large")))?;
    dst.put_u32_le(count);
    Ok(())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

struct Reader<'a> {
    buf: &'a [u8],
    depth: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    fn need(&self, len: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(format_error(format!(
                "truncated body reading {what}: need {len} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.need(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    fn i64(&mut self, what: &str) -> Result<i64> {
        self.need(8, what)?;
        Ok(self.buf.get_i64_le())
    }

    fn usize(&mut self, what: &str) -> Result<usize> {
        Ok(self.u32(what)? as usize)
    }

    fn bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        self.need(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let len = self.u16(what)? as usize;
        let raw = self.bytes(len, what)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| format_error(format!("{what} is not valid UTF-8")))
    }

    fn opt_string(&mut self, what: &str) -> Result<Option<String>> {
        match self.flag(what)? {
            true => self.string(what).map(Some),
            false => Ok(None),
        }
    }

    fn flag(&mut self, what: &str) -> Result<bool> {
        match self.u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(format_error(format!("invalid presence flag {other} for {what}"))),
        }
    }

    /// A collection count, capped so hostile counts cannot force huge
    /// allocations before the body runs out.
    fn count(&mut self, what: &str) -> Result<(usize, usize)> {
        let count = self.usize(what)?;
        Ok((count, count.min(self.buf.remaining())))
    }

    fn primitive_type(&mut self, what: &str) -> Result<PrimitiveType> {
        let code = self.u8(what)?;
        PrimitiveType::from_code(code)
            .ok_or_else(|| format_error(format!("unknown primitive type code {code} for {what}")))
    }

    fn presence(&mut self) -> Result<Presence> {
        let code = self.u8("presence")?;
        Presence::from_code(code)
            .ok_or_else(|| format_error(format!("unknown presence code {code}")))
    }

    fn value(&mut self, what: &str) -> Result<PrimitiveValue> {
        let ty = self.primitive_type(what)?;
        self.need(ty.size(), what)?;
        Ok(match ty {
            PrimitiveType::Char => PrimitiveValue::Char(self.buf.get_u8()),
            PrimitiveType::Int8 => PrimitiveValue::Int8(self.buf.get_i8()),
            PrimitiveType::Int16 => PrimitiveValue::Int16(self.buf.get_i16_le()),
            PrimitiveType::Int32 => PrimitiveValue::Int32(self.buf.get_i32_le()),
            PrimitiveType::Int64 => PrimitiveValue::Int64(self.buf.get_i64_le()),
            PrimitiveType::UInt8 => PrimitiveValue::UInt8(self.buf.get_u8()),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(self.buf.get_u16_le()),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(self.buf.get_u32_le()),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(self.buf.get_u64_le()),
            PrimitiveType::Float => PrimitiveValue::Float(self.buf.get_f32_le()),
            PrimitiveType::Double => PrimitiveValue::Double(self.buf.get_f64_le()),
        })
    }

    fn descend(&mut self, what: &str) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(format_error(format!(
                "{what} nests deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn ir(&mut self) -> Result<Ir> {
        let package = self.string("package")?;
        let schema_id = self.u16("schema id")?;
        let version = self.u16("schema version")?;
        let semantic_version = self.string("semantic version")?;
        let order_code = self.u8("byte order")?;
        let byte_order = ByteOrder::from_code(order_code)
            .ok_or_else(|| format_error(format!("unknown byte order code {order_code}")))?;
        let description = self.opt_string("description")?;
        let header = HeaderLayout {
            block_length: self.primitive_type("header block length")?,
            template_id: self.primitive_type("header template id")?,
            schema_id: self.primitive_type("header schema id")?,
            version: self.primitive_type("header version")?,
        };

        let (count, capacity) = self.count("type count")?;
        let mut types = Vec::with_capacity(capacity);
        for _ in 0..count {
            types.push(self.encoding(version)?);
        }

        let (count, capacity) = self.count("message count")?;
        let mut messages = Vec::with_capacity(capacity);
        for _ in 0..count {
            let name = self.string("message name")?;
            let id = self.u16("template id")?;
            let since_version = self.u16("message since version")?;
            let scope = format!("message '{name}'");
            let block = self.block(&scope, version)?;
            messages.push(Message {
                name,
                id,
                since_version,
                block,
                description: self.opt_string("message description")?,
            });
        }

        validate::freeze(IrParts {
            package,
            schema_id,
            version,
            semantic_version,
            byte_order,
            description,
            header,
            types,
            messages,
        })
        .map_err(invalid)
    }

    fn block(&mut self, scope: &str, schema_version: u16) -> Result<Block> {
        let block_length = self.usize("block length")?;

        let (count, capacity) = self.count("field count")?;
        let mut fields = Vec::with_capacity(capacity);
        for _ in 0..count {
            fields.push(self.field(schema_version)?);
        }

        let (count, capacity) = self.count("group count")?;
        let mut groups = Vec::with_capacity(capacity);
        for _ in 0..count {
            groups.push(self.group(scope, schema_version)?);
        }

        let (count, capacity) = self.count("var-data count")?;
        let mut data = Vec::with_capacity(capacity);
        for _ in 0..count {
            data.push(VarData {
                name: self.string("var-data name")?,
                id: self.u16("var-data id")?,
                since_version: self.u16("var-data since version")?,
                length_type: self.primitive_type("var-data length type")?,
                character_encoding: self.opt_string("character encoding")?,
                description: self.opt_string("var-data description")?,
            });
        }

        validate::seal_block(
            scope,
            fields,
            groups,
            data,
            Some(block_length),
            schema_version,
        )
        .map_err(invalid)
    }

    fn group(&mut self, scope: &str, schema_version: u16) -> Result<Group> {
        let name = self.string("group name")?;
        let id = self.u16("group id")?;
        let since_version = self.u16("group since version")?;
        let dimension = DimensionLayout {
            block_length: self.primitive_type("dimension block length")?,
            num_in_group: self.primitive_type("dimension count")?,
        };
        self.descend("group")?;
        let group_scope = format!("{scope} group '{name}'");
        let block = self.block(&group_scope, schema_version)?;
        self.ascend();
        let description = self.opt_string("group description")?;

        validate::seal_group(
            scope,
            GroupParts {
                name,
                id,
                since_version,
                dimension,
                block,
                description,
            },
        )
        .map_err(invalid)
    }

    fn field(&mut self, schema_version: u16) -> Result<Field> {
        let name = self.string("field name")?;
        let id = self.u16("field id")?;
        let offset = self.usize("field offset")?;
        let since_version = self.u16("field since version")?;
        let deprecated = match self.flag("deprecated")? {
            true => Some(self.u16("deprecated version")?),
            false => None,
        };
        let presence = self.presence()?;
        let constant = self.constant()?;
        let encoding = self.encoding(schema_version)?;
        let description = self.opt_string("field description")?;
        Ok(Field {
            name,
            id,
            offset,
            since_version,
            deprecated,
            presence,
            constant,
            encoding,
            description,
        })
    }

    fn constant(&mut self) -> Result<Option<Constant>> {
        match self.u8("constant tag")? {
            CONSTANT_NONE => Ok(None),
            CONSTANT_PRIMITIVE => Ok(Some(Constant::Primitive(self.value("constant")?))),
            CONSTANT_BYTES => {
                let len = self.usize("constant length")?;
                Ok(Some(Constant::Bytes(self.bytes(len, "constant")?.to_vec())))
            }
            CONSTANT_ENUM => Ok(Some(Constant::Enum(self.string("constant")?))),
            other => Err(format_error(format!("unknown constant tag {other}"))),
        }
    }

    fn encoding(&mut self, schema_version: u16) -> Result<Encoding> {
        match self.u8("encoding tag")? {
            TAG_PRIMITIVE => Ok(Encoding::Primitive(EncodedType {
                name: self.string("type name")?,
                primitive: self.primitive_type("type primitive")?,
                length: self.usize("type length")?,
                presence: self.presence()?,
                null_value: self.value("null value")?,
                min_value: self.value("min value")?,
                max_value: self.value("max value")?,
                constant: self.constant()?,
                character_encoding: self.opt_string("character encoding")?,
            })),
            TAG_ENUM => {
                let name = self.string("enum name")?;
                let encoding = self.primitive_type("enum encoding")?;
                let null_value = self.value("enum null value")?;
                let (count, capacity) = self.count("enum value count")?;
                let mut values = Vec::with_capacity(capacity);
                for _ in 0..count {
                    values.push(ValidValue {
                        name: self.string("enum value name")?,
                        value: self.i64("enum value")?,
                        since_version: self.u16("enum value since version")?,
                        description: self.opt_string("enum value description")?,
                    });
                }
                Ok(Encoding::Enum(EnumType {
                    name,
                    encoding,
                    null_value,
                    values,
                }))
            }
            TAG_SET => {
                let name = self.string("set name")?;
                let encoding = self.primitive_type("set encoding")?;
                let (count, capacity) = self.count("choice count")?;
                let mut choices = Vec::with_capacity(capacity);
                for _ in 0..count {
                    choices.push(Choice {
                        name: self.string("choice name")?,
                        bit: self.u8("choice bit")?,
                        since_version: self.u16("choice since version")?,
                    });
                }
                Ok(Encoding::Set(SetType {
                    name,
                    encoding,
                    choices,
                }))
            }
            TAG_COMPOSITE => {
                let name = self.string("composite name")?;
                self.descend("composite")?;
                let (count, capacity) = self.count("member count")?;
                let mut members = Vec::with_capacity(capacity);
                for _ in 0..count {
                    members.push(self.field(schema_version)?);
                }
                self.ascend();
                validate::seal_composite(name, members, schema_version)
                    .map(Encoding::Composite)
                    .map_err(invalid)
            }
            other => Err(format_error(format!("unknown encoding tag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaBuilder, SchemaDef};

    const SCHEMA: &str = r#"{
        "package": "market", "id": 42, "version": 2, "semanticVersion": "2.1",
        "description": "market data",
        "types": [
            { "kind": "enum", "name": "Side", "encoding": "uint8",
              "values": [{ "name": "Buy", "value": 1 }, { "name": "Sell", "value": 2, "sinceVersion": 1 }] },
            { "kind": "set", "name": "Flags", "encoding": "uint16",
              "choices": [{ "name": "A", "bit": 0 }, { "name": "B", "bit": 9 }] },
            { "kind": "type", "name": "Px", "primitive": "double", "presence": "optional" },
            { "kind": "type", "name": "Sym", "primitive": "char", "length": 6, "characterEncoding": "US-ASCII" },
            { "kind": "composite", "name": "Money", "members": [
                { "name": "amount", "type": "int64" },
                { "name": "ccy", "type": "char", "presence": "constant", "value": "E" }
            ]}
        ],
        "messages": [{
            "name": "Trade", "id": 3, "sinceVersion": 0, "description": "a trade",
            "fields": [
                { "name": "sym", "id": 1, "type": "Sym" },
                { "name": "side", "id": 2, "type": "Side" },
                { "name": "flags", "id": 3, "type": "Flags" },
                { "name": "px", "id": 4, "type": "Px", "sinceVersion": 1 },
                { "name": "notional", "id": 5, "type": "Money", "sinceVersion": 2, "deprecated": 2 }
            ],
            "groups": [{ "name": "fills", "id": 10, "dimension": { "blockLength": "uint8", "numInGroup": "uint32" },
                "fields": [{ "name": "qty", "type": "uint32" }],
                "groups": [{ "name": "venues", "fields": [{ "name": "v", "type": "uint8" }] }],
                "data": [{ "name": "memo", "lengthType": "uint8" }] }],
            "data": [{ "name": "text", "id": 20, "characterEncoding": "UTF-8" }]
        }]
    }"#;

    fn sample_ir() -> Ir {
        SchemaBuilder::default()
            .build(&SchemaDef::from_json(SCHEMA).unwrap())
            .unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let ir = sample_ir();
        let bytes = encode_ir_to_vec(&ir).unwrap();

        assert_eq!(&bytes[..4], b"SBIR");
        let decoded = decode_ir(&bytes).unwrap();
        assert_eq!(decoded, ir);
        assert_eq!(
            decoded.message_by_id(3).unwrap().block_length_at(0),
            ir.message_by_id(3).unwrap().block_length_at(0)
        );
        assert!(decoded.message_by_name("Trade").unwrap().group("fills").is_some());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let ir = sample_ir();
        assert_eq!(encode_ir_to_vec(&ir).unwrap(), encode_ir_to_vec(&ir).unwrap());
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_ir(&bytes), Err(IrError::Format(_))));
    }

    #[test]
    fn test_decode_unsupported_version() {
        let mut bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        bytes[4] = 9;
        let err = decode_ir(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        for len in [0, 3, STREAM_HEADER_SIZE, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                matches!(decode_ir(&bytes[..len]), Err(IrError::Format(_))),
                "length {len}"
            );
        }
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        bytes.push(0);
        assert!(matches!(decode_ir(&bytes), Err(IrError::Format(_))));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        bytes[STREAM_HEADER_SIZE + 3] ^= 0xFF;
        let err = decode_ir(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_decode_rejects_oversize_stream() {
        let bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        let config = IrCodecConfig {
            max_ir_size: 16,
            ..IrCodecConfig::default()
        };
        assert!(matches!(
            decode_ir_with_config(&bytes, &config),
            Err(IrError::Format(_))
        ));
    }

    #[test]
    fn test_decode_enforces_depth_limit() {
        let bytes = encode_ir_to_vec(&sample_ir()).unwrap();
        let config = IrCodecConfig {
            max_depth: 1,
            ..IrCodecConfig::default()
        };
        let err = decode_ir_with_config(&bytes, &config).unwrap_err();
        assert!(err.to_string().contains("nests deeper"));
    }

    #[test]
    fn test_decode_revalidates_structure() {
        // Re-seal a body whose single message declares a block length shorter
        // than its field, with a valid checksum.
        let ir = SchemaBuilder::default()
            .build(
                &SchemaDef::from_json(
                    r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                        "fields": [{ "name": "a", "type": "uint32" }] }]}"#,
                )
                .unwrap(),
            )
            .unwrap();
        let mut body = BytesMut::new();
        write_ir_body(&ir, &mut body).unwrap();
        // package(2+1) id(2) version(2) semver(2) order(1) desc(1) header(4) types(4) messages(4) name(2+1) id(2) since(2)
        let block_length_at = 3 + 2 + 2 + 2 + 1 + 1 + 4 + 4 + 4 + 3 + 2 + 2;
        assert_eq!(&body[block_length_at..block_length_at + 4], &4u32.to_le_bytes());
        body[block_length_at] = 2;

        let mut stream = BytesMut::new();
        stream.put_slice(&MAGIC);
        stream.put_u16_le(FORMAT_VERSION);
        stream.put_u16_le(0);
        stream.put_u32_le(body.len() as u32);
        stream.put_slice(&body);
        stream.put_u32_le(adler32(&body));

        let err = decode_ir(&stream).unwrap_err();
        assert!(matches!(err, IrError::Format(_)));
        assert!(err.to_string().contains("failed validation"));
    }

    #[test]
    fn test_adler32_known_vector() {
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(adler32(b""), 1);
    }

    #[test]
    fn test_file_roundtrip() {
        let ir = sample_ir();
        let path = std::env::temp_dir().join(format!(
            "sbeprims-ir-codec-{}-{}.sbeir",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        write_ir_file(&path, &ir).unwrap();
        assert_eq!(read_ir_file(&path).unwrap(), ir);
        let _ = std::fs::remove_file(&path);
    }
}
