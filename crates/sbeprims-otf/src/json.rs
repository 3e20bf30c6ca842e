//! JSON rendering of decoded messages, and the reverse mapping used to encode
//! messages described in JSON.

use std::collections::BTreeMap;

use sbeprims_codec::{BlockValue, CodecError, EnumValue, FieldValue, MessageHeader, MessageValue};
use sbeprims_ir::{Block, Encoding, Field, Group, Message, VarData};
use sbeprims_primitive::{PrimitiveType, PrimitiveValue};
use serde_json::{json, Map, Number, Value};

use crate::error::{OtfError, Result};
use crate::visitor::Visitor;

enum Frame {
    Block(Map<String, Value>),
    Group(Vec<Value>),
}

/// Collects a decoded message into a JSON document:
///
/// ```json
/// { "message": "Order", "templateId": 1, "header": { ... }, "body": { ... } }
/// ```
///
/// `header` is present only when the message was decoded with one. Groups
/// become arrays of objects and var-data becomes a string when it is valid
/// UTF-8, otherwise an array of byte values.
#[derive(Default)]
pub struct JsonVisitor {
    stack: Vec<Frame>,
    header: Option<Value>,
    output: Option<Value>,
}

impl JsonVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last completed message, if any.
    pub fn value(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.output
    }

    /// Take the last completed message, leaving the visitor ready for the
    /// next one.
    pub fn take(&mut self) -> Option<Value> {
        self.output.take()
    }

    fn insert(&mut self, name: &str, value: Value) {
        if let Some(Frame::Block(map)) = self.stack.last_mut() {
            map.insert(name.to_string(), value);
        }
    }
}

impl Visitor for JsonVisitor {
    fn on_begin_message(&mut self, _message: &Message, header: Option<&MessageHeader>) {
        self.stack.clear();
        self.stack.push(Frame::Block(Map::new()));
        self.header = header.and_then(|h| serde_json::to_value(h).ok());
    }

    fn on_field(&mut self, field: &Field, value: &FieldValue) {
        self.insert(&field.name, to_json(&field.encoding, value));
    }

    fn on_begin_group(&mut self, _group: &Group, count: usize) {
        self.stack.push(Frame::Group(Vec::with_capacity(count)));
    }

    fn on_begin_group_element(&mut self, _group: &Group, _index: usize) {
        self.stack.push(Frame::Block(Map::new()));
    }

    fn on_end_group_element(&mut self, _group: &Group, _index: usize) {
        if let Some(Frame::Block(element)) = self.stack.pop() {
            if let Some(Frame::Group(elements)) = self.stack.last_mut() {
                elements.push(Value::Object(element));
            }
        }
    }

    fn on_end_group(&mut self, group: &Group) {
        if let Some(Frame::Group(elements)) = self.stack.pop() {
            self.insert(&group.name, Value::Array(elements));
        }
    }

    fn on_var_data(&mut self, data: &VarData, bytes: &[u8]) {
        self.insert(&data.name, bytes_to_json(bytes));
    }

    fn on_end_message(&mut self, message: &Message) {
        let body = match self.stack.pop() {
            Some(Frame::Block(map)) => map,
            _ => Map::new(),
        };
        self.stack.clear();
        let mut doc = json!({
            "message": message.name,
            "templateId": message.id,
        });
        if let (Some(header), Value::Object(map)) = (self.header.take(), &mut doc) {
            map.insert("header".to_string(), header);
        }
        if let Value::Object(map) = &mut doc {
            map.insert("body".to_string(), Value::Object(body));
        }
        self.output = Some(doc);
    }
}

/// Render a decoded field value.
pub fn to_json(encoding: &Encoding, value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Primitive(value) => primitive_to_json(value),
        FieldValue::Array(values) => Value::Array(values.iter().map(primitive_to_json).collect()),
        FieldValue::Bytes(bytes) => match encoding {
            Encoding::Primitive(ty) if ty.primitive == PrimitiveType::Char => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Value::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
        },
        FieldValue::Enum(EnumValue::Known(name)) => Value::String(name.clone()),
        FieldValue::Enum(EnumValue::Unknown(raw)) => Value::from(*raw),
        FieldValue::Set(names) => Value::Array(names.iter().cloned().map(Value::String).collect()),
        FieldValue::Composite(members) => {
            let mut map = Map::new();
            for (name, member) in members {
                let rendered = match encoding {
                    Encoding::Composite(ty) => match ty.member(name) {
                        Some(field) => to_json(&field.encoding, member),
                        None => Value::Null,
                    },
                    other => to_json(other, member),
                };
                map.insert(name.clone(), rendered);
            }
            Value::Object(map)
        }
    }
}

fn primitive_to_json(value: &PrimitiveValue) -> Value {
    match *value {
        PrimitiveValue::Char(c) => Value::String(char::from(c).to_string()),
        PrimitiveValue::Float(v) => float_to_json(v as f64),
        PrimitiveValue::Double(v) => float_to_json(v),
        PrimitiveValue::UInt64(v) => Value::from(v),
        other => other.as_i64().map(Value::from).unwrap_or(Value::Null),
    }
}

// NaN and infinities have no JSON form.
fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
    }
}

/// Build a message value from JSON.
///
/// Accepts either a bare body object or a document as produced by
/// [`JsonVisitor`], whose `body` is then used.
pub fn message_from_json(message: &Message, value: &Value) -> Result<MessageValue> {
    let body = match value.get("body") {
        Some(body) if value.get("message").is_some() => body,
        _ => value,
    };
    block_from_json(&message.block, body, &message.name)
}

/// Build a block value from a JSON object keyed by field, group and
/// var-data names.
pub fn block_from_json(block: &Block, value: &Value, scope: &str) -> Result<BlockValue> {
    let object = value
        .as_object()
        .ok_or_else(|| OtfError::json(scope, "expected an object"))?;
    let mut out = BlockValue::new();
    for (name, item) in object {
        if let Some(field) = block.field(name) {
            let value = from_json(&field.encoding, item, &format!("{scope}.{name}"))?;
            out.fields.insert(name.clone(), value);
        } else if let Some(group) = block.group(name) {
            let scope = format!("{scope}.{name}");
            let items = item
                .as_array()
                .ok_or_else(|| OtfError::json(&scope, "expected an array of elements"))?;
            let elements = items
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    block_from_json(&group.block, element, &format!("{scope}[{i}]"))
                })
                .collect::<Result<Vec<_>>>()?;
            out.groups.insert(name.clone(), elements);
        } else if block.data(name).is_some() {
            let bytes = bytes_from_json(item, &format!("{scope}.{name}"))?;
            out.data.insert(name.clone(), bytes);
        } else {
            return Err(CodecError::UnknownName {
                scope: scope.to_string(),
                name: name.clone(),
            }
            .into());
        }
    }
    Ok(out)
}

/// Parse one field value for `encoding`.
pub fn from_json(encoding: &Encoding, value: &Value, scope: &str) -> Result<FieldValue> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }
    match encoding {
        Encoding::Primitive(ty) if ty.length == 1 => {
            Ok(FieldValue::Primitive(primitive_from_json(ty.primitive, value, scope)?))
        }
        Encoding::Primitive(ty) => match (ty.primitive, value) {
            (PrimitiveType::Char, Value::String(text)) => {
                Ok(FieldValue::Bytes(text.as_bytes().to_vec()))
            }
            (PrimitiveType::Char | PrimitiveType::UInt8, Value::Array(_)) => {
                Ok(FieldValue::Bytes(bytes_from_json(value, scope)?))
            }
            (primitive, Value::Array(items)) => Ok(FieldValue::Array(
                items
                    .iter()
                    .map(|item| primitive_from_json(primitive, item, scope))
                    .collect::<Result<Vec<_>>>()?,
            )),
            _ => Err(OtfError::json(scope, "expected a string or an array")),
        },
        Encoding::Enum(ty) => match value {
            Value::String(name) => Ok(FieldValue::Enum(EnumValue::Known(name.clone()))),
            Value::Number(n) => {
                let raw = n
                    .as_i64()
                    .ok_or_else(|| {
                        OtfError::json(scope, format!("{n} is not a valid '{}' value", ty.name))
                    })?;
                Ok(FieldValue::Enum(EnumValue::Unknown(raw)))
            }
            _ => Err(OtfError::json(scope, "expected a value name or number")),
        },
        Encoding::Set(ty) => match value {
            Value::Array(items) => Ok(FieldValue::Set(
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| OtfError::json(scope, "expected choice names"))
                    })
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Number(_) => Ok(FieldValue::Primitive(primitive_from_json(
                ty.encoding,
                value,
                scope,
            )?)),
            _ => Err(OtfError::json(scope, "expected an array of choice names")),
        },
        Encoding::Composite(ty) => {
            let object = value
                .as_object()
                .ok_or_else(|| OtfError::json(scope, "expected an object"))?;
            let mut members = BTreeMap::new();
            for (name, item) in object {
                let member = ty.member(name).ok_or_else(|| CodecError::UnknownName {
                    scope: scope.to_string(),
                    name: name.clone(),
                })?;
                if member.is_constant() {
                    continue;
                }
                let decoded = from_json(&member.encoding, item, &format!("{scope}.{name}"))?;
                members.insert(name.clone(), decoded);
            }
            Ok(FieldValue::Composite(members))
        }
    }
}

fn primitive_from_json(ty: PrimitiveType, value: &Value, scope: &str) -> Result<PrimitiveValue> {
    let parsed = match (ty, value) {
        (PrimitiveType::Char, Value::String(text)) => match text.as_bytes() {
            [c] => Ok(PrimitiveValue::Char(*c)),
            _ => return Err(OtfError::json(scope, "expected a single character")),
        },
        (PrimitiveType::Float | PrimitiveType::Double, Value::Number(n)) => match n.as_f64() {
            Some(v) => PrimitiveValue::from_f64(ty, v),
            None => return Err(OtfError::json(scope, format!("{n} is not a number"))),
        },
        (_, Value::Number(n)) => {
            if let Some(v) = n.as_i64() {
                PrimitiveValue::from_i64(ty, v)
            } else if let Some(v) = n.as_u64() {
                PrimitiveValue::from_u64(ty, v)
            } else {
                return Err(OtfError::json(scope, format!("{n} is not an integer")));
            }
        }
        _ => return Err(OtfError::json(scope, format!("expected a {ty} value"))),
    };
    parsed.map_err(|err| OtfError::json(scope, err.to_string()))
}

fn bytes_from_json(value: &Value, scope: &str) -> Result<Vec<u8>> {
    match value {
        Value::String(text) => Ok(text.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| OtfError::json(scope, "expected byte values 0-255"))
            })
            .collect(),
        _ => Err(OtfError::json(scope, "expected a string or an array of bytes")),
    }
}

#[cfg(test)]
mod tests {
    use sbeprims_ir::{Ir, SchemaBuilder, SchemaDef};

    use super::*;
    use crate::OtfDecoder;

    fn ir() -> Ir {
        SchemaBuilder::default()
            .build(
                &SchemaDef::from_json(
                    r#"{ "package": "j", "id": 2, "version": 0,
                    "types": [
                        { "kind": "type", "name": "Sym", "primitive": "char", "length": 4 },
                        { "kind": "enum", "name": "Side", "encoding": "uint8",
                          "values": [{ "name": "Buy", "value": 1 }, { "name": "Sell", "value": 2 }] },
                        { "kind": "set", "name": "Flags", "encoding": "uint8",
                          "choices": [{ "name": "Hidden", "bit": 0 }, { "name": "Post", "bit": 1 }] }
                    ],
                    "messages": [{ "name": "Quote", "id": 3, "fields": [
                        { "name": "sym", "type": "Sym" },
                        { "name": "side", "type": "Side" },
                        { "name": "flags", "type": "Flags" },
                        { "name": "px", "type": "double", "presence": "optional" }
                    ],
                    "groups": [{ "name": "levels", "fields": [{ "name": "qty", "type": "int32" }] }],
                    "data": [{ "name": "text", "lengthType": "uint16" }] }]
                }"#,
                )
                .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn json_round_trips_through_the_wire() {
        let ir = ir();
        let message = ir.message_by_id(3).unwrap();
        let input = json!({
            "sym": "ABC",
            "side": "Sell",
            "flags": ["Post"],
            "px": 101.5,
            "levels": [{ "qty": -4 }, { "qty": 9 }],
            "text": "hello"
        });
        let value = message_from_json(message, &input).unwrap();
        let size = sbeprims_codec::encoded_size(&ir, 3, &value, 0).unwrap();
        let mut buf = vec![0u8; size];
        sbeprims_codec::encode_message(&ir, 3, &value, &mut buf, 0, 0).unwrap();

        let mut visitor = JsonVisitor::new();
        let consumed = OtfDecoder::new(&ir).decode(&buf, 0, &mut visitor).unwrap();
        assert_eq!(consumed, size);
        let doc = visitor.into_value().unwrap();
        assert_eq!(doc["message"], "Quote");
        assert_eq!(doc["templateId"], 3);
        assert_eq!(doc["header"]["schemaId"], 2);
        assert_eq!(doc["body"], input);

        // The collected document is accepted back as input.
        assert_eq!(message_from_json(message, &doc).unwrap(), value);
    }

    #[test]
    fn nulls_and_unknown_values() {
        let ir = ir();
        let message = ir.message_by_id(3).unwrap();
        let sym = message.field("sym").unwrap();
        let side = message.field("side").unwrap();
        assert_eq!(to_json(&side.encoding, &FieldValue::Enum(EnumValue::Unknown(7))), json!(7));
        assert_eq!(to_json(&sym.encoding, &FieldValue::Bytes(b"AB\0\0".to_vec())), json!("AB"));
        assert_eq!(
            to_json(&sym.encoding, &FieldValue::Primitive(PrimitiveValue::Double(f64::NAN))),
            Value::Null
        );
        assert_eq!(from_json(&side.encoding, &Value::Null, "side").unwrap(), FieldValue::Null);
        assert_eq!(bytes_to_json(&[0xFF, 1]), json!([255, 1]));
    }

    #[test]
    fn rejects_mismatched_json() {
        let ir = ir();
        let message = ir.message_by_id(3).unwrap();
        let kind = |value: Value| message_from_json(message, &value).unwrap_err().kind();
        assert_eq!(kind(json!({ "nope": 1 })), sbeprims_primitive::ErrorKind::Lookup);
        assert_eq!(kind(json!({ "side": [1] })), sbeprims_primitive::ErrorKind::Range);
        assert_eq!(kind(json!({ "levels": { "qty": 1 } })), sbeprims_primitive::ErrorKind::Range);
        assert_eq!(
            kind(json!({ "levels": [{ "qty": 1.5 }] })),
            sbeprims_primitive::ErrorKind::Range
        );
        assert_eq!(kind(json!({ "text": [256] })), sbeprims_primitive::ErrorKind::Range);
        assert_eq!(kind(json!([])), sbeprims_primitive::ErrorKind::Range);
    }
}
