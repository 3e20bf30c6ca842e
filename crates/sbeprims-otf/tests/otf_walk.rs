use sbeprims_codec::{decode_message, encode_message, encoded_size, DecoderConfig, MessageValue};
use sbeprims_ir::{decode_ir, encode_ir_to_vec, Group, Ir, SchemaBuilder, SchemaDef};
use sbeprims_otf::{JsonVisitor, OtfConfig, OtfDecoder, Visitor};
use sbeprims_primitive::{ErrorKind, PrimitiveValue};
use serde_json::json;

fn book_ir() -> Ir {
    SchemaBuilder::default()
        .build(
            &SchemaDef::from_json(
                r#"{ "package": "book", "id": 11, "version": 0,
                "messages": [{ "name": "Book", "id": 4,
                    "fields": [{ "name": "seq", "type": "uint32" }],
                    "groups": [{ "name": "sides", "fields": [{ "name": "bid", "type": "uint8" }],
                        "groups": [{ "name": "levels", "fields": [{ "name": "px", "type": "int64" }] }],
                        "data": [{ "name": "venue", "lengthType": "uint8" }] }],
                    "data": [{ "name": "note", "lengthType": "uint16" }] }]
            }"#,
            )
            .unwrap(),
        )
        .unwrap()
}

fn book() -> MessageValue {
    let level = |px: i64| MessageValue::new().with_field("px", PrimitiveValue::Int64(px));
    MessageValue::new()
        .with_field("seq", PrimitiveValue::UInt32(9))
        .with_group(
            "sides",
            vec![
                MessageValue::new()
                    .with_field("bid", PrimitiveValue::UInt8(1))
                    .with_group("levels", vec![level(100), level(99)])
                    .with_data("venue", b"X".to_vec()),
                MessageValue::new()
                    .with_field("bid", PrimitiveValue::UInt8(0))
                    .with_group("levels", vec![])
                    .with_data("venue", b"YZ".to_vec()),
            ],
        )
        .with_data("note", b"ok".to_vec())
}

fn encode(ir: &Ir) -> Vec<u8> {
    let value = book();
    let mut buf = vec![0u8; encoded_size(ir, 4, &value, 0).unwrap()];
    encode_message(ir, 4, &value, &mut buf, 0, 0).unwrap();
    buf
}

#[test]
fn persisted_ir_decodes_nested_groups_to_json() {
    // Decode with an IR that went through the binary IR stream.
    let ir = decode_ir(&encode_ir_to_vec(&book_ir()).unwrap()).unwrap();
    let buf = encode(&ir);

    let mut visitor = JsonVisitor::new();
    let consumed = OtfDecoder::new(&ir).decode(&buf, 0, &mut visitor).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(
        visitor.take().unwrap()["body"],
        json!({
            "seq": 9,
            "sides": [
                { "bid": 1, "levels": [{ "px": 100 }, { "px": 99 }], "venue": "X" },
                { "bid": 0, "levels": [], "venue": "YZ" }
            ],
            "note": "ok"
        })
    );
    assert!(visitor.value().is_none());
}

#[test]
fn agrees_with_the_value_decoder() {
    let ir = book_ir();
    let buf = encode(&ir);
    let (_, value) = decode_message(&ir, &buf, 0).unwrap();
    assert_eq!(value, book());

    // Consecutive messages: the OTF byte count lands on the next header.
    let mut stream = buf.clone();
    stream.extend_from_slice(&buf);
    let decoder = OtfDecoder::new(&ir);
    let first = decoder.decode(&stream, 0, JsonVisitor::new()).unwrap();
    let second = decoder.decode(&stream, first, JsonVisitor::new()).unwrap();
    assert_eq!(first + second, stream.len());
}

#[derive(Default)]
struct Depth {
    current: usize,
    deepest: usize,
}

impl Visitor for Depth {
    fn on_begin_group(&mut self, _group: &Group, _count: usize) {
        self.current += 1;
        self.deepest = self.deepest.max(self.current);
    }

    fn on_end_group(&mut self, _group: &Group) {
        self.current -= 1;
    }
}

#[test]
fn nesting_limit_applies() {
    let ir = book_ir();
    let buf = encode(&ir);

    let mut depth = Depth::default();
    OtfDecoder::new(&ir).decode(&buf, 0, &mut depth).unwrap();
    assert_eq!(depth.deepest, 2);
    assert_eq!(depth.current, 0);

    let shallow = OtfConfig::with_decoder(DecoderConfig {
        max_depth: 0,
        ..DecoderConfig::default()
    });
    let err = OtfDecoder::with_config(&ir, shallow)
        .decode(&buf, 0, Depth::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

#[test]
fn hostile_lengths_are_rejected() {
    let ir = book_ir();
    let mut buf = encode(&ir);
    // The note length prefix is the last var-data header: 2 bytes before "ok".
    let at = buf.len() - 4;
    buf[at] = 0xFF;
    buf[at + 1] = 0xFF;
    let err = OtfDecoder::new(&ir).decode(&buf, 0, JsonVisitor::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BufferUnderflow);

    let tight = OtfConfig::with_decoder(DecoderConfig {
        max_var_data_length: 1,
        ..DecoderConfig::default()
    });
    let err = OtfDecoder::with_config(&ir, tight)
        .decode(&encode(&ir), 0, JsonVisitor::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

#[test]
fn older_views_walk_over_newer_sections() {
    let ir = SchemaBuilder::default()
        .build(
            &SchemaDef::from_json(
                r#"{ "package": "n", "id": 3, "version": 1,
                "messages": [{ "name": "M", "id": 1, "fields": [{ "name": "a", "type": "uint8" }],
                    "groups": [{ "name": "g", "fields": [{ "name": "x", "type": "uint8" }],
                                 "data": [{ "name": "d", "lengthType": "uint8", "sinceVersion": 1 }] }],
                    "data": [{ "name": "e", "lengthType": "uint8" }] }]
            }"#,
            )
            .unwrap(),
        )
        .unwrap();
    // header(8) | a=1 | g: [x=7 d="z"] [x=8 d=""] | e="tail"
    let buf = [
        1u8, 0, 1, 0, 3, 0, 1, 0, //
        1, //
        1, 0, 2, 0, 7, 1, b'z', 8, 0, //
        4, b't', b'a', b'i', b'l',
    ];

    let mut visitor = JsonVisitor::new();
    let consumed = OtfDecoder::new(&ir).decode_as(&buf, 0, 0, &mut visitor).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(
        visitor.take().unwrap()["body"],
        json!({ "a": 1, "g": [{ "x": 7 }, { "x": 8 }], "e": "tail" })
    );

    let mut visitor = JsonVisitor::new();
    OtfDecoder::new(&ir).decode(&buf, 0, &mut visitor).unwrap();
    assert_eq!(visitor.take().unwrap()["body"]["g"][0]["d"], json!("z"));
}
