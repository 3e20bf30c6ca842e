use proptest::prelude::*;
use sbeprims_primitive::{get, put, ByteOrder, PrimitiveType, PrimitiveValue};

fn arb_order() -> impl Strategy<Value = ByteOrder> {
    prop_oneof![Just(ByteOrder::LittleEndian), Just(ByteOrder::BigEndian)]
}

fn arb_value() -> impl Strategy<Value = PrimitiveValue> {
    prop_oneof![
        any::<u8>().prop_map(PrimitiveValue::Char),
        any::<i8>().prop_map(PrimitiveValue::Int8),
        any::<i16>().prop_map(PrimitiveValue::Int16),
        any::<i32>().prop_map(PrimitiveValue::Int32),
        any::<i64>().prop_map(PrimitiveValue::Int64),
        any::<u8>().prop_map(PrimitiveValue::UInt8),
        any::<u16>().prop_map(PrimitiveValue::UInt16),
        any::<u32>().prop_map(PrimitiveValue::UInt32),
        any::<u64>().prop_map(PrimitiveValue::UInt64),
        any::<f32>().prop_map(PrimitiveValue::Float),
        any::<f64>().prop_map(PrimitiveValue::Double),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn primitive_values_roundtrip(value in arb_value(), order in arb_order(), offset in 0usize..16) {
        let ty = value.primitive_type();
        let mut buf = vec![0u8; offset + ty.size()];
        let written = put(&mut buf, offset, &value, order).unwrap();
        prop_assert_eq!(written, ty.size());
        let decoded = get(&buf, offset, ty, order).unwrap();
        prop_assert!(decoded.bit_eq(&value));
    }

    #[test]
    fn in_range_integers_survive_narrowing(v in -128i64..=127) {
        for ty in [
            PrimitiveType::Int8,
            PrimitiveType::Int16,
            PrimitiveType::Int32,
            PrimitiveType::Int64,
        ] {
            let value = PrimitiveValue::from_i64(ty, v).unwrap();
            prop_assert_eq!(value.as_i64(), Some(v));
        }
    }

    #[test]
    fn out_of_range_integers_fail(v in 256i64..i64::MAX) {
        prop_assert!(PrimitiveValue::from_i64(PrimitiveType::UInt8, v).is_err());
        prop_assert!(PrimitiveValue::from_i64(PrimitiveType::Char, v).is_err());
    }

    #[test]
    fn short_buffers_never_panic(value in arb_value(), short in 0usize..8) {
        let ty = value.primitive_type();
        prop_assume!(short < ty.size());
        let mut buf = vec![0u8; short];
        prop_assert!(put(&mut buf, 0, &value, ByteOrder::LittleEndian).is_err());
        prop_assert!(get(&buf, 0, ty, ByteOrder::LittleEndian).is_err());
    }
}
