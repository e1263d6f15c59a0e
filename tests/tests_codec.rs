//! Legacy value-codec tests: tag selection and exact-inverse decode.

use std::sync::Arc;

use rstest::rstest;

use yangine::codec::{
    STRING_BYTES_THRESHOLD, ValueTag, decode_value, encode_value, tag_for,
};
use yangine::tree::Value;

/// Serializing a short string selects `STRING_TYPE`; a string at or past the
/// 65 536 threshold selects `STRING_BYTES_TYPE`.
#[test]
fn test_string_small_vs_large() {
    assert_eq!(tag_for(&Value::str("foobar")), ValueTag::StringType);

    let large = "x".repeat(STRING_BYTES_THRESHOLD);
    assert_eq!(tag_for(&Value::str(large.as_str())), ValueTag::StringBytesType);

    let just_below = "x".repeat(STRING_BYTES_THRESHOLD - 1);
    assert_eq!(tag_for(&Value::str(just_below.as_str())), ValueTag::StringType);
}

#[rstest]
#[case::bool_true(Value::Bool(true))]
#[case::bool_false(Value::Bool(false))]
#[case::int(Value::Int(-1234567))]
#[case::uint(Value::Uint(u64::MAX))]
#[case::decimal(Value::Decimal { digits: -250, fraction_digits: 2 })]
#[case::binary(Value::Binary(Arc::from(&[0u8, 255, 1][..])))]
#[case::enumeration(Value::Enum("active".into()))]
#[case::empty(Value::Empty)]
#[case::short_string(Value::str("foobar"))]
fn test_encode_decode_is_exact_inverse(#[case] value: Value) {
    let mut out = Vec::new();
    encode_value(&value, &mut out);
    let mut slice = out.as_slice();
    assert_eq!(decode_value(&mut slice).unwrap(), value);
    assert!(slice.is_empty());
}

#[test]
fn test_large_string_round_trip() {
    let value = Value::str("y".repeat(STRING_BYTES_THRESHOLD + 7).as_str());
    let mut out = Vec::new();
    encode_value(&value, &mut out);
    assert_eq!(out[0], ValueTag::StringBytesType as u8);
    let mut slice = out.as_slice();
    assert_eq!(decode_value(&mut slice).unwrap(), value);
}

#[test]
fn test_stream_of_values_decodes_in_order() {
    let values = vec![
        Value::Uint(7),
        Value::str("mtu"),
        Value::Bool(false),
        Value::Empty,
    ];
    let mut out = Vec::new();
    for value in &values {
        encode_value(value, &mut out);
    }
    let mut slice = out.as_slice();
    let decoded: Vec<Value> = (0..values.len())
        .map(|_| decode_value(&mut slice).unwrap())
        .collect();
    assert_eq!(decoded, values);
    assert!(slice.is_empty());
}
