//! Tests for the typed binary codec
//!
//! These tests verify:
//! - Round-trip encoding for every built-in value shape
//! - The integer-as-double wire representation
//! - Error handling for truncated input and reserved tags
//! - Adapter registration and dispatch through the registry

use std::sync::Arc;

use coffer::codec::{tag, BinaryReader, BinaryWriter, CustomValue, TypeAdapter, TypeRegistry};
use coffer::{CofferError, Value};

fn round_trip(registry: &TypeRegistry, value: Value) -> Value {
    let mut writer = BinaryWriter::new(registry);
    writer.write_value(&value).unwrap();
    let bytes = writer.into_bytes();
    let mut reader = BinaryReader::new(&bytes, registry);
    let decoded = reader.read_value().unwrap();
    assert_eq!(reader.remaining(), 0, "value not fully consumed");
    decoded
}

// =============================================================================
// Built-in Round-Trip Tests
// =============================================================================

#[test]
fn test_round_trip_primitives() {
    let registry = TypeRegistry::new();
    for value in [
        Value::Null,
        Value::Int(0),
        Value::Int(-42),
        Value::Int(1 << 40),
        Value::Double(3.25),
        Value::Double(-0.0),
        Value::Bool(true),
        Value::Bool(false),
        Value::Str("hello".to_string()),
        Value::Str("ünïcödé ≠ ascii".to_string()),
        Value::Str(String::new()),
    ] {
        assert_eq!(round_trip(&registry, value.clone()), value);
    }
}

#[test]
fn test_round_trip_collections() {
    let registry = TypeRegistry::new();
    for value in [
        Value::Bytes(vec![0, 1, 2, 255]),
        Value::Bytes(Vec::new()),
        Value::IntList(vec![-1, 0, 1, 1 << 30]),
        Value::DoubleList(vec![0.5, -2.25]),
        Value::BoolList(vec![true, false, true]),
        Value::StrList(vec!["a".to_string(), String::new(), "ccc".to_string()]),
        Value::List(vec![Value::Null, Value::Int(7), Value::Str("x".to_string())]),
        Value::Map(vec![
            (Value::Str("k".to_string()), Value::Int(1)),
            (Value::Int(2), Value::List(vec![Value::Bool(true)])),
        ]),
    ] {
        assert_eq!(round_trip(&registry, value.clone()), value);
    }
}

#[test]
fn test_nested_collections() {
    let registry = TypeRegistry::new();
    let value = Value::Map(vec![(
        Value::Str("outer".to_string()),
        Value::List(vec![Value::Map(vec![(
            Value::Str("inner".to_string()),
            Value::IntList(vec![1, 2, 3]),
        )])]),
    )]);
    assert_eq!(round_trip(&registry, value.clone()), value);
}

// =============================================================================
// Wire Representation Tests
// =============================================================================

#[test]
fn test_int_is_stored_as_double() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    writer.write_value(&Value::Int(42)).unwrap();
    let bytes = writer.into_bytes();

    assert_eq!(bytes.len(), 9);
    assert_eq!(bytes[0], tag::INT);
    assert_eq!(&bytes[1..], &42f64.to_le_bytes());
}

#[test]
fn test_fractional_double_truncates_to_int() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    writer.write_double(7.9);
    let bytes = writer.into_bytes();

    let mut reader = BinaryReader::new(&bytes, &registry);
    assert_eq!(reader.read_int().unwrap(), 7);
}

#[test]
fn test_primitive_round_trips() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    writer.write_byte(0xAB);
    writer.write_word(0xBEEF);
    writer.write_int32(-123456);
    writer.write_uint32(0xDEADBEEF);
    writer.write_double(1.5);
    writer.write_bool(true);
    writer.write_string("päck").unwrap();
    let bytes = writer.into_bytes();

    let mut reader = BinaryReader::new(&bytes, &registry);
    assert_eq!(reader.read_byte().unwrap(), 0xAB);
    assert_eq!(reader.read_word().unwrap(), 0xBEEF);
    assert_eq!(reader.read_int32().unwrap(), -123456);
    assert_eq!(reader.read_uint32().unwrap(), 0xDEADBEEF);
    assert_eq!(reader.read_double().unwrap(), 1.5);
    assert!(reader.read_bool().unwrap());
    assert_eq!(reader.read_string().unwrap(), "päck");
    assert_eq!(reader.remaining(), 0);
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn test_truncated_read_fails() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    writer.write_value(&Value::Str("truncate me".to_string())).unwrap();
    let bytes = writer.into_bytes();

    let mut reader = BinaryReader::new(&bytes[..bytes.len() - 3], &registry);
    let result = reader.read_value();
    assert!(matches!(result, Err(CofferError::CorruptFrame(_))));
}

#[test]
fn test_reserved_tag_fails() {
    let registry = TypeRegistry::new();
    let bytes = [12u8]; // first reserved tag
    let mut reader = BinaryReader::new(&bytes, &registry);
    assert!(matches!(
        reader.read_value(),
        Err(CofferError::CorruptFrame(_))
    ));
}

#[test]
fn test_unknown_adapter_tag_fails() {
    let registry = TypeRegistry::new();
    let bytes = [tag::CUSTOM_BASE + 5];
    let mut reader = BinaryReader::new(&bytes, &registry);
    assert!(matches!(
        reader.read_value(),
        Err(CofferError::UnknownType(5))
    ));
}

#[test]
fn test_oversized_collection_rejected() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    let list = vec![true; 70_000];
    assert!(matches!(
        writer.write_bool_list(&list),
        Err(CofferError::UnsupportedOperation(_))
    ));
}

// =============================================================================
// Adapter Registry Tests
// =============================================================================

/// Encodes a 2D point as two little-endian i32s
struct PointAdapter;

impl TypeAdapter for PointAdapter {
    fn read(&self, reader: &mut BinaryReader<'_>) -> coffer::Result<Value> {
        let x = reader.read_int32()? as i64;
        let y = reader.read_int32()? as i64;
        Ok(Value::Custom(CustomValue::new(
            0,
            Value::IntList(vec![x, y]),
        )))
    }

    fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> coffer::Result<()> {
        let Value::Custom(custom) = value else {
            return Err(CofferError::UnknownType(0));
        };
        let Value::IntList(coords) = custom.payload.as_ref() else {
            return Err(CofferError::UnknownType(0));
        };
        writer.write_int32(coords[0] as i32);
        writer.write_int32(coords[1] as i32);
        Ok(())
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Custom(custom) if custom.type_id == 0)
    }
}

fn point(x: i64, y: i64) -> Value {
    Value::Custom(CustomValue::new(0, Value::IntList(vec![x, y])))
}

#[test]
fn test_custom_value_round_trip() {
    let registry = TypeRegistry::new();
    registry.register(Arc::new(PointAdapter), 0).unwrap();

    let value = point(3, -4);
    assert_eq!(round_trip(&registry, value.clone()), value);
}

#[test]
fn test_custom_tag_offsets_past_builtins() {
    let registry = TypeRegistry::new();
    registry.register(Arc::new(PointAdapter), 0).unwrap();

    let mut writer = BinaryWriter::new(&registry);
    writer.write_value(&point(1, 2)).unwrap();
    let bytes = writer.into_bytes();
    assert_eq!(bytes[0], tag::CUSTOM_BASE);
}

#[test]
fn test_duplicate_registration_fails() {
    let registry = TypeRegistry::new();
    registry.register(Arc::new(PointAdapter), 7).unwrap();
    assert!(matches!(
        registry.register(Arc::new(PointAdapter), 7),
        Err(CofferError::AlreadyRegistered(7))
    ));
}

#[test]
fn test_type_id_out_of_range_fails() {
    let registry = TypeRegistry::new();
    assert!(matches!(
        registry.register(Arc::new(PointAdapter), 224),
        Err(CofferError::InvalidTypeId(224))
    ));
}

#[test]
fn test_parent_registry_fallthrough() {
    let parent = Arc::new(TypeRegistry::new());
    parent.register(Arc::new(PointAdapter), 0).unwrap();
    let child = TypeRegistry::with_parent(Arc::clone(&parent));

    // Lookup by id and by value both fall through to the parent
    assert!(child.find_by_id(0).is_some());
    assert!(child.find_by_value(&point(1, 1)).is_some());

    // The child cannot shadow an id the parent claims
    assert!(matches!(
        child.register(Arc::new(PointAdapter), 0),
        Err(CofferError::AlreadyRegistered(0))
    ));

    let value = point(9, 9);
    assert_eq!(round_trip(&child, value.clone()), value);
}

#[test]
fn test_unregistered_custom_value_fails_on_write() {
    let registry = TypeRegistry::new();
    let mut writer = BinaryWriter::new(&registry);
    assert!(matches!(
        writer.write_value(&point(1, 2)),
        Err(CofferError::UnknownType(0))
    ));
}
