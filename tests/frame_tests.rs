//! Tests for frame encoding, CRC verification and the encryption envelope
//!
//! These tests verify:
//! - Round-trip encoding for both key kinds, values and tombstones
//! - CRC corruption detection
//! - Lazy decoding (key and length only)
//! - The AES-256-CBC envelope and wrong-key rejection

use coffer::crypto::BoxCipher;
use coffer::frame::codec::{decode_frame, encode_frame};
use coffer::frame::crc::{crc32, read_u32_le};
use coffer::{BoxKey, CofferError, Frame, TypeRegistry, Value};

fn encode(frame: &Frame, registry: &TypeRegistry, cipher: Option<&BoxCipher>) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_frame(frame, registry, cipher, &mut buf).unwrap();
    buf
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_round_trip_string_key() {
    let registry = TypeRegistry::new();
    let frame = Frame::new(BoxKey::string("user").unwrap(), Value::Int(17));
    let bytes = encode(&frame, &registry, None);

    let decoded = decode_frame(&bytes, &registry, None, false, 640).unwrap();
    assert_eq!(decoded.key, frame.key);
    assert_eq!(decoded.value, Some(Value::Int(17)));
    assert!(!decoded.is_tombstone());
    assert_eq!(decoded.offset, 640);
    assert_eq!(decoded.length as usize, bytes.len());
}

#[test]
fn test_round_trip_int_key() {
    let registry = TypeRegistry::new();
    let frame = Frame::new(BoxKey::Int(u32::MAX), Value::Str("last".to_string()));
    let bytes = encode(&frame, &registry, None);

    let decoded = decode_frame(&bytes, &registry, None, false, 0).unwrap();
    assert_eq!(decoded.key, BoxKey::Int(u32::MAX));
    assert_eq!(decoded.value, Some(Value::Str("last".to_string())));
}

#[test]
fn test_round_trip_tombstone() {
    let registry = TypeRegistry::new();
    for key in [BoxKey::Int(9), BoxKey::string("gone").unwrap()] {
        let bytes = encode(&Frame::tombstone(key.clone()), &registry, None);
        let decoded = decode_frame(&bytes, &registry, None, false, 0).unwrap();
        assert_eq!(decoded.key, key);
        assert!(decoded.is_tombstone());
        assert_eq!(decoded.value, None);
    }
}

#[test]
fn test_lazy_decode_skips_value() {
    let registry = TypeRegistry::new();
    let frame = Frame::new(
        BoxKey::string("big").unwrap(),
        Value::Bytes(vec![7; 4096]),
    );
    let bytes = encode(&frame, &registry, None);

    let decoded = decode_frame(&bytes, &registry, None, true, 123).unwrap();
    assert_eq!(decoded.key, frame.key);
    assert_eq!(decoded.value, None);
    assert!(!decoded.is_tombstone());
    assert_eq!(decoded.offset, 123);
    assert_eq!(decoded.length as usize, bytes.len());
}

#[test]
fn test_length_prefix_and_crc_layout() {
    let registry = TypeRegistry::new();
    let bytes = encode(
        &Frame::new(BoxKey::Int(1), Value::Bool(true)),
        &registry,
        None,
    );

    let length = read_u32_le(&bytes, 0).unwrap();
    assert_eq!(length as usize, bytes.len());

    let stored_crc = read_u32_le(&bytes, bytes.len() - 4).unwrap();
    assert_eq!(stored_crc, crc32(0, &bytes[..bytes.len() - 4]));
}

// =============================================================================
// Corruption Detection
// =============================================================================

#[test]
fn test_flipped_byte_detected() {
    let registry = TypeRegistry::new();
    let mut bytes = encode(
        &Frame::new(BoxKey::string("key").unwrap(), Value::Int(5)),
        &registry,
        None,
    );
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;

    let result = decode_frame(&bytes, &registry, None, false, 0);
    assert!(matches!(result, Err(CofferError::CorruptFrame(_))));
}

#[test]
fn test_truncated_frame_detected() {
    let registry = TypeRegistry::new();
    let bytes = encode(
        &Frame::new(BoxKey::string("key").unwrap(), Value::Int(5)),
        &registry,
        None,
    );

    let result = decode_frame(&bytes[..bytes.len() - 1], &registry, None, false, 0);
    assert!(matches!(result, Err(CofferError::CorruptFrame(_))));
}

// =============================================================================
// Encryption Tests
// =============================================================================

#[test]
fn test_cipher_round_trip() {
    let cipher = BoxCipher::new([0x42; 32]);
    let plain = b"some serialized value bytes";
    let sealed = cipher.encrypt(plain);

    assert_ne!(&sealed[16..], plain.as_slice());
    assert_eq!(cipher.decrypt(&sealed).unwrap(), plain);
}

#[test]
fn test_cipher_uses_random_iv() {
    let cipher = BoxCipher::new([0x42; 32]);
    let a = cipher.encrypt(b"same plaintext");
    let b = cipher.encrypt(b"same plaintext");
    assert_ne!(a, b);
}

#[test]
fn test_cipher_rejects_garbage() {
    let cipher = BoxCipher::new([0x42; 32]);
    assert!(matches!(
        cipher.decrypt(&[0u8; 7]),
        Err(CofferError::CorruptFrame(_))
    ));
    assert!(matches!(
        cipher.decrypt(&[0u8; 21]),
        Err(CofferError::CorruptFrame(_))
    ));
}

#[test]
fn test_encrypted_frame_round_trip() {
    let registry = TypeRegistry::new();
    let cipher = BoxCipher::new([7; 32]);
    let value = Value::IntList(vec![1, 2, 3]);
    let frame = Frame::new(BoxKey::string("x").unwrap(), value.clone());

    let bytes = encode(&frame, &registry, Some(&cipher));
    let decoded = decode_frame(&bytes, &registry, Some(&cipher), false, 0).unwrap();
    assert_eq!(decoded.value, Some(value));
}

#[test]
fn test_wrong_key_fails_at_crc() {
    let registry = TypeRegistry::new();
    let writer_cipher = BoxCipher::new([1; 32]);
    let reader_cipher = BoxCipher::new([2; 32]);
    let frame = Frame::new(BoxKey::Int(0), Value::Int(1));

    let bytes = encode(&frame, &registry, Some(&writer_cipher));
    // The key CRC seeds the frame CRC, so the mismatch surfaces before
    // any decryption happens
    let result = decode_frame(&bytes, &registry, Some(&reader_cipher), false, 0);
    assert!(matches!(result, Err(CofferError::CorruptFrame(_))));
}

#[test]
fn test_unencrypted_frame_rejected_by_encrypted_reader() {
    let registry = TypeRegistry::new();
    let cipher = BoxCipher::new([1; 32]);
    let bytes = encode(&Frame::new(BoxKey::Int(0), Value::Int(1)), &registry, None);

    let result = decode_frame(&bytes, &registry, Some(&cipher), false, 0);
    assert!(matches!(result, Err(CofferError::CorruptFrame(_))));
}

// =============================================================================
// Key Validation and Ordering
// =============================================================================

#[test]
fn test_string_key_validation() {
    assert!(BoxKey::string("ok").is_ok());
    assert!(BoxKey::string("k".repeat(255)).is_ok());
    assert!(matches!(
        BoxKey::string(""),
        Err(CofferError::InvalidKey(_))
    ));
    assert!(matches!(
        BoxKey::string("k".repeat(256)),
        Err(CofferError::InvalidKey(_))
    ));
    assert!(matches!(
        BoxKey::string("schlüssel"),
        Err(CofferError::InvalidKey(_))
    ));
}

#[test]
fn test_key_ordering() {
    let mut keys = vec![
        BoxKey::string("b").unwrap(),
        BoxKey::Int(10),
        BoxKey::string("a").unwrap(),
        BoxKey::Int(2),
        BoxKey::string("a0").unwrap(),
    ];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            BoxKey::Int(2),
            BoxKey::Int(10),
            BoxKey::string("a").unwrap(),
            BoxKey::string("a0").unwrap(),
            BoxKey::string("b").unwrap(),
        ]
    );
}
