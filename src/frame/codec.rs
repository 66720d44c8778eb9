//! Frame encode/decode
//!
//! One frame maps to one contiguous byte range in the box file. Encoding
//! appends to a caller-owned buffer so a batch of frames becomes a single
//! write; decoding verifies the CRC before touching the payload.

use super::crc::{crc32, read_u32_le};
use super::{BoxKey, Frame};
use crate::codec::{BinaryReader, BinaryWriter, TypeRegistry};
use crate::crypto::BoxCipher;
use crate::error::{CofferError, Result};

/// Key-block tag for integer keys
pub const KEY_INT: u8 = 0;
/// Key-block tag for ASCII string keys
pub const KEY_STR: u8 = 1;

/// Length prefix + key tag + u32 key + CRC: no valid frame is shorter
pub const MIN_FRAME_LEN: u32 = 11;

/// Encode `frame` onto the end of `out`, returning its on-disk length.
///
/// Layout per the module docs: u32 length, key block, optional value block,
/// u32 CRC. With a cipher, the value block is the IV-prefixed ciphertext of
/// the serialized value; the CRC seed is the cipher's key CRC.
pub fn encode_frame(
    frame: &Frame,
    registry: &TypeRegistry,
    cipher: Option<&BoxCipher>,
    out: &mut Vec<u8>,
) -> Result<u32> {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]); // length, patched below

    match &frame.key {
        BoxKey::Int(key) => {
            out.push(KEY_INT);
            out.extend_from_slice(&key.to_le_bytes());
        }
        BoxKey::Str(key) => {
            // Revalidate here: the Str variant is public and the length
            // byte cannot represent anything outside 1..=255
            if key.is_empty() || key.len() > 255 || !key.is_ascii() {
                out.truncate(start);
                return Err(CofferError::InvalidKey(key.clone()));
            }
            out.push(KEY_STR);
            out.push(key.len() as u8);
            out.extend_from_slice(key.as_bytes());
        }
    }

    if let Some(value) = &frame.value {
        let mut writer = BinaryWriter::new(registry);
        writer.write_value(value)?;
        let plain = writer.into_bytes();
        match cipher {
            Some(cipher) => out.extend_from_slice(&cipher.encrypt(&plain)),
            None => out.extend_from_slice(&plain),
        }
    }

    out.extend_from_slice(&[0u8; 4]); // CRC, patched below
    let length = (out.len() - start) as u32;
    out[start..start + 4].copy_from_slice(&length.to_le_bytes());

    let seed = cipher.map_or(0, BoxCipher::key_crc);
    let crc = crc32(seed, &out[start..start + length as usize - 4]);
    let crc_at = start + length as usize - 4;
    out[crc_at..crc_at + 4].copy_from_slice(&crc.to_le_bytes());

    Ok(length)
}

/// Decode one frame from `bytes` (the full on-disk range, length prefix and
/// CRC included).
///
/// `lazy` skips value decoding and returns a frame carrying only key,
/// offset and length; tombstone-ness is still detected.
pub fn decode_frame(
    bytes: &[u8],
    registry: &TypeRegistry,
    cipher: Option<&BoxCipher>,
    lazy: bool,
    offset: u64,
) -> Result<Frame> {
    let length = read_u32_le(bytes, 0)
        .ok_or_else(|| CofferError::CorruptFrame("frame shorter than length prefix".to_string()))?;
    if length < MIN_FRAME_LEN || length as usize != bytes.len() {
        return Err(CofferError::CorruptFrame(format!(
            "frame length {} does not match {} available bytes",
            length,
            bytes.len()
        )));
    }

    let crc_at = bytes.len() - 4;
    let stored_crc = read_u32_le(bytes, crc_at).ok_or_else(|| {
        CofferError::CorruptFrame("frame shorter than trailing CRC".to_string())
    })?;
    let seed = cipher.map_or(0, BoxCipher::key_crc);
    let computed_crc = crc32(seed, &bytes[..crc_at]);
    if stored_crc != computed_crc {
        return Err(CofferError::CorruptFrame(format!(
            "CRC mismatch: stored {:08x}, computed {:08x}",
            stored_crc, computed_crc
        )));
    }

    let body = &bytes[4..crc_at];
    let mut reader = BinaryReader::new(body, registry);

    let key = match reader.read_byte()? {
        KEY_INT => BoxKey::Int(reader.read_uint32()?),
        KEY_STR => {
            let len = reader.read_byte()? as usize;
            let raw = reader.read_raw(len)?;
            if !raw.is_ascii() {
                return Err(CofferError::CorruptFrame(
                    "string key is not ASCII".to_string(),
                ));
            }
            BoxKey::Str(String::from_utf8_lossy(raw).into_owned())
        }
        t => {
            return Err(CofferError::CorruptFrame(format!(
                "unknown key tag {}",
                t
            )))
        }
    };

    // No bytes after the key means the frame is a tombstone
    if reader.remaining() == 0 {
        let mut frame = Frame::tombstone(key);
        frame.offset = offset;
        frame.length = length;
        return Ok(frame);
    }

    if lazy {
        return Ok(Frame::lazy(key, offset, length));
    }

    let value = match cipher {
        Some(cipher) => {
            let rest = reader.remaining();
            let ciphertext = reader.read_raw(rest)?;
            let plain = cipher.decrypt(ciphertext)?;
            let mut value_reader = BinaryReader::new(&plain, registry);
            value_reader.read_value()?
        }
        None => reader.read_value()?,
    };

    let mut frame = Frame::new(key, value);
    frame.offset = offset;
    frame.length = length;
    Ok(frame)
}
