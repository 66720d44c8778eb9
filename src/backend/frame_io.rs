//! Frame scanning
//!
//! Whole-file scans that turn a box file back into a keystore on open. A
//! frame that fails its CRC, or a torn tail, stops the scan; the offset of
//! the last good frame is handed back so the caller can truncate.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use tracing::debug;

use crate::codec::TypeRegistry;
use crate::crypto::BoxCipher;
use crate::error::{CofferError, Result};
use crate::frame::codec::{decode_frame, MIN_FRAME_LEN};
use crate::frame::crc::read_u32_le;
use crate::keystore::Keystore;

/// Scan decoding keys and values; used for eager open.
///
/// Returns the recovery offset: `-1` when the whole file is valid, else the
/// byte position the file should be truncated to.
pub fn frames_from_file(
    file: &mut File,
    registry: &TypeRegistry,
    cipher: Option<&BoxCipher>,
    keystore: &mut Keystore,
) -> Result<i64> {
    scan(file, registry, cipher, keystore, false)
}

/// Scan decoding only keys and tombstone-ness; used for lazy open
pub fn keys_from_file(
    file: &mut File,
    registry: &TypeRegistry,
    cipher: Option<&BoxCipher>,
    keystore: &mut Keystore,
) -> Result<i64> {
    scan(file, registry, cipher, keystore, true)
}

fn scan(
    file: &mut File,
    registry: &TypeRegistry,
    cipher: Option<&BoxCipher>,
    keystore: &mut Keystore,
    lazy: bool,
) -> Result<i64> {
    let file_size = file.metadata()?.len();
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(file);

    let mut offset: u64 = 0;
    let mut frames: usize = 0;

    loop {
        let mut prefix = [0u8; 4];
        let got = read_fully(&mut reader, &mut prefix)?;
        if got == 0 {
            break; // clean end of file
        }
        if got < 4 {
            return Ok(offset as i64);
        }

        let length = read_u32_le(&prefix, 0).unwrap_or(0);
        if length < MIN_FRAME_LEN || offset + length as u64 > file_size {
            return Ok(offset as i64);
        }

        let mut frame_buf = vec![0u8; length as usize];
        frame_buf[..4].copy_from_slice(&prefix);
        if read_fully(&mut reader, &mut frame_buf[4..])? < length as usize - 4 {
            return Ok(offset as i64);
        }

        let frame = match decode_frame(&frame_buf, registry, cipher, lazy, offset) {
            Ok(frame) => frame,
            Err(CofferError::CorruptFrame(_)) => return Ok(offset as i64),
            Err(e) => return Err(e),
        };
        keystore.apply_frame(&frame);

        offset += length as u64;
        frames += 1;
    }

    debug!(frames, entries = keystore.len(), lazy, "scanned box file");
    Ok(-1)
}

/// Read until `buf` is full or the stream ends; returns bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
