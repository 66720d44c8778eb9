//! CRC32 and little-endian helpers
//!
//! IEEE CRC32 with a caller-supplied seed so frame checksums chain off the
//! encryption-key CRC (0 for unencrypted boxes).

/// CRC32 of `bytes`, continuing from `seed`
pub fn crc32(seed: u32, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(bytes);
    hasher.finalize()
}

/// Decode a little-endian u32 at `offset`.
///
/// Returns `None` when fewer than four bytes remain.
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
