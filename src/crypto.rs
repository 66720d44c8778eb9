//! Frame encryption
//!
//! AES-256-CBC over serialized value bytes. Each encryption draws a fresh
//! 16-byte IV and emits it as the first block of the ciphertext. The CRC32
//! of the key seeds every frame CRC, so frames written under a different key
//! fail the checksum before decryption is even attempted.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CofferError, Result};
use crate::frame::crc::crc32;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// Cipher bound to one box's 32-byte key
pub struct BoxCipher {
    key: [u8; 32],
    key_crc: u32,
}

impl BoxCipher {
    pub fn new(key: [u8; 32]) -> Self {
        let key_crc = crc32(0, &key);
        Self { key, key_crc }
    }

    /// CRC32 of the key, used as the seed for frame CRCs
    pub fn key_crc(&self) -> u32 {
        self.key_crc
    }

    /// Encrypt value bytes; the random IV is the first 16 output bytes
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Decrypt value bytes produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < IV_LEN + BLOCK_LEN || (data.len() - IV_LEN) % BLOCK_LEN != 0 {
            return Err(CofferError::CorruptFrame(format!(
                "encrypted value has invalid length {}",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(IV_LEN);

        Aes256CbcDec::new_from_slices(&self.key, iv)
            .map_err(|_| CofferError::CorruptFrame("invalid cipher state".to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CofferError::CorruptFrame("invalid padding in encrypted value".to_string()))
    }
}

// Debug impl that doesn't expose key material
impl std::fmt::Debug for BoxCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxCipher")
            .field("key_crc", &self.key_crc)
            .finish()
    }
}
