//! The sealed-key container and its binary layout.
//!
//! ```text
//! version     u8
//! m_cost      u32 LE   Argon2 memory cost (KiB)
//! t_cost      u32 LE   Argon2 iterations
//! p_cost      u32 LE   Argon2 lanes
//! salt        [u8; 16]
//! nonce       [u8; 12]
//! tag         [u8; 16]
//! ciphertext  [u8; n]
//! ```
//!
//! The first 41 bytes (version through nonce) form the header and are bound
//! into the AEAD as associated data.

use duelpot_types::{DuelpotError, KdfParams, Result};
use serde::{Deserialize, Serialize};

pub const BLOB_VERSION: u8 = 1;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Length of the header bound as associated data.
pub const HEADER_LEN: usize = 1 + 4 * 3 + SALT_LEN + NONCE_LEN;

/// Everything needed to recover a private key given the machine secret.
///
/// None of the fields alone reveals the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub version: u8,
    pub kdf: KdfParams,
    #[serde(with = "hex::serde")]
    pub salt: [u8; SALT_LEN],
    #[serde(with = "hex::serde")]
    pub nonce: [u8; NONCE_LEN],
    #[serde(with = "hex::serde")]
    pub auth_tag: [u8; TAG_LEN],
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Header bytes (version, KDF params, salt, nonce).
    #[must_use]
    pub fn header(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.version;
        out[1..5].copy_from_slice(&self.kdf.m_cost_kib.to_le_bytes());
        out[5..9].copy_from_slice(&self.kdf.t_cost.to_le_bytes());
        out[9..13].copy_from_slice(&self.kdf.p_cost.to_le_bytes());
        out[13..13 + SALT_LEN].copy_from_slice(&self.salt);
        out[13 + SALT_LEN..].copy_from_slice(&self.nonce);
        out
    }

    /// Serialize to the compact binary layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + TAG_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.header());
        bytes.extend_from_slice(&self.auth_tag);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse the compact binary layout.
    ///
    /// # Errors
    /// [`DuelpotError::Decryption`] if the input is truncated or carries an
    /// unknown version. A blob that cannot be parsed cannot be decrypted,
    /// and the caller learns nothing more specific.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() <= HEADER_LEN + TAG_LEN {
            return Err(DuelpotError::Decryption);
        }
        let (header, rest) = bytes.split_at(HEADER_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let version = header[0];
        if version != BLOB_VERSION {
            return Err(DuelpotError::Decryption);
        }
        let kdf = KdfParams {
            m_cost_kib: read_u32(&header[1..5])?,
            t_cost: read_u32(&header[5..9])?,
            p_cost: read_u32(&header[9..13])?,
        };

        Ok(Self {
            version,
            kdf,
            salt: fixed(&header[13..13 + SALT_LEN])?,
            nonce: fixed(&header[13 + SALT_LEN..])?,
            auth_tag: fixed(tag)?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

fn read_u32(bytes: &[u8]) -> Result<u32> {
    Ok(u32::from_le_bytes(fixed(bytes)?))
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| DuelpotError::Decryption)
}
