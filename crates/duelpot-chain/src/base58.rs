//! Base58Check helpers shared by the Tron and Tezos adapters.
//!
//! Both chains use double-SHA-256 checksums with a chain-specific version
//! prefix in front of the payload.

use duelpot_types::{DuelpotError, Result};

/// Encode `prefix || payload` with a 4-byte double-SHA-256 checksum.
#[must_use]
pub fn encode_check(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len());
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    bs58::encode(data).with_check().into_string()
}

/// Decode a Base58Check string, verify the checksum and `prefix`, and
/// return the payload that follows the prefix.
///
/// # Errors
/// Returns [`DuelpotError::InvalidAddress`] on bad alphabet, checksum,
/// prefix, or payload length.
pub fn decode_check(encoded: &str, prefix: &[u8], payload_len: usize) -> Result<Vec<u8>> {
    let data = bs58::decode(encoded)
        .with_check(None)
        .into_vec()
        .map_err(|e| DuelpotError::InvalidAddress {
            reason: format!("{encoded}: {e}"),
        })?;
    let payload = data
        .strip_prefix(prefix)
        .ok_or_else(|| DuelpotError::InvalidAddress {
            reason: format!("{encoded}: unexpected version prefix"),
        })?;
    if payload.len() != payload_len {
        return Err(DuelpotError::InvalidAddress {
            reason: format!(
                "{encoded}: payload is {} bytes, expected {payload_len}",
                payload.len()
            ),
        });
    }
    Ok(payload.to_vec())
}
