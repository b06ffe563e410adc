//! Argon2id key derivation and ChaCha20-Poly1305 sealing.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, Tag};
use duelpot_types::{DuelpotError, KdfParams, MachineSecret, RawPrivateKey, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::blob::{BLOB_VERSION, EncryptedBlob, NONCE_LEN, SALT_LEN};

/// Domain tag prepended to the associated data.
const AAD_DOMAIN: &[u8] = b"duelpot/escrow-key/v1";

const DERIVED_KEY_LEN: usize = 32;

fn derive_key(
    secret: &MachineSecret,
    salt: &[u8; SALT_LEN],
    kdf: &KdfParams,
) -> std::result::Result<Zeroizing<[u8; DERIVED_KEY_LEN]>, argon2::Error> {
    let params = Params::new(kdf.m_cost_kib, kdf.t_cost, kdf.p_cost, Some(DERIVED_KEY_LEN))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    argon2.hash_password_into(secret.as_bytes(), salt, &mut key[..])?;
    Ok(key)
}

fn associated_data(blob: &EncryptedBlob) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_DOMAIN.len() + crate::blob::HEADER_LEN);
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(&blob.header());
    aad
}

/// Seal `key` under `secret` with fresh salt and nonce.
///
/// # Errors
/// [`DuelpotError::Encryption`] if the KDF parameters fail
/// [`KdfParams::validate`] or the cipher refuses the input.
pub fn encrypt(
    key: &RawPrivateKey,
    secret: &MachineSecret,
    kdf: &KdfParams,
) -> Result<EncryptedBlob> {
    kdf.validate().map_err(|e| DuelpotError::Encryption {
        reason: e.to_string(),
    })?;

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let derived = derive_key(secret, &salt, kdf).map_err(|e| DuelpotError::Encryption {
        reason: format!("key derivation: {e}"),
    })?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&derived[..]));

    let mut blob = EncryptedBlob {
        version: BLOB_VERSION,
        kdf: *kdf,
        salt,
        nonce,
        auth_tag: [0u8; 16],
        ciphertext: key.as_bytes().to_vec(),
    };
    let aad = associated_data(&blob);
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), &aad, &mut blob.ciphertext)
        .map_err(|_| DuelpotError::Encryption {
            reason: "AEAD seal failed".into(),
        })?;
    blob.auth_tag.copy_from_slice(tag.as_slice());
    Ok(blob)
}

/// Recover the key sealed in `blob`.
///
/// # Errors
/// [`DuelpotError::Decryption`] on any mismatch: wrong secret, altered
/// header, altered tag or ciphertext, unknown version, or out-of-range KDF
/// parameters. No partial plaintext is ever returned.
pub fn decrypt(blob: &EncryptedBlob, secret: &MachineSecret) -> Result<RawPrivateKey> {
    // Params that could never have sealed a blob mean the header was altered.
    if blob.version != BLOB_VERSION || blob.ciphertext.is_empty() || blob.kdf.validate().is_err()
    {
        return Err(DuelpotError::Decryption);
    }

    let derived =
        derive_key(secret, &blob.salt, &blob.kdf).map_err(|_| DuelpotError::Decryption)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&derived[..]));

    let mut plaintext = Zeroizing::new(blob.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&blob.nonce),
            &associated_data(blob),
            plaintext.as_mut_slice(),
            Tag::from_slice(&blob.auth_tag),
        )
        .map_err(|_| DuelpotError::Decryption)?;

    Ok(RawPrivateKey::from_slice(&plaintext))
}
