//! # duelpot-custody
//!
//! Sealing of escrow private keys at rest.
//!
//! Each match gets a fresh chain account. Its private key is encrypted
//! under the process-wide machine secret the moment it is generated, and
//! only the [`EncryptedBlob`] is stored on the match. Settlement decrypts
//! the key, signs one transfer, and drops it.
//!
//! ## Construction
//!
//! - **KDF**: Argon2id over the machine secret and a random 16-byte salt
//! - **AEAD**: ChaCha20-Poly1305 with a random 12-byte nonce and a detached
//!   16-byte tag; the blob header is bound as associated data
//!
//! Decryption fails closed: a wrong secret, a flipped bit anywhere in the
//! blob, or a malformed encoding all yield
//! [`DuelpotError::Decryption`](duelpot_types::DuelpotError::Decryption) and
//! nothing else.

pub mod blob;
pub mod crypto;
pub mod vault;

pub use blob::{BLOB_VERSION, EncryptedBlob};
pub use crypto::{decrypt, encrypt};
pub use vault::{KeyCustodyVault, SealedAccount};
