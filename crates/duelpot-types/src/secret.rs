//! Secret-holding types.
//!
//! Both types wipe their bytes on drop, refuse to `Clone`, and print as
//! `[REDACTED]`. Neither implements `Serialize`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{DuelpotError, Result, constants};

/// A raw chain private key. Exists only between decrypt and sign.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RawPrivateKey(Vec<u8>);

impl RawPrivateKey {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Copy key material out of a borrowed slice.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RawPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawPrivateKey([REDACTED])")
    }
}

impl PartialEq for RawPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for RawPrivateKey {}

/// The process-wide secret keys are sealed under.
///
/// Loaded once at start-up and handed to the custody vault; never fetched
/// per request.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MachineSecret(Vec<u8>);

impl MachineSecret {
    /// Wrap secret bytes.
    ///
    /// # Errors
    /// Returns [`DuelpotError::InvalidSecret`] if shorter than
    /// [`constants::MIN_MACHINE_SECRET_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < constants::MIN_MACHINE_SECRET_LEN {
            let len = bytes.len();
            drop(Zeroizing::new(bytes));
            return Err(DuelpotError::InvalidSecret {
                reason: format!(
                    "secret is {len} bytes, need at least {}",
                    constants::MIN_MACHINE_SECRET_LEN
                ),
            });
        }
        Ok(Self(bytes))
    }

    /// Read the secret from an environment variable.
    ///
    /// # Errors
    /// Returns [`DuelpotError::InvalidSecret`] if the variable is unset,
    /// not UTF-8, or too short.
    pub fn from_env(var: &str) -> Result<Self> {
        let value = std::env::var(var).map_err(|e| DuelpotError::InvalidSecret {
            reason: format!("{var}: {e}"),
        })?;
        Self::new(value.into_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MachineSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MachineSecret([REDACTED])")
    }
}
