//! The process-wide custody vault.

use std::fmt;

use duelpot_chain::{ChainAdapter, GeneratedAccount};
use duelpot_types::{
    CustodyConfig, DuelpotError, KdfParams, MachineSecret, Network, RawPrivateKey, Result,
};

use crate::EncryptedBlob;

/// A new escrow account whose key is already sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedAccount {
    pub address: String,
    pub encrypted_key: EncryptedBlob,
}

/// Holds the machine secret and seals/unseals escrow keys under it.
///
/// The vault keeps no raw-key state between calls. Share it behind an
/// `Arc`; every method takes `&self`.
pub struct KeyCustodyVault {
    secret: MachineSecret,
    kdf: KdfParams,
}

impl KeyCustodyVault {
    /// Vault with default KDF cost.
    #[must_use]
    pub fn new(secret: MachineSecret) -> Self {
        Self {
            secret,
            kdf: KdfParams::default(),
        }
    }

    /// # Errors
    /// [`DuelpotError::Configuration`] if `kdf` is out of range.
    pub fn with_kdf(secret: MachineSecret, kdf: KdfParams) -> Result<Self> {
        kdf.validate()?;
        Ok(Self { secret, kdf })
    }

    /// Load the secret from the configured environment variable.
    pub fn from_config(config: &CustodyConfig) -> Result<Self> {
        config.kdf.validate()?;
        let secret = MachineSecret::from_env(&config.secret_env)?;
        tracing::info!(secret_env = %config.secret_env, "Custody vault initialized");
        Self::with_kdf(secret, config.kdf)
    }

    /// KDF parameters new blobs are sealed with.
    #[must_use]
    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Generate a fresh account through `adapter`.
    ///
    /// # Errors
    /// [`DuelpotError::KeyGeneration`] if the adapter fails or hands back an
    /// empty key or address; [`DuelpotError::UnsupportedNetwork`] passes
    /// through unchanged.
    pub fn generate_keypair(
        &self,
        adapter: &dyn ChainAdapter,
        network: Network,
    ) -> Result<GeneratedAccount> {
        let account = adapter.create_account(network).map_err(|e| match e {
            DuelpotError::KeyGeneration { .. } | DuelpotError::UnsupportedNetwork(_) => e,
            other => DuelpotError::KeyGeneration {
                reason: other.to_string(),
            },
        })?;
        if account.private_key.is_empty() || account.address.is_empty() {
            return Err(DuelpotError::KeyGeneration {
                reason: format!("{network} adapter returned an unusable account"),
            });
        }
        Ok(account)
    }

    pub fn encrypt(&self, key: &RawPrivateKey) -> Result<EncryptedBlob> {
        crate::encrypt(key, &self.secret, &self.kdf)
    }

    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<RawPrivateKey> {
        crate::decrypt(blob, &self.secret)
    }

    /// Generate an account and seal its key. The raw key is dropped
    /// (and wiped) before this returns.
    pub fn seal_new_account(
        &self,
        adapter: &dyn ChainAdapter,
        network: Network,
    ) -> Result<SealedAccount> {
        let GeneratedAccount {
            address,
            private_key,
        } = self.generate_keypair(adapter, network)?;
        let encrypted_key = self.encrypt(&private_key)?;
        drop(private_key);

        tracing::debug!(network = %network, escrow = %address, "Escrow key sealed");
        Ok(SealedAccount {
            address,
            encrypted_key,
        })
    }
}

impl fmt::Debug for KeyCustodyVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCustodyVault")
            .field("secret", &self.secret)
            .field("kdf", &self.kdf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use duelpot_chain::MockChain;
    use rust_decimal::Decimal;

    use super::*;

    fn vault(secret: &str) -> KeyCustodyVault {
        KeyCustodyVault::with_kdf(
            MachineSecret::new(secret.as_bytes().to_vec()).unwrap(),
            KdfParams::fast_for_tests(),
        )
        .unwrap()
    }

    #[test]
    fn sealed_account_unseals_to_controlling_key() {
        let chain = MockChain::new(Network::TronNile, Decimal::ONE);
        let v = vault("vault test secret 0001");
        let sealed = v.seal_new_account(&chain, Network::TronNile).unwrap();

        let key = v.decrypt(&sealed.encrypted_key).unwrap();
        assert_eq!(MockChain::address_for_key(&key), sealed.address);
    }

    #[test]
    fn other_vault_cannot_unseal() {
        let chain = MockChain::new(Network::TezosGhostnet, Decimal::ONE);
        let sealed = vault("vault test secret 0001")
            .seal_new_account(&chain, Network::TezosGhostnet)
            .unwrap();
        assert!(matches!(
            vault("vault test secret 0002").decrypt(&sealed.encrypted_key),
            Err(DuelpotError::Decryption)
        ));
    }

    #[test]
    fn unsupported_network_passes_through() {
        let chain = MockChain::new(Network::TronNile, Decimal::ONE);
        let err = vault("vault test secret 0001")
            .generate_keypair(&chain, Network::TezosMainnet)
            .unwrap_err();
        assert!(matches!(err, DuelpotError::UnsupportedNetwork(Network::TezosMainnet)));
    }

    #[test]
    fn debug_hides_secret() {
        let dbg = format!("{:?}", vault("vault test secret 0001"));
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("vault test secret"));
    }

    #[test]
    fn from_config_requires_env_secret() {
        let config = CustodyConfig {
            secret_env: "DUELPOT_VAULT_TEST_UNSET_VARIABLE".into(),
            kdf: KdfParams::fast_for_tests(),
        };
        assert!(matches!(
            KeyCustodyVault::from_config(&config),
            Err(DuelpotError::InvalidSecret { .. })
        ));
    }

    #[test]
    fn out_of_range_kdf_refused_at_construction() {
        let secret = || MachineSecret::new(b"vault test secret 0001".to_vec()).unwrap();
        let too_slow = KdfParams {
            t_cost: 65,
            ..KdfParams::fast_for_tests()
        };
        assert!(matches!(
            KeyCustodyVault::with_kdf(secret(), too_slow),
            Err(DuelpotError::Configuration(_))
        ));

        // Checked before the environment is consulted.
        let config = CustodyConfig {
            secret_env: "DUELPOT_VAULT_TEST_UNSET_VARIABLE".into(),
            kdf: too_slow,
        };
        assert!(matches!(
            KeyCustodyVault::from_config(&config),
            Err(DuelpotError::Configuration(_))
        ));
    }
}
