//! Tron adapter.
//!
//! - Keys: secp256k1, 32 raw bytes
//! - Address: Base58Check(`0x41 || keccak256(pubkey_xy)[12..]`), starts with `T`
//! - Units: 1 TRX = 1 000 000 SUN
//! - Reserve: 1.1 TRX kept back so the bandwidth burn of a fresh account
//!   never eats into the payout; the adapter sends the full amount asked for
//!
//! ## Transfer flow
//!
//! ```text
//! node.create_transfer(from, to, sun) → { txID, raw_data_hex }
//!   verify txID == sha256(raw_data)
//!   sign txID (65-byte recoverable secp256k1)
//! node.broadcast(signed) → { result }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use duelpot_types::{Chain, DuelpotError, Network, RawPrivateKey, Result, TransactionId};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::{ChainAdapter, GeneratedAccount, base58, units};

/// Version byte of mainnet/testnet Tron addresses.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Balance kept on the escrow account, in SUN.
pub const TRON_MIN_RESERVE_SUN: u64 = 1_100_000;

/// Offset added to the recovery id in Tron signatures.
const RECOVERY_ID_OFFSET: u8 = 27;

/// An unsigned transfer as built by a full node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTronTransfer {
    /// Hex `txID`; must equal `sha256(raw_data)`.
    pub tx_id: String,
    pub raw_data_hex: String,
}

/// A transfer ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTronTransfer {
    pub tx_id: String,
    pub raw_data_hex: String,
    /// Hex signatures, `r || s || v`.
    pub signature: Vec<String>,
}

/// Node response to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TronBroadcast {
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw Tron full-node RPC. Implementations map timeouts / transport
/// failures to `ChainCommunication` and malformed requests to
/// `ChainRejection`.
#[async_trait]
pub trait TronNode: Send + Sync {
    async fn balance_sun(&self, address: &str) -> Result<u64>;

    async fn create_transfer(
        &self,
        from: &str,
        to: &str,
        amount_sun: u64,
    ) -> Result<UnsignedTronTransfer>;

    async fn broadcast(&self, transfer: &SignedTronTransfer) -> Result<TronBroadcast>;
}

/// [`ChainAdapter`] for Tron networks.
pub struct TronAdapter {
    network: Network,
    node: Arc<dyn TronNode>,
}

impl TronAdapter {
    /// Adapter for `network` backed by `node`.
    ///
    /// # Errors
    /// Returns `UnsupportedNetwork` if `network` is not a Tron network.
    pub fn new(network: Network, node: Arc<dyn TronNode>) -> Result<Self> {
        if network.chain() != Chain::Tron {
            return Err(DuelpotError::UnsupportedNetwork(network));
        }
        Ok(Self { network, node })
    }
}

/// Address owned by a secp256k1 key.
#[must_use]
pub fn address_from_signing_key(key: &SigningKey) -> String {
    let point = key.verifying_key().to_encoded_point(false);
    // Uncompressed SEC1: 0x04 || X || Y. Tron hashes X || Y.
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    base58::encode_check(&[TRON_ADDRESS_PREFIX], &hash[12..])
}

/// Address owned by a raw private key.
pub fn address_from_key(key: &RawPrivateKey) -> Result<String> {
    Ok(address_from_signing_key(&signing_key(key)?))
}

fn signing_key(key: &RawPrivateKey) -> Result<SigningKey> {
    SigningKey::from_slice(key.as_bytes()).map_err(|_| DuelpotError::KeyGeneration {
        reason: "key is not a valid secp256k1 scalar".into(),
    })
}

fn validate_tron_address(address: &str) -> Result<()> {
    base58::decode_check(address, &[TRON_ADDRESS_PREFIX], 20).map(|_| ())
}

#[async_trait]
impl ChainAdapter for TronAdapter {
    fn chain(&self) -> Chain {
        Chain::Tron
    }

    fn network(&self) -> Network {
        self.network
    }

    fn create_account(&self, network: Network) -> Result<GeneratedAccount> {
        if !self.supports(network) {
            return Err(DuelpotError::UnsupportedNetwork(network));
        }
        let key = SigningKey::random(&mut OsRng);
        let address = address_from_signing_key(&key);
        validate_tron_address(&address).map_err(|e| DuelpotError::KeyGeneration {
            reason: format!("derived address failed validation: {e}"),
        })?;
        Ok(GeneratedAccount {
            address,
            private_key: RawPrivateKey::from_slice(&key.to_bytes()),
        })
    }

    async fn get_balance(&self, address: &str) -> Result<Decimal> {
        validate_tron_address(address)?;
        let sun = self.node.balance_sun(address).await?;
        Ok(units::from_base_units(sun, units::TRON_DECIMALS))
    }

    async fn build_and_send_transfer(
        &self,
        from_key: &RawPrivateKey,
        to: &str,
        amount: Decimal,
    ) -> Result<TransactionId> {
        validate_tron_address(to)?;
        let key = signing_key(from_key)?;
        let from = address_from_signing_key(&key);

        let amount_sun = units::to_base_units(amount, units::TRON_DECIMALS)?;
        if amount_sun == 0 {
            return Err(DuelpotError::chain_rejection(format!(
                "transfer of {amount} TRX rounds to zero SUN"
            )));
        }

        let unsigned = self.node.create_transfer(&from, to, amount_sun).await?;
        let raw = hex::decode(&unsigned.raw_data_hex)
            .map_err(|e| DuelpotError::chain_rejection(format!("node returned bad raw_data_hex: {e}")))?;
        let digest: [u8; 32] = Sha256::digest(&raw).into();
        let computed = hex::encode(digest);
        if !computed.eq_ignore_ascii_case(&unsigned.tx_id) {
            return Err(DuelpotError::TransactionIdMismatch {
                expected: TransactionId::new(computed),
                actual: TransactionId::new(unsigned.tx_id),
            });
        }

        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| DuelpotError::chain_rejection(format!("signing failed: {e}")))?;
        let mut sig_bytes = signature.to_bytes().to_vec();
        sig_bytes.push(recovery_id.to_byte() + RECOVERY_ID_OFFSET);

        let signed = SignedTronTransfer {
            tx_id: computed.clone(),
            raw_data_hex: unsigned.raw_data_hex,
            signature: vec![hex::encode(sig_bytes)],
        };
        let response = self.node.broadcast(&signed).await?;
        if !response.result {
            return Err(DuelpotError::chain_rejection(format!(
                "broadcast refused: {} {}",
                response.code.as_deref().unwrap_or("UNKNOWN"),
                response.message.as_deref().unwrap_or_default()
            )));
        }

        tracing::info!(
            network = %self.network,
            tx = %computed,
            to,
            amount_sun,
            "Tron transfer broadcast"
        );
        Ok(TransactionId::new(computed))
    }

    fn minimum_reserve(&self, _network: Network) -> Decimal {
        units::from_base_units(TRON_MIN_RESERVE_SUN, units::TRON_DECIMALS)
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        validate_tron_address(address)
    }
}
