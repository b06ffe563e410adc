//! Tezos adapter.
//!
//! - Keys: ed25519 32-byte seed, exported as `edsk…`
//! - Address: Base58Check(`tz1 prefix || blake2b-160(pubkey)`)
//! - Units: 1 tez = 1 000 000 mutez
//! - Reserve: 0.5 tez stays on the escrow account. It keeps the account
//!   revealed and covers the storage burn when the winner's address has
//!   never been allocated
//! - Fees: the baker fee (plus the reveal fee on the escrow's first
//!   operation) is deducted from the transferred amount
//!
//! ## Transfer flow
//!
//! ```text
//! node.counter(src), node.manager_key(src)
//! node.forge_transfer(request)            → forged bytes (hex)
//! sign blake2b-256(0x03 || forged)        → 64-byte ed25519 signature
//! node.inject(forged || signature)        → operation hash
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use blake2::Blake2b;
use blake2::digest::consts::{U20, U32};
use duelpot_types::{Chain, DuelpotError, Network, RawPrivateKey, Result, TransactionId};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use zeroize::Zeroizing;

use crate::{ChainAdapter, GeneratedAccount, base58, units};

type Blake2b160 = Blake2b<U20>;
type Blake2b256 = Blake2b<U32>;

/// `tz1` (ed25519) implicit account prefix.
pub const TZ1_PREFIX: [u8; 3] = [6, 161, 159];
/// `tz2` (secp256k1) implicit account prefix.
pub const TZ2_PREFIX: [u8; 3] = [6, 161, 161];
/// `tz3` (p256) implicit account prefix.
pub const TZ3_PREFIX: [u8; 3] = [6, 161, 164];
/// `KT1` originated contract prefix.
pub const KT1_PREFIX: [u8; 3] = [2, 90, 121];
/// `edpk` public key prefix.
pub const EDPK_PREFIX: [u8; 4] = [13, 15, 37, 217];

/// Watermark for generic manager operations.
const OPERATION_WATERMARK: u8 = 0x03;

/// Balance kept on the escrow account, in mutez.
pub const TEZOS_MIN_RESERVE_MUTEZ: u64 = 500_000;
/// Baker fee for a single transaction.
pub const TRANSFER_FEE_MUTEZ: u64 = 1_420;
/// Baker fee for revealing the escrow's public key.
pub const REVEAL_FEE_MUTEZ: u64 = 1_270;
pub const TRANSFER_GAS_LIMIT: u64 = 1_951;
/// Enough to allocate a never-seen implicit destination.
pub const TRANSFER_STORAGE_LIMIT: u64 = 257;

/// Everything the node needs to forge a transfer, optionally preceded by a
/// reveal of the source key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TezosTransferRequest {
    pub source: String,
    pub destination: String,
    pub amount_mutez: u64,
    pub fee_mutez: u64,
    /// Counter of the first operation in the batch.
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
    /// `edpk…` to reveal first, when the source is unrevealed.
    pub reveal_public_key: Option<String>,
    pub reveal_fee_mutez: u64,
}

/// Raw Tezos node RPC. Implementations map timeouts / transport failures
/// to `ChainCommunication` and refused operations to `ChainRejection`.
#[async_trait]
pub trait TezosNode: Send + Sync {
    async fn balance_mutez(&self, address: &str) -> Result<u64>;

    /// Current counter of `address`.
    async fn counter(&self, address: &str) -> Result<u64>;

    /// Revealed `edpk…`, or `None` if the key was never revealed.
    async fn manager_key(&self, address: &str) -> Result<Option<String>>;

    /// Forge the operation batch; returns hex bytes.
    async fn forge_transfer(&self, request: &TezosTransferRequest) -> Result<String>;

    /// Inject `forged || signature` (hex); returns the operation hash.
    async fn inject(&self, signed_operation_hex: &str) -> Result<String>;
}

/// [`ChainAdapter`] for Tezos networks.
pub struct TezosAdapter {
    network: Network,
    node: Arc<dyn TezosNode>,
}

impl TezosAdapter {
    /// Adapter for `network` backed by `node`.
    ///
    /// # Errors
    /// Returns `UnsupportedNetwork` if `network` is not a Tezos network.
    pub fn new(network: Network, node: Arc<dyn TezosNode>) -> Result<Self> {
        if network.chain() != Chain::Tezos {
            return Err(DuelpotError::UnsupportedNetwork(network));
        }
        Ok(Self { network, node })
    }
}

/// `tz1…` address of an ed25519 public key.
#[must_use]
pub fn address_from_public_key(public_key: &VerifyingKey) -> String {
    let hash = Blake2b160::digest(public_key.as_bytes());
    base58::encode_check(&TZ1_PREFIX, &hash)
}

/// `edpk…` form of an ed25519 public key.
#[must_use]
pub fn encode_public_key(public_key: &VerifyingKey) -> String {
    base58::encode_check(&EDPK_PREFIX, public_key.as_bytes())
}

/// `tz1…` address owned by a raw seed.
pub fn address_from_key(key: &RawPrivateKey) -> Result<String> {
    Ok(address_from_public_key(&signing_key(key)?.verifying_key()))
}

fn signing_key(key: &RawPrivateKey) -> Result<SigningKey> {
    let seed: Zeroizing<[u8; 32]> = Zeroizing::new(key.as_bytes().try_into().map_err(|_| {
        DuelpotError::KeyGeneration {
            reason: format!("ed25519 seed must be 32 bytes, got {}", key.len()),
        }
    })?);
    Ok(SigningKey::from_bytes(&seed))
}

fn validate_tezos_address(address: &str) -> Result<()> {
    let prefix = match address.get(..3) {
        Some("tz1") => TZ1_PREFIX,
        Some("tz2") => TZ2_PREFIX,
        Some("tz3") => TZ3_PREFIX,
        Some("KT1") => KT1_PREFIX,
        _ => {
            return Err(DuelpotError::InvalidAddress {
                reason: format!("{address}: not a tz1/tz2/tz3/KT1 address"),
            });
        }
    };
    base58::decode_check(address, &prefix, 20).map(|_| ())
}

/// Sign a forged operation the way Tezos nodes verify it.
fn sign_operation(key: &SigningKey, forged: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b256::new();
    hasher.update([OPERATION_WATERMARK]);
    hasher.update(forged);
    let digest = hasher.finalize();
    key.sign(&digest).to_bytes()
}

#[async_trait]
impl ChainAdapter for TezosAdapter {
    fn chain(&self) -> Chain {
        Chain::Tezos
    }

    fn network(&self) -> Network {
        self.network
    }

    fn create_account(&self, network: Network) -> Result<GeneratedAccount> {
        if !self.supports(network) {
            return Err(DuelpotError::UnsupportedNetwork(network));
        }
        let key = SigningKey::generate(&mut OsRng);
        let address = address_from_public_key(&key.verifying_key());
        validate_tezos_address(&address).map_err(|e| DuelpotError::KeyGeneration {
            reason: format!("derived address failed validation: {e}"),
        })?;
        Ok(GeneratedAccount {
            address,
            private_key: RawPrivateKey::from_slice(key.as_bytes()),
        })
    }

    async fn get_balance(&self, address: &str) -> Result<Decimal> {
        validate_tezos_address(address)?;
        let mutez = self.node.balance_mutez(address).await?;
        Ok(units::from_base_units(mutez, units::TEZOS_DECIMALS))
    }

    async fn build_and_send_transfer(
        &self,
        from_key: &RawPrivateKey,
        to: &str,
        amount: Decimal,
    ) -> Result<TransactionId> {
        validate_tezos_address(to)?;
        let key = signing_key(from_key)?;
        let public_key = key.verifying_key();
        let source = address_from_public_key(&public_key);

        let counter = self.node.counter(&source).await?;
        let revealed = self.node.manager_key(&source).await?.is_some();
        let reveal_fee = if revealed { 0 } else { REVEAL_FEE_MUTEZ };

        let requested = units::to_base_units(amount, units::TEZOS_DECIMALS)?;
        let fees = TRANSFER_FEE_MUTEZ + reveal_fee;
        let amount_mutez = requested.checked_sub(fees).filter(|m| *m > 0).ok_or_else(|| {
            DuelpotError::chain_rejection(format!(
                "{requested} mutez does not cover {fees} mutez of fees"
            ))
        })?;

        let request = TezosTransferRequest {
            source: source.clone(),
            destination: to.to_string(),
            amount_mutez,
            fee_mutez: TRANSFER_FEE_MUTEZ,
            counter: counter + 1,
            gas_limit: TRANSFER_GAS_LIMIT,
            storage_limit: TRANSFER_STORAGE_LIMIT,
            reveal_public_key: (!revealed).then(|| encode_public_key(&public_key)),
            reveal_fee_mutez: reveal_fee,
        };
        let forged_hex = self.node.forge_transfer(&request).await?;
        let forged = hex::decode(&forged_hex)
            .map_err(|e| DuelpotError::chain_rejection(format!("node returned bad forged bytes: {e}")))?;

        let signature = sign_operation(&key, &forged);
        let signed = format!("{forged_hex}{}", hex::encode(signature));
        let op_hash = self.node.inject(&signed).await?;

        tracing::info!(
            network = %self.network,
            op = %op_hash,
            source = %source,
            to,
            amount_mutez,
            fees,
            revealed,
            "Tezos transfer injected"
        );
        Ok(TransactionId::new(op_hash))
    }

    fn minimum_reserve(&self, _network: Network) -> Decimal {
        units::from_base_units(TEZOS_MIN_RESERVE_MUTEZ, units::TEZOS_DECIMALS)
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        validate_tezos_address(address)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ed25519_dalek::{Signature, Verifier};

    use super::*;

    #[derive(Default)]
    struct FakeNode {
        revealed: bool,
        requests: Mutex<Vec<TezosTransferRequest>>,
        injected: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TezosNode for FakeNode {
        async fn balance_mutez(&self, _address: &str) -> Result<u64> {
            Ok(20_000_000)
        }

        async fn counter(&self, _address: &str) -> Result<u64> {
            Ok(41)
        }

        async fn manager_key(&self, _address: &str) -> Result<Option<String>> {
            Ok(self.revealed.then(|| "edpk".to_string()))
        }

        async fn forge_transfer(&self, request: &TezosTransferRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(hex::encode(format!("{}:{}", request.destination, request.amount_mutez)))
        }

        async fn inject(&self, signed_operation_hex: &str) -> Result<String> {
            self.injected
                .lock()
                .unwrap()
                .push(signed_operation_hex.to_string());
            Ok("ooTestOperationHash".to_string())
        }
    }

    fn adapter(node: FakeNode) -> (TezosAdapter, Arc<FakeNode>) {
        let node = Arc::new(node);
        let adapter = TezosAdapter::new(Network::TezosGhostnet, node.clone()).unwrap();
        (adapter, node)
    }

    #[test]
    fn known_zero_seed_vectors() {
        let key = RawPrivateKey::from_slice(&[0u8; 32]);
        assert_eq!(
            address_from_key(&key).unwrap(),
            "tz1XvkuUNDk8j2tG3RJaRUo4Xppcjc6FvK39"
        );
        let pk = signing_key(&key).unwrap().verifying_key();
        assert_eq!(
            encode_public_key(&pk),
            "edpku6Pc31JWM3RXfym4pG5RzoKkyNCxQzakzsfQiG1aKXP1J651n8"
        );
    }

    #[test]
    fn rejects_short_seed() {
        let err = address_from_key(&RawPrivateKey::from_slice(&[1u8; 31])).unwrap_err();
        assert!(matches!(err, DuelpotError::KeyGeneration { .. }));
    }

    #[test]
    fn address_validation() {
        let (adapter, _) = adapter(FakeNode::default());
        adapter
            .validate_address("tz1XvkuUNDk8j2tG3RJaRUo4Xppcjc6FvK39")
            .unwrap();
        assert!(adapter.validate_address("TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC").is_err());
        assert!(adapter.validate_address("tz1XvkuUNDk8j2tG3RJaRUo4Xppcjc6FvK38").is_err());
        assert!(adapter.validate_address("").is_err());
    }

    #[test]
    fn create_account_round_trips() {
        let (adapter, _) = adapter(FakeNode::default());
        let account = adapter.create_account(Network::TezosGhostnet).unwrap();
        assert!(account.address.starts_with("tz1"));
        assert_eq!(address_from_key(&account.private_key).unwrap(), account.address);
        assert!(adapter.create_account(Network::TezosMainnet).is_err());
    }

    #[test]
    fn reserve_is_half_a_tez() {
        let (adapter, _) = adapter(FakeNode::default());
        assert_eq!(adapter.minimum_reserve(Network::TezosGhostnet), Decimal::new(5, 1));
    }

    #[tokio::test]
    async fn unrevealed_source_reveals_and_pays_both_fees() {
        let (adapter, node) = adapter(FakeNode::default());
        let from = adapter.create_account(Network::TezosGhostnet).unwrap();
        let to = adapter.create_account(Network::TezosGhostnet).unwrap();

        let tx = adapter
            .build_and_send_transfer(&from.private_key, &to.address, Decimal::new(195, 1))
            .await
            .unwrap();
        assert_eq!(tx.as_str(), "ooTestOperationHash");

        let requests = node.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.counter, 42);
        assert_eq!(req.amount_mutez, 19_500_000 - TRANSFER_FEE_MUTEZ - REVEAL_FEE_MUTEZ);
        assert!(req.reveal_public_key.as_deref().unwrap().starts_with("edpk"));
        assert_eq!(req.source, from.address);
    }

    #[tokio::test]
    async fn revealed_source_skips_reveal() {
        let (adapter, node) = adapter(FakeNode {
            revealed: true,
            ..FakeNode::default()
        });
        let from = adapter.create_account(Network::TezosGhostnet).unwrap();
        let to = adapter.create_account(Network::TezosGhostnet).unwrap();
        adapter
            .build_and_send_transfer(&from.private_key, &to.address, Decimal::ONE)
            .await
            .unwrap();
        let requests = node.requests.lock().unwrap();
        assert!(requests[0].reveal_public_key.is_none());
        assert_eq!(requests[0].amount_mutez, 1_000_000 - TRANSFER_FEE_MUTEZ);
    }

    #[tokio::test]
    async fn injected_signature_verifies_over_watermarked_hash() {
        let (adapter, node) = adapter(FakeNode::default());
        let from = adapter.create_account(Network::TezosGhostnet).unwrap();
        let to = adapter.create_account(Network::TezosGhostnet).unwrap();
        adapter
            .build_and_send_transfer(&from.private_key, &to.address, Decimal::ONE)
            .await
            .unwrap();

        let injected = hex::decode(&node.injected.lock().unwrap()[0]).unwrap();
        let (forged, sig) = injected.split_at(injected.len() - 64);
        let mut hasher = Blake2b256::new();
        hasher.update([OPERATION_WATERMARK]);
        hasher.update(forged);
        let digest = hasher.finalize();

        let pk = signing_key(&from.private_key).unwrap().verifying_key();
        let signature = Signature::from_slice(sig).unwrap();
        pk.verify(&digest, &signature).unwrap();
    }

    #[tokio::test]
    async fn amount_below_fees_rejected_without_forging() {
        let (adapter, node) = adapter(FakeNode::default());
        let from = adapter.create_account(Network::TezosGhostnet).unwrap();
        let to = adapter.create_account(Network::TezosGhostnet).unwrap();
        let err = adapter
            .build_and_send_transfer(&from.private_key, &to.address, Decimal::new(2, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, DuelpotError::ChainRejection { .. }));
        assert!(node.requests.lock().unwrap().is_empty());
    }
}
