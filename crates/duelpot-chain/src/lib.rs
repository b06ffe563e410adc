//! # duelpot-chain
//!
//! The narrow interface through which the escrow core talks to a chain.
//!
//! ## Architecture
//!
//! Every chain family implements [`ChainAdapter`]. The core never hardcodes
//! chain rules; it asks the adapter for them:
//! 1. **Accounts**: [`ChainAdapter::create_account`] generates the escrow keypair
//! 2. **Balances**: [`ChainAdapter::get_balance`] in native units (TRX, tez)
//! 3. **Reserve**: [`ChainAdapter::minimum_reserve`] is subtracted before payout
//! 4. **Transfers**: [`ChainAdapter::build_and_send_transfer`] builds, signs,
//!    and broadcasts; fee handling is the adapter's job
//!
//! Raw node RPC is injected per chain through [`TronNode`] / [`TezosNode`].
//!
//! ## Decimal scaling
//!
//! Chains count in fixed-point integers (SUN, mutez). Adapters convert at
//! the boundary with [`units`]; the core only ever sees [`Decimal`].

use async_trait::async_trait;
use duelpot_types::{Chain, Network, RawPrivateKey, Result, TransactionId};
use rust_decimal::Decimal;

pub mod base58;
pub mod registry;
pub mod tezos;
pub mod tron;
pub mod units;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use registry::ChainRegistry;
pub use tezos::{TezosAdapter, TezosNode, TezosTransferRequest};
pub use tron::{TronAdapter, TronBroadcast, TronNode, UnsignedTronTransfer};

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::{FailureMode, MockChain, RecordedTransfer};

/// A freshly generated chain account.
#[derive(Debug)]
pub struct GeneratedAccount {
    /// Chain address in its canonical text form.
    pub address: String,
    /// The account's private key. Seal it and drop it.
    pub private_key: RawPrivateKey,
}

/// Chain-specific escrow operations.
///
/// Implementors encode:
/// - decimal scaling between base units and native [`Decimal`] amounts
/// - minimum-reserve rules
/// - key format and transfer signing flow
///
/// Errors are [`ChainCommunication`](duelpot_types::DuelpotError::ChainCommunication)
/// (retryable) or [`ChainRejection`](duelpot_types::DuelpotError::ChainRejection)
/// (fatal for the attempt).
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// The chain family served.
    fn chain(&self) -> Chain;

    /// The network this adapter's node talks to.
    fn network(&self) -> Network;

    /// Generate a new account for `network`.
    ///
    /// Fails with `KeyGeneration` if no usable key can be produced, or
    /// `UnsupportedNetwork` if `network` is not served by this adapter.
    fn create_account(&self, network: Network) -> Result<GeneratedAccount>;

    /// Balance of `address` in native units.
    async fn get_balance(&self, address: &str) -> Result<Decimal>;

    /// Send `amount` (native units) from the account owned by `from_key`
    /// to `to`. Returns once the node accepted the broadcast.
    async fn build_and_send_transfer(
        &self,
        from_key: &RawPrivateKey,
        to: &str,
        amount: Decimal,
    ) -> Result<TransactionId>;

    /// Balance the escrow account must keep to stay usable.
    fn minimum_reserve(&self, network: Network) -> Decimal;

    /// Reject addresses that are malformed for this chain.
    fn validate_address(&self, address: &str) -> Result<()>;

    /// Whether this adapter can serve `network`.
    fn supports(&self, network: Network) -> bool {
        network == self.network()
    }
}
