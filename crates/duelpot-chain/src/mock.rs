//! In-memory chain for tests. **Never use in production.**
//!
//! Balances live in a map; transfers move value between addresses and are
//! recorded so tests can assert exactly what was paid, to whom, and how
//! many times. Failures and latency can be injected per call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use duelpot_types::{Chain, DuelpotError, Network, RawPrivateKey, Result, TransactionId};
use rand::RngCore;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::{ChainAdapter, GeneratedAccount};

/// Which error an injected failure produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Communication,
    Rejection,
}

impl FailureMode {
    fn into_error(self, op: &str) -> DuelpotError {
        match self {
            Self::Communication => DuelpotError::chain_communication(format!("mock {op} timed out")),
            Self::Rejection => DuelpotError::chain_rejection(format!("mock {op} rejected")),
        }
    }
}

/// A transfer the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub tx_id: TransactionId,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

#[derive(Default)]
struct MockState {
    balances: HashMap<String, Decimal>,
    transfers: Vec<RecordedTransfer>,
    transfer_failures: VecDeque<FailureMode>,
    balance_failures: VecDeque<FailureMode>,
}

/// Deterministic in-memory [`ChainAdapter`].
pub struct MockChain {
    network: Network,
    reserve: Decimal,
    transfer_delay: Option<Duration>,
    state: Mutex<MockState>,
    tx_counter: AtomicU64,
}

impl MockChain {
    /// Mock serving `network` with the given minimum reserve.
    #[must_use]
    pub fn new(network: Network, reserve: Decimal) -> Self {
        Self {
            network,
            reserve,
            transfer_delay: None,
            state: Mutex::new(MockState::default()),
            tx_counter: AtomicU64::new(0),
        }
    }

    /// Sleep inside every transfer, widening race windows.
    #[must_use]
    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = Some(delay);
        self
    }

    /// Address a raw mock key controls.
    #[must_use]
    pub fn address_for_key(key: &RawPrivateKey) -> String {
        format!("mock1{}", hex::encode(&Sha256::digest(key.as_bytes())[..20]))
    }

    /// Overwrite the balance of `address`.
    pub fn set_balance(&self, address: &str, amount: Decimal) {
        self.lock().balances.insert(address.to_string(), amount);
    }

    /// Add to the balance of `address` (a player deposit).
    pub fn deposit(&self, address: &str, amount: Decimal) {
        *self.lock().balances.entry(address.to_string()).or_default() += amount;
    }

    #[must_use]
    pub fn balance_of(&self, address: &str) -> Decimal {
        self.lock().balances.get(address).copied().unwrap_or_default()
    }

    /// Make the next transfer fail.
    pub fn fail_next_transfer(&self, mode: FailureMode) {
        self.lock().transfer_failures.push_back(mode);
    }

    /// Make the next balance query fail.
    pub fn fail_next_balance(&self, mode: FailureMode) {
        self.lock().balance_failures.push_back(mode);
    }

    /// Every transfer accepted so far, in order.
    #[must_use]
    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.lock().transfers.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ChainAdapter for MockChain {
    fn chain(&self) -> Chain {
        self.network.chain()
    }

    fn network(&self) -> Network {
        self.network
    }

    fn create_account(&self, network: Network) -> Result<GeneratedAccount> {
        if !self.supports(network) {
            return Err(DuelpotError::UnsupportedNetwork(network));
        }
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let private_key = RawPrivateKey::from_slice(&bytes);
        Ok(GeneratedAccount {
            address: Self::address_for_key(&private_key),
            private_key,
        })
    }

    async fn get_balance(&self, address: &str) -> Result<Decimal> {
        let mut state = self.lock();
        if let Some(mode) = state.balance_failures.pop_front() {
            return Err(mode.into_error("balance"));
        }
        Ok(state.balances.get(address).copied().unwrap_or_default())
    }

    async fn build_and_send_transfer(
        &self,
        from_key: &RawPrivateKey,
        to: &str,
        amount: Decimal,
    ) -> Result<TransactionId> {
        if let Some(delay) = self.transfer_delay {
            tokio::time::sleep(delay).await;
        }
        self.validate_address(to)?;
        let from = Self::address_for_key(from_key);

        let mut state = self.lock();
        if let Some(mode) = state.transfer_failures.pop_front() {
            return Err(mode.into_error("transfer"));
        }
        let available = state.balances.get(&from).copied().unwrap_or_default();
        if amount <= Decimal::ZERO || amount > available {
            return Err(DuelpotError::chain_rejection(format!(
                "mock transfer of {amount} from {from} exceeds balance {available}"
            )));
        }
        *state.balances.entry(from.clone()).or_default() -= amount;
        *state.balances.entry(to.to_string()).or_default() += amount;

        let n = self.tx_counter.fetch_add(1, Ordering::Relaxed);
        let tx_id = TransactionId::new(format!("mocktx{n:08}"));
        state.transfers.push(RecordedTransfer {
            tx_id: tx_id.clone(),
            from,
            to: to.to_string(),
            amount,
        });
        Ok(tx_id)
    }

    fn minimum_reserve(&self, _network: Network) -> Decimal {
        self.reserve
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        if address.trim().is_empty() || address.chars().any(char::is_whitespace) {
            return Err(DuelpotError::InvalidAddress {
                reason: format!("{address:?} is not a mock address"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MockChain {
        MockChain::new(Network::TronNile, Decimal::ONE)
    }

    #[tokio::test]
    async fn transfer_moves_balance_and_records() {
        let mock = chain();
        let account = mock.create_account(Network::TronNile).unwrap();
        mock.deposit(&account.address, Decimal::TEN);

        let tx = mock
            .build_and_send_transfer(&account.private_key, "winner", Decimal::new(9, 0))
            .await
            .unwrap();

        assert_eq!(mock.balance_of(&account.address), Decimal::ONE);
        assert_eq!(mock.balance_of("winner"), Decimal::new(9, 0));
        let transfers = mock.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].tx_id, tx);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let mock = chain();
        mock.fail_next_balance(FailureMode::Communication);
        assert!(mock.get_balance("a").await.unwrap_err().is_retryable());
        assert_eq!(mock.get_balance("a").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn overdraft_rejected() {
        let mock = chain();
        let account = mock.create_account(Network::TronNile).unwrap();
        let err = mock
            .build_and_send_transfer(&account.private_key, "winner", Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, DuelpotError::ChainRejection { .. }));
        assert!(mock.transfers().is_empty());
    }

    #[test]
    fn foreign_network_unsupported() {
        assert!(chain().create_account(Network::TezosMainnet).is_err());
    }
}
