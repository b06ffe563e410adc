//! Legal lifecycle of a single match.
//!
//! Settlement is split so the chain round-trip runs without the match
//! lock held:
//!
//! 1. [`EscrowStateMachine::begin_settlement`]: preconditions, then claim
//!    `Open → InProgress`. Only one caller can hold the claim.
//! 2. [`EscrowStateMachine::execute_payout`]: balance, reserve, transient
//!    decrypt, transfer. Touches no match state.
//! 3. [`EscrowStateMachine::finish_settlement`]: commit `Settled`, roll
//!    back to `Open`, or absorb into `Failed`.
//!
//! [`EscrowStateMachine::distribute_pot`] runs all three for callers that
//! already hold the match exclusively.
//!
//! Sealing and unsealing escrow keys runs Argon2id, so both go through
//! `spawn_blocking` and never occupy a runtime worker.

use std::sync::Arc;

use duelpot_chain::ChainAdapter;
use duelpot_custody::{EncryptedBlob, KeyCustodyVault, SealedAccount};
use duelpot_types::{
    DuelpotError, MatchId, Network, Player, RawPrivateKey, Result, TransactionId,
};
use rust_decimal::Decimal;

use crate::{Match, SettlementStatus};

/// Everything the payout step needs, copied out of a claimed match.
#[derive(Debug, Clone)]
pub struct PayoutTicket {
    pub match_id: MatchId,
    pub network: Network,
    pub escrow_address: String,
    pub encrypted_key: EncryptedBlob,
    pub winner: String,
}

pub struct EscrowStateMachine {
    adapter: Arc<dyn ChainAdapter>,
    vault: Arc<KeyCustodyVault>,
    max_players: usize,
}

impl EscrowStateMachine {
    #[must_use]
    pub fn new(
        adapter: Arc<dyn ChainAdapter>,
        vault: Arc<KeyCustodyVault>,
        max_players: usize,
    ) -> Self {
        Self {
            adapter,
            vault,
            max_players,
        }
    }

    #[must_use]
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn ChainAdapter> {
        &self.adapter
    }

    /// Create an escrow account on `network` and seal its key.
    ///
    /// # Errors
    /// Custody and key-generation errors from
    /// [`KeyCustodyVault::seal_new_account`]; [`DuelpotError::Internal`] if
    /// the blocking task dies.
    pub async fn open_escrow_account(&self, network: Network) -> Result<SealedAccount> {
        let vault = Arc::clone(&self.vault);
        let adapter = Arc::clone(&self.adapter);
        tokio::task::spawn_blocking(move || vault.seal_new_account(&*adapter, network))
            .await
            .map_err(|e| DuelpotError::Internal(format!("seal task join error: {e}")))?
    }

    async fn unseal(&self, blob: EncryptedBlob) -> Result<RawPrivateKey> {
        let vault = Arc::clone(&self.vault);
        tokio::task::spawn_blocking(move || vault.decrypt(&blob))
            .await
            .map_err(|e| DuelpotError::Internal(format!("unseal task join error: {e}")))?
    }

    /// Seat `wallet` in the match.
    ///
    /// # Errors
    /// - [`DuelpotError::MatchFull`] when every seat is taken
    /// - [`DuelpotError::DuplicatePlayer`] when `wallet` already joined
    /// - [`DuelpotError::InvalidAddress`] when the chain rejects `wallet`
    pub fn add_player(&self, m: &mut Match, wallet: &str) -> Result<()> {
        if m.players().len() >= self.max_players {
            return Err(DuelpotError::MatchFull {
                match_id: m.match_id().clone(),
                max_players: self.max_players,
            });
        }
        if m.has_player(wallet) {
            return Err(DuelpotError::DuplicatePlayer {
                match_id: m.match_id().clone(),
                wallet: wallet.to_string(),
            });
        }
        self.adapter.validate_address(wallet)?;

        m.push_player(Player::new(wallet));
        tracing::info!(
            match_id = %m.match_id(),
            wallet,
            seats = m.players().len(),
            max = self.max_players,
            "Player joined"
        );
        Ok(())
    }

    /// Poll the escrow balance and mark every player deposited once it
    /// covers `buy_in * players`.
    ///
    /// Returns `false` with no players. A match past `Open` is not polled;
    /// it reports the flags it already has.
    pub async fn check_deposits(&self, m: &mut Match) -> Result<bool> {
        if m.players().is_empty() {
            return Ok(false);
        }
        if m.settlement() != SettlementStatus::Open {
            return Ok(m.all_deposited());
        }

        let balance = self.adapter.get_balance(m.escrow_address()).await?;
        let required = m.required_balance();
        if balance < required {
            tracing::debug!(
                match_id = %m.match_id(),
                balance = %balance,
                required = %required,
                "Deposits incomplete"
            );
            return Ok(false);
        }

        if !m.all_deposited() {
            m.confirm_all_deposits();
            tracing::info!(
                match_id = %m.match_id(),
                escrow = %m.escrow_address(),
                balance = %balance,
                "Deposits confirmed"
            );
        }
        Ok(true)
    }

    /// Check preconditions and claim the match for payout.
    ///
    /// # Errors
    /// - [`DuelpotError::AlreadySettled`] if paid out
    /// - [`DuelpotError::SettlementInProgress`] if another caller holds the claim
    /// - [`DuelpotError::MatchFailed`] if the match is absorbed in `Failed`
    /// - [`DuelpotError::WinnerNotInMatch`] if `winner` never joined
    pub fn begin_settlement(&self, m: &mut Match, winner: &str) -> Result<PayoutTicket> {
        match m.settlement() {
            SettlementStatus::Open => {}
            SettlementStatus::Settled => {
                return Err(DuelpotError::AlreadySettled(m.match_id().clone()));
            }
            SettlementStatus::InProgress => {
                tracing::warn!(match_id = %m.match_id(), "Settlement already in progress");
                return Err(DuelpotError::SettlementInProgress(m.match_id().clone()));
            }
            SettlementStatus::Failed => {
                return Err(DuelpotError::MatchFailed {
                    match_id: m.match_id().clone(),
                    reason: m.failure_reason().unwrap_or("unknown").to_string(),
                });
            }
        }
        if !m.has_player(winner) {
            return Err(DuelpotError::WinnerNotInMatch {
                match_id: m.match_id().clone(),
                winner: winner.to_string(),
            });
        }

        m.transition(SettlementStatus::InProgress)?;
        tracing::info!(match_id = %m.match_id(), winner, "Settlement claimed");
        Ok(PayoutTicket {
            match_id: m.match_id().clone(),
            network: m.network(),
            escrow_address: m.escrow_address().to_string(),
            encrypted_key: m.encrypted_key().clone(),
            winner: winner.to_string(),
        })
    }

    /// Pay `balance - reserve` to the winner.
    ///
    /// The escrow key is decrypted here and dropped as soon as the transfer
    /// call returns.
    ///
    /// # Errors
    /// [`DuelpotError::InsufficientFunds`] when nothing is payable above
    /// the reserve; chain and custody errors pass through.
    pub async fn execute_payout(&self, ticket: &PayoutTicket) -> Result<TransactionId> {
        let balance = self.adapter.get_balance(&ticket.escrow_address).await?;
        let reserve = self.adapter.minimum_reserve(ticket.network);
        let payable = balance - reserve;
        if payable <= Decimal::ZERO {
            return Err(DuelpotError::InsufficientFunds { balance, reserve });
        }

        let key = self.unseal(ticket.encrypted_key.clone()).await?;
        let sent = self
            .adapter
            .build_and_send_transfer(&key, &ticket.winner, payable)
            .await;
        drop(key);

        let tx = sent?;
        tracing::info!(
            match_id = %ticket.match_id,
            to = %ticket.winner,
            amount = %payable,
            tx = %tx,
            "Pot transferred"
        );
        Ok(tx)
    }

    /// Apply the payout outcome to a claimed match.
    ///
    /// Success commits `Settled`. A decryption failure absorbs the match
    /// into `Failed`, since no retry can recover the key. Every other
    /// error rolls back to `Open` so the caller may retry.
    pub fn finish_settlement(
        &self,
        m: &mut Match,
        ticket: &PayoutTicket,
        outcome: Result<TransactionId>,
    ) -> Result<TransactionId> {
        match outcome {
            Ok(tx) => {
                m.record_payout(&ticket.winner, tx.clone())?;
                tracing::info!(
                    match_id = %m.match_id(),
                    winner = %ticket.winner,
                    tx = %tx,
                    "Match settled"
                );
                Ok(tx)
            }
            Err(DuelpotError::Decryption) => {
                m.record_failure("escrow key could not be decrypted")?;
                tracing::error!(match_id = %m.match_id(), "Match failed: escrow key unusable");
                Err(DuelpotError::Decryption)
            }
            Err(err) => {
                m.transition(SettlementStatus::Open)?;
                tracing::warn!(
                    match_id = %m.match_id(),
                    error = %err,
                    retryable = err.is_retryable(),
                    "Settlement rolled back"
                );
                Err(err)
            }
        }
    }

    /// Settle a match the caller holds exclusively.
    pub async fn distribute_pot(&self, m: &mut Match, winner: &str) -> Result<TransactionId> {
        let ticket = self.begin_settlement(m, winner)?;
        let outcome = self.execute_payout(&ticket).await;
        self.finish_settlement(m, &ticket, outcome)
    }
}
