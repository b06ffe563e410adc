//! The `Match` entity and its settlement lifecycle.
//!
//! ```text
//!   Open ──claim──▶ InProgress ──commit──▶ Settled
//!    ▲                 │  │
//!    └────rollback─────┘  └──absorb──▶ Failed
//! ```
//!
//! `Settled` and `Failed` are terminal. The escrow address and sealed key
//! are fixed at construction; fields are private so nothing outside this
//! crate can rewrite them.

use chrono::{DateTime, Utc};
use duelpot_custody::{EncryptedBlob, SealedAccount};
use duelpot_types::{DuelpotError, MatchId, Network, Player, Result, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement progress of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    /// No payout attempted, or the last attempt rolled back.
    Open,
    /// One caller owns the payout; everyone else is turned away.
    InProgress,
    /// Pot paid; terminal.
    Settled,
    /// Custody key unusable; terminal.
    Failed,
}

impl SettlementStatus {
    /// Whether `self → target` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::InProgress)
                | (Self::InProgress, Self::Open | Self::Settled | Self::Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Coarse lifecycle phase, derived from players, deposits and settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No players yet.
    Created,
    /// Seats still open.
    Joining,
    /// Full, deposits not yet confirmed.
    Funding,
    /// Full and funded.
    Ready,
    Settling,
    Settled,
    Failed,
}

/// One wagering match and its custodial escrow account.
///
/// Serializable for snapshots and audit output. There is no `Deserialize`:
/// a `Match` only comes from [`Match::new`] and the lifecycle methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    match_id: MatchId,
    escrow_address: String,
    encrypted_key: EncryptedBlob,
    buy_in_amount: Decimal,
    network: Network,
    players: Vec<Player>,
    created_at: DateTime<Utc>,
    settlement: SettlementStatus,
    winner: Option<String>,
    settlement_tx: Option<TransactionId>,
    settled_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Match {
    /// New open match around a freshly sealed escrow account.
    #[must_use]
    pub fn new(
        match_id: MatchId,
        account: SealedAccount,
        buy_in_amount: Decimal,
        network: Network,
    ) -> Self {
        Self {
            match_id,
            escrow_address: account.address,
            encrypted_key: account.encrypted_key,
            buy_in_amount,
            network,
            players: Vec::new(),
            created_at: Utc::now(),
            settlement: SettlementStatus::Open,
            winner: None,
            settlement_tx: None,
            settled_at: None,
            failure_reason: None,
        }
    }

    #[must_use]
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    #[must_use]
    pub fn escrow_address(&self) -> &str {
        &self.escrow_address
    }

    #[must_use]
    pub fn encrypted_key(&self) -> &EncryptedBlob {
        &self.encrypted_key
    }

    #[must_use]
    pub fn buy_in_amount(&self) -> Decimal {
        self.buy_in_amount
    }

    #[must_use]
    pub fn network(&self) -> Network {
        self.network
    }

    /// Players in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn settlement(&self) -> SettlementStatus {
        self.settlement
    }

    /// Whether the pot has been paid out.
    #[must_use]
    pub fn settled(&self) -> bool {
        self.settlement == SettlementStatus::Settled
    }

    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    #[must_use]
    pub fn settlement_tx(&self) -> Option<&TransactionId> {
        self.settlement_tx.as_ref()
    }

    #[must_use]
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    #[must_use]
    pub fn has_player(&self, wallet: &str) -> bool {
        self.players.iter().any(|p| p.wallet_address == wallet)
    }

    /// True when there is at least one player and all are marked deposited.
    #[must_use]
    pub fn all_deposited(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.deposited)
    }

    /// Escrow balance needed before every player counts as deposited.
    #[must_use]
    pub fn required_balance(&self) -> Decimal {
        self.buy_in_amount * Decimal::from(self.players.len())
    }

    #[must_use]
    pub fn phase(&self, max_players: usize) -> MatchPhase {
        match self.settlement {
            SettlementStatus::Settled => MatchPhase::Settled,
            SettlementStatus::Failed => MatchPhase::Failed,
            SettlementStatus::InProgress => MatchPhase::Settling,
            SettlementStatus::Open if self.players.is_empty() => MatchPhase::Created,
            SettlementStatus::Open if self.players.len() < max_players => MatchPhase::Joining,
            SettlementStatus::Open if self.all_deposited() => MatchPhase::Ready,
            SettlementStatus::Open => MatchPhase::Funding,
        }
    }

    pub(crate) fn push_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub(crate) fn confirm_all_deposits(&mut self) {
        let amount = self.buy_in_amount;
        for player in &mut self.players {
            player.confirm_deposit(amount);
        }
    }

    /// Move to `target`, refusing illegal transitions.
    pub(crate) fn transition(&mut self, target: SettlementStatus) -> Result<()> {
        if !self.settlement.can_transition_to(target) {
            return Err(DuelpotError::IllegalTransition {
                reason: format!(
                    "match {} cannot move from {} to {target}",
                    self.match_id, self.settlement
                ),
            });
        }
        self.settlement = target;
        Ok(())
    }

    pub(crate) fn record_payout(&mut self, winner: &str, tx: TransactionId) -> Result<()> {
        self.transition(SettlementStatus::Settled)?;
        self.winner = Some(winner.to_string());
        self.settlement_tx = Some(tx);
        self.settled_at = Some(Utc::now());
        Ok(())
    }

    pub(crate) fn record_failure(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(SettlementStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

/// Dummy match for testing. **Never use in production.**
///
/// The sealed key is random bytes and cannot be decrypted.
#[cfg(any(test, feature = "test-helpers"))]
impl Match {
    #[must_use]
    pub fn dummy(buy_in_amount: Decimal) -> Self {
        let blob = EncryptedBlob {
            version: duelpot_custody::BLOB_VERSION,
            kdf: duelpot_types::KdfParams::fast_for_tests(),
            salt: [7; 16],
            nonce: [7; 12],
            auth_tag: [7; 16],
            ciphertext: vec![7; 32],
        };
        Self::new(
            MatchId::generate(),
            SealedAccount {
                address: "mock1dummyescrow".into(),
                encrypted_key: blob,
            },
            buy_in_amount,
            Network::TronNile,
        )
    }
}
