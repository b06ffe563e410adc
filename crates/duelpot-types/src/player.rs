//! Match participants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A player who joined a match with a wallet address.
///
/// `deposited` only flips once the escrow balance covers every player's
/// buy-in; deposits are not attributed per sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Payout address; unique within a match.
    pub wallet_address: String,
    /// Whether the buy-in is confirmed on chain.
    pub deposited: bool,
    /// Confirmed deposit, zero until `deposited`.
    pub deposit_amount: Decimal,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    /// A freshly joined player with no confirmed deposit.
    #[must_use]
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            deposited: false,
            deposit_amount: Decimal::ZERO,
            joined_at: Utc::now(),
        }
    }

    /// Record a confirmed buy-in.
    pub fn confirm_deposit(&mut self, amount: Decimal) {
        self.deposited = true;
        self.deposit_amount = amount;
    }
}
