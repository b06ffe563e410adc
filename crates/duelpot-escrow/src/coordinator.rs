//! Exactly-once settlement across concurrent callers.
//!
//! The coordinator is the only path from `settle_match` to a transfer:
//!
//! 1. idempotency guard (fast `AlreadySettled`)
//! 2. full-match check and claim, under the match lock
//! 3. payout, with the lock released
//! 4. commit or roll back, under the lock
//! 5. record the payout in the guard
//!
//! Errors never escape as `Err`; callers get a [`SettlementResult`].

use std::sync::Arc;

use duelpot_types::{DuelpotError, Result, SettlementResult, TransactionId};
use tokio::sync::Mutex;

use crate::{EscrowStateMachine, IdempotencyGuard, MatchHandle};

pub struct SettlementCoordinator {
    machine: Arc<EscrowStateMachine>,
    guard: Mutex<IdempotencyGuard>,
}

impl SettlementCoordinator {
    #[must_use]
    pub fn new(machine: Arc<EscrowStateMachine>, cache_size: usize) -> Self {
        Self {
            machine,
            guard: Mutex::new(IdempotencyGuard::new(cache_size)),
        }
    }

    /// Settle the match behind `handle`, paying `winner`.
    pub async fn settle(&self, handle: &MatchHandle, winner: &str) -> SettlementResult {
        let result = self.try_settle(handle, winner).await;
        if let Err(err) = &result {
            tracing::debug!(error = %err, retryable = err.is_retryable(), "Settlement not paid");
        }
        SettlementResult::from(result)
    }

    /// Payout transaction of a recently settled match, if still cached.
    pub async fn settled_tx(&self, handle: &MatchHandle) -> Option<TransactionId> {
        let match_id = handle.lock().await.match_id().clone();
        self.guard.lock().await.settled_tx(&match_id).cloned()
    }

    async fn try_settle(&self, handle: &MatchHandle, winner: &str) -> Result<TransactionId> {
        let ticket = {
            let mut m = handle.lock().await;
            self.guard.lock().await.check(m.match_id())?;

            let required = self.machine.max_players();
            if !m.settlement().is_terminal() && m.players().len() < required {
                return Err(DuelpotError::MatchNotFull {
                    match_id: m.match_id().clone(),
                    joined: m.players().len(),
                    required,
                });
            }
            self.machine.begin_settlement(&mut m, winner)?
        };

        let outcome = self.machine.execute_payout(&ticket).await;

        let tx = {
            let mut m = handle.lock().await;
            self.machine.finish_settlement(&mut m, &ticket, outcome)?
        };

        if let Err(err) = self
            .guard
            .lock()
            .await
            .mark_settled(ticket.match_id.clone(), tx.clone())
        {
            // The match itself is already Settled; the guard is only a cache.
            tracing::warn!(match_id = %ticket.match_id, error = %err, "Guard already held match");
        }
        Ok(tx)
    }
}
