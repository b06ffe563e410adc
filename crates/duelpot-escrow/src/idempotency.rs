//! Settlement idempotency guard. Prevents paying the same match twice.
//!
//! Each match can be settled once. Marking the same `MatchId` a second time
//! returns [`DuelpotError::AlreadySettled`]. The guard also remembers the
//! payout transaction so repeat callers can be pointed at it.
//!
//! The cache is bounded with FIFO eviction so memory stays predictable on
//! long-running servers. An evicted match is still protected by its own
//! `SettlementStatus`; the guard is the fast path in front of it.

use std::collections::{HashMap, VecDeque};

use duelpot_types::{DuelpotError, MatchId, Result, TransactionId};

pub struct IdempotencyGuard {
    /// Settled match → payout transaction.
    settled: HashMap<MatchId, TransactionId>,
    /// Insertion order (front = oldest).
    order: VecDeque<MatchId>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// Create a new guard with the given maximum cache size.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "IdempotencyGuard max_size must be > 0");
        Self {
            settled: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Record `match_id` as paid by `tx`.
    ///
    /// # Errors
    /// [`DuelpotError::AlreadySettled`] if `match_id` is already recorded.
    pub fn mark_settled(&mut self, match_id: MatchId, tx: TransactionId) -> Result<()> {
        if self.settled.contains_key(&match_id) {
            return Err(DuelpotError::AlreadySettled(match_id));
        }

        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }

        self.settled.insert(match_id.clone(), tx);
        self.order.push_back(match_id);
        Ok(())
    }

    /// Fail with `AlreadySettled` if `match_id` is recorded.
    pub fn check(&self, match_id: &MatchId) -> Result<()> {
        if self.is_settled(match_id) {
            return Err(DuelpotError::AlreadySettled(match_id.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, match_id: &MatchId) -> bool {
        self.settled.contains_key(match_id)
    }

    /// Payout transaction of a recorded match.
    #[must_use]
    pub fn settled_tx(&self, match_id: &MatchId) -> Option<&TransactionId> {
        self.settled.get(match_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}
