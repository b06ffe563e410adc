//! In-memory match store owned by one `MatchServer`.
//!
//! The map itself sits behind an `RwLock`; each match sits behind its own
//! `Mutex`, so work on one match never blocks another. Nothing is
//! persisted: a restart loses every match.

use std::collections::HashMap;
use std::sync::Arc;

use duelpot_types::{DuelpotError, MatchId, Result};
use tokio::sync::{Mutex, RwLock};

use crate::Match;

/// Shared, individually locked match.
pub type MatchHandle = Arc<Mutex<Match>>;

#[derive(Default)]
pub struct MatchRegistry {
    matches: RwLock<HashMap<MatchId, MatchHandle>>,
}

impl MatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new match.
    ///
    /// # Errors
    /// [`DuelpotError::DuplicateMatch`] if the id is taken.
    pub async fn insert(&self, m: Match) -> Result<MatchHandle> {
        let mut matches = self.matches.write().await;
        let id = m.match_id().clone();
        if matches.contains_key(&id) {
            return Err(DuelpotError::DuplicateMatch(id));
        }
        let handle = Arc::new(Mutex::new(m));
        matches.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// # Errors
    /// [`DuelpotError::MatchNotFound`] if absent.
    pub async fn get(&self, match_id: &MatchId) -> Result<MatchHandle> {
        self.matches
            .read()
            .await
            .get(match_id)
            .cloned()
            .ok_or_else(|| DuelpotError::MatchNotFound(match_id.clone()))
    }

    pub async fn contains(&self, match_id: &MatchId) -> bool {
        self.matches.read().await.contains_key(match_id)
    }

    /// Point-in-time copy of one match.
    pub async fn snapshot(&self, match_id: &MatchId) -> Result<Match> {
        let handle = self.get(match_id).await?;
        let m = handle.lock().await;
        Ok(m.clone())
    }

    /// All match ids, sorted.
    pub async fn list_ids(&self) -> Vec<MatchId> {
        let mut ids: Vec<MatchId> = self.matches.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.matches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.matches.read().await.is_empty()
    }
}
