//! `MatchServer`: the façade application layers talk to.

use std::sync::Arc;

use duelpot_chain::{ChainAdapter, ChainRegistry};
use duelpot_custody::KeyCustodyVault;
use duelpot_types::{
    DuelpotError, GameConfig, MatchId, Result, ServerConfig, SettlementResult, constants,
};
use rust_decimal::Decimal;

use crate::{EscrowStateMachine, Match, MatchRegistry, SettlementCoordinator};

/// Runs matches for one [`GameConfig`] on one network.
///
/// Every operation looks the match up first and fails with
/// [`DuelpotError::MatchNotFound`] when it is absent. Safe to share across
/// tasks behind an `Arc`.
pub struct MatchServer {
    config: GameConfig,
    machine: Arc<EscrowStateMachine>,
    coordinator: SettlementCoordinator,
    registry: MatchRegistry,
}

impl MatchServer {
    /// # Errors
    /// - [`DuelpotError::Configuration`] if `config` is invalid
    /// - [`DuelpotError::UnsupportedNetwork`] if `adapter` cannot serve
    ///   `config.network`
    pub fn new(
        config: GameConfig,
        adapter: Arc<dyn ChainAdapter>,
        vault: Arc<KeyCustodyVault>,
    ) -> Result<Self> {
        Self::build(config, adapter, vault, constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE)
    }

    /// Server from a full [`ServerConfig`].
    pub fn from_config(
        config: &ServerConfig,
        adapter: Arc<dyn ChainAdapter>,
        vault: Arc<KeyCustodyVault>,
    ) -> Result<Self> {
        config.validate()?;
        Self::build(config.game.clone(), adapter, vault, config.settlement_cache_size)
    }

    /// Server whose adapter is looked up in `chains` by the configured network.
    pub fn from_registry(
        config: &ServerConfig,
        chains: &ChainRegistry,
        vault: Arc<KeyCustodyVault>,
    ) -> Result<Self> {
        let adapter = chains.for_network(config.game.network)?;
        Self::from_config(config, adapter, vault)
    }

    fn build(
        config: GameConfig,
        adapter: Arc<dyn ChainAdapter>,
        vault: Arc<KeyCustodyVault>,
        cache_size: usize,
    ) -> Result<Self> {
        config.validate()?;
        if !adapter.supports(config.network) {
            return Err(DuelpotError::UnsupportedNetwork(config.network));
        }
        if cache_size == 0 {
            return Err(DuelpotError::Configuration(
                "settlement_cache_size must be > 0".into(),
            ));
        }

        let machine = Arc::new(EscrowStateMachine::new(adapter, vault, config.max_players));
        tracing::info!(
            network = %config.network,
            buy_in = %config.buy_in_amount,
            max_players = config.max_players,
            full_pot = %config.full_pot(),
            "Match server started"
        );
        Ok(Self {
            coordinator: SettlementCoordinator::new(Arc::clone(&machine), cache_size),
            config,
            machine,
            registry: MatchRegistry::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create a match with a fresh escrow account.
    ///
    /// Uses `match_id` when given, else generates one.
    ///
    /// # Errors
    /// [`DuelpotError::DuplicateMatch`] if the id is taken; custody and
    /// key-generation errors pass through.
    pub async fn create_match(&self, match_id: Option<MatchId>) -> Result<Match> {
        let match_id = match_id.unwrap_or_else(MatchId::generate);
        if self.registry.contains(&match_id).await {
            return Err(DuelpotError::DuplicateMatch(match_id));
        }

        let account = self.machine.open_escrow_account(self.config.network).await?;
        let m = Match::new(
            match_id,
            account,
            self.config.buy_in_amount,
            self.config.network,
        );
        let snapshot = m.clone();
        self.registry.insert(m).await?;

        tracing::info!(
            match_id = %snapshot.match_id(),
            escrow = %snapshot.escrow_address(),
            network = %snapshot.network(),
            "Match created"
        );
        Ok(snapshot)
    }

    /// Seat `wallet` in the match.
    pub async fn join_match(&self, match_id: &MatchId, wallet: &str) -> Result<()> {
        let handle = self.registry.get(match_id).await?;
        let mut m = handle.lock().await;
        self.machine.add_player(&mut m, wallet)
    }

    /// Poll deposits. `true` once every player's buy-in is in escrow.
    pub async fn check_match_ready(&self, match_id: &MatchId) -> Result<bool> {
        let handle = self.registry.get(match_id).await?;
        let mut m = handle.lock().await;
        self.machine.check_deposits(&mut m).await
    }

    /// Pay the pot to `winner`. Exactly one call per match can succeed.
    pub async fn settle_match(&self, match_id: &MatchId, winner: &str) -> SettlementResult {
        match self.registry.get(match_id).await {
            Ok(handle) => self.coordinator.settle(&handle, winner).await,
            Err(err) => SettlementResult::failed(&err),
        }
    }

    /// Point-in-time copy of a match.
    pub async fn get_match(&self, match_id: &MatchId) -> Result<Match> {
        self.registry.snapshot(match_id).await
    }

    /// Copies of every match, ordered by id.
    pub async fn list_matches(&self) -> Vec<Match> {
        let mut out = Vec::new();
        for id in self.registry.list_ids().await {
            if let Ok(m) = self.registry.snapshot(&id).await {
                out.push(m);
            }
        }
        out
    }

    /// Current on-chain balance of a match's escrow account.
    pub async fn escrow_balance(&self, match_id: &MatchId) -> Result<Decimal> {
        let address = self.registry.snapshot(match_id).await?.escrow_address().to_string();
        self.machine.adapter().get_balance(&address).await
    }
}
