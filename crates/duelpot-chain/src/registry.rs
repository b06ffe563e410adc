//! Runtime lookup of chain adapters by network.
//!
//! The registry is cheap to clone (`Arc` internally) and is shared by every
//! match server in the process. Adapters are registered while the registry
//! is still uniquely owned, during start-up.

use std::collections::HashMap;
use std::sync::Arc;

use duelpot_types::{Chain, DuelpotError, Network, Result};

use crate::ChainAdapter;

/// Registry of configured chain adapters, one per network.
#[derive(Clone, Default)]
pub struct ChainRegistry {
    adapters: Arc<HashMap<Network, Arc<dyn ChainAdapter>>>,
}

impl ChainRegistry {
    /// Registry with no adapters.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register `adapter` for the network it serves.
    ///
    /// Replaces any adapter already registered for that network.
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        let network = adapter.network();
        Arc::make_mut(&mut self.adapters).insert(network, adapter);
        tracing::debug!(network = %network, "Chain adapter registered");
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapter serving `network`, if any.
    #[must_use]
    pub fn get(&self, network: Network) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters.get(&network).cloned()
    }

    /// Adapter serving `network`.
    ///
    /// # Errors
    /// [`DuelpotError::UnsupportedNetwork`] if nothing is registered for it.
    pub fn for_network(&self, network: Network) -> Result<Arc<dyn ChainAdapter>> {
        self.get(network)
            .filter(|adapter| adapter.supports(network))
            .ok_or(DuelpotError::UnsupportedNetwork(network))
    }

    #[must_use]
    pub fn supports(&self, network: Network) -> bool {
        self.adapters.contains_key(&network)
    }

    /// Registered networks, sorted by name.
    #[must_use]
    pub fn supported_networks(&self) -> Vec<Network> {
        let mut networks: Vec<Network> = self.adapters.keys().copied().collect();
        networks.sort_by_key(|n| n.as_str());
        networks
    }

    /// Chain families with at least one registered network.
    #[must_use]
    pub fn supported_chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.adapters.keys().map(|n| n.chain()).collect();
        chains.sort_by_key(|c| c.to_string());
        chains.dedup();
        chains
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("networks", &self.supported_networks())
            .finish()
    }
}
