//! Configuration types for Duelpot match servers.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DuelpotError, Network, Result, constants};

/// Per-server game rules. Applies to every match the server creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Amount each player deposits, in the chain's native unit (TRX, tez).
    pub buy_in_amount: Decimal,
    /// Network escrow accounts are created on.
    pub network: Network,
    /// Players per match.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
}

fn default_max_players() -> usize {
    constants::DEFAULT_MAX_PLAYERS
}

impl GameConfig {
    /// Head-to-head game on `network` with the given buy-in.
    #[must_use]
    pub fn head_to_head(buy_in_amount: Decimal, network: Network) -> Self {
        Self {
            buy_in_amount,
            network,
            max_players: constants::DEFAULT_MAX_PLAYERS,
        }
    }

    /// Total pot once every seat is taken.
    #[must_use]
    pub fn full_pot(&self) -> Decimal {
        self.buy_in_amount * Decimal::from(self.max_players)
    }

    /// Reject nonsensical rules.
    ///
    /// # Errors
    /// Returns [`DuelpotError::Configuration`] if the buy-in is not positive
    /// or `max_players` is outside `MIN_PLAYERS..=MAX_PLAYERS_LIMIT`.
    pub fn validate(&self) -> Result<()> {
        if self.buy_in_amount <= Decimal::ZERO {
            return Err(DuelpotError::Configuration(format!(
                "buy_in_amount must be positive, got {}",
                self.buy_in_amount
            )));
        }
        if !(constants::MIN_PLAYERS..=constants::MAX_PLAYERS_LIMIT).contains(&self.max_players) {
            return Err(DuelpotError::Configuration(format!(
                "max_players must be within {}..={}, got {}",
                constants::MIN_PLAYERS,
                constants::MAX_PLAYERS_LIMIT,
                self.max_players
            )));
        }
        Ok(())
    }
}

/// Argon2id cost parameters for sealing escrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost_kib: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: constants::DEFAULT_KDF_M_COST_KIB,
            t_cost: constants::DEFAULT_KDF_T_COST,
            p_cost: constants::DEFAULT_KDF_P_COST,
        }
    }
}

impl KdfParams {
    /// Check the parameters against Argon2id's floor and our ceilings.
    ///
    /// Blobs are only ever sealed and opened with parameters that pass, so
    /// anything that seals also opens.
    ///
    /// # Errors
    /// [`DuelpotError::Configuration`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(1..=constants::MAX_KDF_P_COST).contains(&self.p_cost) {
            return Err(DuelpotError::Configuration(format!(
                "kdf.p_cost must be within 1..={}, got {}",
                constants::MAX_KDF_P_COST,
                self.p_cost
            )));
        }
        if !(1..=constants::MAX_KDF_T_COST).contains(&self.t_cost) {
            return Err(DuelpotError::Configuration(format!(
                "kdf.t_cost must be within 1..={}, got {}",
                constants::MAX_KDF_T_COST,
                self.t_cost
            )));
        }
        // Argon2 needs at least 8 KiB per lane.
        let floor = 8 * self.p_cost;
        if !(floor..=constants::MAX_KDF_M_COST_KIB).contains(&self.m_cost_kib) {
            return Err(DuelpotError::Configuration(format!(
                "kdf.m_cost_kib must be within {floor}..={}, got {}",
                constants::MAX_KDF_M_COST_KIB,
                self.m_cost_kib
            )));
        }
        Ok(())
    }
}

/// Minimal-cost parameters. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl KdfParams {
    #[must_use]
    pub fn fast_for_tests() -> Self {
        Self {
            m_cost_kib: 64,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

/// Key custody settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Environment variable the machine secret is read from at start-up.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    #[serde(default)]
    pub kdf: KdfParams,
}

fn default_secret_env() -> String {
    constants::DEFAULT_SECRET_ENV.to_string()
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            kdf: KdfParams::default(),
        }
    }
}

/// Top-level configuration for one match server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub game: GameConfig,
    #[serde(default)]
    pub custody: CustodyConfig,
    /// How many settled match IDs the idempotency guard remembers.
    #[serde(default = "default_cache_size")]
    pub settlement_cache_size: usize,
}

fn default_cache_size() -> usize {
    constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE
}

impl ServerConfig {
    /// Server config with default custody settings.
    #[must_use]
    pub fn new(game: GameConfig) -> Self {
        Self {
            game,
            custody: CustodyConfig::default(),
            settlement_cache_size: default_cache_size(),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| DuelpotError::Configuration(format!("invalid server config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse, and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DuelpotError::Configuration(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.game.validate()?;
        if self.settlement_cache_size == 0 {
            return Err(DuelpotError::Configuration(
                "settlement_cache_size must be > 0".into(),
            ));
        }
        if self.custody.secret_env.trim().is_empty() {
            return Err(DuelpotError::Configuration(
                "custody.secret_env must name an environment variable".into(),
            ));
        }
        self.custody.kdf.validate()
    }
}
