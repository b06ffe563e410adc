//! System-wide constants for the Duelpot escrow engine.

/// Default number of players per match (head-to-head wagering).
pub const DEFAULT_MAX_PLAYERS: usize = 2;

/// Upper bound on `max_players` accepted from configuration.
pub const MAX_PLAYERS_LIMIT: usize = 64;

/// Minimum number of players for a match to be meaningful.
pub const MIN_PLAYERS: usize = 2;

/// Settlement idempotency cache size (number of settled match IDs to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Default environment variable holding the machine secret.
pub const DEFAULT_SECRET_ENV: &str = "DUELPOT_MACHINE_SECRET";

/// Minimum accepted machine secret length in bytes.
pub const MIN_MACHINE_SECRET_LEN: usize = 16;

/// Default Argon2id memory cost in KiB (19 MiB).
pub const DEFAULT_KDF_M_COST_KIB: u32 = 19 * 1024;

/// Default Argon2id iteration count.
pub const DEFAULT_KDF_T_COST: u32 = 2;

/// Default Argon2id parallelism.
pub const DEFAULT_KDF_P_COST: u32 = 1;

/// Upper bound on Argon2id memory cost in KiB (4 GiB).
pub const MAX_KDF_M_COST_KIB: u32 = 4 * 1024 * 1024;

/// Upper bound on Argon2id iterations.
pub const MAX_KDF_T_COST: u32 = 64;

/// Upper bound on Argon2id lanes.
pub const MAX_KDF_P_COST: u32 = 16;

/// Prefix for generated match IDs.
pub const MATCH_ID_PREFIX: &str = "m_";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Duelpot";
