//! # duelpot-escrow
//!
//! Custodial two-player escrow: a server-held account collects both
//! buy-ins, deposits are confirmed by polling the chain, and the whole pot
//! goes to the declared winner exactly once.
//!
//! ## Flow
//!
//! ```text
//! create_match ─▶ seal escrow key ─▶ MatchRegistry
//! join_match ×N ─▶ check_match_ready (poll balance) ─▶ settle_match
//!                                                        │
//!                        SettlementCoordinator ◀─────────┘
//!                        guard → claim → payout → commit
//! ```
//!
//! ## Guarantees
//!
//! - At most one transfer per match, however many callers race
//!   `settle_match`.
//! - A failed transfer leaves the match `Open` for retry; only an
//!   undecryptable escrow key makes it `Failed`.
//! - The escrow private key is decrypted for one payout and dropped.
//! - No persistence: matches live as long as the process.

pub mod coordinator;
pub mod idempotency;
pub mod logging;
pub mod match_state;
pub mod registry;
pub mod server;
pub mod state_machine;

pub use coordinator::SettlementCoordinator;
pub use idempotency::IdempotencyGuard;
pub use logging::{LogConfig, LogFormat, LogLevel, init_logging};
pub use match_state::{Match, MatchPhase, SettlementStatus};
pub use registry::{MatchHandle, MatchRegistry};
pub use server::MatchServer;
pub use state_machine::{EscrowStateMachine, PayoutTicket};
