//! # duelpot-types
//!
//! Shared types, errors, and configuration for the **Duelpot** custodial
//! escrow engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`MatchId`], [`TransactionId`]
//! - **Networks**: [`Chain`], [`Network`]
//! - **Participants**: [`Player`]
//! - **Secrets**: [`RawPrivateKey`], [`MachineSecret`] (zeroized on drop, never logged)
//! - **Configuration**: [`GameConfig`], [`ServerConfig`], [`CustodyConfig`], [`KdfParams`]
//! - **Settlement results**: [`SettlementResult`], [`SettlementError`], [`ErrorKind`]
//! - **Errors**: [`DuelpotError`] with `DP_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod network;
pub mod player;
pub mod secret;
pub mod settlement;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use network::*;
pub use player::*;
pub use secret::*;
pub use settlement::*;

// Constants are accessed via `duelpot_types::constants::FOO`
// (not re-exported to avoid name collisions).
