// Path: crates/governor/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! The chain governor: a rate-limit and large-transfer-delay layer that may
//! withhold outbound token-bridge VAAs.
//!
//! For every message addressed to a governed token-bridge emitter the
//! governor decides to admit it, hold it pending, or pass it through
//! unchanged when the emitter is not under its jurisdiction. Decisions are a
//! pure function of configuration, the rolling 24-hour window and the
//! message, so identically-configured guardians never diverge.

pub mod config;
pub mod governor;
pub mod metrics;
pub mod transfer;

pub use config::GovernorConfig;
pub use governor::{ChainGovernor, GovernorStatus};
pub use transfer::{parse_token_transfer, TokenTransfer, MAX_VAA_DECIMALS};
