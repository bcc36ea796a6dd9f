// Path: crates/types/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Core data structures shared across the aegis guardian node: chain and
//! emitter identifiers, guardian sets, watcher message publications, gossip
//! envelopes and the error taxonomy.

pub mod address;
pub mod chain;
pub mod codec;
pub mod env;
pub mod envelope;
pub mod error;
pub mod guardian_set;
pub mod message;

pub use address::{Address, GuardianAddress};
pub use chain::ChainId;
pub use env::Environment;
pub use guardian_set::GuardianSet;
pub use message::MessagePublication;
