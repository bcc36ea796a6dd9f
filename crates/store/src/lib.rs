// Path: crates/store/src/lib.rs
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

//! Persistent signed-VAA storage.
//!
//! A single redb table keyed by `(emitter_chain, emitter_address, sequence)`
//! with big-endian encodings, so iteration within one emitter prefix walks
//! sequences in ascending order. That ordering is what makes gap detection a
//! single range scan.

pub mod key;
pub mod metrics;
pub mod store;

pub use key::{EmitterPrefix, VaaId};
pub use store::{PurgeStats, SequenceGap, VaaStore};
