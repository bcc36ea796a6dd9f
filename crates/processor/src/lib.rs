// Path: crates/processor/src/lib.rs
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

//! The observation-aggregation processor.
//!
//! A single cooperative event loop owns the per-digest observation map and
//! services one channel event at a time: watcher message publications, peer
//! observations, quorum VAAs from gossip, guardian-set updates, and the
//! periodic cleanup and governor ticks. Everything else talks to the loop
//! through bounded channels.

pub mod gst;
pub mod metrics;
pub mod processor;
pub mod state;

pub use gst::{GuardianSetState, GuardianSigner};
pub use processor::{Processor, ProcessorChannels};
pub use state::ObservationState;
