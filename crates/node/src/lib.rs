// Path: crates/node/src/lib.rs
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

//! Node-level wiring for the aegis guardian: configuration and key loading,
//! environment hardening, the admin service contract, and the RPC backfill
//! client.

pub mod admin;
pub mod backfill;
pub mod config;
pub mod keys;
pub mod platform;

pub use admin::AdminService;
pub use config::{NodeConfig, NodeOpts};
