// Path: crates/vaa/src/lib.rs
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

//! The canonical signed-attestation (VAA) binary format.
//!
//! Wire layout, big-endian throughout:
//!
//! ```text
//! header:
//! 0   uint8   version (0x01)
//! 1   uint32  guardian set index
//! 5   uint8   number of signatures
//! per signature (length 66):
//! 0   uint8       guardian index
//! 1   [65]uint8   signature (r || s || v)
//! body:
//! 0   uint32      timestamp (unix seconds)
//! 4   uint32      nonce
//! 8   uint16      emitter chain
//! 10  [32]uint8   emitter address
//! 42  uint64      sequence
//! 50  uint8       consistency level
//! 51  []uint8     payload
//! ```
//!
//! The signing digest is `keccak256(keccak256(body))`; it covers only the
//! body, so signatures never invalidate each other.

pub mod governance;
pub mod vaa;

pub use governance::GovernancePayload;
pub use vaa::{calculate_quorum, guardian_address_of, Signature, Vaa};
