// Path: crates/types/src/chain.rs
//! Chain identifiers as assigned by the attestation network.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 16-bit chain identifier. The reserved value 0 means "unset/universal"
/// and is used by governance actions that apply to every chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(transparent)]
pub struct ChainId(pub u16);

impl ChainId {
    /// The reserved "unset/universal" chain.
    pub const ANY: ChainId = ChainId(0);
    pub const SOLANA: ChainId = ChainId(1);
    pub const ETHEREUM: ChainId = ChainId(2);
    pub const TERRA: ChainId = ChainId(3);
    pub const BSC: ChainId = ChainId(4);
    pub const POLYGON: ChainId = ChainId(5);
    pub const AVALANCHE: ChainId = ChainId(6);

    /// Whether this is a concrete chain assignment (not the reserved 0).
    pub fn is_set(&self) -> bool {
        self.0 != 0
    }
}

impl From<u16> for ChainId {
    fn from(id: u16) -> Self {
        ChainId(id)
    }
}

impl From<ChainId> for u16 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChainId::ANY => write!(f, "any"),
            ChainId::SOLANA => write!(f, "solana"),
            ChainId::ETHEREUM => write!(f, "ethereum"),
            ChainId::TERRA => write!(f, "terra"),
            ChainId::BSC => write!(f, "bsc"),
            ChainId::POLYGON => write!(f, "polygon"),
            ChainId::AVALANCHE => write!(f, "avalanche"),
            ChainId(other) => write!(f, "chain-{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_display() {
        assert_eq!(ChainId::SOLANA.to_string(), "solana");
        assert_eq!(ChainId(4242).to_string(), "chain-4242");
        assert_eq!(ChainId::ANY.to_string(), "any");
    }

    #[test]
    fn test_chain_id_is_set() {
        assert!(!ChainId::ANY.is_set());
        assert!(ChainId::ETHEREUM.is_set());
    }
}
