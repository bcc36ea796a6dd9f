// Path: crates/types/src/message.rs
//! The watcher output contract: one observed source-chain message.

use crate::{Address, ChainId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message emitted on a source chain, as observed by a watcher.
///
/// This is the input contract of the aggregation pipeline; watchers produce
/// these, the governor may hold them, and the processor turns them into
/// signed observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct MessagePublication {
    /// The source-chain transaction that emitted the message.
    pub tx_hash: Vec<u8>,
    /// Seconds since the Unix epoch, as reported by the source chain.
    pub timestamp: u32,
    pub nonce: u32,
    pub sequence: u64,
    pub consistency_level: u8,
    pub emitter_chain: ChainId,
    pub emitter_address: Address,
    pub payload: Vec<u8>,
    /// Unreliable messages may be re-emitted with the same sequence; they are
    /// never persisted for backfill.
    pub unreliable: bool,
}

impl MessagePublication {
    /// The per-emitter identifier, `chain/emitter_hex/sequence`.
    pub fn message_id(&self) -> String {
        format!(
            "{}/{}/{}",
            u16::from(self.emitter_chain),
            self.emitter_address,
            self.sequence
        )
    }
}

impl fmt::Display for MessagePublication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_format() {
        let msg = MessagePublication {
            tx_hash: vec![0xab; 32],
            timestamp: 1_700_000_000,
            nonce: 7,
            sequence: 42,
            consistency_level: 1,
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_short(&[0x04]).unwrap(),
            payload: b"hello".to_vec(),
            unreliable: false,
        };
        assert_eq!(
            msg.message_id(),
            "2/0000000000000000000000000000000000000000000000000000000000000004/42"
        );
    }
}
