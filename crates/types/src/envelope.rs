// Path: crates/types/src/envelope.rs
//! Gossip message envelopes.
//!
//! The gossip transport itself is external; these are the payloads it carries
//! between guardians, marshaled with the canonical codec in [`crate::codec`].

use crate::{ChainId, GuardianAddress};
use parity_scale_codec::{Decode, Encode};

/// One guardian's signed claim that it saw a particular source-chain event.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignedObservation {
    /// The claimed signer. Receivers recover the address from `signature`
    /// and drop the message on mismatch.
    pub addr: GuardianAddress,
    /// The double-keccak signing digest of the observed message body.
    pub hash: [u8; 32],
    /// A 65-byte recoverable secp256k1 signature over `hash`.
    pub signature: [u8; 65],
    /// The source-chain transaction, for re-observation by lagging peers.
    pub tx_hash: Vec<u8>,
    /// The `chain/emitter_hex/sequence` id of the observed message. Lagging
    /// peers need the chain id to address a re-observation request.
    pub message_id: String,
}

/// A fully-signed attestation rebroadcast after quorum was reached.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignedVaaWithQuorum {
    /// The marshaled VAA, signatures included.
    pub vaa_bytes: Vec<u8>,
}

/// A request that watchers re-observe a transaction we missed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ObservationRequest {
    pub chain_id: ChainId,
    pub tx_hash: Vec<u8>,
}

/// A cross-chain query request signed by an allow-listed requester.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignedQueryRequest {
    /// The marshaled query request.
    pub query_request: Vec<u8>,
    /// A 65-byte recoverable signature over the environment-prefixed digest.
    pub signature: [u8; 65],
}

/// One guardian's signed response to a cross-chain query.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignedQueryResponse {
    /// The marshaled query response.
    pub query_response: Vec<u8>,
    /// A 65-byte recoverable signature over the environment-prefixed digest.
    pub signature: [u8; 65],
}

/// Everything a guardian publishes onto the gossip bus.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum GossipOutbound {
    Observation(SignedObservation),
    VaaWithQuorum(SignedVaaWithQuorum),
    ObservationRequest(ObservationRequest),
    QueryResponse(SignedQueryResponse),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn test_envelope_round_trip() {
        let obs = SignedObservation {
            addr: GuardianAddress([7u8; 20]),
            hash: [9u8; 32],
            signature: [3u8; 65],
            tx_hash: vec![1, 2, 3],
            message_id: "2/00aa/7".to_string(),
        };
        let bytes = codec::to_bytes_canonical(&obs);
        let back: SignedObservation = codec::from_bytes_canonical(&bytes).unwrap();
        assert_eq!(back, obs);

        let out = GossipOutbound::ObservationRequest(ObservationRequest {
            chain_id: ChainId::SOLANA,
            tx_hash: vec![0xff; 64],
        });
        let bytes = codec::to_bytes_canonical(&out);
        assert_eq!(
            codec::from_bytes_canonical::<GossipOutbound>(&bytes).unwrap(),
            out
        );
    }
}
