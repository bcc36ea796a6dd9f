// Path: crates/types/src/codec.rs
//! The canonical, deterministic binary codec for internal envelopes.
//!
//! Consensus-critical wire formats (the VAA body, query requests) have their
//! own hand-rolled big-endian layouts; everything that only travels between
//! our own components (gossip envelopes, store metadata) goes through SCALE,
//! which is compact and deterministic.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from its canonical byte representation, consuming the
/// whole input. Trailing bytes are an error; malformed internal messages must
/// fail fast rather than round down to a prefix.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Encode, Decode, Debug, PartialEq, Eq)]
    struct TestStruct {
        id: u32,
        tags: Vec<u8>,
    }

    #[test]
    fn test_round_trip() {
        let v = TestStruct {
            id: 42,
            tags: vec![1, 2, 3],
        };
        let encoded = to_bytes_canonical(&v);
        assert_eq!(from_bytes_canonical::<TestStruct>(&encoded).unwrap(), v);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = to_bytes_canonical(&TestStruct {
            id: 1,
            tags: vec![],
        });
        encoded.push(0);
        assert!(from_bytes_canonical::<TestStruct>(&encoded).is_err());
    }

    #[test]
    fn test_truncation_rejected() {
        let mut encoded = to_bytes_canonical(&TestStruct {
            id: 7,
            tags: vec![9; 8],
        });
        encoded.pop();
        assert!(from_bytes_canonical::<TestStruct>(&encoded).is_err());
    }
}
