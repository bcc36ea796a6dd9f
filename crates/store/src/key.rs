// Path: crates/store/src/key.rs
//! Key encoding for the signed-VAA table.

use aegis_types::error::StoreError;
use aegis_types::{Address, ChainId};
use aegis_vaa::Vaa;
use std::fmt;
use std::str::FromStr;

/// Bytes in a full store key: chain (2) + emitter (32) + sequence (8).
pub const KEY_LEN: usize = 42;
/// Bytes in an emitter prefix: chain (2) + emitter (32).
pub const PREFIX_LEN: usize = 34;

/// The store key triple identifying one signed VAA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VaaId {
    pub emitter_chain: ChainId,
    pub emitter_address: Address,
    pub sequence: u64,
}

impl VaaId {
    pub fn from_vaa(vaa: &Vaa) -> Self {
        VaaId {
            emitter_chain: vaa.emitter_chain,
            emitter_address: vaa.emitter_address,
            sequence: vaa.sequence,
        }
    }

    pub fn emitter(&self) -> EmitterPrefix {
        EmitterPrefix {
            chain: self.emitter_chain,
            address: self.emitter_address,
        }
    }

    /// The big-endian table key; lexicographic order equals sequence order
    /// within one emitter.
    pub fn key(&self) -> [u8; KEY_LEN] {
        let mut out = [0u8; KEY_LEN];
        out[..2].copy_from_slice(&u16::from(self.emitter_chain).to_be_bytes());
        out[2..34].copy_from_slice(self.emitter_address.as_bytes());
        out[34..].copy_from_slice(&self.sequence.to_be_bytes());
        out
    }

    pub fn from_key(raw: &[u8]) -> Result<Self, StoreError> {
        if raw.len() != KEY_LEN {
            return Err(StoreError::Backend(format!(
                "bad key length {}",
                raw.len()
            )));
        }
        let mut chain = [0u8; 2];
        chain.copy_from_slice(&raw[..2]);
        let address = Address::from_bytes(&raw[2..34])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&raw[34..]);
        Ok(VaaId {
            emitter_chain: ChainId(u16::from_be_bytes(chain)),
            emitter_address: address,
            sequence: u64::from_be_bytes(seq),
        })
    }
}

impl fmt::Display for VaaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            u16::from(self.emitter_chain),
            self.emitter_address,
            self.sequence
        )
    }
}

impl FromStr for VaaId {
    type Err = StoreError;

    /// Parses the `chain/emitter_hex/sequence` message-id form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(chain), Some(emitter), Some(sequence), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(StoreError::Backend(format!("bad message id {:?}", s)));
        };
        let chain: u16 = chain
            .parse()
            .map_err(|_| StoreError::Backend(format!("bad chain in {:?}", s)))?;
        let emitter_address: Address = emitter
            .parse()
            .map_err(|_| StoreError::Backend(format!("bad emitter in {:?}", s)))?;
        let sequence: u64 = sequence
            .parse()
            .map_err(|_| StoreError::Backend(format!("bad sequence in {:?}", s)))?;
        Ok(VaaId {
            emitter_chain: ChainId(chain),
            emitter_address,
            sequence,
        })
    }
}

/// The `(chain, emitter)` pair that owns a sequence range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterPrefix {
    pub chain: ChainId,
    pub address: Address,
}

impl EmitterPrefix {
    pub fn prefix(&self) -> [u8; PREFIX_LEN] {
        let mut out = [0u8; PREFIX_LEN];
        out[..2].copy_from_slice(&u16::from(self.chain).to_be_bytes());
        out[2..].copy_from_slice(self.address.as_bytes());
        out
    }

    /// The inclusive key range covering every sequence under this emitter.
    pub fn range(&self) -> ([u8; KEY_LEN], [u8; KEY_LEN]) {
        let lo = VaaId {
            emitter_chain: self.chain,
            emitter_address: self.address,
            sequence: 0,
        }
        .key();
        let hi = VaaId {
            emitter_chain: self.chain,
            emitter_address: self.address,
            sequence: u64::MAX,
        }
        .key();
        (lo, hi)
    }
}

impl fmt::Display for EmitterPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", u16::from(self.chain), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seq: u64) -> VaaId {
        VaaId {
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_short(&[0xaa]).unwrap(),
            sequence: seq,
        }
    }

    #[test]
    fn test_key_orders_by_sequence() {
        assert!(id(1).key() < id(2).key());
        assert!(id(255).key() < id(256).key());
        assert!(id(u64::MAX - 1).key() < id(u64::MAX).key());
    }

    #[test]
    fn test_key_round_trip() {
        let original = id(77);
        assert_eq!(VaaId::from_key(&original.key()).unwrap(), original);
    }

    #[test]
    fn test_message_id_round_trip() {
        let original = id(9001);
        let parsed: VaaId = original.to_string().parse().unwrap();
        assert_eq!(parsed, original);
        assert!("2/abc".parse::<VaaId>().is_err());
        assert!("2/abc/1/extra".parse::<VaaId>().is_err());
    }
}
