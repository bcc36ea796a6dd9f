// Path: crates/types/src/guardian_set.rs
//! Guardian set state: the indexed, ordered list of authorized signers.

use crate::GuardianAddress;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// An ordered list of guardian signing addresses together with its governance
/// index. Index 0 is the genesis set; indices are monotonic. A superseded set
/// remains valid for verification until its expiration time passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct GuardianSet {
    pub index: u32,
    pub addresses: Vec<GuardianAddress>,
    /// Seconds since the Unix epoch after which this set no longer verifies;
    /// zero means no expiration is scheduled yet.
    pub expiration_time: u64,
}

impl GuardianSet {
    pub fn new(index: u32, addresses: Vec<GuardianAddress>) -> Self {
        GuardianSet {
            index,
            addresses,
            expiration_time: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// The position of `addr` in the set, if it is a member.
    pub fn key_index(&self, addr: &GuardianAddress) -> Option<u8> {
        self.addresses
            .iter()
            .position(|a| a == addr)
            .and_then(|i| u8::try_from(i).ok())
    }

    /// Whether this set still verifies signatures at `now` (seconds since
    /// the Unix epoch).
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.expiration_time == 0 || now < self.expiration_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> GuardianAddress {
        GuardianAddress([b; 20])
    }

    #[test]
    fn test_key_index() {
        let set = GuardianSet::new(3, vec![addr(1), addr(2), addr(3)]);
        assert_eq!(set.key_index(&addr(2)), Some(1));
        assert_eq!(set.key_index(&addr(9)), None);
    }

    #[test]
    fn test_expiration() {
        let mut set = GuardianSet::new(0, vec![addr(1)]);
        assert!(set.is_valid_at(u64::MAX));
        set.expiration_time = 100;
        assert!(set.is_valid_at(99));
        assert!(!set.is_valid_at(100));
    }
}
