// Path: crates/test_utils/src/lib.rs
//! Deterministic fixtures for guardian-network tests.
//!
//! Keys are derived from fixed seeds so every test run signs identically.

use aegis_types::{Address, ChainId, GuardianAddress, GuardianSet, MessagePublication};
use aegis_vaa::vaa::{sign_digest, VERSION};
use aegis_vaa::{guardian_address_of, Vaa};
use k256::ecdsa::SigningKey;

/// A fixed-size guardian network with known keys.
pub struct TestGuardianNetwork {
    keys: Vec<SigningKey>,
    set: GuardianSet,
}

impl TestGuardianNetwork {
    /// `n` guardians under set index `index`, keyed deterministically.
    pub fn new(index: u32, n: usize) -> Self {
        assert!(n > 0 && n < 256, "guardian count must fit a u8");
        let keys: Vec<SigningKey> = (0..n)
            .map(|i| {
                let mut seed = [0u8; 32];
                seed[0] = (index + 1) as u8;
                seed[31] = i as u8 + 1;
                SigningKey::from_slice(&seed).expect("fixed seed is a valid scalar")
            })
            .collect();
        let addresses: Vec<GuardianAddress> = keys
            .iter()
            .map(|k| guardian_address_of(k.verifying_key()))
            .collect();
        TestGuardianNetwork {
            keys,
            set: GuardianSet::new(index, addresses),
        }
    }

    pub fn set(&self) -> GuardianSet {
        self.set.clone()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, i: usize) -> &SigningKey {
        &self.keys[i]
    }

    pub fn address(&self, i: usize) -> GuardianAddress {
        self.set.addresses[i]
    }

    /// Guardian `i`'s 65-byte signature over a digest.
    pub fn sign(&self, i: usize, digest: &[u8; 32]) -> [u8; 65] {
        sign_digest(&self.keys[i], digest).expect("signing with a fixed key")
    }

    /// A VAA for `msg` signed by the first `quorum` guardians.
    pub fn signed_vaa(&self, msg: &MessagePublication, signers: usize) -> Vaa {
        let mut vaa = Vaa::from_publication(msg, self.set.index);
        for i in 0..signers {
            vaa.add_signature(&self.keys[i], i as u8)
                .expect("signing with a fixed key");
        }
        vaa
    }
}

/// A deterministic message publication for emitter `emitter` and `sequence`.
pub fn test_publication(emitter: u8, sequence: u64) -> MessagePublication {
    MessagePublication {
        tx_hash: vec![emitter; 32],
        timestamp: 1_700_000_000,
        nonce: u32::from(emitter),
        sequence,
        consistency_level: 1,
        emitter_chain: ChainId::ETHEREUM,
        emitter_address: Address::from_short(&[emitter]).expect("one byte always fits"),
        payload: vec![0xab, 0xcd, emitter],
        unreliable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_vaa::calculate_quorum;

    #[test]
    fn test_network_is_deterministic() {
        let a = TestGuardianNetwork::new(0, 3);
        let b = TestGuardianNetwork::new(0, 3);
        assert_eq!(a.set(), b.set());
        assert_ne!(a.address(0), a.address(1));
    }

    #[test]
    fn test_signed_vaa_verifies() {
        let network = TestGuardianNetwork::new(0, 4);
        let msg = test_publication(1, 7);
        let quorum = calculate_quorum(network.len());
        let vaa = network.signed_vaa(&msg, quorum);
        assert_eq!(vaa.version, VERSION);
        vaa.verify(&network.set()).unwrap();
    }
}
