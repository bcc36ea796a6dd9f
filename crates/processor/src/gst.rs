// Path: crates/processor/src/gst.rs
//! Guardian-set state and the local signing key.

use aegis_types::error::ProcessorError;
use aegis_types::{GuardianAddress, GuardianSet};
use aegis_vaa::vaa::{sign_digest, SIGNATURE_LEN};
use aegis_vaa::guardian_address_of;
use k256::ecdsa::SigningKey;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// How long a superseded set keeps verifying after a rotation, when the
/// rotation itself does not schedule an expiration.
pub const SET_TRANSITION_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, Default)]
struct Sets {
    current: Option<Arc<GuardianSet>>,
    previous: Option<Arc<GuardianSet>>,
}

/// The read-mostly guardian-set handle.
///
/// Only the processor mutates it (on set-update events); every other task
/// reads through the snapshot accessors.
#[derive(Debug, Default)]
pub struct GuardianSetState {
    sets: RwLock<Sets>,
}

impl GuardianSetState {
    pub fn new(initial: Option<GuardianSet>) -> Self {
        GuardianSetState {
            sets: RwLock::new(Sets {
                current: initial.map(Arc::new),
                previous: None,
            }),
        }
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> Option<Arc<GuardianSet>> {
        self.read().current.clone()
    }

    /// Snapshot of the still-valid previous set, if any.
    pub fn previous(&self) -> Option<Arc<GuardianSet>> {
        self.read().previous.clone()
    }

    /// The set with the given governance index, if we still track it.
    pub fn by_index(&self, index: u32) -> Option<Arc<GuardianSet>> {
        let sets = self.read();
        match (&sets.current, &sets.previous) {
            (Some(current), _) if current.index == index => Some(current.clone()),
            (_, Some(previous)) if previous.index == index => Some(previous.clone()),
            _ => None,
        }
    }

    /// Installs a new current set. The superseded set is retained for
    /// verification until its expiration window elapses; signatures already
    /// counted into submitted states are never retroactively invalidated.
    pub fn update(&self, new_set: GuardianSet, now: u64) {
        let mut sets = self.write();
        if let Some(old) = sets.current.take() {
            let mut old = (*old).clone();
            if old.expiration_time == 0 {
                old.expiration_time = now + SET_TRANSITION_WINDOW_SECS;
            }
            info!(
                target: "processor",
                old_index = old.index,
                new_index = new_set.index,
                old_expires = old.expiration_time,
                "guardian set rotated"
            );
            sets.previous = Some(Arc::new(old));
        }
        sets.current = Some(Arc::new(new_set));
    }

    /// Whether `addr` may sign right now: a member of the current set, or of
    /// the previous set while that set is still valid.
    pub fn is_valid_signer(&self, addr: &GuardianAddress, now: u64) -> bool {
        let sets = self.read();
        if let Some(current) = &sets.current {
            if current.key_index(addr).is_some() {
                return true;
            }
        }
        if let Some(previous) = &sets.previous {
            if previous.is_valid_at(now) && previous.key_index(addr).is_some() {
                return true;
            }
        }
        false
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Sets> {
        self.sets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Sets> {
        self.sets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The local guardian signing key.
pub struct GuardianSigner {
    key: SigningKey,
    address: GuardianAddress,
}

impl GuardianSigner {
    pub fn new(key: SigningKey) -> Self {
        let address = guardian_address_of(key.verifying_key());
        GuardianSigner { key, address }
    }

    pub fn address(&self) -> GuardianAddress {
        self.address
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], ProcessorError> {
        sign_digest(&self.key, digest).map_err(|e| ProcessorError::Signer(e.to_string()))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(index: u32, seed: u8, n: u8) -> GuardianSet {
        GuardianSet::new(
            index,
            (0..n).map(|i| GuardianAddress([seed + i; 20])).collect(),
        )
    }

    #[test]
    fn test_rotation_retains_previous_until_expiry() {
        let gst = GuardianSetState::new(Some(set(0, 10, 3)));
        gst.update(set(1, 50, 3), 1_000);

        assert_eq!(gst.current().unwrap().index, 1);
        let previous = gst.previous().unwrap();
        assert_eq!(previous.index, 0);
        assert_eq!(previous.expiration_time, 1_000 + SET_TRANSITION_WINDOW_SECS);

        // Old member valid inside the window, invalid after.
        let old_member = GuardianAddress([10; 20]);
        assert!(gst.is_valid_signer(&old_member, 2_000));
        assert!(!gst.is_valid_signer(&old_member, 1_000 + SET_TRANSITION_WINDOW_SECS));

        let new_member = GuardianAddress([50; 20]);
        assert!(gst.is_valid_signer(&new_member, u64::MAX));
        assert!(!gst.is_valid_signer(&GuardianAddress([99; 20]), 0));
    }

    #[test]
    fn test_by_index() {
        let gst = GuardianSetState::new(Some(set(4, 1, 2)));
        gst.update(set(5, 30, 2), 0);
        assert_eq!(gst.by_index(5).unwrap().index, 5);
        assert_eq!(gst.by_index(4).unwrap().index, 4);
        assert!(gst.by_index(3).is_none());
    }

    #[test]
    fn test_signer_address_is_stable() {
        let mut seed = [7u8; 32];
        seed[0] = 1;
        let signer = GuardianSigner::new(SigningKey::from_slice(&seed).unwrap());
        let digest = [0x42u8; 32];
        let sig = signer.sign(&digest).unwrap();
        let recovered = aegis_vaa::vaa::recover_signer(&digest, &sig).unwrap();
        assert_eq!(recovered, signer.address());
    }
}
