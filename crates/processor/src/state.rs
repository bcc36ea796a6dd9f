// Path: crates/processor/src/state.rs
//! Per-digest observation state.

use aegis_types::{GuardianAddress, GuardianSet, MessagePublication};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// First re-observation delay.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(300);
/// Backoff cap for re-observation.
pub const RETRY_INTERVAL_MAX: Duration = Duration::from_secs(600);
/// Re-observation attempts before a digest is given up on.
pub const RETRY_LIMIT: u32 = 5;
/// How long a submitted state lingers before it settles and is dropped.
pub const SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(30);
/// Hard age cap for states that never reach quorum.
pub const QUORUM_TIMEOUT: Duration = Duration::from_secs(3_600);

/// Everything the processor tracks for one in-flight digest. Owned
/// exclusively by the processor loop; mutated by nothing else.
pub struct ObservationState {
    /// When the first signature (ours or a peer's) arrived.
    pub first_observed: Instant,
    /// Next re-observation deadline.
    pub next_retry: Instant,
    pub retry_ctr: u32,
    /// Our own watcher message, once we have it.
    pub our_observation: Option<MessagePublication>,
    /// Last-write-wins signatures by recovered guardian address. Across a
    /// set transition this may hold members of either set; the quorum count
    /// filters by the current one.
    pub signatures: HashMap<GuardianAddress, [u8; 65]>,
    pub submitted: bool,
    pub settled: bool,
    /// Where the first observation came from ("local", "gossip", ...).
    pub source: &'static str,
    /// The marshaled signed observation we broadcast, for rebroadcast.
    pub our_obs_bytes: Option<Vec<u8>>,
    /// The source-chain transaction, for re-observation requests.
    pub tx_hash: Vec<u8>,
    /// The `chain/emitter_hex/sequence` id, when known.
    pub message_id: Option<String>,
    /// The guardian set in effect when this state was created.
    pub guardian_set: Arc<GuardianSet>,
    /// When the state was submitted, for settlement timing.
    pub submitted_at: Option<Instant>,
}

impl ObservationState {
    pub fn new(source: &'static str, tx_hash: Vec<u8>, guardian_set: Arc<GuardianSet>) -> Self {
        let now = Instant::now();
        ObservationState {
            first_observed: now,
            next_retry: now + RETRY_INTERVAL,
            retry_ctr: 0,
            our_observation: None,
            signatures: HashMap::new(),
            submitted: false,
            settled: false,
            source,
            our_obs_bytes: None,
            tx_hash,
            message_id: None,
            guardian_set,
            submitted_at: None,
        }
    }

    /// Signatures that belong to `set`, as `(index, signature)` pairs.
    pub fn signatures_in_set(&self, set: &GuardianSet) -> Vec<(u8, [u8; 65])> {
        let mut sigs: Vec<(u8, [u8; 65])> = self
            .signatures
            .iter()
            .filter_map(|(addr, sig)| set.key_index(addr).map(|idx| (idx, *sig)))
            .collect();
        sigs.sort_by_key(|(idx, _)| *idx);
        sigs
    }

    /// Advances the retry clock: doubles the interval up to the cap.
    pub fn schedule_retry(&mut self, now: Instant) {
        self.retry_ctr += 1;
        let backoff = RETRY_INTERVAL
            .saturating_mul(1 << self.retry_ctr.min(8))
            .min(RETRY_INTERVAL_MAX);
        self.next_retry = now + backoff;
    }

    /// Whether cleanup should drop this state as a quorum miss.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.retry_ctr >= RETRY_LIMIT || now.duration_since(self.first_observed) > QUORUM_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_set() -> Arc<GuardianSet> {
        Arc::new(GuardianSet::new(
            0,
            vec![GuardianAddress([1; 20]), GuardianAddress([2; 20])],
        ))
    }

    #[test]
    fn test_signatures_in_set_sorted_and_filtered() {
        let mut state = ObservationState::new("local", vec![], empty_set());
        state.signatures.insert(GuardianAddress([2; 20]), [9; 65]);
        state.signatures.insert(GuardianAddress([1; 20]), [8; 65]);
        state.signatures.insert(GuardianAddress([7; 20]), [7; 65]); // outsider

        let sigs = state.signatures_in_set(&empty_set());
        assert_eq!(sigs.len(), 2);
        assert_eq!(sigs[0], (0, [8; 65]));
        assert_eq!(sigs[1], (1, [9; 65]));
    }

    #[test]
    fn test_retry_backoff_caps() {
        let mut state = ObservationState::new("gossip", vec![], empty_set());
        let start = Instant::now();
        state.schedule_retry(start);
        assert_eq!(state.retry_ctr, 1);
        assert_eq!(state.next_retry, start + RETRY_INTERVAL_MAX.min(RETRY_INTERVAL * 2));
        for _ in 0..10 {
            state.schedule_retry(start);
        }
        assert_eq!(state.next_retry, start + RETRY_INTERVAL_MAX);
        assert!(state.is_expired(start));
    }

    #[test]
    fn test_last_write_wins() {
        let mut state = ObservationState::new("gossip", vec![], empty_set());
        let addr = GuardianAddress([1; 20]);
        state.signatures.insert(addr, [1; 65]);
        state.signatures.insert(addr, [2; 65]);
        assert_eq!(state.signatures.len(), 1);
        assert_eq!(state.signatures[&addr], [2; 65]);
    }
}
