// Path: crates/processor/src/processor.rs
//! The aggregation event loop.

use crate::gst::{GuardianSetState, GuardianSigner};
use crate::metrics::{gossip_metrics, metrics};
use crate::state::{ObservationState, SETTLEMENT_TIMEOUT};
use aegis_governor::ChainGovernor;
use aegis_store::VaaStore;
use aegis_types::codec;
use aegis_types::envelope::{
    GossipOutbound, ObservationRequest, SignedObservation, SignedVaaWithQuorum,
};
use aegis_types::error::ProcessorError;
use aegis_types::{ChainId, GuardianSet, MessagePublication};
use aegis_vaa::vaa::{recover_signer, Signature};
use aegis_vaa::{calculate_quorum, Vaa};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// How often the cleanup pass runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);
/// How often pending governor releases are drained.
pub const GOVERNOR_INTERVAL: Duration = Duration::from_secs(60);

/// The inbound channel ends the loop consumes.
pub struct ProcessorChannels {
    pub msg_rx: mpsc::Receiver<MessagePublication>,
    pub obs_rx: mpsc::Receiver<SignedObservation>,
    pub signed_vaa_rx: mpsc::Receiver<SignedVaaWithQuorum>,
    pub set_rx: mpsc::Receiver<GuardianSet>,
}

/// The aggregation processor. Owns the observation map exclusively; all
/// mutation happens on the loop in [`Processor::run`] (or through the
/// handler methods tests drive directly).
pub struct Processor {
    gossip_tx: mpsc::Sender<GossipOutbound>,
    store: VaaStore,
    governor: Option<Arc<ChainGovernor>>,
    gst: Arc<GuardianSetState>,
    signer: GuardianSigner,
    states: HashMap<String, ObservationState>,
}

impl Processor {
    pub fn new(
        gossip_tx: mpsc::Sender<GossipOutbound>,
        store: VaaStore,
        governor: Option<Arc<ChainGovernor>>,
        gst: Arc<GuardianSetState>,
        signer: GuardianSigner,
    ) -> Self {
        Processor {
            gossip_tx,
            store,
            governor,
            gst,
            signer,
            states: HashMap::new(),
        }
    }

    /// Runs the event loop until shutdown is signaled or a fatal error
    /// (storage failure, closed input) occurs.
    pub async fn run(
        mut self,
        channels: ProcessorChannels,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ProcessorError> {
        let ProcessorChannels {
            mut msg_rx,
            mut obs_rx,
            mut signed_vaa_rx,
            mut set_rx,
        } = channels;

        let mut cleanup = interval(CLEANUP_INTERVAL);
        let mut governor_tick = interval(GOVERNOR_INTERVAL);

        info!(target: "processor", guardian = %self.signer.address(), "aggregation loop started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(target: "processor", "shutdown requested");
                        return Ok(());
                    }
                }
                msg = msg_rx.recv() => match msg {
                    Some(msg) => self.handle_message_publication(msg, "local")?,
                    None => return Err(ProcessorError::ChannelClosed("message publication")),
                },
                obs = obs_rx.recv() => match obs {
                    Some(obs) => self.handle_signed_observation(obs)?,
                    None => return Err(ProcessorError::ChannelClosed("signed observation")),
                },
                vaa = signed_vaa_rx.recv() => match vaa {
                    Some(vaa) => self.handle_signed_vaa_with_quorum(vaa)?,
                    None => return Err(ProcessorError::ChannelClosed("signed vaa")),
                },
                set = set_rx.recv() => match set {
                    Some(set) => self.handle_guardian_set_update(set),
                    None => return Err(ProcessorError::ChannelClosed("guardian set")),
                },
                _ = cleanup.tick() => self.handle_cleanup(),
                _ = governor_tick.tick() => self.handle_governor_tick()?,
            }
        }
    }

    /// A watcher (or injected) message: gate through the governor, then sign
    /// and broadcast our observation.
    pub fn handle_message_publication(
        &mut self,
        msg: MessagePublication,
        source: &'static str,
    ) -> Result<(), ProcessorError> {
        if let Some(governor) = &self.governor {
            if !governor.process_msg(&msg) {
                // Held as pending. Normal flow control, not an error.
                debug!(target: "processor", id = %msg.message_id(), "message deferred by governor");
                return Ok(());
            }
        }
        self.publish_message(msg, source)
    }

    /// Signs `msg`, broadcasts the observation and records it in the state
    /// map. Skips the governor: callers gate first.
    fn publish_message(
        &mut self,
        msg: MessagePublication,
        source: &'static str,
    ) -> Result<(), ProcessorError> {
        let Some(set) = self.gst.current() else {
            warn!(target: "processor", id = %msg.message_id(), "no guardian set yet, dropping message");
            return Ok(());
        };

        let vaa = Vaa::from_publication(&msg, set.index);
        let digest = vaa.signing_digest();
        let signature = self.signer.sign(&digest)?;

        let observation = SignedObservation {
            addr: self.signer.address(),
            hash: digest,
            signature,
            tx_hash: msg.tx_hash.clone(),
            message_id: msg.message_id(),
        };
        let obs_bytes = codec::to_bytes_canonical(&observation);
        self.broadcast(GossipOutbound::Observation(observation), "observation");
        metrics().inc_messages_observed(source);

        let key = hex::encode(digest);
        debug!(target: "processor", id = %msg.message_id(), digest = %key, source, "observed message");

        let our_address = self.signer.address();
        let state = self
            .states
            .entry(key.clone())
            .or_insert_with(|| ObservationState::new(source, msg.tx_hash.clone(), set.clone()));
        state.message_id = Some(msg.message_id());
        state.our_observation = Some(msg);
        state.our_obs_bytes = Some(obs_bytes);
        state.signatures.insert(our_address, signature);

        self.check_quorum(&key)
    }

    /// A peer's signed observation from gossip.
    pub fn handle_signed_observation(
        &mut self,
        obs: SignedObservation,
    ) -> Result<(), ProcessorError> {
        metrics().inc_observations_received();

        let recovered = match recover_signer(&obs.hash, &obs.signature) {
            Ok(addr) => addr,
            Err(e) => {
                warn!(target: "processor", error = %e, "dropping observation with unrecoverable signature");
                return Ok(());
            }
        };
        if recovered != obs.addr {
            warn!(
                target: "processor",
                claimed = %obs.addr,
                recovered = %recovered,
                "dropping observation with mismatched signer"
            );
            return Ok(());
        }
        if !self.gst.is_valid_signer(&recovered, unix_now()) {
            metrics().inc_observations_unknown_signer();
            debug!(target: "processor", signer = %recovered, "observation from address in no valid set");
            return Ok(());
        }
        let Some(set) = self.gst.current() else {
            return Ok(());
        };

        let key = hex::encode(obs.hash);
        let state = self
            .states
            .entry(key.clone())
            .or_insert_with(|| ObservationState::new("gossip", obs.tx_hash.clone(), set));
        if state.message_id.is_none() {
            state.message_id = Some(obs.message_id.clone());
        }
        // Last write wins: one guardian contributes at most one signature
        // per digest in a quorum round.
        state.signatures.insert(recovered, obs.signature);

        self.check_quorum(&key)
    }

    /// Counts current-set signatures and, at quorum, assembles, persists and
    /// rebroadcasts the VAA. Idempotent per digest via the submitted flag.
    fn check_quorum(&mut self, key: &str) -> Result<(), ProcessorError> {
        let Some(set) = self.gst.current() else {
            return Ok(());
        };

        let (vaa, latency, unreliable) = {
            let Some(state) = self.states.get_mut(key) else {
                return Ok(());
            };
            if state.submitted {
                return Ok(());
            }

            let sigs = state.signatures_in_set(&set);
            if sigs.len() < calculate_quorum(set.len()) {
                return Ok(());
            }
            let Some(msg) = state.our_observation.clone() else {
                // Quorum of peers but no local observation; the retry timer
                // will ask the watchers to re-observe.
                return Ok(());
            };

            let mut vaa = Vaa::from_publication(&msg, set.index);
            vaa.signatures = sigs
                .into_iter()
                .map(|(index, signature)| Signature { index, signature })
                .collect();
            if let Err(e) = vaa.verify(&set) {
                error!(target: "processor", digest = key, error = %e, "assembled VAA failed verification");
                return Ok(());
            }

            state.submitted = true;
            state.submitted_at = Some(Instant::now());
            state.guardian_set = set.clone();
            (vaa, state.first_observed.elapsed(), msg.unreliable)
        };

        if !unreliable {
            // A storage failure here is fatal: without the persisted VAA the
            // node cannot serve backfill for a sequence it attested to.
            self.store.store_signed_vaa(&vaa)?;
        }

        info!(
            target: "processor",
            id = %vaa.message_id(),
            digest = key,
            signatures = vaa.signatures.len(),
            "quorum reached, broadcasting signed VAA"
        );
        self.broadcast(
            GossipOutbound::VaaWithQuorum(SignedVaaWithQuorum {
                vaa_bytes: vaa.encode(),
            }),
            "signed_vaa",
        );
        metrics().inc_vaas_submitted();
        metrics().observe_quorum_latency(latency.as_secs_f64());
        Ok(())
    }

    /// A fully-signed VAA from gossip or RPC backfill.
    pub fn handle_signed_vaa_with_quorum(
        &mut self,
        envelope: SignedVaaWithQuorum,
    ) -> Result<(), ProcessorError> {
        let vaa = match Vaa::decode(&envelope.vaa_bytes) {
            Ok(vaa) => vaa,
            Err(e) => {
                warn!(target: "processor", error = %e, "dropping malformed signed VAA");
                return Ok(());
            }
        };
        let Some(set) = self.gst.by_index(vaa.guardian_set_index) else {
            debug!(
                target: "processor",
                set_index = vaa.guardian_set_index,
                "signed VAA references a set we do not track"
            );
            return Ok(());
        };
        if let Err(e) = vaa.verify(&set) {
            warn!(target: "processor", id = %vaa.message_id(), error = %e, "dropping invalid signed VAA");
            return Ok(());
        }

        self.store.store_signed_vaa(&vaa)?;
        if let Some(state) = self.states.get_mut(&vaa.hex_digest()) {
            state.submitted = true;
            if state.submitted_at.is_none() {
                state.submitted_at = Some(Instant::now());
            }
        }
        debug!(target: "processor", id = %vaa.message_id(), "stored signed VAA with quorum");
        Ok(())
    }

    /// Installs a new guardian set.
    pub fn handle_guardian_set_update(&mut self, set: GuardianSet) {
        info!(target: "processor", index = set.index, guardians = set.len(), "guardian set update");
        self.gst.update(set, unix_now());
    }

    /// The periodic pass: settle submitted states, drop quorum misses, and
    /// emit re-observation requests for digests we never saw locally.
    pub fn handle_cleanup(&mut self) {
        let now = Instant::now();
        let mut doomed: Vec<String> = Vec::new();
        let mut reobservations: Vec<(ChainId, Vec<u8>)> = Vec::new();

        for (key, state) in self.states.iter_mut() {
            if state.submitted {
                let done = state
                    .submitted_at
                    .is_some_and(|at| now.duration_since(at) > SETTLEMENT_TIMEOUT);
                if done {
                    state.settled = true;
                    doomed.push(key.clone());
                }
            } else if state.is_expired(now) {
                state.settled = true;
                metrics().inc_quorum_misses();
                warn!(
                    target: "processor",
                    digest = %key,
                    id = state.message_id.as_deref().unwrap_or("unknown"),
                    signatures = state.signatures.len(),
                    retries = state.retry_ctr,
                    "dropping observation that never reached quorum"
                );
                doomed.push(key.clone());
            } else if state.our_observation.is_none() && now >= state.next_retry {
                if let Some(chain) = state.message_id.as_deref().and_then(chain_of_message_id) {
                    reobservations.push((chain, state.tx_hash.clone()));
                }
                state.schedule_retry(now);
            }
        }

        for key in doomed {
            self.states.remove(&key);
        }
        for (chain_id, tx_hash) in reobservations {
            debug!(target: "processor", chain = %chain_id, "requesting re-observation");
            self.broadcast(
                GossipOutbound::ObservationRequest(ObservationRequest { chain_id, tx_hash }),
                "observation_request",
            );
            metrics().inc_reobservation_requests();
        }
        metrics().set_inflight_observations(self.states.len() as u64);
    }

    /// Drains governor releases into the normal publication path.
    pub fn handle_governor_tick(&mut self) -> Result<(), ProcessorError> {
        let Some(governor) = self.governor.clone() else {
            return Ok(());
        };
        for msg in governor.check_pending() {
            // The governor must never release a message outside its
            // jurisdiction; that would mean its bookkeeping is corrupt.
            assert!(
                governor.is_governed_msg(&msg),
                "governor released ungoverned message {}",
                msg.message_id()
            );
            self.publish_message(msg, "governor")?;
        }
        Ok(())
    }

    /// Hands an envelope to the gossip transport. Never blocks the loop: a
    /// full channel drops the envelope and counts it.
    fn broadcast(&self, envelope: GossipOutbound, kind: &'static str) {
        use mpsc::error::TrySendError;
        match self.gossip_tx.try_send(envelope) {
            Ok(()) => gossip_metrics().inc_published(kind),
            Err(TrySendError::Full(_)) => {
                warn!(target: "processor", kind, "gossip channel full, dropping envelope");
                gossip_metrics().inc_publish_dropped(kind);
            }
            Err(TrySendError::Closed(_)) => {
                warn!(target: "processor", kind, "gossip channel closed");
            }
        }
    }

    /// Number of in-flight observation states (test and status surface).
    pub fn inflight(&self) -> usize {
        self.states.len()
    }
}

fn chain_of_message_id(message_id: &str) -> Option<ChainId> {
    message_id
        .split('/')
        .next()
        .and_then(|raw| raw.parse::<u16>().ok())
        .map(ChainId)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
