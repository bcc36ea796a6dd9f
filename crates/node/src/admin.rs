// Path: crates/node/src/admin.rs
//! The admin service: the operations an operator can drive against a running
//! guardian. The RPC socket layer sits outside this crate; these methods are
//! the contract it exposes.

use crate::backfill::{fetch_signed_vaa, fetch_signed_vaa_any};
use aegis_governor::governor::GovernorStatus;
use aegis_governor::ChainGovernor;
use aegis_processor::GuardianSetState;
use aegis_store::{EmitterPrefix, VaaId, VaaStore};
use aegis_types::envelope::{
    GossipOutbound, ObservationRequest, SignedVaaWithQuorum,
};
use aegis_types::error::{AdminError, GovernorError};
use aegis_types::{Address, ChainId, GuardianAddress, GuardianSet, MessagePublication};
use aegis_vaa::vaa::Signature;
use aegis_vaa::{guardian_address_of, GovernancePayload, Vaa};
use k256::ecdsa::SigningKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Per-call cap on `get_and_observe_missing_vaas` ids.
pub const MAX_OBSERVE_MISSING: usize = 25;

/// The chain governance VAAs are emitted from.
pub const GOVERNANCE_CHAIN: ChainId = ChainId::SOLANA;
/// The governance emitter address (right-aligned 0x04).
pub fn governance_emitter() -> Address {
    let mut raw = [0u8; 32];
    raw[31] = 4;
    Address(raw)
}

/// Result of a `find_missing_messages` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMessages {
    pub first: u64,
    pub last: u64,
    /// Message ids still missing after any backfill attempt.
    pub missing: Vec<String>,
}

/// Result of a `get_and_observe_missing_vaas` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveMissingSummary {
    pub already_stored: usize,
    pub fetched: usize,
    pub failed: usize,
}

pub struct AdminService {
    store: VaaStore,
    governor: Option<Arc<ChainGovernor>>,
    gst: Arc<GuardianSetState>,
    signing_key: SigningKey,
    msg_tx: mpsc::Sender<MessagePublication>,
    signed_vaa_tx: mpsc::Sender<SignedVaaWithQuorum>,
    gossip_tx: mpsc::Sender<GossipOutbound>,
    rpcs: HashMap<String, String>,
    /// Read-through guardian-set cache, populated from the processor's set
    /// state before use. A miss is an error, never a null dereference.
    set_cache: Mutex<HashMap<u32, Arc<GuardianSet>>>,
    client: reqwest::Client,
}

impl AdminService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: VaaStore,
        governor: Option<Arc<ChainGovernor>>,
        gst: Arc<GuardianSetState>,
        signing_key: SigningKey,
        msg_tx: mpsc::Sender<MessagePublication>,
        signed_vaa_tx: mpsc::Sender<SignedVaaWithQuorum>,
        gossip_tx: mpsc::Sender<GossipOutbound>,
        rpcs: HashMap<String, String>,
    ) -> Self {
        AdminService {
            store,
            governor,
            gst,
            signing_key,
            msg_tx,
            signed_vaa_tx,
            gossip_tx,
            rpcs,
            set_cache: Mutex::new(HashMap::new()),
            client: reqwest::Client::new(),
        }
    }

    /// Synthesizes a governance message publication and hands it to the
    /// processor, which signs and aggregates it like any watcher message.
    /// Returns the injected message id.
    pub fn inject_governance_vaa(
        &self,
        sequence: u64,
        nonce: u32,
        payload: &GovernancePayload,
    ) -> Result<String, AdminError> {
        let msg = MessagePublication {
            tx_hash: vec![0u8; 32],
            timestamp: unix_now() as u32,
            nonce,
            sequence,
            consistency_level: 32,
            emitter_chain: GOVERNANCE_CHAIN,
            emitter_address: governance_emitter(),
            payload: payload.serialize(),
            unreliable: false,
        };
        let id = msg.message_id();
        info!(target: "admin", id = %id, "injecting governance VAA");

        // Injection failures surface to the RPC client; governance must not
        // be silently dropped.
        self.msg_tx
            .try_send(msg)
            .map_err(|_| AdminError::ChannelFull("message publication"))?;
        Ok(id)
    }

    /// Scans one emitter for sequence gaps, optionally backfilling each
    /// missing VAA from the given peer endpoints.
    pub async fn find_missing_messages(
        &self,
        chain: ChainId,
        emitter_hex: &str,
        backfill: bool,
        nodes: &[String],
    ) -> Result<MissingMessages, AdminError> {
        let address: Address = emitter_hex
            .parse()
            .map_err(|_| AdminError::InvalidArgument(format!("bad emitter {:?}", emitter_hex)))?;
        let emitter = EmitterPrefix { chain, address };
        let gap = self.store.find_emitter_sequence_gap(&emitter)?;

        let mut missing = Vec::new();
        for sequence in gap.missing {
            let id = VaaId {
                emitter_chain: chain,
                emitter_address: address,
                sequence,
            };
            if backfill {
                match fetch_signed_vaa_any(&self.client, nodes, &id).await {
                    Ok(vaa_bytes) => {
                        self.signed_vaa_tx
                            .send(SignedVaaWithQuorum { vaa_bytes })
                            .await
                            .map_err(|_| AdminError::ChannelFull("signed vaa"))?;
                        continue;
                    }
                    Err(e) => {
                        warn!(target: "admin", id = %id, error = %e, "backfill failed");
                    }
                }
            }
            missing.push(id.to_string());
        }

        Ok(MissingMessages {
            first: gap.first,
            last: gap.last,
            missing,
        })
    }

    /// Asks the network's watchers to re-observe a transaction.
    pub fn send_observation_request(
        &self,
        chain_id: ChainId,
        tx_hash: Vec<u8>,
    ) -> Result<(), AdminError> {
        self.gossip_tx
            .try_send(GossipOutbound::ObservationRequest(ObservationRequest {
                chain_id,
                tx_hash,
            }))
            .map_err(|_| AdminError::ChannelFull("gossip"))
    }

    pub fn governor_status(&self) -> Result<GovernorStatus, AdminError> {
        Ok(self.governor()?.status())
    }

    pub fn governor_reload(&self) -> Result<(), AdminError> {
        Ok(self.governor()?.reload()?)
    }

    pub fn governor_drop_pending(&self, vaa_id: &str) -> Result<(), AdminError> {
        Ok(self.governor()?.drop_pending(vaa_id)?)
    }

    pub fn governor_release_pending(&self, vaa_id: &str) -> Result<(), AdminError> {
        Ok(self.governor()?.release_pending(vaa_id)?)
    }

    pub fn governor_reset_release_timer(&self, vaa_id: &str) -> Result<(), AdminError> {
        Ok(self.governor()?.reset_release_timer(vaa_id)?)
    }

    /// Re-signs an existing VAA under a new guardian set: signatures from
    /// guardians present in both sets are re-indexed and kept, ours is
    /// added, and the header names the new set.
    pub fn sign_existing_vaa(
        &self,
        vaa_bytes: &[u8],
        new_guardian_set_index: u32,
        new_addresses: Vec<GuardianAddress>,
    ) -> Result<Vec<u8>, AdminError> {
        let vaa = Vaa::decode(vaa_bytes)?;
        let old_set = self.cached_guardian_set(vaa.guardian_set_index)?;
        vaa.verify(&old_set)?;

        if new_guardian_set_index <= old_set.index {
            return Err(AdminError::InvalidArgument(format!(
                "new set index {} does not supersede {}",
                new_guardian_set_index, old_set.index
            )));
        }

        let new_set = GuardianSet::new(new_guardian_set_index, new_addresses);
        let our_address = guardian_address_of(self.signing_key.verifying_key());
        let Some(our_index) = new_set.key_index(&our_address) else {
            return Err(AdminError::InvalidArgument(format!(
                "signing key {} is not in the new guardian set",
                our_address
            )));
        };

        // Keep signatures whose guardians carried over, re-indexed.
        let mut new_vaa = vaa.clone();
        new_vaa.guardian_set_index = new_guardian_set_index;
        new_vaa.signatures = vaa
            .signatures
            .iter()
            .filter_map(|sig| {
                let addr = old_set.addresses.get(usize::from(sig.index))?;
                let index = new_set.key_index(addr)?;
                Some(Signature {
                    index,
                    signature: sig.signature,
                })
            })
            .collect();

        if new_vaa.signatures.iter().any(|s| s.index == our_index) {
            return Err(AdminError::InvalidArgument(
                "VAA already carries our signature".into(),
            ));
        }

        new_vaa.add_signature(&self.signing_key, our_index)?;
        info!(
            target: "admin",
            id = %new_vaa.message_id(),
            new_set = new_guardian_set_index,
            signatures = new_vaa.signatures.len(),
            "re-signed VAA under new guardian set"
        );
        Ok(new_vaa.encode())
    }

    /// The configured public RPC endpoints, verbatim.
    pub fn dump_rpcs(&self) -> &HashMap<String, String> {
        &self.rpcs
    }

    /// Fetches the list of VAAs a trusted API believes we are missing, then
    /// fetches and injects each one we do not have. At most
    /// [`MAX_OBSERVE_MISSING`] ids are accepted per call.
    pub async fn get_and_observe_missing_vaas(
        &self,
        url: &str,
        api_key: &str,
    ) -> Result<ObserveMissingSummary, AdminError> {
        #[derive(Deserialize)]
        struct MissingList(Vec<String>);

        let list_url = format!("{}/v1/missing_vaas", url.trim_end_matches('/'));
        let response = self
            .client
            .get(&list_url)
            .header("x-api-key", api_key)
            .send()
            .await
            .map_err(|e| AdminError::Backfill(format!("{}: {}", list_url, e)))?;
        if !response.status().is_success() {
            return Err(AdminError::Backfill(format!(
                "{}: status {}",
                list_url,
                response.status()
            )));
        }
        let MissingList(ids) = response
            .json()
            .await
            .map_err(|e| AdminError::Backfill(format!("{}: {}", list_url, e)))?;

        self.observe_missing_ids(url, ids).await
    }

    /// The fetch-and-inject half of `get_and_observe_missing_vaas`, split
    /// out so the id handling is testable without a network.
    async fn observe_missing_ids(
        &self,
        url: &str,
        ids: Vec<String>,
    ) -> Result<ObserveMissingSummary, AdminError> {
        if ids.len() > MAX_OBSERVE_MISSING {
            return Err(AdminError::TooManyVaaIds {
                got: ids.len(),
                max: MAX_OBSERVE_MISSING,
            });
        }

        let mut summary = ObserveMissingSummary::default();
        for raw in ids {
            // Ids arrive as chain/emitter_hex/sequence; the emitter is
            // hex-decoded, never taken as raw bytes.
            let id: VaaId = raw
                .parse()
                .map_err(|_| AdminError::InvalidArgument(format!("bad VAA id {:?}", raw)))?;
            if self.store.has_vaa(&id)? {
                summary.already_stored += 1;
                continue;
            }
            match fetch_signed_vaa(&self.client, url, &id).await {
                Ok(vaa_bytes) => {
                    self.signed_vaa_tx
                        .send(SignedVaaWithQuorum { vaa_bytes })
                        .await
                        .map_err(|_| AdminError::ChannelFull("signed vaa"))?;
                    summary.fetched += 1;
                }
                Err(e) => {
                    warn!(target: "admin", id = %id, error = %e, "could not fetch missing VAA");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    fn governor(&self) -> Result<&ChainGovernor, AdminError> {
        self.governor
            .as_deref()
            .ok_or(AdminError::NotEnabled("governor"))
    }

    /// Read-through lookup of a guardian set by index.
    fn cached_guardian_set(&self, index: u32) -> Result<Arc<GuardianSet>, AdminError> {
        let mut cache = self
            .set_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = cache.get(&index) {
            return Ok(set.clone());
        }
        let set = self
            .gst
            .by_index(index)
            .ok_or(AdminError::UnknownGuardianSet(index))?;
        cache.insert(index, set.clone());
        Ok(set)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
