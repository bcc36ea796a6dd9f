// Path: crates/node/src/backfill.rs
//! RPC backfill client: fetch signed VAAs other guardians have persisted.

use aegis_store::VaaId;
use aegis_types::error::AdminError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-node request timeout.
pub const BACKFILL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct SignedVaaResponse {
    #[serde(rename = "vaaBytes")]
    vaa_bytes: String,
}

/// Fetches one signed VAA from one node. `404` means the node does not have
/// it; 5xx and timeouts are transient and the caller tries the next node.
pub async fn fetch_signed_vaa(
    client: &reqwest::Client,
    node: &str,
    id: &VaaId,
) -> Result<Vec<u8>, AdminError> {
    let url = format!(
        "{}/v1/signed_vaa/{}/{}/{}",
        node.trim_end_matches('/'),
        u16::from(id.emitter_chain),
        id.emitter_address,
        id.sequence
    );
    debug!(target: "backfill", url = %url, "fetching signed VAA");

    let response = client
        .get(&url)
        .timeout(BACKFILL_TIMEOUT)
        .send()
        .await
        .map_err(|e| AdminError::Backfill(format!("{}: {}", url, e)))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(AdminError::Backfill(format!("{}: not found", url)));
    }
    if !response.status().is_success() {
        return Err(AdminError::Backfill(format!(
            "{}: status {}",
            url,
            response.status()
        )));
    }

    let body: SignedVaaResponse = response
        .json()
        .await
        .map_err(|e| AdminError::Backfill(format!("{}: {}", url, e)))?;
    BASE64
        .decode(body.vaa_bytes.as_bytes())
        .map_err(|e| AdminError::Backfill(format!("{}: bad base64: {}", url, e)))
}

/// Tries every node in randomized order until one returns the VAA. Partial
/// failure is expected; only total failure is an error.
pub async fn fetch_signed_vaa_any(
    client: &reqwest::Client,
    nodes: &[String],
    id: &VaaId,
) -> Result<Vec<u8>, AdminError> {
    let mut shuffled: Vec<&String> = nodes.iter().collect();
    shuffled.shuffle(&mut rand::thread_rng());

    let mut last_error = AdminError::Backfill("no backfill nodes configured".into());
    for node in shuffled {
        match fetch_signed_vaa(client, node, id).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                warn!(target: "backfill", node = %node, id = %id, error = %e, "backfill node failed");
                last_error = e;
            }
        }
    }
    Err(last_error)
}
