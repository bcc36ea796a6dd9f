// Path: crates/node/src/bin/aegisd.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

use aegis_governor::ChainGovernor;
use aegis_node::{admin::AdminService, config, keys, platform};
use aegis_processor::{GuardianSetState, GuardianSigner, Processor, ProcessorChannels};
use aegis_store::VaaStore;
use aegis_types::GuardianSet;
use aegis_vaa::guardian_address_of;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing FIRST.
    aegis_telemetry::init::init_tracing()?;

    // Install the Prometheus backend and seed every domain crate's sink
    // cell; a crate whose cell stays unset reports into the no-op sink.
    let metrics_sink = aegis_telemetry::prometheus::install()?;
    aegis_processor::metrics::SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("processor metrics sink already set"))?;
    aegis_processor::metrics::GOSSIP_SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("gossip metrics sink already set"))?;
    aegis_governor::metrics::SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("governor metrics sink already set"))?;
    aegis_store::metrics::SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("store metrics sink already set"))?;

    let opts = config::NodeOpts::parse();
    let cfg = config::NodeConfig::load(&opts)?;
    tracing::info!(
        target: "node",
        env = %cfg.environment,
        config_dir = %opts.config_dir.display(),
        "startup"
    );

    platform::harden(cfg.environment)?;

    // 2. Spawn the telemetry server.
    let telemetry_addr = cfg
        .telemetry_addr
        .parse()
        .context("telemetry_addr is not a socket address")?;
    tokio::spawn(aegis_telemetry::http::run_server(telemetry_addr));

    // 3. Keys.
    let guardian_key = keys::load_guardian_key(&cfg.guardian_key_path, cfg.environment)?;
    let node_key = keys::load_node_key(&cfg.node_key_path, cfg.environment)?;
    let signer = GuardianSigner::new(guardian_key.clone());
    tracing::info!(
        target: "node",
        guardian = %signer.address(),
        peer_id = %node_key.public().to_peer_id(),
        "identity loaded"
    );

    // 4. Persistent store.
    let store = VaaStore::open(opts.config_dir.join(&cfg.db_path))?;

    // 5. Bootstrap guardian set. Dev nodes without one run solo.
    let initial_set = match cfg.bootstrap_guardians()? {
        Some((index, addresses)) => GuardianSet::new(index, addresses),
        None => {
            tracing::warn!(target: "node", "no guardian set configured, running as a single dev guardian");
            GuardianSet::new(0, vec![guardian_address_of(guardian_key.verifying_key())])
        }
    };
    let gst = Arc::new(GuardianSetState::new(Some(initial_set)));

    // 6. Governor.
    let governor = if cfg.governor.enabled {
        let path = cfg
            .governor_config_path(&opts.config_dir)
            .ok_or_else(|| anyhow!("governor enabled without a config path"))?;
        Some(Arc::new(ChainGovernor::from_file(path)?))
    } else {
        None
    };

    // 7. Channels. Watchers and the gossip transport attach to these ends.
    let (msg_tx, msg_rx) = mpsc::channel(1024);
    let (_obs_tx, obs_rx) = mpsc::channel(1024);
    let (signed_vaa_tx, signed_vaa_rx) = mpsc::channel(256);
    let (_set_tx, set_rx) = mpsc::channel(8);
    let (gossip_tx, mut gossip_rx) = mpsc::channel(1024);

    // Until a transport is attached, outbound gossip is drained so the
    // processor never stalls on a full channel.
    tokio::spawn(async move {
        while let Some(envelope) = gossip_rx.recv().await {
            tracing::debug!(target: "gossip", ?envelope, "outbound envelope (no transport attached)");
        }
    });

    // 8. The admin service contract. The RPC socket layer binds this to
    //    cfg.admin_socket.
    let _admin = AdminService::new(
        store.clone(),
        governor.clone(),
        gst.clone(),
        guardian_key,
        msg_tx.clone(),
        signed_vaa_tx.clone(),
        gossip_tx.clone(),
        cfg.rpcs.clone(),
    );
    tracing::info!(target: "node", socket = %cfg.admin_socket, "admin service ready");

    // 9. The aggregation processor.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = Processor::new(gossip_tx, store, governor, gst, signer);
    let channels = ProcessorChannels {
        msg_rx,
        obs_rx,
        signed_vaa_rx,
        set_rx,
    };
    let processor_handle = tokio::spawn(processor.run(channels, shutdown_rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "node", event = "shutdown", reason = "ctrl-c");
            let _ = shutdown_tx.send(true);
        }
        result = processor_handle => {
            // A processor exit without shutdown is fatal; the supervisor
            // restarts the whole process.
            match result {
                Ok(Ok(())) => return Err(anyhow!("processor loop exited unexpectedly")),
                Ok(Err(e)) => return Err(anyhow!("processor failed: {}", e)),
                Err(e) => return Err(anyhow!("processor task panicked: {}", e)),
            }
        }
    }

    tracing::info!(target: "node", event = "shutdown", reason = "complete");
    Ok(())
}
