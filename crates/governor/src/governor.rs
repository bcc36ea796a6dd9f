// Path: crates/governor/src/governor.rs
//! The governor decision engine and its runtime state.

use crate::config::{ChainLimits, GovernorConfig};
use crate::metrics::metrics;
use crate::transfer::{parse_token_transfer, usd_cents};
use aegis_types::error::GovernorError;
use aegis_types::{ChainId, MessagePublication};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// One released transfer inside the rolling window.
#[derive(Debug, Clone)]
struct WindowEntry {
    released_at: u64,
    value_cents: u64,
}

/// One held message.
#[derive(Debug, Clone)]
struct PendingEntry {
    msg: MessagePublication,
    value_cents: u64,
    enqueued_at: u64,
    release_at: u64,
    reason: &'static str,
}

#[derive(Debug, Default)]
struct Inner {
    config: GovernorConfig,
    /// Released notional per chain, trimmed to the chain's day length.
    window: HashMap<ChainId, Vec<WindowEntry>>,
    /// Held messages, oldest first.
    pending: VecDeque<PendingEntry>,
}

/// Operator-facing snapshot of one chain's state.
#[derive(Debug, Clone, Serialize)]
pub struct ChainStatus {
    pub chain_id: u16,
    pub daily_limit_cents: u64,
    pub window_used_cents: u64,
    pub remaining_cents: u64,
}

/// Operator-facing snapshot of one pending message.
#[derive(Debug, Clone, Serialize)]
pub struct PendingStatus {
    pub vaa_id: String,
    pub value_cents: u64,
    pub enqueued_at: u64,
    pub release_at: u64,
    pub reason: String,
}

/// The full `status()` report.
#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    pub chains: Vec<ChainStatus>,
    pub pending: Vec<PendingStatus>,
}

/// The chain governor. All state lives behind one lock; the public API is
/// the only mutation surface.
pub struct ChainGovernor {
    inner: Mutex<Inner>,
    config_path: Option<PathBuf>,
}

impl ChainGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        ChainGovernor {
            inner: Mutex::new(Inner {
                config,
                ..Inner::default()
            }),
            config_path: None,
        }
    }

    /// Builds a governor that can `reload()` from its file.
    pub fn from_file(path: PathBuf) -> Result<Self, GovernorError> {
        let config = GovernorConfig::from_file(&path)?;
        Ok(ChainGovernor {
            inner: Mutex::new(Inner {
                config,
                ..Inner::default()
            }),
            config_path: Some(path),
        })
    }

    /// Re-reads the chain/emitter/token tables. A malformed file leaves the
    /// running configuration untouched.
    pub fn reload(&self) -> Result<(), GovernorError> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| GovernorError::Config("governor has no config file".into()))?;
        let config = GovernorConfig::from_file(path)?;
        let mut inner = self.lock();
        inner.config = config;
        info!(target: "governor", "configuration reloaded");
        Ok(())
    }

    /// Whether `msg` falls under governor jurisdiction: a governed emitter,
    /// a parseable transfer, and a token in the registry.
    pub fn is_governed_msg(&self, msg: &MessagePublication) -> bool {
        self.lock().governed_value(msg).is_some()
    }

    /// The admit/hold decision. `true` means publish now; `false` means the
    /// message was enqueued as pending. Ungoverned messages pass through.
    pub fn process_msg(&self, msg: &MessagePublication) -> bool {
        self.process_msg_at(msg, unix_now())
    }

    /// Clock-explicit form of [`Self::process_msg`].
    pub fn process_msg_at(&self, msg: &MessagePublication, now: u64) -> bool {
        let mut inner = self.lock();

        let Some(value_cents) = inner.governed_value(msg) else {
            return true;
        };
        // Jurisdiction was established above, so the limits exist.
        let Some(limits) = inner.config.chains.get(&msg.emitter_chain).copied() else {
            return true;
        };

        if value_cents >= limits.big_transaction_cents {
            inner.enqueue(msg, value_cents, now, now + limits.day_length_secs, "big_transaction");
            return false;
        }

        let used = inner.window_usage(msg.emitter_chain, limits, now);
        if used.saturating_add(value_cents) > limits.daily_limit_cents {
            inner.enqueue(msg, value_cents, now, now + limits.day_length_secs, "daily_limit");
            return false;
        }

        inner.charge(msg.emitter_chain, value_cents, now);
        true
    }

    /// Pending messages whose release is now due, in enqueue order. Entries
    /// released here are charged to the window unless their timer expired.
    pub fn check_pending(&self) -> Vec<MessagePublication> {
        self.check_pending_at(unix_now())
    }

    /// Clock-explicit form of [`Self::check_pending`].
    pub fn check_pending_at(&self, now: u64) -> Vec<MessagePublication> {
        let mut inner = self.lock();
        let mut released = Vec::new();

        let mut idx = 0;
        while idx < inner.pending.len() {
            let Some(entry) = inner.pending.get(idx).cloned() else {
                break;
            };
            let chain = entry.msg.emitter_chain;
            let Some(limits) = inner.config.chains.get(&chain).copied() else {
                idx += 1;
                continue;
            };

            if now >= entry.release_at {
                // The delay served its purpose; the window moved on without
                // this transfer, so it is not charged.
                inner.pending.remove(idx);
                metrics().inc_released();
                info!(target: "governor", vaa_id = %entry.msg.message_id(), reason = "timer", "releasing pending VAA");
                released.push(entry.msg);
                continue;
            }

            let used = inner.window_usage(chain, limits, now);
            if entry.value_cents < limits.big_transaction_cents
                && used.saturating_add(entry.value_cents) <= limits.daily_limit_cents
            {
                inner.charge(chain, entry.value_cents, now);
                inner.pending.remove(idx);
                metrics().inc_released();
                info!(target: "governor", vaa_id = %entry.msg.message_id(), reason = "capacity", "releasing pending VAA");
                released.push(entry.msg);
                continue;
            }

            idx += 1;
        }

        metrics().set_pending(inner.pending.len() as u64);
        released
    }

    /// Drops a held message without publishing it.
    pub fn drop_pending(&self, vaa_id: &str) -> Result<(), GovernorError> {
        let mut inner = self.lock();
        let entry = inner.take_pending(vaa_id)?;
        metrics().inc_dropped();
        metrics().set_pending(inner.pending.len() as u64);
        warn!(target: "governor", vaa_id = %entry.msg.message_id(), "pending VAA dropped by operator");
        Ok(())
    }

    /// Expires a held message's release timer, so the next `check_pending`
    /// pass publishes it without charging the window.
    pub fn release_pending(&self, vaa_id: &str) -> Result<(), GovernorError> {
        let mut inner = self.lock();
        for entry in inner.pending.iter_mut() {
            if entry.msg.message_id() == vaa_id {
                entry.release_at = 0;
                warn!(target: "governor", vaa_id, "pending VAA released by operator");
                return Ok(());
            }
        }
        Err(GovernorError::UnknownPending(vaa_id.to_string()))
    }

    /// Restarts a held message's release countdown from now.
    pub fn reset_release_timer(&self, vaa_id: &str) -> Result<(), GovernorError> {
        self.reset_release_timer_at(vaa_id, unix_now())
    }

    /// Clock-explicit form of [`Self::reset_release_timer`].
    pub fn reset_release_timer_at(&self, vaa_id: &str, now: u64) -> Result<(), GovernorError> {
        let mut inner = self.lock();
        let day_lengths: HashMap<ChainId, u64> = inner
            .config
            .chains
            .iter()
            .map(|(chain, limits)| (*chain, limits.day_length_secs))
            .collect();
        for entry in inner.pending.iter_mut() {
            if entry.msg.message_id() == vaa_id {
                let day = day_lengths
                    .get(&entry.msg.emitter_chain)
                    .copied()
                    .unwrap_or(86_400);
                entry.release_at = now + day;
                info!(target: "governor", vaa_id, release_at = entry.release_at, "release timer reset");
                return Ok(());
            }
        }
        Err(GovernorError::UnknownPending(vaa_id.to_string()))
    }

    /// A point-in-time report for the admin surface.
    pub fn status(&self) -> GovernorStatus {
        self.status_at(unix_now())
    }

    /// Clock-explicit form of [`Self::status`].
    pub fn status_at(&self, now: u64) -> GovernorStatus {
        let mut inner = self.lock();

        let mut chains: Vec<ChainStatus> = Vec::new();
        let chain_limits: Vec<(ChainId, ChainLimits)> = inner
            .config
            .chains
            .iter()
            .map(|(c, l)| (*c, *l))
            .collect();
        for (chain, limits) in chain_limits {
            let used = inner.window_usage(chain, limits, now);
            chains.push(ChainStatus {
                chain_id: chain.into(),
                daily_limit_cents: limits.daily_limit_cents,
                window_used_cents: used,
                remaining_cents: limits.daily_limit_cents.saturating_sub(used),
            });
        }
        chains.sort_by_key(|c| c.chain_id);

        let pending = inner
            .pending
            .iter()
            .map(|entry| PendingStatus {
                vaa_id: entry.msg.message_id(),
                value_cents: entry.value_cents,
                enqueued_at: entry.enqueued_at,
                release_at: entry.release_at,
                reason: entry.reason.to_string(),
            })
            .collect();

        GovernorStatus { chains, pending }
    }

    /// Message ids currently held, oldest first.
    pub fn pending_ids(&self) -> Vec<String> {
        self.lock()
            .pending
            .iter()
            .map(|e| e.msg.message_id())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    /// The USD value of `msg` in cents, or `None` when it is not governed.
    fn governed_value(&self, msg: &MessagePublication) -> Option<u64> {
        let emitter = self.config.emitters.get(&msg.emitter_chain)?;
        if *emitter != msg.emitter_address || !self.config.chains.contains_key(&msg.emitter_chain) {
            return None;
        }
        let transfer = parse_token_transfer(&msg.payload)?;
        let token = self
            .config
            .tokens
            .get(&(transfer.token_chain, transfer.token_address))?;
        Some(usd_cents(transfer.amount, token.decimals, token.price_cents))
    }

    fn enqueue(
        &mut self,
        msg: &MessagePublication,
        value_cents: u64,
        now: u64,
        release_at: u64,
        reason: &'static str,
    ) {
        info!(
            target: "governor",
            vaa_id = %msg.message_id(),
            value_cents,
            release_at,
            reason,
            "enqueuing VAA as pending"
        );
        self.pending.push_back(PendingEntry {
            msg: msg.clone(),
            value_cents,
            enqueued_at: now,
            release_at,
            reason,
        });
        metrics().inc_enqueued(reason);
        metrics().set_pending(self.pending.len() as u64);
    }

    /// Current window usage for `chain`, trimming expired entries first.
    fn window_usage(&mut self, chain: ChainId, limits: ChainLimits, now: u64) -> u64 {
        let entries = self.window.entry(chain).or_default();
        entries.retain(|e| e.released_at + limits.day_length_secs > now);
        let used: u64 = entries
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.value_cents));
        metrics().set_window_usage_cents(&chain.to_string(), used);
        used
    }

    fn charge(&mut self, chain: ChainId, value_cents: u64, now: u64) {
        self.window.entry(chain).or_default().push(WindowEntry {
            released_at: now,
            value_cents,
        });
    }

    fn take_pending(&mut self, vaa_id: &str) -> Result<PendingEntry, GovernorError> {
        let idx = self
            .pending
            .iter()
            .position(|e| e.msg.message_id() == vaa_id)
            .ok_or_else(|| GovernorError::UnknownPending(vaa_id.to_string()))?;
        self.pending
            .remove(idx)
            .ok_or_else(|| GovernorError::UnknownPending(vaa_id.to_string()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::PAYLOAD_TRANSFER;
    use aegis_types::Address;

    const EMITTER: [u8; 1] = [0xee];
    const TOKEN: [u8; 1] = [0x77];

    fn config() -> GovernorConfig {
        GovernorConfig::from_toml(&format!(
            r#"
            [[chain]]
            chain_id = 2
            daily_limit_usd = 1000
            big_transaction_threshold_usd = 500

            [[emitter]]
            chain_id = 2
            address = "{}"

            [[token]]
            chain_id = 2
            address = "{}"
            symbol = "TST"
            decimals = 8
            coingecko_id = "test-token"
            price_usd = 1.0
            "#,
            hex::encode(Address::from_short(&EMITTER).unwrap().0),
            hex::encode(Address::from_short(&TOKEN).unwrap().0),
        ))
        .unwrap()
    }

    /// A transfer of `usd` whole dollars of the 8-decimal test token.
    fn transfer_msg(sequence: u64, usd: u64) -> MessagePublication {
        let mut payload = vec![PAYLOAD_TRANSFER];
        let amount = u128::from(usd) * 100_000_000;
        payload.extend_from_slice(&[0u8; 16]);
        payload.extend_from_slice(&amount.to_be_bytes());
        payload.extend_from_slice(&Address::from_short(&TOKEN).unwrap().0);
        payload.extend_from_slice(&2u16.to_be_bytes());
        payload.extend_from_slice(&[0u8; 34]);

        MessagePublication {
            tx_hash: vec![1; 32],
            timestamp: 0,
            nonce: 0,
            sequence,
            consistency_level: 1,
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_short(&EMITTER).unwrap(),
            payload,
            unreliable: false,
        }
    }

    #[test]
    fn test_ungoverned_messages_pass_through() {
        let gov = ChainGovernor::new(config());
        let mut msg = transfer_msg(1, 100);
        msg.emitter_address = Address::from_short(&[0x99]).unwrap();
        assert!(!gov.is_governed_msg(&msg));
        assert!(gov.process_msg_at(&msg, 1000));
        assert!(gov.pending_ids().is_empty());
    }

    #[test]
    fn test_small_transfer_admitted() {
        let gov = ChainGovernor::new(config());
        let msg = transfer_msg(1, 100);
        assert!(gov.is_governed_msg(&msg));
        assert!(gov.process_msg_at(&msg, 1000));
        assert_eq!(gov.status_at(1000).chains[0].window_used_cents, 100_00);
    }

    #[test]
    fn test_big_transaction_delayed() {
        let gov = ChainGovernor::new(config());
        let msg = transfer_msg(1, 600); // over the $500 threshold
        assert!(!gov.process_msg_at(&msg, 1000));
        assert_eq!(gov.pending_ids(), vec![msg.message_id()]);

        // Not due yet.
        assert!(gov.check_pending_at(1000 + 86_399).is_empty());
        // Timer expiry releases without charging the window.
        let released = gov.check_pending_at(1000 + 86_400);
        assert_eq!(released.len(), 1);
        assert_eq!(gov.status_at(1000 + 86_400).chains[0].window_used_cents, 0);
    }

    #[test]
    fn test_daily_limit_enforced_and_freed() {
        let gov = ChainGovernor::new(config());
        // Three $400 transfers against a $1000 limit: third must wait.
        assert!(gov.process_msg_at(&transfer_msg(1, 400), 1000));
        assert!(gov.process_msg_at(&transfer_msg(2, 400), 2000));
        let third = transfer_msg(3, 400);
        assert!(!gov.process_msg_at(&third, 3000));
        assert_eq!(gov.pending_ids(), vec![third.message_id()]);

        // Window still full shortly after.
        assert!(gov.check_pending_at(4000).is_empty());

        // Once the first release ages out, capacity frees and the pending
        // transfer is charged to the window.
        let released = gov.check_pending_at(1000 + 86_401);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].message_id(), third.message_id());
        let status = gov.status_at(1000 + 86_401);
        assert_eq!(status.chains[0].window_used_cents, 800_00);
    }

    #[test]
    fn test_admitted_plus_window_never_exceeds_limit() {
        let gov = ChainGovernor::new(config());
        let mut now = 1000u64;
        for seq in 0..50u64 {
            let msg = transfer_msg(seq, 90);
            gov.process_msg_at(&msg, now);
            let status = gov.status_at(now);
            assert!(status.chains[0].window_used_cents <= 1000_00);
            now += 600;
        }
    }

    #[test]
    fn test_operator_pending_controls() {
        let gov = ChainGovernor::new(config());
        let msg = transfer_msg(1, 600);
        assert!(!gov.process_msg_at(&msg, 1000));
        let id = msg.message_id();

        assert!(matches!(
            gov.drop_pending("2/00/9"),
            Err(GovernorError::UnknownPending(_))
        ));

        gov.reset_release_timer_at(&id, 50_000).unwrap();
        let status = gov.status_at(50_000);
        assert_eq!(status.pending[0].release_at, 50_000 + 86_400);

        // An operator release expires the timer; the next pending check
        // publishes without charging the window.
        gov.release_pending(&id).unwrap();
        let released = gov.check_pending_at(50_001);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].message_id(), id);
        assert!(gov.pending_ids().is_empty());
        assert_eq!(gov.status_at(50_001).chains[0].window_used_cents, 0);

        // A release is final.
        assert!(gov.release_pending(&id).is_err());
    }

    #[test]
    fn test_status_reports_remaining() {
        let gov = ChainGovernor::new(config());
        assert!(gov.process_msg_at(&transfer_msg(1, 250), 1000));
        let status = gov.status_at(1000);
        assert_eq!(status.chains.len(), 1);
        assert_eq!(status.chains[0].remaining_cents, 750_00);
    }
}
