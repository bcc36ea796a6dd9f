// Path: crates/node/src/config.rs
//! Node configuration: `node.toml` plus flag/env overrides.

use aegis_types::error::ConfigError;
use aegis_types::{Environment, GuardianAddress};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "aegisd", about = "aegis guardian node")]
pub struct NodeOpts {
    /// Directory holding node.toml and the key files.
    #[arg(long)]
    pub config_dir: PathBuf,
    /// Overrides `environment` in node.toml.
    #[arg(long, env = "AEGIS_ENV")]
    pub env: Option<Environment>,
    /// Overrides `telemetry_addr` in node.toml.
    #[arg(long, env = "AEGIS_TELEMETRY_ADDR")]
    pub telemetry_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardianSetConfig {
    pub index: u32,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GovernorSection {
    #[serde(default)]
    pub enabled: bool,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub environment: Environment,
    /// The signed-VAA database file.
    pub db_path: PathBuf,
    /// Hex-encoded secp256k1 guardian signing key.
    #[serde(default = "default_guardian_key_path")]
    pub guardian_key_path: PathBuf,
    /// Protobuf-encoded node identity keypair.
    #[serde(default = "default_node_key_path")]
    pub node_key_path: PathBuf,
    /// The admin service socket.
    pub admin_socket: String,
    /// The telemetry HTTP listener.
    pub telemetry_addr: String,
    /// Bootstrap guardian set, until governance rotates it.
    pub guardian_set: Option<GuardianSetConfig>,
    #[serde(default)]
    pub governor: GovernorSection,
    /// Named public RPC endpoints, exposed verbatim by `DumpRPCs`.
    #[serde(default)]
    pub rpcs: HashMap<String, String>,
}

fn default_guardian_key_path() -> PathBuf {
    PathBuf::from("guardian.key")
}

fn default_node_key_path() -> PathBuf {
    PathBuf::from("node.key")
}

impl NodeConfig {
    /// Reads `node.toml` from the config directory and applies overrides.
    pub fn load(opts: &NodeOpts) -> Result<Self, ConfigError> {
        let path = opts.config_dir.join("node.toml");
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let mut config: NodeConfig = toml::from_str(&raw).map_err(|e| ConfigError::Invalid {
            field: "node.toml",
            reason: e.to_string(),
        })?;

        if let Some(env) = opts.env {
            config.environment = env;
        }
        if let Some(addr) = &opts.telemetry_addr {
            config.telemetry_addr = addr.clone();
        }

        // Key paths are relative to the config directory.
        config.guardian_key_path = opts.config_dir.join(&config.guardian_key_path);
        config.node_key_path = opts.config_dir.join(&config.node_key_path);

        config.validate()?;
        Ok(config)
    }

    /// Startup validation. Impossible combinations are fatal here, never at
    /// runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_socket.is_empty() {
            return Err(ConfigError::Missing("admin_socket"));
        }
        if self.telemetry_addr.is_empty() {
            return Err(ConfigError::Missing("telemetry_addr"));
        }
        if self.admin_socket == self.telemetry_addr {
            return Err(ConfigError::DuplicateSocket(self.admin_socket.clone()));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("db_path"));
        }
        if self.governor.enabled && self.governor.config_path.is_none() {
            return Err(ConfigError::Missing("governor.config_path"));
        }
        if self.guardian_set.is_none() && !self.environment.dev_defaults() {
            return Err(ConfigError::Missing("guardian_set"));
        }
        if let Some(set) = &self.guardian_set {
            if set.addresses.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "guardian_set.addresses",
                    reason: "empty guardian set specified".into(),
                });
            }
        }
        Ok(())
    }

    /// The bootstrap guardian addresses, parsed.
    pub fn bootstrap_guardians(&self) -> Result<Option<(u32, Vec<GuardianAddress>)>, ConfigError> {
        let Some(set) = &self.guardian_set else {
            return Ok(None);
        };
        let mut addresses = Vec::with_capacity(set.addresses.len());
        for raw in &set.addresses {
            let addr: GuardianAddress = raw.parse().map_err(|_| ConfigError::Invalid {
                field: "guardian_set.addresses",
                reason: format!("bad guardian address {:?}", raw),
            })?;
            addresses.push(addr);
        }
        Ok(Some((set.index, addresses)))
    }

    /// The governor config file, resolved against the config directory.
    pub fn governor_config_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.governor
            .config_path
            .as_ref()
            .map(|p| config_dir.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(extra: &str) -> String {
        format!(
            r#"
            environment = "testnet"
            db_path = "vaas.redb"
            admin_socket = "/run/aegis/admin.sock"
            telemetry_addr = "127.0.0.1:9617"

            [guardian_set]
            index = 0
            addresses = ["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"]
            {}
            "#,
            extra
        )
    }

    fn parse(raw: &str) -> Result<NodeConfig, ConfigError> {
        let config: NodeConfig = toml::from_str(raw).map_err(|e| ConfigError::Invalid {
            field: "node.toml",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_sample_parses() {
        let config = parse(&sample("")).unwrap();
        assert_eq!(config.environment, Environment::TestNet);
        let (index, guardians) = config.bootstrap_guardians().unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(guardians.len(), 1);
    }

    #[test]
    fn test_duplicate_socket_fatal() {
        let raw = sample("").replace("127.0.0.1:9617", "/run/aegis/admin.sock");
        assert!(matches!(
            parse(&raw),
            Err(ConfigError::DuplicateSocket(_))
        ));
    }

    #[test]
    fn test_governor_requires_table_path() {
        let config = parse(&sample("\n[governor]\nenabled = true\n"));
        assert!(matches!(config, Err(ConfigError::Missing("governor.config_path"))));
    }

    #[test]
    fn test_mainnet_requires_guardian_set() {
        let raw = sample("")
            .replace("testnet", "mainnet")
            .replace("[guardian_set]", "[unused]");
        assert!(matches!(parse(&raw), Err(ConfigError::Missing("guardian_set"))));
    }

    #[test]
    fn test_empty_guardian_set_fatal() {
        let raw = sample("").replace(
            r#"addresses = ["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"]"#,
            "addresses = []",
        );
        assert!(matches!(parse(&raw), Err(ConfigError::Invalid { .. })));
    }
}
