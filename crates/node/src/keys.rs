// Path: crates/node/src/keys.rs
//! Guardian signing key and node identity key loading.
//!
//! On-disk formats are deliberately simple: the guardian key is a hex-encoded
//! secp256k1 scalar, the node identity a protobuf-encoded keypair. In dev
//! environments missing keys are generated and written back.

use aegis_types::error::ConfigError;
use aegis_types::Environment;
use k256::ecdsa::SigningKey;
use libp2p::identity::Keypair;
use std::path::Path;
use tracing::{info, warn};

/// Loads the guardian signing key, generating one in dev environments.
pub fn load_guardian_key(path: &Path, env: Environment) -> Result<SigningKey, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let raw = raw.trim();
            let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).map_err(|_| {
                ConfigError::Invalid {
                    field: "guardian_key",
                    reason: format!("{} is not hex", path.display()),
                }
            })?;
            SigningKey::from_slice(&bytes).map_err(|e| ConfigError::Invalid {
                field: "guardian_key",
                reason: e.to_string(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && env.dev_defaults() => {
            warn!(target: "node", path = %path.display(), "generating dev guardian key");
            let key = SigningKey::random(&mut rand::rngs::OsRng);
            std::fs::write(path, hex::encode(key.to_bytes()))
                .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
            Ok(key)
        }
        Err(e) => Err(ConfigError::Io(format!("{}: {}", path.display(), e))),
    }
}

/// Loads the libp2p node identity, generating one in dev environments.
pub fn load_node_key(path: &Path, env: Environment) -> Result<Keypair, ConfigError> {
    match std::fs::read(path) {
        Ok(raw) => Keypair::from_protobuf_encoding(&raw).map_err(|e| ConfigError::Invalid {
            field: "node_key",
            reason: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && env.dev_defaults() => {
            warn!(target: "node", path = %path.display(), "generating dev node identity key");
            let keypair = Keypair::generate_ed25519();
            let encoded = keypair
                .to_protobuf_encoding()
                .map_err(|e| ConfigError::Invalid {
                    field: "node_key",
                    reason: e.to_string(),
                })?;
            std::fs::write(path, encoded)
                .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
            info!(target: "node", peer_id = %keypair.public().to_peer_id(), "node identity created");
            Ok(keypair)
        }
        Err(e) => Err(ConfigError::Io(format!("{}: {}", path.display(), e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guardian_key_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardian.key");

        // Missing key is fatal outside dev.
        assert!(load_guardian_key(&path, Environment::MainNet).is_err());

        // Dev generates, then reloads identically.
        let generated = load_guardian_key(&path, Environment::UnsafeDevNet).unwrap();
        let reloaded = load_guardian_key(&path, Environment::MainNet).unwrap();
        assert_eq!(generated.to_bytes(), reloaded.to_bytes());
    }

    #[test]
    fn test_guardian_key_accepts_0x_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guardian.key");
        let mut scalar = [0u8; 32];
        scalar[31] = 9;
        std::fs::write(&path, format!("0x{}\n", hex::encode(scalar))).unwrap();
        let key = load_guardian_key(&path, Environment::MainNet).unwrap();
        assert_eq!(key.to_bytes().as_slice(), &scalar);
    }

    #[test]
    fn test_node_key_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");

        assert!(load_node_key(&path, Environment::TestNet).is_err());

        let generated = load_node_key(&path, Environment::UnsafeDevNet).unwrap();
        let reloaded = load_node_key(&path, Environment::MainNet).unwrap();
        assert_eq!(
            generated.public().to_peer_id(),
            reloaded.public().to_peer_id()
        );
    }
}
