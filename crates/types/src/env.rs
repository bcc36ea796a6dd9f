// Path: crates/types/src/env.rs
//! The network environment tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which deployment of the attestation network this node participates in.
///
/// The environment is a first-class input: it selects the query signing
/// prefixes, decides whether development defaults are applied, and gates the
/// hardening checks (memory locking, root refusal) on MainNet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development: permissive defaults, auto-generated keys.
    UnsafeDevNet,
    TestNet,
    MainNet,
}

impl Environment {
    /// Whether development conveniences (generated keys, permissive admin
    /// socket) are allowed.
    pub fn dev_defaults(&self) -> bool {
        matches!(self, Environment::UnsafeDevNet)
    }

    /// Whether process hardening (mlockall, refusing to run as root) is
    /// mandatory.
    pub fn hardened(&self) -> bool {
        matches!(self, Environment::MainNet)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" | "devnet" | "unsafe_devnet" => Ok(Environment::UnsafeDevNet),
            "test" | "testnet" => Ok(Environment::TestNet),
            "prod" | "mainnet" => Ok(Environment::MainNet),
            other => Err(format!("unknown environment {:?}", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::UnsafeDevNet => write!(f, "unsafe_devnet"),
            Environment::TestNet => write!(f, "testnet"),
            Environment::MainNet => write!(f, "mainnet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for env in [
            Environment::UnsafeDevNet,
            Environment::TestNet,
            Environment::MainNet,
        ] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_gating() {
        assert!(Environment::UnsafeDevNet.dev_defaults());
        assert!(!Environment::MainNet.dev_defaults());
        assert!(Environment::MainNet.hardened());
        assert!(!Environment::TestNet.hardened());
    }
}
