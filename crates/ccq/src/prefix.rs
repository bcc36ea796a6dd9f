// Path: crates/ccq/src/prefix.rs
//! Environment-scoped signing prefixes.
//!
//! Prefixes are fixed 35-byte strings so a signature can never be replayed
//! across environments or between the request and response lanes.

use aegis_types::Environment;
use sha3::{Digest, Keccak256};

const MAINNET_REQUEST: &[u8; 35] = b"mainnet_query_request_000000000000|";
const TESTNET_REQUEST: &[u8; 35] = b"testnet_query_request_000000000000|";
const DEVNET_REQUEST: &[u8; 35] = b"devnet_query_request_0000000000000|";

const MAINNET_RESPONSE: &[u8; 35] = b"mainnet_query_response_00000000000|";
const TESTNET_RESPONSE: &[u8; 35] = b"testnet_query_response_00000000000|";
const DEVNET_RESPONSE: &[u8; 35] = b"devnet_query_response_000000000000|";

/// The request-lane prefix for an environment.
pub fn request_prefix(env: Environment) -> &'static [u8; 35] {
    match env {
        Environment::MainNet => MAINNET_REQUEST,
        Environment::TestNet => TESTNET_REQUEST,
        Environment::UnsafeDevNet => DEVNET_REQUEST,
    }
}

/// The response-lane prefix for an environment.
pub fn response_prefix(env: Environment) -> &'static [u8; 35] {
    match env {
        Environment::MainNet => MAINNET_RESPONSE,
        Environment::TestNet => TESTNET_RESPONSE,
        Environment::UnsafeDevNet => DEVNET_RESPONSE,
    }
}

/// The digest a requester signs: `keccak256(prefix || request_bytes)`.
pub fn request_digest(env: Environment, request_bytes: &[u8]) -> [u8; 32] {
    prefixed_digest(request_prefix(env), request_bytes)
}

/// The digest a guardian signs over its response.
pub fn response_digest(env: Environment, response_bytes: &[u8]) -> [u8; 32] {
    prefixed_digest(response_prefix(env), response_bytes)
}

fn prefixed_digest(prefix: &[u8; 35], bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(prefix);
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_are_35_bytes() {
        for env in [
            Environment::UnsafeDevNet,
            Environment::TestNet,
            Environment::MainNet,
        ] {
            assert_eq!(request_prefix(env).len(), 35);
            assert_eq!(response_prefix(env).len(), 35);
        }
    }

    #[test]
    fn test_digests_differ_by_environment_and_lane() {
        let bytes = b"query";
        let mainnet = request_digest(Environment::MainNet, bytes);
        let testnet = request_digest(Environment::TestNet, bytes);
        let response = response_digest(Environment::MainNet, bytes);
        assert_ne!(mainnet, testnet);
        assert_ne!(mainnet, response);
    }
}
