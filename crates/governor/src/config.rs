// Path: crates/governor/src/config.rs
//! Governor configuration: chain limits, governed emitters and the token
//! price registry, loaded from TOML.

use aegis_types::error::GovernorError;
use aegis_types::{Address, ChainId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default day length when a chain entry does not override it.
pub const DEFAULT_DAY_LENGTH_MINUTES: u64 = 1440;

#[derive(Debug, Clone, Deserialize)]
struct GovernorConfigFile {
    #[serde(default)]
    chain: Vec<ChainEntry>,
    #[serde(default)]
    emitter: Vec<EmitterEntry>,
    #[serde(default)]
    token: Vec<TokenEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChainEntry {
    chain_id: u16,
    daily_limit_usd: u64,
    big_transaction_threshold_usd: u64,
    day_length_minutes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmitterEntry {
    chain_id: u16,
    /// Hex, with or without an 0x prefix.
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenEntry {
    chain_id: u16,
    address: String,
    symbol: String,
    decimals: u8,
    coingecko_id: String,
    price_usd: f64,
}

/// Per-chain limits after validation. All money amounts are USD cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLimits {
    pub daily_limit_cents: u64,
    pub big_transaction_cents: u64,
    pub day_length_secs: u64,
}

/// One priced token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
    pub coingecko_id: String,
    pub price_cents: u64,
}

/// The validated governor configuration.
#[derive(Debug, Clone, Default)]
pub struct GovernorConfig {
    pub chains: HashMap<ChainId, ChainLimits>,
    /// The token-bridge emitter the governor watches on each chain.
    pub emitters: HashMap<ChainId, Address>,
    pub tokens: HashMap<(ChainId, Address), TokenInfo>,
}

impl GovernorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GovernorError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernorError::Config(format!("read failed: {}", e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, GovernorError> {
        let file: GovernorConfigFile = toml::from_str(raw)
            .map_err(|e| GovernorError::Config(format!("parse failed: {}", e)))?;

        let mut chains = HashMap::new();
        for entry in &file.chain {
            let chain = ChainId(entry.chain_id);
            if !chain.is_set() {
                return Err(GovernorError::Config("chain id 0 cannot be governed".into()));
            }
            let limits = ChainLimits {
                daily_limit_cents: to_cents(entry.daily_limit_usd)?,
                big_transaction_cents: to_cents(entry.big_transaction_threshold_usd)?,
                day_length_secs: entry
                    .day_length_minutes
                    .unwrap_or(DEFAULT_DAY_LENGTH_MINUTES)
                    .saturating_mul(60),
            };
            if limits.day_length_secs == 0 {
                return Err(GovernorError::Config(format!(
                    "chain {} has a zero-length day",
                    chain
                )));
            }
            if chains.insert(chain, limits).is_some() {
                return Err(GovernorError::Config(format!(
                    "duplicate chain entry {}",
                    chain
                )));
            }
        }

        let mut emitters = HashMap::new();
        for entry in &file.emitter {
            let chain = ChainId(entry.chain_id);
            let address = parse_address(&entry.address)?;
            if emitters.insert(chain, address).is_some() {
                return Err(GovernorError::Config(format!(
                    "duplicate emitter entry for {}",
                    chain
                )));
            }
        }

        let mut tokens = HashMap::new();
        for entry in &file.token {
            let key = (ChainId(entry.chain_id), parse_address(&entry.address)?);
            if !entry.price_usd.is_finite() || entry.price_usd < 0.0 {
                return Err(GovernorError::Config(format!(
                    "token {} has an unusable price {}",
                    entry.symbol, entry.price_usd
                )));
            }
            let info = TokenInfo {
                symbol: entry.symbol.clone(),
                decimals: entry.decimals,
                coingecko_id: entry.coingecko_id.clone(),
                price_cents: (entry.price_usd * 100.0).round() as u64,
            };
            if tokens.insert(key, info).is_some() {
                return Err(GovernorError::Config(format!(
                    "duplicate token entry {}",
                    entry.symbol
                )));
            }
        }

        Ok(GovernorConfig {
            chains,
            emitters,
            tokens,
        })
    }
}

fn to_cents(usd: u64) -> Result<u64, GovernorError> {
    usd.checked_mul(100)
        .ok_or_else(|| GovernorError::Config(format!("USD amount {} overflows cents", usd)))
}

fn parse_address(raw: &str) -> Result<Address, GovernorError> {
    raw.parse()
        .map_err(|_| GovernorError::Config(format!("bad address {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[chain]]
        chain_id = 2
        daily_limit_usd = 50_000_000
        big_transaction_threshold_usd = 5_000_000

        [[chain]]
        chain_id = 1
        daily_limit_usd = 25_000_000
        big_transaction_threshold_usd = 2_500_000
        day_length_minutes = 720

        [[emitter]]
        chain_id = 2
        address = "0x0000000000000000000000003ee18b2214aff97000d974cf647e7c347e8fa585"

        [[token]]
        chain_id = 2
        address = "000000000000000000000000c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        symbol = "WETH"
        decimals = 18
        coingecko_id = "weth"
        price_usd = 1713.25
    "#;

    #[test]
    fn test_parse_sample() {
        let config = GovernorConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.emitters.len(), 1);
        assert_eq!(config.tokens.len(), 1);

        let eth = &config.chains[&ChainId::ETHEREUM];
        assert_eq!(eth.daily_limit_cents, 5_000_000_000);
        assert_eq!(eth.big_transaction_cents, 500_000_000);
        assert_eq!(eth.day_length_secs, 86_400);

        let sol = &config.chains[&ChainId::SOLANA];
        assert_eq!(sol.day_length_secs, 43_200);

        let token = config
            .tokens
            .values()
            .next()
            .unwrap();
        assert_eq!(token.symbol, "WETH");
        assert_eq!(token.price_cents, 171_325);
    }

    #[test]
    fn test_rejects_duplicates_and_bad_values() {
        let dup = format!("{}\n{}", SAMPLE, "[[emitter]]\nchain_id = 2\naddress = \"00\"");
        assert!(GovernorConfig::from_toml(&dup).is_err());

        let bad_price = SAMPLE.replace("1713.25", "nan");
        assert!(GovernorConfig::from_toml(&bad_price).is_err());

        let zero_chain = SAMPLE.replace("chain_id = 2", "chain_id = 0");
        assert!(GovernorConfig::from_toml(&zero_chain).is_err());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(GovernorConfig::from_toml("not toml at all [").is_err());
    }
}
