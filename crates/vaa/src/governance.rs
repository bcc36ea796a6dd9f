// Path: crates/vaa/src/governance.rs
//! Typed payloads carried inside governance VAAs.
//!
//! Every body starts with a 32-byte left-zero-padded module identifier and a
//! 1-byte action code. Action codes overlap across modules; the module prefix
//! disambiguates.

use aegis_types::error::GovernanceError;
use aegis_types::{Address, ChainId, GuardianAddress};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub const MODULE_CORE: &str = "Core";
pub const MODULE_TOKEN_BRIDGE: &str = "TokenBridge";
pub const MODULE_NFT_BRIDGE: &str = "NFTBridge";
pub const MODULE_RELAYER: &str = "WormholeRelayer";

/// Left-pads a module string to the 32-byte wire form.
///
/// Panics if the string exceeds 32 bytes: module identifiers are compile-time
/// constants, so an overflow is a fatal configuration error.
pub fn left_pad_module(module: &str) -> [u8; 32] {
    let raw = module.as_bytes();
    if raw.len() > 32 {
        panic!("module identifier {:?} exceeds 32 bytes", module);
    }
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(raw);
    out
}

/// Converts a possibly-oversized numeric chain id into the 16-bit form.
pub fn chain_id_from_u64(v: u64) -> Result<ChainId, GovernanceError> {
    u16::try_from(v)
        .map(ChainId)
        .map_err(|_| GovernanceError::ChainOutOfRange(v))
}

/// An EVM chain id, serialized as a 32-byte big-endian unsigned 256-bit
/// integer on the wire. Observed values all fit in 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmChainId(pub u64);

impl EvmChainId {
    fn to_u256_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&self.0.to_be_bytes());
        out
    }

    fn from_u256_bytes(raw: &[u8; 32]) -> Result<Self, GovernanceError> {
        if raw[..24].iter().any(|b| *b != 0) {
            return Err(GovernanceError::Malformed(
                "evm chain id exceeds 64 bits".into(),
            ));
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&raw[24..]);
        Ok(EvmChainId(u64::from_be_bytes(low)))
    }
}

/// Which bridge module a shared-layout action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeModule {
    Token,
    Nft,
}

impl BridgeModule {
    fn name(self) -> &'static str {
        match self {
            BridgeModule::Token => MODULE_TOKEN_BRIDGE,
            BridgeModule::Nft => MODULE_NFT_BRIDGE,
        }
    }
}

/// The closed set of governance actions this node can emit and parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernancePayload {
    /// Core action 1: upgrade the core contract on one chain.
    ContractUpgrade {
        chain: ChainId,
        new_contract: Address,
    },
    /// Core action 2: rotate the guardian set.
    GuardianSetUpdate {
        /// Normally [`ChainId::ANY`]; the rotation applies everywhere.
        chain: ChainId,
        new_index: u32,
        keys: Vec<GuardianAddress>,
    },
    /// Core action 5: re-assign the chain id after an EVM fork.
    RecoverChainId {
        evm_chain_id: EvmChainId,
        new_chain_id: ChainId,
    },
    /// Bridge action 1: register a bridge emitter on a foreign chain.
    RegisterChain {
        module: BridgeModule,
        /// The chain the registration is addressed to; 0 for all.
        chain: ChainId,
        emitter_chain: ChainId,
        emitter_address: Address,
    },
    /// Bridge action 2: upgrade a bridge contract on one chain.
    BridgeUpgrade {
        module: BridgeModule,
        chain: ChainId,
        new_contract: Address,
    },
    /// Bridge action 3: chain-id recovery for a bridge deployment.
    BridgeRecoverChainId {
        module: BridgeModule,
        evm_chain_id: EvmChainId,
        new_chain_id: ChainId,
    },
    /// Relayer action 3: switch the default delivery provider.
    SetDefaultDeliveryProvider {
        chain: ChainId,
        new_provider: Address,
    },
}

impl GovernancePayload {
    /// Builds a guardian-set rotation, refusing an empty set.
    pub fn guardian_set_update(
        new_index: u32,
        keys: Vec<GuardianAddress>,
    ) -> Result<Self, GovernanceError> {
        if keys.is_empty() {
            return Err(GovernanceError::EmptyGuardianSet);
        }
        Ok(GovernancePayload::GuardianSetUpdate {
            chain: ChainId::ANY,
            new_index,
            keys,
        })
    }

    fn module(&self) -> &'static str {
        match self {
            Self::ContractUpgrade { .. }
            | Self::GuardianSetUpdate { .. }
            | Self::RecoverChainId { .. } => MODULE_CORE,
            Self::RegisterChain { module, .. }
            | Self::BridgeUpgrade { module, .. }
            | Self::BridgeRecoverChainId { module, .. } => module.name(),
            Self::SetDefaultDeliveryProvider { .. } => MODULE_RELAYER,
        }
    }

    fn action(&self) -> u8 {
        match self {
            Self::ContractUpgrade { .. } => 1,
            Self::GuardianSetUpdate { .. } => 2,
            Self::RecoverChainId { .. } => 5,
            Self::RegisterChain { .. } => 1,
            Self::BridgeUpgrade { .. } => 2,
            Self::BridgeRecoverChainId { .. } => 3,
            Self::SetDefaultDeliveryProvider { .. } => 3,
        }
    }

    /// Serializes the body in wire order: module, action, action fields.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&left_pad_module(self.module()));
        buf.push(self.action());
        match self {
            Self::ContractUpgrade {
                chain,
                new_contract,
            } => {
                buf.extend_from_slice(&u16::from(*chain).to_be_bytes());
                buf.extend_from_slice(new_contract.as_bytes());
            }
            Self::GuardianSetUpdate {
                chain,
                new_index,
                keys,
            } => {
                buf.extend_from_slice(&u16::from(*chain).to_be_bytes());
                buf.extend_from_slice(&new_index.to_be_bytes());
                buf.push(keys.len() as u8);
                for key in keys {
                    buf.extend_from_slice(key.as_bytes());
                }
            }
            Self::RecoverChainId {
                evm_chain_id,
                new_chain_id,
            } => {
                buf.extend_from_slice(&evm_chain_id.to_u256_bytes());
                buf.extend_from_slice(&u16::from(*new_chain_id).to_be_bytes());
            }
            Self::RegisterChain {
                module: _,
                chain,
                emitter_chain,
                emitter_address,
            } => {
                buf.extend_from_slice(&u16::from(*chain).to_be_bytes());
                buf.extend_from_slice(&u16::from(*emitter_chain).to_be_bytes());
                buf.extend_from_slice(emitter_address.as_bytes());
            }
            Self::BridgeUpgrade {
                module: _,
                chain,
                new_contract,
            } => {
                buf.extend_from_slice(&u16::from(*chain).to_be_bytes());
                buf.extend_from_slice(new_contract.as_bytes());
            }
            Self::BridgeRecoverChainId {
                module: _,
                evm_chain_id,
                new_chain_id,
            } => {
                buf.extend_from_slice(&evm_chain_id.to_u256_bytes());
                buf.extend_from_slice(&u16::from(*new_chain_id).to_be_bytes());
            }
            Self::SetDefaultDeliveryProvider {
                chain,
                new_provider,
            } => {
                buf.extend_from_slice(&u16::from(*chain).to_be_bytes());
                buf.extend_from_slice(new_provider.as_bytes());
            }
        }
        buf
    }

    /// Parses a governance body, dispatching on (module, action).
    pub fn deserialize(data: &[u8]) -> Result<Self, GovernanceError> {
        let mut reader = Cursor::new(data);

        let mut module_raw = [0u8; 32];
        reader
            .read_exact(&mut module_raw)
            .map_err(|_| GovernanceError::Malformed("truncated module".into()))?;
        let action = reader
            .read_u8()
            .map_err(|_| GovernanceError::Malformed("missing action".into()))?;

        let module = std::str::from_utf8(&module_raw)
            .map_err(|_| GovernanceError::Malformed("module is not utf-8".into()))?
            .trim_start_matches('\0')
            .to_string();

        let payload = match (module.as_str(), action) {
            (MODULE_CORE, 1) => Self::ContractUpgrade {
                chain: ChainId(read_u16(&mut reader, "chain")?),
                new_contract: read_address(&mut reader, "new contract")?,
            },
            (MODULE_CORE, 2) => {
                let chain = ChainId(read_u16(&mut reader, "chain")?);
                let new_index = reader
                    .read_u32::<BigEndian>()
                    .map_err(|_| GovernanceError::Malformed("missing new set index".into()))?;
                let count = reader
                    .read_u8()
                    .map_err(|_| GovernanceError::Malformed("missing key count".into()))?;
                if count == 0 {
                    return Err(GovernanceError::EmptyGuardianSet);
                }
                let mut keys = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let mut key = [0u8; 20];
                    reader
                        .read_exact(&mut key)
                        .map_err(|_| GovernanceError::Malformed("truncated guardian key".into()))?;
                    keys.push(GuardianAddress(key));
                }
                Self::GuardianSetUpdate {
                    chain,
                    new_index,
                    keys,
                }
            }
            (MODULE_CORE, 5) => Self::RecoverChainId {
                evm_chain_id: read_evm_chain_id(&mut reader)?,
                new_chain_id: ChainId(read_u16(&mut reader, "new chain id")?),
            },
            (MODULE_TOKEN_BRIDGE, 1) | (MODULE_NFT_BRIDGE, 1) => Self::RegisterChain {
                module: bridge_module(&module),
                chain: ChainId(read_u16(&mut reader, "chain")?),
                emitter_chain: ChainId(read_u16(&mut reader, "emitter chain")?),
                emitter_address: read_address(&mut reader, "emitter address")?,
            },
            (MODULE_TOKEN_BRIDGE, 2) | (MODULE_NFT_BRIDGE, 2) => Self::BridgeUpgrade {
                module: bridge_module(&module),
                chain: ChainId(read_u16(&mut reader, "chain")?),
                new_contract: read_address(&mut reader, "new contract")?,
            },
            (MODULE_TOKEN_BRIDGE, 3) | (MODULE_NFT_BRIDGE, 3) => Self::BridgeRecoverChainId {
                module: bridge_module(&module),
                evm_chain_id: read_evm_chain_id(&mut reader)?,
                new_chain_id: ChainId(read_u16(&mut reader, "new chain id")?),
            },
            (MODULE_RELAYER, 3) => Self::SetDefaultDeliveryProvider {
                chain: ChainId(read_u16(&mut reader, "chain")?),
                new_provider: read_address(&mut reader, "new provider")?,
            },
            _ => {
                return Err(GovernanceError::UnknownAction { module, action });
            }
        };

        let mut rest = Vec::new();
        reader
            .read_to_end(&mut rest)
            .map_err(|_| GovernanceError::Malformed("unreadable trailer".into()))?;
        if !rest.is_empty() {
            return Err(GovernanceError::Malformed(format!(
                "{} trailing bytes after body",
                rest.len()
            )));
        }

        Ok(payload)
    }
}

fn bridge_module(name: &str) -> BridgeModule {
    if name == MODULE_NFT_BRIDGE {
        BridgeModule::Nft
    } else {
        BridgeModule::Token
    }
}

fn read_u16(reader: &mut Cursor<&[u8]>, field: &str) -> Result<u16, GovernanceError> {
    reader
        .read_u16::<BigEndian>()
        .map_err(|_| GovernanceError::Malformed(format!("missing {}", field)))
}

fn read_address(reader: &mut Cursor<&[u8]>, field: &str) -> Result<Address, GovernanceError> {
    let mut raw = [0u8; 32];
    reader
        .read_exact(&mut raw)
        .map_err(|_| GovernanceError::Malformed(format!("truncated {}", field)))?;
    Ok(Address(raw))
}

fn read_evm_chain_id(reader: &mut Cursor<&[u8]>) -> Result<EvmChainId, GovernanceError> {
    let mut raw = [0u8; 32];
    reader
        .read_exact(&mut raw)
        .map_err(|_| GovernanceError::Malformed("truncated evm chain id".into()))?;
    EvmChainId::from_u256_bytes(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_guardian_set_rejected() {
        let err = GovernancePayload::guardian_set_update(1, vec![]).unwrap_err();
        assert_eq!(err, GovernanceError::EmptyGuardianSet);
        assert_eq!(err.to_string(), "empty guardian set specified");
    }

    #[test]
    fn test_contract_upgrade_vector() {
        let body = GovernancePayload::ContractUpgrade {
            chain: ChainId::SOLANA,
            new_contract: Address::from_short(&[0x04]).unwrap(),
        }
        .serialize();
        assert_eq!(
            hex::encode(&body),
            "00000000000000000000000000000000000000000000000000000000436f7265\
             0100010000000000000000000000000000000000000000000000000000000000\
             000004"
        );
        assert_eq!(GovernancePayload::deserialize(&body).unwrap().serialize(), body);
    }

    #[test]
    fn test_guardian_set_update_vector() {
        let a = GuardianAddress::from_str("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let b = GuardianAddress::from_str("5aaeb6053f3e94c9b9a09f33669435e7ef1beaee").unwrap();
        let body = GovernancePayload::guardian_set_update(1, vec![a, b])
            .unwrap()
            .serialize();
        assert_eq!(
            hex::encode(&body),
            "00000000000000000000000000000000000000000000000000000000436f7265\
             02000000000001025aaeb6053f3e94c9b9a09f33669435e7ef1beaed5aaeb605\
             3f3e94c9b9a09f33669435e7ef1beaee"
        );
    }

    #[test]
    fn test_register_chain_round_trip() {
        let payload = GovernancePayload::RegisterChain {
            module: BridgeModule::Token,
            chain: ChainId::ANY,
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_short(&[0xaa, 0xbb]).unwrap(),
        };
        let body = payload.serialize();
        assert_eq!(GovernancePayload::deserialize(&body).unwrap(), payload);
    }

    #[test]
    fn test_recover_chain_id_round_trip() {
        let payload = GovernancePayload::RecoverChainId {
            evm_chain_id: EvmChainId(10001),
            new_chain_id: ChainId(3),
        };
        let body = payload.serialize();
        // 32-byte module + action + u256 + u16
        assert_eq!(body.len(), 32 + 1 + 32 + 2);
        assert_eq!(GovernancePayload::deserialize(&body).unwrap(), payload);
    }

    #[test]
    fn test_relayer_provider_round_trip() {
        let payload = GovernancePayload::SetDefaultDeliveryProvider {
            chain: ChainId(6),
            new_provider: Address::from_short(&[0x42]).unwrap(),
        };
        let body = payload.serialize();
        assert_eq!(GovernancePayload::deserialize(&body).unwrap(), payload);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let mut body = left_pad_module(MODULE_CORE).to_vec();
        body.push(0x77);
        assert!(matches!(
            GovernancePayload::deserialize(&body),
            Err(GovernanceError::UnknownAction { action: 0x77, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut body = GovernancePayload::ContractUpgrade {
            chain: ChainId::SOLANA,
            new_contract: Address::ZERO,
        }
        .serialize();
        body.push(0);
        assert!(matches!(
            GovernancePayload::deserialize(&body),
            Err(GovernanceError::Malformed(_))
        ));
    }

    #[test]
    fn test_chain_id_range_check() {
        assert_eq!(chain_id_from_u64(2).unwrap(), ChainId::ETHEREUM);
        assert!(matches!(
            chain_id_from_u64(u64::from(u16::MAX) + 1),
            Err(GovernanceError::ChainOutOfRange(_))
        ));
    }

    #[test]
    #[should_panic(expected = "exceeds 32 bytes")]
    fn test_left_pad_module_overflow_panics() {
        left_pad_module("ThisModuleNameIsFarTooLongToEverFit");
    }
}
