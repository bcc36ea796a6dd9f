// Path: crates/types/src/address.rs
//! Emitter and guardian address types.

use crate::error::AddressError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte network address. Chains whose native addresses are shorter are
/// left-zero-padded; longer-address chains hash down to 32 bytes under
/// chain-specific rules before they reach this type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Encode, Decode,
)]
#[serde(transparent)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    /// Builds an address from exactly 32 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AddressError> {
        let mut a = [0u8; 32];
        if data.len() != 32 {
            return Err(AddressError::InvalidLength {
                expected: 32,
                got: data.len(),
            });
        }
        a.copy_from_slice(data);
        Ok(Address(a))
    }

    /// Left-zero-pads a short native address into the 32-byte form.
    pub fn from_short(data: &[u8]) -> Result<Self, AddressError> {
        if data.len() > 32 {
            return Err(AddressError::InvalidLength {
                expected: 32,
                got: data.len(),
            });
        }
        let mut a = [0u8; 32];
        a[32 - data.len()..].copy_from_slice(data);
        Ok(Address(a))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(s).map_err(|_| AddressError::InvalidHex)?;
        Address::from_bytes(&raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A guardian signing address: the 20-byte Ethereum-style address derived
/// from the guardian's secp256k1 public key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Encode, Decode,
)]
#[serde(transparent)]
pub struct GuardianAddress(pub [u8; 20]);

impl GuardianAddress {
    pub fn from_bytes(data: &[u8]) -> Result<Self, AddressError> {
        let mut a = [0u8; 20];
        if data.len() != 20 {
            return Err(AddressError::InvalidLength {
                expected: 20,
                got: data.len(),
            });
        }
        a.copy_from_slice(data);
        Ok(GuardianAddress(a))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for GuardianAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(s).map_err(|_| AddressError::InvalidHex)?;
        GuardianAddress::from_bytes(&raw)
    }
}

impl fmt::Display for GuardianAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_short_pads_left() {
        let a = Address::from_short(&[0xde, 0xad]).unwrap();
        assert_eq!(&a.0[..30], &[0u8; 30]);
        assert_eq!(&a.0[30..], &[0xde, 0xad]);
    }

    #[test]
    fn test_address_hex_round_trip() {
        let a = Address::from_short(&[4]).unwrap();
        let s = a.to_string();
        assert_eq!(
            s,
            "0000000000000000000000000000000000000000000000000000000000000004"
        );
        assert_eq!(s.parse::<Address>().unwrap(), a);
        assert_eq!(format!("0x{}", s).parse::<Address>().unwrap(), a);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(Address::from_bytes(&[0u8; 31]).is_err());
        assert!(GuardianAddress::from_bytes(&[0u8; 32]).is_err());
    }
}
