// Path: crates/governor/src/transfer.rs
//! Token-bridge transfer payload parsing.
//!
//! The governor only needs the token identity and the raw amount, so this
//! parses the transfer prefix and ignores the recipient fields.

use aegis_types::{Address, ChainId};

/// Maximum decimal precision carried on the wire; bridge amounts are
/// truncated to this before transfer, and USD normalization mirrors it.
pub const MAX_VAA_DECIMALS: u32 = 8;

/// Payload id of a plain transfer.
pub const PAYLOAD_TRANSFER: u8 = 1;
/// Payload id of a transfer carrying an attached payload.
pub const PAYLOAD_TRANSFER_WITH_PAYLOAD: u8 = 3;

/// The governed prefix of a token-bridge transfer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub payload_id: u8,
    /// The raw wire amount. Values beyond 128 bits saturate; they exceed any
    /// configurable limit either way, and saturation keeps every guardian's
    /// arithmetic identical.
    pub amount: u128,
    pub token_chain: ChainId,
    pub token_address: Address,
}

/// Parses the transfer prefix of a token-bridge payload. Returns `None` for
/// non-transfer payloads or truncated input; such messages are simply not
/// governed.
pub fn parse_token_transfer(payload: &[u8]) -> Option<TokenTransfer> {
    // payload id (1) + amount (32) + token address (32) + token chain (2)
    if payload.len() < 67 {
        return None;
    }
    let payload_id = *payload.first()?;
    if payload_id != PAYLOAD_TRANSFER && payload_id != PAYLOAD_TRANSFER_WITH_PAYLOAD {
        return None;
    }

    let amount_raw = payload.get(1..33)?;
    let amount = if amount_raw.get(..16)?.iter().any(|b| *b != 0) {
        u128::MAX
    } else {
        let mut low = [0u8; 16];
        low.copy_from_slice(amount_raw.get(16..)?);
        u128::from_be_bytes(low)
    };

    let token_address = Address::from_bytes(payload.get(33..65)?).ok()?;
    let mut chain = [0u8; 2];
    chain.copy_from_slice(payload.get(65..67)?);

    Some(TokenTransfer {
        payload_id,
        amount,
        token_chain: ChainId(u16::from_be_bytes(chain)),
        token_address,
    })
}

/// Converts a raw amount into USD cents given the token's decimals and a
/// price in cents per whole token. Amounts are first truncated to
/// [`MAX_VAA_DECIMALS`] to match the precision actually carried on the wire.
pub fn usd_cents(amount: u128, decimals: u8, price_cents: u64) -> u64 {
    let dec = u32::from(decimals);
    let scaled = if dec > MAX_VAA_DECIMALS {
        amount / 10u128.pow(dec - MAX_VAA_DECIMALS)
    } else {
        amount
    };
    let denom = 10u128.pow(dec.min(MAX_VAA_DECIMALS));
    let cents = scaled.saturating_mul(u128::from(price_cents)) / denom;
    u64::try_from(cents).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_payload(payload_id: u8, amount: u128, token: u8, chain: u16) -> Vec<u8> {
        let mut payload = vec![payload_id];
        payload.extend_from_slice(&[0u8; 16]);
        payload.extend_from_slice(&amount.to_be_bytes());
        let mut addr = [0u8; 32];
        addr[31] = token;
        payload.extend_from_slice(&addr);
        payload.extend_from_slice(&chain.to_be_bytes());
        // recipient fields the governor does not read
        payload.extend_from_slice(&[0u8; 34]);
        payload
    }

    #[test]
    fn test_parse_transfer() {
        let payload = transfer_payload(PAYLOAD_TRANSFER, 123_456, 9, 2);
        let transfer = parse_token_transfer(&payload).unwrap();
        assert_eq!(transfer.payload_id, 1);
        assert_eq!(transfer.amount, 123_456);
        assert_eq!(transfer.token_chain, ChainId::ETHEREUM);
        assert_eq!(transfer.token_address.0[31], 9);
    }

    #[test]
    fn test_parse_rejects_non_transfer() {
        assert!(parse_token_transfer(&transfer_payload(2, 1, 1, 2)).is_none());
        assert!(parse_token_transfer(&[1u8; 10]).is_none());
        assert!(parse_token_transfer(&[]).is_none());
    }

    #[test]
    fn test_oversized_amount_saturates() {
        let mut payload = transfer_payload(PAYLOAD_TRANSFER, 0, 1, 2);
        payload[1] = 0xff; // set a high-order amount byte
        assert_eq!(parse_token_transfer(&payload).unwrap().amount, u128::MAX);
    }

    #[test]
    fn test_usd_cents_normalization() {
        // 1.5 tokens at 18 decimals, price $2000.00.
        let amount = 1_500_000_000_000_000_000u128;
        assert_eq!(usd_cents(amount, 18, 200_000), 300_000);

        // 6-decimal token (already below the cap): 2.5 at $1.00.
        assert_eq!(usd_cents(2_500_000, 6, 100), 250);

        // 8-decimal token: exactly one whole unit.
        assert_eq!(usd_cents(100_000_000, 8, 4_217_00), 4_217_00);

        // Saturation instead of overflow.
        assert_eq!(usd_cents(u128::MAX, 18, u64::MAX), u64::MAX);
    }
}
