// Path: crates/ccq/src/response.rs
//! Query response marshaling.
//!
//! A response embeds the request it answers (bytes and requester signature),
//! so verifiers can bind the two without a side channel.

use crate::request::QueryRequest;
use crate::{QUERY_TYPE_SOL_ACCOUNT, QUERY_TYPE_SOL_PDA, VERSION};
use aegis_types::error::QueryError;
use aegis_types::ChainId;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// A guardian's answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    /// Chain the request arrived from; 0 for the off-chain request lane.
    pub request_chain_id: ChainId,
    /// The requester's 65-byte signature over the prefixed request digest.
    pub request_signature: [u8; 65],
    pub request: QueryRequest,
    pub responses: Vec<PerChainQueryResponse>,
}

/// One chain's share of a query response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerChainQueryResponse {
    pub chain_id: ChainId,
    pub response: ChainSpecificResponse,
}

/// The closed set of per-chain response bodies, mirroring the query bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainSpecificResponse {
    SolAccount(SolAccountQueryResponse),
    SolPda(SolPdaQueryResponse),
}

impl ChainSpecificResponse {
    pub fn response_type(&self) -> u8 {
        match self {
            ChainSpecificResponse::SolAccount(_) => QUERY_TYPE_SOL_ACCOUNT,
            ChainSpecificResponse::SolPda(_) => QUERY_TYPE_SOL_PDA,
        }
    }
}

/// Answer to an account-data lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountQueryResponse {
    pub slot_number: u64,
    pub block_time_us: u64,
    pub block_hash: [u8; 32],
    pub results: Vec<SolAccountResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountResult {
    pub lamports: u64,
    pub rent_epoch: u64,
    pub executable: bool,
    pub owner: [u8; 32],
    pub data: Vec<u8>,
}

/// Answer to a PDA lookup: the derived account plus its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolPdaQueryResponse {
    pub slot_number: u64,
    pub block_time_us: u64,
    pub block_hash: [u8; 32],
    pub results: Vec<SolPdaResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolPdaResult {
    pub account: [u8; 32],
    pub bump: u8,
    pub lamports: u64,
    pub rent_epoch: u64,
    pub executable: bool,
    pub owner: [u8; 32],
    pub data: Vec<u8>,
}

impl QueryResponse {
    /// Serializes the response, refusing one whose embedded request is
    /// invalid.
    pub fn encode(&self) -> Result<Vec<u8>, QueryError> {
        let request_bytes = self.request.encode()?;

        let mut buf = Vec::with_capacity(128 + request_bytes.len());
        buf.push(VERSION);
        buf.extend_from_slice(&u16::from(self.request_chain_id).to_be_bytes());
        buf.extend_from_slice(&self.request_signature);
        buf.extend_from_slice(&(request_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&request_bytes);
        buf.push(self.responses.len() as u8);
        for per_chain in &self.responses {
            buf.extend_from_slice(&u16::from(per_chain.chain_id).to_be_bytes());
            buf.push(per_chain.response.response_type());
            let body = per_chain.response.encode_body();
            buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
            buf.extend_from_slice(&body);
        }
        Ok(buf)
    }

    /// Parses a response from wire bytes, validating the embedded request.
    pub fn decode(data: &[u8]) -> Result<QueryResponse, QueryError> {
        let mut reader = Cursor::new(data);

        let version = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing version".into()))?;
        if version != VERSION {
            return Err(QueryError::UnsupportedVersion(version));
        }

        let request_chain_id = reader
            .read_u16::<BigEndian>()
            .map_err(|_| QueryError::Malformed("missing request chain id".into()))?;

        let mut request_signature = [0u8; 65];
        reader
            .read_exact(&mut request_signature)
            .map_err(|_| QueryError::Malformed("truncated request signature".into()))?;

        let request_len = reader
            .read_u32::<BigEndian>()
            .map_err(|_| QueryError::Malformed("missing request length".into()))?;
        let mut request_bytes = vec![0u8; request_len as usize];
        reader
            .read_exact(&mut request_bytes)
            .map_err(|_| QueryError::Malformed("truncated request".into()))?;
        let request = QueryRequest::decode(&request_bytes)?;

        let num_responses = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing response count".into()))?;
        let mut responses = Vec::with_capacity(num_responses as usize);
        for _ in 0..num_responses {
            let chain_id = reader
                .read_u16::<BigEndian>()
                .map_err(|_| QueryError::Malformed("missing response chain id".into()))?;
            let response_type = reader
                .read_u8()
                .map_err(|_| QueryError::Malformed("missing response type".into()))?;
            let body_len = reader
                .read_u32::<BigEndian>()
                .map_err(|_| QueryError::Malformed("missing response body length".into()))?;
            let mut body = vec![0u8; body_len as usize];
            reader
                .read_exact(&mut body)
                .map_err(|_| QueryError::Malformed("truncated response body".into()))?;

            let response = match response_type {
                QUERY_TYPE_SOL_ACCOUNT => {
                    ChainSpecificResponse::SolAccount(SolAccountQueryResponse::decode_body(&body)?)
                }
                QUERY_TYPE_SOL_PDA => {
                    ChainSpecificResponse::SolPda(SolPdaQueryResponse::decode_body(&body)?)
                }
                other => return Err(QueryError::UnknownQueryType(other)),
            };
            responses.push(PerChainQueryResponse {
                chain_id: ChainId(chain_id),
                response,
            });
        }

        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes".into()));
        }

        Ok(QueryResponse {
            request_chain_id: ChainId(request_chain_id),
            request_signature,
            request,
            responses,
        })
    }
}

impl ChainSpecificResponse {
    fn encode_body(&self) -> Vec<u8> {
        match self {
            ChainSpecificResponse::SolAccount(r) => r.encode_body(),
            ChainSpecificResponse::SolPda(r) => r.encode_body(),
        }
    }
}

fn encode_block_header(buf: &mut Vec<u8>, slot: u64, time_us: u64, hash: &[u8; 32]) {
    buf.extend_from_slice(&slot.to_be_bytes());
    buf.extend_from_slice(&time_us.to_be_bytes());
    buf.extend_from_slice(hash);
}

fn decode_block_header(reader: &mut Cursor<&[u8]>) -> Result<(u64, u64, [u8; 32]), QueryError> {
    let slot = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing slot number".into()))?;
    let time_us = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing block time".into()))?;
    let mut hash = [0u8; 32];
    reader
        .read_exact(&mut hash)
        .map_err(|_| QueryError::Malformed("truncated block hash".into()))?;
    Ok((slot, time_us, hash))
}

fn encode_account_fields(buf: &mut Vec<u8>, r: &SolAccountResult) {
    buf.extend_from_slice(&r.lamports.to_be_bytes());
    buf.extend_from_slice(&r.rent_epoch.to_be_bytes());
    buf.push(u8::from(r.executable));
    buf.extend_from_slice(&r.owner);
    buf.extend_from_slice(&(r.data.len() as u32).to_be_bytes());
    buf.extend_from_slice(&r.data);
}

fn decode_account_fields(reader: &mut Cursor<&[u8]>) -> Result<SolAccountResult, QueryError> {
    let lamports = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing lamports".into()))?;
    let rent_epoch = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing rent epoch".into()))?;
    let executable = reader
        .read_u8()
        .map_err(|_| QueryError::Malformed("missing executable flag".into()))?
        != 0;
    let mut owner = [0u8; 32];
    reader
        .read_exact(&mut owner)
        .map_err(|_| QueryError::Malformed("truncated owner".into()))?;
    let data_len = reader
        .read_u32::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing data length".into()))?;
    let mut data = vec![0u8; data_len as usize];
    reader
        .read_exact(&mut data)
        .map_err(|_| QueryError::Malformed("truncated account data".into()))?;
    Ok(SolAccountResult {
        lamports,
        rent_epoch,
        executable,
        owner,
        data,
    })
}

impl SolAccountQueryResponse {
    fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(49 + self.results.len() * 64);
        encode_block_header(&mut buf, self.slot_number, self.block_time_us, &self.block_hash);
        buf.push(self.results.len() as u8);
        for result in &self.results {
            encode_account_fields(&mut buf, result);
        }
        buf
    }

    fn decode_body(data: &[u8]) -> Result<Self, QueryError> {
        let mut reader = Cursor::new(data);
        let (slot_number, block_time_us, block_hash) = decode_block_header(&mut reader)?;
        let num_results = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing result count".into()))?;
        let mut results = Vec::with_capacity(num_results as usize);
        for _ in 0..num_results {
            results.push(decode_account_fields(&mut reader)?);
        }
        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes in account response".into()));
        }
        Ok(SolAccountQueryResponse {
            slot_number,
            block_time_us,
            block_hash,
            results,
        })
    }
}

impl SolPdaQueryResponse {
    fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(49 + self.results.len() * 97);
        encode_block_header(&mut buf, self.slot_number, self.block_time_us, &self.block_hash);
        buf.push(self.results.len() as u8);
        for result in &self.results {
            buf.extend_from_slice(&result.account);
            buf.push(result.bump);
            encode_account_fields(
                &mut buf,
                &SolAccountResult {
                    lamports: result.lamports,
                    rent_epoch: result.rent_epoch,
                    executable: result.executable,
                    owner: result.owner,
                    data: result.data.clone(),
                },
            );
        }
        buf
    }

    fn decode_body(data: &[u8]) -> Result<Self, QueryError> {
        let mut reader = Cursor::new(data);
        let (slot_number, block_time_us, block_hash) = decode_block_header(&mut reader)?;
        let num_results = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing result count".into()))?;
        let mut results = Vec::with_capacity(num_results as usize);
        for _ in 0..num_results {
            let mut account = [0u8; 32];
            reader
                .read_exact(&mut account)
                .map_err(|_| QueryError::Malformed("truncated pda account".into()))?;
            let bump = reader
                .read_u8()
                .map_err(|_| QueryError::Malformed("missing bump".into()))?;
            let fields = decode_account_fields(&mut reader)?;
            results.push(SolPdaResult {
                account,
                bump,
                lamports: fields.lamports,
                rent_epoch: fields.rent_epoch,
                executable: fields.executable,
                owner: fields.owner,
                data: fields.data,
            });
        }
        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes in pda response".into()));
        }
        Ok(SolPdaQueryResponse {
            slot_number,
            block_time_us,
            block_hash,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        ChainSpecificQuery, PerChainQueryRequest, SolAccountQueryRequest,
    };
    use crate::COMMITMENT_FINALIZED;

    fn sample_request() -> QueryRequest {
        QueryRequest::new(
            1,
            vec![PerChainQueryRequest {
                chain_id: ChainId::SOLANA,
                query: ChainSpecificQuery::SolAccount(SolAccountQueryRequest {
                    commitment: COMMITMENT_FINALIZED.to_string(),
                    min_context_slot: 0,
                    data_slice_offset: 0,
                    data_slice_length: 0,
                    accounts: vec![[5u8; 32]],
                }),
            }],
        )
    }

    #[test]
    fn test_response_round_trip() {
        let response = QueryResponse {
            request_chain_id: ChainId::ANY,
            request_signature: [0x11; 65],
            request: sample_request(),
            responses: vec![PerChainQueryResponse {
                chain_id: ChainId::SOLANA,
                response: ChainSpecificResponse::SolAccount(SolAccountQueryResponse {
                    slot_number: 240_866_260,
                    block_time_us: 1_700_000_000_000_000,
                    block_hash: [0xcc; 32],
                    results: vec![SolAccountResult {
                        lamports: 1_141_440,
                        rent_epoch: u64::MAX,
                        executable: true,
                        owner: [2u8; 32],
                        data: vec![1, 2, 3, 4],
                    }],
                }),
            }],
        };
        let bytes = response.encode().unwrap();
        assert_eq!(QueryResponse::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_pda_response_round_trip() {
        let response = QueryResponse {
            request_chain_id: ChainId::ANY,
            request_signature: [0x22; 65],
            request: sample_request(),
            responses: vec![PerChainQueryResponse {
                chain_id: ChainId::SOLANA,
                response: ChainSpecificResponse::SolPda(SolPdaQueryResponse {
                    slot_number: 7,
                    block_time_us: 42,
                    block_hash: [0u8; 32],
                    results: vec![SolPdaResult {
                        account: [9u8; 32],
                        bump: 254,
                        lamports: 1,
                        rent_epoch: 2,
                        executable: false,
                        owner: [3u8; 32],
                        data: vec![],
                    }],
                }),
            }],
        };
        let bytes = response.encode().unwrap();
        assert_eq!(QueryResponse::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_response_embeds_request_validation() {
        let response = QueryResponse {
            request_chain_id: ChainId::ANY,
            request_signature: [0u8; 65],
            request: QueryRequest::new(1, vec![]),
            responses: vec![],
        };
        assert_eq!(response.encode(), Err(QueryError::NoPerChainQueries));
    }
}
