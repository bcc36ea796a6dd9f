// Path: crates/ccq/src/request.rs
//! Query request marshaling and validation.

use crate::{
    COMMITMENT_FINALIZED, MAX_ACCOUNTS_PER_QUERY, MAX_COMMITMENT_LEN, MAX_PER_CHAIN_QUERIES,
    MAX_SEEDS_PER_PDA, MAX_SEED_LEN, QUERY_TYPE_SOL_ACCOUNT, QUERY_TYPE_SOL_PDA, VERSION,
};
use aegis_types::error::QueryError;
use aegis_types::ChainId;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// A cross-chain query request: a nonce plus an ordered list of per-chain
/// queries, fanned out to the watchers of each listed chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub nonce: u32,
    pub queries: Vec<PerChainQueryRequest>,
}

/// One chain's share of a query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerChainQueryRequest {
    pub chain_id: ChainId,
    pub query: ChainSpecificQuery,
}

/// The closed set of per-chain query bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainSpecificQuery {
    SolAccount(SolAccountQueryRequest),
    SolPda(SolPdaQueryRequest),
}

impl ChainSpecificQuery {
    pub fn query_type(&self) -> u8 {
        match self {
            ChainSpecificQuery::SolAccount(_) => QUERY_TYPE_SOL_ACCOUNT,
            ChainSpecificQuery::SolPda(_) => QUERY_TYPE_SOL_PDA,
        }
    }
}

/// An account-data lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountQueryRequest {
    /// Must be `"finalized"`; carried on the wire for forward compatibility.
    pub commitment: String,
    pub min_context_slot: u64,
    pub data_slice_offset: u64,
    pub data_slice_length: u64,
    pub accounts: Vec<[u8; 32]>,
}

/// A program-derived-address lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolPdaQueryRequest {
    pub commitment: String,
    pub min_context_slot: u64,
    pub data_slice_offset: u64,
    pub data_slice_length: u64,
    pub pdas: Vec<SolPda>,
}

/// One program address plus derivation seeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolPda {
    pub program_address: [u8; 32],
    pub seeds: Vec<Vec<u8>>,
}

impl QueryRequest {
    pub fn new(nonce: u32, queries: Vec<PerChainQueryRequest>) -> Self {
        QueryRequest { nonce, queries }
    }

    /// Structural validation; `encode` and `decode` both run this.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.queries.is_empty() {
            return Err(QueryError::NoPerChainQueries);
        }
        if self.queries.len() > MAX_PER_CHAIN_QUERIES {
            return Err(QueryError::TooManyPerChainQueries(self.queries.len()));
        }
        for per_chain in &self.queries {
            let body = per_chain.query.encode_body();
            if u32::try_from(body.len()).is_err() {
                return Err(QueryError::BodyTooLarge(body.len()));
            }
            match &per_chain.query {
                ChainSpecificQuery::SolAccount(q) => {
                    validate_solana_header(
                        &q.commitment,
                        q.data_slice_offset,
                        q.data_slice_length,
                    )?;
                    if q.accounts.is_empty() || q.accounts.len() > MAX_ACCOUNTS_PER_QUERY {
                        return Err(QueryError::TooManyAccounts(q.accounts.len()));
                    }
                }
                ChainSpecificQuery::SolPda(q) => {
                    validate_solana_header(
                        &q.commitment,
                        q.data_slice_offset,
                        q.data_slice_length,
                    )?;
                    if q.pdas.is_empty() || q.pdas.len() > MAX_ACCOUNTS_PER_QUERY {
                        return Err(QueryError::TooManyPdas(q.pdas.len()));
                    }
                    for pda in &q.pdas {
                        if pda.seeds.is_empty() || pda.seeds.len() > MAX_SEEDS_PER_PDA {
                            return Err(QueryError::InvalidSeedCount(pda.seeds.len()));
                        }
                        for seed in &pda.seeds {
                            if seed.is_empty() || seed.len() > MAX_SEED_LEN {
                                return Err(QueryError::InvalidSeedLength(seed.len()));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Serializes the request, refusing structurally invalid values.
    pub fn encode(&self) -> Result<Vec<u8>, QueryError> {
        self.validate()?;
        let mut buf = Vec::with_capacity(64);
        buf.push(VERSION);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.push(self.queries.len() as u8);
        for per_chain in &self.queries {
            buf.extend_from_slice(&u16::from(per_chain.chain_id).to_be_bytes());
            buf.push(per_chain.query.query_type());
            let body = per_chain.query.encode_body();
            buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
            buf.extend_from_slice(&body);
        }
        Ok(buf)
    }

    /// Parses and validates a request from wire bytes.
    pub fn decode(data: &[u8]) -> Result<QueryRequest, QueryError> {
        let mut reader = Cursor::new(data);

        let version = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing version".into()))?;
        if version != VERSION {
            return Err(QueryError::UnsupportedVersion(version));
        }

        let nonce = reader
            .read_u32::<BigEndian>()
            .map_err(|_| QueryError::Malformed("missing nonce".into()))?;
        let num_queries = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing query count".into()))?;

        let mut queries = Vec::with_capacity(num_queries as usize);
        for _ in 0..num_queries {
            let chain_id = reader
                .read_u16::<BigEndian>()
                .map_err(|_| QueryError::Malformed("missing chain id".into()))?;
            let query_type = reader
                .read_u8()
                .map_err(|_| QueryError::Malformed("missing query type".into()))?;
            let body_len = reader
                .read_u32::<BigEndian>()
                .map_err(|_| QueryError::Malformed("missing body length".into()))?;
            let mut body = vec![0u8; body_len as usize];
            reader
                .read_exact(&mut body)
                .map_err(|_| QueryError::Malformed("truncated query body".into()))?;

            let query = match query_type {
                QUERY_TYPE_SOL_ACCOUNT => {
                    ChainSpecificQuery::SolAccount(SolAccountQueryRequest::decode_body(&body)?)
                }
                QUERY_TYPE_SOL_PDA => {
                    ChainSpecificQuery::SolPda(SolPdaQueryRequest::decode_body(&body)?)
                }
                other => return Err(QueryError::UnknownQueryType(other)),
            };
            queries.push(PerChainQueryRequest {
                chain_id: ChainId(chain_id),
                query,
            });
        }

        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes".into()));
        }

        let request = QueryRequest { nonce, queries };
        request.validate()?;
        Ok(request)
    }
}

impl ChainSpecificQuery {
    fn encode_body(&self) -> Vec<u8> {
        match self {
            ChainSpecificQuery::SolAccount(q) => q.encode_body(),
            ChainSpecificQuery::SolPda(q) => q.encode_body(),
        }
    }
}

fn validate_solana_header(
    commitment: &str,
    data_slice_offset: u64,
    data_slice_length: u64,
) -> Result<(), QueryError> {
    if commitment.len() > MAX_COMMITMENT_LEN || commitment != COMMITMENT_FINALIZED {
        return Err(QueryError::InvalidCommitment(commitment.to_string()));
    }
    if data_slice_length == 0 && data_slice_offset != 0 {
        return Err(QueryError::InvalidDataSlice);
    }
    Ok(())
}

fn encode_solana_header(
    buf: &mut Vec<u8>,
    commitment: &str,
    min_context_slot: u64,
    data_slice_offset: u64,
    data_slice_length: u64,
) {
    buf.extend_from_slice(&(commitment.len() as u32).to_be_bytes());
    buf.extend_from_slice(commitment.as_bytes());
    buf.extend_from_slice(&min_context_slot.to_be_bytes());
    buf.extend_from_slice(&data_slice_offset.to_be_bytes());
    buf.extend_from_slice(&data_slice_length.to_be_bytes());
}

fn decode_solana_header(
    reader: &mut Cursor<&[u8]>,
) -> Result<(String, u64, u64, u64), QueryError> {
    let commitment_len = reader
        .read_u32::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing commitment length".into()))?;
    if commitment_len as usize > MAX_COMMITMENT_LEN {
        return Err(QueryError::InvalidCommitment(format!(
            "{} bytes",
            commitment_len
        )));
    }
    let mut commitment_raw = vec![0u8; commitment_len as usize];
    reader
        .read_exact(&mut commitment_raw)
        .map_err(|_| QueryError::Malformed("truncated commitment".into()))?;
    let commitment = String::from_utf8(commitment_raw)
        .map_err(|_| QueryError::Malformed("commitment is not utf-8".into()))?;

    let min_context_slot = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing min context slot".into()))?;
    let data_slice_offset = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing data slice offset".into()))?;
    let data_slice_length = reader
        .read_u64::<BigEndian>()
        .map_err(|_| QueryError::Malformed("missing data slice length".into()))?;

    Ok((
        commitment,
        min_context_slot,
        data_slice_offset,
        data_slice_length,
    ))
}

impl SolAccountQueryRequest {
    fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(37 + self.accounts.len() * 32);
        encode_solana_header(
            &mut buf,
            &self.commitment,
            self.min_context_slot,
            self.data_slice_offset,
            self.data_slice_length,
        );
        buf.push(self.accounts.len() as u8);
        for account in &self.accounts {
            buf.extend_from_slice(account);
        }
        buf
    }

    fn decode_body(data: &[u8]) -> Result<Self, QueryError> {
        let mut reader = Cursor::new(data);
        let (commitment, min_context_slot, data_slice_offset, data_slice_length) =
            decode_solana_header(&mut reader)?;

        let num_accounts = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing account count".into()))?;
        let mut accounts = Vec::with_capacity(num_accounts as usize);
        for _ in 0..num_accounts {
            let mut account = [0u8; 32];
            reader
                .read_exact(&mut account)
                .map_err(|_| QueryError::Malformed("truncated account".into()))?;
            accounts.push(account);
        }

        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes in account query".into()));
        }

        Ok(SolAccountQueryRequest {
            commitment,
            min_context_slot,
            data_slice_offset,
            data_slice_length,
            accounts,
        })
    }
}

impl SolPdaQueryRequest {
    fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(37 + self.pdas.len() * 48);
        encode_solana_header(
            &mut buf,
            &self.commitment,
            self.min_context_slot,
            self.data_slice_offset,
            self.data_slice_length,
        );
        buf.push(self.pdas.len() as u8);
        for pda in &self.pdas {
            buf.extend_from_slice(&pda.program_address);
            buf.push(pda.seeds.len() as u8);
            for seed in &pda.seeds {
                buf.extend_from_slice(&(seed.len() as u32).to_be_bytes());
                buf.extend_from_slice(seed);
            }
        }
        buf
    }

    fn decode_body(data: &[u8]) -> Result<Self, QueryError> {
        let mut reader = Cursor::new(data);
        let (commitment, min_context_slot, data_slice_offset, data_slice_length) =
            decode_solana_header(&mut reader)?;

        let num_pdas = reader
            .read_u8()
            .map_err(|_| QueryError::Malformed("missing pda count".into()))?;
        let mut pdas = Vec::with_capacity(num_pdas as usize);
        for _ in 0..num_pdas {
            let mut program_address = [0u8; 32];
            reader
                .read_exact(&mut program_address)
                .map_err(|_| QueryError::Malformed("truncated program address".into()))?;
            let num_seeds = reader
                .read_u8()
                .map_err(|_| QueryError::Malformed("missing seed count".into()))?;
            let mut seeds = Vec::with_capacity(num_seeds as usize);
            for _ in 0..num_seeds {
                let seed_len = reader
                    .read_u32::<BigEndian>()
                    .map_err(|_| QueryError::Malformed("missing seed length".into()))?;
                if seed_len as usize > MAX_SEED_LEN {
                    return Err(QueryError::InvalidSeedLength(seed_len as usize));
                }
                let mut seed = vec![0u8; seed_len as usize];
                reader
                    .read_exact(&mut seed)
                    .map_err(|_| QueryError::Malformed("truncated seed".into()))?;
                seeds.push(seed);
            }
            pdas.push(SolPda {
                program_address,
                seeds,
            });
        }

        if reader.position() != data.len() as u64 {
            return Err(QueryError::Malformed("trailing bytes in pda query".into()));
        }

        Ok(SolPdaQueryRequest {
            commitment,
            min_context_slot,
            data_slice_offset,
            data_slice_length,
            pdas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized_account_query(accounts: Vec<[u8; 32]>) -> QueryRequest {
        QueryRequest::new(
            42,
            vec![PerChainQueryRequest {
                chain_id: ChainId::SOLANA,
                query: ChainSpecificQuery::SolAccount(SolAccountQueryRequest {
                    commitment: COMMITMENT_FINALIZED.to_string(),
                    min_context_slot: 0,
                    data_slice_offset: 0,
                    data_slice_length: 0,
                    accounts,
                }),
            }],
        )
    }

    #[test]
    fn test_decode_vector() {
        let raw = hex::decode(concat!(
            "010000002a01000104000000660000000966696e616c697a65640000000000",
            "0000000000000000000000000000000000000000000202c806312cbe5b79ef",
            "8aa6c17e3f423d8fdfe1d46909fb1f6cdf65ee8e2e6faa95f83a27e90c622a",
            "98c037353f271fd8f5f57b4dc18ebf5ff75a934724bd0491"
        ))
        .unwrap();
        let request = QueryRequest::decode(&raw).unwrap();

        assert_eq!(request.nonce, 42);
        assert_eq!(request.queries.len(), 1);
        assert_eq!(request.queries[0].chain_id, ChainId::SOLANA);
        let ChainSpecificQuery::SolAccount(ref q) = request.queries[0].query else {
            panic!("expected an account query");
        };
        assert_eq!(q.commitment, "finalized");
        assert_eq!(q.min_context_slot, 0);
        assert_eq!(q.data_slice_offset, 0);
        assert_eq!(q.data_slice_length, 0);
        assert_eq!(q.accounts.len(), 2);
        assert_eq!(
            hex::encode(q.accounts[0]),
            "02c806312cbe5b79ef8aa6c17e3f423d8fdfe1d46909fb1f6cdf65ee8e2e6faa"
        );
        assert_eq!(
            hex::encode(q.accounts[1]),
            "95f83a27e90c622a98c037353f271fd8f5f57b4dc18ebf5ff75a934724bd0491"
        );

        assert_eq!(request.encode().unwrap(), raw);
    }

    #[test]
    fn test_round_trip_pda() {
        let request = QueryRequest::new(
            7,
            vec![PerChainQueryRequest {
                chain_id: ChainId::SOLANA,
                query: ChainSpecificQuery::SolPda(SolPdaQueryRequest {
                    commitment: COMMITMENT_FINALIZED.to_string(),
                    min_context_slot: 12345,
                    data_slice_offset: 8,
                    data_slice_length: 32,
                    pdas: vec![SolPda {
                        program_address: [0xab; 32],
                        seeds: vec![b"GuardianSet".to_vec(), vec![0, 0, 0, 1]],
                    }],
                }),
            }],
        );
        let bytes = request.encode().unwrap();
        assert_eq!(QueryRequest::decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_rejects_empty_request() {
        let request = QueryRequest::new(1, vec![]);
        assert_eq!(request.encode(), Err(QueryError::NoPerChainQueries));
    }

    #[test]
    fn test_rejects_wrong_commitment() {
        let mut request = finalized_account_query(vec![[0u8; 32]]);
        let ChainSpecificQuery::SolAccount(ref mut q) = request.queries[0].query else {
            unreachable!()
        };
        q.commitment = "confirmed".to_string();
        assert!(matches!(
            request.encode(),
            Err(QueryError::InvalidCommitment(_))
        ));
    }

    #[test]
    fn test_rejects_dangling_data_slice_offset() {
        let mut request = finalized_account_query(vec![[0u8; 32]]);
        let ChainSpecificQuery::SolAccount(ref mut q) = request.queries[0].query else {
            unreachable!()
        };
        q.data_slice_offset = 4;
        assert_eq!(request.encode(), Err(QueryError::InvalidDataSlice));
    }

    #[test]
    fn test_rejects_too_many_accounts() {
        let request = finalized_account_query(vec![[0u8; 32]; 101]);
        assert_eq!(request.encode(), Err(QueryError::TooManyAccounts(101)));
    }

    #[test]
    fn test_rejects_bad_seeds() {
        let mut pda = SolPda {
            program_address: [1u8; 32],
            seeds: vec![],
        };
        let make = |pda: SolPda| {
            QueryRequest::new(
                1,
                vec![PerChainQueryRequest {
                    chain_id: ChainId::SOLANA,
                    query: ChainSpecificQuery::SolPda(SolPdaQueryRequest {
                        commitment: COMMITMENT_FINALIZED.to_string(),
                        min_context_slot: 0,
                        data_slice_offset: 0,
                        data_slice_length: 0,
                        pdas: vec![pda],
                    }),
                }],
            )
        };

        assert_eq!(
            make(pda.clone()).encode(),
            Err(QueryError::InvalidSeedCount(0))
        );

        pda.seeds = vec![vec![0u8; 33]];
        assert_eq!(make(pda).encode(), Err(QueryError::InvalidSeedLength(33)));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = finalized_account_query(vec![[0u8; 32]])
            .encode()
            .unwrap();
        bytes[0] = 2;
        assert_eq!(
            QueryRequest::decode(&bytes),
            Err(QueryError::UnsupportedVersion(2))
        );
    }
}
