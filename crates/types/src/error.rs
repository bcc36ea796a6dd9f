// Path: crates/types/src/error.rs
//! Core error types for the aegis guardian node.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors building or parsing addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The byte length does not match the fixed-size address form.
    #[error("Invalid address length. Expected {expected}, got {got}")]
    InvalidLength {
        /// The required number of bytes.
        expected: usize,
        /// The number of bytes supplied.
        got: usize,
    },
    /// The textual form is not valid hex.
    #[error("Invalid hex address")]
    InvalidHex,
}

impl ErrorCode for AddressError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "ADDR_INVALID_LENGTH",
            Self::InvalidHex => "ADDR_INVALID_HEX",
        }
    }
}

/// Errors decoding or verifying the signed-attestation binary format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaaError {
    /// The byte stream is truncated or otherwise structurally invalid.
    #[error("Malformed VAA: {0}")]
    Malformed(String),
    /// The version byte is not one this implementation understands.
    #[error("Unknown VAA version {0}")]
    UnknownVersion(u8),
    /// Signature guardian indices repeat or are not strictly increasing.
    #[error("Duplicate or unsorted signatures")]
    DuplicateOrUnsortedSignatures,
    /// A signature references a guardian index outside the set.
    #[error("Guardian index {0} out of range for the signing set")]
    IndexOutOfRange(u8),
    /// Fewer signatures than the quorum of the referenced guardian set.
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures {
        /// Signatures present on the VAA.
        have: usize,
        /// The quorum of the referenced set.
        need: usize,
    },
    /// A signature does not recover to the guardian at its index.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

impl ErrorCode for VaaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "VAA_MALFORMED",
            Self::UnknownVersion(_) => "VAA_UNKNOWN_VERSION",
            Self::DuplicateOrUnsortedSignatures => "VAA_DUP_OR_UNSORTED_SIGS",
            Self::IndexOutOfRange(_) => "VAA_INDEX_OUT_OF_RANGE",
            Self::InsufficientSignatures { .. } => "VAA_INSUFFICIENT_SIGS",
            Self::InvalidSignature(_) => "VAA_INVALID_SIGNATURE",
        }
    }
}

/// Errors constructing or parsing governance payload bodies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernanceError {
    /// A guardian-set update carried no keys.
    #[error("empty guardian set specified")]
    EmptyGuardianSet,
    /// A chain id does not fit the 16-bit identifier space.
    #[error("Chain id {0} out of range")]
    ChainOutOfRange(u64),
    /// A fixed-size field had the wrong length.
    #[error("Invalid field length for {field}: expected {expected}, got {got}")]
    InvalidLength {
        /// The offending field.
        field: &'static str,
        /// The required number of bytes.
        expected: usize,
        /// The number of bytes supplied.
        got: usize,
    },
    /// The byte stream is truncated or structurally invalid.
    #[error("Malformed governance body: {0}")]
    Malformed(String),
    /// The (module, action) pair is not a known governance action.
    #[error("Unknown governance action {action} for module {module}")]
    UnknownAction {
        /// The 32-byte module identifier, trimmed for display.
        module: String,
        /// The action code.
        action: u8,
    },
}

impl ErrorCode for GovernanceError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyGuardianSet => "GOV_EMPTY_GUARDIAN_SET",
            Self::ChainOutOfRange(_) => "GOV_CHAIN_OUT_OF_RANGE",
            Self::InvalidLength { .. } => "GOV_INVALID_LENGTH",
            Self::Malformed(_) => "GOV_MALFORMED",
            Self::UnknownAction { .. } => "GOV_UNKNOWN_ACTION",
        }
    }
}

/// Errors decoding or validating cross-chain query requests and responses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The byte stream is truncated or structurally invalid.
    #[error("Malformed query: {0}")]
    Malformed(String),
    /// The version byte is not supported.
    #[error("Unsupported query version {0}")]
    UnsupportedVersion(u8),
    /// A request must carry at least one per-chain query.
    #[error("Query request has no per-chain queries")]
    NoPerChainQueries,
    /// A request carries more per-chain queries than the wire format allows.
    #[error("Too many per-chain queries: {0}")]
    TooManyPerChainQueries(usize),
    /// A per-chain body exceeds the u32 length prefix.
    #[error("Per-chain query body too large: {0} bytes")]
    BodyTooLarge(usize),
    /// The commitment string is not the required value.
    #[error("Invalid commitment {0:?}, must be \"finalized\"")]
    InvalidCommitment(String),
    /// A data slice offset was set without a length.
    #[error("Data slice offset set with zero length")]
    InvalidDataSlice,
    /// An account query lists more accounts than permitted.
    #[error("Too many accounts in query: {0}")]
    TooManyAccounts(usize),
    /// A PDA query lists more program addresses than permitted.
    #[error("Too many PDAs in query: {0}")]
    TooManyPdas(usize),
    /// A PDA carries no seeds or more than the seed cap.
    #[error("Invalid seed count: {0}")]
    InvalidSeedCount(usize),
    /// A PDA seed is empty or longer than the per-seed cap.
    #[error("Invalid seed length: {0}")]
    InvalidSeedLength(usize),
    /// The query type byte is not a known body type.
    #[error("Unknown query type {0}")]
    UnknownQueryType(u8),
}

impl ErrorCode for QueryError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "CCQ_MALFORMED",
            Self::UnsupportedVersion(_) => "CCQ_UNSUPPORTED_VERSION",
            Self::NoPerChainQueries => "CCQ_NO_PER_CHAIN",
            Self::TooManyPerChainQueries(_) => "CCQ_TOO_MANY_PER_CHAIN",
            Self::BodyTooLarge(_) => "CCQ_BODY_TOO_LARGE",
            Self::InvalidCommitment(_) => "CCQ_INVALID_COMMITMENT",
            Self::InvalidDataSlice => "CCQ_INVALID_DATA_SLICE",
            Self::TooManyAccounts(_) => "CCQ_TOO_MANY_ACCOUNTS",
            Self::TooManyPdas(_) => "CCQ_TOO_MANY_PDAS",
            Self::InvalidSeedCount(_) => "CCQ_INVALID_SEED_COUNT",
            Self::InvalidSeedLength(_) => "CCQ_INVALID_SEED_LENGTH",
            Self::UnknownQueryType(_) => "CCQ_UNKNOWN_QUERY_TYPE",
        }
    }
}

/// Errors from the persistent signed-VAA store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error occurred in the storage backend.
    #[error("Store backend error: {0}")]
    Backend(String),
    /// A stored value failed to decode as a VAA.
    #[error("Malformed stored VAA under {key}: {reason}")]
    Malformed {
        /// The message id of the offending key.
        key: String,
        /// The decode failure.
        reason: String,
    },
    /// The requested key was not found in the store.
    #[error("VAA not found in store")]
    KeyNotFound,
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORE_BACKEND_ERROR",
            Self::Malformed { .. } => "STORE_MALFORMED_VALUE",
            Self::KeyNotFound => "STORE_KEY_NOT_FOUND",
        }
    }
}

/// Errors from the chain governor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernorError {
    /// The governor configuration failed to load or validate.
    #[error("Governor configuration error: {0}")]
    Config(String),
    /// An admin operation referenced a pending VAA id that is not held.
    #[error("No pending VAA with id {0}")]
    UnknownPending(String),
    /// A token-bridge transfer amount did not fit the arithmetic range.
    #[error("Transfer amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl ErrorCode for GovernorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "GOVERNOR_CONFIG_ERROR",
            Self::UnknownPending(_) => "GOVERNOR_UNKNOWN_PENDING",
            Self::AmountOutOfRange(_) => "GOVERNOR_AMOUNT_RANGE",
        }
    }
}

/// Errors that terminate the aggregation processor loop.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// A post-quorum persistence failure. Fatal: the supervisor restarts us.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
    /// An input channel closed while the loop was still expected to run.
    #[error("Channel {0} closed")]
    ChannelClosed(&'static str),
    /// The local guardian key failed to produce a signature.
    #[error("Signer failure: {0}")]
    Signer(String),
}

impl ErrorCode for ProcessorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "PROC_STORAGE_FAILURE",
            Self::ChannelClosed(_) => "PROC_CHANNEL_CLOSED",
            Self::Signer(_) => "PROC_SIGNER_FAILURE",
        }
    }
}

/// Fatal startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is absent.
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
    /// A field value is present but unusable.
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value is unusable.
        reason: String,
    },
    /// Two listeners were configured on the same socket.
    #[error("Duplicate socket configured: {0}")]
    DuplicateSocket(String),
    /// Reading a configuration or key file failed.
    #[error("Configuration I/O error: {0}")]
    Io(String),
    /// An environment-specific requirement was not met.
    #[error("Environment requirement failed: {0}")]
    Environment(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "CONFIG_MISSING",
            Self::Invalid { .. } => "CONFIG_INVALID",
            Self::DuplicateSocket(_) => "CONFIG_DUPLICATE_SOCKET",
            Self::Io(_) => "CONFIG_IO",
            Self::Environment(_) => "CONFIG_ENVIRONMENT",
        }
    }
}

/// Errors surfaced to admin RPC callers.
#[derive(Debug, Error)]
pub enum AdminError {
    /// A request argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// More VAA ids were submitted than a single call accepts.
    #[error("Too many VAA ids: got {got}, limit {max}")]
    TooManyVaaIds {
        /// Ids in the request.
        got: usize,
        /// The per-call cap.
        max: usize,
    },
    /// No configured guardian set matches the requested index.
    #[error("Unknown guardian set index {0}")]
    UnknownGuardianSet(u32),
    /// Every backfill node failed or timed out.
    #[error("Backfill failed: {0}")]
    Backfill(String),
    /// A bounded channel toward the processor was full.
    #[error("Channel {0} full")]
    ChannelFull(&'static str),
    /// The operation needs a subsystem this node did not enable.
    #[error("Subsystem not enabled: {0}")]
    NotEnabled(&'static str),
    /// An underlying codec or store failure.
    #[error(transparent)]
    Vaa(#[from] VaaError),
    /// An underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An underlying governor failure.
    #[error(transparent)]
    Governor(#[from] GovernorError),
}

impl ErrorCode for AdminError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "ADMIN_INVALID_ARGUMENT",
            Self::TooManyVaaIds { .. } => "ADMIN_TOO_MANY_VAA_IDS",
            Self::UnknownGuardianSet(_) => "ADMIN_UNKNOWN_GUARDIAN_SET",
            Self::Backfill(_) => "ADMIN_BACKFILL_FAILED",
            Self::ChannelFull(_) => "ADMIN_CHANNEL_FULL",
            Self::NotEnabled(_) => "ADMIN_NOT_ENABLED",
            Self::Vaa(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Governor(e) => e.code(),
        }
    }
}
