//! Error handling for the relayer orchestration library.
//!
//! The error system is split by domain so that callers can match on the part of
//! the pipeline that failed:
//!
//! - **`ActionError`**: malformed input while constructing or merging actions
//! - **`SimulationError`**: strategy configuration, result decoding and replica
//!   accounting failures
//! - **`ConfigError`**: missing or invalid environment configuration
//! - **`UtilityError`**: address parsing, chain lookup and numeric conversions
//!
//! # Top-Level Error Type
//!
//! `RelayerError` wraps every domain error plus the errors of the external
//! collaborators (HTTP, JSON, RPC transport, ABI decoding). Upstream I/O errors are
//! carried through unmodified; nothing in this crate retries.
//!
//! Ordering, classification and batching never fail. Only action construction,
//! encoding and simulation return errors.

pub mod action;
pub mod config;
pub mod simulation;
pub mod utility;

pub use action::ActionError;
pub use config::ConfigError;
pub use simulation::SimulationError;
pub use utility::UtilityError;

/// Main result type for the library
pub type Result<T> = std::result::Result<T, RelayerError>;

/// Top-level error enum that encompasses all possible errors in the library.
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    /// Invalid action construction input.
    ///
    /// Raised when an action references assets that do not exist, carries an
    /// out-of-range slippage, or when two incompatible swaps are merged.
    #[error("Action construction failed: {0}")]
    Action(#[from] ActionError),

    /// Error while simulating a composed multicall.
    ///
    /// Covers configuration errors (unsupported strategy, missing collaborator),
    /// data-consistency errors from the vault model and result decoding failures.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error in utility functions or type conversions.
    #[error("Utility error: {0}")]
    Utility(#[from] UtilityError),

    /// Network communication error with the remote simulation service.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hexadecimal string parsing error.
    #[error("Hex parsing error: {0}")]
    HexParsing(#[from] alloy::hex::FromHexError),

    /// ABI encoding or decoding error.
    #[error("ABI error: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    /// RPC communication error with the chain read provider.
    #[error("RPC error: {0}")]
    Rpc(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),

    /// Errors raised by external engines (e.g. a vault model implementation).
    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}
