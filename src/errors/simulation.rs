//! Simulation strategy, decoding and vault-model accounting errors.

use alloy::primitives::Address;

/// Errors that can occur during simulation operations
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Unsupported simulation type: {value}")]
    UnsupportedSimulationType { value: String },

    #[error("Tenderly simulation requested but no Tenderly client is configured")]
    MissingTenderlyConfig,

    #[error("Vault model simulation requested but no vault model is configured")]
    MissingVaultModel,

    #[error("Static simulation requested but no read provider is configured")]
    MissingReadProvider,

    #[error("Simulation path {path} contains no actions")]
    EmptySimulationPath { path: usize },

    #[error("Vault model returned no delta for root pool {pool:?}")]
    MissingBptDelta { pool: Address },

    #[error("Vault model returned no delta for output token {token:?}")]
    MissingTokenDelta { token: Address },

    #[error("Output index {index} out of range: multicall returned {available} results")]
    OutputIndexOutOfRange { index: usize, available: usize },

    #[error("Failed to decode simulation result: {reason}")]
    ResultDecodingFailed { reason: String },

    #[error("Transaction reverted: {reason}")]
    TransactionReverted { reason: String },

    #[error("State override encoding failed: {reason}")]
    StateOverrideEncodingFailed { reason: String },

    #[error("Invalid Tenderly response: {reason}")]
    InvalidTenderlyResponse { reason: String },

    #[error("Simulation result validation failed: {reason}")]
    ValidationFailed { reason: String },
}
