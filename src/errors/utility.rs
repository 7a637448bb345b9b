//! Utility function errors

use thiserror::Error;

/// Errors that can occur in utility functions
#[derive(Debug, Error)]
pub enum UtilityError {
    #[error("Failed to parse address from string '{input}': {source}")]
    AddressParsingFailed {
        input: String,
        #[source]
        source: alloy::primitives::AddressError,
    },

    #[error("BigInt value too large to fit in U256")]
    ValueTooLarge,

    #[error("Negative value {value} cannot be represented as U256")]
    NegativeValue { value: String },

    #[error("Unsupported chain: {chain}")]
    UnsupportedChain { chain: String },

    #[error("No relayer deployment known for chain: {chain}")]
    UnknownRelayer { chain: String },
}
