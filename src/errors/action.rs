//! Action construction and merging errors.

use alloy::primitives::Address;

/// Errors raised while building relayer actions from caller input.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Asset index {index} out of range for {assets} assets")]
    AssetIndexOutOfRange { index: usize, assets: usize },

    #[error("Token {token:?} is not part of the pool tokens")]
    TokenNotInPool { token: Address },

    #[error("Slippage of {slippage_bps} bps exceeds 10000 bps")]
    InvalidSlippage { slippage_bps: u32 },

    #[error("Swap action contains no swap steps")]
    EmptySwap,

    #[error("Swaps cannot be merged: {reason}")]
    IncompatibleSwaps { reason: String },
}
