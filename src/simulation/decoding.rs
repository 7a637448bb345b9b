//! Decoding of relayer multicall results shared by the Tenderly and static strategies.

use crate::errors::SimulationError;
use crate::SimulationResult;
use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolValue;

/// Splits the raw `multicall` return data into per-sub-call results.
pub fn decode_multicall_results(data: &[u8]) -> SimulationResult<Vec<Bytes>> {
    <Vec<Bytes>>::abi_decode(data).map_err(|e| SimulationError::ResultDecodingFailed {
        reason: format!("multicall result is not bytes[]: {e}"),
    })
}

/// Reads one `uint256` from the sub-call result at each of `output_indexes`, in order.
///
/// Out-of-range indices fail rather than yielding zero.
pub fn decode_output_amounts(data: &[u8], output_indexes: &[usize]) -> SimulationResult<Vec<U256>> {
    select_output_amounts(&decode_multicall_results(data)?, output_indexes)
}

/// Same as [`decode_output_amounts`] for results already split by [`decode_multicall_results`].
pub fn select_output_amounts(results: &[Bytes], output_indexes: &[usize]) -> SimulationResult<Vec<U256>> {
    output_indexes
        .iter()
        .map(|&index| {
            let result = results.get(index).ok_or(SimulationError::OutputIndexOutOfRange {
                index,
                available: results.len(),
            })?;
            U256::abi_decode(result).map_err(|e| SimulationError::ResultDecodingFailed {
                reason: format!("result {index} is not a uint256: {e}"),
            })
        })
        .collect()
}

/// Human readable revert reason for `Error(string)`, `Panic(uint256)` and custom error data.
pub fn revert_reason(data: &[u8]) -> String {
    alloy::sol_types::decode_revert_reason(data)
        .unwrap_or_else(|| format!("0x{}", hex::encode(data)))
}
