//! Strategy backed by an offline replica of the vault's accounting.
//!
//! The replica executes the actions of each path and reports per-token
//! deltas from the vault's perspective: positive when the vault receives a
//! token, negative when it pays one out. The amount the user receives is the
//! negated delta of the path's final output token (the root pool's BPT for
//! join paths, the exit token for exit paths).

use crate::actions::{Action, ActionType};
use crate::errors::{Result, SimulationError};
use crate::utils::bigint_to_u256;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use num_bigint::BigInt;
use std::collections::HashMap;

/// Offline model of the vault.
///
/// `is_first_path` lets the model reset its balances before the first path and
/// carry state between the paths of one simulation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VaultModel: Send + Sync {
    async fn multicall(&mut self, requests: &[Action], is_first_path: bool) -> anyhow::Result<HashMap<Address, BigInt>>;
}

/// Runs every path through `model` sequentially and returns one amount per path.
pub async fn simulate_paths(model: &mut dyn VaultModel, paths: &[Vec<Action>]) -> Result<Vec<U256>> {
    let mut amounts = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        let last = path.last().ok_or(SimulationError::EmptySimulationPath { path: index })?;
        let output_token = last
            .output_token()
            .ok_or(SimulationError::EmptySimulationPath { path: index })?;

        let deltas = model.multicall(path, index == 0).await?;

        let delta = deltas.get(&output_token).ok_or(match last.action_type() {
            ActionType::Join => SimulationError::MissingBptDelta { pool: output_token },
            ActionType::Exit | ActionType::BatchSwap => SimulationError::MissingTokenDelta { token: output_token },
        })?;
        let amount = bigint_to_u256(&-delta)?;

        tracing::debug!(
            path = index,
            actions = path.len(),
            output_token = %output_token,
            delta = %delta,
            amount = %amount,
            "Vault model path simulated"
        );
        amounts.push(amount);
    }

    Ok(amounts)
}
