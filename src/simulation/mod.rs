//! Simulation of composed relayer multicalls.
//!
//! `Simulator` dispatches a `SimulationRequest` to one of three strategies:
//!
//! - **Tenderly**: hosted simulation with storage overrides that grant the
//!   user unlimited balances and approve the relayer
//! - **VaultModel**: an offline replica of the vault's accounting, run path by path
//! - **Static**: a read-only `eth_call` against a chain provider
//!
//! Every strategy yields a `SimulationOutcome`: one decimal amount per output
//! plus their sum. A strategy whose collaborator is not configured fails
//! before any I/O.

pub mod decoding;
pub mod static_call;
pub mod tenderly;
pub mod vault_model;

pub use decoding::{decode_multicall_results, decode_output_amounts, revert_reason, select_output_amounts};
pub use static_call::{ProviderReadCall, ReadCall, ReadCallRequest};
pub use tenderly::{TenderlyClient, TransactionSimulator};
pub use vault_model::{simulate_paths, VaultModel};

use crate::actions::Action;
use crate::errors::{Result, SimulationError};
use crate::SimulationResult;
use alloy::primitives::{Address, Bytes, U256};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default gas limit for static calls.
pub const DEFAULT_STATIC_GAS_LIMIT: u64 = 8_000_000;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SimulationType {
    Tenderly,
    VaultModel,
    Static,
}

impl FromStr for SimulationType {
    type Err = SimulationError;

    fn from_str(value: &str) -> SimulationResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "tenderly" => Ok(SimulationType::Tenderly),
            "vault_model" | "vaultmodel" | "vault-model" => Ok(SimulationType::VaultModel),
            "static" => Ok(SimulationType::Static),
            _ => Err(SimulationError::UnsupportedSimulationType { value: value.to_string() }),
        }
    }
}

impl fmt::Display for SimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationType::Tenderly => "tenderly",
            SimulationType::VaultModel => "vault_model",
            SimulationType::Static => "static",
        };
        f.write_str(name)
    }
}

/// Everything a strategy may need to simulate one operation.
#[derive(Clone, Debug, Default)]
pub struct SimulationRequest {
    /// Relayer address the multicall is sent to.
    pub to: Address,
    /// Encoded `multicall` calldata.
    pub data: Bytes,
    /// Indices of the multicall results that hold output amounts.
    pub output_indexes: Vec<usize>,
    pub user: Address,
    /// Tokens the user spends; they receive balance and allowance overrides.
    pub tokens_in: Vec<Address>,
    /// Native value sent with the call.
    pub value: U256,
    /// Actions grouped by path, for the vault model.
    pub paths: Vec<Vec<Action>>,
}

/// Output amounts of a simulation as decimal strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub amounts_out: Vec<String>,
    pub total_amount_out: String,
}

impl SimulationOutcome {
    pub fn from_amounts(amounts: &[U256]) -> SimulationResult<Self> {
        let total = amounts.iter().try_fold(U256::ZERO, |total, amount| total.checked_add(*amount)).ok_or(
            SimulationError::ValidationFailed {
                reason: "total output amount overflows uint256".to_string(),
            },
        )?;

        Ok(Self {
            amounts_out: amounts.iter().map(U256::to_string).collect(),
            total_amount_out: total.to_string(),
        })
    }
}

/// Dispatches simulations to the configured strategies.
pub struct Simulator {
    transaction_simulator: Option<Arc<dyn TransactionSimulator>>,
    vault_model: Option<Arc<Mutex<dyn VaultModel>>>,
    read_call: Option<Arc<dyn ReadCall>>,
    static_gas_limit: u64,
}

impl Simulator {
    /// Create a simulator from whichever collaborators are configured.
    ///
    /// # Arguments
    ///
    /// * `transaction_simulator` - Hosted simulator for `SimulationType::Tenderly`
    /// * `vault_model` - Offline vault replica for `SimulationType::VaultModel`
    /// * `read_call` - Chain provider for `SimulationType::Static`
    /// * `static_gas_limit` - Gas limit sent with static calls
    ///
    /// # Returns
    ///
    /// A simulator that fails strategies whose collaborator is `None` before any I/O
    pub fn new(
        transaction_simulator: Option<Arc<dyn TransactionSimulator>>,
        vault_model: Option<Arc<Mutex<dyn VaultModel>>>,
        read_call: Option<Arc<dyn ReadCall>>,
        static_gas_limit: u64,
    ) -> Self {
        Self {
            transaction_simulator,
            vault_model,
            read_call,
            static_gas_limit,
        }
    }

    pub fn supports(&self, simulation_type: SimulationType) -> bool {
        match simulation_type {
            SimulationType::Tenderly => self.transaction_simulator.is_some(),
            SimulationType::VaultModel => self.vault_model.is_some(),
            SimulationType::Static => self.read_call.is_some(),
        }
    }

    /// Runs `request` through the selected strategy.
    ///
    /// # Arguments
    ///
    /// * `request` - Multicall calldata, output indexes and paths to simulate
    /// * `simulation_type` - Strategy to run; no other strategy is touched
    ///
    /// # Returns
    ///
    /// One amount per output plus their sum, or the strategy's error
    pub async fn simulate(&self, request: &SimulationRequest, simulation_type: SimulationType) -> Result<SimulationOutcome> {
        let start_time = std::time::Instant::now();

        tracing::debug!(
            simulation_type = %simulation_type,
            to = %request.to,
            user = %request.user,
            output_indexes = %request.output_indexes.iter().join(","),
            paths = request.paths.len(),
            "Starting simulation"
        );

        let result = match simulation_type {
            SimulationType::Tenderly => self.simulate_tenderly(request).await,
            SimulationType::VaultModel => self.simulate_vault_model(request).await,
            SimulationType::Static => self.simulate_static(request).await,
        };

        let total_duration = start_time.elapsed();
        match result {
            Ok(amounts) => {
                let outcome = SimulationOutcome::from_amounts(&amounts)?;
                tracing::info!(
                    simulation_type = %simulation_type,
                    outputs = outcome.amounts_out.len(),
                    total_amount_out = %outcome.total_amount_out,
                    total_duration_ms = total_duration.as_millis(),
                    "Simulation completed successfully"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    simulation_type = %simulation_type,
                    total_duration_ms = total_duration.as_millis(),
                    "Simulation failed"
                );
                Err(e)
            }
        }
    }

    /// Tenderly reports reverts through the simulation status, so output that
    /// is not `bytes[]` here is a decoding failure.
    async fn simulate_tenderly(&self, request: &SimulationRequest) -> Result<Vec<U256>> {
        let simulator = self
            .transaction_simulator
            .as_ref()
            .ok_or(SimulationError::MissingTenderlyConfig)?;

        let output = simulator.simulate_transaction(request).await?;
        Ok(decode_output_amounts(&output, &request.output_indexes)?)
    }

    async fn simulate_vault_model(&self, request: &SimulationRequest) -> Result<Vec<U256>> {
        let model = self.vault_model.as_ref().ok_or(SimulationError::MissingVaultModel)?;

        let mut model = model.lock().await;
        simulate_paths(&mut *model, &request.paths).await
    }

    /// Providers may hand back revert data as the call output. Output that is
    /// not `bytes[]` is reported as `TransactionReverted` with the decoded reason.
    async fn simulate_static(&self, request: &SimulationRequest) -> Result<Vec<U256>> {
        let read_call = self.read_call.as_ref().ok_or(SimulationError::MissingReadProvider)?;

        let call_start = std::time::Instant::now();
        let output = read_call
            .call(ReadCallRequest {
                from: request.user,
                to: request.to,
                data: request.data.clone(),
                value: request.value,
                gas_limit: self.static_gas_limit,
            })
            .await?;

        tracing::debug!(
            call_duration_ms = call_start.elapsed().as_millis(),
            output_bytes = output.len(),
            "Static call returned"
        );

        let results = match decode_multicall_results(&output) {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    output_bytes = output.len(),
                    "Static call output is not a multicall result, decoding as revert"
                );
                return Err(SimulationError::TransactionReverted {
                    reason: revert_reason(&output),
                }
                .into());
            }
        };

        Ok(select_output_amounts(&results, &request.output_indexes)?)
    }
}
