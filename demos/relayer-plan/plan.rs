//! JSON plan file for the demo.

use alloy::primitives::{Address, Bytes, B256, U256};
use balancer_relayer_orchestrator::actions::{
    Action, ExitParams, JoinParams, OperationTokens, PoolId, PoolKind, SwapParams,
};
use balancer_relayer_orchestrator::errors::{ConfigError, Result};
use balancer_relayer_orchestrator::utils::string_to_address;
use balancer_relayer_orchestrator::ActionPlanBuilder;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

#[derive(Deserialize, Debug)]
pub struct PlanFile {
    pub token_in_index: usize,
    pub token_out_index: usize,
    /// Operation-wide asset list. Action asset indices refer to it.
    pub assets: Vec<String>,
    pub actions: Vec<PlanAction>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanAction {
    Join {
        pool_id: String,
        #[serde(default)]
        pool_kind: Option<String>,
        pool_tokens: Vec<String>,
        token_in: String,
        asset_in_index: usize,
        asset_out_index: usize,
        amount_in: String,
        expected_bpt_out: String,
        slippage_bps: u32,
        #[serde(default)]
        is_bpt_in: bool,
    },
    Exit {
        pool_id: String,
        #[serde(default)]
        pool_kind: Option<String>,
        pool_tokens: Vec<String>,
        token_out: String,
        asset_in_index: usize,
        asset_out_index: usize,
        bpt_amount_in: String,
        expected_amount_out: String,
        slippage_bps: u32,
    },
    Swap {
        pool_id: String,
        asset_in_index: usize,
        asset_out_index: usize,
        amount_in: String,
        expected_amount_out: String,
        slippage_bps: u32,
        #[serde(default)]
        is_bpt_in: bool,
        #[serde(default)]
        is_bpt_out: bool,
    },
}

/// A plan resolved into typed addresses, ready to build.
pub struct LoadedPlan {
    pub operation: OperationTokens,
    pub assets: Vec<Address>,
    pub actions: Vec<PlanAction>,
}

pub fn load(path: &Path) -> Result<LoadedPlan> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
        name: "plan".to_string(),
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let file: PlanFile = serde_json::from_str(&contents)?;

    let assets = file.assets.iter().map(|a| string_to_address(a)).collect::<Result<Vec<_>>>()?;
    tracing::info!(
        assets = assets.len(),
        actions = file.actions.len(),
        token_in_index = file.token_in_index,
        token_out_index = file.token_out_index,
        "Plan loaded"
    );

    Ok(LoadedPlan {
        operation: OperationTokens::new(file.token_in_index, file.token_out_index),
        assets,
        actions: file.actions,
    })
}

impl LoadedPlan {
    /// Actions in file order with chained references allocated.
    pub fn build(&self) -> Result<Vec<Action>> {
        let mut builder =
            ActionPlanBuilder::new(self.operation).with_asset_count(self.assets.len()).with_output_peeks();

        for action in &self.actions {
            builder = match action {
                PlanAction::Join {
                    pool_id,
                    pool_kind,
                    pool_tokens,
                    token_in,
                    asset_in_index,
                    asset_out_index,
                    amount_in,
                    expected_bpt_out,
                    slippage_bps,
                    is_bpt_in,
                } => builder.join(JoinParams {
                    pool_id: parse_pool_id(pool_id)?,
                    pool_kind: parse_pool_kind(pool_kind.as_deref())?,
                    pool_tokens: parse_addresses(pool_tokens)?,
                    token_in: string_to_address(token_in)?,
                    asset_in_index: *asset_in_index,
                    asset_out_index: *asset_out_index,
                    amount_in: parse_amount("amount_in", amount_in)?,
                    expected_bpt_out: parse_amount("expected_bpt_out", expected_bpt_out)?,
                    slippage_bps: *slippage_bps,
                    is_bpt_in: *is_bpt_in,
                })?,
                PlanAction::Exit {
                    pool_id,
                    pool_kind,
                    pool_tokens,
                    token_out,
                    asset_in_index,
                    asset_out_index,
                    bpt_amount_in,
                    expected_amount_out,
                    slippage_bps,
                } => builder.exit(ExitParams {
                    pool_id: parse_pool_id(pool_id)?,
                    pool_kind: parse_pool_kind(pool_kind.as_deref())?,
                    pool_tokens: parse_addresses(pool_tokens)?,
                    token_out: string_to_address(token_out)?,
                    asset_in_index: *asset_in_index,
                    asset_out_index: *asset_out_index,
                    bpt_amount_in: parse_amount("bpt_amount_in", bpt_amount_in)?,
                    expected_amount_out: parse_amount("expected_amount_out", expected_amount_out)?,
                    slippage_bps: *slippage_bps,
                })?,
                PlanAction::Swap {
                    pool_id,
                    asset_in_index,
                    asset_out_index,
                    amount_in,
                    expected_amount_out,
                    slippage_bps,
                    is_bpt_in,
                    is_bpt_out,
                } => builder.swap(SwapParams {
                    pool_id: parse_pool_id(pool_id)?,
                    assets: self.assets.clone(),
                    asset_in_index: *asset_in_index,
                    asset_out_index: *asset_out_index,
                    amount_in: parse_amount("amount_in", amount_in)?,
                    expected_amount_out: parse_amount("expected_amount_out", expected_amount_out)?,
                    slippage_bps: *slippage_bps,
                    is_bpt_in: *is_bpt_in,
                    is_bpt_out: *is_bpt_out,
                    user_data: Bytes::new(),
                })?,
            };
        }

        Ok(builder.build())
    }
}

fn parse_addresses(values: &[String]) -> Result<Vec<Address>> {
    values.iter().map(|v| string_to_address(v)).collect()
}

fn parse_pool_id(value: &str) -> Result<PoolId> {
    B256::from_str(value).map(PoolId).map_err(|e| {
        ConfigError::InvalidValue { name: "pool_id".to_string(), message: format!("{value}: {e}") }.into()
    })
}

fn parse_amount(name: &str, value: &str) -> Result<U256> {
    U256::from_str(value).map_err(|e| {
        ConfigError::InvalidValue { name: name.to_string(), message: format!("{value}: {e}") }.into()
    })
}

fn parse_pool_kind(value: Option<&str>) -> Result<PoolKind> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("weighted") => Ok(PoolKind::Weighted),
        Some("legacy_stable") => Ok(PoolKind::LegacyStable),
        Some("composable_stable") => Ok(PoolKind::ComposableStable),
        Some("composable_stable_v2") => Ok(PoolKind::ComposableStableV2),
        Some(other) => Err(ConfigError::InvalidValue {
            name: "pool_kind".to_string(),
            message: format!("unknown pool kind {other}"),
        }
        .into()),
    }
}
