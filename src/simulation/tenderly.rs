//! Strategy backed by Tenderly's hosted transaction simulation.
//!
//! A simulation takes two requests:
//!
//! 1. `contracts/encode-states` turns symbolic storage overrides (the user's
//!    token balances and vault allowances, and the vault's relayer approval)
//!    into raw storage slots.
//! 2. `simulate` runs the multicall from the user against those slots and
//!    returns the raw call output.

use crate::config::TenderlyConfig;
use crate::errors::{Result, SimulationError};
use crate::simulation::decoding::revert_reason;
use crate::simulation::SimulationRequest;
use alloy::primitives::{Address, Bytes, I256};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const TENDERLY_API_URL: &str = "https://api.tenderly.co/api/v1";

/// Candidate storage variable names for token balances and vault allowances.
/// Tenderly resolves whichever pair the token contract actually declares.
const BALANCE_SLOTS: [&str; 3] = ["_balances", "balanceOf", "balances"];
const ALLOWANCE_SLOTS: [&str; 3] = ["_allowances", "allowance", "allowed"];
const RESOLVED_TOKEN_SLOTS: usize = 2;

/// Runs a composed multicall in a hosted simulator and returns the raw call output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSimulator: Send + Sync {
    async fn simulate_transaction(&self, request: &SimulationRequest) -> Result<Bytes>;
}

/// Symbolic storage of one contract: `variable[key]... -> value`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStorage {
    pub value: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
struct EncodeStatesRequest<'a> {
    #[serde(rename = "networkID")]
    network_id: &'a str,
    #[serde(rename = "stateOverrides")]
    state_overrides: &'a BTreeMap<String, ContractStorage>,
}

#[derive(Deserialize, Debug)]
struct EncodeStatesResponse {
    #[serde(rename = "stateOverrides")]
    state_overrides: BTreeMap<String, ContractStorage>,
}

#[derive(Serialize, Debug)]
struct StateObject {
    storage: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
struct SimulateRequest {
    network_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_number: Option<u64>,
    from: String,
    to: String,
    input: String,
    value: String,
    save_shared: bool,
    simulation_type: &'static str,
    state_objects: BTreeMap<String, StateObject>,
}

#[derive(Deserialize, Debug)]
struct SimulateResponse {
    transaction: Option<SimulatedTransaction>,
}

#[derive(Deserialize, Debug)]
struct SimulatedTransaction {
    #[serde(default)]
    status: Option<bool>,
    #[serde(default)]
    error_message: Option<String>,
    transaction_info: Option<TransactionInfo>,
}

#[derive(Deserialize, Debug)]
struct TransactionInfo {
    call_trace: Option<CallTrace>,
}

#[derive(Deserialize, Debug)]
struct CallTrace {
    output: Option<Bytes>,
}

fn hex_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Max-balance and max-allowance overrides for every non-native token in `tokens`.
pub fn token_overrides(user: Address, vault: Address, tokens: &[Address]) -> BTreeMap<String, ContractStorage> {
    let max = I256::MAX.to_string();
    let user = hex_address(&user);
    let vault = hex_address(&vault);

    tokens
        .iter()
        .filter(|token| **token != Address::ZERO)
        .map(|token| {
            let mut storage = ContractStorage::default();
            for slot in BALANCE_SLOTS {
                storage.value.insert(format!("{slot}[{user}]"), max.clone());
            }
            for slot in ALLOWANCE_SLOTS {
                storage.value.insert(format!("{slot}[{user}][{vault}]"), max.clone());
            }
            (hex_address(token), storage)
        })
        .collect()
}

/// Marks `relayer` as approved by `user` in the vault's relayer approvals.
pub fn relayer_approval_override(user: Address, vault: Address, relayer: Address) -> (String, ContractStorage) {
    let mut storage = ContractStorage::default();
    storage.value.insert(
        format!("_approvedRelayers[{}][{}]", hex_address(&user), hex_address(&relayer)),
        "true".to_string(),
    );
    (hex_address(&vault), storage)
}

/// Client for the Tenderly simulation API.
pub struct TenderlyClient {
    http_client: HttpClient,
    api_url: String,
    access_key: String,
    network_id: String,
    block_number: Option<u64>,
    timeout: Option<Duration>,
    vault: Address,
    relayer: Address,
}

impl TenderlyClient {
    /// Create a client for the account and project in `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Tenderly credentials, fork block and optional request timeout
    /// * `chain_id` - Network the simulations fork from
    /// * `vault` - Vault whose relayer approval is overridden
    /// * `relayer` - Relayer the multicall is sent to
    ///
    /// # Returns
    ///
    /// A client whose requests only time out when `config.timeout_ms` is set.
    pub fn new(config: &TenderlyConfig, chain_id: u64, vault: Address, relayer: Address) -> Result<Self> {
        let timeout = config.timeout_ms.map(Duration::from_millis);
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            api_url: format!("{TENDERLY_API_URL}/account/{}/project/{}", config.user, config.project),
            access_key: config.access_key.clone(),
            network_id: chain_id.to_string(),
            block_number: config.block_number,
            timeout,
            vault,
            relayer,
        })
    }

    /// Request timeout, if one was configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Points the client at a different API root.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Symbolic overrides for a simulation: token balances/allowances plus relayer approval.
    pub fn state_overrides(&self, user: Address, tokens: &[Address]) -> BTreeMap<String, ContractStorage> {
        let mut overrides = token_overrides(user, self.vault, tokens);
        let (vault, approval) = relayer_approval_override(user, self.vault, self.relayer);
        overrides.entry(vault).or_default().value.extend(approval.value);
        overrides
    }

    /// Resolves symbolic overrides into raw storage slots.
    ///
    /// The response must hold exactly the requested contracts, and every token
    /// must resolve to one balance and one allowance slot.
    pub async fn encode_state_overrides(
        &self,
        overrides: &BTreeMap<String, ContractStorage>,
    ) -> Result<BTreeMap<String, ContractStorage>> {
        let request = EncodeStatesRequest {
            network_id: &self.network_id,
            state_overrides: overrides,
        };
        let response: EncodeStatesResponse = self.send_request("contracts/encode-states", &request).await?;

        validate_encoded_states(overrides, &response.state_overrides, &hex_address(&self.vault))?;
        Ok(response.state_overrides)
    }

    async fn send_request<T: Serialize, R: serde::de::DeserializeOwned>(&self, endpoint: &str, request: &T) -> Result<R> {
        let url = format!("{}/{endpoint}", self.api_url);
        let request_body = serde_json::to_string(request)?;

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("X-Access-Key", &self.access_key)
            .body(request_body)
            .send()
            .await?
            .error_for_status()?;

        let response_text = response.text().await?;
        let parsed = serde_json::from_str(&response_text).map_err(|e| SimulationError::InvalidTenderlyResponse {
            reason: format!("{endpoint}: {e}"),
        })?;
        Ok(parsed)
    }
}

fn validate_encoded_states(
    requested: &BTreeMap<String, ContractStorage>,
    encoded: &BTreeMap<String, ContractStorage>,
    vault: &str,
) -> Result<()> {
    if encoded.len() != requested.len() {
        return Err(SimulationError::StateOverrideEncodingFailed {
            reason: format!("requested {} contracts, received {}", requested.len(), encoded.len()),
        }
        .into());
    }

    for (contract, storage) in encoded {
        if contract.eq_ignore_ascii_case(vault) {
            continue;
        }
        if storage.value.len() != RESOLVED_TOKEN_SLOTS {
            return Err(SimulationError::StateOverrideEncodingFailed {
                reason: format!(
                    "token {contract} resolved {} slots, expected {RESOLVED_TOKEN_SLOTS}",
                    storage.value.len()
                ),
            }
            .into());
        }
    }
    Ok(())
}

fn simulated_output(response: SimulateResponse) -> Result<Bytes> {
    let transaction = response.transaction.ok_or(SimulationError::InvalidTenderlyResponse {
        reason: "missing transaction".to_string(),
    })?;
    let output = transaction
        .transaction_info
        .and_then(|info| info.call_trace)
        .and_then(|trace| trace.output)
        .unwrap_or_default();

    if transaction.status == Some(false) {
        let reason = transaction.error_message.unwrap_or_else(|| revert_reason(&output));
        return Err(SimulationError::TransactionReverted { reason }.into());
    }
    if output.is_empty() {
        return Err(SimulationError::InvalidTenderlyResponse {
            reason: "missing call trace output".to_string(),
        }
        .into());
    }
    Ok(output)
}

#[async_trait]
impl TransactionSimulator for TenderlyClient {
    async fn simulate_transaction(&self, request: &SimulationRequest) -> Result<Bytes> {
        let overrides = self.state_overrides(request.user, &request.tokens_in);
        let encoded = self.encode_state_overrides(&overrides).await?;

        tracing::debug!(
            contracts = encoded.len(),
            user = %request.user,
            "Tenderly state overrides encoded"
        );

        let body = SimulateRequest {
            network_id: self.network_id.clone(),
            block_number: self.block_number,
            from: hex_address(&request.user),
            to: hex_address(&request.to),
            input: format!("0x{}", hex::encode(&request.data)),
            value: request.value.to_string(),
            save_shared: true,
            simulation_type: "quick",
            state_objects: encoded
                .into_iter()
                .map(|(contract, storage)| (contract, StateObject { storage: storage.value }))
                .collect(),
        };

        let response: SimulateResponse = self.send_request("simulate", &body).await?;
        simulated_output(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RelayerError;
    use alloy::primitives::address;
    use serde_json::json;

    const USER: Address = address!("1111111111111111111111111111111111111111");
    const VAULT: Address = address!("ba12222222228d8ba445958a75a0704d566bf2c8");
    const RELAYER: Address = address!("35cea9e57a393ac66aaa7e25c391d52c74b5648f");
    const DAI: Address = address!("6b175474e89094c44da98b954eedeac495271d0f");

    fn client() -> TenderlyClient {
        let config = TenderlyConfig {
            user: "user".to_string(),
            project: "project".to_string(),
            access_key: "key".to_string(),
            block_number: Some(17_000_000),
            timeout_ms: Some(1_000),
        };
        TenderlyClient::new(&config, 1, VAULT, RELAYER).unwrap()
    }

    #[test]
    fn test_default_config_has_no_request_timeout() {
        let config = crate::config::RelayerConfig::for_testing("ethereum").unwrap();
        let tenderly = config.tenderly.unwrap();
        assert_eq!(tenderly.timeout_ms, None);

        let client = TenderlyClient::new(&tenderly, config.chain_id, VAULT, RELAYER).unwrap();
        assert_eq!(client.timeout(), None);
    }

    #[test]
    fn test_explicit_timeout_is_applied() {
        assert_eq!(client().timeout(), Some(Duration::from_millis(1_000)));
    }

    #[test]
    fn test_token_overrides_skip_native_token() {
        let overrides = token_overrides(USER, VAULT, &[Address::ZERO, DAI]);
        assert_eq!(overrides.len(), 1);

        let dai = &overrides["0x6b175474e89094c44da98b954eedeac495271d0f"];
        let max = I256::MAX.to_string();
        assert_eq!(dai.value.len(), 6);
        assert_eq!(dai.value["_balances[0x1111111111111111111111111111111111111111]"], max);
        assert_eq!(
            dai.value["allowed[0x1111111111111111111111111111111111111111][0xba12222222228d8ba445958a75a0704d566bf2c8]"],
            max
        );
    }

    #[test]
    fn test_state_overrides_include_relayer_approval() {
        let overrides = client().state_overrides(USER, &[DAI]);
        let vault = &overrides["0xba12222222228d8ba445958a75a0704d566bf2c8"];
        assert_eq!(
            vault.value["_approvedRelayers[0x1111111111111111111111111111111111111111][0x35cea9e57a393ac66aaa7e25c391d52c74b5648f]"],
            "true"
        );
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_encode_states_request_shape() {
        let overrides = token_overrides(USER, VAULT, &[DAI]);
        let request = EncodeStatesRequest { network_id: "1", state_overrides: &overrides };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["networkID"], json!("1"));
        assert!(value["stateOverrides"]["0x6b175474e89094c44da98b954eedeac495271d0f"]["value"].is_object());
    }

    #[test]
    fn test_validate_encoded_states() {
        let client = client();
        let requested = client.state_overrides(USER, &[DAI]);
        let response: EncodeStatesResponse = serde_json::from_value(json!({
            "stateOverrides": {
                "0x6b175474e89094c44da98b954eedeac495271d0f": {
                    "value": {
                        "0x01": "0x7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                        "0x02": "0x7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
                    }
                },
                "0xba12222222228d8ba445958a75a0704d566bf2c8": {
                    "value": { "0x03": "0x0000000000000000000000000000000000000000000000000000000000000001" }
                }
            }
        }))
        .unwrap();

        assert!(validate_encoded_states(&requested, &response.state_overrides, &hex_address(&VAULT)).is_ok());
    }

    #[test]
    fn test_validate_encoded_states_rejects_partial_token() {
        let client = client();
        let requested = client.state_overrides(USER, &[DAI]);
        let response: EncodeStatesResponse = serde_json::from_value(json!({
            "stateOverrides": {
                "0x6b175474e89094c44da98b954eedeac495271d0f": { "value": { "0x01": "0x01" } },
                "0xba12222222228d8ba445958a75a0704d566bf2c8": { "value": { "0x03": "0x01" } }
            }
        }))
        .unwrap();

        let result = validate_encoded_states(&requested, &response.state_overrides, &hex_address(&VAULT));
        assert!(matches!(
            result,
            Err(RelayerError::Simulation(SimulationError::StateOverrideEncodingFailed { .. }))
        ));
    }

    #[test]
    fn test_validate_encoded_states_rejects_missing_contract() {
        let client = client();
        let requested = client.state_overrides(USER, &[DAI]);
        let response: EncodeStatesResponse = serde_json::from_value(json!({
            "stateOverrides": {
                "0xba12222222228d8ba445958a75a0704d566bf2c8": { "value": { "0x03": "0x01" } }
            }
        }))
        .unwrap();

        assert!(validate_encoded_states(&requested, &response.state_overrides, &hex_address(&VAULT)).is_err());
    }

    #[test]
    fn test_simulated_output_extracts_call_trace() {
        let response: SimulateResponse = serde_json::from_value(json!({
            "transaction": {
                "status": true,
                "transaction_info": { "call_trace": { "output": "0xdeadbeef" } }
            }
        }))
        .unwrap();

        assert_eq!(simulated_output(response).unwrap(), Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn test_simulated_output_reports_revert() {
        let response: SimulateResponse = serde_json::from_value(json!({
            "transaction": {
                "status": false,
                "error_message": "execution reverted: BAL#507",
                "transaction_info": { "call_trace": { "output": "0x" } }
            }
        }))
        .unwrap();

        assert!(matches!(
            simulated_output(response),
            Err(RelayerError::Simulation(SimulationError::TransactionReverted { reason })) if reason.contains("BAL#507")
        ));
    }

    #[test]
    fn test_simulate_request_omits_missing_block() {
        let body = SimulateRequest {
            network_id: "1".to_string(),
            block_number: None,
            from: hex_address(&USER),
            to: hex_address(&RELAYER),
            input: "0x".to_string(),
            value: "0".to_string(),
            save_shared: true,
            simulation_type: "quick",
            state_objects: BTreeMap::new(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("block_number").is_none());
        assert_eq!(value["simulation_type"], json!("quick"));
        assert_eq!(value["save_shared"], json!(true));
    }
}
