//! Configuration management for the relayer orchestration library.
//!
//! Loads chain, contract and simulation settings from environment variables
//! and validates them before any client is built.

use crate::errors::{ConfigError, RelayerError, Result, UtilityError};
use crate::simulation::DEFAULT_STATIC_GAS_LIMIT;
use alloy::primitives::Address;
use std::env;

/// Credentials and options for the Tenderly simulation API.
#[derive(Clone)]
pub struct TenderlyConfig {
    pub user: String,
    pub project: String,
    pub access_key: String,
    /// Block to fork from; latest when unset.
    pub block_number: Option<u64>,
    /// Request timeout; requests may take as long as the service needs when unset.
    pub timeout_ms: Option<u64>,
}

impl std::fmt::Debug for TenderlyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenderlyConfig")
            .field("user", &self.user)
            .field("project", &self.project)
            .field("access_key", &"***")
            .field("block_number", &self.block_number)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Main configuration structure for relayer orchestration.
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    pub chain: String,
    pub chain_id: u64,
    /// JSON-RPC endpoint for static simulations.
    pub rpc_url: Option<String>,
    pub vault_address: Address,
    pub relayer_address: Address,
    pub tenderly: Option<TenderlyConfig>,
    /// Gas limit used for static calls.
    pub static_gas_limit: u64,
}

impl RelayerConfig {
    /// Create a new configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// All optional:
    /// - `RELAYER_RPC_URL`: RPC URL for static simulations
    /// - `RELAYER_VAULT_ADDRESS`: vault override (default: Balancer V2 vault)
    /// - `RELAYER_ADDRESS`: relayer override; required on chains without a known deployment
    /// - `TENDERLY_USER`, `TENDERLY_PROJECT`, `TENDERLY_ACCESS_KEY`: all or none
    /// - `TENDERLY_BLOCK_NUMBER`: block to fork from
    /// - `TENDERLY_TIMEOUT_MS`: request timeout (default: none)
    /// - `RELAYER_STATIC_GAS_LIMIT`: gas limit for static calls (default: 8000000)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The chain is not supported
    /// - An address or URL is malformed
    /// - The Tenderly variables are only partially set
    /// - A numeric value does not parse or is zero
    pub fn from_env(chain: &str) -> Result<Self> {
        tracing::info!(chain = chain, "Loading relayer configuration from environment");

        let chain_id = crate::utils::chain_id(chain)?;

        let rpc_url = match env::var("RELAYER_RPC_URL") {
            Ok(rpc_url) => {
                let parsed = Self::validate_url(&rpc_url, "RELAYER_RPC_URL")?;
                tracing::debug!(rpc_url = %redacted_url(&parsed), "RPC URL loaded from environment");
                Some(rpc_url)
            }
            Err(_) => {
                tracing::debug!("RELAYER_RPC_URL not set, static simulation unavailable");
                None
            }
        };

        let vault_address = match env::var("RELAYER_VAULT_ADDRESS") {
            Ok(custom_address) => {
                tracing::debug!(custom_address = %custom_address, "Using custom vault address from environment");
                Self::parse_and_validate_address(&custom_address, "RELAYER_VAULT_ADDRESS")?
            }
            Err(_) => crate::utils::VAULT_ADDRESS,
        };

        let relayer_address = match env::var("RELAYER_ADDRESS") {
            Ok(custom_address) => {
                tracing::debug!(custom_address = %custom_address, "Using custom relayer address from environment");
                Self::parse_and_validate_address(&custom_address, "RELAYER_ADDRESS")?
            }
            Err(_) => match crate::utils::relayer_address(chain) {
                Ok(address) => address,
                Err(RelayerError::Utility(UtilityError::UnknownRelayer { .. })) => {
                    tracing::error!(chain = chain, "No default relayer for chain and RELAYER_ADDRESS not set");
                    return Err(ConfigError::MissingVariable {
                        name: "RELAYER_ADDRESS".to_string(),
                    }
                    .into());
                }
                Err(e) => return Err(e),
            },
        };

        let tenderly = Self::tenderly_from_env()?;

        let static_gas_limit = match env::var("RELAYER_STATIC_GAS_LIMIT") {
            Ok(value) => Self::parse_positive(&value, "RELAYER_STATIC_GAS_LIMIT")?,
            Err(_) => DEFAULT_STATIC_GAS_LIMIT,
        };

        let config = Self {
            chain: chain.to_string(),
            chain_id,
            rpc_url,
            vault_address,
            relayer_address,
            tenderly,
            static_gas_limit,
        };

        tracing::info!(
            chain = chain,
            chain_id = chain_id,
            vault_address = %config.vault_address,
            relayer_address = %config.relayer_address,
            has_rpc_url = config.rpc_url.is_some(),
            has_tenderly = config.tenderly.is_some(),
            static_gas_limit = config.static_gas_limit,
            "Relayer configuration loaded successfully"
        );

        Ok(config)
    }

    /// Create a configuration for testing purposes with default addresses and
    /// a dummy Tenderly section.
    #[cfg(test)]
    pub fn for_testing(chain: &str) -> Result<Self> {
        Ok(Self {
            chain: chain.to_string(),
            chain_id: crate::utils::chain_id(chain)?,
            rpc_url: None,
            vault_address: crate::utils::VAULT_ADDRESS,
            relayer_address: crate::utils::MAINNET_RELAYER_ADDRESS,
            tenderly: Some(TenderlyConfig {
                user: "test-user".to_string(),
                project: "test-project".to_string(),
                access_key: "test-key".to_string(),
                block_number: None,
                timeout_ms: None,
            }),
            static_gas_limit: DEFAULT_STATIC_GAS_LIMIT,
        })
    }

    fn tenderly_from_env() -> Result<Option<TenderlyConfig>> {
        let user = env::var("TENDERLY_USER").ok();
        let project = env::var("TENDERLY_PROJECT").ok();
        let access_key = env::var("TENDERLY_ACCESS_KEY").ok();

        let (user, project, access_key) = match (user, project, access_key) {
            (Some(user), Some(project), Some(access_key)) => (user, project, access_key),
            (None, None, None) => {
                tracing::debug!("Tenderly not configured");
                return Ok(None);
            }
            (user, project, access_key) => {
                let missing = [
                    ("TENDERLY_USER", user.is_none()),
                    ("TENDERLY_PROJECT", project.is_none()),
                    ("TENDERLY_ACCESS_KEY", access_key.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
                .join(", ");
                return Err(ConfigError::IncompleteTenderly {
                    message: format!("missing {missing}"),
                }
                .into());
            }
        };

        for (name, value) in [("TENDERLY_USER", &user), ("TENDERLY_PROJECT", &project), ("TENDERLY_ACCESS_KEY", &access_key)] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: "cannot be empty".to_string(),
                }
                .into());
            }
        }

        let block_number = match env::var("TENDERLY_BLOCK_NUMBER") {
            Ok(value) => Some(Self::parse_positive(&value, "TENDERLY_BLOCK_NUMBER")?),
            Err(_) => None,
        };
        let timeout_ms = match env::var("TENDERLY_TIMEOUT_MS") {
            Ok(value) => Some(Self::parse_positive(&value, "TENDERLY_TIMEOUT_MS")?),
            Err(_) => None,
        };

        tracing::debug!(
            user = %user,
            project = %project,
            access_key = "***",
            block_number = ?block_number,
            timeout_ms = ?timeout_ms,
            "Tenderly configuration loaded"
        );

        Ok(Some(TenderlyConfig {
            user,
            project,
            access_key,
            block_number,
            timeout_ms,
        }))
    }

    fn parse_positive(value: &str, var_name: &str) -> Result<u64> {
        match value.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            Ok(_) => Err(ConfigError::InvalidValue {
                name: var_name.to_string(),
                message: "must be greater than zero".to_string(),
            }
            .into()),
            Err(e) => Err(ConfigError::InvalidValue {
                name: var_name.to_string(),
                message: format!("'{value}' is not a valid integer: {e}"),
            }
            .into()),
        }
    }

    /// Parse and validate an Ethereum address from a string
    fn parse_and_validate_address(address_str: &str, var_name: &str) -> Result<Address> {
        crate::utils::string_to_address(address_str).map_err(|e| {
            ConfigError::InvalidValue {
                name: var_name.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn validate_url(value: &str, var_name: &str) -> Result<url::Url> {
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: var_name.to_string(),
                message: "cannot be empty".to_string(),
            }
            .into());
        }
        let url = url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
            name: var_name.to_string(),
            message: format!("invalid URL format: {e}"),
        })?;
        Ok(url)
    }
}

/// Scheme, host and port only. Paths, queries and credentials often carry API keys.
fn redacted_url(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}
