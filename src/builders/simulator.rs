//! Builder pattern for Simulator

use crate::config::RelayerConfig;
use crate::errors::Result;
use crate::simulation::{
    ProviderReadCall, ReadCall, Simulator, TenderlyClient, TransactionSimulator, VaultModel, DEFAULT_STATIC_GAS_LIMIT,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Builder for creating Simulator instances with a fluent API
pub struct SimulatorBuilder {
    transaction_simulator: Option<Arc<dyn TransactionSimulator>>,
    vault_model: Option<Arc<Mutex<dyn VaultModel>>>,
    read_call: Option<Arc<dyn ReadCall>>,
    static_gas_limit: u64,
}

impl SimulatorBuilder {
    /// Create a builder with no strategies configured
    pub fn new() -> Self {
        Self {
            transaction_simulator: None,
            vault_model: None,
            read_call: None,
            static_gas_limit: DEFAULT_STATIC_GAS_LIMIT,
        }
    }

    /// Create a SimulatorBuilder from a RelayerConfig
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration for one chain
    ///
    /// # Returns
    ///
    /// A builder with every strategy the configuration supports
    ///
    /// Configures the Tenderly strategy when the config has Tenderly
    /// credentials and the static strategy when it has an RPC URL. The vault
    /// model is never part of the configuration; add it with `with_vault_model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the RPC provider cannot be created.
    pub fn from_config(config: &RelayerConfig) -> Result<Self> {
        let mut builder = Self::new().with_static_gas_limit(config.static_gas_limit);

        if let Some(tenderly) = &config.tenderly {
            let client = TenderlyClient::new(tenderly, config.chain_id, config.vault_address, config.relayer_address)?;
            builder = builder.with_transaction_simulator(Arc::new(client));
        }
        if let Some(rpc_url) = &config.rpc_url {
            builder = builder.with_read_call(Arc::new(ProviderReadCall::from_url(rpc_url)?));
        }

        Ok(builder)
    }

    /// Set the hosted transaction simulator
    pub fn with_transaction_simulator(mut self, simulator: Arc<dyn TransactionSimulator>) -> Self {
        self.transaction_simulator = Some(simulator);
        self
    }

    /// Set the offline vault model
    pub fn with_vault_model<M: VaultModel + 'static>(mut self, model: M) -> Self {
        self.vault_model = Some(Arc::new(Mutex::new(model)));
        self
    }

    /// Set the read-only call provider
    pub fn with_read_call(mut self, read_call: Arc<dyn ReadCall>) -> Self {
        self.read_call = Some(read_call);
        self
    }

    /// Gas limit for static calls
    pub fn with_static_gas_limit(mut self, gas_limit: u64) -> Self {
        self.static_gas_limit = gas_limit;
        self
    }

    /// Build the Simulator
    ///
    /// # Returns
    ///
    /// A `Simulator` that supports exactly the strategies configured on this builder
    pub fn build(self) -> Simulator {
        Simulator::new(
            self.transaction_simulator,
            self.vault_model,
            self.read_call,
            self.static_gas_limit,
        )
    }
}

impl Default for SimulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
