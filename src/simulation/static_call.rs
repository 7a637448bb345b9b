//! Strategy that executes the multicall as a read-only `eth_call`.

use crate::errors::Result;
use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, TxKind, U256},
    providers::{Provider, RootProvider},
    rpc::types::{TransactionInput, TransactionRequest},
};
use async_trait::async_trait;

/// A read-only call against chain state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadCallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

/// Executes read-only calls. Upstream errors, including reverts, are returned unmodified.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadCall: Send + Sync {
    async fn call(&self, request: ReadCallRequest) -> Result<Bytes>;
}

/// `ReadCall` over an alloy JSON-RPC provider.
pub struct ProviderReadCall {
    provider: RootProvider<Ethereum>,
}

impl ProviderReadCall {
    pub fn new(provider: RootProvider<Ethereum>) -> Self {
        Self { provider }
    }

    /// Connects a plain HTTP provider to `rpc_url`.
    pub fn from_url(rpc_url: &str) -> Result<Self> {
        let url = rpc_url.parse::<url::Url>().map_err(|e| crate::errors::ConfigError::InvalidValue {
            name: "RELAYER_RPC_URL".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(RootProvider::new_http(url)))
    }
}

#[async_trait]
impl ReadCall for ProviderReadCall {
    async fn call(&self, request: ReadCallRequest) -> Result<Bytes> {
        let transaction = TransactionRequest {
            from: Some(request.from),
            to: Some(TxKind::Call(request.to)),
            input: TransactionInput {
                input: Some(request.data),
                data: None,
            },
            value: Some(request.value),
            gas: Some(request.gas_limit),
            ..Default::default()
        };

        Ok(self.provider.call(transaction).await?)
    }
}
