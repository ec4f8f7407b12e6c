//! Wallet and provider collaborator interface.
//!
//! The engine never talks to a wallet directly. Whatever hosts it (a browser
//! bridge, a desktop shell, a test) implements [`WalletConnector`] to report the
//! active connector and chain, and [`Eip1193Provider`] to carry JSON-RPC
//! requests to the wallet or node.

use std::rc::Rc;

use alloy_primitives::Address as EthAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ErrorClass, ProviderRpcError, UserFacing};

/// How the session is connected to a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorKind {
    /// Read-only RPC connection with no account. Its chain can be changed
    /// locally without asking anyone.
    Network,
    /// A wallet injected into the host (`window.ethereum`).
    Injected,
    /// A remote wallet paired over WalletConnect.
    WalletConnect,
}

impl ConnectorKind {
    /// Whether this connector can sign transactions.
    pub fn can_sign(self) -> bool {
        !matches!(self, ConnectorKind::Network)
    }
}

/// A JSON-RPC request in the EIP-1193 `{ method, params }` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// An EIP-1193 style request surface.
#[async_trait(?Send)]
pub trait Eip1193Provider {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderRpcError>;
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{0}")]
    Provider(#[from] ProviderRpcError),

    #[error("connector {0:?} is not available")]
    ConnectorUnavailable(ConnectorKind),

    #[error("wallet activation failed: {0}")]
    Activation(String),
}

impl UserFacing for WalletError {
    fn class(&self) -> ErrorClass {
        match self {
            WalletError::Provider(_) | WalletError::Activation(_) => ErrorClass::Wallet,
            WalletError::ConnectorUnavailable(_) => ErrorClass::Unexpected,
        }
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            WalletError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

/// The wallet connection as seen by the engine.
#[async_trait(?Send)]
pub trait WalletConnector {
    /// Whether a connector has finished activating.
    fn is_active(&self) -> bool;

    /// The chain the active connector is on.
    fn active_chain_id(&self) -> Option<u64>;

    fn connector_kind(&self) -> Option<ConnectorKind>;

    /// The account able to sign, if any.
    fn signer(&self) -> Option<EthAddress>;

    /// The provider reads go through, whatever the connector.
    fn provider(&self) -> Option<Rc<dyn Eip1193Provider>>;

    /// The injected browser wallet, present only when the host has one.
    fn injected(&self) -> Option<Rc<dyn Eip1193Provider>>;

    /// Repoints the read-only network connector. No-op for other connectors.
    fn change_network_chain_id(&self, chain_id: u64);

    async fn activate(&self, kind: ConnectorKind) -> Result<(), WalletError>;
}

/// Snapshot of the wallet fields chain resolution depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletView {
    pub active: bool,
    pub chain_id: Option<u64>,
}

impl WalletView {
    pub fn of(wallet: &dyn WalletConnector) -> Self {
        Self {
            active: wallet.is_active(),
            chain_id: wallet.active_chain_id(),
        }
    }

    /// Whether the wallet is active on a chain other than `chain_id`.
    pub fn is_off(&self, chain_id: u64) -> bool {
        self.active && self.chain_id.is_some_and(|id| id != chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_connector_cannot_sign() {
        assert!(!ConnectorKind::Network.can_sign());
        assert!(ConnectorKind::Injected.can_sign());
        assert!(ConnectorKind::WalletConnect.can_sign());
    }

    #[test]
    fn wallet_view_off_chain() {
        let view = WalletView {
            active: true,
            chain_id: Some(1),
        };
        assert!(view.is_off(137));
        assert!(!view.is_off(1));
        let inactive = WalletView {
            active: false,
            chain_id: Some(1),
        };
        assert!(!inactive.is_off(137));
        assert!(!WalletView::default().is_off(1));
    }

    #[test]
    fn rpc_request_shape() {
        let req = RpcRequest::new("eth_chainId", Value::Array(vec![]));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"method": "eth_chainId", "params": []})
        );
    }
}
