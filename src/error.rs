//! Error classification and the user-visible message routine.
//!
//! Every failure that can reach the user is funnelled through [`display_message`],
//! which prefers a message nested in a provider error's `data` payload, then the
//! provider's own message, then the error's `Display` text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// EIP-1193 code returned by `wallet_switchEthereumChain` when the wallet
/// does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// EIP-1193 code for a request the user rejected in the wallet.
pub const USER_REJECTED: i64 = 4001;

/// An error returned by an EIP-1193 provider or a JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProviderRpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The message nested under `data.message`, as node clients report reverts.
    pub fn nested_message(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .get("message")?
            .as_str()
            .filter(|m| !m.is_empty())
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }
}

/// Broad classes of failure, matching how each is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad user input: malformed JSON, invalid address, unsupported chain.
    Input,
    /// The wallet refused or failed a request.
    Wallet,
    /// Something assumed present was not; logged for diagnostics.
    Unexpected,
}

/// Errors that can be shown to the user.
pub trait UserFacing: std::error::Error {
    fn class(&self) -> ErrorClass;

    /// The provider error this failure wraps, if any.
    fn provider_error(&self) -> Option<&ProviderRpcError> {
        None
    }
}

impl UserFacing for ProviderRpcError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Wallet
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        Some(self)
    }
}

/// Extracts the single message shown to the user for `error`.
pub fn display_message<E: UserFacing + ?Sized>(error: &E) -> String {
    if let Some(provider) = error.provider_error() {
        if let Some(nested) = provider.nested_message() {
            return nested.to_string();
        }
        if !provider.message.is_empty() {
            return provider.message.clone();
        }
    }
    error.to_string()
}
