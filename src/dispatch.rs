//! Read and write dispatch.
//!
//! Preconditions are checked on every call rather than assumed from UI state:
//! the address must be well formed (and correctly checksummed when mixed-case),
//! every declared input must have a value, and a write needs an account able
//! to sign. Failures are reported to the notifier here, so callers only decide
//! what to do next. In-flight flags are advisory and always cleared.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use alloy_primitives::{Address as EthAddress, TxHash};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::abi::FunctionDescriptor;
use crate::chain::ChainDescriptor;
use crate::error::{ErrorClass, ProviderRpcError, UserFacing};
use crate::executor::{CallExecutor, ContractHandle, ExecutorError, ReturnValue, TxReceipt};
use crate::notify::{report, Notifier, Severity};
use crate::switch::InFlight;
use crate::wallet::{ConnectorKind, WalletConnector};

/// Raw user-entered values keyed by input name. Inputs without a name are
/// keyed by their position (`"0"`, `"1"`, ...).
pub type ArgumentMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("No function selected")]
    NoFunctionSelected,

    #[error("Missing value for argument `{0}`")]
    MissingArgument(String),

    #[error("Please login first")]
    LoginRequired,

    #[error("No account available to sign the transaction")]
    MissingSigner,

    #[error("Unexpected Error")]
    NoProvider,

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl UserFacing for DispatchError {
    fn class(&self) -> ErrorClass {
        match self {
            DispatchError::InvalidAddress(_)
            | DispatchError::NoFunctionSelected
            | DispatchError::MissingArgument(_) => ErrorClass::Input,
            DispatchError::LoginRequired | DispatchError::MissingSigner => ErrorClass::Wallet,
            DispatchError::NoProvider => ErrorClass::Unexpected,
            DispatchError::Executor(e) => e.class(),
        }
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            DispatchError::Executor(e) => e.provider_error(),
            _ => None,
        }
    }
}

/// What a call is aimed at.
#[derive(Debug, Clone, Default)]
pub struct ContractTarget {
    /// The address as entered; validated at dispatch.
    pub address: String,
    pub abi: Rc<Vec<Value>>,
    pub functions: Vec<FunctionDescriptor>,
    pub chain: Option<ChainDescriptor>,
}

impl ContractTarget {
    /// Whether the address passes validation.
    pub fn is_resolved(&self) -> bool {
        validate_address(&self.address).is_ok()
    }
}

/// Parses `raw` as an address. All-lowercase and all-uppercase hex is
/// accepted as is; mixed case must carry a valid EIP-55 checksum.
pub fn validate_address(raw: &str) -> Result<EthAddress, DispatchError> {
    let invalid = || DispatchError::InvalidAddress(raw.to_string());
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let address: EthAddress = trimmed.parse().map_err(|_| invalid())?;
    let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
        && digits.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case && address.to_checksum(None)[2..] != *digits {
        return Err(invalid());
    }
    Ok(address)
}

/// Orders `args` by the function's declared inputs.
pub fn positional_args(
    function: &FunctionDescriptor,
    args: &ArgumentMap,
) -> Result<Vec<String>, DispatchError> {
    function
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let key = if input.name.is_empty() {
                index.to_string()
            } else {
                input.name.clone()
            };
            args.get(&key)
                .cloned()
                .ok_or(DispatchError::MissingArgument(key))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CallOutcome {
    Read {
        values: Vec<ReturnValue>,
    },
    Write {
        hash: TxHash,
        /// `None` while the transaction is pending.
        receipt: Option<TxReceipt>,
    },
}

/// The result shown to the user. A write is published twice under the same
/// `id`: once when submitted and once with its receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub id: Uuid,
    pub function: String,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

impl CallResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.outcome,
            CallOutcome::Write {
                receipt: Some(_),
                ..
            }
        )
    }
}

/// Receives call results for display.
pub trait ResultSink {
    fn publish(&self, result: &CallResult);
}

pub struct CallDispatcher {
    wallet: Rc<dyn WalletConnector>,
    executor: Rc<dyn CallExecutor>,
    notifier: Rc<dyn Notifier>,
    sink: Rc<dyn ResultSink>,
    reading: Rc<Cell<bool>>,
    writing: Rc<Cell<bool>>,
}

impl CallDispatcher {
    pub fn new(
        wallet: Rc<dyn WalletConnector>,
        executor: Rc<dyn CallExecutor>,
        notifier: Rc<dyn Notifier>,
        sink: Rc<dyn ResultSink>,
    ) -> Self {
        Self {
            wallet,
            executor,
            notifier,
            sink,
            reading: Rc::new(Cell::new(false)),
            writing: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_reading(&self) -> bool {
        self.reading.get()
    }

    pub fn is_writing(&self) -> bool {
        self.writing.get()
    }

    /// Calls a function without a transaction. Failures are already reported
    /// when this returns `Err`.
    pub async fn read(
        &self,
        target: &ContractTarget,
        function: &FunctionDescriptor,
        args: &ArgumentMap,
    ) -> Result<CallResult, DispatchError> {
        let _guard = InFlight::enter(&self.reading);
        match self.try_read(target, function, args).await {
            Ok(result) => {
                self.sink.publish(&result);
                self.notifier
                    .notify("Data queried successfully", Severity::Success);
                Ok(result)
            }
            Err(e) => {
                report(self.notifier.as_ref(), &e);
                Err(e)
            }
        }
    }

    async fn try_read(
        &self,
        target: &ContractTarget,
        function: &FunctionDescriptor,
        args: &ArgumentMap,
    ) -> Result<CallResult, DispatchError> {
        let address = validate_address(&target.address)?;
        let args = positional_args(function, args)?;
        let provider = self.wallet.provider().ok_or_else(|| {
            warn!("read requested with no provider attached");
            DispatchError::NoProvider
        })?;

        let contract = ContractHandle {
            address,
            abi: target.abi.clone(),
            provider,
            signer: None,
        };
        debug!(%address, function = %function.name, "dispatching read");
        let values = self.executor.call(&contract, function, &args).await?;

        Ok(CallResult {
            id: Uuid::new_v4(),
            function: function.name.clone(),
            outcome: CallOutcome::Read { values },
        })
    }

    /// Sends a transaction, publishing the result on submission and again on
    /// confirmation. With a read-only connector nothing is sent and
    /// [`DispatchError::LoginRequired`] is returned for the caller to prompt a
    /// login. Failures are already reported when this returns `Err`.
    pub async fn write(
        &self,
        target: &ContractTarget,
        function: &FunctionDescriptor,
        args: &ArgumentMap,
    ) -> Result<CallResult, DispatchError> {
        let _guard = InFlight::enter(&self.writing);
        let result = self.try_write(target, function, args).await;
        if let Err(e) = &result {
            report(self.notifier.as_ref(), e);
        }
        result
    }

    async fn try_write(
        &self,
        target: &ContractTarget,
        function: &FunctionDescriptor,
        args: &ArgumentMap,
    ) -> Result<CallResult, DispatchError> {
        let address = validate_address(&target.address)?;
        let provider = self.wallet.provider().ok_or_else(|| {
            warn!("write requested with no provider attached");
            DispatchError::NoProvider
        })?;
        if self.wallet.connector_kind() == Some(ConnectorKind::Network) {
            return Err(DispatchError::LoginRequired);
        }
        let signer = self.wallet.signer().ok_or(DispatchError::MissingSigner)?;
        let args = positional_args(function, args)?;

        let contract = ContractHandle {
            address,
            abi: target.abi.clone(),
            provider,
            signer: Some(signer),
        };
        debug!(%address, function = %function.name, "dispatching write");
        let pending = self.executor.send(&contract, function, &args).await?;
        let hash = pending.hash();

        let mut result = CallResult {
            id: Uuid::new_v4(),
            function: function.name.clone(),
            outcome: CallOutcome::Write {
                hash,
                receipt: None,
            },
        };
        self.notifier
            .notify("Data sent successfully", Severity::Success);
        self.sink.publish(&result);

        let receipt = pending.wait().await?;
        if receipt.reverted() {
            self.notifier
                .notify(&format!("Transaction {hash} reverted"), Severity::Warning);
        }
        result.outcome = CallOutcome::Write {
            hash,
            receipt: Some(receipt),
        };
        self.sink.publish(&result);
        Ok(result)
    }
}
