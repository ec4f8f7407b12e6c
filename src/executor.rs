//! Contract call execution.
//!
//! [`CallExecutor`] is the seam between dispatch and whatever performs the
//! call. [`RpcCallExecutor`] is the stock implementation: it ABI-encodes the
//! user's string arguments against the function descriptor and drives
//! `eth_call`, `eth_sendTransaction` and `eth_getTransactionReceipt` through
//! an EIP-1193 provider.

use std::rc::Rc;
use std::time::Duration;

use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_primitives::{hex, Address as EthAddress, Bytes, TxHash, U256};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::abi::FunctionDescriptor;
use crate::error::{ErrorClass, ProviderRpcError, UserFacing};
use crate::wallet::{Eip1193Provider, RpcRequest};

pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Provider(#[from] ProviderRpcError),

    #[error("invalid value for argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("abi error: {0}")]
    Abi(String),

    #[error("failed to decode result: {0}")]
    Decode(String),

    #[error("no signer available to send the transaction")]
    NoSigner,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl UserFacing for ExecutorError {
    fn class(&self) -> ErrorClass {
        match self {
            ExecutorError::Provider(_) | ExecutorError::NoSigner => ErrorClass::Wallet,
            ExecutorError::InvalidArgument { .. } | ExecutorError::Abi(_) => ErrorClass::Input,
            ExecutorError::Decode(_) | ExecutorError::MalformedResponse(_) => {
                ErrorClass::Unexpected
            }
        }
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            ExecutorError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

/// A contract bound to a provider, and to a signer for writes.
#[derive(Clone)]
pub struct ContractHandle {
    pub address: EthAddress,
    pub abi: Rc<Vec<Value>>,
    pub provider: Rc<dyn Eip1193Provider>,
    pub signer: Option<EthAddress>,
}

impl std::fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("abi_entries", &self.abi.len())
            .field("signer", &self.signer)
            .finish()
    }
}

/// One decoded return value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnValue {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: Value,
}

/// The parts of a mined transaction's receipt shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    /// `Some(false)` when the transaction reverted.
    pub status: Option<bool>,
    pub gas_used: Option<U256>,
    pub raw: Value,
}

impl TxReceipt {
    fn from_rpc(hash: TxHash, raw: Value) -> Self {
        let status = raw
            .get("status")
            .and_then(parse_quantity)
            .map(|s| s == 1);
        Self {
            transaction_hash: hash,
            block_number: raw.get("blockNumber").and_then(parse_quantity),
            status,
            gas_used: raw
                .get("gasUsed")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<U256>().ok()),
            raw,
        }
    }

    pub fn reverted(&self) -> bool {
        self.status == Some(false)
    }
}

fn parse_quantity(value: &Value) -> Option<u64> {
    let text = value.as_str()?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16).ok()
}

/// A submitted transaction that can be waited on.
#[async_trait(?Send)]
pub trait PendingTransaction {
    fn hash(&self) -> TxHash;

    /// Resolves once the transaction is mined.
    async fn wait(&self) -> Result<TxReceipt, ExecutorError>;
}

/// Performs contract calls. `args` are raw user values in declared input order.
#[async_trait(?Send)]
pub trait CallExecutor {
    async fn call(
        &self,
        contract: &ContractHandle,
        function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Vec<ReturnValue>, ExecutorError>;

    async fn send(
        &self,
        contract: &ContractHandle,
        function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Box<dyn PendingTransaction>, ExecutorError>;
}

/// Encodes `function` applied to `args` as calldata, selector included.
pub fn encode_call(function: &FunctionDescriptor, args: &[String]) -> Result<Bytes, ExecutorError> {
    let abi_function = function
        .to_json_abi()
        .map_err(|e| ExecutorError::Abi(e.to_string()))?;
    if abi_function.inputs.len() != args.len() {
        return Err(ExecutorError::Abi(format!(
            "{} expects {} arguments, got {}",
            function.name,
            abi_function.inputs.len(),
            args.len()
        )));
    }

    let values = abi_function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, raw)| {
            let invalid = |reason: String| ExecutorError::InvalidArgument {
                name: param.name.clone(),
                reason,
            };
            let ty = param.resolve().map_err(|e| invalid(e.to_string()))?;
            ty.coerce_str(raw.trim()).map_err(|e| invalid(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    abi_function
        .abi_encode_input(&values)
        .map(Bytes::from)
        .map_err(|e| ExecutorError::Abi(e.to_string()))
}

/// Decodes `data` returned by calling `function`.
pub fn decode_output(
    function: &FunctionDescriptor,
    data: &[u8],
) -> Result<Vec<ReturnValue>, ExecutorError> {
    if function.outputs.is_empty() {
        return Ok(vec![]);
    }
    if data.is_empty() {
        return Err(ExecutorError::Decode("empty result from call".into()));
    }
    let abi_function = function
        .to_json_abi()
        .map_err(|e| ExecutorError::Abi(e.to_string()))?;
    let values = abi_function
        .abi_decode_output(data, true)
        .map_err(|e| ExecutorError::Decode(e.to_string()))?;

    Ok(function
        .outputs
        .iter()
        .zip(values.iter())
        .map(|(param, value)| ReturnValue {
            name: param.name.clone(),
            ty: param.ty.clone(),
            value: value_to_json(value),
        })
        .collect())
}

/// Renders a decoded value as display JSON. Integers become decimal strings so
/// no precision is lost.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Int(i, _) => json!(i.to_string()),
        DynSolValue::Uint(u, _) => json!(u.to_string()),
        DynSolValue::FixedBytes(word, size) => json!(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Address(a) => json!(a.to_checksum(None)),
        DynSolValue::Function(f) => json!(hex::encode_prefixed(f.as_slice())),
        DynSolValue::Bytes(b) => json!(hex::encode_prefixed(b)),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => Value::Array(items.iter().map(value_to_json).collect()),
        #[allow(unreachable_patterns)]
        other => json!(format!("{other:?}")),
    }
}

/// Executes calls over an EIP-1193 provider.
#[derive(Debug, Clone)]
pub struct RpcCallExecutor {
    poll_interval: Duration,
}

impl Default for RpcCallExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_RECEIPT_POLL_INTERVAL)
    }
}

impl RpcCallExecutor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

#[async_trait(?Send)]
impl CallExecutor for RpcCallExecutor {
    async fn call(
        &self,
        contract: &ContractHandle,
        function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Vec<ReturnValue>, ExecutorError> {
        let data = encode_call(function, args)?;
        let mut tx = TransactionRequest::default()
            .to(contract.address)
            .input(TransactionInput::both(data));
        if let Some(from) = contract.signer {
            tx = tx.from(from);
        }
        let params = json!([to_value(&tx)?, "latest"]);

        debug!(address = %contract.address, function = %function.name, "eth_call");
        let result = contract
            .provider
            .request(RpcRequest::new("eth_call", params))
            .await?;
        let output: Bytes = serde_json::from_value(result)
            .map_err(|e| ExecutorError::MalformedResponse(e.to_string()))?;

        decode_output(function, &output)
    }

    async fn send(
        &self,
        contract: &ContractHandle,
        function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Box<dyn PendingTransaction>, ExecutorError> {
        let from = contract.signer.ok_or(ExecutorError::NoSigner)?;
        let data = encode_call(function, args)?;
        let tx = TransactionRequest::default()
            .from(from)
            .to(contract.address)
            .input(TransactionInput::both(data));

        info!(address = %contract.address, function = %function.name, "sending transaction");
        let result = contract
            .provider
            .request(RpcRequest::new("eth_sendTransaction", json!([to_value(&tx)?])))
            .await?;
        let hash: TxHash = serde_json::from_value(result)
            .map_err(|e| ExecutorError::MalformedResponse(e.to_string()))?;
        info!(%hash, "transaction submitted");

        Ok(Box::new(RpcPendingTransaction {
            hash,
            provider: contract.provider.clone(),
            poll_interval: self.poll_interval,
        }))
    }
}

fn to_value(tx: &TransactionRequest) -> Result<Value, ExecutorError> {
    serde_json::to_value(tx).map_err(|e| ExecutorError::Abi(e.to_string()))
}

struct RpcPendingTransaction {
    hash: TxHash,
    provider: Rc<dyn Eip1193Provider>,
    poll_interval: Duration,
}

#[async_trait(?Send)]
impl PendingTransaction for RpcPendingTransaction {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(&self) -> Result<TxReceipt, ExecutorError> {
        loop {
            let receipt = self
                .provider
                .request(RpcRequest::new(
                    "eth_getTransactionReceipt",
                    json!([self.hash]),
                ))
                .await?;
            if !receipt.is_null() {
                let receipt = TxReceipt::from_rpc(self.hash, receipt);
                info!(hash = %self.hash, block = ?receipt.block_number, "transaction mined");
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
