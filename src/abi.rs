//! ABI normalization.
//!
//! Loaded JSON comes in several shapes. [`normalize`] reduces all of them to one
//! [`NormalizedAbi`]:
//!
//! 1. an artifact object with an `abi` array and an optional `networks` map
//!    (Truffle / Hardhat deployment output),
//! 2. a bare ABI array whose first entry carries a `type`,
//! 3. anything else, which is the empty "nothing loaded" state, not an error.

use alloy_json_abi::Function;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    Nonpayable,
    Payable,
}

impl StateMutability {
    /// Whether calling the function needs no transaction.
    pub fn is_read_only(self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// A function input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
    #[serde(
        default,
        rename = "internalType",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
}

/// A callable contract function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub name: String,
    pub state_mutability: StateMutability,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
}

// ABIs emitted by old compilers carry `constant` / `payable` flags instead of
// `stateMutability`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFunction {
    name: String,
    #[serde(default)]
    inputs: Vec<Param>,
    #[serde(default)]
    outputs: Vec<Param>,
    state_mutability: Option<StateMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
}

impl<'de> Deserialize<'de> for FunctionDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawFunction::deserialize(deserializer)?;
        let state_mutability = match (raw.state_mutability, raw.constant, raw.payable) {
            (Some(m), _, _) => m,
            (None, Some(true), _) => StateMutability::View,
            (None, _, Some(true)) => StateMutability::Payable,
            _ => StateMutability::Nonpayable,
        };
        Ok(FunctionDescriptor {
            name: raw.name,
            state_mutability,
            inputs: raw.inputs,
            outputs: raw.outputs,
        })
    }
}

impl FunctionDescriptor {
    pub fn is_read_only(&self) -> bool {
        self.state_mutability.is_read_only()
    }

    /// Human-readable signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// Converts to the `alloy` JSON ABI representation used for encoding.
    pub fn to_json_abi(&self) -> Result<Function, serde_json::Error> {
        let mut entry = serde_json::to_value(self)?;
        entry["type"] = json!("function");
        serde_json::from_value(entry)
    }
}

/// A deployed address advertised by an artifact for one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressHint {
    pub chain_id: u64,
    pub address: String,
}

/// The uniform result of loading any JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAbi {
    /// Entries with `type == "function"`, in declaration order.
    pub functions: Vec<FunctionDescriptor>,
    /// The raw ABI array the functions were taken from.
    pub abi: Vec<Value>,
    /// Deployed addresses from the artifact's `networks` map, in map order.
    pub address_hints: Vec<AddressHint>,
}

impl NormalizedAbi {
    pub fn is_empty(&self) -> bool {
        self.abi.is_empty() && self.address_hints.is_empty()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn hint_for(&self, chain_id: u64) -> Option<&AddressHint> {
        self.address_hints.iter().find(|h| h.chain_id == chain_id)
    }
}

/// Normalizes arbitrary loaded JSON into functions, raw ABI and address hints.
pub fn normalize(raw: &Value) -> NormalizedAbi {
    if let Some(abi) = raw.as_object().and_then(|o| o.get("abi")) {
        let abi = abi.as_array().cloned().unwrap_or_default();
        debug!(entries = abi.len(), "normalizing artifact with abi field");
        return NormalizedAbi {
            functions: collect_functions(&abi),
            address_hints: collect_hints(raw.get("networks")),
            abi,
        };
    }

    if let Some(entries) = raw.as_array() {
        let looks_like_abi = entries
            .first()
            .and_then(|first| first.get("type"))
            .is_some();
        if looks_like_abi {
            debug!(entries = entries.len(), "normalizing bare abi array");
            return NormalizedAbi {
                functions: collect_functions(entries),
                abi: entries.clone(),
                address_hints: vec![],
            };
        }
    }

    NormalizedAbi::default()
}

fn collect_functions(entries: &[Value]) -> Vec<FunctionDescriptor> {
    entries
        .iter()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("function"))
        .filter_map(|entry| match FunctionDescriptor::deserialize(entry) {
            Ok(function) => Some(function),
            Err(e) => {
                warn!(error = %e, "skipping malformed abi function entry");
                None
            }
        })
        .collect()
}

fn collect_hints(networks: Option<&Value>) -> Vec<AddressHint> {
    let Some(networks) = networks.and_then(Value::as_object) else {
        return vec![];
    };
    networks
        .iter()
        .filter_map(|(chain_id, deployment)| {
            let chain_id = chain_id.trim().parse::<u64>().ok()?;
            let address = deployment.get("address")?.as_str()?;
            if address.is_empty() {
                return None;
            }
            Some(AddressHint {
                chain_id,
                address: address.to_string(),
            })
        })
        .collect()
}
