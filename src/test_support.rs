//! Test doubles for the wallet, provider, executor and UI collaborators.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use alloy_primitives::{address, Address as EthAddress, B256};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::abi::FunctionDescriptor;
use crate::dispatch::{CallResult, ResultSink};
use crate::error::ProviderRpcError;
use crate::executor::{
    CallExecutor, ContractHandle, ExecutorError, PendingTransaction, ReturnValue, TxReceipt,
};
use crate::notify::{Notifier, Severity};
use crate::switch::SWITCH_CHAIN_METHOD;
use crate::wallet::{ConnectorKind, Eip1193Provider, RpcRequest, WalletConnector, WalletError};

pub const SIGNER: EthAddress = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Records requests and answers from scripted queues. A successful
/// `wallet_switchEthereumChain` moves the attached wallet's chain.
#[derive(Default)]
pub struct MockProvider {
    requests: RefCell<Vec<RpcRequest>>,
    failures: RefCell<HashMap<String, VecDeque<ProviderRpcError>>>,
    responses: RefCell<HashMap<String, VecDeque<Value>>>,
    chain: RefCell<Option<Rc<Cell<Option<u64>>>>>,
}

impl MockProvider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn fail_next(&self, method: &str, error: ProviderRpcError) {
        self.failures
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn respond(&self, method: &str, value: Value) {
        self.responses
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(value);
    }

    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.borrow().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }

    fn attach(&self, chain: Rc<Cell<Option<u64>>>) {
        *self.chain.borrow_mut() = Some(chain);
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for MockProvider {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderRpcError> {
        self.requests.borrow_mut().push(request.clone());
        let failure = self
            .failures
            .borrow_mut()
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }

        if request.method == SWITCH_CHAIN_METHOD {
            let requested = request.params[0]["chainId"]
                .as_str()
                .and_then(|hex| u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok());
            if let Some(chain) = self.chain.borrow().as_ref() {
                chain.set(requested);
            }
            return Ok(Value::Null);
        }

        let scripted = self
            .responses
            .borrow_mut()
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or(Value::Null))
    }
}

pub struct MockWallet {
    kind: Cell<Option<ConnectorKind>>,
    active: Cell<bool>,
    chain: Rc<Cell<Option<u64>>>,
    signer: Cell<Option<EthAddress>>,
    injected: RefCell<Option<Rc<MockProvider>>>,
    network_provider: Rc<MockProvider>,
    activations: RefCell<Vec<ConnectorKind>>,
    activation_error: RefCell<Option<WalletError>>,
}

impl MockWallet {
    fn build(kind: ConnectorKind, chain_id: u64, injected: Option<Rc<MockProvider>>) -> Rc<Self> {
        let chain = Rc::new(Cell::new(Some(chain_id)));
        let network_provider = MockProvider::new();
        network_provider.attach(chain.clone());
        if let Some(provider) = &injected {
            provider.attach(chain.clone());
        }
        Rc::new(Self {
            kind: Cell::new(Some(kind)),
            active: Cell::new(true),
            chain,
            signer: Cell::new(kind.can_sign().then_some(SIGNER)),
            injected: RefCell::new(injected),
            network_provider,
            activations: RefCell::new(vec![]),
            activation_error: RefCell::new(None),
        })
    }

    /// Active read-only network connector.
    pub fn network(chain_id: u64) -> Rc<Self> {
        Self::build(ConnectorKind::Network, chain_id, None)
    }

    /// Active injected wallet; `provider` serves both reads and wallet prompts.
    pub fn injected(chain_id: u64, provider: Rc<MockProvider>) -> Rc<Self> {
        Self::build(ConnectorKind::Injected, chain_id, Some(provider))
    }

    /// Claims to be injected, but the host has no browser wallet object.
    pub fn injected_without_provider(chain_id: u64) -> Rc<Self> {
        Self::build(ConnectorKind::Injected, chain_id, None)
    }

    pub fn walletconnect(chain_id: u64) -> Rc<Self> {
        Self::build(ConnectorKind::WalletConnect, chain_id, None)
    }

    pub fn with_injected(self: Rc<Self>, provider: Rc<MockProvider>) -> Rc<Self> {
        provider.attach(self.chain.clone());
        *self.injected.borrow_mut() = Some(provider);
        self
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    pub fn set_signer(&self, signer: Option<EthAddress>) {
        self.signer.set(signer);
    }

    pub fn fail_activation(&self, error: WalletError) {
        *self.activation_error.borrow_mut() = Some(error);
    }

    pub fn activations(&self) -> Vec<ConnectorKind> {
        self.activations.borrow().clone()
    }

    pub fn network_provider(&self) -> Rc<MockProvider> {
        self.network_provider.clone()
    }
}

#[async_trait(?Send)]
impl WalletConnector for MockWallet {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn active_chain_id(&self) -> Option<u64> {
        self.chain.get()
    }

    fn connector_kind(&self) -> Option<ConnectorKind> {
        self.kind.get()
    }

    fn signer(&self) -> Option<EthAddress> {
        self.signer.get()
    }

    fn provider(&self) -> Option<Rc<dyn Eip1193Provider>> {
        if !self.active.get() {
            return None;
        }
        match (self.kind.get(), self.injected.borrow().as_ref()) {
            (Some(ConnectorKind::Injected), Some(injected)) => Some(injected.clone()),
            _ => Some(self.network_provider.clone()),
        }
    }

    fn injected(&self) -> Option<Rc<dyn Eip1193Provider>> {
        self.injected
            .borrow()
            .as_ref()
            .map(|p| p.clone() as Rc<dyn Eip1193Provider>)
    }

    fn change_network_chain_id(&self, chain_id: u64) {
        if self.kind.get() == Some(ConnectorKind::Network) {
            self.chain.set(Some(chain_id));
        }
    }

    async fn activate(&self, kind: ConnectorKind) -> Result<(), WalletError> {
        self.activations.borrow_mut().push(kind);
        if let Some(error) = self.activation_error.borrow_mut().take() {
            return Err(error);
        }
        self.kind.set(Some(kind));
        self.active.set(true);
        self.signer.set(kind.can_sign().then_some(SIGNER));
        Ok(())
    }
}

struct MockPending {
    hash: B256,
    reverted: bool,
}

#[async_trait(?Send)]
impl PendingTransaction for MockPending {
    fn hash(&self) -> B256 {
        self.hash
    }

    async fn wait(&self) -> Result<TxReceipt, ExecutorError> {
        Ok(TxReceipt {
            transaction_hash: self.hash,
            block_number: Some(1),
            status: Some(!self.reverted),
            gas_used: None,
            raw: Value::Null,
        })
    }
}

/// Records calls and answers with fixed values.
#[derive(Default)]
pub struct MockExecutor {
    calls: RefCell<Vec<(String, Vec<String>)>>,
    failure: RefCell<Option<ExecutorError>>,
    revert: Cell<bool>,
}

impl MockExecutor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }

    pub fn fail_next(&self, error: ExecutorError) {
        *self.failure.borrow_mut() = Some(error);
    }

    pub fn revert_next(&self) {
        self.revert.set(true);
    }
}

#[async_trait(?Send)]
impl CallExecutor for MockExecutor {
    async fn call(
        &self,
        _contract: &ContractHandle,
        _function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Vec<ReturnValue>, ExecutorError> {
        self.calls.borrow_mut().push(("call".into(), args.to_vec()));
        if let Some(error) = self.failure.borrow_mut().take() {
            return Err(error);
        }
        Ok(vec![ReturnValue {
            name: String::new(),
            ty: "uint256".into(),
            value: json!("1"),
        }])
    }

    async fn send(
        &self,
        _contract: &ContractHandle,
        _function: &FunctionDescriptor,
        args: &[String],
    ) -> Result<Box<dyn PendingTransaction>, ExecutorError> {
        self.calls.borrow_mut().push(("send".into(), args.to_vec()));
        if let Some(error) = self.failure.borrow_mut().take() {
            return Err(error);
        }
        Ok(Box::new(MockPending {
            hash: B256::repeat_byte(0xab),
            reverted: self.revert.replace(false),
        }))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<(String, Severity)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<(String, Severity)> {
        self.messages.borrow().last().cloned()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(_, severity)| *severity == Severity::Error)
            .map(|(message, _)| message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .borrow_mut()
            .push((message.to_string(), severity));
    }
}

#[derive(Default)]
pub struct RecordingSink {
    results: RefCell<Vec<CallResult>>,
}

impl RecordingSink {
    pub fn results(&self) -> Vec<CallResult> {
        self.results.borrow().clone()
    }
}

impl ResultSink for RecordingSink {
    fn publish(&self, result: &CallResult) {
        self.results.borrow_mut().push(result.clone());
    }
}
