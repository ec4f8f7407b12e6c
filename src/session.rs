//! The interaction session.
//!
//! [`Session`] owns the mutable [`SelectionState`] and routes every incoming
//! signal (deep link, artifact load, wallet event, user edit) through the chain
//! resolver, the switch controller and the dispatcher. All of it runs on one
//! thread; no `RefCell` borrow is held across an `.await`.

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::abi::{normalize, FunctionDescriptor, NormalizedAbi};
use crate::chain::ChainDescriptor;
use crate::config::SessionConfig;
use crate::deeplink::DeepLink;
use crate::dispatch::{
    validate_address, ArgumentMap, CallDispatcher, CallResult, ContractTarget, DispatchError,
    ResultSink,
};
use crate::error::{ErrorClass, ProviderRpcError, UserFacing};
use crate::executor::{CallExecutor, RpcCallExecutor};
use crate::notify::{report, Notifier, Severity};
use crate::resolver::{ChainResolver, ChainSignal, Resolution};
use crate::source::{ArtifactLoader, ArtifactSource, SourceError};
use crate::switch::{InFlight, NetworkSwitchController, SwitchError};
use crate::wallet::{ConnectorKind, WalletConnector, WalletError, WalletView};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Switch(#[from] SwitchError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl UserFacing for SessionError {
    fn class(&self) -> ErrorClass {
        match self {
            SessionError::Switch(e) => e.class(),
            SessionError::Dispatch(e) => e.class(),
        }
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            SessionError::Switch(e) => e.provider_error(),
            SessionError::Dispatch(e) => e.provider_error(),
        }
    }
}

/// What the user is looking at. Created empty and filled in as signals arrive.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// Label of the loaded artifact.
    pub source: Option<String>,
    pub artifact: NormalizedAbi,
    pub chain: Option<ChainDescriptor>,
    pub address: String,
    pub function: Option<FunctionDescriptor>,
    pub args: ArgumentMap,
    // deep-link `func` waiting for a function list
    pending_function: Option<String>,
    address_edited: bool,
    function_edited: bool,
    edited_args: HashSet<String>,
}

impl SelectionState {
    pub fn target(&self) -> ContractTarget {
        ContractTarget {
            address: self.address.trim().to_string(),
            abi: Rc::new(self.artifact.abi.clone()),
            functions: self.artifact.functions.clone(),
            chain: self.chain.clone(),
        }
    }

    /// `""` and a bare `"0x"` both count as no address.
    pub fn has_address(&self) -> bool {
        !matches!(self.address.trim(), "" | "0x")
    }

    pub fn pending_function(&self) -> Option<&str> {
        self.pending_function.as_deref()
    }

    fn select_pending(&mut self) {
        let Some(name) = self.pending_function.as_deref() else {
            return;
        };
        if let Some(function) = self.artifact.function(name).cloned() {
            debug!(function = %function.name, "selecting function from deep link");
            self.function = Some(function);
            self.pending_function = None;
        }
    }

    fn seed_address(&mut self) {
        if self.address_edited || self.has_address() {
            return;
        }
        let hint = self
            .chain
            .as_ref()
            .and_then(|chain| self.artifact.hint_for(chain.chain_id))
            .or_else(|| self.artifact.address_hints.first());
        if let Some(hint) = hint {
            debug!(
                address = %hint.address,
                chain_id = hint.chain_id,
                "address taken from artifact"
            );
            self.address = hint.address.clone();
        }
    }
}

pub struct Session {
    config: SessionConfig,
    state: RefCell<SelectionState>,
    resolver: RefCell<ChainResolver>,
    wallet: Rc<dyn WalletConnector>,
    switcher: NetworkSwitchController,
    dispatcher: CallDispatcher,
    notifier: Rc<dyn Notifier>,
    loader: ArtifactLoader,
    logging_in: Rc<Cell<bool>>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        wallet: Rc<dyn WalletConnector>,
        executor: Rc<dyn CallExecutor>,
        notifier: Rc<dyn Notifier>,
        sink: Rc<dyn ResultSink>,
    ) -> Self {
        Self {
            resolver: RefCell::new(ChainResolver::new(config.registry())),
            state: RefCell::new(SelectionState::default()),
            switcher: NetworkSwitchController::new(wallet.clone()),
            dispatcher: CallDispatcher::new(wallet.clone(), executor, notifier.clone(), sink),
            wallet,
            notifier,
            loader: ArtifactLoader::default(),
            logging_in: Rc::new(Cell::new(false)),
            config,
        }
    }

    /// A session whose calls go through the wallet's provider via
    /// [`RpcCallExecutor`].
    pub fn with_default_executor(
        config: SessionConfig,
        wallet: Rc<dyn WalletConnector>,
        notifier: Rc<dyn Notifier>,
        sink: Rc<dyn ResultSink>,
    ) -> Self {
        let executor = Rc::new(RpcCallExecutor::new(config.receipt_poll_interval()));
        Self::new(config, wallet, executor, notifier, sink)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> Ref<'_, SelectionState> {
        self.state.borrow()
    }

    pub fn resolved_chain(&self) -> Option<ChainDescriptor> {
        self.resolver.borrow().resolved().cloned()
    }

    pub fn search_chains(&self, text: &str) -> Vec<ChainDescriptor> {
        self.resolver
            .borrow()
            .registry()
            .search(text)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_switching(&self) -> bool {
        self.switcher.is_switching()
    }

    pub fn is_reading(&self) -> bool {
        self.dispatcher.is_reading()
    }

    pub fn is_writing(&self) -> bool {
        self.dispatcher.is_writing()
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in.get()
    }

    /// Parses `query` with the configured argument prefix and applies it.
    pub async fn apply_deep_link_query(&self, query: &str) {
        let link = DeepLink::from_query(query, &self.config.args_prefix);
        self.apply_deep_link(&link).await;
    }

    /// Seeds the session from deep-link parameters. The route chain goes first
    /// so an artifact hint can never beat it.
    pub async fn apply_deep_link(&self, link: &DeepLink) {
        if let Some(chain_id) = link.network {
            self.apply_signal(ChainSignal::Route(chain_id)).await;
        }

        {
            let mut state = self.state.borrow_mut();
            if let Some(address) = &link.address {
                if !state.address_edited {
                    state.address = address.clone();
                }
            }
            for (name, value) in &link.args {
                if !state.edited_args.contains(name) {
                    state.args.insert(name.clone(), value.clone());
                }
            }
            if let Some(function) = &link.function {
                if !state.function_edited {
                    state.pending_function = Some(function.clone());
                    state.select_pending();
                }
            }
        }

        if let Some(url) = &link.artifact_url {
            // already reported
            let _ = self.load_artifact(&ArtifactSource::Url(url.clone())).await;
        }
    }

    /// Feeds the wallet's current state to the resolver, then re-asserts the
    /// route chain against it.
    pub async fn on_wallet_changed(&self) {
        let view = WalletView::of(self.wallet.as_ref());
        debug!(active = view.active, chain_id = ?view.chain_id, "wallet changed");
        if let (true, Some(chain_id)) = (view.active, view.chain_id) {
            self.apply_signal(ChainSignal::WalletActive(chain_id)).await;
        }
        let route = self.resolver.borrow().route_chain();
        if let Some(chain_id) = route {
            self.apply_signal(ChainSignal::Route(chain_id)).await;
        }
    }

    pub async fn load_artifact(&self, source: &ArtifactSource) -> Result<(), SourceError> {
        match self.loader.load(source).await {
            Ok(loaded) => {
                self.load_artifact_json(loaded.source, &loaded.json).await;
                Ok(())
            }
            Err(e) => {
                report(self.notifier.as_ref(), &e);
                Err(e)
            }
        }
    }

    /// Replaces the artifact with `json`. JSON in no known ABI shape leaves an
    /// empty function list and is not reported.
    pub async fn load_artifact_json(&self, source: impl Into<String>, json: &Value) {
        let normalized = normalize(json);
        let hinted_chain = {
            let resolver = self.resolver.borrow();
            normalized
                .address_hints
                .iter()
                .map(|hint| hint.chain_id)
                .find(|id| resolver.registry().get(*id).is_some())
        };

        {
            let mut state = self.state.borrow_mut();
            state.source = Some(source.into());
            state.artifact = normalized;
            state.function = None;
            state.function_edited = false;
            state.select_pending();
        }

        if let Some(chain_id) = hinted_chain {
            self.apply_signal(ChainSignal::ArtifactHint(chain_id)).await;
        }
        self.state.borrow_mut().seed_address();
    }

    /// An explicit chain pick from the user.
    pub async fn select_chain(&self, chain_id: u64) -> Resolution {
        self.apply_signal(ChainSignal::UserSelected(chain_id)).await
    }

    pub fn set_address(&self, address: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.address = address.into();
        state.address_edited = true;
    }

    /// Selects the first function called `name`. Returns `false` if the loaded
    /// ABI has none.
    pub fn select_function(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(function) = state.artifact.function(name).cloned() else {
            return false;
        };
        state.function = Some(function);
        state.function_edited = true;
        state.pending_function = None;
        true
    }

    pub fn set_argument(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.borrow_mut();
        state.edited_args.insert(name.clone());
        state.args.insert(name, value.into());
    }

    pub async fn read(&self) -> Result<CallResult, SessionError> {
        let (target, function, args) = self.prepare_call()?;
        self.ensure_chain().await?;
        Ok(self.dispatcher.read(&target, &function, &args).await?)
    }

    /// Sends the selected function. With the read-only connector nothing is
    /// sent and a login is started instead.
    pub async fn write(&self) -> Result<CallResult, SessionError> {
        let (target, function, args) = self.prepare_call()?;
        if self.wallet.connector_kind() != Some(ConnectorKind::Network) {
            self.ensure_chain().await?;
        }
        match self.dispatcher.write(&target, &function, &args).await {
            Err(DispatchError::LoginRequired) => {
                // already reported
                let _ = self.login().await;
                Err(DispatchError::LoginRequired.into())
            }
            result => Ok(result?),
        }
    }

    /// Activates the injected wallet if the host has one, WalletConnect
    /// otherwise.
    pub async fn login(&self) -> Result<(), WalletError> {
        let _guard = InFlight::enter(&self.logging_in);
        let kind = if self.wallet.injected().is_some() {
            ConnectorKind::Injected
        } else {
            ConnectorKind::WalletConnect
        };
        info!(?kind, "activating wallet connector");
        if let Err(e) = self.wallet.activate(kind).await {
            report(self.notifier.as_ref(), &e);
            return Err(e);
        }
        self.notifier
            .notify("Logged in successfully", Severity::Success);
        self.on_wallet_changed().await;
        Ok(())
    }

    /// Runs `signal` through the resolver, commits the result to session state,
    /// and only then asks the wallet to switch.
    pub async fn apply_signal(&self, signal: ChainSignal) -> Resolution {
        let view = WalletView::of(self.wallet.as_ref());
        let resolution = self.resolver.borrow_mut().apply(signal, view);

        if resolution.changed {
            let mut state = self.state.borrow_mut();
            state.chain = resolution.chain.clone();
            state.seed_address();
        }

        if let Some(chain) = &resolution.switch_to {
            tokio::task::yield_now().await;
            if let Err(e) = self.switcher.switch_to(chain).await {
                report(self.notifier.as_ref(), &e);
            }
        }
        resolution
    }

    fn prepare_call(
        &self,
    ) -> Result<(ContractTarget, FunctionDescriptor, ArgumentMap), DispatchError> {
        let state = self.state.borrow();
        let prepared = match &state.function {
            None => Err(DispatchError::NoFunctionSelected),
            Some(function) => validate_address(&state.address)
                .map(|_| (state.target(), function.clone(), state.args.clone())),
        };
        if let Err(e) = &prepared {
            report(self.notifier.as_ref(), e);
        }
        prepared
    }

    /// Switches the wallet onto the resolved chain if it is elsewhere.
    async fn ensure_chain(&self) -> Result<(), SwitchError> {
        let Some(chain) = self.state.borrow().chain.clone() else {
            return Ok(());
        };
        if !WalletView::of(self.wallet.as_ref()).is_off(chain.chain_id) {
            return Ok(());
        }
        if let Err(e) = self.switcher.switch_to(&chain).await {
            report(self.notifier.as_ref(), &e);
            return Err(e);
        }
        self.notifier
            .notify(&format!("Switched into {}", chain.name), Severity::Warning);
        Ok(())
    }
}
