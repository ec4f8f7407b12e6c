//! Contract interaction engine.
//!
//! Load an ABI from any common artifact shape, settle on one chain from the
//! signals that suggest one, move the wallet onto it, and dispatch reads and
//! writes with their full lifecycle reported to the host.
//!
//! The host supplies the collaborators: a [`wallet::WalletConnector`] (and its
//! [`wallet::Eip1193Provider`]s), a [`notify::Notifier`] and a
//! [`dispatch::ResultSink`]. Everything else is driven through a
//! [`session::Session`].

pub mod abi;
pub mod chain;
pub mod config;
pub mod deeplink;
pub mod dispatch;
pub mod error;
pub mod executor;
#[cfg(feature = "logging")]
pub mod logging;
pub mod notify;
pub mod resolver;
pub mod session;
pub mod source;
pub mod switch;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use abi::{normalize, FunctionDescriptor, NormalizedAbi, StateMutability};
pub use chain::{ChainDescriptor, ChainRegistry};
pub use config::SessionConfig;
pub use deeplink::DeepLink;
pub use dispatch::{
    ArgumentMap, CallDispatcher, CallOutcome, CallResult, ContractTarget, ResultSink,
};
pub use error::{display_message, ErrorClass, ProviderRpcError, UserFacing};
pub use executor::{CallExecutor, RpcCallExecutor};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use notify::{Notifier, Severity, TracingNotifier};
pub use resolver::{ChainResolver, ChainSignal};
pub use session::{SelectionState, Session, SessionError};
pub use source::{ArtifactLoader, ArtifactSource};
pub use switch::NetworkSwitchController;
pub use wallet::{ConnectorKind, Eip1193Provider, WalletConnector};
