//! Network switching.
//!
//! A read-only network connector is simply repointed. An injected wallet is
//! asked to `wallet_switchEthereumChain`; if it answers that it does not know
//! the chain (4902) it is asked to `wallet_addEthereumChain` with the full
//! descriptor, which needs at least one RPC URL. Nothing is retried and no
//! timeout is imposed: the wallet prompt is the only cancellation point.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::chain::ChainDescriptor;
use crate::error::{ErrorClass, ProviderRpcError, UserFacing};
use crate::wallet::{ConnectorKind, RpcRequest, WalletConnector};

pub const SWITCH_CHAIN_METHOD: &str = "wallet_switchEthereumChain";
pub const ADD_CHAIN_METHOD: &str = "wallet_addEthereumChain";

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Chain {0} is not supported for now...")]
    ChainNotSupported(String),

    #[error("Unable to switch into {0}")]
    CannotSwitch(String),

    #[error("{0}")]
    Provider(#[from] ProviderRpcError),
}

impl UserFacing for SwitchError {
    fn class(&self) -> ErrorClass {
        match self {
            SwitchError::ChainNotSupported(_) => ErrorClass::Input,
            SwitchError::CannotSwitch(_) | SwitchError::Provider(_) => ErrorClass::Wallet,
        }
    }

    fn provider_error(&self) -> Option<&ProviderRpcError> {
        match self {
            SwitchError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

/// Moves the wallet onto a target chain.
pub struct NetworkSwitchController {
    wallet: Rc<dyn WalletConnector>,
    switching: Rc<Cell<bool>>,
}

impl NetworkSwitchController {
    pub fn new(wallet: Rc<dyn WalletConnector>) -> Self {
        Self {
            wallet,
            switching: Rc::new(Cell::new(false)),
        }
    }

    /// Whether a switch is waiting on the wallet.
    pub fn is_switching(&self) -> bool {
        self.switching.get()
    }

    pub async fn switch_to(&self, chain: &ChainDescriptor) -> Result<(), SwitchError> {
        let _guard = InFlight::enter(&self.switching);
        match self.wallet.connector_kind() {
            Some(ConnectorKind::Network) => {
                debug!(chain_id = chain.chain_id, "repointing read-only network connector");
                self.wallet.change_network_chain_id(chain.chain_id);
                Ok(())
            }
            Some(ConnectorKind::Injected) => self.switch_injected(chain).await,
            _ => Err(SwitchError::CannotSwitch(chain.name.clone())),
        }
    }

    async fn switch_injected(&self, chain: &ChainDescriptor) -> Result<(), SwitchError> {
        let Some(ethereum) = self.wallet.injected() else {
            return Err(SwitchError::CannotSwitch(chain.name.clone()));
        };

        info!(chain_id = chain.chain_id, "asking wallet to switch network");
        let switch = RpcRequest::new(
            SWITCH_CHAIN_METHOD,
            json!([{ "chainId": chain.hex_chain_id() }]),
        );
        match ethereum.request(switch).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                if !chain.can_be_added() {
                    return Err(SwitchError::ChainNotSupported(chain.name.clone()));
                }
                info!(chain_id = chain.chain_id, "wallet does not know chain, asking to add it");
                let add = RpcRequest::new(ADD_CHAIN_METHOD, json!([chain.add_chain_params()]));
                ethereum.request(add).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Advisory in-flight flag, cleared when the guard drops on any path.
pub(crate) struct InFlight {
    flag: Rc<Cell<bool>>,
}

impl InFlight {
    pub(crate) fn enter(flag: &Rc<Cell<bool>>) -> Self {
        flag.set(true);
        Self { flag: flag.clone() }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
