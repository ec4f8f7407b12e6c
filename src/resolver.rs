//! Chain resolution.
//!
//! Several sources suggest which chain the session targets. They are merged
//! with a fixed precedence:
//!
//! 1. a route / deep-link `network` parameter always wins, and asks the wallet
//!    to switch even when a chain is already resolved;
//! 2. the wallet's own chain, once it is active, fills an empty resolution;
//! 3. an artifact's `networks` hint fills an empty resolution when no route
//!    parameter named a known chain.
//!
//! An explicit pick by the user behaves like a route parameter and retires the
//! route that came before it. Chain ids the registry does not know are ignored.
//! Re-applying a signal never changes an existing resolution except under
//! rule 1.

use tracing::debug;

use crate::chain::{ChainDescriptor, ChainRegistry};
use crate::wallet::WalletView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSignal {
    Route(u64),
    WalletActive(u64),
    ArtifactHint(u64),
    UserSelected(u64),
}

impl ChainSignal {
    pub fn chain_id(self) -> u64 {
        match self {
            ChainSignal::Route(id)
            | ChainSignal::WalletActive(id)
            | ChainSignal::ArtifactHint(id)
            | ChainSignal::UserSelected(id) => id,
        }
    }
}

/// Outcome of applying one signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// The resolved chain after the signal.
    pub chain: Option<ChainDescriptor>,
    /// Whether the signal changed the resolved chain.
    pub changed: bool,
    /// A wallet switch to request once the new chain is in session state.
    pub switch_to: Option<ChainDescriptor>,
}

pub struct ChainResolver {
    registry: ChainRegistry,
    resolved: Option<ChainDescriptor>,
    route_chain: Option<u64>,
    // (target chain, wallet chain) of the last switch asked for
    last_switch: Option<(u64, Option<u64>)>,
}

impl ChainResolver {
    pub fn new(registry: ChainRegistry) -> Self {
        Self {
            registry,
            resolved: None,
            route_chain: None,
            last_switch: None,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn resolved(&self) -> Option<&ChainDescriptor> {
        self.resolved.as_ref()
    }

    /// The known chain a route parameter asked for, if any.
    pub fn route_chain(&self) -> Option<u64> {
        self.route_chain
    }

    pub fn apply(&mut self, signal: ChainSignal, wallet: WalletView) -> Resolution {
        let Some(chain) = self.registry.get(signal.chain_id()).cloned() else {
            debug!(?signal, "ignoring chain signal for unknown chain");
            return self.unchanged();
        };

        match signal {
            ChainSignal::Route(id) => {
                self.route_chain = Some(id);
                let changed = self.set(chain.clone());
                let switch_to = self.switch_intent(chain, wallet);
                self.resolution(changed, switch_to)
            }
            ChainSignal::WalletActive(_) => {
                if !wallet.active || self.resolved.is_some() {
                    return self.unchanged();
                }
                let changed = self.set(chain);
                self.resolution(changed, None)
            }
            ChainSignal::ArtifactHint(_) => {
                if self.route_chain.is_some() || self.resolved.is_some() {
                    return self.unchanged();
                }
                let changed = self.set(chain.clone());
                let switch_to = self.switch_intent(chain, wallet);
                self.resolution(changed, switch_to)
            }
            ChainSignal::UserSelected(id) => {
                // a later pick supersedes the route
                self.route_chain = None;
                let changed = self.set(chain.clone());
                // an explicit pick always prompts, even if the same switch was
                // asked for before
                let switch_to = wallet.is_off(id).then(|| {
                    self.last_switch = Some((id, wallet.chain_id));
                    chain
                });
                self.resolution(changed, switch_to)
            }
        }
    }

    fn set(&mut self, chain: ChainDescriptor) -> bool {
        if self.resolved.as_ref() == Some(&chain) {
            return false;
        }
        debug!(chain_id = chain.chain_id, name = %chain.name, "chain resolved");
        self.resolved = Some(chain);
        true
    }

    fn switch_intent(
        &mut self,
        chain: ChainDescriptor,
        wallet: WalletView,
    ) -> Option<ChainDescriptor> {
        if !wallet.is_off(chain.chain_id) {
            return None;
        }
        let key = (chain.chain_id, wallet.chain_id);
        if self.last_switch == Some(key) {
            return None;
        }
        self.last_switch = Some(key);
        Some(chain)
    }

    fn resolution(&self, changed: bool, switch_to: Option<ChainDescriptor>) -> Resolution {
        Resolution {
            chain: self.resolved.clone(),
            changed,
            switch_to,
        }
    }

    fn unchanged(&self) -> Resolution {
        self.resolution(false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_on(chain_id: u64) -> WalletView {
        WalletView {
            active: true,
            chain_id: Some(chain_id),
        }
    }

    fn resolver() -> ChainResolver {
        ChainResolver::new(ChainRegistry::builtin())
    }

    fn resolved_id(resolver: &ChainResolver) -> Option<u64> {
        resolver.resolved().map(|c| c.chain_id)
    }

    fn permutations(signals: [ChainSignal; 3]) -> Vec<Vec<ChainSignal>> {
        let [a, b, c] = signals;
        vec![
            vec![a, b, c],
            vec![a, c, b],
            vec![b, a, c],
            vec![b, c, a],
            vec![c, a, b],
            vec![c, b, a],
        ]
    }

    #[test]
    fn order_independent_with_one_known_signal() {
        let cases = [
            [
                ChainSignal::Route(137),
                ChainSignal::WalletActive(999_001),
                ChainSignal::ArtifactHint(999_002),
            ],
            [
                ChainSignal::Route(999_001),
                ChainSignal::WalletActive(10),
                ChainSignal::ArtifactHint(999_002),
            ],
            [
                ChainSignal::Route(999_001),
                ChainSignal::WalletActive(999_002),
                ChainSignal::ArtifactHint(8453),
            ],
        ];
        for (signals, expected) in cases.into_iter().zip([137, 10, 8453]) {
            for order in permutations(signals) {
                let mut resolver = resolver();
                for signal in &order {
                    resolver.apply(*signal, active_on(999_001));
                }
                assert_eq!(resolved_id(&resolver), Some(expected), "{order:?}");
            }
        }
    }

    #[test]
    fn route_overrides_existing_and_requests_switch() {
        let mut resolver = resolver();
        resolver.apply(ChainSignal::WalletActive(1), active_on(1));
        assert_eq!(resolved_id(&resolver), Some(1));

        let resolution = resolver.apply(ChainSignal::Route(137), active_on(1));

        assert!(resolution.changed);
        assert_eq!(resolution.chain.unwrap().chain_id, 137);
        assert_eq!(resolution.switch_to.unwrap().chain_id, 137);
    }

    #[test]
    fn lower_priority_signals_do_not_overwrite() {
        let mut resolver = resolver();
        resolver.apply(ChainSignal::ArtifactHint(10), active_on(10));
        let resolution = resolver.apply(ChainSignal::WalletActive(1), active_on(1));
        assert!(!resolution.changed);
        assert_eq!(resolved_id(&resolver), Some(10));
    }

    #[test]
    fn known_route_blocks_artifact_hint() {
        let mut resolver = resolver();
        resolver.apply(ChainSignal::Route(137), WalletView::default());
        let resolution = resolver.apply(ChainSignal::ArtifactHint(1), active_on(1));
        assert!(resolution.switch_to.is_none());
        assert_eq!(resolved_id(&resolver), Some(137));
    }

    #[test]
    fn inactive_wallet_does_not_resolve() {
        let mut resolver = resolver();
        let resolution = resolver.apply(
            ChainSignal::WalletActive(1),
            WalletView {
                active: false,
                chain_id: Some(1),
            },
        );
        assert!(resolution.chain.is_none());
    }

    #[test]
    fn unknown_chains_never_resolve() {
        let mut resolver = resolver();
        for signal in [
            ChainSignal::Route(0),
            ChainSignal::WalletActive(u64::MAX),
            ChainSignal::ArtifactHint(5777),
            ChainSignal::UserSelected(12345678),
        ] {
            let resolution = resolver.apply(signal, active_on(1));
            assert_eq!(resolution, Resolution::default());
        }
        assert!(resolver.route_chain().is_none());
    }

    #[test]
    fn repeated_signals_are_idempotent() {
        let mut resolver = resolver();
        let first = resolver.apply(ChainSignal::ArtifactHint(137), active_on(1));
        assert_eq!(first.switch_to.unwrap().chain_id, 137);

        let again = resolver.apply(ChainSignal::ArtifactHint(137), active_on(1));
        assert_eq!(again.switch_to, None);
        assert!(!again.changed);

        let route = resolver.apply(ChainSignal::Route(137), active_on(1));
        assert!(!route.changed);
        // same target from the same wallet chain was already requested
        assert_eq!(route.switch_to, None);
    }

    #[test]
    fn route_switch_fires_again_once_wallet_moves() {
        let mut resolver = resolver();
        assert!(resolver.apply(ChainSignal::Route(137), WalletView::default()).switch_to.is_none());
        assert!(resolver.apply(ChainSignal::Route(137), active_on(1)).switch_to.is_some());
        assert!(resolver.apply(ChainSignal::Route(137), active_on(1)).switch_to.is_none());
        assert!(resolver.apply(ChainSignal::Route(137), active_on(137)).switch_to.is_none());
        assert!(resolver.apply(ChainSignal::Route(137), active_on(10)).switch_to.is_some());
    }

    #[test]
    fn user_selection_always_prompts_when_off_chain() {
        let mut resolver = resolver();
        resolver.apply(ChainSignal::Route(137), active_on(1));
        let picked = resolver.apply(ChainSignal::UserSelected(137), active_on(1));
        assert!(!picked.changed);
        assert_eq!(picked.switch_to.unwrap().chain_id, 137);
    }

    #[test]
    fn user_selection_retires_route() {
        let mut resolver = resolver();
        resolver.apply(ChainSignal::Route(137), active_on(137));
        resolver.apply(ChainSignal::UserSelected(10), active_on(137));
        assert_eq!(resolver.route_chain(), None);
        assert_eq!(resolved_id(&resolver), Some(10));

        // an unknown pick leaves the route in place
        let mut other = ChainResolver::new(ChainRegistry::builtin());
        other.apply(ChainSignal::Route(137), active_on(137));
        other.apply(ChainSignal::UserSelected(999_001), active_on(137));
        assert_eq!(other.route_chain(), Some(137));
    }
}
