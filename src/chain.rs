//! Static chain registry.
//!
//! Chains are identified by their numeric id. A chain with no RPC URLs can still
//! be selected and switched to when the wallet already knows it, but it cannot
//! be added to a wallet that does not.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    #[serde(default)]
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }
}

/// A known network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    #[serde(default, alias = "rpc")]
    pub rpc_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorer_urls: Vec<String>,
}

impl PartialEq for ChainDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id
    }
}

impl Eq for ChainDescriptor {}

impl ChainDescriptor {
    /// The chain id as the `0x`-prefixed hex quantity wallets expect.
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn can_be_added(&self) -> bool {
        !self.rpc_urls.is_empty()
    }

    /// Parameters for `wallet_addEthereumChain` (EIP-3085).
    pub fn add_chain_params(&self) -> Value {
        let mut params = json!({
            "chainId": self.hex_chain_id(),
            "chainName": self.name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
        });
        if !self.block_explorer_urls.is_empty() {
            params["blockExplorerUrls"] = json!(self.block_explorer_urls);
        }
        params
    }
}

fn chain(
    chain_id: u64,
    name: &str,
    currency: NativeCurrency,
    rpc: &[&str],
    explorer: &str,
) -> ChainDescriptor {
    ChainDescriptor {
        chain_id,
        name: name.to_string(),
        native_currency: currency,
        rpc_urls: rpc.iter().map(|s| s.to_string()).collect(),
        block_explorer_urls: if explorer.is_empty() {
            vec![]
        } else {
            vec![explorer.to_string()]
        },
    }
}

/// Lookup table of chains the engine can resolve to.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Self {
        Self { chains }
    }

    /// The networks shipped with the engine.
    pub fn builtin() -> Self {
        let eth = || NativeCurrency::new("Ether", "ETH");
        Self::new(vec![
            chain(
                1,
                "Ethereum Mainnet",
                eth(),
                &["https://cloudflare-eth.com", "https://rpc.ankr.com/eth"],
                "https://etherscan.io",
            ),
            chain(
                10,
                "OP Mainnet",
                eth(),
                &["https://mainnet.optimism.io"],
                "https://optimistic.etherscan.io",
            ),
            chain(
                56,
                "BNB Smart Chain Mainnet",
                NativeCurrency::new("BNB Chain Native Token", "BNB"),
                &["https://bsc-dataseed.bnbchain.org"],
                "https://bscscan.com",
            ),
            chain(
                100,
                "Gnosis",
                NativeCurrency::new("xDAI", "XDAI"),
                &["https://rpc.gnosischain.com"],
                "https://gnosisscan.io",
            ),
            chain(
                137,
                "Polygon Mainnet",
                NativeCurrency::new("POL", "POL"),
                &["https://polygon-rpc.com"],
                "https://polygonscan.com",
            ),
            chain(
                250,
                "Fantom Opera",
                NativeCurrency::new("Fantom", "FTM"),
                &["https://rpc.ftm.tools"],
                "https://ftmscan.com",
            ),
            chain(8453, "Base", eth(), &["https://mainnet.base.org"], "https://basescan.org"),
            chain(
                17000,
                "Holesky",
                NativeCurrency::new("Testnet Ether", "ETH"),
                &["https://ethereum-holesky-rpc.publicnode.com"],
                "https://holesky.etherscan.io",
            ),
            chain(
                42161,
                "Arbitrum One",
                eth(),
                &["https://arb1.arbitrum.io/rpc"],
                "https://arbiscan.io",
            ),
            chain(
                43114,
                "Avalanche C-Chain",
                NativeCurrency::new("Avalanche", "AVAX"),
                &["https://api.avax.network/ext/bc/C/rpc"],
                "https://snowtrace.io",
            ),
            chain(
                80002,
                "Polygon Amoy",
                NativeCurrency::new("POL", "POL"),
                &["https://rpc-amoy.polygon.technology"],
                "https://amoy.polygonscan.com",
            ),
            chain(
                11155111,
                "Sepolia",
                NativeCurrency::new("Sepolia Ether", "ETH"),
                &["https://rpc.sepolia.org"],
                "https://sepolia.etherscan.io",
            ),
            chain(31337, "Localhost", eth(), &["http://127.0.0.1:8545"], ""),
        ])
    }

    /// Adds `extra` chains; an entry with a known id replaces the existing one.
    pub fn with_chains(mut self, extra: impl IntoIterator<Item = ChainDescriptor>) -> Self {
        for chain in extra {
            match self.chains.iter_mut().find(|c| c.chain_id == chain.chain_id) {
                Some(existing) => *existing = chain,
                None => self.chains.push(chain),
            }
        }
        self
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainDescriptor> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    /// Looks up a chain id given as decimal text, the way route parameters and
    /// artifact `networks` keys carry it.
    pub fn get_by_str(&self, chain_id: &str) -> Option<&ChainDescriptor> {
        chain_id.trim().parse::<u64>().ok().and_then(|id| self.get(id))
    }

    /// Chains whose name contains `text` (case-insensitive) or whose id equals it.
    pub fn search(&self, text: &str) -> Vec<&ChainDescriptor> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.chains.iter().collect();
        }
        self.chains
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle) || c.chain_id.to_string() == needle
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.iter()
    }
}
