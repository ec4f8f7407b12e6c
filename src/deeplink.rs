//! Deep-link parameters.
//!
//! A link such as
//! `?json=https://host/Token.json&network=137&address=0x..&func=transfer&args.to=0x..`
//! seeds a session. Every field is optional and advisory: seeds never replace
//! a value the user has edited since.

use url::{form_urlencoded, Url};

use crate::dispatch::ArgumentMap;

pub const DEFAULT_ARGS_PREFIX: &str = "args.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
    /// `json`: where to fetch the artifact from.
    pub artifact_url: Option<String>,
    pub address: Option<String>,
    /// `network`: decimal chain id. Non-numeric values are dropped.
    pub network: Option<u64>,
    /// `func`: function to select once the ABI is loaded.
    pub function: Option<String>,
    /// Namespaced argument seeds, prefix stripped.
    pub args: ArgumentMap,
}

impl DeepLink {
    /// Parses a query string, with or without its leading `?`.
    pub fn from_query(query: &str, args_prefix: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(
            form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
            args_prefix,
        )
    }

    pub fn from_url(url: &Url, args_prefix: &str) -> Self {
        Self::from_pairs(
            url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())),
            args_prefix,
        )
    }

    pub fn parse(url: &str, args_prefix: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(&Url::parse(url)?, args_prefix))
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String)>, args_prefix: &str) -> Self {
        let mut link = DeepLink::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "json" => link.artifact_url = Some(value),
                "address" => link.address = Some(value),
                "network" => link.network = value.trim().parse().ok(),
                "func" => link.function = Some(value),
                _ => {
                    if let Some(name) = key.strip_prefix(args_prefix).filter(|n| !n.is_empty()) {
                        link.args.insert(name.to_string(), value);
                    }
                }
            }
        }
        link
    }

    pub fn is_empty(&self) -> bool {
        *self == DeepLink::default()
    }
}
