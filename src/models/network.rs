use serde::{Deserialize, Serialize};
use std::fmt;

/// Network environment a contract lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Path segment the explorer API expects for this network
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "ghostnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of contract a watcher is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Factory,
    Oven,
}
