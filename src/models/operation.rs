use serde::Deserialize;

/// A single applied operation as returned by the explorer API.
///
/// Unknown fields are ignored; the explorer attaches plenty of metadata the
/// notifier has no use for.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    /// Milliseconds since epoch
    pub timestamp: i64,
    /// Entrypoint invoked; bare transfers arrive as "default"
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Caller address
    pub source: String,
    /// Synthetic contract-to-contract call, never user-initiated
    #[serde(default)]
    pub internal: bool,
    /// Operation group hash
    pub hash: String,
    #[serde(default)]
    pub network: Option<String>,
    /// Mutez attached to the call, if any
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl Operation {
    pub fn entrypoint_is(&self, name: &str) -> bool {
        self.entrypoint.as_deref() == Some(name)
    }
}

/// One record of an operation group, from the `/opg/{hash}` lookup
#[derive(Debug, Clone, Deserialize)]
pub struct OperationGroupRecord {
    pub kind: String,
    #[serde(default)]
    pub destination: Option<String>,
}

/// Decoded contract storage node. The explorer renders storage as a tree of
/// named nodes; owner extraction only ever needs one level of children.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub children: Vec<StorageNode>,
}

/// One key of a big map, from the `/bigmap/{network}/{ptr}/keys` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct BigMapKey {
    pub data: BigMapKeyData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BigMapKeyData {
    pub key: BigMapKeyValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BigMapKeyValue {
    #[serde(default)]
    pub value: Option<String>,
}
