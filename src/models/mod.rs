pub mod network;
pub mod operation;

pub use network::{ContractKind, Network};
pub use operation::{BigMapKey, Operation, OperationGroupRecord, StorageNode};
