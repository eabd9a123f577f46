pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod supervisor;
pub mod utils;
pub mod watcher;

pub use error::{Result, WatcherError};
pub use models::{ContractKind, Network, Operation};
pub use utils::config::Config;
pub use utils::logging::init_logging;
