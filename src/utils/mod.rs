pub mod config;
pub mod logging;
pub mod rate_limit;

pub use config::{Config, NetworkConfig};
pub use logging::init_logging;
pub use rate_limit::RateLimiter;
