// =============================================================================
// Oven Notifier Constants
// =============================================================================
// This file contains all constants used throughout the notifier to enable
// easy tuning and configuration from a single location.

use crate::models::Network;

// =============================================================================
// CONTRACT ADDRESSES
// =============================================================================

/// Oven Factory contract address on mainnet
pub const FACTORY_ADDRESS_MAINNET: &str = "KT19ZQd4mGFA7KWmdo6x1yEv3TbbYsdEsNH9";

/// Oven Factory contract address on ghostnet
pub const FACTORY_ADDRESS_TESTNET: &str = "KT1F5RV3Y1iqC8enFZBC5gsZtXoVUKGSRXq4";

/// Big map holding the oven registry entries on mainnet
pub const OVEN_REGISTRY_BIG_MAP_MAINNET: u64 = 380;

/// Big map holding the oven registry entries on ghostnet
pub const OVEN_REGISTRY_BIG_MAP_TESTNET: u64 = 14569;

// =============================================================================
// EXPLORER CONFIGURATION
// =============================================================================

/// Default block-explorer API base URL (override with EXPLORER_BASE_URL)
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://api.better-call.dev/v1";

/// The explorer's `from` bound is inclusive of the watermark, so queries add
/// one second to avoid re-fetching the boundary operation
pub const WATERMARK_QUERY_OFFSET_MS: i64 = 1_000;

// =============================================================================
// WATCHER SCHEDULING
// =============================================================================

/// How often each contract watcher polls for new operations
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 900;

/// Pause between oven watcher starts so first-poll storage queries don't
/// burst the upstream API
pub const DEFAULT_OVEN_START_DELAY_MS: u64 = 250;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Maximum explorer API requests per window, shared by all watchers
pub const EXPLORER_RATE_LIMIT_PER_MINUTE: usize = 60;

/// Maximum webhook deliveries per window
pub const WEBHOOK_RATE_LIMIT_PER_MINUTE: usize = 30;

/// Rate limit window duration in seconds
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

// =============================================================================
// UPSTREAM RETRY
// =============================================================================

/// Attempts per explorer request before the error is surfaced
pub const UPSTREAM_RETRY_ATTEMPTS: u32 = 3;

/// Delay between retry attempts in milliseconds
pub const UPSTREAM_RETRY_DELAY_MS: u64 = 500;

// =============================================================================
// PROTOCOL ENTRYPOINTS & KINDS
// =============================================================================

/// Factory entrypoint that originates a new oven
pub const ENTRYPOINT_MAKE_OVEN: &str = "makeOven";

/// Bare-transfer entrypoint; only owner-initiated calls are notified
pub const ENTRYPOINT_DEFAULT: &str = "default";

/// Operation-group record kind denoting a contract creation
pub const OPERATION_KIND_ORIGINATION: &str = "origination";

/// Storage field holding an oven's owner address
pub const STORAGE_OWNER_FIELD: &str = "owner";

// =============================================================================
// HELPER FUNCTIONS FOR NETWORK LOOKUPS
// =============================================================================

/// Factory contract address for a network
pub fn factory_address(network: Network) -> &'static str {
    match network {
        Network::Mainnet => FACTORY_ADDRESS_MAINNET,
        Network::Testnet => FACTORY_ADDRESS_TESTNET,
    }
}

/// Oven registry big map id for a network
pub fn oven_registry_big_map(network: Network) -> u64 {
    match network {
        Network::Mainnet => OVEN_REGISTRY_BIG_MAP_MAINNET,
        Network::Testnet => OVEN_REGISTRY_BIG_MAP_TESTNET,
    }
}
