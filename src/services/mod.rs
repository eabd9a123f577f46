pub mod explorer;
pub mod formatter;
pub mod notifier;
pub mod registry;

pub use explorer::ExplorerClient;
pub use notifier::WebhookNotifier;
pub use registry::{OvenRegistryClient, OvenSource};
