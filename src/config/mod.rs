// ==========================================
// Fuel Dispatch - Configuration layer
// ==========================================
// Storage: config_kv table (global scope)
// ==========================================

pub mod config_manager;
pub mod dispatch_config;
pub mod dispatch_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use dispatch_config::DispatchConfig;
pub use dispatch_config_trait::DispatchConfigReader;
