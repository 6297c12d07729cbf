//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + PORT env
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<RelayConfig>> to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RelayConfig>
//!     → timers pick up new intervals on their next cycle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;
use arc_swap::ArcSwap;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, ObservabilityConfig, RelayConfig, SecurityConfig, StatusConfig,
    SweeperConfig, TimeoutConfig, TlsConfig,
};
pub use watcher::ConfigWatcher;

/// Live configuration shared across tasks.
pub type SharedConfig = Arc<ArcSwap<RelayConfig>>;

/// Wrap a loaded configuration for sharing.
pub fn shared(config: RelayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
