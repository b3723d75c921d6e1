//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → settings.rs (compile into typed, optional sub-configurations)
//!     → Settings (immutable)
//!     → shared via Arc by the request pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once compiled; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{ExtOption, ListenerConfig, LogConfig, RobotsOption, ServerConfig, TlsConfig};
pub use settings::{ProxySettings, RobotsPolicy, Settings, StaticSettings, TlsSettings};
pub use validation::{validate_config, ValidationError};
