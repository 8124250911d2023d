//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControllerConfig (validated, immutable)
//!     → sections handed to the constructors of each subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a controller restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No global state: paths, signals and templates travel in these structs

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ControllerConfig;
pub use schema::{
    LogFormat, ObservabilityConfig, ProxyProcessConfig, ReaperConfig, ReaperMode, RenderConfig,
    Resolution, SourceConfig,
};
