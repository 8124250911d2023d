//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!
//! Consumers:
//!     → stdout/stderr of the controller (collected by the container runtime)
//! ```
//!
//! # Design Decisions
//! - Structured fields (pid, digest, host_count) rather than formatted text
//! - JSON format for production, pretty format for development
//! - No network endpoint: the controller exposes no API surface

pub mod logging;
