//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Renderer → Supervisor (adopt via pid file)
//!         → Reaper (when PID 1) → Reconcile loop
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → loop stops proxy, reaper exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then renderer, supervisor, reaper, loop
//! - Fail fast: construction errors and fatal loop errors end the process
//! - No retries: an external restart policy owns recovery

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
