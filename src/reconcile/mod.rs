//! Reconcile loop.
//!
//! # State Machine
//! ```text
//! Init ─▶ Synced ─▶ WaitingForEvent ─▶ Reconciling ─┐
//!                        ▲                          │
//!                        └──────────────────────────┘
//! ```
//!
//! # Sync Pass
//! ```text
//! source.list() → builder.build() → renderer.render()
//!     → unchanged since last write?  → done (no reload)
//!     → write config file            → failure: logged, retried next pass
//!     → launch() first time, reload() afterwards
//! ```
//!
//! # Design Decisions
//! - Any notification triggers a full resync; deltas are never applied
//! - One pass at a time: no concurrent writers or reload signals
//! - List/watch failures, template failures and the first launch are fatal
//! - Write and reload failures are logged and the loop keeps waiting

mod controller;

use thiserror::Error;

use crate::process::SupervisorError;
use crate::render::RenderError;
use crate::source::SourceError;

pub use controller::{write_config, ReconcileLoop, SyncOutcome};

/// Unrecoverable reconcile failures. The process is expected to exit.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to list routing objects: {0}")]
    List(#[source] SourceError),

    #[error("failed to watch routing objects: {0}")]
    Watch(#[source] SourceError),

    #[error("routing object stream ended")]
    StreamEnded,

    #[error("failed to render proxy configuration: {0}")]
    Render(#[from] RenderError),

    #[error("proxy supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("failed to start background task: {0}")]
    Io(#[from] std::io::Error),
}
