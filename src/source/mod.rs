//! Routing object sources.
//!
//! # Data Flow
//! ```text
//! list()  → full Vec<RoutingObject> snapshot (blocking/suspending)
//! watch() → WatchStream
//!     next() → Some(Ok(WatchEvent))   added | modified | deleted
//!            → Some(Err(SourceError)) watch failure
//!            → None                   end of stream
//! ```
//!
//! # Design Decisions
//! - Notifications only trigger a resync; consumers never apply deltas
//! - No resume protocol: a failed or ended stream is fatal to the consumer
//! - The stream owns whatever keeps the producer alive (e.g. a file watcher)

pub mod file;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::routing::RoutingObject;

pub use file::FileSource;

/// List/watch access to declarative routing objects.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Return every routing object currently declared.
    async fn list(&self) -> Result<Vec<RoutingObject>, SourceError>;

    /// Subscribe to change notifications.
    async fn watch(&self) -> Result<WatchStream, SourceError>;
}

/// Errors reported by a route source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Kind of change a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Added => "added",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub object: RoutingObject,
}

/// Sending half of a [`WatchStream`].
pub type WatchSender = mpsc::UnboundedSender<Result<WatchEvent, SourceError>>;

/// Stream of change notifications.
pub struct WatchStream {
    rx: mpsc::UnboundedReceiver<Result<WatchEvent, SourceError>>,
    _guard: Option<Box<dyn Send>>,
}

impl WatchStream {
    /// Create a connected sender/stream pair.
    pub fn channel() -> (WatchSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, _guard: None })
    }

    /// Keep `guard` alive for as long as the stream is.
    pub fn with_guard(mut self, guard: impl Send + 'static) -> Self {
        self._guard = Some(Box::new(guard));
        self
    }

    /// Next notification. `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<Result<WatchEvent, SourceError>> {
        self.rx.recv().await
    }
}

impl fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchStream")
            .field("guarded", &self._guard.is_some())
            .finish()
    }
}
