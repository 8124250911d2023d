//! Proxy configuration rendering.
//!
//! # Data Flow
//! ```text
//! RenderConfig (template fragments)
//!     → template.rs (compile once, reject unknown placeholders)
//!
//! RouteTable
//!     → caddyfile.rs (one site block per host, one directive per path)
//!     → RenderedConfig (immutable bytes)
//! ```
//!
//! # Design Decisions
//! - Output is a pure function of the table: byte-identical for equal tables
//! - Template errors are fatal; a partially rendered config is never returned
//! - The `Renderer` trait keeps the output grammar swappable

pub mod caddyfile;
pub mod template;

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::routing::RouteTable;

pub use caddyfile::CaddyfileRenderer;
pub use template::Template;

/// Serializes a [`RouteTable`] into proxy configuration text.
pub trait Renderer: Send + Sync {
    fn render(&self, table: &RouteTable) -> Result<RenderedConfig, RenderError>;
}

/// Errors raised while compiling or applying templates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A `${` with no closing brace.
    #[error("template `{fragment}`: unterminated placeholder at byte {offset}")]
    Unterminated { fragment: String, offset: usize },

    /// A placeholder this fragment does not provide.
    #[error("template `{fragment}`: unknown placeholder `{name}`")]
    UnknownPlaceholder { fragment: String, name: String },

    /// A placeholder with no value at render time.
    #[error("template `{fragment}`: no value supplied for `{name}`")]
    Unresolved { fragment: String, name: String },
}

/// Output of one render pass.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    bytes: Vec<u8>,
}

impl RenderedConfig {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Short content digest for log lines: the first 8 bytes of the
    /// SHA-256, hex encoded. Stable across builds.
    pub fn digest(&self) -> String {
        Sha256::digest(&self.bytes)[..8]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl fmt::Debug for RenderedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedConfig")
            .field("len", &self.bytes.len())
            .field("digest", &self.digest())
            .finish()
    }
}

impl fmt::Display for RenderedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
