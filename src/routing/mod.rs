//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RoutingObject[] (full snapshot from the source)
//!     → builder.rs (merge hosts, resolve backends)
//!     → RouteTable (host → path → upstream set)
//!     → handed to the renderer, then dropped on the next pass
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt wholesale from the full object list, never patched
//! - Host and path keys live in ordered maps so iteration is deterministic
//! - Last writer wins on host/path collisions, in input order
//! - A backend without endpoints still produces a path entry (empty set)

pub mod builder;
pub mod object;
pub mod table;

pub use builder::RouteTableBuilder;
pub use object::{BackendTarget, HttpPath, IngressRule, RoutingObject};
pub use table::{RouteTable, Upstreams, VHost};
