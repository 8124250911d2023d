//! Ingress Controller Library
//!
//! Mirrors declared routing intent (host/path → backend) into the
//! configuration of a supervised reverse-proxy process.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod process;
pub mod reconcile;
pub mod render;
pub mod routing;
pub mod source;

pub use config::schema::ControllerConfig;
pub use lifecycle::Shutdown;
pub use reconcile::ReconcileLoop;
