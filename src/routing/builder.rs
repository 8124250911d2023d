//! RouteTable construction from a full list of routing objects.
//!
//! # Responsibilities
//! - Add every host/path pair declared by every object
//! - Merge path sets of objects sharing a host
//! - Resolve each backend into upstream addresses
//!
//! # Design Decisions
//! - Pure transformation: no I/O, no errors
//! - Collisions are resolved by input order (later object wins), not reported
//! - Hosts, paths and upstream addresses are single proxy tokens; an entry
//!   carrying whitespace, control characters or braces is skipped with a
//!   warning so it cannot rewrite the rendered config

use crate::config::Resolution;
use crate::routing::object::{BackendTarget, RoutingObject};
use crate::routing::table::{RouteTable, Upstreams};

/// Builds a [`RouteTable`] from routing objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteTableBuilder {
    resolution: Resolution,
}

impl RouteTableBuilder {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    /// Build a fresh table from the complete object list.
    pub fn build(&self, objects: &[RoutingObject]) -> RouteTable {
        let mut table = RouteTable::new();

        for object in objects {
            for rule in &object.rules {
                for http_path in &rule.paths {
                    let path = if http_path.path.is_empty() {
                        "/"
                    } else {
                        http_path.path.as_str()
                    };
                    let upstreams = self.resolve(&object.namespace, &http_path.backend);

                    if let Some(bad) = std::iter::once(rule.host.as_str())
                        .chain(std::iter::once(path))
                        .chain(upstreams.iter().map(String::as_str))
                        .find(|token| !is_plain_token(token))
                    {
                        tracing::warn!(
                            object = %object.key(),
                            host = ?rule.host,
                            path = ?path,
                            token = ?bad,
                            "Skipping route with characters the proxy config cannot carry"
                        );
                        continue;
                    }

                    if let Some(previous) = table.insert(rule.host.as_str(), path, upstreams) {
                        tracing::debug!(
                            host = %rule.host,
                            path = %path,
                            object = %object.key(),
                            replaced = ?previous,
                            "Path already routed, later object wins"
                        );
                    }
                }
            }
        }

        table
    }

    fn resolve(&self, namespace: &str, backend: &BackendTarget) -> Upstreams {
        match self.resolution {
            Resolution::Service => {
                let mut upstreams = Upstreams::new();
                upstreams.insert(format!("{}.{}:{}", backend.service, namespace, backend.port));
                upstreams
            }
            Resolution::Endpoints => backend
                .endpoints
                .iter()
                .map(|ip| format!("{}:{}", ip, backend.port))
                .collect(),
        }
    }
}

/// A value that renders as exactly one token: no whitespace, no control
/// characters and no block braces.
fn is_plain_token(token: &str) -> bool {
    !token
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '{' || c == '}')
}
