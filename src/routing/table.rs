//! In-memory routing model.

use std::collections::{BTreeMap, BTreeSet};

/// Resolved upstream addresses (`host:port`) for one path.
pub type Upstreams = BTreeSet<String>;

/// Paths routed for a single host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VHost {
    paths: BTreeMap<String, Upstreams>,
}

impl VHost {
    /// Iterate paths in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &Upstreams)> {
        self.paths.iter().map(|(path, upstreams)| (path.as_str(), upstreams))
    }

    pub fn get(&self, path: &str) -> Option<&Upstreams> {
        self.paths.get(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Snapshot of host → path → upstreams.
///
/// Built in one go by [`RouteTableBuilder`](super::RouteTableBuilder) and
/// never mutated once handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    hosts: BTreeMap<String, VHost>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upstreams for `host` + `path`.
    /// Returns the upstreams that were replaced, if any.
    pub fn insert(
        &mut self,
        host: impl Into<String>,
        path: impl Into<String>,
        upstreams: Upstreams,
    ) -> Option<Upstreams> {
        self.hosts
            .entry(host.into())
            .or_default()
            .paths
            .insert(path.into(), upstreams)
    }

    pub fn get(&self, host: &str, path: &str) -> Option<&Upstreams> {
        self.hosts.get(host).and_then(|vhost| vhost.get(path))
    }

    pub fn vhost(&self, host: &str) -> Option<&VHost> {
        self.hosts.get(host)
    }

    /// Iterate hosts in lexicographic order.
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &VHost)> {
        self.hosts.iter().map(|(host, vhost)| (host.as_str(), vhost))
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Total number of host/path pairs.
    pub fn path_count(&self) -> usize {
        self.hosts.values().map(VHost::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl<H, P> FromIterator<(H, P, Upstreams)> for RouteTable
where
    H: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (H, P, Upstreams)>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for (host, path, upstreams) in iter {
            table.insert(host, path, upstreams);
        }
        table
    }
}
