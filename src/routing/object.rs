//! Declarative routing objects as delivered by a route source.

use serde::{Deserialize, Serialize};

/// One declarative routing object (an ingress).
///
/// Owned by the source; the controller only reads snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingObject {
    /// Namespace the object and its backends live in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Object name, unique within the namespace.
    pub name: String,

    /// Host rules declared by this object.
    #[serde(default)]
    pub rules: Vec<IngressRule>,
}

impl RoutingObject {
    /// Identity of the object across snapshots (`namespace/name`).
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// All paths routed for one host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngressRule {
    /// Host name to match. Empty means every host.
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub paths: Vec<HttpPath>,
}

/// A path prefix and the backend serving it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpPath {
    /// Path prefix. Empty is treated as `/`.
    #[serde(default)]
    pub path: String,

    pub backend: BackendTarget,
}

/// Logical backend a path points at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendTarget {
    /// Service name, resolved within the object's namespace.
    pub service: String,

    /// Service port.
    pub port: u16,

    /// Ready endpoint IPs, when the source knows them.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}
