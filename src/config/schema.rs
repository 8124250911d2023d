//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the controller.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the ingress controller.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// Where routing objects come from.
    pub source: SourceConfig,

    /// The supervised proxy process.
    pub proxy: ProxyProcessConfig,

    /// Proxy configuration templates.
    pub render: RenderConfig,

    /// Orphan reaping.
    pub reaper: ReaperConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Routing object source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// TOML manifest holding `[[ingress]]` tables.
    pub manifest_path: PathBuf,

    /// How backends are turned into upstream addresses.
    pub resolution: Resolution,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("/etc/ingress/ingresses.toml"),
            resolution: Resolution::default(),
        }
    }
}

/// Backend resolution granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// One `<service>.<namespace>:<port>` address per backend.
    #[default]
    Service,
    /// One `<ip>:<port>` address per ready endpoint.
    Endpoints,
}

/// Supervised proxy process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyProcessConfig {
    /// Proxy executable (looked up in `PATH` when not absolute).
    pub binary: String,

    /// Argument template. `${config}` and `${pidfile}` are substituted.
    pub args: Vec<String>,

    /// Generated configuration file.
    pub config_path: PathBuf,

    /// Pid file written by the proxy.
    pub pid_file: PathBuf,

    /// Signal asking the proxy to re-read its configuration.
    pub reload_signal: String,

    /// Signal sent to the proxy when the controller shuts down.
    pub shutdown_signal: String,
}

impl Default for ProxyProcessConfig {
    fn default() -> Self {
        Self {
            binary: "caddy".to_string(),
            args: vec![
                "-conf".to_string(),
                "${config}".to_string(),
                "-pidfile".to_string(),
                "${pidfile}".to_string(),
            ],
            config_path: PathBuf::from("/Caddyfile"),
            pid_file: PathBuf::from("/var/run/caddy.pid"),
            reload_signal: "SIGUSR1".to_string(),
            shutdown_signal: "SIGTERM".to_string(),
        }
    }
}

/// Template fragments for the generated proxy configuration.
///
/// Placeholders use `${name}` syntax; anything else is copied verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Opens a host block. Placeholders: `host`.
    pub site_open: String,

    /// One path directive. Placeholders: `host`, `path`, `upstreams`.
    pub route: String,

    /// Emitted instead of `route` when a path has no upstreams.
    /// Placeholders: `host`, `path`.
    pub empty_route: String,

    /// Closes a host block. Placeholders: `host`.
    pub site_close: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            site_open: "http://${host} {".to_string(),
            route: "  proxy ${path} ${upstreams} {\n    proxy_header X-Real-IP {remote}\n  }"
                .to_string(),
            empty_route: "  # ${path}: no ready endpoints".to_string(),
            site_close: "}".to_string(),
        }
    }
}

/// Orphan reaping configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaperConfig {
    pub mode: ReaperMode,
}

/// When the controller collects exit statuses of arbitrary descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaperMode {
    /// Only when running as PID 1.
    #[default]
    Auto,
    Always,
    Never,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (`info`, `ingress_controller=debug`, ...). `RUST_LOG` wins.
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
