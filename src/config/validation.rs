//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that signal names and log filters parse
//! - Check that template fragments compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControllerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::str::FromStr;

use nix::sys::signal::Signal;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ControllerConfig;
use crate::render::CaddyfileRenderer;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `proxy.binary`).
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ControllerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.source.manifest_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("source.manifest_path", "must not be empty"));
    }

    let proxy = &config.proxy;
    if proxy.binary.trim().is_empty() {
        errors.push(ValidationError::new("proxy.binary", "must not be empty"));
    }
    if proxy.config_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("proxy.config_path", "must not be empty"));
    }
    if proxy.pid_file.as_os_str().is_empty() {
        errors.push(ValidationError::new("proxy.pid_file", "must not be empty"));
    }
    if !proxy.args.iter().any(|arg| arg.contains("${config}")) {
        errors.push(ValidationError::new(
            "proxy.args",
            "must pass the generated config via ${config}",
        ));
    }
    if Signal::from_str(&proxy.reload_signal).is_err() {
        errors.push(ValidationError::new(
            "proxy.reload_signal",
            format!("unknown signal {:?}", proxy.reload_signal),
        ));
    }
    if Signal::from_str(&proxy.shutdown_signal).is_err() {
        errors.push(ValidationError::new(
            "proxy.shutdown_signal",
            format!("unknown signal {:?}", proxy.shutdown_signal),
        ));
    }

    if let Err(e) = CaddyfileRenderer::new(&config.render) {
        errors.push(ValidationError::new("render", e.to_string()));
    }

    if let Err(e) = EnvFilter::try_new(&config.observability.log_level) {
        errors.push(ValidationError::new("observability.log_level", e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ControllerConfig::default()), Ok(()));
    }

    #[test]
    fn test_args_must_reference_config() {
        let mut config = ControllerConfig::default();
        config.proxy.args = vec!["-pidfile".into(), "${pidfile}".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "proxy.args");
    }

    #[test]
    fn test_bad_template_is_reported() {
        let mut config = ControllerConfig::default();
        config.render.route = "proxy ${path} ${backend}".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "render");
        assert!(errors[0].message.contains("backend"));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ControllerConfig::default();
        config.proxy.binary = "  ".into();
        config.proxy.shutdown_signal = "TERM".into();
        config.proxy.pid_file = Default::default();

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["proxy.binary", "proxy.pid_file", "proxy.shutdown_signal"]);
    }
}
