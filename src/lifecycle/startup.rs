//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every subsystem from the validated configuration
//! - Start the reaper before anything can spawn a child
//! - Hand control to the reconcile loop until shutdown or a fatal error
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;

use crate::config::ControllerConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::process::reaper::{should_reap, Reaper};
use crate::process::ProcessSupervisor;
use crate::reconcile::{ReconcileError, ReconcileLoop};
use crate::render::{CaddyfileRenderer, RenderedConfig, Renderer};
use crate::routing::RouteTableBuilder;
use crate::source::{FileSource, RouteSource};

/// Run the controller until shutdown or a fatal error.
pub async fn run(config: ControllerConfig) -> Result<(), ReconcileError> {
    let renderer = CaddyfileRenderer::new(&config.render)?;
    let shutdown = Arc::new(Shutdown::new());

    if should_reap(config.reaper.mode) {
        let reaper = Reaper::new()?;
        tokio::spawn(reaper.run(shutdown.subscribe()));
    } else {
        tracing::debug!(mode = ?config.reaper.mode, "Reaper disabled");
    }

    let supervisor = ProcessSupervisor::new(&config.proxy)?;
    let source = FileSource::new(&config.source.manifest_path);
    let builder = RouteTableBuilder::new(config.source.resolution);

    tracing::info!(
        manifest = ?config.source.manifest_path,
        config_path = ?config.proxy.config_path,
        binary = %config.proxy.binary,
        resolution = ?config.source.resolution,
        "Controller starting"
    );

    let controller = ReconcileLoop::new(source, builder, renderer, supervisor, &config.proxy.config_path);

    let stop = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());
    let result = controller.run(stop).await;

    // Stop the reaper whichever way the loop ended.
    shutdown.trigger();
    result
}

/// Render the configuration for the current manifest without touching
/// the proxy or the config file.
pub async fn render_once(config: &ControllerConfig) -> Result<RenderedConfig, ReconcileError> {
    let renderer = CaddyfileRenderer::new(&config.render)?;
    let objects = FileSource::new(&config.source.manifest_path)
        .list()
        .await
        .map_err(ReconcileError::List)?;
    let table = RouteTableBuilder::new(config.source.resolution).build(&objects);
    Ok(renderer.render(&table)?)
}
