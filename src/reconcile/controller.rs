//! The reconcile loop proper.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;

use crate::process::{ProxyProcess, ReloadOutcome};
use crate::reconcile::ReconcileError;
use crate::render::{RenderedConfig, Renderer};
use crate::routing::RouteTableBuilder;
use crate::source::RouteSource;

/// Result of one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Rendered output matched the last write; nothing touched.
    Unchanged,
    /// Config written and the proxy started.
    Launched,
    /// Config written and the proxy reloaded (or relaunched).
    Reloaded(ReloadOutcome),
    /// Config could not be written; retried on the next pass.
    WriteFailed,
    /// Config written but the reload failed; retried on the next pass.
    ReloadFailed,
}

/// Mirrors routing objects into the proxy's configuration.
pub struct ReconcileLoop<S, R, P> {
    source: S,
    builder: RouteTableBuilder,
    renderer: R,
    proxy: P,
    config_path: PathBuf,
    last_written: Option<RenderedConfig>,
    launched: bool,
}

impl<S, R, P> ReconcileLoop<S, R, P>
where
    S: RouteSource,
    R: Renderer,
    P: ProxyProcess,
{
    pub fn new(
        source: S,
        builder: RouteTableBuilder,
        renderer: R,
        proxy: P,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            builder,
            renderer,
            proxy,
            config_path: config_path.into(),
            last_written: None,
            launched: false,
        }
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    /// The configuration most recently written to disk.
    pub fn last_written(&self) -> Option<&RenderedConfig> {
        self.last_written.as_ref()
    }

    /// Run until shutdown or a fatal error.
    ///
    /// The watch is opened before the first sync so that nothing changing
    /// in between is missed.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ReconcileError> {
        let mut stream = self.source.watch().await.map_err(ReconcileError::Watch)?;

        self.sync().await?;

        loop {
            tokio::select! {
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        tracing::info!(kind = %event.kind, object = %event.object.key(), "Routing object changed");
                        self.sync().await?;
                    }
                    Some(Err(e)) => return Err(ReconcileError::Watch(e)),
                    None => return Err(ReconcileError::StreamEnded),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Reconcile loop received shutdown signal, stopping proxy");
                    self.proxy.shutdown();
                    return Ok(());
                }
            }
        }
    }

    /// One full pass: list, build, render, write, launch or reload.
    pub async fn sync(&mut self) -> Result<SyncOutcome, ReconcileError> {
        let objects = self.source.list().await.map_err(ReconcileError::List)?;
        let table = self.builder.build(&objects);
        let rendered = self.renderer.render(&table)?;

        if self.last_written.as_ref() == Some(&rendered) {
            tracing::debug!(digest = %rendered.digest(), "Rendered config unchanged, skipping reload");
            return Ok(SyncOutcome::Unchanged);
        }

        if let Err(e) = write_config(&self.config_path, &rendered) {
            tracing::error!(error = %e, path = ?self.config_path, "Failed to write proxy config");
            return Ok(SyncOutcome::WriteFailed);
        }

        tracing::info!(
            objects = objects.len(),
            host_count = table.host_count(),
            path_count = table.path_count(),
            digest = %rendered.digest(),
            "Proxy config written"
        );
        self.last_written = Some(rendered);

        if !self.launched {
            let pid = self.proxy.launch()?;
            self.launched = true;
            tracing::info!(pid = %pid, "Proxy running");
            return Ok(SyncOutcome::Launched);
        }

        match self.proxy.reload() {
            Ok(outcome) => {
                tracing::info!(outcome = %outcome, "Proxy reloaded");
                Ok(SyncOutcome::Reloaded(outcome))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload proxy");
                // Forget the write so the next pass reloads again.
                self.last_written = None;
                Ok(SyncOutcome::ReloadFailed)
            }
        }
    }
}

/// Replace the config file in one step (write beside it, then rename).
pub fn write_config(path: &Path, rendered: &RenderedConfig) -> io::Result<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, rendered.as_bytes())?;
    fs::rename(&staging, path)
}
