//! Orphan reaping for when the controller is PID 1.
//!
//! # Responsibilities
//! - Subscribe to SIGCHLD
//! - On every notification, collect exit statuses until none are pending
//!
//! # Design Decisions
//! - Signals are coalesced by the kernel, so each wake drains everything
//! - Subscription happens in `new()`, before any child is spawned

use std::io;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::broadcast;

use crate::config::ReaperMode;

/// Whether reaping should run for `mode` in this process.
pub fn should_reap(mode: ReaperMode) -> bool {
    match mode {
        ReaperMode::Always => true,
        ReaperMode::Never => false,
        ReaperMode::Auto => std::process::id() == 1,
    }
}

/// Collect every terminated child without blocking.
pub fn reap_pending() -> Vec<(Pid, WaitStatus)> {
    let mut reaped = Vec::new();

    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => match status.pid() {
                Some(pid) => {
                    tracing::debug!(pid = %pid, status = ?status, "Reaped child");
                    reaped.push((pid, status));
                }
                None => break,
            },
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                tracing::warn!(error = %e, "waitpid failed");
                break;
            }
        }
    }

    reaped
}

/// Background task collecting exit statuses of terminated descendants.
pub struct Reaper {
    sigchld: Signal,
}

impl Reaper {
    /// Register for SIGCHLD. Must run inside a Tokio runtime.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigchld: signal(SignalKind::child())?,
        })
    }

    /// Reap until shutdown is broadcast.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Reaper started");

        // Children may have exited before we subscribed.
        reap_pending();

        loop {
            tokio::select! {
                received = self.sigchld.recv() => {
                    if received.is_none() {
                        tracing::warn!("SIGCHLD stream closed, reaper exiting");
                        break;
                    }
                    let reaped = reap_pending();
                    if !reaped.is_empty() {
                        tracing::debug!(count = reaped.len(), "Collected terminated descendants");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
