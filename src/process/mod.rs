//! Proxy process supervision.
//!
//! # Data Flow
//! ```text
//! launch():  spawn binary with expanded args → record pid → pid file
//! reload():  resolve pid (cache, then pid file)
//!              ├─ alive → send reload signal
//!              └─ gone  → launch()
//! Reaper:    SIGCHLD → waitpid(-1, WNOHANG) until nothing is left
//! ```
//!
//! # State Machine
//! ```text
//! NotStarted → Running → Reloading → Running → ... → Terminated
//! ```
//!
//! # Design Decisions
//! - The supervisor is the only component that signals or starts the proxy
//! - A missing, unreadable or stale pid file means "never started"
//! - Exit statuses are collected with `waitpid`, never through a `Child` handle,
//!   so the reaper and the supervisor cannot disagree about ownership
//! - The reaper shares nothing with the reconcile loop but the process table

pub mod pidfile;
pub mod reaper;
pub mod supervisor;

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use thiserror::Error;

pub use pidfile::PidFile;
pub use reaper::Reaper;
pub use supervisor::ProcessSupervisor;

/// Control surface over the proxy process.
pub trait ProxyProcess: Send {
    /// Start the proxy. Fails only when no proxy could be started.
    fn launch(&mut self) -> Result<Pid, SupervisorError>;

    /// Ask the running proxy to re-read its configuration, or launch it
    /// when nothing is running.
    fn reload(&mut self) -> Result<ReloadOutcome, SupervisorError>;

    /// Stop the proxy. Best effort.
    fn shutdown(&mut self);

    fn state(&self) -> ProcessState;
}

/// Lifecycle state of the supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running { pid: Pid },
    Reloading { pid: Pid },
    Terminated,
}

impl ProcessState {
    pub fn pid(&self) -> Option<Pid> {
        match self {
            ProcessState::Running { pid } | ProcessState::Reloading { pid } => Some(*pid),
            ProcessState::NotStarted | ProcessState::Terminated => None,
        }
    }
}

/// What a reload actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The running process was signalled.
    Signalled(Pid),
    /// Nothing was running, so a new process was launched.
    Relaunched(Pid),
}

impl ReloadOutcome {
    pub fn pid(&self) -> Pid {
        match self {
            ReloadOutcome::Signalled(pid) | ReloadOutcome::Relaunched(pid) => *pid,
        }
    }
}

impl fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadOutcome::Signalled(pid) => write!(f, "signalled pid {}", pid),
            ReloadOutcome::Relaunched(pid) => write!(f, "relaunched as pid {}", pid),
        }
    }
}

/// Errors raised while controlling the proxy process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        pid: Pid,
        signal: Signal,
        #[source]
        source: Errno,
    },

    #[error("unknown signal {0:?}")]
    InvalidSignal(String),
}
