//! Child proxy process supervisor.

use std::io;
use std::process::{Command, Stdio};
use std::str::FromStr;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::config::ProxyProcessConfig;
use crate::process::{PidFile, ProcessState, ProxyProcess, ReloadOutcome, SupervisorError};

/// Owns the proxy process: launch, reload signalling and shutdown.
#[derive(Debug)]
pub struct ProcessSupervisor {
    binary: String,
    args: Vec<String>,
    pid_file: PidFile,
    reload_signal: Signal,
    shutdown_signal: Signal,
    state: ProcessState,
    /// Pid of the process we spawned ourselves, if any.
    child: Option<Pid>,
}

impl ProcessSupervisor {
    /// Create a supervisor, adopting a live proxy named by the pid file.
    pub fn new(config: &ProxyProcessConfig) -> Result<Self, SupervisorError> {
        let config_path = config.config_path.to_string_lossy();
        let pid_path = config.pid_file.to_string_lossy();
        let args = config
            .args
            .iter()
            .map(|arg| arg.replace("${config}", &config_path).replace("${pidfile}", &pid_path))
            .collect();

        let mut supervisor = Self {
            binary: config.binary.clone(),
            args,
            pid_file: PidFile::new(&config.pid_file),
            reload_signal: parse_signal(&config.reload_signal)?,
            shutdown_signal: parse_signal(&config.shutdown_signal)?,
            state: ProcessState::NotStarted,
            child: None,
        };
        supervisor.recover();
        Ok(supervisor)
    }

    /// Arguments passed to the proxy binary.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn recover(&mut self) {
        match self.current_pid() {
            Some(pid) => {
                tracing::info!(pid = %pid, pid_file = ?self.pid_file.path(), "Adopting running proxy");
                self.state = ProcessState::Running { pid };
            }
            None => {
                if let Err(e) = self.pid_file.remove() {
                    tracing::warn!(error = %e, pid_file = ?self.pid_file.path(), "Failed to remove stale pid file");
                }
                self.state = ProcessState::NotStarted;
            }
        }
    }

    /// Resolve the pid of a live proxy, if there is one.
    fn current_pid(&mut self) -> Option<Pid> {
        let pid = match self.state {
            ProcessState::Running { pid } | ProcessState::Reloading { pid } => pid,
            ProcessState::NotStarted => match self.pid_file.read() {
                Ok(pid) => pid,
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(error = %e, "Unusable pid file, treating proxy as not started");
                    }
                    return None;
                }
            },
            ProcessState::Terminated => return None,
        };

        if self.is_alive(pid) {
            Some(pid)
        } else {
            tracing::info!(pid = %pid, "Proxy is no longer running");
            self.state = ProcessState::Terminated;
            None
        }
    }

    fn is_alive(&self, pid: Pid) -> bool {
        if self.child == Some(pid) {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return true,
                Ok(status) => {
                    tracing::warn!(pid = %pid, status = ?status, "Proxy exited");
                    return false;
                }
                // Already collected by the reaper.
                Err(Errno::ECHILD) => return false,
                Err(e) => tracing::debug!(pid = %pid, error = %e, "waitpid failed, probing with kill"),
            }
        }

        match kill(pid, None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn send(&self, pid: Pid, signal: Signal) -> Result<(), SupervisorError> {
        kill(pid, signal).map_err(|source| SupervisorError::Signal {
            pid,
            signal,
            source,
        })
    }

    fn spawn(&mut self) -> Result<Pid, SupervisorError> {
        let child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        // The handle is dropped on purpose: exit statuses go through waitpid.
        let pid = Pid::from_raw(child.id() as i32);
        drop(child);

        self.child = Some(pid);
        self.state = ProcessState::Running { pid };

        if let Err(e) = self.pid_file.write(pid) {
            tracing::warn!(error = %e, pid_file = ?self.pid_file.path(), "Failed to record proxy pid");
        }

        tracing::info!(pid = %pid, binary = %self.binary, args = ?self.args, "Proxy launched");
        Ok(pid)
    }
}

impl ProxyProcess for ProcessSupervisor {
    fn launch(&mut self) -> Result<Pid, SupervisorError> {
        if let Some(pid) = self.current_pid() {
            match self.send(pid, self.reload_signal) {
                Ok(()) => {
                    tracing::info!(pid = %pid, "Proxy already running, reloaded instead of launching");
                    self.state = ProcessState::Running { pid };
                    return Ok(pid);
                }
                Err(e) if vanished(&e) => {
                    tracing::warn!(pid = %pid, "Proxy vanished before it could be reused, launching");
                }
                // Alive but not signalable: never start a second proxy beside it.
                Err(e) => return Err(e),
            }
        }
        self.spawn()
    }

    fn reload(&mut self) -> Result<ReloadOutcome, SupervisorError> {
        let Some(pid) = self.current_pid() else {
            tracing::info!("No running proxy to reload, launching");
            return self.spawn().map(ReloadOutcome::Relaunched);
        };

        self.state = ProcessState::Reloading { pid };
        match self.send(pid, self.reload_signal) {
            Ok(()) => {
                tracing::debug!(pid = %pid, signal = %self.reload_signal, "Reload signal sent");
                self.state = ProcessState::Running { pid };
                Ok(ReloadOutcome::Signalled(pid))
            }
            Err(e) if vanished(&e) => {
                tracing::warn!(pid = %pid, "Proxy vanished before reload, launching");
                self.state = ProcessState::Terminated;
                self.spawn().map(ReloadOutcome::Relaunched)
            }
            Err(e) => {
                self.state = ProcessState::Running { pid };
                Err(e)
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(pid) = self.current_pid() {
            match self.send(pid, self.shutdown_signal) {
                Ok(()) => tracing::info!(pid = %pid, signal = %self.shutdown_signal, "Proxy stopping"),
                Err(e) => tracing::warn!(error = %e, "Failed to stop proxy"),
            }
        }
        self.state = ProcessState::Terminated;
    }

    fn state(&self) -> ProcessState {
        self.state
    }
}

/// The signalled process no longer exists.
fn vanished(error: &SupervisorError) -> bool {
    matches!(error, SupervisorError::Signal { source: Errno::ESRCH, .. })
}

fn parse_signal(name: &str) -> Result<Signal, SupervisorError> {
    Signal::from_str(name).map_err(|_| SupervisorError::InvalidSignal(name.to_string()))
}
