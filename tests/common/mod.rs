//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use ingress_controller::process::{ProcessState, ProxyProcess, ReloadOutcome, SupervisorError};
use ingress_controller::routing::{BackendTarget, HttpPath, IngressRule, RoutingObject};
use ingress_controller::source::{EventKind, RouteSource, SourceError, WatchEvent, WatchSender, WatchStream};

/// Build a routing object with one host and the given `(path, service, port)` rules.
pub fn ingress(namespace: &str, name: &str, host: &str, paths: &[(&str, &str, u16)]) -> RoutingObject {
    RoutingObject {
        namespace: namespace.into(),
        name: name.into(),
        rules: vec![IngressRule {
            host: host.into(),
            paths: paths
                .iter()
                .map(|(path, service, port)| HttpPath {
                    path: path.to_string(),
                    backend: BackendTarget {
                        service: service.to_string(),
                        port: *port,
                        endpoints: vec![],
                    },
                })
                .collect(),
        }],
    }
}

/// In-memory route source driven by the test.
#[derive(Clone, Default)]
pub struct MemorySource {
    objects: Arc<Mutex<Vec<RoutingObject>>>,
    watchers: Arc<Mutex<Vec<WatchSender>>>,
    fail_list: Arc<AtomicBool>,
}

impl MemorySource {
    pub fn new(objects: Vec<RoutingObject>) -> Self {
        let source = Self::default();
        source.set(objects);
        source
    }

    pub fn set(&self, objects: Vec<RoutingObject>) {
        *self.objects.lock().unwrap() = objects;
    }

    /// Deliver a notification to every open stream.
    pub fn notify(&self, kind: EventKind, object: RoutingObject) {
        for tx in self.watchers.lock().unwrap().iter() {
            let _ = tx.send(Ok(WatchEvent {
                kind,
                object: object.clone(),
            }));
        }
    }

    pub fn fail_watch(&self, message: &str) {
        for tx in self.watchers.lock().unwrap().iter() {
            let _ = tx.send(Err(SourceError::Upstream(message.to_string())));
        }
    }

    /// End every open stream.
    pub fn close(&self) {
        self.watchers.lock().unwrap().clear();
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RouteSource for MemorySource {
    async fn list(&self) -> Result<Vec<RoutingObject>, SourceError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SourceError::Upstream("list refused".into()));
        }
        Ok(self.objects.lock().unwrap().clone())
    }

    async fn watch(&self) -> Result<WatchStream, SourceError> {
        let (tx, stream) = WatchStream::channel();
        self.watchers.lock().unwrap().push(tx);
        Ok(stream)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Launch,
    Reload,
    Shutdown,
}

/// Proxy stand-in that records every call.
#[derive(Clone, Default)]
pub struct RecordingProxy {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_launch: Arc<AtomicBool>,
    fail_reload: Arc<AtomicBool>,
    state: Arc<Mutex<Option<ProcessState>>>,
}

pub const FAKE_PID: i32 = 4242;

impl RecordingProxy {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    pub fn set_fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reload(&self, fail: bool) {
        self.fail_reload.store(fail, Ordering::SeqCst);
    }
}

impl ProxyProcess for RecordingProxy {
    fn launch(&mut self) -> Result<Pid, SupervisorError> {
        self.calls.lock().unwrap().push(Call::Launch);
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(SupervisorError::Spawn {
                binary: "fake-proxy".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let pid = Pid::from_raw(FAKE_PID);
        *self.state.lock().unwrap() = Some(ProcessState::Running { pid });
        Ok(pid)
    }

    fn reload(&mut self) -> Result<ReloadOutcome, SupervisorError> {
        self.calls.lock().unwrap().push(Call::Reload);
        let pid = Pid::from_raw(FAKE_PID);
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(SupervisorError::Signal {
                pid,
                signal: Signal::SIGUSR1,
                source: Errno::EPERM,
            });
        }
        Ok(ReloadOutcome::Signalled(pid))
    }

    fn shutdown(&mut self) {
        self.calls.lock().unwrap().push(Call::Shutdown);
        *self.state.lock().unwrap() = Some(ProcessState::Terminated);
    }

    fn state(&self) -> ProcessState {
        self.state.lock().unwrap().unwrap_or(ProcessState::NotStarted)
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_for<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Run `f` with a deadline, panicking if it does not finish.
pub async fn within<T>(timeout: Duration, f: impl Future<Output = T>) -> T {
    tokio::time::timeout(timeout, f).await.expect("timed out")
}
