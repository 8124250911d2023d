//! Manifest-file route source.
//!
//! Routing objects are declared as `[[ingress]]` tables in one TOML file.
//! A `notify` watcher re-reads the file once writes have settled and emits
//! one notification per object that appeared, changed or disappeared.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::routing::RoutingObject;
use crate::source::{EventKind, RouteSource, SourceError, WatchEvent, WatchSender, WatchStream};

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default, rename = "ingress")]
    ingresses: Vec<RoutingObject>,
}

/// Parse manifest text into routing objects, in declaration order.
pub fn parse_manifest(path: &Path, content: &str) -> Result<Vec<RoutingObject>, SourceError> {
    toml::from_str::<Manifest>(content)
        .map(|manifest| manifest.ingresses)
        .map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Read and parse a manifest file.
pub fn read_manifest(path: &Path) -> Result<Vec<RoutingObject>, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(path, &content)
}

/// Objects keyed by `namespace/name`.
pub type Snapshot = BTreeMap<String, RoutingObject>;

pub fn snapshot(objects: Vec<RoutingObject>) -> Snapshot {
    objects.into_iter().map(|o| (o.key(), o)).collect()
}

/// Notifications turning `previous` into `current`.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<WatchEvent> {
    let mut events = Vec::new();

    for (key, object) in current {
        match previous.get(key) {
            None => events.push(WatchEvent {
                kind: EventKind::Added,
                object: object.clone(),
            }),
            Some(old) if old != object => events.push(WatchEvent {
                kind: EventKind::Modified,
                object: object.clone(),
            }),
            Some(_) => {}
        }
    }

    for (key, object) in previous {
        if !current.contains_key(key) {
            events.push(WatchEvent {
                kind: EventKind::Deleted,
                object: object.clone(),
            });
        }
    }

    events
}

/// Quiet period after the last file event before the manifest is re-read.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Route source backed by a TOML manifest on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    poll_interval: Duration,
    debounce: Duration,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: Duration::from_secs(2),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the quiet period the watcher waits for before re-reading.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RouteSource for FileSource {
    async fn list(&self) -> Result<Vec<RoutingObject>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_manifest(&self.path, &content)
    }

    async fn watch(&self) -> Result<WatchStream, SourceError> {
        let (tx, stream) = WatchStream::channel();

        // Watch the directory: editors replace files rather than write in place.
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = dir.canonicalize().map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;
        let file_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        let target = dir.join(&file_name);

        let previous = snapshot(read_manifest(&target)?);

        let (touched_tx, touched_rx) = mpsc::unbounded_channel::<()>();
        let error_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        let _ = touched_tx.send(());
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Watch error");
                    let _ = error_tx.send(Err(SourceError::Watch(e)));
                }
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(forward_changes(target, previous, touched_rx, tx, self.debounce));

        tracing::info!(path = ?self.path, debounce = ?self.debounce, "Manifest watcher started");
        Ok(stream.with_guard(watcher))
    }
}

/// Turn raw file events into object notifications.
///
/// Bursts of events are coalesced until the file has been quiet for
/// `debounce`. A manifest that cannot be read or parsed at that point is
/// assumed to be mid-write: the previous snapshot is kept and the next event
/// tries again. Ends when the watcher is dropped or the stream goes away.
async fn forward_changes(
    target: PathBuf,
    mut previous: Snapshot,
    mut touched: mpsc::UnboundedReceiver<()>,
    tx: WatchSender,
    debounce: Duration,
) {
    while touched.recv().await.is_some() {
        loop {
            match tokio::time::timeout(debounce, touched.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let objects = match tokio::fs::read_to_string(&target).await {
            Ok(content) => parse_manifest(&target, &content),
            Err(source) => Err(SourceError::Io {
                path: target.clone(),
                source,
            }),
        };
        let current = match objects {
            Ok(objects) => snapshot(objects),
            Err(e) => {
                tracing::warn!(error = %e, "Manifest not readable yet, keeping previous snapshot");
                continue;
            }
        };

        let events = diff(&previous, &current);
        if !events.is_empty() {
            tracing::debug!(changes = events.len(), "Manifest change detected");
        }
        for event in events {
            if tx.send(Ok(event)).is_err() {
                return;
            }
        }
        previous = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{BackendTarget, HttpPath, IngressRule};

    const MANIFEST: &str = r#"
        [[ingress]]
        namespace = "ns1"
        name = "web"

        [[ingress.rules]]
        host = "a.example.com"

        [[ingress.rules.paths]]
        path = "/api"
        backend = { service = "svc1", port = 8080 }

        [[ingress]]
        namespace = "ns2"
        name = "blog"

        [[ingress.rules]]
        host = "b.example.com"

        [[ingress.rules.paths]]
        path = "/"
        backend = { service = "blog", port = 80, endpoints = ["10.1.0.4"] }
    "#;

    fn object(name: &str, port: u16) -> RoutingObject {
        RoutingObject {
            namespace: "ns".into(),
            name: name.into(),
            rules: vec![IngressRule {
                host: "a.example.com".into(),
                paths: vec![HttpPath {
                    path: "/".into(),
                    backend: BackendTarget {
                        service: name.into(),
                        port,
                        endpoints: vec![],
                    },
                }],
            }],
        }
    }

    #[test]
    fn test_parse_manifest() {
        let objects = parse_manifest(Path::new("ingresses.toml"), MANIFEST).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key(), "ns1/web");
        assert_eq!(objects[0].rules[0].paths[0].backend.port, 8080);
        assert_eq!(objects[1].rules[0].paths[0].backend.endpoints, vec!["10.1.0.4"]);
    }

    #[test]
    fn test_empty_manifest_has_no_objects() {
        assert!(parse_manifest(Path::new("x.toml"), "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = parse_manifest(Path::new("broken.toml"), "[[ingress]]\nname = 3").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_diff_reports_each_kind() {
        let previous = snapshot(vec![object("keep", 80), object("change", 80), object("drop", 80)]);
        let current = snapshot(vec![object("keep", 80), object("change", 81), object("new", 80)]);

        let mut changes: Vec<_> = diff(&previous, &current)
            .into_iter()
            .map(|e| (e.kind, e.object.name))
            .collect();
        changes.sort_by(|a, b| a.1.cmp(&b.1));

        assert_eq!(
            changes,
            vec![
                (EventKind::Modified, "change".to_string()),
                (EventKind::Deleted, "drop".to_string()),
                (EventKind::Added, "new".to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_of_identical_snapshots_is_empty() {
        let previous = snapshot(vec![object("keep", 80)]);
        assert!(diff(&previous, &previous.clone()).is_empty());
    }

    #[tokio::test]
    async fn test_list_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingresses.toml");
        fs::write(&path, MANIFEST).unwrap();

        let objects = FileSource::new(&path).list().await.unwrap();
        assert_eq!(objects.len(), 2);
    }

    #[tokio::test]
    async fn test_list_missing_file_is_io_error() {
        let err = FileSource::new("/nonexistent/ingresses.toml").list().await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
