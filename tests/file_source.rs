//! Manifest file source: watching and end-to-end reconciliation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use ingress_controller::config::{RenderConfig, Resolution};
use ingress_controller::lifecycle::Shutdown;
use ingress_controller::reconcile::ReconcileLoop;
use ingress_controller::render::CaddyfileRenderer;
use ingress_controller::routing::RouteTableBuilder;
use ingress_controller::source::{EventKind, FileSource, RouteSource};

mod common;
use common::{Call, RecordingProxy};

const ONE_INGRESS: &str = r#"
[[ingress]]
namespace = "ns1"
name = "web"

[[ingress.rules]]
host = "a.example.com"

[[ingress.rules.paths]]
path = "/api"
backend = { service = "svc1", port = 8080, endpoints = ["10.0.0.7"] }
"#;

const TWO_INGRESSES: &str = r#"
[[ingress]]
namespace = "ns1"
name = "web"

[[ingress.rules]]
host = "a.example.com"

[[ingress.rules.paths]]
path = "/api"
backend = { service = "svc1", port = 8080, endpoints = ["10.0.0.7"] }

[[ingress]]
namespace = "ns1"
name = "blog"

[[ingress.rules]]
host = "b.example.com"

[[ingress.rules.paths]]
path = "/"
backend = { service = "blog", port = 80 }
"#;

/// Replace the manifest the way an editor or config-map sync would.
fn replace(path: &Path, content: &str) {
    let staging = path.with_extension("tmp");
    fs::write(&staging, content).unwrap();
    fs::rename(&staging, path).unwrap();
}

#[tokio::test]
async fn test_watch_reports_added_object() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("ingresses.toml");
    fs::write(&manifest, ONE_INGRESS).unwrap();

    let source = FileSource::new(&manifest);
    let mut stream = source.watch().await.unwrap();

    replace(&manifest, TWO_INGRESSES);

    let event = common::within(Duration::from_secs(10), stream.next())
        .await
        .expect("stream ended")
        .expect("watch error");
    assert_eq!(event.kind, EventKind::Added);
    assert_eq!(event.object.key(), "ns1/blog");
}

#[tokio::test]
async fn test_broken_manifest_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("ingresses.toml");
    fs::write(&manifest, ONE_INGRESS).unwrap();

    let mut stream = FileSource::new(&manifest).watch().await.unwrap();
    replace(&manifest, "[[ingress]]\nname = ");
    // Long enough for the watcher to settle on the broken file.
    tokio::time::sleep(Duration::from_millis(800)).await;
    replace(&manifest, TWO_INGRESSES);

    let event = common::within(Duration::from_secs(10), stream.next())
        .await
        .expect("stream ended")
        .expect("broken manifest surfaced as a watch error");
    assert_eq!(event.kind, EventKind::Added);
    assert_eq!(event.object.key(), "ns1/blog");
}

/// Rewrite the manifest in place: truncate, write a prefix, pause, finish.
fn write_in_place(path: &Path, content: &str, split: usize, pause: Duration) {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path).unwrap();
    file.write_all(content[..split].as_bytes()).unwrap();
    file.flush().unwrap();
    std::thread::sleep(pause);
    file.write_all(content[split..].as_bytes()).unwrap();
    file.flush().unwrap();
}

#[tokio::test]
async fn test_in_place_rewrite_with_partial_content() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("ingresses.toml");
    fs::write(&manifest, ONE_INGRESS).unwrap();

    let mut stream = FileSource::new(&manifest).watch().await.unwrap();

    // The prefix ends inside a table header and does not parse.
    let split = TWO_INGRESSES.rfind("[[ingress.rules.paths]]").unwrap() + 5;
    let path = manifest.clone();
    tokio::task::spawn_blocking(move || write_in_place(&path, TWO_INGRESSES, split, Duration::from_millis(600)))
        .await
        .unwrap();

    let event = common::within(Duration::from_secs(10), stream.next())
        .await
        .expect("stream ended")
        .expect("partial write surfaced as a watch error");
    assert_eq!(event.kind, EventKind::Added);
    assert_eq!(event.object.key(), "ns1/blog");
}

#[tokio::test]
async fn test_truncate_then_write_is_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("ingresses.toml");
    fs::write(&manifest, ONE_INGRESS).unwrap();

    let mut stream = FileSource::new(&manifest)
        .with_debounce(Duration::from_millis(400))
        .watch()
        .await
        .unwrap();

    // An empty file is a valid manifest; within the quiet period it must not
    // be mistaken for every object being deleted.
    let path = manifest.clone();
    tokio::task::spawn_blocking(move || write_in_place(&path, TWO_INGRESSES, 0, Duration::from_millis(50)))
        .await
        .unwrap();

    let event = common::within(Duration::from_secs(10), stream.next())
        .await
        .expect("stream ended")
        .expect("watch error");
    assert_eq!(event.kind, EventKind::Added);
    assert_eq!(event.object.key(), "ns1/blog");
}

#[tokio::test]
async fn test_manifest_edit_reloads_proxy() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("ingresses.toml");
    let config_path = dir.path().join("Caddyfile");
    fs::write(&manifest, ONE_INGRESS).unwrap();

    let proxy = RecordingProxy::default();
    let shutdown = Shutdown::new();
    let controller = ReconcileLoop::new(
        FileSource::new(&manifest),
        RouteTableBuilder::new(Resolution::Endpoints),
        CaddyfileRenderer::new(&RenderConfig::default()).unwrap(),
        proxy.clone(),
        &config_path,
    );
    let handle = tokio::spawn(controller.run(shutdown.subscribe()));

    assert!(common::wait_for(Duration::from_secs(5), || proxy.count(Call::Launch) == 1).await);
    let first = fs::read_to_string(&config_path).unwrap();
    assert!(first.contains("proxy /api 10.0.0.7:8080 {"));

    replace(&manifest, TWO_INGRESSES);
    assert!(common::wait_for(Duration::from_secs(10), || proxy.count(Call::Reload) == 1).await);

    let second = fs::read_to_string(&config_path).unwrap();
    assert!(second.contains("http://b.example.com {"));
    // Endpoint resolution with no endpoints leaves the path unrouted.
    assert!(second.contains("# /: no ready endpoints"));

    shutdown.trigger();
    let result = common::within(Duration::from_secs(2), handle).await.unwrap();
    assert!(result.is_ok());
}
