use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use assetpipe::fs::mock::MockFileSystem;
use assetpipe::types::WatchEvent;
use assetpipe::watch::poll::snapshot;
use assetpipe::watch::{EventSource, EventSourceOptions, PollEventSource, PollSnapshot, diff_snapshots};
use assetpipe_test_utils::{init_tracing, with_timeout};
use futures::StreamExt;
use futures::stream::BoxStream;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

type Events = BoxStream<'static, assetpipe::errors::Result<WatchEvent>>;

fn at(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

fn snap(entries: &[(&str, u64)]) -> PollSnapshot {
    entries.iter().map(|(p, t)| (p.to_string(), at(*t))).collect()
}

fn poll_events(fs: &MockFileSystem, root: &str, recursive: bool, cancel: CancellationToken) -> Events {
    PollEventSource::new(Arc::new(fs.clone()), Duration::from_millis(5))
        .events(Path::new(root), EventSourceOptions { recursive, cancel })
}

/// Let the source take its first snapshot; nothing has changed yet.
async fn settle(events: &mut Events) {
    let first = tokio::time::timeout(Duration::from_millis(30), events.next()).await;
    assert!(first.is_err(), "no event expected before any change");
}

async fn next_event(events: &mut Events) -> WatchEvent {
    with_timeout(events.next())
        .await
        .expect("event stream ended")
        .expect("poll error")
}

#[test]
fn one_changed_timestamp_is_one_changed_event() {
    let prev = snap(&[("a.json", 1), ("b.json", 2)]);
    let next = snap(&[("a.json", 1), ("b.json", 3)]);

    assert_eq!(diff_snapshots(&prev, &next), vec![WatchEvent::changed("b.json")]);
}

#[test]
fn one_missing_path_is_one_renamed_event() {
    let prev = snap(&[("a.json", 1), ("b.json", 2)]);
    let next = snap(&[("b.json", 2)]);

    assert_eq!(diff_snapshots(&prev, &next), vec![WatchEvent::renamed("a.json")]);
}

#[test]
fn additions_follow_old_paths() {
    let prev = snap(&[("b.json", 1), ("c.json", 1)]);
    let next = snap(&[("a.json", 5), ("c.json", 2), ("d.json", 5)]);

    assert_eq!(
        diff_snapshots(&prev, &next),
        vec![
            WatchEvent::renamed("b.json"),
            WatchEvent::changed("c.json"),
            WatchEvent::renamed("a.json"),
            WatchEvent::renamed("d.json"),
        ]
    );
}

#[test]
fn identical_snapshots_produce_nothing() {
    let prev = snap(&[("a.json", 1), ("sub/b.json", 2)]);
    assert!(diff_snapshots(&prev, &prev.clone()).is_empty());
}

proptest! {
    #[test]
    fn diff_reports_every_difference_exactly_once(
        prev in proptest::collection::btree_map("[a-z]{1,6}", 0u64..4, 0..20),
        edits in proptest::collection::vec(0u8..3, 20),
        added in proptest::collection::btree_set("[A-Z]{1,6}", 0..5),
    ) {
        // 0 = keep, 1 = touch, 2 = remove
        let mut next = BTreeMap::new();
        let mut changed = 0;
        let mut removed = 0;
        for ((path, t), edit) in prev.iter().zip(edits.iter().cycle()) {
            match *edit {
                0 => { next.insert(path.clone(), at(*t)); }
                1 => { next.insert(path.clone(), at(*t + 100)); changed += 1; }
                _ => removed += 1,
            }
        }
        for path in &added {
            next.insert(path.clone(), at(0));
        }
        let prev: PollSnapshot = prev.into_iter().map(|(p, t)| (p, at(t))).collect();

        let events = diff_snapshots(&prev, &next);

        let renamed = events.iter().filter(|e| e.kind == assetpipe::WatchEventKind::Renamed).count();
        let changes = events.len() - renamed;
        prop_assert_eq!(changes, changed);
        prop_assert_eq!(renamed, removed + added.len());
        // Additions come last.
        let tail: Vec<_> = events[events.len() - added.len()..].iter().map(|e| e.path.clone()).collect();
        prop_assert_eq!(tail, added.into_iter().collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn recursive_snapshot_records_nested_files_only() {
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());
    fs.add_file("assets/sub/b.json", b"{}".to_vec());

    let recursive = snapshot(&fs, Path::new("assets"), true).await.unwrap();
    assert_eq!(
        recursive.keys().cloned().collect::<Vec<_>>(),
        vec!["a.json".to_string(), "sub/b.json".to_string()]
    );

    let flat = snapshot(&fs, Path::new("assets"), false).await.unwrap();
    assert_eq!(
        flat.keys().cloned().collect::<Vec<_>>(),
        vec!["a.json".to_string(), "sub".to_string()]
    );
}

#[tokio::test]
async fn file_root_snapshot_is_keyed_by_file_name() {
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());

    let snap = snapshot(&fs, Path::new("assets/a.json"), true).await.unwrap();
    assert_eq!(snap.keys().cloned().collect::<Vec<_>>(), vec!["a.json".to_string()]);
}

#[tokio::test]
async fn poll_source_reports_change_removal_and_addition() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());
    fs.add_file("assets/sub/b.json", b"{}".to_vec());
    let mut events = poll_events(&fs, "assets", true, CancellationToken::new());
    settle(&mut events).await;

    fs.touch("assets/sub/b.json");
    assert_eq!(next_event(&mut events).await, WatchEvent::changed("sub/b.json"));

    fs.remove("assets/a.json");
    assert_eq!(next_event(&mut events).await, WatchEvent::renamed("a.json"));

    fs.add_file("assets/c.json", b"{}".to_vec());
    assert_eq!(next_event(&mut events).await, WatchEvent::renamed("c.json"));
}

#[tokio::test]
async fn poll_source_watching_a_file_reports_its_name() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());
    let mut events = poll_events(&fs, "assets/a.json", false, CancellationToken::new());
    settle(&mut events).await;

    fs.touch("assets/a.json");
    assert_eq!(next_event(&mut events).await, WatchEvent::changed("a.json"));
}

#[tokio::test]
async fn poll_source_ends_on_cancel() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());
    let cancel = CancellationToken::new();
    let mut events = poll_events(&fs, "assets", true, cancel.clone());
    settle(&mut events).await;

    cancel.cancel();
    assert!(with_timeout(events.next()).await.is_none());
}

#[tokio::test]
async fn poll_source_drops_buffered_events_on_cancel() {
    init_tracing();
    let fs = MockFileSystem::new();
    for name in ["a", "b", "c"] {
        fs.add_file(format!("assets/{name}.json"), b"{}".to_vec());
    }
    let cancel = CancellationToken::new();
    let mut events = poll_events(&fs, "assets", true, cancel.clone());
    settle(&mut events).await;

    fs.touch("assets/a.json");
    fs.touch("assets/b.json");
    fs.touch("assets/c.json");
    assert_eq!(next_event(&mut events).await, WatchEvent::changed("a.json"));

    cancel.cancel();
    assert!(with_timeout(events.next()).await.is_none());
}

#[tokio::test]
async fn poll_source_yields_snapshot_errors_and_keeps_going() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("assets/a.json", b"{}".to_vec());
    let mut events = poll_events(&fs, "assets", true, CancellationToken::new());
    settle(&mut events).await;

    fs.fail_next(assetpipe::fs::mock::FsOpKind::ReadDir, "assets", "flaky mount");
    let err = with_timeout(events.next()).await.unwrap();
    assert!(err.is_err());

    fs.touch("assets/a.json");
    assert_eq!(next_event(&mut events).await, WatchEvent::changed("a.json"));
}
