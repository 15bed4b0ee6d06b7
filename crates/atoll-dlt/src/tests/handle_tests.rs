//! Tests for the active-table handle and version gating.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::{node, striped_table};
use crate::dlt::DltBuilder;
use crate::error::DltError;
use crate::handle::{ActiveDlt, InstallOutcome};
use crate::hasher::Blake3TokenHasher;

#[test]
fn test_empty_handle() {
    let active = ActiveDlt::new();
    assert!(active.current().is_none());
    assert_eq!(active.version(), None);
    assert!(active.supersedes(0));
    assert!(matches!(
        active.resolve(&Blake3TokenHasher, b"key"),
        Err(DltError::NoActiveTable)
    ));
}

#[test]
fn test_first_install() {
    let active = ActiveDlt::new();
    let outcome = active.install(striped_table(1, 4, 2, 3)).unwrap();
    assert!(matches!(outcome, InstallOutcome::Installed { previous: None }));
    assert_eq!(active.version(), Some(1));
    assert!(active.resolve(&Blake3TokenHasher, b"key").unwrap().len() == 2);
}

#[test]
fn test_newer_version_replaces() {
    let active = ActiveDlt::with_table(striped_table(1, 4, 2, 3));
    let outcome = active.install(striped_table(2, 4, 2, 4)).unwrap();
    assert!(matches!(outcome, InstallOutcome::Installed { previous: Some(1) }));
    assert_eq!(active.version(), Some(2));
    assert_eq!(active.current().unwrap().node_count(), 4);
}

#[test]
fn test_older_version_ignored() {
    let active = ActiveDlt::with_table(striped_table(5, 4, 2, 3));
    let outcome = active.install(striped_table(4, 4, 2, 4)).unwrap();
    assert!(matches!(outcome, InstallOutcome::Stale { active: 5 }));
    assert!(!outcome.is_installed());
    assert_eq!(active.current().unwrap().node_count(), 3);
    assert!(!active.supersedes(5));
    assert!(active.supersedes(6));
}

#[test]
fn test_identical_reinstall_is_stale() {
    let active = ActiveDlt::with_table(striped_table(3, 4, 2, 3));
    let outcome = active.install(striped_table(3, 4, 2, 3)).unwrap();
    assert!(matches!(outcome, InstallOutcome::Stale { active: 3 }));
}

#[test]
fn test_same_version_different_content_conflicts() {
    let active = ActiveDlt::with_table(striped_table(3, 4, 2, 3));
    let err = active.install(striped_table(3, 4, 2, 4)).unwrap_err();
    assert!(matches!(err, DltError::VersionConflict { version: 3 }), "got {err}");
    assert_eq!(active.current().unwrap().node_count(), 3);
}

#[test]
fn test_reader_keeps_its_generation() {
    let active = ActiveDlt::new();
    let nodes = vec![node(1)];
    active
        .install(DltBuilder::create(1, 2, 1, 4, nodes).unwrap().build())
        .unwrap();

    let held = active.current().unwrap();
    active
        .install(DltBuilder::create(2, 2, 1, 4, vec![node(2)]).unwrap().build())
        .unwrap();

    // The in-flight reader still sees version 1; new readers see version 2.
    assert_eq!(held.version(), 1);
    assert_eq!(held.primary(0).unwrap(), node(1));
    assert_eq!(active.current().unwrap().primary(0).unwrap(), node(2));

    // The retired generation is only kept alive by the held reference.
    assert_eq!(Arc::strong_count(&held), 1);
}

#[test]
fn test_subscriber_notified_on_install() {
    let active = ActiveDlt::new();
    let mut rx = active.subscribe();
    assert!(!rx.has_changed().unwrap());

    active.install(striped_table(1, 2, 1, 2)).unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().version(), 1);

    // A stale offer does not wake subscribers.
    active.install(striped_table(1, 2, 1, 2)).unwrap();
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn test_concurrent_readers_never_see_torn_table() {
    // Every generation v places node v in every slot of every token.
    fn generation(v: u64) -> crate::dlt::Dlt {
        DltBuilder::create(v, 6, 3, 64, vec![node(v)]).unwrap().build()
    }

    let active = Arc::new(ActiveDlt::with_table(generation(1)));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let active = Arc::clone(&active);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut last_seen = 0;
                while !stop.load(Ordering::Relaxed) {
                    let dlt = active.current().unwrap();
                    let v = dlt.version();
                    assert!(v >= last_seen, "version went backwards: {v} < {last_seen}");
                    last_seen = v;
                    for token in 0..64 {
                        assert_eq!(dlt.get_token_placement(token).unwrap(), vec![node(v); 3]);
                    }
                }
            })
        })
        .collect();

    for v in 2..=200 {
        assert!(active.install(generation(v)).unwrap().is_installed());
    }
    stop.store(true, Ordering::Relaxed);

    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(active.version(), Some(200));
}
