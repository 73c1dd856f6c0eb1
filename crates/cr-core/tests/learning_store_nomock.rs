//! Learning store tests against the real filesystem.

use std::sync::Arc;
use std::thread;

use cr_common::Error;
use cr_config::ModelConfig;
use cr_core::evidence::Evidence;
use cr_core::inference::infer;
use cr_core::learning::LearningStore;
use cr_core::snapshot::NetworkCache;
use cr_math::BetaParams;
use tempfile::tempdir;

fn prior() -> BetaParams {
    BetaParams::new(10.0, 10.0).unwrap()
}

fn read_record(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn two_correct_updates_then_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("learning_data.json");

    let store = LearningStore::open(&path, prior()).unwrap();
    store.update(true).unwrap();
    let params = store.update(true).unwrap();
    assert_eq!((params.alpha, params.beta), (12.0, 10.0));
    drop(store);

    let reopened = LearningStore::open(&path, prior()).unwrap();
    let params = reopened.params().unwrap();
    assert_eq!((params.alpha, params.beta), (12.0, 10.0));
    assert_eq!(read_record(&path), serde_json::json!({"alpha": 12.0, "beta": 10.0}));
}

#[test]
fn record_from_older_installs_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("learning_data.json");
    std::fs::write(&path, r#"{"alpha": 15.0, "beta": 12.0}"#).unwrap();

    let store = LearningStore::open(&path, prior()).unwrap();
    let params = store.update(false).unwrap();
    assert_eq!((params.alpha, params.beta), (15.0, 13.0));
}

#[test]
fn concurrent_updates_are_not_lost() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = Arc::new(LearningStore::open(&path, prior()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..5 {
                    store.update(i % 2 == 0).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let params = store.params().unwrap();
    assert_eq!(params.alpha, 30.0);
    assert_eq!(params.beta, 30.0);
    assert_eq!(store.snapshot().unwrap().version, 40);
    assert_eq!(read_record(&path), serde_json::json!({"alpha": 30.0, "beta": 30.0}));
    assert!(!dir.path().join("state.json.tmp").exists());
}

#[test]
fn independent_handles_do_not_lose_updates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("learning_data.json");

    // Two handles opened before either writes, as two `crisk feedback`
    // processes would be.
    let a = LearningStore::open(&path, prior()).unwrap();
    let b = LearningStore::open(&path, prior()).unwrap();
    a.update(true).unwrap();
    let params = b.update(true).unwrap();

    assert_eq!((params.alpha, params.beta), (12.0, 10.0));
    assert_eq!(read_record(&path), serde_json::json!({"alpha": 12.0, "beta": 10.0}));
}

#[test]
fn independent_handles_on_threads_do_not_lose_updates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("learning_data.json");

    let handles: Vec<_> = [true, false]
        .into_iter()
        .map(|correct| {
            let path = path.clone();
            thread::spawn(move || {
                let store = LearningStore::open(&path, prior()).unwrap();
                for _ in 0..5 {
                    store.update(correct).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(read_record(&path), serde_json::json!({"alpha": 15.0, "beta": 15.0}));
}

#[test]
fn readers_never_see_torn_parameters() {
    let dir = tempdir().unwrap();
    let store = Arc::new(LearningStore::open(dir.path().join("s.json"), prior()).unwrap());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..20 {
                store.update(true).unwrap();
            }
        })
    };

    // alpha - version stays 10 in every consistent reading.
    for _ in 0..200 {
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.alpha - snap.version as f64, 10.0);
        assert_eq!(snap.beta, 10.0);
    }
    writer.join().unwrap();
}

#[test]
fn corrupt_record_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{\"alpha\": -1.0, \"beta\": 2.0}").unwrap();
    assert!(matches!(
        LearningStore::open(&path, prior()),
        Err(Error::StateCorrupted(_))
    ));
}

#[test]
fn feedback_changes_the_learned_network() {
    let dir = tempdir().unwrap();
    let store = LearningStore::open(dir.path().join("state.json"), prior()).unwrap();
    let cache = NetworkCache::new(ModelConfig::default());

    let before = cache.snapshot(&store).unwrap();
    let p_before = infer(&before.network, &Evidence::new(), "ConcentrationDrop")
        .unwrap()
        .p_yes();

    for _ in 0..10 {
        store.update(true).unwrap();
    }
    let after = cache.snapshot(&store).unwrap();
    let p_after = infer(&after.network, &Evidence::new(), "ConcentrationDrop")
        .unwrap()
        .p_yes();

    assert_eq!(after.params.version, 10);
    assert!(p_after > p_before, "{p_after} <= {p_before}");
    // The old snapshot is untouched.
    let p_old = infer(&before.network, &Evidence::new(), "ConcentrationDrop")
        .unwrap()
        .p_yes();
    assert_eq!(p_old, p_before);
}
