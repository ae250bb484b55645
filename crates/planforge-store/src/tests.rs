//! Tests for model stores.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use planforge_core::PlanForgeError;

use super::*;

fn draft(id: &str) -> ModelMetadata {
    ModelMetadata::draft(id, ModelType::CostForecaster, NormalizationParams::identity(10))
        .with_accuracy(0.9)
        .with_residual_std(12.5)
        .with_sample_count(40)
}

fn exercise_versioning(store: &dyn ModelStore) {
    let v1 = store.save(draft("cost"), b"one").unwrap();
    let v2 = store.save(draft("cost"), b"two").unwrap();
    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(v2.weights_ref.to_string(), "cost@v2");

    let latest = store.load("cost").unwrap();
    assert_eq!(latest.metadata.version, 2);
    assert_eq!(latest.blob, b"two");
    assert_eq!(store.load_version("cost", 1).unwrap().blob, b"one");

    let err = store.load_version("cost", 9).unwrap_err();
    assert!(matches!(
        err,
        PlanForgeError::ModelNotFound {
            version: Some(9),
            ..
        }
    ));

    assert_eq!(store.versions("cost").unwrap().len(), 2);

    store.delete("cost").unwrap();
    assert!(matches!(
        store.load("cost").unwrap_err(),
        PlanForgeError::ModelNotFound { version: None, .. }
    ));
    assert!(store.list().unwrap().is_empty());

    // Versions are not reused after delete.
    let v3 = store.save(draft("cost"), b"three").unwrap();
    assert_eq!(v3.version, 3);
}

#[test]
fn test_memory_store_versioning() {
    exercise_versioning(&InMemoryModelStore::new());
}

#[test]
fn test_file_store_versioning() {
    let dir = tempfile::tempdir().unwrap();
    exercise_versioning(&FileModelStore::open(dir.path()).unwrap());
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileModelStore::open(dir.path()).unwrap();
        store.save(draft("risk"), b"blob").unwrap();
    }
    let store = FileModelStore::open(dir.path()).unwrap();
    let loaded = store.load("risk").unwrap();
    assert_eq!(loaded.metadata, {
        let mut expected = draft("risk");
        expected.trained_at = loaded.metadata.trained_at;
        expected.version = 1;
        expected.weights_ref = BlobRef {
            model_id: "risk".into(),
            version: 1,
        };
        expected
    });
    assert_eq!(store.save(draft("risk"), b"next").unwrap().version, 2);
}

#[test]
fn test_file_store_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileModelStore::open(dir.path()).unwrap();
    store.save(draft("cost"), b"data").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("cost"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");
    assert!(names.contains(&"v000001.bin".to_string()));
    assert!(names.contains(&"v000001.json".to_string()));
}

#[test]
fn test_unpublished_blob_is_invisible() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileModelStore::open(dir.path()).unwrap();
    // A blob whose metadata never landed, as after a crash mid-save.
    std::fs::create_dir_all(dir.path().join("cost")).unwrap();
    std::fs::write(dir.path().join("cost/v000001.bin"), b"partial").unwrap();

    assert!(matches!(
        store.load("cost").unwrap_err(),
        PlanForgeError::ModelNotFound { .. }
    ));
    assert!(store.list().unwrap().is_empty());
}

// A dangling metadata link stands in for a .json removed between the
// directory scan and the read.
#[cfg(unix)]
#[test]
fn test_file_store_skips_vanished_metadata() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let store = FileModelStore::open(dir.path()).unwrap();
    store.save(draft("a_model"), b"1").unwrap();
    store.save(draft("b_model"), b"1").unwrap();
    symlink(
        dir.path().join("gone.json"),
        dir.path().join("b_model/v000002.json"),
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("c_model")).unwrap();
    symlink(
        dir.path().join("gone.json"),
        dir.path().join("c_model/v000001.json"),
    )
    .unwrap();

    let summary: Vec<(String, u32)> = store
        .list()
        .unwrap()
        .into_iter()
        .map(|m| (m.model_id, m.version))
        .collect();
    assert_eq!(
        summary,
        vec![("a_model".to_string(), 1), ("b_model".to_string(), 1)]
    );

    let versions = store.versions("b_model").unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);
    assert!(store.versions("c_model").unwrap().is_empty());
    assert!(matches!(
        store.load("c_model").unwrap_err(),
        PlanForgeError::ModelNotFound { .. }
    ));
}

#[test]
fn test_list_returns_latest_per_model() {
    let store = InMemoryModelStore::new();
    store.save(draft("b_model"), b"1").unwrap();
    store.save(draft("a_model"), b"1").unwrap();
    store.save(draft("b_model"), b"2").unwrap();

    let listed = store.list().unwrap();
    let summary: Vec<(&str, u32)> = listed
        .iter()
        .map(|m| (m.model_id.as_str(), m.version))
        .collect();
    assert_eq!(summary, vec![("a_model", 1), ("b_model", 2)]);
}

#[test]
fn test_invalid_model_ids_rejected() {
    let store = InMemoryModelStore::new();
    for id in ["", "../escape", "with space", "a/b"] {
        let err = store.save(draft(id), b"x").unwrap_err();
        assert!(matches!(err, PlanForgeError::Validation(_)), "{id}");
    }
    validate_model_id("duration_predictor-2").unwrap();
}

#[test]
fn test_concurrent_saves_get_distinct_versions() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileModelStore::open(dir.path()).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.save(draft("shared"), b"w").unwrap().version)
        })
        .collect();
    let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3, 4]);
}

/// Fails the first `failures` calls with a persistence error.
struct FlakyStore {
    inner: InMemoryModelStore,
    failures: AtomicU32,
    calls: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryModelStore::new(),
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    fn trip(&self) -> planforge_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PlanForgeError::persistence("disk busy"));
        }
        Ok(())
    }
}

impl ModelStore for FlakyStore {
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> planforge_core::Result<ModelMetadata> {
        self.trip()?;
        self.inner.save(metadata, blob)
    }
    fn load(&self, model_id: &str) -> planforge_core::Result<StoredModel> {
        self.trip()?;
        self.inner.load(model_id)
    }
    fn load_version(&self, model_id: &str, version: u32) -> planforge_core::Result<StoredModel> {
        self.inner.load_version(model_id, version)
    }
    fn list(&self) -> planforge_core::Result<Vec<ModelMetadata>> {
        self.inner.list()
    }
    fn versions(&self, model_id: &str) -> planforge_core::Result<Vec<ModelMetadata>> {
        self.inner.versions(model_id)
    }
    fn delete(&self, model_id: &str) -> planforge_core::Result<()> {
        self.inner.delete(model_id)
    }
}

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        initial_backoff: Duration::from_millis(1),
        multiplier: 2.0,
        max_backoff: Duration::from_millis(4),
    }
}

#[test]
fn test_retry_recovers_from_transient_failures() {
    let store = RetryingStore::new(FlakyStore::new(2), fast_policy(3));
    let saved = store.save(draft("cost"), b"w").unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_retry_gives_up_after_attempts() {
    let store = RetryingStore::new(FlakyStore::new(5), fast_policy(3));
    let err = store.save(draft("cost"), b"w").unwrap_err();
    assert!(matches!(err, PlanForgeError::Persistence(_)));
    assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_non_retryable_errors_surface_immediately() {
    let store = RetryingStore::new(FlakyStore::new(0), fast_policy(3));
    let err = store.load("missing").unwrap_err();
    assert!(matches!(err, PlanForgeError::ModelNotFound { .. }));
    assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backoff_grows_and_caps() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.attempts, 3);
    assert_eq!(policy.backoff(0), Duration::from_millis(50));
    assert_eq!(policy.backoff(1), Duration::from_millis(100));
    assert_eq!(policy.backoff(10), Duration::from_millis(2_000));
    assert_eq!(RetryPolicy::none().attempts, 1);
}
