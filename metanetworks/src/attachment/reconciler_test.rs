use super::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FakeParent {
    id: String,
    mapped_elements: Vec<String>,
}

impl ParentResource for FakeParent {
    const KIND: &'static str = "metaport";

    fn mapped_elements(&self) -> &[String] {
        &self.mapped_elements
    }

    fn mapped_elements_mut(&mut self) -> &mut Vec<String> {
        &mut self.mapped_elements
    }
}

/// In-memory parent store with knobs for lag, contention and failures.
#[derive(Default)]
struct FakeStore {
    durable: Mutex<HashMap<String, Vec<String>>>,
    published: Mutex<HashMap<String, Vec<String>>>,
    lagging: AtomicBool,
    reject_writes: AtomicBool,
    busy_failures: AtomicU32,
    not_found_after_write: AtomicU32,
    hide_after_write: AtomicU32,
    replace_delay: Mutex<Duration>,
    writes: Mutex<Vec<Vec<String>>>,
    replace_attempts: AtomicU32,
}

impl FakeStore {
    fn with_parent(id: &str, elements: &[&str]) -> Self {
        let store = Self::default();
        store.insert(id, elements);
        store
    }

    fn insert(&self, id: &str, elements: &[&str]) {
        let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
        self.durable
            .lock()
            .unwrap()
            .insert(id.to_string(), elements.clone());
        self.published
            .lock()
            .unwrap()
            .insert(id.to_string(), elements);
    }

    /// Make every durable write visible to readers.
    fn publish(&self) {
        let durable = self.durable.lock().unwrap().clone();
        *self.published.lock().unwrap() = durable;
    }

    fn durable(&self, id: &str) -> Vec<String> {
        self.durable.lock().unwrap().get(id).cloned().unwrap_or_default()
    }

    fn writes(&self) -> Vec<Vec<String>> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ParentStore<FakeParent> for FakeStore {
    async fn fetch(&self, id: &str) -> Result<FakeParent, ApiError> {
        let hidden = self
            .not_found_after_write
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let elements = self.published.lock().unwrap().get(id).cloned();
        match elements {
            Some(mapped_elements) if !hidden => Ok(FakeParent {
                id: id.to_string(),
                mapped_elements,
            }),
            _ => Err(ApiError::NotFound {
                path: format!("/v1/fake/{}", id),
            }),
        }
    }

    async fn replace(&self, id: &str, parent: &FakeParent) -> Result<FakeParent, ApiError> {
        self.replace_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.replace_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ApiError::ApiError {
                status: 400,
                message: "invalid mapped element".to_string(),
            });
        }
        if self
            .busy_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::ResourceBusy {
                message: format!("{} is busy. Try again later.", id),
            });
        }

        self.writes
            .lock()
            .unwrap()
            .push(parent.mapped_elements.clone());
        self.durable
            .lock()
            .unwrap()
            .insert(id.to_string(), parent.mapped_elements.clone());
        if !self.lagging.load(Ordering::SeqCst) {
            self.publish();
        }
        self.not_found_after_write
            .store(self.hide_after_write.load(Ordering::SeqCst), Ordering::SeqCst);
        Ok(parent.clone())
    }
}

fn fast_wait() -> WaitConfig {
    WaitConfig {
        delay: Duration::from_millis(1),
        timeout: Duration::from_millis(200),
        min_interval: Duration::from_millis(2),
        max_interval: Duration::from_millis(10),
    }
}

fn fast_busy_retry() -> WaitConfig {
    WaitConfig {
        delay: Duration::ZERO,
        timeout: Duration::from_millis(500),
        min_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(20),
    }
}

fn reconciler(store: FakeStore) -> AttachmentReconciler<FakeParent, FakeStore> {
    reconciler_with_locks(store, Arc::new(KeyedMutex::new()))
}

fn reconciler_with_locks(
    store: FakeStore,
    locks: Arc<KeyedMutex>,
) -> AttachmentReconciler<FakeParent, FakeStore> {
    AttachmentReconciler::new(store, locks, fast_wait()).with_busy_retry(fast_busy_retry())
}

#[tokio::test]
async fn attach_writes_element_and_returns_composite_id() {
    let r = reconciler(FakeStore::with_parent("m-1", &[]));

    let id = r.attach("m-1", "ne-9").await.unwrap();

    assert_eq!(id.to_string(), "m-1_ne-9");
    assert_eq!(r.store().writes(), vec![vec!["ne-9".to_string()]]);
    assert_eq!(r.store().durable("m-1"), vec!["ne-9"]);
}

#[tokio::test]
async fn attach_appends_to_existing_elements() {
    let r = reconciler(FakeStore::with_parent("m-1", &["ne-1"]));

    r.attach("m-1", "ne-2").await.unwrap();

    assert_eq!(r.store().durable("m-1"), vec!["ne-1", "ne-2"]);
}

#[tokio::test]
async fn attach_then_read_reports_attached() {
    let r = reconciler(FakeStore::with_parent("m-1", &[]));

    let id = r.attach("m-1", "ne-9").await.unwrap();
    let membership = r.read(&id.to_string()).await.unwrap();

    assert_eq!(membership, Membership::Attached(id));
}

#[tokio::test]
async fn attach_twice_fails_without_second_write() {
    let r = reconciler(FakeStore::with_parent("m-1", &[]));

    r.attach("m-1", "ne-9").await.unwrap();
    let second = r.attach("m-1", "ne-9").await;

    assert!(matches!(
        second,
        Err(AttachmentError::AlreadyAttached { ref element_id, .. }) if element_id == "ne-9"
    ));
    assert_eq!(r.store().writes().len(), 1);
}

#[tokio::test]
async fn attach_to_missing_parent_is_not_found_and_releases_lock() {
    let locks = Arc::new(KeyedMutex::new());
    let r = reconciler_with_locks(FakeStore::default(), locks.clone());

    let result = r.attach("m-404", "ne-1").await;

    assert!(matches!(result, Err(AttachmentError::NotFound { ref id, .. }) if id == "m-404"));
    assert!(r.store().writes().is_empty());
    assert!(timeout(Duration::from_millis(100), locks.lock("m-404"))
        .await
        .is_ok());
}

#[tokio::test]
async fn attach_rejects_empty_ids_before_any_call() {
    let r = reconciler(FakeStore::with_parent("m-1", &[]));

    assert!(matches!(
        r.attach("", "ne-1").await,
        Err(AttachmentError::InvalidArgument(_))
    ));
    assert!(matches!(
        r.attach("m-1", "").await,
        Err(AttachmentError::InvalidArgument(_))
    ));
    assert_eq!(r.store().replace_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn attach_does_not_retry_busy_write() {
    let store = FakeStore::with_parent("m-1", &[]);
    store.busy_failures.store(1, Ordering::SeqCst);
    let r = reconciler(store);

    let result = r.attach("m-1", "ne-9").await;

    assert!(matches!(
        result,
        Err(AttachmentError::Transport(ApiError::ResourceBusy { .. }))
    ));
    assert_eq!(r.store().replace_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn attach_times_out_but_write_is_durable() {
    let store = FakeStore::with_parent("m-1", &[]);
    store.lagging.store(true, Ordering::SeqCst);
    let r = reconciler(store);

    let result = r.attach("m-1", "ne-9").await;
    assert!(matches!(
        result,
        Err(AttachmentError::ConvergenceTimeout { ref parent_id, .. }) if parent_id == "m-1"
    ));

    r.store().publish();
    let membership = r.read("m-1_ne-9").await.unwrap();
    assert!(matches!(membership, Membership::Attached(_)));
}

#[tokio::test]
async fn attach_reports_parent_deleted_while_polling() {
    let store = FakeStore::with_parent("m-1", &[]);
    store.hide_after_write.store(1, Ordering::SeqCst);
    let r = reconciler(store);

    let result = r.attach("m-1", "ne-9").await;

    assert!(matches!(result, Err(AttachmentError::NotFound { ref id, .. }) if id == "m-1"));
    assert_eq!(r.store().writes(), vec![vec!["ne-9".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn deleted_parent_is_not_reported_as_timeout_with_default_profile() {
    let store = FakeStore::with_parent("m-1", &[]);
    store.hide_after_write.store(u32::MAX, Ordering::SeqCst);
    let r: AttachmentReconciler<FakeParent, _> = AttachmentReconciler::new(
        store,
        Arc::new(KeyedMutex::new()),
        WaitConfig::attachment(),
    );

    let started = tokio::time::Instant::now();
    let result = r.attach("m-1", "ne-9").await;

    assert!(matches!(result, Err(AttachmentError::NotFound { .. })));
    assert!(started.elapsed() < WaitConfig::attachment().timeout);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attaches_to_one_parent_keep_both() {
    let store = FakeStore::with_parent("m-1", &[]);
    *store.replace_delay.lock().unwrap() = Duration::from_millis(20);
    let r = Arc::new(reconciler(store));

    let (a, b) = tokio::join!(
        {
            let r = r.clone();
            async move { r.attach("m-1", "e1").await }
        },
        {
            let r = r.clone();
            async move { r.attach("m-1", "e2").await }
        }
    );
    a.unwrap();
    b.unwrap();

    let mut elements = r.store().durable("m-1");
    elements.sort();
    assert_eq!(elements, vec!["e1", "e2"]);
    assert_eq!(r.store().writes()[1].len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_mutations_are_serialized() {
    let store = FakeStore::with_parent("m-1", &[]);
    *store.replace_delay.lock().unwrap() = Duration::from_millis(2);
    let r = Arc::new(reconciler(store));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let r = r.clone();
            tokio::spawn(async move { r.attach("m-1", &format!("e{}", i)).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(r.store().durable("m-1").len(), 8);
}

#[tokio::test]
async fn attach_on_other_parent_is_not_blocked() {
    let locks = Arc::new(KeyedMutex::new());
    let store = FakeStore::with_parent("m-1", &[]);
    store.insert("m-2", &[]);
    let r = reconciler_with_locks(store, locks.clone());

    let _held = locks.lock("m-1").await;
    let result = timeout(Duration::from_secs(1), r.attach("m-2", "e1")).await;

    assert!(result.expect("attach on m-2 must not wait for m-1").is_ok());
}

#[tokio::test]
async fn attach_waits_for_lock_on_same_parent() {
    let locks = Arc::new(KeyedMutex::new());
    let r = reconciler_with_locks(FakeStore::with_parent("m-1", &[]), locks.clone());

    let held = locks.lock("m-1").await;
    let blocked = timeout(Duration::from_millis(50), r.attach("m-1", "e1")).await;
    assert!(blocked.is_err());
    assert!(r.store().writes().is_empty());

    drop(held);
    r.attach("m-1", "e1").await.unwrap();
}

#[tokio::test]
async fn read_reports_gone_when_element_removed() {
    let r = reconciler(FakeStore::with_parent("m-1", &["ne-1"]));

    assert_eq!(r.read("m-1_ne-2").await.unwrap(), Membership::Gone);
}

#[tokio::test]
async fn read_propagates_missing_parent() {
    let r = reconciler(FakeStore::default());

    let result = r.read("m-1_ne-1").await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn read_rejects_malformed_id() {
    let r = reconciler(FakeStore::with_parent("m-1", &[]));

    for raw in ["m-1", "m-1_ne_1", ""] {
        assert!(matches!(
            r.read(raw).await,
            Err(AttachmentError::MalformedIdentifier(_))
        ));
    }
}

#[tokio::test]
async fn detach_removes_element() {
    let r = reconciler(FakeStore::with_parent("m-1", &["ne-1", "ne-9"]));

    r.detach("m-1", "ne-9").await.unwrap();

    assert_eq!(r.store().durable("m-1"), vec!["ne-1"]);
    assert_eq!(r.read("m-1_ne-9").await.unwrap(), Membership::Gone);
}

#[tokio::test]
async fn detach_twice_is_ok() {
    let r = reconciler(FakeStore::with_parent("m-1", &["ne-9"]));

    r.detach("m-1", "ne-9").await.unwrap();
    r.detach("m-1", "ne-9").await.unwrap();

    assert!(r.store().durable("m-1").is_empty());
}

#[tokio::test]
async fn detach_retries_busy_until_write_lands() {
    let store = FakeStore::with_parent("m-1", &["ne-9"]);
    store.busy_failures.store(2, Ordering::SeqCst);
    let r = reconciler(store);

    r.detach("m-1", "ne-9").await.unwrap();

    assert_eq!(r.store().replace_attempts.load(Ordering::SeqCst), 3);
    assert!(r.store().durable("m-1").is_empty());
}

#[tokio::test]
async fn detach_gives_up_when_busy_outlasts_budget() {
    let store = FakeStore::with_parent("m-1", &["ne-9"]);
    store.busy_failures.store(u32::MAX, Ordering::SeqCst);
    let r = reconciler(store);

    let result = r.detach("m-1", "ne-9").await;

    match result {
        Err(AttachmentError::ResourceBusy {
            parent_id, message, ..
        }) => {
            assert_eq!(parent_id, "m-1");
            assert!(message.contains("is busy"));
        }
        other => panic!("expected ResourceBusy, got {other:?}"),
    }
    assert!(r.store().replace_attempts.load(Ordering::SeqCst) > 1);
    assert_eq!(r.store().durable("m-1"), vec!["ne-9"]);
}

#[tokio::test]
async fn detach_surfaces_other_write_errors_immediately() {
    let store = FakeStore::with_parent("m-1", &["ne-9"]);
    store.reject_writes.store(true, Ordering::SeqCst);
    let r = reconciler(store);

    let result = r.detach("m-1", "ne-9").await;

    assert!(matches!(
        result,
        Err(AttachmentError::Transport(ApiError::ApiError { status: 400, .. }))
    ));
    assert_eq!(r.store().replace_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn detach_from_missing_parent_is_not_found() {
    let r = reconciler(FakeStore::default());

    let result = r.detach("m-404", "ne-1").await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn detach_holds_lock_through_busy_retries() {
    let locks = Arc::new(KeyedMutex::new());
    let store = FakeStore::with_parent("m-1", &["ne-9"]);
    store.busy_failures.store(3, Ordering::SeqCst);
    let r = Arc::new(reconciler_with_locks(store, locks.clone()));

    let detach = {
        let r = r.clone();
        tokio::spawn(async move { r.detach("m-1", "ne-9").await })
    };
    tokio::time::sleep(Duration::from_millis(2)).await;

    let guard = locks.lock("m-1").await;
    // Once we hold the lock the detach has fully finished its retries.
    assert!(r.store().durable("m-1").is_empty());
    drop(guard);

    detach.await.unwrap().unwrap();
}
