use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::bail;
use serde_json::Value;

use crate::cache::LocalCache;
use crate::model::{Dataset, RemoteTarget, ALL_DATASETS};
use crate::remote::{BatchWrite, RemoteError, RemoteStore};

/// Collection holding the singleton documents on the remote side.
const SETTINGS_COLLECTION: &str = "settings";

/// The remote store caps batch commits at 500 operations; stay under it.
const MAX_BATCH_OPS: usize = 400;

/// Attempts per queued propagation before it lands in the failure log.
const MAX_PUSH_ATTEMPTS: u32 = 3;
const PUSH_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Connectivity is decided once at bootstrap and not re-evaluated for the
/// rest of the session. There is no runtime reconnection detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Unconfigured,
    Offline,
    Online,
}

impl Connectivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Connectivity::Unconfigured => "unconfigured",
            Connectivity::Offline => "offline",
            Connectivity::Online => "online",
        }
    }
}

#[derive(Debug, Clone)]
enum PushTask {
    Put {
        collection: String,
        id: String,
        doc: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl PushTask {
    fn describe(&self) -> (String, String) {
        match self {
            PushTask::Put { collection, id, .. } => (collection.clone(), id.clone()),
            PushTask::Delete { collection, id } => (collection.clone(), id.clone()),
        }
    }
}

/// One propagation that exhausted its retries. Observable through
/// `sync.status`, never blocks or surfaces to the writer.
#[derive(Debug, Clone)]
pub struct PushFailure {
    pub collection: String,
    pub doc_id: String,
    pub error: String,
    pub attempts: u32,
}

pub struct SyncStatus {
    pub connectivity: Connectivity,
    pub realtime: bool,
    pub failures: Vec<PushFailure>,
}

struct WatcherSet {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

/// Coordinates bootstrap, per-write propagation, realtime polling and the
/// manual bulk push between the local cache and the remote store.
pub struct SyncEngine {
    cache: Arc<LocalCache>,
    remote: Option<Arc<dyn RemoteStore>>,
    poll_interval: Duration,
    connectivity: Mutex<Connectivity>,
    queue: Mutex<Option<mpsc::Sender<PushTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    failures: Arc<Mutex<Vec<PushFailure>>>,
    watchers: Mutex<Option<WatcherSet>>,
}

impl SyncEngine {
    pub fn new(
        cache: Arc<LocalCache>,
        remote: Option<Arc<dyn RemoteStore>>,
        poll_interval: Duration,
    ) -> SyncEngine {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let (queue, worker) = match &remote {
            Some(remote) => {
                let (tx, rx) = mpsc::channel::<PushTask>();
                let remote = remote.clone();
                let failures = failures.clone();
                let handle = std::thread::spawn(move || run_push_worker(remote, rx, failures));
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };
        SyncEngine {
            cache,
            remote,
            poll_interval,
            connectivity: Mutex::new(Connectivity::Unconfigured),
            queue: Mutex::new(queue),
            worker: Mutex::new(worker),
            failures,
            watchers: Mutex::new(None),
        }
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            connectivity: *self.connectivity.lock().expect("connectivity lock"),
            realtime: self
                .watchers
                .lock()
                .expect("watchers lock")
                .is_some(),
            failures: self.failures.lock().expect("failures lock").clone(),
        }
    }

    /// Startup reconciliation. Remote data wins per dataset; an empty remote
    /// collection is seeded from whatever the local cache holds. Runs the
    /// datasets concurrently and never fails visibly: any error degrades to
    /// the cached (or seeded) local state.
    pub fn bootstrap(&self) {
        // Seeds every dataset locally first, so offline mode and remote
        // failures both leave a usable cache behind.
        for dataset in ALL_DATASETS {
            let seeded = if dataset.is_singleton() {
                self.cache.read_doc(dataset).map(|_| ())
            } else {
                self.cache.read(dataset).map(|_| ())
            };
            if let Err(e) = seeded {
                log::warn!("seed {} failed: {e:#}", dataset.storage_key());
            }
        }

        let Some(remote) = &self.remote else {
            log::info!("no remote configured; continuing in offline mode");
            return;
        };

        log::info!("starting bootstrap sync");
        let any_ok = AtomicBool::new(false);
        std::thread::scope(|s| {
            for dataset in ALL_DATASETS {
                if dataset.remote_target() == RemoteTarget::None {
                    continue;
                }
                let any_ok = &any_ok;
                let remote = remote.clone();
                let cache = self.cache.clone();
                s.spawn(move || match bootstrap_dataset(&*remote, &cache, dataset) {
                    Ok(()) => {
                        any_ok.store(true, Ordering::SeqCst);
                    }
                    Err(e) => {
                        log::warn!(
                            "bootstrap {} failed, keeping local data: {e:#}",
                            dataset.storage_key()
                        );
                    }
                });
            }
        });

        let connectivity = if any_ok.load(Ordering::SeqCst) {
            Connectivity::Online
        } else {
            Connectivity::Offline
        };
        *self.connectivity.lock().expect("connectivity lock") = connectivity;
        log::info!("bootstrap sync done, connectivity: {}", connectivity.as_str());
    }

    /// Queue a best-effort remote save for one record. Never blocks, never
    /// surfaces an error; local state is authoritative regardless.
    pub fn schedule_save(&self, dataset: Dataset, id: &str, doc: Value) {
        let task = match dataset.remote_target() {
            RemoteTarget::Collection(c) => PushTask::Put {
                collection: c.to_string(),
                id: id.to_string(),
                doc,
            },
            RemoteTarget::SettingsDoc(d) => PushTask::Put {
                collection: SETTINGS_COLLECTION.to_string(),
                id: d.to_string(),
                doc,
            },
            RemoteTarget::None => return,
        };
        self.enqueue(task);
    }

    pub fn schedule_delete(&self, dataset: Dataset, id: &str) {
        let collection = match dataset.remote_target() {
            RemoteTarget::Collection(c) => c.to_string(),
            // Singleton settings docs are overwritten, never deleted.
            _ => return,
        };
        self.enqueue(PushTask::Delete {
            collection,
            id: id.to_string(),
        });
    }

    fn enqueue(&self, task: PushTask) {
        let queue = self.queue.lock().expect("queue lock");
        if let Some(tx) = queue.as_ref() {
            if tx.send(task).is_err() {
                log::warn!("push worker gone; dropping queued sync task");
            }
        }
    }

    /// Upload every locally cached record to the remote store, chunked into
    /// batch commits. This is the one sync operation whose failure surfaces
    /// to the caller; the local cache is never touched by it.
    pub fn force_push_all(&self) -> anyhow::Result<()> {
        let Some(remote) = &self.remote else {
            bail!("offline mode, cannot sync");
        };

        log::info!("force push to remote store requested");
        for dataset in ALL_DATASETS {
            match dataset.remote_target() {
                RemoteTarget::Collection(collection) => {
                    let records = self.cache.read(dataset)?;
                    let writes: Vec<BatchWrite> = records
                        .into_iter()
                        .filter_map(|doc| {
                            let id = doc.get("id").and_then(|v| v.as_str())?.to_string();
                            if id.is_empty() {
                                return None;
                            }
                            Some(BatchWrite {
                                collection: collection.to_string(),
                                id,
                                doc,
                            })
                        })
                        .collect();
                    for chunk in writes.chunks(MAX_BATCH_OPS) {
                        remote.commit_batch(chunk)?;
                    }
                }
                RemoteTarget::SettingsDoc(doc_id) => {
                    let doc = self.cache.read_doc(dataset)?;
                    if !doc.is_null() {
                        remote.put(SETTINGS_COLLECTION, doc_id, &doc)?;
                    }
                }
                RemoteTarget::None => {}
            }
        }
        Ok(())
    }

    /// Start or stop the realtime watchers. Always idempotent: enabling
    /// tears down any previous watcher set first, so re-invocation never
    /// accumulates duplicate subscriptions.
    pub fn set_realtime(&self, enabled: bool) {
        self.stop_watchers();
        if !enabled {
            return;
        }
        let Some(remote) = &self.remote else {
            log::info!("realtime requested but no remote configured");
            return;
        };

        log::info!("starting realtime watchers");
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();
        for dataset in ALL_DATASETS {
            if dataset.remote_target() == RemoteTarget::None {
                continue;
            }
            let remote = remote.clone();
            let cache = self.cache.clone();
            let stop = stop.clone();
            let interval = self.poll_interval;
            handles.push(std::thread::spawn(move || {
                run_watcher(remote, cache, dataset, interval, stop)
            }));
        }
        *self.watchers.lock().expect("watchers lock") = Some(WatcherSet { stop, handles });
    }

    fn stop_watchers(&self) {
        let set = self.watchers.lock().expect("watchers lock").take();
        if let Some(set) = set {
            set.stop.store(true, Ordering::SeqCst);
            for handle in set.handles {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop_watchers();
        // Dropping the sender lets the worker drain its queue and exit.
        self.queue.lock().expect("queue lock").take();
        if let Some(handle) = self.worker.lock().expect("worker lock").take() {
            let _ = handle.join();
        }
    }
}

fn bootstrap_dataset(
    remote: &dyn RemoteStore,
    cache: &LocalCache,
    dataset: Dataset,
) -> anyhow::Result<()> {
    match dataset.remote_target() {
        RemoteTarget::Collection(collection) => {
            let docs = remote.list_all(collection)?;
            if !docs.is_empty() {
                cache.write(dataset, Value::Array(docs))?;
                return Ok(());
            }
            // Remote empty: the first writer seeds the server.
            let local = cache.read(dataset)?;
            if local.is_empty() {
                return Ok(());
            }
            log::info!("seeding empty remote collection {collection}");
            let writes: Vec<BatchWrite> = local
                .into_iter()
                .filter_map(|doc| {
                    let id = doc.get("id").and_then(|v| v.as_str())?.to_string();
                    Some(BatchWrite {
                        collection: collection.to_string(),
                        id,
                        doc,
                    })
                })
                .collect();
            for chunk in writes.chunks(MAX_BATCH_OPS) {
                remote.commit_batch(chunk)?;
            }
            Ok(())
        }
        RemoteTarget::SettingsDoc(doc_id) => {
            match remote.get_doc(SETTINGS_COLLECTION, doc_id)? {
                Some(doc) => {
                    cache.write(dataset, doc)?;
                }
                None => {
                    let local = cache.read_doc(dataset)?;
                    if !local.is_null() {
                        log::info!("seeding empty remote settings doc {doc_id}");
                        remote.put(SETTINGS_COLLECTION, doc_id, &local)?;
                    }
                }
            }
            Ok(())
        }
        RemoteTarget::None => Ok(()),
    }
}

fn run_push_worker(
    remote: Arc<dyn RemoteStore>,
    rx: mpsc::Receiver<PushTask>,
    failures: Arc<Mutex<Vec<PushFailure>>>,
) {
    while let Ok(task) = rx.recv() {
        let mut last_err: Option<RemoteError> = None;
        for attempt in 1..=MAX_PUSH_ATTEMPTS {
            let result = match &task {
                PushTask::Put {
                    collection,
                    id,
                    doc,
                } => remote.put(collection, id, doc),
                PushTask::Delete { collection, id } => remote.delete(collection, id),
            };
            match result {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(e) => {
                    last_err = Some(e);
                    if attempt < MAX_PUSH_ATTEMPTS {
                        std::thread::sleep(PUSH_RETRY_DELAY);
                    }
                }
            }
        }
        if let Some(e) = last_err {
            let (collection, doc_id) = task.describe();
            log::warn!("remote save failed ({collection}/{doc_id}), kept locally only: {e}");
            failures.lock().expect("failures lock").push(PushFailure {
                collection,
                doc_id,
                error: e.to_string(),
                attempts: MAX_PUSH_ATTEMPTS,
            });
        }
    }
}

/// Poll one dataset's remote snapshot and overwrite the local cache whenever
/// it changes. The overwrite is unconditional: a local write whose
/// propagation has not landed yet loses to the remote snapshot
/// (last remote write wins).
fn run_watcher(
    remote: Arc<dyn RemoteStore>,
    cache: Arc<LocalCache>,
    dataset: Dataset,
    interval: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut last_seen: Option<String> = None;
    while !stop.load(Ordering::SeqCst) {
        let snapshot = match dataset.remote_target() {
            RemoteTarget::Collection(collection) => {
                remote.list_all(collection).map(|docs| Some(Value::Array(docs)))
            }
            RemoteTarget::SettingsDoc(doc_id) => remote.get_doc(SETTINGS_COLLECTION, doc_id),
            RemoteTarget::None => return,
        };
        match snapshot {
            Ok(Some(payload)) => {
                let fingerprint = payload.to_string();
                if last_seen.as_deref() != Some(fingerprint.as_str()) {
                    log::debug!("realtime update received for {}", dataset.storage_key());
                    if let Err(e) = cache.write(dataset, payload) {
                        log::warn!(
                            "applying realtime update for {} failed: {e:#}",
                            dataset.storage_key()
                        );
                    } else {
                        last_seen = Some(fingerprint);
                    }
                }
            }
            // Absent settings doc: nothing to apply yet.
            Ok(None) => {}
            Err(e) => {
                log::warn!("realtime poll for {} failed: {e}", dataset.storage_key());
            }
        }

        // Sleep in short slices so teardown stays prompt.
        let mut remaining = interval;
        while !remaining.is_zero() && !stop.load(Ordering::SeqCst) {
            let step = remaining.min(Duration::from_millis(100));
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}
