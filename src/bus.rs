use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use crate::model::Dataset;

pub type Callback = Box<dyn Fn() + Send + Sync>;

/// In-process change notification keyed by dataset. Subscribers get no
/// payload; they re-read the cache themselves.
pub struct ChangeBus {
    inner: Mutex<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: HashMap<Dataset, Vec<(u64, std::sync::Arc<Callback>)>>,
}

/// Handle returned by `subscribe`. Passing it back to `unsubscribe` removes
/// exactly the registrations it created, leaving other subscribers alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

impl ChangeBus {
    pub fn new() -> ChangeBus {
        ChangeBus {
            inner: Mutex::new(BusInner::default()),
        }
    }

    pub fn subscribe(&self, datasets: &[Dataset], callback: Callback) -> Subscription {
        let mut inner = self.inner.lock().expect("bus lock");
        inner.next_id += 1;
        let id = inner.next_id;
        let callback = std::sync::Arc::new(callback);
        for ds in datasets {
            inner
                .listeners
                .entry(*ds)
                .or_default()
                .push((id, callback.clone()));
        }
        Subscription(id)
    }

    pub fn unsubscribe(&self, sub: Subscription) {
        let mut inner = self.inner.lock().expect("bus lock");
        for list in inner.listeners.values_mut() {
            list.retain(|(id, _)| *id != sub.0);
        }
    }

    /// Invoke every listener registered for the dataset, in registration
    /// order. A panicking listener is logged and must not starve the rest.
    pub fn publish(&self, dataset: Dataset) {
        let callbacks: Vec<std::sync::Arc<Callback>> = {
            let inner = self.inner.lock().expect("bus lock");
            inner
                .listeners
                .get(&dataset)
                .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };
        for cb in callbacks {
            if catch_unwind(AssertUnwindSafe(|| cb())).is_err() {
                log::warn!(
                    "change listener for {} panicked; continuing",
                    dataset.storage_key()
                );
            }
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        ChangeBus::new()
    }
}
