use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::bus::ChangeBus;
use crate::model::Dataset;

/// Authoritative in-process view of every dataset. All reads and writes in
/// the daemon go through here; the remote store only ever feeds or mirrors
/// this cache. Payloads persist in the workspace database so a restart keeps
/// whatever the last session saw.
pub struct LocalCache {
    conn: Mutex<Connection>,
    bus: Arc<ChangeBus>,
}

impl LocalCache {
    pub fn open(workspace: &Path, bus: Arc<ChangeBus>) -> anyhow::Result<LocalCache> {
        std::fs::create_dir_all(workspace)
            .with_context(|| format!("create workspace {}", workspace.display()))?;
        let db_path = workspace.join("erapor.sqlite3");
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS datasets(
                name TEXT PRIMARY KEY,
                payload TEXT NOT NULL
            )",
            [],
        )?;
        Ok(LocalCache {
            conn: Mutex::new(conn),
            bus,
        })
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    fn load(&self, dataset: Dataset) -> anyhow::Result<Option<Value>> {
        let conn = self.conn.lock().expect("cache lock");
        let raw: Option<String> = conn
            .query_row(
                "SELECT payload FROM datasets WHERE name = ?",
                [dataset.storage_key()],
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s).with_context(|| {
                format!("corrupt cache payload for {}", dataset.storage_key())
            })?)),
            None => Ok(None),
        }
    }

    fn store(&self, dataset: Dataset, payload: &Value) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("cache lock");
        conn.execute(
            "INSERT INTO datasets(name, payload) VALUES(?, ?)
             ON CONFLICT(name) DO UPDATE SET payload = excluded.payload",
            (dataset.storage_key(), serde_json::to_string(payload)?),
        )?;
        Ok(())
    }

    /// Full record set of a collection dataset. A dataset that has never
    /// been populated seeds with its default and persists that seed.
    pub fn read(&self, dataset: Dataset) -> anyhow::Result<Vec<Value>> {
        match self.load(dataset)? {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Ok(vec![other]),
            None => {
                let seed = dataset.seed();
                self.store(dataset, &seed)?;
                match seed {
                    Value::Array(items) => Ok(items),
                    Value::Null => Ok(Vec::new()),
                    other => Ok(vec![other]),
                }
            }
        }
    }

    /// Current document of a singleton dataset, seeding on first read.
    pub fn read_doc(&self, dataset: Dataset) -> anyhow::Result<Value> {
        match self.load(dataset)? {
            Some(doc) => Ok(doc),
            None => {
                let seed = dataset.seed();
                self.store(dataset, &seed)?;
                Ok(seed)
            }
        }
    }

    /// Replace the whole dataset and notify subscribers. This is both the
    /// local full-replacement write and the landing point for remote echoes,
    /// so it schedules no remote propagation itself.
    pub fn write(&self, dataset: Dataset, payload: Value) -> anyhow::Result<()> {
        self.store(dataset, &payload)?;
        self.bus.publish(dataset);
        Ok(())
    }

    /// Replace the first record matching the predicate, or append when none
    /// matches. Returns the stored record.
    pub fn upsert<F>(&self, dataset: Dataset, record: Value, matches: F) -> anyhow::Result<Value>
    where
        F: Fn(&Value) -> bool,
    {
        let mut items = self.read(dataset)?;
        match items.iter_mut().find(|v| matches(v)) {
            Some(slot) => *slot = record.clone(),
            None => items.push(record.clone()),
        }
        self.store(dataset, &Value::Array(items))?;
        self.bus.publish(dataset);
        Ok(record)
    }

    /// Remove every record matching the predicate. Publishes even when
    /// nothing matched; delete notifications are unconditional.
    pub fn delete_where<F>(&self, dataset: Dataset, matches: F) -> anyhow::Result<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let items = self.read(dataset)?;
        let before = items.len();
        let kept: Vec<Value> = items.into_iter().filter(|v| !matches(v)).collect();
        let removed = before - kept.len();
        self.store(dataset, &Value::Array(kept))?;
        self.bus.publish(dataset);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn open_cache(prefix: &str) -> LocalCache {
        LocalCache::open(&temp_workspace(prefix), Arc::new(ChangeBus::new())).expect("open cache")
    }

    #[test]
    fn write_then_read_returns_exactly_what_was_written() {
        let cache = open_cache("erapor-cache-ryw");
        let records = json!([{ "id": "s1", "name": "Siti" }, { "id": "s2", "name": "Budi" }]);
        cache
            .write(Dataset::Students, records.clone())
            .expect("write");
        let read = cache.read(Dataset::Students).expect("read");
        assert_eq!(Value::Array(read), records);
    }

    #[test]
    fn first_read_persists_the_seed() {
        let cache = open_cache("erapor-cache-seed");
        let users = cache.read(Dataset::Users).expect("read users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "admin");
        // A second read must come from the persisted payload, not re-seed.
        let again = cache.read(Dataset::Users).expect("read users again");
        assert_eq!(users, again);
    }

    #[test]
    fn upsert_is_idempotent_per_key() {
        let cache = open_cache("erapor-cache-upsert");
        let rec = json!({ "id": "u9", "username": "guru9" });
        for _ in 0..2 {
            cache
                .upsert(Dataset::Users, rec.clone(), |v| v["id"] == "u9")
                .expect("upsert");
        }
        let users = cache.read(Dataset::Users).expect("read");
        let matching: Vec<&Value> = users.iter().filter(|v| v["id"] == "u9").collect();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn same_key_upserts_resolve_last_write_wins() {
        let cache = open_cache("erapor-cache-lww");
        cache
            .upsert(Dataset::ReportGrades, json!({ "id": "g1", "finalScore": 70 }), |v| {
                v["id"] == "g1"
            })
            .expect("first upsert");
        cache
            .upsert(Dataset::ReportGrades, json!({ "id": "g1", "finalScore": 85 }), |v| {
                v["id"] == "g1"
            })
            .expect("second upsert");
        let grades = cache.read(Dataset::ReportGrades).expect("read");
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0]["finalScore"], 85);
    }

    #[test]
    fn writes_notify_the_dataset_channel() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let bus = Arc::new(ChangeBus::new());
        let cache =
            LocalCache::open(&temp_workspace("erapor-cache-notify"), bus.clone()).expect("open");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        bus.subscribe(
            &[Dataset::Students],
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        cache
            .write(Dataset::Students, json!([]))
            .expect("write");
        cache
            .upsert(Dataset::Students, json!({ "id": "s1" }), |v| v["id"] == "s1")
            .expect("upsert");
        cache
            .delete_where(Dataset::Students, |v| v["id"] == "s1")
            .expect("delete");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn session_singleton_round_trips() {
        let cache = open_cache("erapor-cache-session");
        assert_eq!(cache.read_doc(Dataset::Session).expect("read"), Value::Null);
        cache
            .write(Dataset::Session, json!({ "academicYear": "2025/2026" }))
            .expect("write");
        let doc = cache.read_doc(Dataset::Session).expect("read");
        assert_eq!(doc["academicYear"], "2025/2026");
    }
}
