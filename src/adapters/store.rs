use crate::domain::model::AnnouncementRecord;
use crate::domain::ports::AnnouncementStore;
use crate::utils::error::{DealError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// File-backed announcement store: one JSON map keyed by product id.
///
/// The mutex is the single serialization point for all mutation, which gives
/// same-key upserts the required atomicity for free; the file is rewritten
/// through a temp file and renamed, so readers never see a torn state file.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<Option<HashMap<String, AnnouncementRecord>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, AnnouncementRecord>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let map = serde_json::from_slice(&bytes)
                    .map_err(|e| DealError::tracker(format!("corrupt state file: {}", e)))?;
                Ok(map)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(DealError::tracker(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_map(&self, map: &HashMap<String, AnnouncementRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DealError::tracker(format!("cannot create state dir: {}", e)))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(map)?;
        std::fs::write(&tmp, data)
            .map_err(|e| DealError::tracker(format!("cannot write state file: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| DealError::tracker(format!("cannot replace state file: {}", e)))?;
        Ok(())
    }

    /// Loads the map on first use and keeps it cached under the lock; the
    /// file on disk is the durable copy, rewritten on every mutation.
    async fn with_map<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, AnnouncementRecord>) -> (T, bool),
    ) -> Result<T> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_map()?);
        }
        let map = guard.as_mut().expect("initialized above");
        let (result, dirty) = f(map);
        if dirty {
            self.write_map(map)?;
        }
        Ok(result)
    }
}

#[async_trait]
impl AnnouncementStore for JsonFileStore {
    async fn load(&self, product_id: &str) -> Result<Option<AnnouncementRecord>> {
        self.with_map(|map| (map.get(product_id).cloned(), false))
            .await
    }

    async fn upsert(&self, record: AnnouncementRecord) -> Result<()> {
        self.with_map(|map| {
            match map.get(&record.product_id) {
                // Last-writer-by-timestamp: an older write never clobbers a
                // newer record, so racing callers converge deterministically.
                Some(existing) if existing.announced_at > record.announced_at => ((), false),
                _ => {
                    map.insert(record.product_id.clone(), record);
                    ((), true)
                }
            }
        })
        .await
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_map(|map| {
            let before = map.len();
            map.retain(|_, record| record.announced_at >= cutoff);
            let deleted = before - map.len();
            (deleted, deleted > 0)
        })
        .await
    }
}
