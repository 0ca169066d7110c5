//! Persistence for issued allocations.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::RidAllocation;

/// Storage backend for [`RidAllocation`] records.
///
/// `insert_if_absent` must be atomic with respect to other inserts on the
/// same instance: of two concurrent calls carrying the same value, exactly
/// one returns `true`.
#[async_trait]
pub trait AllocationRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<RidAllocation>>;

    async fn list(&self, skip: usize, take: usize) -> Result<Vec<RidAllocation>>;

    /// Create or replace the record with the allocation's id.
    async fn upsert(&self, allocation: &RidAllocation) -> Result<()>;

    /// Whether any record carries `value`, compared case-insensitively.
    async fn exists_value(&self, value: &str) -> Result<bool>;

    /// Store the allocation unless its value is already taken.
    async fn insert_if_absent(&self, allocation: &RidAllocation) -> Result<bool>;
}

fn value_key(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

#[derive(Default)]
struct MemoryIndex {
    by_id: BTreeMap<String, RidAllocation>,
    id_by_value: HashMap<String, String>,
}

impl MemoryIndex {
    fn put(&mut self, allocation: &RidAllocation) {
        if let Some(previous) = self.by_id.get(&allocation.id) {
            self.id_by_value.remove(&value_key(&previous.value));
        }
        self.id_by_value
            .insert(value_key(&allocation.value), allocation.id.clone());
        self.by_id.insert(allocation.id.clone(), allocation.clone());
    }
}

/// Process-local repository. Both indexes sit behind one lock.
#[derive(Default)]
pub struct InMemoryRepository {
    index: RwLock<MemoryIndex>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AllocationRepository for InMemoryRepository {
    async fn get(&self, id: &str) -> Result<Option<RidAllocation>> {
        Ok(self.index.read().await.by_id.get(id).cloned())
    }

    async fn list(&self, skip: usize, take: usize) -> Result<Vec<RidAllocation>> {
        let index = self.index.read().await;
        Ok(index.by_id.values().skip(skip).take(take).cloned().collect())
    }

    async fn upsert(&self, allocation: &RidAllocation) -> Result<()> {
        self.index.write().await.put(allocation);
        Ok(())
    }

    async fn exists_value(&self, value: &str) -> Result<bool> {
        Ok(self
            .index
            .read()
            .await
            .id_by_value
            .contains_key(&value_key(value)))
    }

    async fn insert_if_absent(&self, allocation: &RidAllocation) -> Result<bool> {
        let mut index = self.index.write().await;
        if index.id_by_value.contains_key(&value_key(&allocation.value)) {
            return Ok(false);
        }
        index.put(allocation);
        Ok(true)
    }
}

/// Value index of the file repository. Record bodies stay on disk.
#[derive(Default)]
struct ValueIndex {
    value_by_id: HashMap<String, String>,
    id_by_value: HashMap<String, String>,
}

impl ValueIndex {
    fn put(&mut self, id: &str, value: &str) {
        let key = value_key(value);
        if let Some(previous) = self.value_by_id.insert(id.to_string(), key.clone()) {
            if previous != key && self.id_by_value.get(&previous).is_some_and(|owner| owner == id) {
                self.id_by_value.remove(&previous);
            }
        }
        self.id_by_value.insert(key, id.to_string());
    }

    fn contains(&self, value: &str) -> bool {
        self.id_by_value.contains_key(&value_key(value))
    }

    fn len(&self) -> usize {
        self.value_by_id.len()
    }
}

/// One pretty-printed JSON file per allocation, named `<id>.json`.
///
/// Values are indexed in memory when the repository is opened, so a
/// collision check never touches the disk. Writes hold the index lock so
/// the check and the file write happen as one step for this instance.
/// Other processes writing the same directory are not coordinated.
pub struct JsonFileRepository {
    dir: PathBuf,
    index: RwLock<ValueIndex>,
}

impl JsonFileRepository {
    /// Open (and create if needed) the record directory and index the
    /// values of the records already in it.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut repo = Self {
            dir,
            index: RwLock::new(ValueIndex::default()),
        };
        let mut index = ValueIndex::default();
        for path in repo.record_paths().await? {
            if let Some(record) = Self::read_record(&path).await {
                index.put(&record.id, &record.value);
            }
        }
        tracing::debug!(
            dir = %repo.dir.display(),
            records = index.len(),
            "Allocation repository opened"
        );
        repo.index = RwLock::new(index);
        Ok(repo)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn read_record(path: &Path) -> Option<RidAllocation> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable allocation record");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed allocation record");
                None
            }
        }
    }

    async fn write_record(&self, allocation: &RidAllocation) -> Result<()> {
        let body = serde_json::to_vec_pretty(allocation)?;
        let path = self.path_for(&allocation.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl AllocationRepository for JsonFileRepository {
    async fn get(&self, id: &str) -> Result<Option<RidAllocation>> {
        // Ids become file names; refuse anything that could leave the directory.
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Ok(None);
        }
        let path = self.path_for(id);
        match tokio::fs::try_exists(&path).await? {
            true => Ok(Self::read_record(&path).await),
            false => Ok(None),
        }
    }

    async fn list(&self, skip: usize, take: usize) -> Result<Vec<RidAllocation>> {
        let mut out = Vec::new();
        for path in self.record_paths().await?.into_iter().skip(skip).take(take) {
            if let Some(record) = Self::read_record(&path).await {
                out.push(record);
            }
        }
        Ok(out)
    }

    async fn upsert(&self, allocation: &RidAllocation) -> Result<()> {
        let mut index = self.index.write().await;
        self.write_record(allocation).await?;
        index.put(&allocation.id, &allocation.value);
        Ok(())
    }

    async fn exists_value(&self, value: &str) -> Result<bool> {
        Ok(self.index.read().await.contains(value))
    }

    async fn insert_if_absent(&self, allocation: &RidAllocation) -> Result<bool> {
        let mut index = self.index.write().await;
        if index.contains(&allocation.value) {
            return Ok(false);
        }
        self.write_record(allocation).await?;
        index.put(&allocation.id, &allocation.value);
        Ok(true)
    }
}
