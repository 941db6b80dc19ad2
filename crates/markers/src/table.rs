use crate::error::{MarkerError, Result};
use crate::marker::{unix_ms_now, Marker, MarkerId, NewMarker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// Remote table of markers: columns `{id, lat, lng, name, description, created_at}`.
///
/// The table assigns ids and creation timestamps on insert.
#[async_trait]
pub trait MarkerTable: Send + Sync {
    async fn select_all(&self) -> Result<Vec<Marker>>;

    async fn insert(&self, marker: NewMarker) -> Result<Marker>;

    async fn delete(&self, id: &MarkerId) -> Result<()>;
}

/// Rows plus the id high-water mark; ids of deleted rows are never handed out again
#[derive(Clone, Default, Serialize, Deserialize)]
struct Rows {
    next_id: u64,
    rows: Vec<Marker>,
}

impl Rows {
    fn from_rows(rows: Vec<Marker>) -> Self {
        Self { next_id: 0, rows }.with_floor()
    }

    /// Raise `next_id` to at least the largest numeric id present
    fn with_floor(mut self) -> Self {
        let highest = self
            .rows
            .iter()
            .filter_map(|m| m.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest);
        self
    }

    fn insert(&mut self, marker: NewMarker) -> Marker {
        self.next_id += 1;
        let row = marker.into_marker(MarkerId::from(self.next_id), unix_ms_now());
        self.rows.push(row.clone());
        row
    }

    fn delete(&mut self, id: &MarkerId) {
        self.rows.retain(|row| &row.id != id);
    }
}

/// Table kept in process memory; the test double for a real database
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<Rows>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Marker>) -> Self {
        Self {
            rows: Mutex::new(Rows::from_rows(rows)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Rows> {
        self.rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl MarkerTable for MemoryTable {
    async fn select_all(&self) -> Result<Vec<Marker>> {
        Ok(self.lock().rows.clone())
    }

    async fn insert(&self, marker: NewMarker) -> Result<Marker> {
        Ok(self.lock().insert(marker))
    }

    async fn delete(&self, id: &MarkerId) -> Result<()> {
        self.lock().delete(id);
        Ok(())
    }
}

/// On-disk layouts: the current object form and a bare array of rows
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRows {
    Table(Rows),
    Bare(Vec<Marker>),
}

impl From<StoredRows> for Rows {
    fn from(stored: StoredRows) -> Self {
        match stored {
            StoredRows::Table(rows) => rows.with_floor(),
            StoredRows::Bare(rows) => Rows::from_rows(rows),
        }
    }
}

/// Table persisted as `{"next_id": n, "rows": [...]}`; every mutation rewrites the file
pub struct JsonFileTable {
    path: PathBuf,
    rows: AsyncMutex<Rows>,
}

impl JsonFileTable {
    /// Open the table, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::info!("Opening marker table at {}", path.display());

        let rows = match tokio::fs::read_to_string(&path).await {
            Ok(data) if data.trim().is_empty() => Rows::default(),
            Ok(data) => Rows::from(serde_json::from_str::<StoredRows>(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Rows::default(),
            Err(err) => return Err(err.into()),
        };

        log::debug!(
            "Marker table holds {} rows, next id {}",
            rows.rows.len(),
            rows.next_id + 1
        );
        Ok(Self {
            path,
            rows: AsyncMutex::new(rows),
        })
    }

    async fn save(&self, rows: &Rows) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_string_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl MarkerTable for JsonFileTable {
    async fn select_all(&self) -> Result<Vec<Marker>> {
        Ok(self.rows.lock().await.rows.clone())
    }

    async fn insert(&self, marker: NewMarker) -> Result<Marker> {
        let mut guard = self.rows.lock().await;
        let mut next = guard.clone();
        let row = next.insert(marker);
        self.save(&next).await.map_err(|err| {
            MarkerError::table(format!("insert into {} failed: {err}", self.path.display()))
        })?;
        *guard = next;
        Ok(row)
    }

    async fn delete(&self, id: &MarkerId) -> Result<()> {
        let mut guard = self.rows.lock().await;
        let mut next = guard.clone();
        next.delete(id);
        self.save(&next).await.map_err(|err| {
            MarkerError::table(format!("delete from {} failed: {err}", self.path.display()))
        })?;
        *guard = next;
        Ok(())
    }
}
