use crate::embeddings::cosine_similarity;
use crate::error::{Result, VectorStoreError};
use crate::types::{QueryMatch, VectorRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Nearest-neighbor index over `(id, vector, metadata)` records
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Top `top_k` records by cosine similarity, best first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;

    /// Delete records by id; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Every stored id, in id order
    async fn ids(&self) -> Result<Vec<String>>;

    async fn len(&self) -> Result<usize>;
}

/// Brute-force cosine index, optionally saved to a JSON file after every write
pub struct MemoryVectorIndex {
    dimension: usize,
    records: RwLock<BTreeMap<String, VectorRecord>>,
    path: Option<PathBuf>,
}

impl MemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Load the index from `path` if it exists; later writes are saved there
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::info!("Loading vector index from {}", path.display());

        let mut records = BTreeMap::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(data) if !data.trim().is_empty() => {
                let stored: Vec<VectorRecord> = serde_json::from_str(&data)?;
                for record in stored {
                    ensure_dimension(dimension, &record.values)?;
                    records.insert(record.id.clone(), record);
                }
            }
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        log::info!("Loaded {} vectors", records.len());
        Ok(Self {
            dimension,
            records: RwLock::new(records),
            path: Some(path),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    async fn save(&self, records: &BTreeMap<String, VectorRecord>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_string_pretty(&records.values().collect::<Vec<_>>())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::debug!("Vector index saved to {}", path.display());
        Ok(())
    }
}

fn ensure_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(VectorStoreError::InvalidDimension {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        for record in &records {
            ensure_dimension(self.dimension, &record.values)?;
        }

        let mut guard = self.records.write().await;
        let mut next = guard.clone();
        for record in records {
            next.insert(record.id.clone(), record);
        }
        self.save(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        ensure_dimension(self.dimension, vector)?;

        let guard = self.records.read().await;
        let mut scored: Vec<QueryMatch> = guard
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Sort by score descending; BTreeMap order breaks ties by id
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut guard = self.records.write().await;
        if !ids.iter().any(|id| guard.contains_key(id)) {
            return Ok(());
        }
        let mut next = guard.clone();
        for id in ids {
            next.remove(id);
        }
        self.save(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
