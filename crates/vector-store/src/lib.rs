//! # Mapmark Vector Store
//!
//! Embedding and nearest-neighbor collaborators used for "similar location"
//! recommendations.
//!
//! ## Architecture
//!
//! ```text
//! "{name} {description}"
//!     │
//!     ├──> Embedder (hashing / stub)
//!     │      └─> Vec<f32>[dimension]
//!     │
//!     └──> VectorIndex
//!            ├─> upsert(id, vector, metadata)
//!            ├─> query(vector, top_k) -> QueryMatch[]
//!            └─> delete(ids)
//! ```
//!
//! Both seams are traits so a hosted embedding API or vector database can be
//! plugged in without touching callers.
//!
//! ## Example
//!
//! ```no_run
//! use mapmark_vector_store::{EmbeddingMode, MemoryVectorIndex, VectorIndex, VectorRecord};
//!
//! #[tokio::main]
//! async fn main() -> mapmark_vector_store::Result<()> {
//!     let embedder = EmbeddingMode::Hashing.build(256)?;
//!     let index = MemoryVectorIndex::open("vectors.json", embedder.dimension()).await?;
//!
//!     let values = embedder.embed("Bryant Park lawn").await?;
//!     index
//!         .upsert(vec![VectorRecord { id: "1".into(), values, metadata: Default::default() }])
//!         .await?;
//!
//!     let query = embedder.embed("park").await?;
//!     for hit in index.query(&query, 5).await? {
//!         println!("{}: {:.3}", hit.id, hit.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod index;
mod types;

pub use embeddings::{
    cosine_similarity, Embedder, EmbeddingMode, HashingEmbedder, StubEmbedder, DEFAULT_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use index::{MemoryVectorIndex, VectorIndex};
pub use types::{Metadata, QueryMatch, VectorRecord};
