//! # Mapmark Markers
//!
//! In-memory marker collection for map annotations, optionally mirrored to a
//! marker table.
//!
//! ## Architecture
//!
//! ```text
//! add(lat, lng, name, description)
//!     │
//!     ├──> MarkerTable::insert (when configured)
//!     │      └─> table-assigned id + created_at
//!     │
//!     └──> MarkerStore (ordered Vec<Marker>)
//!            └─> list() in insertion order
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mapmark_markers::{JsonFileTable, MarkerStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mapmark_markers::Result<()> {
//!     let table = JsonFileTable::open("markers.json").await?;
//!     let mut store = MarkerStore::with_table(Arc::new(table));
//!     store.load().await?;
//!
//!     let marker = store.add(40.7128, -74.0060, "", "Start here").await?;
//!     println!("{} at {}, {}", marker.name, marker.lat, marker.lng);
//!
//!     Ok(())
//! }
//! ```

mod error;
mod image;
mod marker;
mod store;
mod table;

pub use error::{MarkerError, Result};
pub use image::{append_image, data_uri, image_markdown, mime_for_path, read_image_markdown};
pub use marker::{unix_ms_now, Marker, MarkerId, NewMarker, DEFAULT_NAME_PREFIX};
pub use store::MarkerStore;
pub use table::{JsonFileTable, MarkerTable, MemoryTable};
