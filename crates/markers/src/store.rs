use crate::error::{MarkerError, Result};
use crate::marker::{unix_ms_now, Marker, MarkerId, NewMarker, DEFAULT_NAME_PREFIX};
use crate::table::MarkerTable;
use std::sync::Arc;

/// Ordered marker collection, optionally mirrored to a [`MarkerTable`].
///
/// The store is the only writer of its collection. With a table configured
/// every mutation hits the table first and the local collection only changes
/// once the table call succeeded.
pub struct MarkerStore {
    markers: Vec<Marker>,
    table: Option<Arc<dyn MarkerTable>>,
    next_local_id: u64,
    name_prefix: String,
}

impl Default for MarkerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerStore {
    /// Local-only store; ids come from an in-process counter
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            table: None,
            next_local_id: 0,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }

    /// Store mirrored to `table`; ids and timestamps come from the table
    pub fn with_table(table: Arc<dyn MarkerTable>) -> Self {
        Self {
            table: Some(table),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.table.is_some()
    }

    /// Replace the collection with the table contents.
    ///
    /// Returns the number of markers loaded. Without a table this is a no-op.
    pub async fn load(&mut self) -> Result<usize> {
        let Some(table) = &self.table else {
            return Ok(self.markers.len());
        };

        log::info!("Fetching markers...");
        let rows = table.select_all().await.inspect_err(|err| {
            log::error!("Error fetching markers: {err}");
        })?;

        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(&row.id) {
                log::error!("Error fetching markers: duplicate id {}", row.id);
                return Err(MarkerError::DuplicateId(row.id.clone()));
            }
        }

        log::info!("Fetched {} markers", rows.len());
        self.markers = rows;
        Ok(self.markers.len())
    }

    /// Append a marker, substituting the positional default for a blank name
    pub async fn add(
        &mut self,
        lat: f64,
        lng: f64,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Marker> {
        let new = NewMarker::new(lat, lng, name, description)
            .with_default_name(&self.name_prefix, self.markers.len() + 1);
        log::debug!("Adding marker {:?} at ({lat}, {lng})", new.name);

        let marker = match &self.table {
            Some(table) => {
                let row = table.insert(new).await.inspect_err(|err| {
                    log::error!("Error adding marker: {err}");
                })?;
                if self.get(&row.id).is_some() {
                    log::error!("Error adding marker: table returned existing id {}", row.id);
                    return Err(MarkerError::DuplicateId(row.id));
                }
                row
            }
            None => {
                let id = self.fresh_local_id();
                new.into_marker(id, unix_ms_now())
            }
        };

        log::info!("Added marker {} ({})", marker.id, marker.name);
        self.markers.push(marker.clone());
        Ok(marker)
    }

    /// Remove the marker with `id`.
    ///
    /// Absent ids are a no-op. With a table configured the remote delete runs
    /// first and a failure leaves the collection untouched.
    pub async fn remove(&mut self, id: &MarkerId) -> Result<Option<Marker>> {
        let Some(pos) = self.markers.iter().position(|m| &m.id == id) else {
            log::debug!("Marker {id} not present, nothing to remove");
            return Ok(None);
        };

        if let Some(table) = &self.table {
            table.delete(id).await.inspect_err(|err| {
                log::error!("Error removing marker {id}: {err}");
            })?;
        }

        let removed = self.markers.remove(pos);
        log::info!("Removed marker {id}");
        Ok(Some(removed))
    }

    /// Current collection in insertion order
    pub fn list(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| &m.id == id)
    }

    pub fn first(&self) -> Option<&Marker> {
        self.markers.first()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn fresh_local_id(&mut self) -> MarkerId {
        loop {
            self.next_local_id += 1;
            let id = MarkerId::from(self.next_local_id);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}
