use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name prefix used when a marker is added without a name
pub const DEFAULT_NAME_PREFIX: &str = "NYC Location";

/// Opaque marker identifier.
///
/// Local stores hand out decimal counters; tables may assign anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MarkerId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for MarkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MarkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A user-placed map annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    /// Markdown text, may embed data-URI images
    pub description: String,
    /// Unix milliseconds
    pub created_at: u64,
}

impl Marker {
    /// Text fed to the embedding provider
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

/// Insert payload: a marker before it has an id or timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMarker {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
}

impl NewMarker {
    pub fn new(lat: f64, lng: f64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Substitute `"{prefix} {position}"` when the name is blank
    pub fn with_default_name(mut self, prefix: &str, position: usize) -> Self {
        if self.name.trim().is_empty() {
            self.name = format!("{prefix} {position}");
        }
        self
    }

    pub fn into_marker(self, id: MarkerId, created_at: u64) -> Marker {
        Marker {
            id,
            lat: self.lat,
            lng: self.lng,
            name: self.name,
            description: self.description,
            created_at,
        }
    }
}

pub fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
