use anyhow::{bail, Context, Result};
use mapmark_markers::DEFAULT_NAME_PREFIX;
use mapmark_recommend::{DEFAULT_TOP_K, FALLBACK_LOCATION};
use mapmark_vector_store::{EmbeddingMode, DEFAULT_DIMENSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "mapmark.toml";

/// Top-level configuration, read from `mapmark.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix for auto-named markers ("NYC Location 1", ...)
    pub default_name_prefix: String,
    pub features: Features,
    pub storage: StorageConfig,
    pub recommend: RecommendConfig,
    pub embedding: EmbeddingConfig,
}

/// Feature flags selecting which flavor of the tool runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Mirror markers to the marker table
    pub persistence: bool,
    /// Allow markdown extras (inline images) in descriptions
    pub markdown: bool,
    pub strategy: Strategy,
    /// Add keyword suggestions as markers automatically
    pub accept_suggestions: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Keyword,
    Similarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub markers_file: String,
    pub vectors_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub top_k: usize,
    /// Artificial latency of the keyword strategy
    pub delay_ms: u64,
    pub fallback_lat: f64,
    pub fallback_lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub dimension: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            features: Features::default(),
            storage: StorageConfig::default(),
            recommend: RecommendConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            persistence: true,
            markdown: true,
            strategy: Strategy::Keyword,
            accept_suggestions: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".mapmark"),
            markers_file: "markers.json".to_string(),
            vectors_file: "vectors.json".to_string(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            delay_ms: 1000,
            fallback_lat: FALLBACK_LOCATION.0,
            fallback_lng: FALLBACK_LOCATION.1,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl StorageConfig {
    pub fn markers_path(&self) -> PathBuf {
        self.data_dir.join(&self.markers_file)
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.data_dir.join(&self.vectors_file)
    }
}

impl RecommendConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyword => f.write_str("keyword"),
            Self::Similarity => f.write_str("similarity"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Self::Keyword),
            "similarity" => Ok(Self::Similarity),
            other => bail!("Unknown strategy '{other}' (expected 'keyword' or 'similarity')"),
        }
    }
}

impl AppConfig {
    /// Resolve configuration: explicit file, then `./mapmark.toml`, then the
    /// user config dir, then defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        let user = dirs::config_dir()?.join("mapmark").join("config.toml");
        user.is_file().then_some(user)
    }

    /// Apply `MAPMARK_*` overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("MAPMARK_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(strategy) = lookup("MAPMARK_STRATEGY") {
            self.features.strategy = strategy.parse()?;
        }
        if let Some(mode) = lookup("MAPMARK_EMBEDDING_MODE") {
            self.embedding.mode = mode.parse()?;
        }
        if let Some(raw) = lookup("MAPMARK_PERSISTENCE") {
            self.features.persistence = parse_flag(&raw)
                .with_context(|| format!("Invalid MAPMARK_PERSISTENCE '{raw}'"))?;
        }
        if let Some(raw) = lookup("MAPMARK_DELAY_MS") {
            self.recommend.delay_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid MAPMARK_DELAY_MS '{raw}'"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_name_prefix.trim().is_empty() {
            bail!("default_name_prefix must not be empty");
        }
        if self.recommend.top_k == 0 {
            bail!("recommend.top_k must be > 0");
        }
        if self.embedding.dimension == 0 {
            bail!("embedding.dimension must be > 0");
        }
        if self.storage.markers_file.is_empty() || self.storage.vectors_file.is_empty() {
            bail!("storage file names must not be empty");
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
