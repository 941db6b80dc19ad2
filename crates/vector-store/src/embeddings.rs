use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_DIMENSION: usize = 256;

/// Text → fixed-length vector provider
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Token-hashing bag of words; shared words give similar vectors
    #[default]
    Hashing,
    /// Whole-text hash; only identical texts are similar
    Stub,
}

impl EmbeddingMode {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Hashing => "hashing",
            Self::Stub => "stub",
        }
    }

    pub fn build(self, dimension: usize) -> Result<Arc<dyn Embedder>> {
        Ok(match self {
            Self::Hashing => Arc::new(HashingEmbedder::new(dimension)?),
            Self::Stub => Arc::new(StubEmbedder::new(dimension)?),
        })
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported embedding mode '{other}' (expected 'hashing' or 'stub')"
            ))),
        }
    }
}

/// Feature-hashing embedder over lower-cased alphanumeric tokens
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    /// Fails on a zero dimension
    pub fn new(dimension: usize) -> Result<Self> {
        ensure_nonzero(dimension)?;
        Ok(Self {
            dimension,
            model_id: format!("hashing-{dimension}"),
        })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let hash = fnv1a_64(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

/// Deterministic pseudo-random vector per distinct text
#[derive(Clone, Debug)]
pub struct StubEmbedder {
    dimension: usize,
    model_id: String,
}

impl StubEmbedder {
    /// Fails on a zero dimension
    pub fn new(dimension: usize) -> Result<Self> {
        ensure_nonzero(dimension)?;
        Ok(Self {
            dimension,
            model_id: format!("stub-{dimension}"),
        })
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(stub_embed(text, self.dimension))
    }
}

fn ensure_nonzero(dimension: usize) -> Result<()> {
    if dimension == 0 {
        return Err(VectorStoreError::EmbeddingError(
            "embedding dimension must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Cosine similarity; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_embeddings_are_deterministic_and_normalized() {
        let embedder = StubEmbedder::new(32).unwrap();
        let a = embedder.embed("Pier 17 seafood").await.unwrap();
        let b = embedder.embed("Pier 17 seafood").await.unwrap();
        let c = embedder.embed("Bryant Park").await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn hashing_embeddings_reward_shared_words() {
        let embedder = HashingEmbedder::new(DEFAULT_DIMENSION).unwrap();
        let query = embedder.embed("quiet park with trees").await.unwrap();
        let close = embedder.embed("Central Park trees").await.unwrap();
        let far = embedder.embed("late night pizza counter").await.unwrap();

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn hashing_is_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let a = embedder.embed("Food, FOOD!").await.unwrap();
        let b = embedder.embed("food food").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let embedder = HashingEmbedder::new(16).unwrap();
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("Stub".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Stub);
        assert_eq!(" hashing ".parse::<EmbeddingMode>().unwrap(), EmbeddingMode::Hashing);
        assert!("ada".parse::<EmbeddingMode>().is_err());
        assert!(EmbeddingMode::Hashing.build(0).is_err());
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            HashingEmbedder::new(0),
            Err(VectorStoreError::EmbeddingError(_))
        ));
        assert!(StubEmbedder::new(0).is_err());
        assert!(EmbeddingMode::Stub.build(0).is_err());
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
