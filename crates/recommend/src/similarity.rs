use crate::error::{RecommendError, Result};
use crate::types::{Candidate, Recommendation};
use crate::Recommender;
use async_trait::async_trait;
use mapmark_markers::{Marker, MarkerId};
use mapmark_vector_store::{Embedder, Metadata, QueryMatch, VectorIndex, VectorRecord};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 5;

/// A candidate found by vector search, with its index id and score
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMarker {
    pub id: String,
    pub score: f32,
    pub candidate: Candidate,
}

/// Recommends markers whose text embeds close to the query.
///
/// Embedding and nearest-neighbor search are delegated to the injected
/// collaborators; errors from either propagate to the caller.
pub struct SimilarityRecommender {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl SimilarityRecommender {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Embed `"{name} {description}"` and upsert it under the marker id
    pub async fn index_marker(&self, marker: &Marker) -> Result<()> {
        let values = self.embedder.embed(&marker.embedding_text()).await?;
        self.index
            .upsert(vec![VectorRecord {
                id: marker.id.to_string(),
                values,
                metadata: marker_metadata(marker),
            }])
            .await?;
        log::debug!("Indexed marker {} with {}", marker.id, self.embedder.model_id());
        Ok(())
    }

    /// Re-embed every marker in one batch
    pub async fn index_all(&self, markers: &[Marker]) -> Result<usize> {
        if markers.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = markers.iter().map(Marker::embedding_text).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let records = markers
            .iter()
            .zip(vectors)
            .map(|(marker, values)| VectorRecord {
                id: marker.id.to_string(),
                values,
                metadata: marker_metadata(marker),
            })
            .collect();
        self.index.upsert(records).await?;
        log::info!("Indexed {} markers", markers.len());
        Ok(markers.len())
    }

    pub async fn forget_marker(&self, id: &MarkerId) -> Result<()> {
        self.index.delete(&[id.to_string()]).await?;
        Ok(())
    }

    /// Delete index records whose id is not among `markers`
    pub async fn prune_stale(&self, markers: &[Marker]) -> Result<usize> {
        let live = live_ids(markers);
        let stale: Vec<String> = self
            .index
            .ids()
            .await?
            .into_iter()
            .filter(|id| !live.contains(id))
            .collect();
        if !stale.is_empty() {
            self.index.delete(&stale).await?;
            log::info!("Pruned {} stale vectors", stale.len());
        }
        Ok(stale.len())
    }

    /// Markers similar to `marker`, excluding the marker itself.
    ///
    /// Only ids present in `markers` are returned.
    pub async fn similar_to(&self, marker: &Marker, markers: &[Marker]) -> Result<Vec<SimilarMarker>> {
        let vector = self.embedder.embed(&marker.embedding_text()).await?;
        let mut live = live_ids(markers);
        live.remove(marker.id.as_str());
        self.nearest_live(&vector, &live).await
    }

    /// Markers similar to free text, restricted to ids present in `markers`
    pub async fn search(&self, query: &str, markers: &[Marker]) -> Result<Vec<SimilarMarker>> {
        if query.trim().is_empty() {
            return Err(RecommendError::EmptyQuery);
        }
        let vector = self.embedder.embed(query).await?;
        self.nearest_live(&vector, &live_ids(markers)).await
    }

    async fn nearest_live(&self, vector: &[f32], live: &HashSet<String>) -> Result<Vec<SimilarMarker>> {
        // Over-fetch by the number of records that cannot be live
        let indexed = self.index.len().await?;
        let limit = self.top_k + indexed.saturating_sub(live.len());
        let matches = self.index.query(vector, limit).await?;

        let (kept, dropped): (Vec<_>, Vec<_>) =
            matches.into_iter().partition(|m| live.contains(&m.id));
        if !dropped.is_empty() {
            log::debug!("Ignoring {} vectors without a live marker", dropped.len());
        }
        let mut similar = to_similar(kept);
        similar.truncate(self.top_k);
        Ok(similar)
    }
}

fn live_ids(markers: &[Marker]) -> HashSet<String> {
    markers.iter().map(|m| m.id.to_string()).collect()
}

#[async_trait]
impl Recommender for SimilarityRecommender {
    async fn recommend(&self, query: &str, markers: &[Marker]) -> Result<Recommendation> {
        let similar = self.search(query, markers).await?;
        let message = match similar.first() {
            Some(best) => format!(
                "Found {} similar location(s); closest is '{}'.",
                similar.len(),
                best.candidate.name
            ),
            None => "No similar locations found yet. Add a few markers first.".to_string(),
        };
        Ok(Recommendation {
            message,
            candidates: similar.into_iter().map(|s| s.candidate).collect(),
        })
    }
}

fn marker_metadata(marker: &Marker) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("name".to_string(), json!(marker.name));
    metadata.insert("description".to_string(), json!(marker.description));
    metadata.insert("lat".to_string(), json!(marker.lat));
    metadata.insert("lng".to_string(), json!(marker.lng));
    metadata
}

fn candidate_from_metadata(metadata: &Metadata) -> Option<Candidate> {
    Some(Candidate {
        lat: metadata.get("lat")?.as_f64()?,
        lng: metadata.get("lng")?.as_f64()?,
        name: metadata.get("name")?.as_str()?.to_string(),
        description: metadata
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

fn to_similar(matches: impl IntoIterator<Item = QueryMatch>) -> Vec<SimilarMarker> {
    matches
        .into_iter()
        .filter_map(|m| match candidate_from_metadata(&m.metadata) {
            Some(candidate) => Some(SimilarMarker {
                id: m.id,
                score: m.score,
                candidate,
            }),
            None => {
                log::debug!("Skipping match {} without marker metadata", m.id);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapmark_markers::NewMarker;
    use mapmark_vector_store::{
        HashingEmbedder, MemoryVectorIndex, Result as VectorResult, VectorStoreError,
    };
    use pretty_assertions::assert_eq;

    fn marker(id: u64, name: &str, description: &str) -> Marker {
        NewMarker::new(40.0 + id as f64, -74.0, name, description).into_marker(MarkerId::from(id), 0)
    }

    fn recommender() -> (SimilarityRecommender, Arc<MemoryVectorIndex>) {
        let index = Arc::new(MemoryVectorIndex::new(128));
        let rec = SimilarityRecommender::new(Arc::new(HashingEmbedder::new(128).unwrap()), index.clone());
        (rec, index)
    }

    struct OfflineEmbedder;

    #[async_trait]
    impl Embedder for OfflineEmbedder {
        fn dimension(&self) -> usize {
            128
        }

        fn model_id(&self) -> &str {
            "offline"
        }

        async fn embed(&self, _text: &str) -> VectorResult<Vec<f32>> {
            Err(VectorStoreError::EmbeddingError("quota exceeded".to_string()))
        }
    }

    #[tokio::test]
    async fn index_then_find_similar_excluding_self() {
        let (rec, index) = recommender();
        let park = marker(1, "Bryant Park", "lawn trees and chess tables");
        let other_park = marker(2, "Washington Square Park", "arch fountain trees");
        let pizza = marker(3, "Joe's Pizza", "late night slices");
        let markers = [park.clone(), other_park.clone(), pizza];
        rec.index_all(&markers).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 3);

        let similar = rec.similar_to(&park, &markers).await.unwrap();
        assert!(similar.iter().all(|s| s.id != "1"));
        assert_eq!(similar[0].id, "2");
        assert_eq!(similar[0].candidate.name, other_park.name);
        assert_eq!(similar[0].candidate.lat, other_park.lat);
    }

    #[tokio::test]
    async fn top_k_caps_results() {
        let (rec, _) = recommender();
        let rec = rec.with_top_k(2);
        let markers: Vec<Marker> = (1..=6)
            .map(|i| marker(i, &format!("Cafe {i}"), "coffee"))
            .collect();
        rec.index_all(&markers).await.unwrap();
        assert_eq!(rec.search("coffee", &markers).await.unwrap().len(), 2);
        assert_eq!(rec.similar_to(&markers[0], &markers).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn similar_to_returns_full_k_without_self() {
        let (rec, _) = recommender();
        let rec = rec.with_top_k(3);
        // Identical text: the source marker ties with every neighbor
        let markers: Vec<Marker> = (1..=6).map(|i| marker(i, "Espresso bar", "coffee")).collect();
        rec.index_all(&markers).await.unwrap();

        let similar = rec.similar_to(&markers[0], &markers).await.unwrap();
        assert_eq!(similar.len(), 3);
        assert!(similar.iter().all(|s| s.id != "1"));
    }

    #[tokio::test]
    async fn vectors_of_removed_markers_are_ignored() {
        let (rec, index) = recommender();
        let park = marker(1, "Bryant Park", "trees lawn");
        let gone = marker(2, "Central Park", "trees lake");
        let other = marker(3, "Prospect Park", "trees meadow");
        rec.index_all(&[park.clone(), gone, other.clone()]).await.unwrap();

        let live = [park.clone(), other];
        let similar = rec.similar_to(&park, &live).await.unwrap();
        assert_eq!(similar.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["3"]);

        let found = rec.search("trees lake", &live).await.unwrap();
        assert!(found.iter().all(|s| s.id != "2"));
        assert_eq!(index.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn prune_stale_deletes_unknown_ids() {
        let (rec, index) = recommender();
        let keep = marker(1, "Pier", "boats");
        rec.index_all(&[keep.clone(), marker(2, "Ferry", "boats")]).await.unwrap();

        assert_eq!(rec.prune_stale(&[keep.clone()]).await.unwrap(), 1);
        assert_eq!(index.ids().await.unwrap(), vec!["1".to_string()]);
        assert_eq!(rec.prune_stale(&[keep]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn forget_removes_from_index() {
        let (rec, index) = recommender();
        let m = marker(1, "Pier", "boats");
        rec.index_marker(&m).await.unwrap();
        rec.forget_marker(&m.id).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recommend_maps_matches_to_candidates() {
        let (rec, _) = recommender();
        let park = marker(1, "Bryant Park", "trees");
        rec.index_marker(&park).await.unwrap();

        let result = rec.recommend("park trees", &[park]).await.unwrap();
        assert_eq!(result.primary().map(|c| c.name.as_str()), Some("Bryant Park"));
        assert!(result.message.contains("Bryant Park"));
    }

    #[tokio::test]
    async fn foreign_records_are_skipped() {
        let (rec, index) = recommender();
        index
            .upsert(vec![VectorRecord {
                id: "1".to_string(),
                values: HashingEmbedder::new(128).unwrap().embed("park").await.unwrap(),
                metadata: Metadata::new(),
            }])
            .await
            .unwrap();

        let result = rec.recommend("park", &[marker(1, "Park", "")]).await.unwrap();
        assert!(result.candidates.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let (rec, _) = recommender();
        assert!(matches!(rec.search("  ", &[]).await, Err(RecommendError::EmptyQuery)));
    }

    #[tokio::test]
    async fn embedder_failure_propagates() {
        let rec = SimilarityRecommender::new(
            Arc::new(OfflineEmbedder),
            Arc::new(MemoryVectorIndex::new(128)),
        );
        let result = rec.index_marker(&marker(1, "Pier", "")).await;
        assert!(matches!(result, Err(RecommendError::VectorStoreError(_))));
    }
}
