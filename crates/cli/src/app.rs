use crate::config::{AppConfig, Features, Strategy};
use anyhow::{anyhow, bail, Result};
use mapmark_markers::{read_image_markdown, JsonFileTable, Marker, MarkerId, MarkerStore, MarkerTable};
use mapmark_recommend::{
    ChatSession, KeywordRecommender, Recommendation, Recommender, SimilarMarker,
    SimilarityRecommender,
};
use mapmark_vector_store::{Embedder, MemoryVectorIndex, VectorIndex};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Explicitly constructed collaborator handles.
///
/// `None` means the collaborator is not configured (or failed to start) and
/// the corresponding feature is inert.
#[derive(Default, Clone)]
pub struct Collaborators {
    pub table: Option<Arc<dyn MarkerTable>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub index: Option<Arc<dyn VectorIndex>>,
}

impl Collaborators {
    /// Build collaborators from config. Startup failures are logged and the
    /// affected collaborator is left out.
    pub async fn from_config(config: &AppConfig) -> Self {
        let mut collaborators = Self::default();

        if config.features.persistence {
            let path = config.storage.markers_path();
            match JsonFileTable::open(&path).await {
                Ok(table) => collaborators.table = Some(Arc::new(table)),
                Err(err) => log::error!(
                    "Marker table {} unavailable, continuing without persistence: {err}",
                    path.display()
                ),
            }
        }

        if config.features.strategy == Strategy::Similarity {
            match config.embedding.mode.build(config.embedding.dimension) {
                Ok(embedder) => collaborators.embedder = Some(embedder),
                Err(err) => log::error!("Embedding provider unavailable: {err}"),
            }

            let dimension = config.embedding.dimension;
            let index = if config.features.persistence {
                let path = config.storage.vectors_path();
                MemoryVectorIndex::open(&path, dimension)
                    .await
                    .inspect_err(|err| {
                        log::error!("Vector index {} unavailable: {err}", path.display());
                    })
                    .ok()
            } else {
                Some(MemoryVectorIndex::new(dimension))
            };
            collaborators.index = index.map(|i| Arc::new(i) as Arc<dyn VectorIndex>);
        }

        collaborators
    }
}

/// Marker fields as entered by the user, before defaults are applied
#[derive(Debug, Clone, Default)]
pub struct MarkerDraft {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub recommendation: Recommendation,
    /// Suggestion turned into a marker, when auto-accept is on
    pub added: Option<Marker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: usize,
    pub pruned: usize,
}

/// One configured instance of the map annotator
pub struct MapApp {
    store: MarkerStore,
    features: Features,
    recommender: Arc<dyn Recommender>,
    similarity: Option<Arc<SimilarityRecommender>>,
}

impl MapApp {
    pub async fn init(config: &AppConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(config).await;
        Self::with_collaborators(config, collaborators).await
    }

    pub async fn with_collaborators(config: &AppConfig, collaborators: Collaborators) -> Result<Self> {
        let store = match collaborators.table {
            Some(table) => MarkerStore::with_table(table),
            None => MarkerStore::new(),
        }
        .with_name_prefix(config.default_name_prefix.clone());
        if config.features.persistence && !store.is_persistent() {
            log::warn!("Persistence requested but no marker table is available");
        }

        let similarity = match (config.features.strategy, collaborators.embedder, collaborators.index) {
            (Strategy::Similarity, Some(embedder), Some(index)) => Some(Arc::new(
                SimilarityRecommender::new(embedder, index).with_top_k(config.recommend.top_k),
            )),
            (Strategy::Similarity, _, _) => {
                log::warn!("Similarity search unavailable, falling back to keyword matching");
                None
            }
            (Strategy::Keyword, _, _) => None,
        };

        let recommender: Arc<dyn Recommender> = match &similarity {
            Some(similarity) => similarity.clone() as Arc<dyn Recommender>,
            None => Arc::new(
                KeywordRecommender::new(config.recommend.delay())
                    .with_fallback(config.recommend.fallback_lat, config.recommend.fallback_lng),
            ) as Arc<dyn Recommender>,
        };

        let mut app = Self {
            store,
            features: config.features,
            recommender,
            similarity,
        };
        app.store.load().await?;
        Ok(app)
    }

    pub fn markers(&self) -> &[Marker] {
        self.store.list()
    }

    pub fn has_similarity(&self) -> bool {
        self.similarity.is_some()
    }

    pub fn chat_session(&self) -> ChatSession {
        ChatSession::new(self.recommender.clone())
    }

    /// Add a marker, embedding any images and indexing it for similarity
    /// search. Index failures are logged; the marker stays added.
    pub async fn add_marker(&mut self, draft: MarkerDraft) -> Result<Marker> {
        let mut description = draft.description;
        if !draft.images.is_empty() {
            if !self.features.markdown {
                bail!("Images need the markdown feature enabled");
            }
            for path in &draft.images {
                description.push_str(&read_image_markdown(path).await?);
            }
        }

        let marker = self
            .store
            .add(draft.lat, draft.lng, draft.name, description)
            .await?;

        if let Some(similarity) = &self.similarity {
            match similarity.index_marker(&marker).await {
                Ok(()) => log::info!("Marker {} stored in vector index", marker.id),
                Err(err) => log::error!("Error indexing marker {}: {err}", marker.id),
            }
        }
        Ok(marker)
    }

    pub async fn remove_marker(&mut self, id: &MarkerId) -> Result<Option<Marker>> {
        let removed = self.store.remove(id).await?;
        if removed.is_some() {
            if let Some(similarity) = &self.similarity {
                if let Err(err) = similarity.forget_marker(id).await {
                    log::error!("Error removing marker {id} from vector index: {err}");
                }
            }
        }
        Ok(removed)
    }

    pub async fn similar(&self, id: &MarkerId) -> Result<Vec<SimilarMarker>> {
        let similarity = self
            .similarity
            .as_ref()
            .ok_or_else(|| anyhow!("Similarity search is not enabled (strategy = \"similarity\")"))?;
        let marker = self
            .store
            .get(id)
            .ok_or_else(|| anyhow!("No marker with id {id}"))?;
        Ok(similarity.similar_to(marker, self.store.list()).await?)
    }

    /// Re-embed every marker and drop vectors of markers that no longer exist
    pub async fn reindex(&self) -> Result<ReindexReport> {
        let similarity = self
            .similarity
            .as_ref()
            .ok_or_else(|| anyhow!("Similarity search is not enabled (strategy = \"similarity\")"))?;
        let markers = self.store.list();
        let pruned = similarity.prune_stale(markers).await?;
        let indexed = similarity.index_all(markers).await?;
        Ok(ReindexReport { indexed, pruned })
    }

    pub async fn ask(&mut self, query: &str) -> Result<AskOutcome> {
        let recommendation = self.recommender.recommend(query, self.store.list()).await?;
        self.finish_recommendation(recommendation).await
    }

    /// One chat turn; `None` for blank input
    pub async fn chat_turn(&mut self, session: &mut ChatSession, input: &str) -> Result<Option<AskOutcome>> {
        match session.send(input, self.store.list()).await? {
            Some(recommendation) => Ok(Some(self.finish_recommendation(recommendation).await?)),
            None => Ok(None),
        }
    }

    async fn finish_recommendation(&mut self, recommendation: Recommendation) -> Result<AskOutcome> {
        // Similarity hits are existing markers; only keyword suggestions are new places
        let accept = self.features.accept_suggestions && self.similarity.is_none();
        let added = match recommendation.primary() {
            Some(candidate) if accept => {
                let draft = MarkerDraft {
                    lat: candidate.lat,
                    lng: candidate.lng,
                    name: candidate.name.clone(),
                    description: candidate.description.clone(),
                    images: Vec::new(),
                };
                Some(self.add_marker(draft).await?)
            }
            _ => None,
        };
        Ok(AskOutcome {
            recommendation,
            added,
        })
    }
}
