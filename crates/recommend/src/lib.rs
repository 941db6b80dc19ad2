//! Location recommendations for Mapmark.
//!
//! Two interchangeable [`Recommender`] strategies:
//! - [`KeywordRecommender`]: canned suggestions picked by keyword, anchored
//!   on the first existing marker
//! - [`SimilarityRecommender`]: embedding + nearest-neighbor lookup over
//!   previously indexed markers
//!
//! [`ChatSession`] wraps either one in a message transcript.

mod chat;
mod error;
mod keyword;
mod similarity;
mod types;

use async_trait::async_trait;
use mapmark_markers::Marker;

pub use chat::{ChatSession, GREETING};
pub use error::{RecommendError, Result};
pub use keyword::{
    KeywordRecommender, KeywordRule, DEFAULT_DELAY, FALLBACK_LOCATION, NO_MATCH_MESSAGE, RULES,
};
pub use similarity::{SimilarMarker, SimilarityRecommender, DEFAULT_TOP_K};
pub use types::{Candidate, ChatMessage, ChatRole, Recommendation};

/// Given a query and the current markers, produce a recommendation
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, query: &str, markers: &[Marker]) -> Result<Recommendation>;
}
