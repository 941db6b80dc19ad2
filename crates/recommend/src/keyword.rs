use crate::error::Result;
use crate::types::{Candidate, Recommendation};
use crate::Recommender;
use async_trait::async_trait;
use mapmark_markers::Marker;
use std::time::Duration;

/// Coordinate used when there is no marker to anchor a suggestion
pub const FALLBACK_LOCATION: (f64, f64) = (40.7128, -74.0060);

/// Delay before answering, mimicking model latency
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

pub const NO_MATCH_MESSAGE: &str = "I'm sorry, I couldn't find a specific recommendation based on your query. Could you provide more details about what you're looking for?";

/// One topic: any keyword hit yields the fixed suggestion
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    /// Added to both coordinates of the anchor marker
    pub offset: f64,
    pub name: &'static str,
    pub description: &'static str,
    pub message: &'static str,
}

/// Rules in priority order; the first rule with a hit wins
pub const RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["restaurant", "food"],
        offset: 0.01,
        name: "The Culinary Corner",
        description: "A fusion restaurant combining flavors from various cuisines.",
        message: "Based on your interests, I recommend trying 'The Culinary Corner'. It's a fusion restaurant that combines flavors from your existing markers.",
    },
    KeywordRule {
        keywords: &["park", "nature"],
        offset: -0.01,
        name: "Greenview Park",
        description: "A serene park with walking trails and picnic areas.",
        message: "How about visiting 'Greenview Park'? It's a beautiful green space not far from your marked locations.",
    },
];

/// Canned keyword matcher standing in for a chat model
#[derive(Debug, Clone)]
pub struct KeywordRecommender {
    delay: Duration,
    fallback: (f64, f64),
}

impl Default for KeywordRecommender {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl KeywordRecommender {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fallback: FALLBACK_LOCATION,
        }
    }

    /// No artificial latency
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub fn with_fallback(mut self, lat: f64, lng: f64) -> Self {
        self.fallback = (lat, lng);
        self
    }

    /// Pure matching step, without the delay
    pub fn suggest(&self, query: &str, markers: &[Marker]) -> Recommendation {
        let keywords: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let hit = |rule: &KeywordRule| {
            rule.keywords
                .iter()
                .any(|kw| keywords.iter().any(|token| token == kw))
        };

        let Some(rule) = RULES.iter().find(|rule| hit(*rule)) else {
            log::debug!("No keyword rule matched {query:?}");
            return Recommendation::message_only(NO_MATCH_MESSAGE);
        };

        let (lat, lng) = match markers.first() {
            Some(anchor) => (anchor.lat + rule.offset, anchor.lng + rule.offset),
            None => self.fallback,
        };
        log::debug!("Keyword rule {:?} matched {query:?}", rule.name);

        Recommendation::with_candidate(
            rule.message,
            Candidate {
                lat,
                lng,
                name: rule.name.to_string(),
                description: rule.description.to_string(),
            },
        )
    }
}

#[async_trait]
impl Recommender for KeywordRecommender {
    async fn recommend(&self, query: &str, markers: &[Marker]) -> Result<Recommendation> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.suggest(query, markers))
    }
}
