use crate::error::Result;
use crate::types::{ChatMessage, Recommendation};
use crate::Recommender;
use mapmark_markers::Marker;
use std::sync::Arc;

pub const GREETING: &str = "Hello! I can help you discover new interesting locations based on your existing markers. What kind of place are you looking for?";

/// Conversation transcript driving a [`Recommender`]
pub struct ChatSession {
    recommender: Arc<dyn Recommender>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(recommender: Arc<dyn Recommender>) -> Self {
        Self {
            recommender,
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user message.
    ///
    /// Blank input is ignored. On a recommender error the user message stays
    /// in the transcript and no assistant reply is added.
    pub async fn send(&mut self, input: &str, markers: &[Marker]) -> Result<Option<Recommendation>> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        self.messages.push(ChatMessage::user(input));
        let recommendation = self
            .recommender
            .recommend(input, markers)
            .await
            .inspect_err(|err| log::error!("Recommendation for {input:?} failed: {err}"))?;
        self.messages
            .push(ChatMessage::assistant(recommendation.message.clone()));
        Ok(Some(recommendation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommendError;
    use crate::keyword::{KeywordRecommender, NO_MATCH_MESSAGE};
    use crate::types::ChatRole;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct Unreachable;

    #[async_trait]
    impl Recommender for Unreachable {
        async fn recommend(&self, _query: &str, _markers: &[Marker]) -> Result<Recommendation> {
            Err(RecommendError::Other("network down".to_string()))
        }
    }

    #[tokio::test]
    async fn transcript_starts_with_greeting() {
        let session = ChatSession::new(Arc::new(KeywordRecommender::immediate()));
        assert_eq!(session.messages(), &[ChatMessage::assistant(GREETING)]);
    }

    #[tokio::test]
    async fn send_appends_user_and_assistant_messages() {
        let mut session = ChatSession::new(Arc::new(KeywordRecommender::immediate()));
        let rec = session.send("xyz", &[]).await.unwrap().expect("reply");

        assert!(rec.primary().is_none());
        let roles: Vec<ChatRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]);
        assert_eq!(session.messages()[2].content, NO_MATCH_MESSAGE);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut session = ChatSession::new(Arc::new(KeywordRecommender::immediate()));
        assert!(session.send("   ", &[]).await.unwrap().is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn failure_leaves_no_assistant_reply() {
        let mut session = ChatSession::new(Arc::new(Unreachable));
        assert!(session.send("food", &[]).await.is_err());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, ChatRole::User);
    }
}
