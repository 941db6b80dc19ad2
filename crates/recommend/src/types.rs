use serde::{Deserialize, Serialize};

/// A suggested location, not yet a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
}

/// Matcher output: a message for the user plus zero or more candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub message: String,
    pub candidates: Vec<Candidate>,
}

impl Recommendation {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(message: impl Into<String>, candidate: Candidate) -> Self {
        Self {
            message: message.into(),
            candidates: vec![candidate],
        }
    }

    /// Best candidate, if any
    pub fn primary(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
