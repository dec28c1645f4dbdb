use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed exchange supplied by the client; the server keeps no history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub bumi: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    /// Base64-encoded image bytes.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatAction {
    Recommend,
    Clarify,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecommendation {
    pub id: String,
    pub name: String,
    pub provider_name: String,
    pub provider_id: String,
    pub price: f64,
    pub rating: f64,
    pub description: String,
    pub category: String,
    pub duration: i32,
    /// Heuristic estimate, not a reserved slot.
    pub estimated_next_available_time: DateTime<Utc>,
    pub available_time_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub action: ChatAction,
    pub ai_message: String,
    pub services: Vec<ServiceRecommendation>,
    pub clarification_question: Option<String>,
}

impl ChatResponse {
    pub fn clarify(ai_message: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            action: ChatAction::Clarify,
            ai_message: ai_message.into(),
            services: vec![],
            clarification_question: Some(question.into()),
        }
    }

    pub fn recommend(ai_message: impl Into<String>, services: Vec<ServiceRecommendation>) -> Self {
        Self {
            action: ChatAction::Recommend,
            ai_message: ai_message.into(),
            services,
            clarification_question: None,
        }
    }
}
