use serde::Serialize;

pub const FALLBACK_MESSAGE: &str =
    "Ruff! I couldn't find a matching service, but I'd love to help!";
pub const FALLBACK_QUESTION: &str = "Can you tell me more about what kind of help you need?";

/// The model's recommend/clarify output after parsing, before grounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ModelDecision {
    Recommend {
        message: String,
        service_ids: Vec<String>,
    },
    Clarify {
        message: String,
        clarification_question: Option<String>,
    },
}

impl ModelDecision {
    /// Canned clarification used whenever the model output cannot be trusted.
    pub fn fallback() -> Self {
        ModelDecision::Clarify {
            message: FALLBACK_MESSAGE.to_string(),
            clarification_question: Some(FALLBACK_QUESTION.to_string()),
        }
    }
}

/// A decision whose ids are grounded in the catalog snapshot.
///
/// `Recommend` always carries between one and three ids; `Clarify` always
/// carries a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ValidatedDecision {
    Recommend {
        message: String,
        service_ids: Vec<String>,
    },
    Clarify {
        message: String,
        clarification_question: String,
    },
}

impl ValidatedDecision {
    pub fn fallback() -> Self {
        ValidatedDecision::Clarify {
            message: FALLBACK_MESSAGE.to_string(),
            clarification_question: FALLBACK_QUESTION.to_string(),
        }
    }
}
