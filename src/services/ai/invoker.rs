use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{Map, Value};

use super::LlmProvider;
use crate::config::LlmConfig;
use crate::errors::AppError;
use crate::models::ModelDecision;
use crate::services::prompt::PromptPayload;

static SERVICE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("valid regex"));

/// Prefixes some models prepend to ids they copy out of the catalog.
const VENDOR_PREFIXES: &[&str] = &["svc_", "svc-", "service_", "service-", "id:"];

const DEFAULT_RECOMMEND_MESSAGE: &str = "Woof! I dug up some services that should help!";

/// Runs a compiled prompt against the model with a bounded wait.
pub struct ModelInvoker<'a> {
    llm: &'a dyn LlmProvider,
    timeout: Duration,
}

impl<'a> ModelInvoker<'a> {
    pub fn new(llm: &'a dyn LlmProvider, config: &LlmConfig) -> Self {
        Self::with_timeout(llm, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(llm: &'a dyn LlmProvider, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Raw model text. Transport failures and timeouts are `ModelUnavailable`.
    pub async fn complete(&self, payload: &PromptPayload) -> Result<String, AppError> {
        let call = self.llm.chat(&payload.system, &payload.messages);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => {
                tracing::debug!(raw = %raw, "model output");
                Ok(raw)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "model call failed");
                Err(AppError::model(e))
            }
            Err(_) => {
                tracing::error!(timeout_secs = self.timeout.as_secs_f64(), "model call timed out");
                Err(AppError::model(format!(
                    "no response within {:.1}s",
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }

    /// The only error this returns is `ModelUnavailable`; any text the model
    /// produces is turned into a decision.
    pub async fn invoke(&self, payload: &PromptPayload) -> Result<ModelDecision, AppError> {
        let raw = self.complete(payload).await?;
        Ok(parse_decision(&raw))
    }
}

/// Recovers a JSON object from model text: the whole text, the text inside a
/// markdown fence, or the first balanced `{...}` span.
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(trimmed) {
        return Some(obj);
    }

    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(cleaned) {
        return Some(obj);
    }

    let span = first_object_span(cleaned)?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Total: unparseable output becomes the canned clarification, never a
/// recommendation.
pub fn parse_decision(raw: &str) -> ModelDecision {
    match extract_json_object(raw) {
        Some(obj) => decision_from_object(&obj),
        None => {
            tracing::warn!("model output is not JSON, falling back to clarification");
            ModelDecision::fallback()
        }
    }
}

fn decision_from_object(obj: &Map<String, Value>) -> ModelDecision {
    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_else(|| "recommend".to_string());

    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    match action.as_str() {
        "recommend" => {
            let raw_ids: Vec<String> = obj
                .get("service_ids")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| match id {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            other => {
                                tracing::warn!(id = %other, "discarding non-scalar service id");
                                None
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();

            ModelDecision::Recommend {
                message: message.unwrap_or_else(|| DEFAULT_RECOMMEND_MESSAGE.to_string()),
                service_ids: normalize_service_ids(raw_ids),
            }
        }
        "clarify" => {
            let question = obj
                .get("clarification_question")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string);

            match message {
                Some(message) => ModelDecision::Clarify {
                    message,
                    clarification_question: question,
                },
                None => ModelDecision::fallback(),
            }
        }
        other => {
            tracing::warn!(action = other, "unknown model action, falling back to clarification");
            ModelDecision::fallback()
        }
    }
}

/// The id with one known vendor prefix removed, or unchanged.
pub fn strip_vendor_prefix(id: &str) -> &str {
    let lowered = id.to_ascii_lowercase();
    VENDOR_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
        .map(|prefix| &id[prefix.len()..])
        .unwrap_or(id)
}

/// Trims ids, drops those that are malformed both as given and without a
/// vendor prefix, de-duplicates keeping first occurrence. Prefixes are kept:
/// grounding against the catalog decides which form names a service.
pub fn normalize_service_ids(raw_ids: Vec<String>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(raw_ids.len());

    for raw in raw_ids {
        let trimmed = raw.trim();
        if !SERVICE_ID_RE.is_match(trimmed) && !SERVICE_ID_RE.is_match(strip_vendor_prefix(trimmed)) {
            tracing::warn!(service_id = %raw, "discarding malformed service id");
            continue;
        }
        if ids.iter().any(|existing| existing == trimmed) {
            continue;
        }
        ids.push(trimmed.to_string());
    }

    ids
}
