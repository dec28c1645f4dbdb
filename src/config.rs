use std::env;

use chrono::{Offset, Utc};

use crate::services::prompt::{BOOKING_ACTION_POLICY, CHAT_POLICY_FOOTER, CHAT_POLICY_HEADER};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub llm: LlmConfig,
    pub prompts: PromptConfig,
    /// Offset used to resolve relative dates ("tomorrow") and to label availability.
    pub reference_utc_offset_minutes: i32,
    /// Request body cap, which bounds image uploads.
    pub max_upload_bytes: usize,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Static policy text handed to the prompt compiler. Immutable once built.
#[derive(Clone, Debug)]
pub struct PromptConfig {
    pub chat_header: String,
    pub chat_footer: String,
    pub booking_policy: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chat_header: CHAT_POLICY_HEADER.to_string(),
            chat_footer: CHAT_POLICY_FOOTER.to_string(),
            booking_policy: BOOKING_ACTION_POLICY.to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4.1-nano".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = LlmConfig::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "bumi.db".to_string()),
            llm: LlmConfig {
                provider: env::var("LLM_PROVIDER")
                    .map(|v| v.to_lowercase())
                    .unwrap_or(defaults.provider),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
                openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
                temperature: env::var("LLM_TEMPERATURE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.temperature),
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_tokens),
                timeout_secs: env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.timeout_secs),
            },
            prompts: PromptConfig::default(),
            reference_utc_offset_minutes: env::var("REFERENCE_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    /// Fixed reference timezone; out-of-range offsets fall back to UTC.
    pub fn reference_offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.reference_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}
