use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::ai::LlmProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
}

impl AppState {
    /// Locks the connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::storage("database lock poisoned"))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rusqlite::Connection;

    use super::AppState;
    use crate::config::{AppConfig, LlmConfig, PromptConfig, DEFAULT_MAX_UPLOAD_BYTES};
    use crate::services::ai::{LlmProvider, Message};

    /// Replies with a fixed string and records every system prompt it sees.
    pub struct ScriptedLlm {
        pub reply: String,
        pub prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, system_prompt: &str, _messages: &[Message]) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(system_prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    pub fn config() -> AppConfig {
        AppConfig {
            port: 0,
            database_url: ":memory:".to_string(),
            llm: LlmConfig::default(),
            prompts: PromptConfig::default(),
            reference_utc_offset_minutes: 0,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn state(conn: Connection, reply: &str) -> (Arc<AppState>, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(vec![]));
        let llm = ScriptedLlm {
            reply: reply.to_string(),
            prompts: prompts.clone(),
        };
        let state = Arc::new(AppState {
            db: Arc::new(Mutex::new(conn)),
            config: config(),
            llm: Box::new(llm),
        });
        (state, prompts)
    }
}
