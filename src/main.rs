use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use bumi::config::AppConfig;
use bumi::db;
use bumi::services::ai::ollama::OllamaProvider;
use bumi::services::ai::openai::OpenAiProvider;
use bumi::services::ai::LlmProvider;
use bumi::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let llm: Box<dyn LlmProvider> = match config.llm.provider.as_str() {
        "ollama" => {
            tracing::info!(
                "using Ollama LLM provider (url: {}, model: {})",
                config.llm.ollama_url,
                config.llm.ollama_model
            );
            Box::new(OllamaProvider::new(&config.llm))
        }
        _ => {
            anyhow::ensure!(
                !config.llm.openai_api_key.is_empty(),
                "OPENAI_API_KEY must be set when LLM_PROVIDER=openai"
            );
            tracing::info!("using OpenAI LLM provider (model: {})", config.llm.openai_model);
            Box::new(OpenAiProvider::new(&config.llm))
        }
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        llm,
    });

    let app = bumi::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
