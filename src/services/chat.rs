use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::decision::{FALLBACK_MESSAGE, FALLBACK_QUESTION};
use crate::models::{ChatRequest, ChatResponse, ValidatedDecision};
use crate::services::ai::invoker::ModelInvoker;
use crate::services::catalog::read_catalog;
use crate::services::decision::validate;
use crate::services::prompt::PromptCompiler;
use crate::services::recommendations::map_recommendations;
use crate::state::AppState;

pub async fn process_chat(
    state: &Arc<AppState>,
    request: ChatRequest,
) -> Result<ChatResponse, AppError> {
    let request_id = Uuid::new_v4();
    let catalog = {
        let db = state.db()?;
        read_catalog(&db)?
    };

    tracing::info!(
        %request_id,
        message = %request.message,
        history_turns = request.conversation_history.len(),
        has_image = request.image.is_some(),
        catalog_size = catalog.len(),
        "processing chat request"
    );

    let payload = PromptCompiler::new(state.config.prompts.clone()).compile(&catalog, &request);
    let decision = ModelInvoker::new(state.llm.as_ref(), &state.config.llm)
        .invoke(&payload)
        .await?;

    match validate(decision, &catalog) {
        ValidatedDecision::Clarify {
            message,
            clarification_question,
        } => Ok(ChatResponse::clarify(message, clarification_question)),
        ValidatedDecision::Recommend {
            message,
            service_ids,
        } => {
            let services = {
                let db = state.db()?;
                map_recommendations(
                    &db,
                    &catalog,
                    &service_ids,
                    Utc::now(),
                    state.config.reference_offset(),
                )?
            };

            if services.is_empty() {
                tracing::warn!(%request_id, "no recommendation survived mapping, asking to clarify");
                return Ok(ChatResponse::clarify(FALLBACK_MESSAGE, FALLBACK_QUESTION));
            }

            tracing::info!(%request_id, count = services.len(), "recommending services");
            Ok(ChatResponse::recommend(message, services))
        }
    }
}
