//! Query generator: prompt, one completion call, sanitized query line.

use std::time::Duration;

use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{ChatCompletion, ChatMessage, LlmRequestError};
use crate::orm::prompts::build_orm_prompt;
use crate::orm::sanitize::{check_structure, strip_code_fences};

/// Per-call knobs for `generate_orm`, taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    /// Hard deadline for the provider round trip.
    pub timeout: Duration,
    /// Reject output failing the structural check instead of passing it through.
    pub strict: bool,
}

impl From<&Config> for GenerationSettings {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.llm_timeout,
            strict: config.strict_orm_output,
        }
    }
}

/// Translates `query` into a single-line `CandidateProfile` query.
///
/// Exactly one completion request is issued and awaited under `settings.timeout`.
/// The reply is stripped of code fences and returned verbatim; off-contract
/// output is logged, and rejected only when `settings.strict` is set.
pub async fn generate_orm(
    query: &str,
    llm: &dyn ChatCompletion,
    settings: GenerationSettings,
) -> Result<String, AppError> {
    let span = info_span!("generate_orm", request_id = %Uuid::new_v4());

    async move {
        let prompt = build_orm_prompt(query);
        debug!(query = %query, prompt_chars = prompt.len(), "Built ORM prompt");

        let messages = [ChatMessage::user(prompt)];
        let raw = tokio::time::timeout(settings.timeout, llm.chat(&messages))
            .await
            .map_err(|_| LlmRequestError::Timeout)??;

        let orm = strip_code_fences(&raw);
        debug!(orm = %orm, "Sanitized LLM output");

        let report = check_structure(&orm);
        if !report.is_clean() {
            warn!(issues = %report, "Generated query failed structural check");
            if settings.strict {
                return Err(AppError::RejectedOutput(report));
            }
        }

        Ok(orm)
    }
    .instrument(span)
    .await
}
