//! Axum route handlers for the ORM generation API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::BackendSecret;
use crate::errors::AppError;
use crate::orm::generator::{generate_orm, GenerationSettings};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub orm: String,
}

/// POST /api/generate
///
/// Requires the `backend_secret` header. Returns the generated query line.
pub async fn handle_generate(
    _auth: BackendSecret,
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    if request.query.chars().count() > state.config.max_query_chars {
        return Err(AppError::Validation(format!(
            "query exceeds {} characters",
            state.config.max_query_chars
        )));
    }

    let orm = generate_orm(
        &request.query,
        state.llm.as_ref(),
        GenerationSettings::from(&state.config),
    )
    .await?;

    Ok(Json(QueryResponse { orm }))
}
