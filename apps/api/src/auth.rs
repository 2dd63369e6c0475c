//! Shared-secret authentication for the generation API.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "backend_secret";
/// Hyphenated spelling, accepted for clients behind proxies that drop underscored headers.
pub const SECRET_HEADER_ALT: &str = "backend-secret";

/// Extractor that succeeds only when the request carries the configured secret.
///
/// Runs on request parts, so it rejects before the body is read or any handler
/// logic executes.
#[derive(Debug, Clone, Copy)]
pub struct BackendSecret;

#[async_trait]
impl FromRequestParts<AppState> for BackendSecret {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        verify_secret(&parts.headers, &state.config.backend_secret)?;
        Ok(BackendSecret)
    }
}

pub fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    let supplied = headers
        .get(SECRET_HEADER)
        .or_else(|| headers.get(SECRET_HEADER_ALT))
        .map(|v| v.as_bytes());

    match supplied {
        Some(value) if !expected.is_empty() && constant_time_eq(value, expected.as_bytes()) => {
            Ok(())
        }
        Some(_) => {
            warn!("Rejected request with mismatched backend secret");
            Err(AppError::Unauthorized)
        }
        None => {
            warn!("Rejected request without backend secret header");
            Err(AppError::Unauthorized)
        }
    }
}

/// Equality whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
