//! services/api/src/web/suggestions.rs
//!
//! Handlers for structured suggestions, in whole-response and streamed form.

use crate::error::ApiError;
use crate::web::protocol::{SuggestionRequestBody, SuggestionsResponse};
use crate::web::rest::{fragment_body, json_body};
use crate::web::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

/// Get structured improvement suggestions for a section of text.
///
/// Identical requests within the cache TTL are answered from the cache and
/// flagged with `metadata.cached = true`.
#[utoipa::path(
    post,
    path = "/suggestions",
    request_body = SuggestionRequestBody,
    responses(
        (status = 200, description = "Suggestions generated", body = SuggestionsResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorEnvelope),
        (status = 429, description = "Upstream rate limit", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Upstream quota exhausted or unavailable", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn suggest_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<SuggestionRequestBody>, JsonRejection>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let request = json_body(body)?.into_request()?;
    let response = app_state.suggestions.suggest(request).await?;
    Ok(Json(SuggestionsResponse {
        success: true,
        suggestions: response.suggestions,
        metadata: response.metadata,
    }))
}

/// Stream the raw model output for a suggestion request as it is produced.
#[utoipa::path(
    post,
    path = "/suggestions/stream",
    request_body = SuggestionRequestBody,
    responses(
        (status = 200, description = "Raw text fragments", body = String, content_type = "text/plain"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn stream_suggestions_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<SuggestionRequestBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(body)?.into_request()?;
    let fragments = app_state.suggestions.stream(request).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragment_body(fragments)),
    )
        .into_response())
}
