//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification, the router,
//! and the request helpers shared by the handlers.

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::documents::{
    change_status_handler, delete_document_handler, document_audit_handler,
    generate_document_handler, generation_report_handler, get_document_handler,
    __path_change_status_handler, __path_delete_document_handler, __path_document_audit_handler,
    __path_generate_document_handler, __path_generation_report_handler,
    __path_get_document_handler,
};
use crate::web::protocol::{
    AuditHistoryResponse, DeletedResponse, DocumentResponse, GenerateDocumentBody,
    GenerationReportResponse, StatusChangeBody, SuggestionRequestBody, SuggestionsResponse,
};
use crate::web::state::AppState;
use crate::web::suggestions::{
    stream_suggestions_handler, suggest_handler, __path_stream_suggestions_handler,
    __path_suggest_handler,
};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Json, Path},
    http::HeaderMap,
    routing::{get, patch, post},
    Router,
};
use bytes::Bytes;
use draft_assist_core::ports::{FragmentStream, PortError};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use utoipa::OpenApi;

/// Header carrying the numeric id of the calling user.
pub const USER_ID_HEADER: &str = "x-user-id";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        suggest_handler,
        stream_suggestions_handler,
        generate_document_handler,
        get_document_handler,
        change_status_handler,
        delete_document_handler,
        document_audit_handler,
        generation_report_handler,
    ),
    components(
        schemas(
            SuggestionRequestBody,
            SuggestionsResponse,
            GenerateDocumentBody,
            StatusChangeBody,
            DocumentResponse,
            AuditHistoryResponse,
            GenerationReportResponse,
            DeletedResponse,
            ErrorEnvelope,
        )
    ),
    tags(
        (name = "Draft Assist API", description = "Streamed document generation and structured writing suggestions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API routes over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/suggestions", post(suggest_handler))
        .route("/suggestions/stream", post(stream_suggestions_handler))
        .route("/documents/generate", post(generate_document_handler))
        .route(
            "/documents/{id}",
            get(get_document_handler).delete(delete_document_handler),
        )
        .route("/documents/{id}/status", patch(change_status_handler))
        .route("/documents/{id}/audit", get(document_audit_handler))
        .route("/generations/{session_id}", get(generation_report_handler))
        .with_state(app_state)
}

//=========================================================================================
// Request Helpers
//=========================================================================================

/// Reads the numeric owner id from the `x-user-id` header.
pub fn user_id_from(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PortError::Validation(format!("{} header is required", USER_ID_HEADER)))?;
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(PortError::Validation(format!(
            "{} must be a positive number, got '{}'",
            USER_ID_HEADER, raw
        ))
        .into()),
    }
}

/// Unwraps a JSON body, reporting a malformed one through the error envelope.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| PortError::Validation(rejection.body_text()).into())
}

/// Unwraps a path parameter, reporting a malformed one through the error envelope.
pub fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| PortError::Validation(rejection.body_text()).into())
}

/// Adapts a fragment stream to a response body. A terminal error aborts the
/// body, so the caller sees a failed transfer instead of a clean end.
pub fn fragment_body(
    fragments: FragmentStream,
) -> impl Stream<Item = Result<Bytes, PortError>> + Send {
    fragments.map(|item| item.map(Bytes::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_id_header_must_be_a_positive_number() {
        let mut headers = HeaderMap::new();
        assert!(user_id_from(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("abc"));
        assert!(user_id_from(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("-4"));
        assert!(user_id_from(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(user_id_from(&headers).unwrap(), 42);
    }

    #[test]
    fn openapi_lists_every_route() {
        let spec = ApiDoc::openapi();
        for path in [
            "/suggestions",
            "/suggestions/stream",
            "/documents/generate",
            "/documents/{id}",
            "/documents/{id}/status",
            "/documents/{id}/audit",
            "/generations/{session_id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
