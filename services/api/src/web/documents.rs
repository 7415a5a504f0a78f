//! services/api/src/web/documents.rs
//!
//! Handlers for generated documents, their audit history, and the state of
//! in-flight generations.

use crate::error::{ApiError, ErrorEnvelope};
use crate::web::protocol::{
    AuditHistoryResponse, DeletedResponse, DocumentResponse, GenerateDocumentBody,
    GenerationReportResponse, StatusChangeBody,
};
use crate::web::rest::{fragment_body, json_body, path_param, user_id_from};
use crate::web::state::AppState;
use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use draft_assist_core::domain::DocumentStatus;
use draft_assist_core::prompt::document_prompt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const DOCUMENT_ID_HEADER: &str = "x-document-id";
pub const GENERATION_SESSION_HEADER: &str = "x-generation-session";

/// Generate a new document, streaming its text as it is produced.
///
/// A placeholder record is created before generation starts. Its id and the
/// generation session id are returned as response headers, so the record and
/// the session can be inspected even if the stream fails.
#[utoipa::path(
    post,
    path = "/documents/generate",
    request_body = GenerateDocumentBody,
    responses(
        (status = 200, description = "Generated text, streamed", body = String, content_type = "text/plain",
            headers(
                ("x-document-id" = i64, description = "Id of the placeholder record"),
                ("x-generation-session" = Uuid, description = "Id of the generation session")
            )
        ),
        (status = 400, description = "Invalid request", body = ErrorEnvelope),
        (status = 429, description = "Upstream rate limit", body = ErrorEnvelope),
        (status = 503, description = "Upstream quota exhausted or unavailable", body = ErrorEnvelope)
    ),
    params(
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn generate_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<GenerateDocumentBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = user_id_from(&headers)?;
    let draft = json_body(body)?.into_draft(user_id);
    let prompt = document_prompt(&draft);

    let handle = app_state.generations.start(draft, &prompt).await?;
    info!(
        session_id = %handle.session_id,
        record_id = handle.record_id,
        "Document generation streaming"
    );

    // The completion task is detached; it persists and audits on its own.
    let response_headers = [
        ("content-type", "text/plain; charset=utf-8".to_string()),
        (DOCUMENT_ID_HEADER, handle.record_id.to_string()),
        (GENERATION_SESSION_HEADER, handle.session_id.to_string()),
    ];
    Ok((
        response_headers,
        Body::from_stream(fragment_body(handle.fragments)),
    )
        .into_response())
}

/// Fetch one document.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document for this user", body = ErrorEnvelope)
    ),
    params(
        ("id" = i64, Path, description = "Document id"),
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let user_id = user_id_from(&headers)?;
    let id = path_param(id)?;
    let document = app_state.documents.get(id, user_id).await?;
    Ok(Json(DocumentResponse {
        success: true,
        document,
    }))
}

/// Open or close a document. The change is recorded in the audit trail.
#[utoipa::path(
    patch,
    path = "/documents/{id}/status",
    request_body = StatusChangeBody,
    responses(
        (status = 200, description = "The updated document", body = DocumentResponse),
        (status = 400, description = "Unknown status", body = ErrorEnvelope),
        (status = 404, description = "No such document for this user", body = ErrorEnvelope)
    ),
    params(
        ("id" = i64, Path, description = "Document id"),
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn change_status_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StatusChangeBody>, JsonRejection>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let user_id = user_id_from(&headers)?;
    let id = path_param(id)?;
    let status: DocumentStatus = json_body(body)?.status.parse()?;
    let document = app_state.documents.set_status(id, user_id, status).await?;
    Ok(Json(DocumentResponse {
        success: true,
        document,
    }))
}

/// Delete a document. Its audit history is kept.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 404, description = "No such document for this user", body = ErrorEnvelope)
    ),
    params(
        ("id" = i64, Path, description = "Document id"),
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn delete_document_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let user_id = user_id_from(&headers)?;
    let id = path_param(id)?;
    app_state.documents.delete(id, user_id).await?;
    Ok(Json(DeletedResponse { success: true, id }))
}

/// The audit trail of a document, oldest first.
#[utoipa::path(
    get,
    path = "/documents/{id}/audit",
    responses(
        (status = 200, description = "Audit entries", body = AuditHistoryResponse),
        (status = 404, description = "No such document for this user", body = ErrorEnvelope)
    ),
    params(
        ("id" = i64, Path, description = "Document id"),
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn document_audit_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AuditHistoryResponse>, ApiError> {
    let user_id = user_id_from(&headers)?;
    let id = path_param(id)?;
    let entries = app_state.documents.history(id, user_id).await?;
    Ok(Json(AuditHistoryResponse {
        success: true,
        entries,
    }))
}

/// The state of a generation session, including the reason it failed if it did.
#[utoipa::path(
    get,
    path = "/generations/{session_id}",
    responses(
        (status = 200, description = "Session report", body = GenerationReportResponse),
        (status = 404, description = "Unknown session", body = ErrorEnvelope)
    ),
    params(
        ("session_id" = Uuid, Path, description = "Generation session id"),
        ("x-user-id" = i64, Header, description = "The numeric id of the user.")
    )
)]
pub async fn generation_report_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    session_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<GenerationReportResponse>, ApiError> {
    let user_id = user_id_from(&headers)?;
    let session_id = path_param(session_id)?;
    let session = app_state.generations.status(session_id, user_id)?;
    Ok(Json(GenerationReportResponse {
        success: true,
        session,
    }))
}
