//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged with HTTP callers.
//!
//! Enum-valued request fields arrive as plain strings and are parsed by the
//! core, so an unknown value is reported through the error envelope as a
//! validation failure rather than as a deserialization rejection.

use draft_assist_core::domain::{
    AuditEntry, DocumentKind, DocumentRecord, GenerationMetadata, GenerationRequest, NewDocument,
    Suggestion, SuggestionContext,
};
use draft_assist_core::ports::PortResult;
use draft_assist_core::session::SessionReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Suggestions requested when the caller does not say.
pub const DEFAULT_MAX_RESULTS: i64 = 3;

fn default_general() -> String {
    "general".to_string()
}

fn default_max_results() -> i64 {
    DEFAULT_MAX_RESULTS
}

fn empty_inputs() -> Value {
    Value::Object(Default::default())
}

//=========================================================================================
// Request Payloads
//=========================================================================================

/// A request for suggestions on one section of a document.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequestBody {
    /// The section text to improve (at most 10 000 characters).
    pub content: String,
    /// One of general, safety, compliance, technical, professional.
    #[serde(default = "default_general")]
    pub context: String,
    /// One of risk_assessment, method_statement, permit, toolbox_talk, incident_report, general.
    #[serde(default = "default_general")]
    pub document_kind: String,
    pub section: String,
    /// Between 1 and 5.
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

impl SuggestionRequestBody {
    pub fn into_request(self) -> PortResult<GenerationRequest> {
        let context: SuggestionContext = self.context.parse()?;
        let document_kind: DocumentKind = self.document_kind.parse()?;
        GenerationRequest::new(
            self.content,
            context,
            document_kind,
            self.section,
            self.max_results,
        )
    }
}

/// The caller-supplied part of a document to generate.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDocumentBody {
    pub category: String,
    pub sub_category: String,
    /// Free-form form inputs the document is generated from.
    #[serde(default = "empty_inputs")]
    #[schema(value_type = Object)]
    pub inputs: Value,
    pub company_branding_id: Option<i64>,
}

impl GenerateDocumentBody {
    pub fn into_draft(self, user_id: i64) -> NewDocument {
        NewDocument {
            user_id,
            category: self.category,
            sub_category: self.sub_category,
            inputs: self.inputs,
            company_branding_id: self.company_branding_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeBody {
    /// `open` or `closed`.
    pub status: String,
}

//=========================================================================================
// Response Payloads
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub suggestions: Vec<Suggestion>,
    #[schema(value_type = Object)]
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub document: DocumentRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditHistoryResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationReportResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub session: SessionReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    pub id: i64,
}
