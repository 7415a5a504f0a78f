//! crates/draft_assist_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

/// Upper bound on the size of the text a caller may submit for suggestions.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Largest number of suggestions a single request may ask for.
pub const MAX_RESULTS_CEILING: usize = 5;

//=========================================================================================
// Request Enums
//=========================================================================================

/// The professional lens a suggestion request is made through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionContext {
    General,
    Safety,
    Compliance,
    Technical,
    Professional,
}

impl SuggestionContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Safety => "safety",
            Self::Compliance => "compliance",
            Self::Technical => "technical",
            Self::Professional => "professional",
        }
    }
}

impl FromStr for SuggestionContext {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "safety" => Ok(Self::Safety),
            "compliance" => Ok(Self::Compliance),
            "technical" => Ok(Self::Technical),
            "professional" => Ok(Self::Professional),
            other => Err(PortError::Validation(format!("Unknown context '{}'", other))),
        }
    }
}

impl fmt::Display for SuggestionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of business document the text being improved belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    RiskAssessment,
    MethodStatement,
    Permit,
    ToolboxTalk,
    IncidentReport,
    General,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiskAssessment => "risk_assessment",
            Self::MethodStatement => "method_statement",
            Self::Permit => "permit",
            Self::ToolboxTalk => "toolbox_talk",
            Self::IncidentReport => "incident_report",
            Self::General => "general",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "risk_assessment" => Ok(Self::RiskAssessment),
            "method_statement" => Ok(Self::MethodStatement),
            "permit" => Ok(Self::Permit),
            "toolbox_talk" => Ok(Self::ToolboxTalk),
            "incident_report" => Ok(Self::IncidentReport),
            "general" => Ok(Self::General),
            other => Err(PortError::Validation(format!(
                "Unknown document kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// GenerationRequest
//=========================================================================================

/// A request for structured suggestions on a piece of document text.
///
/// Built through [`GenerationRequest::new`], which rejects bad input before any
/// upstream work is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub content: String,
    pub context: SuggestionContext,
    pub document_kind: DocumentKind,
    pub section: String,
    pub max_results: usize,
}

impl GenerationRequest {
    pub fn new(
        content: impl Into<String>,
        context: SuggestionContext,
        document_kind: DocumentKind,
        section: impl Into<String>,
        max_results: i64,
    ) -> PortResult<Self> {
        if max_results < 1 || max_results > MAX_RESULTS_CEILING as i64 {
            return Err(PortError::Validation(format!(
                "maxResults must be between 1 and {}, got {}",
                MAX_RESULTS_CEILING, max_results
            )));
        }
        let request = Self {
            content: content.into(),
            context,
            document_kind,
            section: section.into(),
            max_results: max_results as usize,
        };
        request.validate()?;
        Ok(request)
    }

    /// Re-checks the invariants a request must hold before any work begins.
    pub fn validate(&self) -> PortResult<()> {
        if self.content.trim().is_empty() {
            return Err(PortError::Validation("content must not be empty".to_string()));
        }
        let length = self.content.chars().count();
        if length > MAX_CONTENT_CHARS {
            return Err(PortError::Validation(format!(
                "content must be at most {} characters, got {}",
                MAX_CONTENT_CHARS, length
            )));
        }
        if self.section.trim().is_empty() {
            return Err(PortError::Validation("section must not be empty".to_string()));
        }
        if !(1..=MAX_RESULTS_CEILING).contains(&self.max_results) {
            return Err(PortError::Validation(format!(
                "maxResults must be between 1 and {}",
                MAX_RESULTS_CEILING
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Suggestion
//=========================================================================================

/// The professional dimension a suggestion addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Safety,
    Compliance,
    Clarity,
    Completeness,
    Technical,
    Professional,
    #[default]
    General,
}

impl SuggestionType {
    /// Lenient parse used on model output; anything unrecognised becomes `General`.
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "safety" | "hazard" | "risk" => Self::Safety,
            "compliance" | "regulatory" | "legal" => Self::Compliance,
            "clarity" | "readability" | "language" => Self::Clarity,
            "completeness" | "missing" | "coverage" => Self::Completeness,
            "technical" | "accuracy" => Self::Technical,
            "professional" | "tone" | "style" => Self::Professional,
            _ => Self::General,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Safety => "Safety",
            Self::Compliance => "Compliance",
            Self::Clarity => "Clarity",
            Self::Completeness => "Completeness",
            Self::Technical => "Technical",
            Self::Professional => "Professional",
            Self::General => "General",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn parse_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" | "urgent" => Self::High,
            "low" | "minor" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// One validated improvement suggestion.
///
/// Only the recovery engine produces these, and never with an empty
/// `suggestion_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub category: String,
    pub priority: Priority,
    #[serde(rename = "suggestion")]
    pub suggestion_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improved_text: Option<String>,
    #[serde(rename = "reasoning", default)]
    pub reasoning_text: String,
}

/// The metadata envelope returned alongside structured suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
    pub context: SuggestionContext,
    pub document_kind: DocumentKind,
    pub section: String,
    pub processing_time_ms: u64,
    pub cached: bool,
}

/// The result of one structured-suggestion generation. This is also the value
/// stored in the suggestion cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<Suggestion>,
    pub metadata: GenerationMetadata,
}

//=========================================================================================
// Documents
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Open,
    Closed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(PortError::Validation(format!("Unknown status '{}'", other))),
        }
    }
}

/// A generated business document owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub sub_category: String,
    pub inputs: Value,
    pub generated_content: String,
    pub status: DocumentStatus,
    pub company_branding_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The caller-supplied part of a document, used to create the placeholder record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub user_id: i64,
    pub category: String,
    pub sub_category: String,
    pub inputs: Value,
    pub company_branding_id: Option<i64>,
}

impl NewDocument {
    pub fn validate(&self) -> PortResult<()> {
        if self.user_id <= 0 {
            return Err(PortError::Validation(format!(
                "user id must be a positive number, got {}",
                self.user_id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(PortError::Validation("category must not be empty".to_string()));
        }
        if self.sub_category.trim().is_empty() {
            return Err(PortError::Validation(
                "subCategory must not be empty".to_string(),
            ));
        }
        if let Some(branding_id) = self.company_branding_id {
            if branding_id <= 0 {
                return Err(PortError::Validation(format!(
                    "companyBrandingId must be a positive number, got {}",
                    branding_id
                )));
            }
        }
        Ok(())
    }
}

/// The in-flight state of one streamed generation. Owned by exactly one
/// generation task and dropped when the stream ends.
#[derive(Debug)]
pub struct StreamSession {
    pub session_id: Uuid,
    pub placeholder_record_id: i64,
    pub accumulated_text: String,
    pub started_at: DateTime<Utc>,
}

//=========================================================================================
// Audit
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StatusChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::StatusChange => "STATUS_CHANGE",
        }
    }
}

impl FromStr for AuditAction {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "STATUS_CHANGE" => Ok(Self::StatusChange),
            other => Err(PortError::Unexpected(format!(
                "Unknown audit action '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Add,
    Remove,
    Update,
}

/// A sanitized before/after pair for one tracked field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub kind: ChangeKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Field-level changes keyed by field name, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, FieldChange>);

impl ChangeSet {
    pub fn insert(&mut self, field: impl Into<String>, change: FieldChange) {
        self.0.insert(field.into(), change);
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// An append-only audit trail entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: AuditAction,
    pub subject_id: i64,
    pub subject_type: String,
    pub change_set: ChangeSet,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: AuditAction,
    pub subject_id: i64,
    pub subject_type: String,
    pub change_set: ChangeSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_out_of_range_max_results() {
        let err = GenerationRequest::new(
            "Work at height",
            SuggestionContext::Safety,
            DocumentKind::Permit,
            "hazards",
            6,
        )
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        assert!(GenerationRequest::new(
            "Work at height",
            SuggestionContext::Safety,
            DocumentKind::Permit,
            "hazards",
            0,
        )
        .is_err());
    }

    #[test]
    fn request_rejects_blank_content_and_section() {
        assert!(GenerationRequest::new(
            "   ",
            SuggestionContext::General,
            DocumentKind::General,
            "intro",
            3
        )
        .is_err());
        assert!(GenerationRequest::new(
            "text",
            SuggestionContext::General,
            DocumentKind::General,
            " ",
            3
        )
        .is_err());
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(
            "Risk-Assessment".parse::<DocumentKind>().unwrap(),
            DocumentKind::RiskAssessment
        );
        assert_eq!(
            " SAFETY ".parse::<SuggestionContext>().unwrap(),
            SuggestionContext::Safety
        );
        assert!("poetry".parse::<SuggestionContext>().is_err());
        assert_eq!(SuggestionType::parse_loose("whatever"), SuggestionType::General);
        assert_eq!(Priority::parse_loose("CRITICAL"), Priority::High);
        assert_eq!(Priority::parse_loose(""), Priority::Medium);
    }

    #[test]
    fn new_document_requires_numeric_owner_and_categories() {
        let mut draft = NewDocument {
            user_id: 7,
            category: "permits".to_string(),
            sub_category: "hot_work".to_string(),
            inputs: serde_json::json!({"site": "Dock 4"}),
            company_branding_id: None,
        };
        assert!(draft.validate().is_ok());

        draft.user_id = 0;
        assert!(draft.validate().is_err());

        draft.user_id = 7;
        draft.sub_category = String::new();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn suggestion_serializes_with_wire_names() {
        let suggestion = Suggestion {
            id: "1".to_string(),
            kind: SuggestionType::Safety,
            category: "Fire".to_string(),
            priority: Priority::High,
            suggestion_text: "Add fire watch".to_string(),
            improved_text: None,
            reasoning_text: String::new(),
        };
        let value = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(value["type"], "safety");
        assert_eq!(value["suggestion"], "Add fire watch");
        assert_eq!(value["priority"], "high");
        assert!(value.get("improvedText").is_none());
    }
}
