//! crates/draft_assist_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or LLM APIs.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{AuditEntry, DocumentRecord, DocumentStatus, NewAuditEntry, NewDocument};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Upstream quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Upstream rate limit reached: {0}")]
    RateLimited(String),
    #[error("Upstream service unavailable: {0}")]
    Unavailable(String),
    #[error("Generation timed out: {0}")]
    Timeout(String),
    #[error("Persistence failure: {0}")]
    Persistence(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Classifies a failure signal raised by a chunk source.
    ///
    /// Providers do not agree on error codes, so the message itself is inspected.
    pub fn from_upstream(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("quota") || lowered.contains("billing") {
            Self::QuotaExceeded(message)
        } else if lowered.contains("rate limit")
            || lowered.contains("rate_limit")
            || lowered.contains("too many requests")
            || lowered.contains("429")
        {
            Self::RateLimited(message)
        } else {
            Self::Unavailable(message)
        }
    }

    /// The stable error kind reported to callers in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::QuotaExceeded(_) => "UpstreamQuotaError",
            Self::RateLimited(_) => "UpstreamRateLimitError",
            Self::Unavailable(_) => "UpstreamUnavailableError",
            Self::Timeout(_) => "UpstreamTimeoutError",
            Self::Persistence(_) => "PersistenceError",
            Self::NotFound(_) => "NotFoundError",
            Self::Unexpected(_) => "InternalError",
        }
    }

    /// The HTTP status code that corresponds to this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::RateLimited(_) => 429,
            Self::QuotaExceeded(_) | Self::Unavailable(_) => 503,
            Self::Timeout(_) => 504,
            Self::Persistence(_) | Self::Unexpected(_) => 500,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazy, ordered, finite sequence of text fragments. An `Err` item is terminal.
pub type FragmentStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Starts a streamed generation for the prompt.
    async fn generate_stream(&self, prompt: &str) -> PortResult<FragmentStream>;

    /// Generates the whole response in one call.
    async fn generate_once(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Document Management ---
    async fn create_document(&self, document: NewDocument) -> PortResult<DocumentRecord>;

    async fn find_document(&self, id: i64, user_id: i64) -> PortResult<DocumentRecord>;

    async fn update_generated_content(
        &self,
        id: i64,
        user_id: i64,
        content: &str,
    ) -> PortResult<DocumentRecord>;

    async fn update_status(
        &self,
        id: i64,
        user_id: i64,
        status: DocumentStatus,
    ) -> PortResult<DocumentRecord>;

    async fn delete_document(&self, id: i64, user_id: i64) -> PortResult<()>;

    // --- Audit Trail ---
    async fn append_audit_entry(&self, entry: NewAuditEntry) -> PortResult<AuditEntry>;

    /// Returns the entries for one subject, oldest first.
    async fn audit_entries_for(
        &self,
        subject_type: &str,
        subject_id: i64,
    ) -> PortResult<Vec<AuditEntry>>;
}
