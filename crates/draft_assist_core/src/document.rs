//! crates/draft_assist_core/src/document.rs
//!
//! Audited document transitions outside of generation.

use std::sync::Arc;
use tracing::info;

use crate::audit::{AuditRecorder, DOCUMENT_SUBJECT};
use crate::domain::{AuditAction, AuditEntry, DocumentRecord, DocumentStatus};
use crate::ports::{DatabaseService, PortResult};

#[derive(Clone)]
pub struct DocumentService {
    db: Arc<dyn DatabaseService>,
    audit: AuditRecorder,
}

impl DocumentService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self {
            audit: AuditRecorder::new(db.clone()),
            db,
        }
    }

    pub async fn get(&self, id: i64, user_id: i64) -> PortResult<DocumentRecord> {
        self.db.find_document(id, user_id).await
    }

    /// Changes the status and records it. Setting the current status again
    /// writes nothing.
    pub async fn set_status(
        &self,
        id: i64,
        user_id: i64,
        status: DocumentStatus,
    ) -> PortResult<DocumentRecord> {
        let before = self.db.find_document(id, user_id).await?;
        if before.status == status {
            return Ok(before);
        }
        let after = self.db.update_status(id, user_id, status).await?;
        self.audit
            .record_document(user_id, AuditAction::StatusChange, Some(&before), Some(&after))
            .await?;
        info!(id, status = status.as_str(), "Document status changed");
        Ok(after)
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> PortResult<()> {
        let before = self.db.find_document(id, user_id).await?;
        self.db.delete_document(id, user_id).await?;
        self.audit
            .record_document(user_id, AuditAction::Delete, Some(&before), None)
            .await?;
        info!(id, "Document deleted");
        Ok(())
    }

    /// The audit trail of a document, oldest first. The document must still
    /// exist and belong to `user_id`.
    pub async fn history(&self, id: i64, user_id: i64) -> PortResult<Vec<AuditEntry>> {
        self.db.find_document(id, user_id).await?;
        self.db.audit_entries_for(DOCUMENT_SUBJECT, id).await
    }
}
