//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use draft_assist_core::domain::{
    AuditEntry, ChangeSet, DocumentRecord, DocumentStatus, NewAuditEntry, NewDocument,
};
use draft_assist_core::ports::{DatabaseService, PortError, PortResult};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};

const DOCUMENT_COLUMNS: &str = "id, user_id, category, sub_category, inputs, generated_content, \
     status, company_branding_id, created_at, updated_at";

const AUDIT_COLUMNS: &str = "id, user_id, action, subject_id, subject_type, change_set, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a `sqlx` failure onto the port taxonomy. `what` names the missing row.
fn map_err(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        other => PortError::Persistence(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    user_id: i64,
    category: String,
    sub_category: String,
    inputs: Json<Value>,
    generated_content: String,
    status: String,
    company_branding_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl DocumentRow {
    fn to_domain(self) -> PortResult<DocumentRecord> {
        let status: DocumentStatus = self.status.parse().map_err(|_| {
            PortError::Persistence(format!(
                "Document {} has an unknown status '{}'",
                self.id, self.status
            ))
        })?;
        Ok(DocumentRecord {
            id: self.id,
            user_id: self.user_id,
            category: self.category,
            sub_category: self.sub_category,
            inputs: self.inputs.0,
            generated_content: self.generated_content,
            status,
            company_branding_id: self.company_branding_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: i64,
    user_id: i64,
    action: String,
    subject_id: i64,
    subject_type: String,
    change_set: Json<ChangeSet>,
    created_at: DateTime<Utc>,
}
impl AuditRow {
    fn to_domain(self) -> PortResult<AuditEntry> {
        Ok(AuditEntry {
            id: self.id,
            user_id: self.user_id,
            action: self.action.parse()?,
            subject_id: self.subject_id,
            subject_type: self.subject_type,
            change_set: self.change_set.0,
            timestamp: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_document(&self, document: NewDocument) -> PortResult<DocumentRecord> {
        let sql = format!(
            "INSERT INTO documents (user_id, category, sub_category, inputs, generated_content, status, company_branding_id) \
             VALUES ($1, $2, $3, $4, '', 'open', $5) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(document.user_id)
            .bind(&document.category)
            .bind(&document.sub_category)
            .bind(Json(&document.inputs))
            .bind(document.company_branding_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?
            .to_domain()
    }

    async fn find_document(&self, id: i64, user_id: i64) -> PortResult<DocumentRecord> {
        let sql = format!(
            "SELECT {} FROM documents WHERE id = $1 AND user_id = $2",
            DOCUMENT_COLUMNS
        );
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Document {} not found", id)))?
            .to_domain()
    }

    async fn update_generated_content(
        &self,
        id: i64,
        user_id: i64,
        content: &str,
    ) -> PortResult<DocumentRecord> {
        let sql = format!(
            "UPDATE documents SET generated_content = $1, updated_at = NOW() \
             WHERE id = $2 AND user_id = $3 RETURNING {}",
            DOCUMENT_COLUMNS
        );
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(content)
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Document {} not found", id)))?
            .to_domain()
    }

    async fn update_status(
        &self,
        id: i64,
        user_id: i64,
        status: DocumentStatus,
    ) -> PortResult<DocumentRecord> {
        let sql = format!(
            "UPDATE documents SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND user_id = $3 RETURNING {}",
            DOCUMENT_COLUMNS
        );
        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(status.as_str())
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Document {} not found", id)))?
            .to_domain()
    }

    async fn delete_document(&self, id: i64, user_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    async fn append_audit_entry(&self, entry: NewAuditEntry) -> PortResult<AuditEntry> {
        let sql = format!(
            "INSERT INTO audit_entries (user_id, action, subject_id, subject_type, change_set) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            AUDIT_COLUMNS
        );
        sqlx::query_as::<_, AuditRow>(&sql)
            .bind(entry.user_id)
            .bind(entry.action.as_str())
            .bind(entry.subject_id)
            .bind(&entry.subject_type)
            .bind(Json(&entry.change_set))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?
            .to_domain()
    }

    async fn audit_entries_for(
        &self,
        subject_type: &str,
        subject_id: i64,
    ) -> PortResult<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {} FROM audit_entries WHERE subject_type = $1 AND subject_id = $2 ORDER BY id ASC",
            AUDIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(subject_type)
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        rows.into_iter().map(AuditRow::to_domain).collect()
    }
}
