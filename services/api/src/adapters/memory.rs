//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Selected with
//! `DATABASE_URL=memory://` and used by the integration tests.

use async_trait::async_trait;
use chrono::Utc;
use draft_assist_core::domain::{
    AuditEntry, DocumentRecord, DocumentStatus, NewAuditEntry, NewDocument,
};
use draft_assist_core::ports::{DatabaseService, PortError, PortResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct Store {
    documents: BTreeMap<i64, DocumentRecord>,
    audit: Vec<AuditEntry>,
    next_document_id: i64,
    next_audit_id: i64,
}

impl Store {
    fn owned_mut(&mut self, id: i64, user_id: i64) -> PortResult<&mut DocumentRecord> {
        self.documents
            .get_mut(&id)
            .filter(|doc| doc.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))
    }
}

#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every audit entry, in insertion order.
    pub fn all_audit_entries(&self) -> Vec<AuditEntry> {
        self.store.lock().audit.clone()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_document(&self, document: NewDocument) -> PortResult<DocumentRecord> {
        let mut store = self.store.lock();
        store.next_document_id += 1;
        let now = Utc::now();
        let record = DocumentRecord {
            id: store.next_document_id,
            user_id: document.user_id,
            category: document.category,
            sub_category: document.sub_category,
            inputs: document.inputs,
            generated_content: String::new(),
            status: DocumentStatus::Open,
            company_branding_id: document.company_branding_id,
            created_at: now,
            updated_at: now,
        };
        store.documents.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_document(&self, id: i64, user_id: i64) -> PortResult<DocumentRecord> {
        let mut store = self.store.lock();
        store.owned_mut(id, user_id).map(|doc| doc.clone())
    }

    async fn update_generated_content(
        &self,
        id: i64,
        user_id: i64,
        content: &str,
    ) -> PortResult<DocumentRecord> {
        let mut store = self.store.lock();
        let doc = store.owned_mut(id, user_id)?;
        doc.generated_content = content.to_string();
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn update_status(
        &self,
        id: i64,
        user_id: i64,
        status: DocumentStatus,
    ) -> PortResult<DocumentRecord> {
        let mut store = self.store.lock();
        let doc = store.owned_mut(id, user_id)?;
        doc.status = status;
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn delete_document(&self, id: i64, user_id: i64) -> PortResult<()> {
        let mut store = self.store.lock();
        store.owned_mut(id, user_id)?;
        store.documents.remove(&id);
        Ok(())
    }

    async fn append_audit_entry(&self, entry: NewAuditEntry) -> PortResult<AuditEntry> {
        let mut store = self.store.lock();
        store.next_audit_id += 1;
        let entry = AuditEntry {
            id: store.next_audit_id,
            user_id: entry.user_id,
            action: entry.action,
            subject_id: entry.subject_id,
            subject_type: entry.subject_type,
            change_set: entry.change_set,
            timestamp: Utc::now(),
        };
        store.audit.push(entry.clone());
        Ok(entry)
    }

    async fn audit_entries_for(
        &self,
        subject_type: &str,
        subject_id: i64,
    ) -> PortResult<Vec<AuditEntry>> {
        let store = self.store.lock();
        Ok(store
            .audit
            .iter()
            .filter(|e| e.subject_type == subject_type && e.subject_id == subject_id)
            .cloned()
            .collect())
    }
}
