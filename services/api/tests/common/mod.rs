//! Shared fixtures for the integration tests: a scripted chunk source and a
//! database wrapper that can be told to fail.

#![allow(dead_code)]

use api_lib::adapters::InMemoryDb;
use api_lib::config::Config;
use api_lib::web::AppState;
use async_trait::async_trait;
use draft_assist_core::domain::{
    AuditAction, AuditEntry, DocumentRecord, DocumentStatus, NewAuditEntry, NewDocument,
};
use draft_assist_core::ports::{ChunkSource, DatabaseService, FragmentStream, PortError, PortResult};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

//=========================================================================================
// Scripted Chunk Source
//=========================================================================================

/// A chunk source that replays a fixed script.
#[derive(Default)]
pub struct ScriptedChunkSource {
    fragments: Vec<PortResult<String>>,
    /// Keep the stream open after the scripted fragments instead of ending it.
    hang: bool,
    open_error: Option<PortError>,
    once: Mutex<Option<PortResult<String>>>,
    calls: AtomicUsize,
}

impl ScriptedChunkSource {
    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            ..Self::default()
        }
    }

    /// Streams `fragments`, then fails with `error`.
    pub fn failing_after(fragments: &[&str], error: PortError) -> Self {
        let mut script: Vec<PortResult<String>> =
            fragments.iter().map(|f| Ok(f.to_string())).collect();
        script.push(Err(error));
        Self {
            fragments: script,
            ..Self::default()
        }
    }

    /// Streams `fragments` and then never finishes.
    pub fn hanging_after(fragments: &[&str]) -> Self {
        Self {
            hang: true,
            ..Self::streaming(fragments)
        }
    }

    /// Refuses to open a stream at all.
    pub fn refusing(error: PortError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    /// Answers every `generate_once` call with `response`.
    pub fn answering(response: PortResult<&str>) -> Self {
        Self {
            once: Mutex::new(Some(response.map(str::to_string))),
            fragments: Vec::new(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkSource for ScriptedChunkSource {
    async fn generate_stream(&self, _prompt: &str) -> PortResult<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }
        let scripted = stream::iter(self.fragments.clone());
        if self.hang {
            Ok(Box::pin(scripted.chain(stream::pending())))
        } else {
            Ok(Box::pin(scripted))
        }
    }

    async fn generate_once(&self, _prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.once
            .lock()
            .clone()
            .unwrap_or_else(|| Err(PortError::Unavailable("no scripted answer".to_string())))
    }
}

//=========================================================================================
// Fault-injecting Database
//=========================================================================================

/// Delegates to an [`InMemoryDb`], failing the operations it is told to.
#[derive(Default)]
pub struct FlakyDb {
    pub inner: InMemoryDb,
    pub fail_content_update: AtomicBool,
    pub fail_audit_for: Mutex<Option<AuditAction>>,
}

impl FlakyDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for FlakyDb {
    async fn create_document(&self, document: NewDocument) -> PortResult<DocumentRecord> {
        self.inner.create_document(document).await
    }

    async fn find_document(&self, id: i64, user_id: i64) -> PortResult<DocumentRecord> {
        self.inner.find_document(id, user_id).await
    }

    async fn update_generated_content(
        &self,
        id: i64,
        user_id: i64,
        content: &str,
    ) -> PortResult<DocumentRecord> {
        if self.fail_content_update.load(Ordering::SeqCst) {
            return Err(PortError::Persistence("connection reset".to_string()));
        }
        self.inner.update_generated_content(id, user_id, content).await
    }

    async fn update_status(
        &self,
        id: i64,
        user_id: i64,
        status: DocumentStatus,
    ) -> PortResult<DocumentRecord> {
        self.inner.update_status(id, user_id, status).await
    }

    async fn delete_document(&self, id: i64, user_id: i64) -> PortResult<()> {
        self.inner.delete_document(id, user_id).await
    }

    async fn append_audit_entry(&self, entry: NewAuditEntry) -> PortResult<AuditEntry> {
        let failing = *self.fail_audit_for.lock();
        if failing == Some(entry.action) {
            return Err(PortError::Persistence("audit table locked".to_string()));
        }
        self.inner.append_audit_entry(entry).await
    }

    async fn audit_entries_for(
        &self,
        subject_type: &str,
        subject_id: i64,
    ) -> PortResult<Vec<AuditEntry>> {
        self.inner.audit_entries_for(subject_type, subject_id).await
    }
}

//=========================================================================================
// Builders
//=========================================================================================

pub fn test_config() -> Arc<Config> {
    let config = Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("memory://".to_string()),
        "RELAY_BUFFER" => Some("4".to_string()),
        "GENERATION_TIMEOUT_SECS" => Some("30".to_string()),
        _ => None,
    })
    .expect("test configuration is valid");
    Arc::new(config)
}

pub fn app_state(
    db: Arc<dyn DatabaseService>,
    generator: Arc<dyn ChunkSource>,
    suggester: Arc<dyn ChunkSource>,
) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), db, generator, suggester))
}

pub fn draft(user_id: i64) -> NewDocument {
    NewDocument {
        user_id,
        category: "permits".to_string(),
        sub_category: "hot_work".to_string(),
        inputs: json!({"site": "Dock 4", "supervisor": "R. Okafor", "crew": 4}),
        company_branding_id: Some(2),
    }
}

pub const SUGGESTIONS_JSON: &str = r#"[
  {"id":"s1","type":"safety","category":"Fire","priority":"high","suggestion":"Add a fire watch for 60 minutes after hot work.","reasoning":"Smouldering fires are the main residual risk."},
  {"id":"s2","type":"clarity","priority":"low","suggestion":"Name the permit issuer."}
]"#;
