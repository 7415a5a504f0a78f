//! crates/draft_assist_core/src/session.rs
//!
//! Owns the lifecycle of one document generation:
//!
//! `Init -> PlaceholderCreated -> Streaming -> Persisted -> Audited`
//!
//! with `Errored` reachable from every non-terminal state. The placeholder
//! record is never deleted on failure, so a failed generation stays
//! inspectable.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::domain::{AuditAction, DocumentRecord, NewDocument, StreamSession};
use crate::ports::{ChunkSource, DatabaseService, FragmentStream, PortError, PortResult};
use crate::relay::{RelayOutcome, RelayPump, StreamRelay};

/// Reports kept after their session finished, before the oldest are pruned.
pub const DEFAULT_REPORT_RETENTION: usize = 1024;

//=========================================================================================
// Session State
//=========================================================================================

/// The step a session was on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    Validation,
    Placeholder,
    Streaming,
    Persisting,
    Auditing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Init,
    PlaceholderCreated,
    Streaming,
    Persisted,
    Audited,
    Errored { stage: SessionStage, reason: String },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Audited | Self::Errored { .. })
    }

    fn errored(stage: SessionStage, reason: impl ToString) -> Self {
        Self::Errored {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// The externally visible record of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: Uuid,
    pub record_id: Option<i64>,
    pub user_id: i64,
    #[serde(flatten)]
    pub state: SessionState,
    pub fragments: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Session Registry
//=========================================================================================

#[derive(Default)]
struct Reports {
    by_id: HashMap<Uuid, SessionReport>,
    finished: VecDeque<Uuid>,
}

/// Shared, concurrency-safe map of session reports.
pub struct SessionRegistry {
    reports: RwLock<Reports>,
    retention: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_RETENTION)
    }
}

impl SessionRegistry {
    pub fn new(retention: usize) -> Self {
        Self {
            reports: RwLock::new(Reports::default()),
            retention: retention.max(1),
        }
    }

    fn begin(&self, session_id: Uuid, user_id: i64, started_at: DateTime<Utc>) {
        let mut reports = self.reports.write();
        reports.by_id.insert(
            session_id,
            SessionReport {
                session_id,
                record_id: None,
                user_id,
                state: SessionState::Init,
                fragments: 0,
                started_at,
                finished_at: None,
            },
        );
        while reports.finished.len() > self.retention {
            if let Some(oldest) = reports.finished.pop_front() {
                reports.by_id.remove(&oldest);
            }
        }
    }

    fn update(&self, session_id: Uuid, apply: impl FnOnce(&mut SessionReport)) {
        let mut reports = self.reports.write();
        let Some(report) = reports.by_id.get_mut(&session_id) else {
            return;
        };
        apply(report);
        if report.state.is_terminal() && report.finished_at.is_none() {
            report.finished_at = Some(Utc::now());
            reports.finished.push_back(session_id);
        }
    }

    fn transition(&self, session_id: Uuid, state: SessionState) {
        self.update(session_id, |report| report.state = state);
    }

    pub fn get(&self, session_id: Uuid) -> Option<SessionReport> {
        self.reports.read().by_id.get(&session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//=========================================================================================
// Generation Session Manager
//=========================================================================================

/// What the caller gets back once generation has started.
pub struct GenerationHandle {
    pub session_id: Uuid,
    pub record_id: i64,
    /// Fragments in source order. An `Err` item is the terminal failure.
    pub fragments: FragmentStream,
    /// Resolves to the terminal state once the content is persisted and audited
    /// (or the session failed). Runs to completion even if `fragments` is dropped.
    pub completion: JoinHandle<SessionState>,
}

#[derive(Clone)]
pub struct GenerationSessionManager {
    db: Arc<dyn DatabaseService>,
    source: Arc<dyn ChunkSource>,
    audit: AuditRecorder,
    relay: StreamRelay,
    registry: Arc<SessionRegistry>,
}

impl GenerationSessionManager {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        source: Arc<dyn ChunkSource>,
        relay: StreamRelay,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            audit: AuditRecorder::new(db.clone()),
            db,
            source,
            relay,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Creates the placeholder, records its creation, and starts streaming.
    ///
    /// Failures up to and including opening the upstream stream are returned
    /// here, before any fragment reaches the caller.
    pub async fn start(&self, draft: NewDocument, prompt: &str) -> PortResult<GenerationHandle> {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let user_id = draft.user_id;
        self.registry.begin(session_id, user_id, started_at);

        if let Err(e) = draft.validate() {
            self.fail(session_id, SessionStage::Validation, &e);
            return Err(e);
        }

        let placeholder = match self.db.create_document(draft).await {
            Ok(record) => record,
            Err(e) => {
                self.fail(session_id, SessionStage::Placeholder, &e);
                return Err(e);
            }
        };
        let record_id = placeholder.id;
        self.registry
            .update(session_id, |report| report.record_id = Some(record_id));

        if let Err(e) = self
            .audit
            .record_document(user_id, AuditAction::Create, None, Some(&placeholder))
            .await
        {
            self.fail(session_id, SessionStage::Placeholder, &e);
            return Err(e);
        }
        self.registry
            .transition(session_id, SessionState::PlaceholderCreated);
        info!(%session_id, record_id, "Placeholder document created");

        let upstream = match self.source.generate_stream(prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(session_id, SessionStage::Streaming, &e);
                return Err(e);
            }
        };
        self.registry.transition(session_id, SessionState::Streaming);

        let (pump, fragments) = self.relay.open();
        let session = StreamSession {
            session_id,
            placeholder_record_id: record_id,
            accumulated_text: String::new(),
            started_at,
        };
        let completion = tokio::spawn(self.clone().complete(session, placeholder, pump, upstream));

        Ok(GenerationHandle {
            session_id,
            record_id,
            fragments,
            completion,
        })
    }

    /// The report for `session_id`, if it belongs to `user_id`.
    pub fn status(&self, session_id: Uuid, user_id: i64) -> PortResult<SessionReport> {
        self.registry
            .get(session_id)
            .filter(|report| report.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Generation session {} not found", session_id)))
    }

    fn fail(&self, session_id: Uuid, stage: SessionStage, e: &PortError) {
        warn!(%session_id, ?stage, error = %e, "Generation session failed");
        self.registry
            .transition(session_id, SessionState::errored(stage, e));
    }

    async fn complete(
        self,
        mut session: StreamSession,
        placeholder: DocumentRecord,
        pump: RelayPump,
        upstream: FragmentStream,
    ) -> SessionState {
        let session_id = session.session_id;
        let outcome = pump.run(upstream).await;
        let fragments = outcome.fragments();
        self.registry
            .update(session_id, |report| report.fragments = fragments);

        let state = match outcome {
            RelayOutcome::Completed { text, .. } => {
                session.accumulated_text = text;
                self.persist_and_audit(&session, &placeholder).await
            }
            RelayOutcome::Failed { error, .. } => {
                SessionState::errored(SessionStage::Streaming, error)
            }
            RelayOutcome::Disconnected { fragments, .. } => SessionState::errored(
                SessionStage::Streaming,
                format!("caller disconnected after {} fragments", fragments),
            ),
        };

        let elapsed_ms = (Utc::now() - session.started_at).num_milliseconds();
        match &state {
            SessionState::Errored { stage, reason } => error!(
                %session_id,
                record_id = session.placeholder_record_id,
                ?stage,
                reason = %reason,
                elapsed_ms,
                "Generation session errored; placeholder kept for inspection"
            ),
            _ => info!(
                %session_id,
                record_id = session.placeholder_record_id,
                fragments,
                elapsed_ms,
                "Generation session completed"
            ),
        }
        self.registry.transition(session_id, state.clone());
        state
    }

    async fn persist_and_audit(
        &self,
        session: &StreamSession,
        placeholder: &DocumentRecord,
    ) -> SessionState {
        let updated = match self
            .db
            .update_generated_content(
                session.placeholder_record_id,
                placeholder.user_id,
                &session.accumulated_text,
            )
            .await
        {
            Ok(record) => record,
            Err(e) => return SessionState::errored(SessionStage::Persisting, e),
        };
        self.registry
            .transition(session.session_id, SessionState::Persisted);

        match self
            .audit
            .record_document(
                placeholder.user_id,
                AuditAction::Update,
                Some(placeholder),
                Some(&updated),
            )
            .await
        {
            Ok(_) => SessionState::Audited,
            Err(e) => SessionState::errored(SessionStage::Auditing, e),
        }
    }
}
