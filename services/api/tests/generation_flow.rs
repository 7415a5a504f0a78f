mod common;

use common::{draft, FlakyDb, ScriptedChunkSource};
use draft_assist_core::domain::{AuditAction, ChangeKind};
use draft_assist_core::ports::{ChunkSource, DatabaseService, PortError};
use draft_assist_core::relay::StreamRelay;
use draft_assist_core::session::{
    GenerationSessionManager, SessionRegistry, SessionStage, SessionState,
};
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn manager(db: Arc<FlakyDb>, source: ScriptedChunkSource) -> GenerationSessionManager {
    let db: Arc<dyn DatabaseService> = db;
    let source: Arc<dyn ChunkSource> = Arc::new(source);
    GenerationSessionManager::new(
        db,
        source,
        StreamRelay::new(4),
        Arc::new(SessionRegistry::default()),
    )
}

#[tokio::test]
async fn delivered_text_is_what_gets_persisted() {
    let db = Arc::new(FlakyDb::new());
    let fragments = ["# Hot Work Permit\n", "Site: Dock 4\n", "Fire watch: ", "60 minutes"];
    let manager = manager(db.clone(), ScriptedChunkSource::streaming(&fragments));

    let handle = manager.start(draft(7), "write the permit").await.unwrap();
    let delivered: Vec<String> = handle
        .fragments
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(delivered, fragments);

    let state = handle.completion.await.unwrap();
    assert_eq!(state, SessionState::Audited);

    let record = db.find_document(handle.record_id, 7).await.unwrap();
    assert_eq!(record.generated_content, delivered.concat());

    let trail = db.audit_entries_for("document", handle.record_id).await.unwrap();
    let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Create, AuditAction::Update]);
    let change = trail[1].change_set.get("generatedContent").unwrap();
    assert_eq!(change.kind, ChangeKind::Add);

    let report = manager.status(handle.session_id, 7).unwrap();
    assert_eq!(report.fragments, 4);
    assert_eq!(report.record_id, Some(handle.record_id));
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn empty_output_records_no_update() {
    let db = Arc::new(FlakyDb::new());
    let manager = manager(db.clone(), ScriptedChunkSource::streaming(&[]));

    let handle = manager.start(draft(7), "write").await.unwrap();
    assert_eq!(handle.fragments.count().await, 0);
    assert_eq!(handle.completion.await.unwrap(), SessionState::Audited);

    let trail = db.audit_entries_for("document", handle.record_id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::Create);
}

#[tokio::test]
async fn mid_stream_failure_keeps_the_placeholder() {
    let db = Arc::new(FlakyDb::new());
    let source = ScriptedChunkSource::failing_after(
        &["Site: ", "Dock 4"],
        PortError::RateLimited("429 Too Many Requests".to_string()),
    );
    let manager = manager(db.clone(), source);

    let handle = manager.start(draft(7), "write").await.unwrap();
    let items: Vec<_> = handle.fragments.collect().await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_deref(), Ok("Site: "));
    assert!(matches!(items[2], Err(PortError::RateLimited(_))));

    match handle.completion.await.unwrap() {
        SessionState::Errored { stage, reason } => {
            assert_eq!(stage, SessionStage::Streaming);
            assert!(reason.contains("429"));
        }
        other => panic!("expected an errored session, got {:?}", other),
    }

    let record = db.find_document(handle.record_id, 7).await.unwrap();
    assert!(record.generated_content.is_empty());
    let trail = db.audit_entries_for("document", handle.record_id).await.unwrap();
    assert_eq!(trail.len(), 1);
}

#[tokio::test]
async fn refused_stream_fails_start_after_the_placeholder_exists() {
    let db = Arc::new(FlakyDb::new());
    let source = ScriptedChunkSource::refusing(PortError::QuotaExceeded(
        "insufficient_quota".to_string(),
    ));
    let manager = manager(db.clone(), source);

    let err = manager.start(draft(7), "write").await.err().unwrap();
    assert!(matches!(err, PortError::QuotaExceeded(_)));

    let entries = db.inner.all_audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::Create);
    assert!(db.find_document(entries[0].subject_id, 7).await.is_ok());
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_any_write() {
    let db = Arc::new(FlakyDb::new());
    let source = ScriptedChunkSource::streaming(&["never"]);
    let manager = manager(db.clone(), source);

    let err = manager.start(draft(0), "write").await.err().unwrap();
    assert!(matches!(err, PortError::Validation(_)));
    assert!(db.inner.all_audit_entries().is_empty());
    assert!(db.find_document(1, 0).await.is_err());
}

#[tokio::test]
async fn persistence_failure_after_delivery_is_reported() {
    let db = Arc::new(FlakyDb::new());
    db.fail_content_update.store(true, Ordering::SeqCst);
    let manager = manager(db.clone(), ScriptedChunkSource::streaming(&["All ", "done"]));

    let handle = manager.start(draft(7), "write").await.unwrap();
    let delivered: Vec<_> = handle.fragments.collect().await;
    assert!(delivered.iter().all(Result::is_ok));

    let state = handle.completion.await.unwrap();
    assert!(matches!(
        state,
        SessionState::Errored {
            stage: SessionStage::Persisting,
            ..
        }
    ));
    let report = manager.status(handle.session_id, 7).unwrap();
    assert_eq!(report.state, state);
}

#[tokio::test]
async fn audit_failure_after_persisting_is_reported() {
    let db = Arc::new(FlakyDb::new());
    *db.fail_audit_for.lock() = Some(AuditAction::Update);
    let manager = manager(db.clone(), ScriptedChunkSource::streaming(&["Body"]));

    let handle = manager.start(draft(7), "write").await.unwrap();
    let _ = handle.fragments.collect::<Vec<_>>().await;

    let state = handle.completion.await.unwrap();
    assert!(matches!(
        state,
        SessionState::Errored {
            stage: SessionStage::Auditing,
            ..
        }
    ));
    let record = db.find_document(handle.record_id, 7).await.unwrap();
    assert_eq!(record.generated_content, "Body");
}

#[tokio::test]
async fn caller_disconnect_ends_the_session_without_persisting() {
    let db = Arc::new(FlakyDb::new());
    let manager = manager(db.clone(), ScriptedChunkSource::hanging_after(&["Partial "]));

    let mut handle = manager.start(draft(7), "write").await.unwrap();
    let first = handle.fragments.next().await.unwrap().unwrap();
    assert_eq!(first, "Partial ");
    drop(handle.fragments);

    match handle.completion.await.unwrap() {
        SessionState::Errored { stage, reason } => {
            assert_eq!(stage, SessionStage::Streaming);
            assert!(reason.contains("disconnected"));
        }
        other => panic!("expected an errored session, got {:?}", other),
    }
    let record = db.find_document(handle.record_id, 7).await.unwrap();
    assert!(record.generated_content.is_empty());
}

#[tokio::test]
async fn sessions_are_private_to_their_owner() {
    let db = Arc::new(FlakyDb::new());
    let manager = manager(db, ScriptedChunkSource::streaming(&["x"]));

    let handle = manager.start(draft(7), "write").await.unwrap();
    let _ = handle.fragments.collect::<Vec<_>>().await;
    handle.completion.await.unwrap();

    assert!(manager.status(handle.session_id, 7).is_ok());
    assert!(matches!(
        manager.status(handle.session_id, 8),
        Err(PortError::NotFound(_))
    ));
}
