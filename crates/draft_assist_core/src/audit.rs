//! crates/draft_assist_core/src/audit.rs
//!
//! Field-level change tracking for document records. Every transition is
//! recorded from the true before/after state, and nothing is written when no
//! tracked field changed.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{
    AuditAction, AuditEntry, ChangeKind, ChangeSet, DocumentRecord, FieldChange, NewAuditEntry,
};
use crate::ports::{DatabaseService, PortResult};

/// Subject type stored on document audit entries.
pub const DOCUMENT_SUBJECT: &str = "document";

/// Fields compared by [`diff`] for document records.
pub const TRACKED_DOCUMENT_FIELDS: &[&str] = &[
    "category",
    "subCategory",
    "inputs",
    "generatedContent",
    "status",
    "companyBrandingId",
];

/// Free-text fields stored as a bounded preview.
const PREVIEW_FIELDS: &[&str] = &["generatedContent"];

/// Fields holding parsed JSON payloads, stored as a shape summary.
const SUMMARY_FIELDS: &[&str] = &["inputs"];

pub const PREVIEW_CHARS: usize = 200;

const PREVIEW_MARKER: &str = "…";

/// The tracked fields of a record, keyed by their wire names.
pub fn document_snapshot(record: &DocumentRecord) -> Map<String, Value> {
    let snapshot = json!({
        "category": record.category,
        "subCategory": record.sub_category,
        "inputs": record.inputs,
        "generatedContent": record.generated_content,
        "status": record.status.as_str(),
        "companyBrandingId": record.company_branding_id,
    });
    match snapshot {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// The stored form of one field value: previews for large text, a shape
/// summary for JSON payloads, the value itself otherwise.
pub fn sanitize(field: &str, value: &Value) -> Value {
    if PREVIEW_FIELDS.contains(&field) {
        if let Value::String(text) = value {
            return Value::String(preview(text));
        }
    }
    if SUMMARY_FIELDS.contains(&field) {
        match value {
            Value::Object(map) => return Value::String(format!("JSON with {} fields", map.len())),
            Value::Array(items) => {
                return Value::String(format!("JSON with {} items", items.len()))
            }
            _ => {}
        }
    }
    value.clone()
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], PREVIEW_MARKER),
        None => text.to_string(),
    }
}

/// Compares the tracked fields of two snapshots. A missing snapshot counts as
/// every field being absent.
pub fn diff(old: Option<&Map<String, Value>>, new: Option<&Map<String, Value>>) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for field in TRACKED_DOCUMENT_FIELDS {
        let before = old.and_then(|m| m.get(*field));
        let after = new.and_then(|m| m.get(*field));
        let (was_empty, now_empty) = (is_empty(before), is_empty(after));
        if was_empty && now_empty {
            continue;
        }
        if before == after {
            continue;
        }
        let kind = if was_empty {
            ChangeKind::Add
        } else if now_empty {
            ChangeKind::Remove
        } else {
            ChangeKind::Update
        };
        changes.insert(
            *field,
            FieldChange {
                kind,
                old: before.filter(|_| !was_empty).map(|v| sanitize(field, v)),
                new: after.filter(|_| !now_empty).map(|v| sanitize(field, v)),
            },
        );
    }
    changes
}

//=========================================================================================
// AuditRecorder
//=========================================================================================

#[derive(Clone)]
pub struct AuditRecorder {
    db: Arc<dyn DatabaseService>,
}

impl AuditRecorder {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Diffs `before` against `after` and appends an entry when anything
    /// changed. Returns `None` for a no-op transition.
    pub async fn record_document(
        &self,
        user_id: i64,
        action: AuditAction,
        before: Option<&DocumentRecord>,
        after: Option<&DocumentRecord>,
    ) -> PortResult<Option<AuditEntry>> {
        let Some(subject_id) = after.or(before).map(|record| record.id) else {
            return Ok(None);
        };
        let old = before.map(document_snapshot);
        let new = after.map(document_snapshot);
        let change_set = diff(old.as_ref(), new.as_ref());
        if change_set.is_empty() {
            debug!(subject_id, action = action.as_str(), "No tracked field changed; audit skipped");
            return Ok(None);
        }

        let entry = self
            .db
            .append_audit_entry(NewAuditEntry {
                user_id,
                action,
                subject_id,
                subject_type: DOCUMENT_SUBJECT.to_string(),
                change_set,
            })
            .await?;
        info!(
            subject_id,
            action = action.as_str(),
            fields = entry.change_set.len(),
            "Audit entry recorded"
        );
        Ok(Some(entry))
    }
}
