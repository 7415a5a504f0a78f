//! crates/draft_assist_core/src/cache.rs
//!
//! A bounded, time-expiring store of structured suggestion results keyed by a
//! content fingerprint.
//!
//! Eviction is governed by freshness, not by access recency: once the store
//! grows past its ceiling, expired entries are swept, and if that is not enough
//! the entries created longest ago go first. Reads never refresh an entry.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::domain::{GenerationRequest, SuggestionResponse};

/// Entries older than this are invisible to readers.
pub const DEFAULT_TTL_SECS: i64 = 30 * 60;

/// Size above which a sweep runs on insert.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

const FIELD_SEPARATOR: u8 = 0x1f;

//=========================================================================================
// Fingerprint
//=========================================================================================

/// Hex-encoded SHA-256 over the normalized request.
///
/// Content is trimmed and lower-cased first, so requests differing only by
/// surrounding whitespace or letter case share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request: &GenerationRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.content.trim().to_lowercase().as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(request.context.as_str().as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(request.document_kind.as_str().as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(request.section.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// SuggestionCache
//=========================================================================================

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub value: SuggestionResponse,
    pub created_at: DateTime<Utc>,
}

pub struct SuggestionCache {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(
            Duration::seconds(DEFAULT_TTL_SECS),
            DEFAULT_MAX_ENTRIES,
            Arc::new(SystemClock),
        )
    }
}

impl SuggestionCache {
    pub fn new(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at < self.ttl
    }

    /// Returns a copy of the stored result, flagged `cached`, if one exists and
    /// is younger than the TTL.
    pub fn get(&self, key: &Fingerprint) -> Option<SuggestionResponse> {
        let now = self.clock.now();
        let entries = self.entries.read();
        let entry = entries.get(key).filter(|entry| self.is_fresh(entry, now))?;
        let mut value = entry.value.clone();
        value.metadata.cached = true;
        Some(value)
    }

    /// Stores `value` under `key` with the current time, replacing any prior entry.
    pub fn put(&self, key: Fingerprint, value: SuggestionResponse) {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                created_at: now,
            },
        );

        if entries.len() > self.max_entries {
            let before = entries.len();
            entries.retain(|_, entry| now - entry.created_at < self.ttl);
            while entries.len() > self.max_entries {
                let Some(oldest) = entries
                    .values()
                    .min_by_key(|entry| entry.created_at)
                    .map(|entry| entry.key.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
            }
            debug!(evicted = before - entries.len(), "Swept suggestion cache");
        }
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.created_at < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
