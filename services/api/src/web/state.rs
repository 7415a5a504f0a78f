//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chrono::Duration;
use draft_assist_core::{
    clock::SystemClock,
    document::DocumentService,
    ports::{ChunkSource, DatabaseService},
    recovery::RecoveryEngine,
    relay::StreamRelay,
    session::{GenerationSessionManager, SessionRegistry},
    cache::SuggestionCache,
    suggestion::SuggestionService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generations: GenerationSessionManager,
    pub suggestions: SuggestionService,
    pub documents: DocumentService,
}

impl AppState {
    /// Wires the core services onto the given adapters.
    ///
    /// `generator` streams whole documents; `suggester` answers structured
    /// suggestion requests.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        generator: Arc<dyn ChunkSource>,
        suggester: Arc<dyn ChunkSource>,
    ) -> Self {
        let relay = StreamRelay::new(config.relay_buffer);
        let generation_relay = relay.with_deadline(std::time::Duration::from_secs(
            config.generation_timeout_secs,
        ));

        let cache = Arc::new(SuggestionCache::new(
            Duration::seconds(config.suggestion_cache_ttl_secs as i64),
            config.suggestion_cache_max_entries,
            Arc::new(SystemClock),
        ));

        Self {
            generations: GenerationSessionManager::new(
                db.clone(),
                generator,
                generation_relay,
                Arc::new(SessionRegistry::default()),
            ),
            suggestions: SuggestionService::new(
                suggester,
                cache,
                Arc::new(RecoveryEngine::default()),
                relay,
            ),
            documents: DocumentService::new(db),
            config,
        }
    }
}
