//! crates/draft_assist_core/src/suggestion.rs
//!
//! Structured-suggestion mode: one upstream call, recovered into a valid
//! suggestion list and memoized by request fingerprint.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::cache::{Fingerprint, SuggestionCache};
use crate::domain::{GenerationMetadata, GenerationRequest, SuggestionResponse};
use crate::ports::{ChunkSource, FragmentStream, PortResult};
use crate::prompt::suggestion_prompt;
use crate::recovery::{RecoveryEngine, RecoveryStage};
use crate::relay::StreamRelay;

#[derive(Clone)]
pub struct SuggestionService {
    source: Arc<dyn ChunkSource>,
    cache: Arc<SuggestionCache>,
    engine: Arc<RecoveryEngine>,
    relay: StreamRelay,
}

impl SuggestionService {
    pub fn new(
        source: Arc<dyn ChunkSource>,
        cache: Arc<SuggestionCache>,
        engine: Arc<RecoveryEngine>,
        relay: StreamRelay,
    ) -> Self {
        Self {
            source,
            cache,
            engine,
            relay,
        }
    }

    pub fn cache(&self) -> &Arc<SuggestionCache> {
        &self.cache
    }

    /// Returns suggestions for `request`, from the cache when an identical
    /// request was answered within the TTL.
    ///
    /// Upstream failures are returned with their classification. Unparseable
    /// output never is: it degrades to the fallback set, which is not cached.
    #[instrument(skip_all, fields(context = %request.context, kind = %request.document_kind))]
    pub async fn suggest(&self, request: GenerationRequest) -> PortResult<SuggestionResponse> {
        request.validate()?;
        let key = Fingerprint::of(&request);
        if let Some(mut hit) = self.cache.get(&key) {
            info!(fingerprint = %key, "Suggestion cache hit");
            // The fingerprint ignores maxResults; the stored list may be longer.
            hit.suggestions.truncate(request.max_results);
            return Ok(hit);
        }

        let started = Instant::now();
        let raw = self.source.generate_once(&suggestion_prompt(&request)).await?;
        let recovered = self.engine.recover(&raw, request.max_results);
        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            stage = ?recovered.stage,
            suggestions = recovered.suggestions.len(),
            processing_time_ms,
            "Suggestions generated"
        );

        let response = SuggestionResponse {
            suggestions: recovered.suggestions,
            metadata: GenerationMetadata {
                timestamp: Utc::now(),
                content_length: request.content.chars().count(),
                context: request.context,
                document_kind: request.document_kind,
                section: request.section.clone(),
                processing_time_ms,
                cached: false,
            },
        };
        if recovered.stage != RecoveryStage::Fallback {
            self.cache.put(key, response.clone());
        }
        Ok(response)
    }

    /// Relays the raw suggestion output fragment by fragment, without recovery
    /// or persistence.
    pub async fn stream(&self, request: GenerationRequest) -> PortResult<FragmentStream> {
        request.validate()?;
        let upstream = self
            .source
            .generate_stream(&suggestion_prompt(&request))
            .await?;
        let (pump, fragments) = self.relay.open();
        tokio::spawn(async move {
            let outcome = pump.run(upstream).await;
            info!(fragments = outcome.fragments(), "Suggestion stream finished");
        });
        Ok(fragments)
    }
}
