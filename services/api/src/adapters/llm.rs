//! services/api/src/adapters/llm.rs
//!
//! This module contains the adapter for the generative model.
//! It implements the `ChunkSource` port from the `core` crate on top of the
//! OpenAI chat completions API.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use draft_assist_core::ports::{ChunkSource, FragmentStream, PortError, PortResult};
use futures::StreamExt;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an assistant that drafts and reviews workplace health and safety documents. Follow the output format you are asked for exactly.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChunkSource` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChunkSource {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChunkSource {
    /// Creates a new `OpenAiChunkSource`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn request(&self, prompt: &str, stream: bool) -> PortResult<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .stream(stream)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

/// Upstream failures are classified by their message, which carries the
/// provider's quota and rate-limit wording.
fn upstream_error(e: OpenAIError) -> PortError {
    PortError::from_upstream(e.to_string())
}

//=========================================================================================
// `ChunkSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChunkSource for OpenAiChunkSource {
    async fn generate_stream(&self, prompt: &str) -> PortResult<FragmentStream> {
        let request = self.request(prompt, true)?;
        let upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(upstream_error)?;

        let fragments = upstream.filter_map(|chunk| async move {
            match chunk {
                Ok(response) => {
                    let text: String = response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect();
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(upstream_error(e))),
            }
        });
        Ok(Box::pin(fragments))
    }

    async fn generate_once(&self, prompt: &str) -> PortResult<String> {
        let request = self.request(prompt, false)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(upstream_error)?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unavailable("LLM response contained no text content.".to_string())
            })?;
        debug!(chars = content.len(), "Generation received");
        Ok(content)
    }
}
