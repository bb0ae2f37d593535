//! Extraction client: one image payload in, one validated page out.
//!
//! The pipeline depends on the [`ExtractionClient`] trait only.
//! [`VisionExtractionClient`] implements it on top of any `edgequake-llm`
//! vision provider. All prompt text lives in [`crate::prompts`] and all
//! response validation in [`crate::pipeline::parse`]; this module only
//! builds the request and classifies transport failures.
//!
//! There is no retry: a failed call fails the run.

use crate::config::ExtractionConfig;
use crate::error::StatementError;
use crate::output::PageResult;
use crate::pipeline::encode::ImagePayload;
use crate::pipeline::parse::parse_response;
use crate::prompts::{system_message, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Adapter to the external structured-extraction service.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Extract one page. Fails only on transport or service errors;
    /// malformed content degrades to fewer (or no) transactions.
    async fn extract(&self, payload: ImagePayload) -> Result<PageResult, StatementError>;
}

/// [`ExtractionClient`] backed by a vision-capable LLM provider.
pub struct VisionExtractionClient {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl VisionExtractionClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        let instruction = config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        Self {
            provider,
            system_prompt: system_message(instruction),
            options: build_options(config),
            timeout: config.api_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[async_trait]
impl ExtractionClient for VisionExtractionClient {
    async fn extract(&self, payload: ImagePayload) -> Result<PageResult, StatementError> {
        let start = Instant::now();

        // The instruction rides in the system turn; the user turn carries the
        // page image plus a short nudge so providers that reject empty text accept it.
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("Extract the statement data from this page.", vec![payload.into()]),
        ];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!("Extraction call timed out after {}s", limit.as_secs());
                StatementError::extraction(format!(
                    "extraction call timed out after {}s",
                    limit.as_secs()
                ))
            })?,
            None => call.await,
        }
        .map_err(|e| {
            warn!("Extraction call failed: {}", e);
            StatementError::extraction(e.to_string())
        })?;

        debug!(
            "Extraction: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        parse_response(&response.content)
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
