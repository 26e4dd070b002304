//! Prompt gateway: cache-or-fetch with cooperative cancellation.
//!
//! [`PromptGateway::query`] answers from the [`ResponseCache`] when a fresh
//! entry exists. Otherwise it makes exactly one backend call with search
//! grounding, normalizes the result, caches it and returns it.
//!
//! Cancellation is checked before the call, raced against the call, and
//! checked again once the call settles. A cancelled or failed call never
//! writes to the cache.

pub mod normalize;

pub use normalize::{answer_text, extract_citations, Citation};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStats, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::error::{GatewayError, Result};
use crate::persona::Persona;
use crate::providers::{GenerateRequest, GenerateResponse, GenerativeBackend, SamplingConfig};

const REFACTOR_PREFIX: &str = "Architectural Refactor Request:\n\n";

/// Answer returned by [`PromptGateway::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub text: String,
    pub citations: Vec<Citation>,
    /// `true` when served from the cache without a backend call.
    pub cached: bool,
}

/// Cached, cancellable front door to a [`GenerativeBackend`].
pub struct PromptGateway {
    backend: Arc<dyn GenerativeBackend>,
    cache: Arc<ResponseCache>,
    persona: Persona,
    sampling: SamplingConfig,
}

impl std::fmt::Debug for PromptGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptGateway")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .field("persona", &self.persona.name)
            .finish()
    }
}

impl PromptGateway {
    /// Gateway with a fresh wall-clock cache.
    pub fn new(backend: Arc<dyn GenerativeBackend>, persona: Persona) -> Self {
        Self::with_clock(backend, persona, Arc::new(SystemClock))
    }

    /// Gateway whose cache reads time from `clock`.
    pub fn with_clock(
        backend: Arc<dyn GenerativeBackend>,
        persona: Persona,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_cache(backend, persona, Arc::new(ResponseCache::new(clock)))
    }

    /// Gateway sharing an existing cache.
    pub fn with_cache(
        backend: Arc<dyn GenerativeBackend>,
        persona: Persona,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            backend,
            cache,
            persona,
            sampling: SamplingConfig::grounded(),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Answer `prompt`, from the cache when fresh.
    ///
    /// The prompt is expected to be non-empty after trimming. The raw prompt
    /// is sent to the backend; only the cache key is normalized.
    pub async fn query(
        &self,
        prompt: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<QueryResponse> {
        let key = CacheKey::from_prompt(prompt);
        if let Some(entry) = self.cache.get(&key) {
            debug!(key = %key.digest(), "Serving prompt from response cache");
            return Ok(QueryResponse {
                text: entry.response_text,
                citations: entry.citations,
                cached: true,
            });
        }

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            system_instruction: self.persona.system_instruction.clone(),
            search_grounding: true,
            sampling: self.sampling,
        };
        info!(
            key = %key.digest(),
            backend = self.backend.name(),
            "Cache miss, calling backend"
        );
        let response = self.call_backend(request, cancel).await?;

        let text = answer_text(&response, &self.persona.empty_response_text);
        let citations =
            extract_citations(&response.grounding_chunks, &self.persona.citation_fallback_title);
        self.cache.put(key, text.clone(), citations.clone());

        Ok(QueryResponse {
            text,
            citations,
            cached: false,
        })
    }

    /// Ask the backend to refactor `code`. Never cached and never grounded.
    ///
    /// Returns `code` unchanged when the backend produces no text.
    pub async fn refactor(&self, code: &str, cancel: Option<&CancellationToken>) -> Result<String> {
        let request = GenerateRequest {
            prompt: format!("{}{}", REFACTOR_PREFIX, code),
            system_instruction: self.persona.system_instruction.clone(),
            search_grounding: false,
            sampling: SamplingConfig::deterministic(),
        };
        info!(backend = self.backend.name(), bytes = code.len(), "Refactor request");
        let response = self.call_backend(request, cancel).await?;
        Ok(answer_text(&response, code))
    }

    /// One backend call with cancellation checked before, during and after.
    async fn call_backend(
        &self,
        request: GenerateRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<GenerateResponse> {
        let outcome = match cancel {
            Some(token) if token.is_cancelled() => Err(GatewayError::Cancelled),
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(GatewayError::Cancelled),
                result = self.backend.generate(request) => result,
            },
            None => self.backend.generate(request).await,
        };

        // A cancel that lands as the call settles still wins over its result.
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            info!("Backend request cancelled by caller");
            return Err(GatewayError::Cancelled);
        }
        outcome.inspect_err(|e| warn!(error = %e, "Backend request failed"))
    }
}
