//! Generative language backends.
//!
//! The gateway talks to a backend through [`GenerativeBackend`]. A request is
//! a single prompt with a system instruction, an optional search-grounding
//! flag and sampling parameters. A response carries the generated text and the
//! raw grounding chunks, which the gateway normalizes into citations.

pub mod gemini;

pub use gemini::{GeminiAuth, GeminiProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    /// Token budget for model-side reasoning. `Some(0)` disables thinking.
    pub thinking_budget: Option<u32>,
}

impl SamplingConfig {
    /// Near-deterministic sampling used for grounded answers.
    pub const fn grounded() -> Self {
        Self {
            temperature: 0.1,
            thinking_budget: Some(0),
        }
    }

    /// Fully deterministic sampling used for code refactors.
    pub const fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            thinking_budget: Some(0),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::grounded()
    }
}

/// One outbound generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_instruction: String,
    /// Enable the backend's web-search tool.
    pub search_grounding: bool,
    pub sampling: SamplingConfig,
}

/// Web source attached to a grounding chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// A grounding chunk as returned by the backend. Only web chunks are used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

impl GroundingChunk {
    /// Convenience constructor for a web chunk.
    pub fn web(title: Option<&str>, uri: Option<&str>) -> Self {
        Self {
            web: Some(WebSource {
                title: title.map(String::from),
                uri: uri.map(String::from),
            }),
        }
    }
}

/// Backend output before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    /// Generated text. `None` or empty when the backend produced nothing.
    pub text: Option<String>,
    /// Grounding chunks in backend order.
    pub grounding_chunks: Vec<GroundingChunk>,
}

impl GenerateResponse {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            grounding_chunks: Vec::new(),
        }
    }

    pub fn with_grounding(mut self, chunks: Vec<GroundingChunk>) -> Self {
        self.grounding_chunks = chunks;
        self
    }
}

/// A generative language backend.
///
/// Implementations perform exactly one outbound call per `generate` and never
/// retry. Credential problems surface as
/// [`GatewayError::BackendFailure`](crate::error::GatewayError::BackendFailure).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Short backend identifier for logs.
    fn name(&self) -> &'static str;
}
