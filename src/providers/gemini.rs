//! Native Gemini backend with search grounding.
//!
//! Auth priority: config key → GEMINI_API_KEY → GOOGLE_API_KEY → API_KEY
//!
//! Thinking model support: Gemini 2.5 models return parts tagged `thought: true`.
//! Those are filtered out and only the final non-thought text is returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{GatewayError, Result};

use super::{GenerateRequest, GenerateResponse, GenerativeBackend, GroundingChunk};

/// Gemini v1beta REST API base.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Environment variables consulted for the API key, in order.
const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Gemini API key, sent as the `x-goog-api-key` header.
#[derive(Clone)]
pub struct GeminiAuth(String);

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeminiAuth([REDACTED])")
    }
}

impl GeminiAuth {
    /// Resolve the API key: an explicit (config) key wins over the environment.
    /// Empty strings count as absent.
    pub fn resolve(explicit_key: Option<&str>, env_key: Option<&str>) -> Option<Self> {
        explicit_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env_key.filter(|k| !k.trim().is_empty()))
            .map(|k| Self(k.trim().to_string()))
    }

    /// First non-empty value among the supported API key variables.
    pub fn from_env() -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

/// Gemini backend speaking the `generateContent` REST API directly.
///
/// A provider may be built without credentials. Every `generate` call then
/// fails with [`GatewayError::BackendFailure`] before touching the network.
pub struct GeminiProvider {
    auth: Option<GeminiAuth>,
    model: String,
    api_base: String,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("auth", &self.auth)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GeminiProvider {
    /// Build a provider that authenticates with an API key.
    pub fn new_with_key(api_key: &str, model: &str) -> Result<Self> {
        Self::build(
            GeminiAuth::resolve(Some(api_key), None),
            model,
            GEMINI_API_BASE,
            Duration::from_secs(120),
        )
    }

    /// Build from config, falling back to the environment for the API key.
    pub fn from_config(config: &GeminiConfig) -> Result<Self> {
        let env_key = GeminiAuth::from_env();
        let auth = GeminiAuth::resolve(config.api_key.as_deref(), env_key.as_deref());
        if auth.is_none() {
            warn!("No Gemini API key configured; every request will fail");
        }
        Self::build(
            auth,
            &config.model,
            &config.api_base,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn build(
        auth: Option<GeminiAuth>,
        model: &str,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            auth,
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Point the provider at a different API base (proxies, tests).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Drop any resolved credential.
    pub fn without_credentials(mut self) -> Self {
        self.auth = None;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.is_some()
    }

    /// Build the `generateContent` request body.
    pub fn build_request_body(request: &GenerateRequest) -> Value {
        let mut generation_config = json!({ "temperature": request.sampling.temperature });
        if let Some(budget) = request.sampling.thinking_budget {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": &request.prompt }]
            }],
            "generationConfig": generation_config
        });
        if !request.system_instruction.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": &request.system_instruction }] });
        }
        if request.search_grounding {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }
        body
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Parts tagged `"thought": true` are intermediate reasoning and are
    /// skipped. If only thought parts exist, their text is returned instead.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();
        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if thought_parts.is_empty() {
            None
        } else {
            Some(thought_parts.join(""))
        }
    }

    /// Grounding chunks of the first candidate, in response order.
    ///
    /// Chunks that are not JSON objects are skipped; objects with missing
    /// fields are kept for the gateway to filter.
    pub fn extract_grounding_chunks(response: &Value) -> Vec<GroundingChunk> {
        response["candidates"][0]["groundingMetadata"]["groundingChunks"]
            .as_array()
            .map(|chunks| {
                chunks
                    .iter()
                    .filter_map(|c| serde_json::from_value(c.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn api_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let auth = self.auth.as_ref().ok_or_else(|| {
            GatewayError::BackendFailure(
                "missing Gemini API credential: set GEMINI_API_KEY or gemini.api_key".into(),
            )
        })?;

        let body = Self::build_request_body(&request);
        debug!(
            model = %self.model,
            grounding = request.search_grounding,
            "Gemini generateContent request"
        );

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", auth.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::BackendFailure(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let json: Value = response.json().await.map_err(|e| {
                GatewayError::BackendFailure(format!("Failed to parse Gemini response: {}", e))
            })?;
            if !json.is_object() {
                return Err(GatewayError::BackendFailure(
                    "Gemini response is not a JSON object".into(),
                ));
            }
            return Ok(GenerateResponse {
                text: Self::extract_text(&json),
                grounding_chunks: Self::extract_grounding_chunks(&json),
            });
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);
        Err(GatewayError::BackendFailure(format!(
            "Gemini API error ({}): {}",
            status.as_u16(),
            message
        )))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
