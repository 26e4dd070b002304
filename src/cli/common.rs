//! Shared CLI wiring: config, store, identity and rendering.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use prompt_gateway::clock::{Clock, SystemClock};
use prompt_gateway::history::HistoryRegistry;
use prompt_gateway::identity::{Identity, StoreUserDirectory, UserDirectory};
use prompt_gateway::store::{JsonFileStore, KeyValueStore};
use prompt_gateway::{Config, GatewayError, GeminiProvider, PromptGateway, QueryResponse};

/// Everything a command needs, built once per invocation.
pub(crate) struct AppContext {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub(crate) fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_with_overrides(path),
            None => Config::load(),
        }
        .with_context(|| "Failed to load configuration")?;

        let store_path = config.store_path();
        let store = JsonFileStore::open(&store_path)
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

        Ok(Self {
            config,
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
        })
    }

    pub(crate) fn gateway(&self) -> Result<PromptGateway> {
        let backend = GeminiProvider::from_config(&self.config.gemini)
            .with_context(|| "Failed to initialize Gemini backend")?;
        Ok(PromptGateway::with_clock(
            Arc::new(backend),
            self.config.persona.clone(),
            self.clock.clone(),
        ))
    }

    pub(crate) fn history(&self) -> HistoryRegistry {
        HistoryRegistry::new(self.store.clone(), self.clock.clone())
    }

    pub(crate) fn directory(&self) -> StoreUserDirectory {
        StoreUserDirectory::new(self.store.clone(), self.clock.clone())
    }

    /// Resolve the session identity according to the login policy.
    pub(crate) fn identity(&self, guest: bool) -> Result<Identity> {
        let policy = &self.config.identity;
        if !policy.require_login {
            return Ok(Identity::guest());
        }
        if guest {
            if policy.allow_guest {
                return Ok(Identity::guest());
            }
            anyhow::bail!("Guest access is disabled; log in with a provisioned identity");
        }
        self.login()
    }

    /// Prompt for credentials and verify them against the directory.
    pub(crate) fn login(&self) -> Result<Identity> {
        let name = prompt_line("Identity: ")?;
        let secret = rpassword::prompt_password("Secret: ")
            .with_context(|| "Failed to read secret")?;
        self.directory()
            .verify(&name, &secret)?
            .ok_or_else(|| anyhow::anyhow!("Access denied: identity or secret mismatch"))
    }
}

/// Read one trimmed line from stdin after printing `label`.
pub(crate) fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .with_context(|| "Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Cancellation token tripped by Ctrl+C until dropped.
pub(crate) struct CtrlCCancel {
    token: CancellationToken,
    watcher: JoinHandle<()>,
}

impl CtrlCCancel {
    pub(crate) fn arm() -> Self {
        let token = CancellationToken::new();
        let watcher = tokio::spawn({
            let token = token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            }
        });
        Self { token, watcher }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CtrlCCancel {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Run `prompt` and add it to `user`'s history once an answer arrives.
///
/// Cancelled and failed requests leave the history untouched.
pub(crate) async fn query_and_record(
    gateway: &PromptGateway,
    history: &HistoryRegistry,
    user: &str,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<QueryResponse, GatewayError> {
    let response = gateway.query(prompt, Some(cancel)).await?;
    if let Err(e) = history.record(user, prompt) {
        warn!(error = %e, "Failed to record history");
    }
    Ok(response)
}

/// Answer text followed by numbered sources.
pub(crate) fn render_response(response: &QueryResponse) -> String {
    let mut out = response.text.trim_end().to_string();
    if !response.citations.is_empty() {
        out.push_str("\n\nSources:");
        for (i, citation) in response.citations.iter().enumerate() {
            out.push_str(&format!("\n  [{}] {} <{}>", i + 1, citation.title, citation.uri));
        }
    }
    if response.cached {
        out.push_str("\n(cached)");
    }
    out
}

/// User-facing line for a failed request.
pub(crate) fn render_error(err: &GatewayError) -> String {
    match err {
        GatewayError::Cancelled => "Request cancelled.".to_string(),
        GatewayError::BackendFailure(msg) => format!("Backend unavailable: {}", msg),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prompt_gateway::clock::ManualClock;
    use prompt_gateway::store::MemoryStore;
    use prompt_gateway::{Citation, GenerateRequest, GenerateResponse, GenerativeBackend, Persona};

    struct FixedBackend(Option<&'static str>);

    #[async_trait]
    impl GenerativeBackend for FixedBackend {
        async fn generate(&self, _request: GenerateRequest) -> prompt_gateway::Result<GenerateResponse> {
            match self.0 {
                Some(text) => Ok(GenerateResponse::text(text)),
                None => Err(GatewayError::BackendFailure("unreachable host".into())),
            }
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn wiring(backend: FixedBackend) -> (PromptGateway, HistoryRegistry) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        (
            PromptGateway::with_clock(Arc::new(backend), Persona::default(), clock.clone()),
            HistoryRegistry::new(store, clock),
        )
    }

    #[tokio::test]
    async fn test_answered_prompt_is_recorded() {
        let (gateway, history) = wiring(FixedBackend(Some("answer")));
        let token = CancellationToken::new();
        query_and_record(&gateway, &history, "guest", "explain lifetimes", &token)
            .await
            .unwrap();
        let recent = history.recent("guest", 15).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "explain lifetimes");
    }

    #[tokio::test]
    async fn test_failed_prompt_is_not_recorded() {
        let (gateway, history) = wiring(FixedBackend(None));
        let token = CancellationToken::new();
        let err = query_and_record(&gateway, &history, "guest", "down?", &token)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BackendFailure(_)));
        assert!(history.recent("guest", 15).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_prompt_is_not_recorded() {
        let (gateway, history) = wiring(FixedBackend(Some("answer")));
        let token = CancellationToken::new();
        token.cancel();
        let err = query_and_record(&gateway, &history, "guest", "stop", &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(history.recent("guest", 15).unwrap().is_empty());
    }

    #[test]
    fn test_render_response_lists_sources() {
        let response = QueryResponse {
            text: "Answer\n".into(),
            citations: vec![
                Citation {
                    title: "A".into(),
                    uri: "https://a".into(),
                },
                Citation {
                    title: "B".into(),
                    uri: "https://b".into(),
                },
            ],
            cached: true,
        };
        assert_eq!(
            render_response(&response),
            "Answer\n\nSources:\n  [1] A <https://a>\n  [2] B <https://b>\n(cached)"
        );
    }

    #[test]
    fn test_render_response_without_sources() {
        let response = QueryResponse {
            text: "Only text".into(),
            citations: vec![],
            cached: false,
        };
        assert_eq!(render_response(&response), "Only text");
    }

    #[test]
    fn test_render_error() {
        assert_eq!(render_error(&GatewayError::Cancelled), "Request cancelled.");
        assert!(render_error(&GatewayError::BackendFailure("x".into())).contains("x"));
    }
}
