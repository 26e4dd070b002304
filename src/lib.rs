//! Cached, cancellable prompt gateway for Gemini with search-grounded citations.
//!
//! The core is [`PromptGateway`]: a cache-or-fetch wrapper around a
//! [`GenerativeBackend`] with a fixed one-hour TTL and cooperative
//! cancellation through [`tokio_util::sync::CancellationToken`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use prompt_gateway::{Config, GeminiProvider, Persona, PromptGateway};
//!
//! # async fn run() -> prompt_gateway::Result<()> {
//! let config = Config::load()?;
//! let backend = Arc::new(GeminiProvider::from_config(&config.gemini)?);
//! let gateway = PromptGateway::new(backend, config.persona.clone());
//! let answer = gateway.query("Explain Rust lifetimes", None).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```
//!
//! Supporting modules provide an injected key-value [`store`], a per-user
//! [`history`] registry and a hashed-secret [`identity`] directory for the
//! command-line front-end.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod identity;
pub mod persona;
pub mod providers;
pub mod store;

pub use cache::{CacheEntry, CacheKey, CacheStats, ResponseCache, CACHE_TTL_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{GatewayError, Result};
pub use gateway::{Citation, PromptGateway, QueryResponse};
pub use persona::Persona;
pub use providers::{
    GeminiProvider, GenerateRequest, GenerateResponse, GenerativeBackend, GroundingChunk,
    SamplingConfig, WebSource,
};
