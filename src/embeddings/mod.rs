// Embedding provider module
// Turns text into fixed-length vectors via a local or remote model

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, EmbeddingBackend};
use crate::{RagError, Result};

pub use ollama::OllamaEmbeddings;
pub use openai::OpenAiEmbeddings;

/// Converts text into a fixed-length numeric vector. The output dimension is
/// fixed per provider+model configuration; the ingestor derives the collection
/// dimension from the first embedding it sees.
///
/// Ingest-time and query-time must use the same provider; vectors from
/// different providers live in different spaces, and no runtime check guards
/// against mixing them.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the configured embedding provider.
#[inline]
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding.provider {
        EmbeddingBackend::Openai => Ok(Arc::new(OpenAiEmbeddings::new(config)?)),
        EmbeddingBackend::Ollama => Ok(Arc::new(OllamaEmbeddings::new(config)?)),
    }
}

pub(crate) const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Issue an HTTP request, retrying transport failures and 5xx responses with
/// exponential backoff. Client errors fail immediately.
pub(crate) fn request_with_retry<F>(attempts: u32, mut request_fn: F) -> Result<String>
where
    F: FnMut() -> std::result::Result<String, ureq::Error>,
{
    let mut last_error = None;

    for attempt in 1..=attempts {
        debug!("HTTP request attempt {}/{}", attempt, attempts);

        match request_fn() {
            Ok(response_text) => {
                debug!("Request succeeded on attempt {}", attempt);
                return Ok(response_text);
            }
            Err(error) => {
                let should_retry = match &error {
                    ureq::Error::StatusCode(status) => {
                        if *status >= 500 {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, attempts
                            );
                            true
                        } else {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(RagError::Embedding(format!(
                                "Client error: HTTP {}",
                                status
                            )));
                        }
                    }
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "Transport error: {}, attempt {}/{}",
                            error, attempt, attempts
                        );
                        true
                    }
                    _ => {
                        warn!("Non-retryable error: {}", error);
                        false
                    }
                };

                if !should_retry {
                    return Err(RagError::Embedding(format!("Non-retryable error: {}", error)));
                }

                last_error = Some(RagError::Embedding(format!("Request error: {}", error)));

                if attempt < attempts {
                    let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                    let delay = Duration::from_millis(delay_ms);
                    debug!("Waiting {:?} before retry", delay);
                    std::thread::sleep(delay);
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| RagError::Embedding("Request failed after retries".to_string())))
}
