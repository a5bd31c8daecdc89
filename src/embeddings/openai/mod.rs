
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS, EmbeddingProvider, request_with_retry};
use crate::config::Config;
use crate::{RagError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// Embedding provider backed by the OpenAI embeddings API (or a compatible
/// endpoint via `openai.base_url`).
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    base_url: Url,
    api_key: String,
    organization: Option<String>,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base = config
            .openai
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE);
        // A trailing slash matters for Url::join
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|_| RagError::Config(format!("Invalid API base URL: {}", base)))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.openai.api_key.clone(),
            organization: config.openai.organization.clone(),
            model: config.embedding.openai_model.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Requesting OpenAI embedding for text (length: {})",
            text.len()
        );

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let url = self
            .base_url
            .join("embeddings")
            .map_err(|e| RagError::Embedding(format!("Failed to build embeddings URL: {}", e)))?;

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {}", e)))?;

        let response_text = request_with_retry(self.retry_attempts, || {
            let mut req = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", &format!("Bearer {}", self.api_key));
            if let Some(org) = &self.organization {
                req = req.header("OpenAI-Organization", org);
            }
            req.send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("Response contained no embeddings".to_string()))?;

        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}
