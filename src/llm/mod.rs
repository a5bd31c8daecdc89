
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{RagError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Contract for the external language-model capability. A single completion
/// attempt; quota, auth, and network failures surface as
/// [`RagError::LanguageModel`] and are not retried.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String>;
}

/// Chat-completions client for the OpenAI API or a compatible endpoint.
pub struct OpenAiChat {
    base_url: Url,
    api_key: String,
    organization: Option<String>,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiChat {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base = config
            .openai
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE);
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
            model: config.openai.model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for OpenAiChat {
    #[inline]
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        debug!(
            "Requesting chat completion ({} messages, model: {})",
            messages.len(),
            self.model
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let url = self.base_url.join("chat/completions").map_err(|e| {
            RagError::LanguageModel(format!("Failed to build completions URL: {}", e))
        })?;

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::LanguageModel(format!("Failed to serialize request: {}", e)))?;

        let mut req = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key));
        if let Some(org) = &self.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response_text = req
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::LanguageModel(format!("API call failed: {}", e)))?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::LanguageModel(format!("Failed to parse response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                RagError::LanguageModel("Response contained no choices".to_string())
            })?;

        debug!("Received completion ({} chars)", answer.len());
        Ok(answer)
    }
}
