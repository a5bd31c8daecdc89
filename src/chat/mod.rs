#[cfg(test)]
mod tests;

pub mod history;

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::debug;

use crate::config::settings::DEFAULT_MAX_TOKENS;
use crate::llm::{ChatMessage, LanguageModel};
use crate::retrieval::Retriever;
use crate::tools::{self, ToolRegistry};
use crate::{RagError, Result};
use history::ConversationLog;

/// Upper bound on tool-to-model forwarding hops within a single `send` call.
/// A tool whose output is itself a tool command re-enters dispatch, so a
/// self-referential tool would otherwise loop forever.
pub const MAX_TOOL_DEPTH: usize = 4;

const CONTEXT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the question using the \
     provided context. If the context does not contain the answer, say that you do not know.";

#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Include prior exchanges ahead of the retrieved context. The default
    /// keeps context-grounded questions single-shot.
    pub history_with_context: bool,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    #[inline]
    fn default() -> Self {
        Self {
            history_with_context: false,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Orchestrates one conversation: routes tool commands through the registry,
/// grounds free-text prompts in retrieved context, and persists completed
/// exchanges.
pub struct ConversationClient {
    model: Arc<dyn LanguageModel>,
    retriever: Option<Retriever>,
    registry: ToolRegistry,
    log: ConversationLog,
    options: ChatOptions,
}

impl ConversationClient {
    #[inline]
    pub fn new(
        model: Arc<dyn LanguageModel>,
        retriever: Option<Retriever>,
        registry: ToolRegistry,
        log: ConversationLog,
        options: ChatOptions,
    ) -> Self {
        Self {
            model,
            retriever,
            registry,
            log,
            options,
        }
    }

    /// Process one user input and return the reply.
    ///
    /// Inputs starting with `/` are dispatched as tool commands. A terminal
    /// tool result is returned verbatim without touching the model or the
    /// log; a model-forwarded result is re-evaluated exactly like top-level
    /// input. Free text goes to the model, and only a successful completion
    /// is appended to the conversation log.
    #[inline]
    pub async fn send(&mut self, input: &str) -> Result<String> {
        self.send_at_depth(input.to_string(), 0).await
    }

    fn send_at_depth(&mut self, input: String, depth: usize) -> BoxFuture<'_, Result<String>> {
        async move {
            if depth > MAX_TOOL_DEPTH {
                return Err(RagError::ToolRecursion(MAX_TOOL_DEPTH));
            }

            if tools::is_command(&input) {
                let result = self.registry.dispatch(&input);
                if result.requires_model {
                    debug!("Forwarding tool output to model (depth {})", depth + 1);
                    return self.send_at_depth(result.text, depth + 1).await;
                }
                return Ok(result.text);
            }

            let context = match &self.retriever {
                Some(retriever) => retriever.retrieve_context(&input).await?,
                None => String::new(),
            };

            let messages = self.assemble_messages(&input, &context);
            let response = self.model.complete(&messages, self.options.max_tokens)?;

            self.log.append(&input, &response)?;
            Ok(response)
        }
        .boxed()
    }

    /// Build the message list for one completion. With context, the question
    /// is grounded by a system instruction and the retrieved chunks; without,
    /// the full history is replayed ahead of the prompt.
    fn assemble_messages(&self, prompt: &str, context: &str) -> Vec<ChatMessage> {
        if context.is_empty() {
            let mut messages = Vec::with_capacity(self.log.len() * 2 + 1);
            for exchange in self.log.exchanges() {
                messages.push(ChatMessage::user(&exchange.prompt));
                messages.push(ChatMessage::assistant(&exchange.response));
            }
            messages.push(ChatMessage::user(prompt));
            return messages;
        }

        let mut messages = vec![ChatMessage::system(CONTEXT_SYSTEM_PROMPT)];
        if self.options.history_with_context {
            for exchange in self.log.exchanges() {
                messages.push(ChatMessage::user(&exchange.prompt));
                messages.push(ChatMessage::assistant(&exchange.response));
            }
        }
        messages.push(ChatMessage::user(format!(
            "Context:\n{context}\n\nQuestion: {prompt}"
        )));
        messages
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }
}
