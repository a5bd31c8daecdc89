#[cfg(test)]
mod tests;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// One completed prompt/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogFile {
    conversations: Vec<Exchange>,
}

/// Append-only conversation history backed by a JSON file.
///
/// The whole file is loaded at startup and rewritten on every append, which
/// keeps the on-disk state consistent with memory at the cost of O(n) writes.
/// Histories are small enough that this does not matter.
#[derive(Debug)]
pub struct ConversationLog {
    path: PathBuf,
    conversations: Vec<Exchange>,
}

impl ConversationLog {
    /// Load the log at `path`, starting empty if the file does not exist.
    #[inline]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let conversations = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: LogFile = serde_json::from_str(&raw).with_context(|| {
                format!("Failed to parse conversation log at {}", path.display())
            })?;
            file.conversations
        } else {
            Vec::new()
        };
        debug!(
            "Loaded {} prior exchanges from {}",
            conversations.len(),
            path.display()
        );
        Ok(Self {
            path,
            conversations,
        })
    }

    /// Record a completed exchange and rewrite the log file.
    #[inline]
    pub fn append(&mut self, prompt: impl Into<String>, response: impl Into<String>) -> Result<()> {
        self.conversations.push(Exchange {
            prompt: prompt.into(),
            response: response.into(),
        });
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = LogFile {
            conversations: self.conversations.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)
            .with_context(|| "Failed to serialize conversation log")?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn exchanges(&self) -> &[Exchange] {
        &self.conversations
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
