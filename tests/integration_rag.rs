#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use std::path::PathBuf;
use std::sync::Arc;

use ragchat::chat::history::ConversationLog;
use ragchat::chat::{ChatOptions, ConversationClient};
use ragchat::embeddings::EmbeddingProvider;
use ragchat::ingest::{IngestError, IngestOptions, Ingestor};
use ragchat::llm::{ChatMessage, LanguageModel};
use ragchat::retrieval::Retriever;
use ragchat::store::lancedb::LanceStore;
use ragchat::store::{MetricType, VectorStore};
use ragchat::tools::ToolRegistry;
use ragchat::Result;
use tempfile::TempDir;

/// Letter-frequency embedding. Crude, but deterministic and close enough to
/// a semantic space for chunks with distinctive vocabulary.
struct LetterFrequencyEmbedder;

impl EmbeddingProvider for LetterFrequencyEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut counts = vec![0.0f32; 26];
        let mut total = 0.0f32;
        for c in text.chars() {
            if c.is_ascii_alphabetic() {
                let index = (c.to_ascii_lowercase() as u8 - b'a') as usize;
                if let Some(slot) = counts.get_mut(index) {
                    *slot += 1.0;
                    total += 1.0;
                }
            }
        }
        if total > 0.0 {
            for value in &mut counts {
                *value /= total;
            }
        }
        Ok(counts)
    }
}

/// Model that answers with a fixed reply and exposes the last prompt it saw.
struct EchoLastMessage;

impl LanguageModel for EchoLastMessage {
    fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        let last = messages.last().map_or_else(String::new, |m| m.content.clone());
        Ok(format!("MODEL SAW: {last}"))
    }
}

/// Three 100-character sections, one with distinctive z-heavy vocabulary.
/// Chunked at 100 with no overlap, each section lands in its own chunk.
fn fixture_document(dir: &TempDir) -> PathBuf {
    let mut text = String::new();
    let sections = [
        "the weather report said it would rain on tuesday and wednesday across most regions",
        "zyzzyva zealots organize jazz pizzazz puzzles at the zigzag bazaar every hazy midday",
        "a simple recipe needs flour butter sugar eggs and a warm oven to bake a sponge cake",
    ];
    for section in sections {
        let mut line = section.to_string();
        while line.chars().count() < 100 {
            line.push(' ');
        }
        text.push_str(&line);
    }

    let path = dir.path().join("corpus.txt");
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn ingest_retrieve_and_chat_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        LanceStore::connect(dir.path().join("vectors"), MetricType::L2)
            .await
            .unwrap(),
    );
    let embedder = Arc::new(LetterFrequencyEmbedder);
    let document = fixture_document(&dir);

    // Ingest
    let ingestor = Ingestor::new(
        Arc::clone(&store) as Arc<dyn VectorStore>,
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        "docs",
    );
    let options = IngestOptions {
        chunk_size: 100,
        chunk_overlap: 0,
        force_rebuild: false,
    };
    let rows = ingestor.ingest(&document, &options).await.unwrap();
    assert_eq!(rows, 3);
    assert_eq!(store.stats("docs").await.unwrap().row_count, 3);

    // Retrieval finds the distinctively-worded section first
    let retriever = Retriever::new(
        Arc::clone(&store) as Arc<dyn VectorStore>,
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
        "docs",
        1,
    );
    let context = retriever
        .retrieve_context("zigzag jazz pizzazz puzzle")
        .await
        .unwrap();
    assert!(context.contains("zyzzyva"));

    // Full conversation path: the model sees the retrieved context and the
    // exchange is persisted
    let retriever = Retriever::new(store, embedder, "docs", 1);
    let log_path = dir.path().join("memory.json");
    let mut client = ConversationClient::new(
        Arc::new(EchoLastMessage),
        Some(retriever),
        ToolRegistry::with_builtins(),
        ConversationLog::load(&log_path).unwrap(),
        ChatOptions::default(),
    );

    let response = client.send("tell me about zigzag jazz pizzazz").await.unwrap();
    assert!(response.contains("Context:"));
    assert!(response.contains("zyzzyva"));

    let log = ConversationLog::load(&log_path).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log.exchanges()[0].prompt, "tell me about zigzag jazz pizzazz");
}

#[tokio::test]
async fn repeated_ingest_short_circuits_but_still_requires_the_source() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        LanceStore::connect(dir.path().join("vectors"), MetricType::L2)
            .await
            .unwrap(),
    );
    let embedder = Arc::new(LetterFrequencyEmbedder);
    let document = fixture_document(&dir);

    let ingestor = Ingestor::new(store, embedder, "docs");
    let options = IngestOptions {
        chunk_size: 100,
        chunk_overlap: 0,
        force_rebuild: false,
    };

    let first = ingestor.ingest(&document, &options).await.unwrap();
    let second = ingestor.ingest(&document, &options).await.unwrap();
    assert_eq!(first, second);

    // A missing source fails even though the collection already exists.
    std::fs::remove_file(&document).unwrap();
    let err = ingestor.ingest(&document, &options).await.unwrap_err();
    assert!(matches!(
        err,
        ragchat::RagError::Ingest(IngestError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn tool_commands_bypass_retrieval_and_model() {
    let dir = TempDir::new().unwrap();
    let mut client = ConversationClient::new(
        Arc::new(EchoLastMessage),
        None,
        ToolRegistry::with_builtins(),
        ConversationLog::load(dir.path().join("memory.json")).unwrap(),
        ChatOptions::default(),
    );

    let response = client.send("/date").await.unwrap();
    assert!(response.contains("Current date and time:"));
    assert!(!response.contains("MODEL SAW:"));

    let response = client.send("/help").await.unwrap();
    assert!(response.contains("/date"));
    assert!(response.contains("/ask"));

    let response = client.send("/bogus").await.unwrap();
    assert!(response.contains("/bogus"));

    assert!(client.log().is_empty());
}
