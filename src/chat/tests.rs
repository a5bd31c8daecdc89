use super::*;
use crate::config::settings::DEFAULT_TOP_K;
use crate::embeddings::EmbeddingProvider;
use crate::llm::Role;
use crate::store::lancedb::LanceStore;
use crate::store::{ChunkRecord, MetricType, VectorStore};
use crate::tools::Tool;
use std::sync::Mutex;
use tempfile::TempDir;

/// Records every message list it is asked to complete.
struct FakeModel {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    response: String,
}

impl FakeModel {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            response: response.to_string(),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

impl LanguageModel for FakeModel {
    fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self.response.clone())
    }
}

struct FailingModel;

impl LanguageModel for FailingModel {
    fn complete(&self, _messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        Err(RagError::LanguageModel("quota exhausted".to_string()))
    }
}

struct ConstEmbedder;

impl EmbeddingProvider for ConstEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

/// Tool whose output is itself a tool command, forwarded to the model path.
struct LoopTool;

impl Tool for LoopTool {
    fn name(&self) -> &'static str {
        "/loop"
    }

    fn description(&self) -> &'static str {
        "forwards to itself forever"
    }

    fn requires_model(&self) -> bool {
        true
    }

    fn execute(&self, _query: &str, _registry: &ToolRegistry) -> String {
        "/loop".to_string()
    }
}

fn empty_log(dir: &TempDir) -> ConversationLog {
    ConversationLog::load(dir.path().join("memory.json")).unwrap()
}

fn seeded_log(dir: &TempDir) -> ConversationLog {
    let mut log = empty_log(dir);
    log.append("earlier question", "earlier answer").unwrap();
    log
}

async fn seeded_retriever(dir: &TempDir) -> Retriever {
    let store = LanceStore::connect(dir.path().join("vectors"), MetricType::L2)
        .await
        .unwrap();
    store.create_collection("docs", 3).await.unwrap();
    store
        .insert(
            "docs",
            vec![ChunkRecord {
                id: 0,
                vector: vec![1.0, 0.0, 0.0],
                text: "rust guarantees memory safety".into(),
            }],
        )
        .await
        .unwrap();
    Retriever::new(
        Arc::new(store),
        Arc::new(ConstEmbedder),
        "docs",
        DEFAULT_TOP_K,
    )
}

#[tokio::test]
async fn free_text_without_retrieval_replays_history() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("the answer");
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        None,
        ToolRegistry::with_builtins(),
        seeded_log(&dir),
        ChatOptions::default(),
    );

    let response = client.send("next question").await.unwrap();
    assert_eq!(response, "the answer");

    let messages = model.last_messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "earlier question");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[2].content, "next question");

    assert_eq!(client.log().len(), 2);
    assert_eq!(client.log().exchanges()[1].response, "the answer");
}

#[tokio::test]
async fn context_prompt_is_single_shot_by_default() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("grounded answer");
    let retriever = seeded_retriever(&dir).await;
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        Some(retriever),
        ToolRegistry::with_builtins(),
        seeded_log(&dir),
        ChatOptions::default(),
    );

    client.send("what does rust guarantee?").await.unwrap();

    let messages = model.last_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.contains("Context:"));
    assert!(messages[1].content.contains("rust guarantees memory safety"));
    assert!(messages[1].content.contains("what does rust guarantee?"));
}

#[tokio::test]
async fn history_with_context_includes_prior_turns() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("grounded answer");
    let retriever = seeded_retriever(&dir).await;
    let options = ChatOptions {
        history_with_context: true,
        ..ChatOptions::default()
    };
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        Some(retriever),
        ToolRegistry::with_builtins(),
        seeded_log(&dir),
        options,
    );

    client.send("what does rust guarantee?").await.unwrap();

    let messages = model.last_messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content, "earlier question");
    assert_eq!(messages[2].content, "earlier answer");
    assert!(messages[3].content.contains("Context:"));
}

#[tokio::test]
async fn terminal_tool_skips_model_and_log() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("unused");
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        None,
        ToolRegistry::with_builtins(),
        empty_log(&dir),
        ChatOptions::default(),
    );

    let response = client.send("/date").await.unwrap();
    assert!(response.contains("Current date and time:"));
    assert_eq!(model.call_count(), 0);
    assert!(client.log().is_empty());
}

#[tokio::test]
async fn unknown_tool_is_terminal() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("unused");
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        None,
        ToolRegistry::with_builtins(),
        empty_log(&dir),
        ChatOptions::default(),
    );

    let response = client.send("/frobnicate now").await.unwrap();
    assert!(response.contains("/frobnicate"));
    assert_eq!(model.call_count(), 0);
    assert!(client.log().is_empty());
}

#[tokio::test]
async fn forwarded_tool_output_reaches_model() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("rust is a language");
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        None,
        ToolRegistry::with_builtins(),
        empty_log(&dir),
        ChatOptions::default(),
    );

    let response = client.send("/ask what is rust").await.unwrap();
    assert_eq!(response, "rust is a language");
    assert_eq!(model.call_count(), 1);

    let messages = model.last_messages();
    assert_eq!(messages.last().unwrap().content, "what is rust");

    // The forwarded prompt, not the slash command, is persisted.
    assert_eq!(client.log().exchanges()[0].prompt, "what is rust");
}

#[tokio::test]
async fn self_forwarding_tool_hits_depth_guard() {
    let dir = TempDir::new().unwrap();
    let model = FakeModel::new("unused");
    let mut registry = ToolRegistry::with_builtins();
    registry.register(Box::new(LoopTool));
    let mut client = ConversationClient::new(
        Arc::clone(&model) as Arc<dyn LanguageModel>,
        None,
        registry,
        empty_log(&dir),
        ChatOptions::default(),
    );

    let err = client.send("/loop").await.unwrap_err();
    assert!(matches!(err, RagError::ToolRecursion(MAX_TOOL_DEPTH)));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn model_failure_persists_nothing() {
    let dir = TempDir::new().unwrap();
    let mut client = ConversationClient::new(
        Arc::new(FailingModel),
        None,
        ToolRegistry::with_builtins(),
        empty_log(&dir),
        ChatOptions::default(),
    );

    let err = client.send("doomed question").await.unwrap_err();
    assert!(matches!(err, RagError::LanguageModel(_)));
    assert!(client.log().is_empty());
}
