use super::load_existing_config as load_existing_config_impl;
use crate::config::EmbeddingBackend;

#[test]
fn load_existing_config() {
    let config = load_existing_config_impl().expect("config loaded successfully");
    assert!(!config.openai.model.is_empty());
    assert!(!config.store.collection_name.is_empty());
    assert!(config.retrieval.top_k > 0);
    assert!(matches!(
        config.embedding.provider,
        EmbeddingBackend::Ollama | EmbeddingBackend::Openai
    ));
}
