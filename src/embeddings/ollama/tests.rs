use super::*;
use crate::config::Config;

#[test]
fn client_configuration() {
    let mut config = Config::default();
    config.embedding.ollama.host = "test-host".to_string();
    config.embedding.ollama.port = 1234;
    config.embedding.ollama.model = "test-model".to_string();

    let client = OllamaEmbeddings::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = Config::default();
    let client = OllamaEmbeddings::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    // Note: timeout is part of the agent configuration
    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn invalid_config_rejected() {
    let mut config = Config::default();
    config.embedding.ollama.protocol = "ftp".to_string();

    assert!(OllamaEmbeddings::new(&config).is_err());
}
