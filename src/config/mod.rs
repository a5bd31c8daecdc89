// Configuration management module
// TOML settings plus the interactive setup flow

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DocumentConfig, EmbeddingBackend, EmbeddingConfig, OllamaConfig,
    OpenAiConfig, RetrievalConfig, StoreConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("ragchat"))
        .ok_or_else(|| {
            ConfigError::Io(std::io::Error::other(
                "could not determine platform config directory",
            ))
        })
}
