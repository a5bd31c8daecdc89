#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::settings::{Config, EmbeddingBackend, OllamaConfig};
use super::get_config_dir;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 ragchat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Language Model").bold().yellow());
    eprintln!("Configure the OpenAI-compatible chat API used for answers.");
    eprintln!();
    configure_openai(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Embeddings").bold().yellow());
    configure_embeddings(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config)?;

    if config.embedding.provider == EmbeddingBackend::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());
        if test_ollama_connection(&config.embedding.ollama) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before indexing.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Language Model:").bold().yellow());
    eprintln!("  Model: {}", style(&config.openai.model).cyan());
    eprintln!(
        "  API key: {}",
        if config.openai.api_key.is_empty() {
            style("(not set)").red()
        } else {
            style("(set)").green()
        }
    );
    if let Some(base_url) = &config.openai.base_url {
        eprintln!("  Base URL: {}", style(base_url).cyan());
    }
    eprintln!("  Max tokens: {}", style(config.openai.max_tokens).cyan());

    eprintln!();
    eprintln!("{}", style("Embeddings:").bold().yellow());
    match config.embedding.provider {
        EmbeddingBackend::Openai => {
            eprintln!("  Provider: {}", style("openai").cyan());
            eprintln!("  Model: {}", style(&config.embedding.openai_model).cyan());
        }
        EmbeddingBackend::Ollama => {
            eprintln!("  Provider: {}", style("ollama").cyan());
            eprintln!("  Model: {}", style(&config.embedding.ollama.model).cyan());
            match config.embedding.ollama.ollama_url() {
                Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
                Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
            }
        }
    }

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Enabled: {}", style(config.retrieval.enabled).cyan());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  History with context: {}",
        style(config.retrieval.history_with_context).cyan()
    );
    eprintln!(
        "  Collection: {}",
        style(&config.store.collection_name).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Document:").bold().yellow());
    match &config.document.path {
        Some(path) => eprintln!("  Path: {}", style(path.display()).cyan()),
        None => eprintln!("  Path: {}", style("(not set)").dim()),
    }
    eprintln!("  Chunk size: {}", style(config.document.chunk_size).cyan());
    eprintln!(
        "  Chunk overlap: {}",
        style(config.document.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    Config::load(&config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.clone(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_openai(config: &mut Config) -> Result<()> {
    let api_key: String = Input::new()
        .with_prompt("OpenAI API key")
        .default(config.openai.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    let base_url: String = Input::new()
        .with_prompt("API base URL (empty for api.openai.com)")
        .default(config.openai.base_url.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(config.openai.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.openai.api_key = api_key;
    config.openai.base_url = if base_url.trim().is_empty() {
        None
    } else {
        Some(base_url)
    };
    config.openai.model = model;

    Ok(())
}

fn configure_embeddings(config: &mut Config) -> Result<()> {
    let providers = &["ollama", "openai"];
    let default_index = match config.embedding.provider {
        EmbeddingBackend::Ollama => 0,
        EmbeddingBackend::Openai => 1,
    };

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(providers)
        .interact()?;

    if provider_index == 1 {
        config.embedding.provider = EmbeddingBackend::Openai;
        let model: String = Input::new()
            .with_prompt("OpenAI embedding model")
            .default(config.embedding.openai_model.clone())
            .interact_text()?;
        config.embedding.openai_model = model;
        return Ok(());
    }

    config.embedding.provider = EmbeddingBackend::Ollama;

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(config.embedding.ollama.host.clone())
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(config.embedding.ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(config.embedding.ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.embedding.ollama.host = host;
    config.embedding.ollama.port = port;
    config.embedding.ollama.model = model;
    config.embedding.ollama.validate()?;

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    config.retrieval.enabled = Confirm::new()
        .with_prompt("Enable retrieval-augmented answers?")
        .default(config.retrieval.enabled)
        .interact()?;

    if !config.retrieval.enabled {
        return Ok(());
    }

    let top_k: usize = Input::new()
        .with_prompt("Number of chunks to retrieve (top K)")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Top K must be at least 1")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(config.store.collection_name.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Collection name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.retrieval.top_k = top_k;
    config.store.collection_name = collection;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
