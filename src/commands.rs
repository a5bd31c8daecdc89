use anyhow::Context;
use dialoguer::{Confirm, Select};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::chat::history::ConversationLog;
use crate::chat::{ChatOptions, ConversationClient};
use crate::config::{get_config_dir, Config, EmbeddingBackend};
use crate::embeddings::{provider_from_config, OllamaEmbeddings};
use crate::ingest::{IngestOptions, Ingestor};
use crate::llm::{LanguageModel, OpenAiChat};
use crate::retrieval::Retriever;
use crate::store::lancedb::LanceStore;
use crate::store::VectorStore;
use crate::tools::ToolRegistry;
use crate::{RagError, Result};

const STORE_CONNECT_ATTEMPTS: u32 = 5;
const STORE_CONNECT_DELAY: Duration = Duration::from_secs(2);

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir)?;
    config.validate().map_err(|e| RagError::Config(e.to_string()))?;
    Ok(config)
}

/// Connect to the vector store, retrying with a fixed delay so a store that
/// is still starting up gets a chance to come online.
async fn connect_store(config: &Config) -> Result<Arc<LanceStore>> {
    let path = config.vector_store_path();
    let mut last_error = None;

    for attempt in 1..=STORE_CONNECT_ATTEMPTS {
        match LanceStore::connect(&path, config.store.metric).await {
            Ok(store) => return Ok(Arc::new(store)),
            Err(e) => {
                warn!(
                    "Vector store connection attempt {}/{} failed: {}",
                    attempt, STORE_CONNECT_ATTEMPTS, e
                );
                last_error = Some(e);
                if attempt < STORE_CONNECT_ATTEMPTS {
                    tokio::time::sleep(STORE_CONNECT_DELAY).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| RagError::Connection("Vector store unreachable".to_string())))
}

async fn build_client(config: &Config) -> Result<ConversationClient> {
    let model: Arc<dyn LanguageModel> = Arc::new(OpenAiChat::new(config)?);

    let retriever = if config.retrieval.enabled {
        let store = connect_store(config).await?;
        let embedder = provider_from_config(config)?;
        Some(Retriever::new(
            store,
            embedder,
            &config.store.collection_name,
            config.retrieval.top_k,
        ))
    } else {
        None
    };

    let log = ConversationLog::load(config.conversation_log_path())?;
    let options = ChatOptions {
        history_with_context: config.retrieval.history_with_context,
        max_tokens: config.openai.max_tokens,
    };

    Ok(ConversationClient::new(
        model,
        retriever,
        ToolRegistry::with_builtins(),
        log,
        options,
    ))
}

fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Pick the document to ingest: the CLI argument wins, then the configured
/// path, then PDF discovery in the current directory.
fn resolve_document(config: &Config, document: Option<PathBuf>, auto: bool) -> Result<PathBuf> {
    if let Some(path) = document {
        return Ok(path);
    }
    if let Some(path) = &config.document.path {
        return Ok(path.clone());
    }

    let mut pdfs = find_pdf_files(Path::new("."))?;
    if pdfs.is_empty() {
        return Err(RagError::Config(
            "No document specified and no PDF files found in the current directory".to_string(),
        ));
    }
    if pdfs.len() == 1 || auto {
        return Ok(pdfs.swap_remove(0));
    }

    let names: Vec<String> = pdfs.iter().map(|p| p.display().to_string()).collect();
    let choice = Select::new()
        .with_prompt("Multiple PDF files found, pick one to ingest")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to read document selection")?;
    pdfs.into_iter()
        .nth(choice)
        .ok_or_else(|| RagError::Config("Document selection out of range".to_string()))
}

/// Ingest a document into the vector store
#[inline]
pub async fn init(
    document: Option<PathBuf>,
    force_rebuild: bool,
    yes: bool,
    auto: bool,
) -> Result<()> {
    let config = load_config()?;
    let document = resolve_document(&config, document, auto)?;
    info!("Ingesting document: {}", document.display());

    if matches!(config.embedding.provider, EmbeddingBackend::Ollama) {
        let client = OllamaEmbeddings::new(&config)?;
        client.ping()?;
        println!("✅ Ollama reachable ({})", config.embedding.ollama.model);
    }

    let store = connect_store(&config).await?;
    let collection = config.store.collection_name.clone();

    if force_rebuild && !yes && store.has_collection(&collection).await? {
        let stats = store.stats(&collection).await?;
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Collection '{}' holds {} rows and will be dropped. Continue?",
                collection, stats.row_count
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Aborted, collection left untouched.");
            return Ok(());
        }
    }

    let embedder = provider_from_config(&config)?;
    let ingestor = Ingestor::new(store, embedder, &collection);
    let options = IngestOptions {
        chunk_size: config.document.chunk_size,
        chunk_overlap: config.document.chunk_overlap,
        force_rebuild,
    };

    let rows = ingestor.ingest(&document, &options).await?;
    println!("✅ Collection '{}' ready with {} rows", collection, rows);

    Ok(())
}

/// Run the interactive chat loop
#[inline]
pub async fn chat() -> Result<()> {
    let config = load_config()?;
    let mut client = build_client(&config).await?;

    println!("Type 'quit' or 'exit' to leave the conversation");
    println!("{}", "-".repeat(50));

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        match client.send(prompt).await {
            Ok(response) => {
                println!("\nAI: {}", response);
                println!("{}", "-".repeat(50));
            }
            Err(e) => {
                error!("Failed to process message: {}", e);
                println!("\nError: {}", e);
                println!("{}", "-".repeat(50));
            }
        }
    }

    Ok(())
}

/// Send a single prompt and print the reply
#[inline]
pub async fn ask(prompt: String) -> Result<()> {
    let config = load_config()?;
    let mut client = build_client(&config).await?;

    let response = client.send(&prompt).await?;
    println!("{}", response);

    Ok(())
}

/// List the registered tool commands
#[inline]
pub fn list_tools() -> Result<()> {
    let registry = ToolRegistry::with_builtins();

    println!("Available tools ({} total):", registry.len());
    for descriptor in registry.descriptors() {
        let routing = if descriptor.requires_model {
            "forwarded to model"
        } else {
            "terminal"
        };
        println!(
            "  {} - {} ({})",
            descriptor.name, descriptor.description, routing
        );
    }

    Ok(())
}

/// Show connectivity and data status for every component
#[inline]
pub async fn show_status() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to resolve config directory")?;
    let config = Config::load(&config_dir)?;

    println!("📊 Ragchat Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    let config_path = config.config_file_path();
    if config_path.exists() {
        println!("   ✅ Loaded from {}", config_path.display());
    } else {
        println!(
            "   ⚠️  No config file at {}, using defaults",
            config_path.display()
        );
    }
    println!("   📋 Chat model: {}", config.openai.model);

    println!("🧮 Embeddings:");
    match config.embedding.provider {
        EmbeddingBackend::Ollama => match OllamaEmbeddings::new(&config) {
            Ok(client) => match client.ping() {
                Ok(()) => {
                    println!(
                        "   ✅ Ollama: Connected ({}:{})",
                        config.embedding.ollama.host, config.embedding.ollama.port
                    );
                    println!("   📋 Model: {}", config.embedding.ollama.model);
                }
                Err(e) => println!("   ❌ Ollama: Unreachable - {}", e),
            },
            Err(e) => println!("   ❌ Ollama: Invalid configuration - {}", e),
        },
        EmbeddingBackend::Openai => {
            println!("   📋 OpenAI embeddings: {}", config.embedding.openai_model);
            if config.openai.api_key.is_empty() {
                println!("   ⚠️  No API key configured");
            }
        }
    }

    println!("🗄️  Vector Store:");
    match LanceStore::connect(config.vector_store_path(), config.store.metric).await {
        Ok(store) => {
            println!(
                "   ✅ LanceDB: Connected at {}",
                config.vector_store_path().display()
            );
            let collection = &config.store.collection_name;
            if store.has_collection(collection).await? {
                let stats = store.stats(collection).await?;
                println!(
                    "   📄 Collection '{}': {} rows",
                    collection, stats.row_count
                );
            } else {
                println!(
                    "   📭 Collection '{}' does not exist yet, run 'ragchat init'",
                    collection
                );
            }
        }
        Err(e) => println!("   ❌ LanceDB: Failed to connect - {}", e),
    }

    println!("💬 Conversation Log:");
    match ConversationLog::load(config.conversation_log_path()) {
        Ok(log) => println!("   📄 {} saved exchanges", log.len()),
        Err(e) => println!("   ❌ Failed to load - {}", e),
    }

    Ok(())
}
