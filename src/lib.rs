use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Tool forwarding exceeded maximum depth of {0}")]
    ToolRecursion(usize),

    #[error(transparent)]
    Ingest(#[from] ingest::IngestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chat;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod llm;
pub mod retrieval;
pub mod store;
pub mod tools;
