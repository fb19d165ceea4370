use crate::config::ConfigError;
use crate::repository::RepositoryError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] knowledge_chunker::ChunkerError),

    #[error("Summarizer error: {0}")]
    SummarizerError(#[from] knowledge_summarizer::SummarizerError),

    #[error("Graph error: {0}")]
    GraphError(#[from] knowledge_graph::GraphError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] knowledge_vector_store::VectorStoreError),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),
}
