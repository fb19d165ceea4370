//! # Knowledge Indexer
//!
//! Run configuration, repository access and the end-to-end extraction pipeline.
//!
//! ## Pipeline
//!
//! ```text
//! Repository (git clone --depth 1, or an existing checkout)
//!     │
//!     ├──> File Scanner (.gitignore aware, .java by default)
//!     │      └─> Sorted source files
//!     │
//!     ├──> JavaAstAnalyzer
//!     │      └─> ParsedFile[] + ParseFailure[]
//!     │
//!     ├──> StructuralChunker ──> SummarizationOrchestrator (skipped on dry run)
//!     │
//!     ├──> KnowledgeAssembler (+ narrative overview)
//!     │
//!     └──> OutputSerializer ──> JSON file, VectorSink
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use knowledge_indexer::{ExtractorConfig, KnowledgeExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExtractorConfig {
//!         repo_path: "checkout".into(),
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!     let outcome = KnowledgeExtractor::new(config)?.run().await?;
//!
//!     println!("{} records written to {}", outcome.graph.records.len(), outcome.output_file.display());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pipeline;
mod repository;
mod scanner;
mod stats;

pub use config::{
    ConfigError, ConfigOverrides, ExtractorConfig, DEFAULT_OUTPUT_FILE, DEFAULT_REPO_PATH,
    DEFAULT_STORE_DIR,
};
pub use error::{IndexerError, Result};
pub use pipeline::{KnowledgeExtractor, RunOutcome, DRY_RUN_REASON};
pub use repository::{RepositoryError, RepositoryFetcher};
pub use scanner::{FileScanner, ScanOptions};
pub use stats::RunStats;
