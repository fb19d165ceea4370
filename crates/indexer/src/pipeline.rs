use crate::config::{ConfigError, ExtractorConfig};
use crate::error::{IndexerError, Result};
use crate::repository::RepositoryFetcher;
use crate::scanner::{FileScanner, ScanOptions};
use crate::stats::RunStats;
use knowledge_chunker::{ChunkerError, JavaAstAnalyzer, StructuralChunker, TokenEstimator};
use knowledge_graph::{KnowledgeAssembler, KnowledgeGraph, OutputSerializer, SerializationError};
use knowledge_protocol::{ParseFailure, ParsedEntity, ParsedFile};
use knowledge_summarizer::{GroqBackend, SummarizationOrchestrator, SummaryBackend};
use knowledge_vector_store::{documents_from_graph, JsonDocumentStore, VectorSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason recorded on every record when the model is never called
pub const DRY_RUN_REASON: &str = "dry run";

/// What one run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub graph: KnowledgeGraph,
    pub stats: RunStats,
    pub output_file: PathBuf,
    /// Values the serializer could not render; the document was still written
    pub serialization_errors: Vec<SerializationError>,
    /// Documents new or changed in the vector store, when the feed is enabled
    pub documents_changed: Option<usize>,
    pub cancelled: bool,
}

/// End-to-end pipeline: repository → parse → chunk → summarize → assemble → write
pub struct KnowledgeExtractor {
    config: ExtractorConfig,
    backend: Option<Arc<dyn SummaryBackend>>,
    sink: Option<Box<dyn VectorSink>>,
    cancel: CancellationToken,
}

impl KnowledgeExtractor {
    /// Validates the configuration; nothing touches the network or the disk yet.
    ///
    /// The API key is checked when [`run`](Self::run) starts, since an injected backend
    /// needs none.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend: None,
            sink: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `backend` instead of the configured Groq endpoint
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use `sink` instead of the JSON document store in `store_dir`
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn VectorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        let started = Instant::now();

        let backend = if self.config.summaries_enabled() {
            Some(self.summary_backend()?)
        } else {
            None
        };
        let root = self.resolve_repository().await?;
        let files = FileScanner::new(&root, ScanOptions::for_extensions(&self.config.extensions))
            .scan();
        let (parsed, failures) = parse_files(&root, &files, &self.config).await?;

        let mut stats = RunStats::from_parsed(&parsed, failures.len());
        for line in stats.to_string().lines() {
            log::info!("{line}");
        }

        let entities: Vec<ParsedEntity> = parsed.into_iter().flat_map(|f| f.entities).collect();
        if entities.is_empty() {
            log::warn!(
                "No classes, interfaces or enums found under {}",
                root.display()
            );
        }

        let chunker = StructuralChunker::new(self.config.chunker.clone())?;
        let plan = chunker.chunk(&entities);
        stats.record_plan(&plan);

        let mut graph = if let Some(backend) = backend {
            let orchestrator = SummarizationOrchestrator::new(backend, self.config.retry_policy())
                .with_redactor(self.config.redactor())
                .with_cancellation(self.cancel.clone());

            let results = orchestrator.summarize_all(&plan.chunks).await;
            let mut graph =
                KnowledgeAssembler::new().assemble(&entities, &plan, &results, failures);

            if self.config.overview_summary
                && !graph.records.is_empty()
                && !self.cancel.is_cancelled()
            {
                let overview = orchestrator
                    .summarize_overview(&graph.overview_prompt())
                    .await;
                graph.set_overview_summary(overview.into());
            }
            graph
        } else {
            log::info!("Dry run: skipping {} summarization request(s)", plan.len());
            KnowledgeAssembler::without_summaries(DRY_RUN_REASON)
                .assemble(&entities, &plan, &[], failures)
        };
        stats.record_summaries(&graph);

        let serialized = OutputSerializer::serialize(&graph)?;
        write_atomically(&self.config.output_file, serialized.json.as_bytes()).await?;
        log::info!("Results saved to {}", self.config.output_file.display());

        let documents_changed = if self.config.vector_store {
            Some(self.feed_vector_store(&graph).await?)
        } else {
            None
        };

        stats.time_ms = started.elapsed().as_millis() as u64;
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            log::warn!("Run was cancelled; output contains the results resolved so far");
        }
        log::info!(
            "Extraction complete: {} records ({} summarized, {} partial, {} unavailable), \
             {} chunks, average complexity {:.2}, {} ms",
            graph.records.len(),
            stats.summarized,
            stats.partial,
            stats.unavailable,
            stats.chunks,
            graph.overview.average_complexity,
            stats.time_ms
        );

        Ok(RunOutcome {
            graph,
            stats,
            output_file: self.config.output_file.clone(),
            serialization_errors: serialized.errors,
            documents_changed,
            cancelled,
        })
    }

    async fn resolve_repository(&self) -> Result<PathBuf> {
        match &self.config.repo_url {
            Some(url) => {
                let fetcher =
                    RepositoryFetcher::new(&self.config.repo_path, self.config.git_token.clone());
                Ok(fetcher.fetch(url, self.config.force_clone).await?)
            }
            None => {
                let path = &self.config.repo_path;
                if !path.is_dir() {
                    return Err(IndexerError::InvalidPath(format!(
                        "{} is not a directory",
                        path.display()
                    )));
                }
                log::info!("Using existing repository at {}", path.display());
                Ok(path.clone())
            }
        }
    }

    fn summary_backend(&self) -> Result<Arc<dyn SummaryBackend>> {
        if let Some(backend) = &self.backend {
            return Ok(Arc::clone(backend));
        }
        let groq = self.config.groq_config().ok_or(ConfigError::MissingApiKey)?;
        Ok(Arc::new(GroqBackend::new(groq)?))
    }

    async fn feed_vector_store(&mut self, graph: &KnowledgeGraph) -> Result<usize> {
        let mut sink: Box<dyn VectorSink> = match self.sink.take() {
            Some(sink) => sink,
            None => Box::new(JsonDocumentStore::open(&self.config.store_dir).await?),
        };
        let result = sink.ingest(documents_from_graph(graph)).await;
        self.sink = Some(sink);
        Ok(result?)
    }
}

/// Parse every file; unreadable or malformed files become [`ParseFailure`]s
async fn parse_files(
    root: &Path,
    files: &[PathBuf],
    config: &ExtractorConfig,
) -> Result<(Vec<ParsedFile>, Vec<ParseFailure>)> {
    let mut analyzer = JavaAstAnalyzer::new(TokenEstimator::new(config.chunker.model_family))?;
    let mut parsed = Vec::new();
    let mut failures = Vec::new();

    for (idx, path) in files.iter().enumerate() {
        let display = relative_path(root, path);
        log::debug!("Parsing {}/{}: {display}", idx + 1, files.len());

        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Skipping {display}: cannot read file: {e}");
                failures.push(ParseFailure {
                    path: display,
                    reason: format!("cannot read file: {e}"),
                });
                continue;
            }
        };

        match analyzer.parse(&display, &source) {
            Ok(file) if file.entities.is_empty() => {
                log::debug!("No type declarations in {display}");
            }
            Ok(file) => parsed.push(file),
            Err(e) => {
                let reason = match e {
                    ChunkerError::ParseError { message, .. } => message,
                    other => other.to_string(),
                };
                log::warn!("Skipping {display}: {reason}");
                failures.push(ParseFailure {
                    path: display,
                    reason,
                });
            }
        }
    }

    log::info!(
        "Parsed {} files with type declarations, {} skipped",
        parsed.len(),
        failures.len()
    );
    Ok((parsed, failures))
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let output_error = |source| IndexerError::Output {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(output_error)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    tokio::fs::write(&tmp, bytes).await.map_err(output_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(output_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn atomic_write_creates_parents_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("knowledge.json");
        write_atomically(&path, b"{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!tmp.path().join("out").join("knowledge.json.tmp").exists());
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_path(root, Path::new("/repo/src/shop/Order.java")),
            "src/shop/Order.java"
        );
    }
}
