use knowledge_graph::{KnowledgeGraph, KnowledgeRecord, SummaryState};
use knowledge_protocol::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OVERVIEW_DOCUMENT_ID: &str = "project_overview";

/// A text unit handed to a vector store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Stable across runs: `project_overview` or `entity:<qualified name>`
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl KnowledgeDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Document for one entity record
    #[must_use]
    pub fn from_record(record: &KnowledgeRecord) -> Self {
        let package = record.package.as_deref().unwrap_or("N/A");
        let kind_label = match record.kind {
            EntityKind::Class => "Class",
            EntityKind::Interface => "Interface",
            EntityKind::Enum => "Enum",
        };

        let mut lines = vec![
            format!("{kind_label}: {}", record.qualified_name),
            format!("Package: {package}"),
            format!("Methods: {}", record.metrics.method_count),
        ];
        if let Some(superclass) = &record.superclass {
            lines.push(format!("Extends: {superclass}"));
        }
        if !record.interfaces.is_empty() {
            let keyword = if record.kind == EntityKind::Interface {
                "Extends"
            } else {
                "Implements"
            };
            lines.push(format!("{keyword}: {}", record.interfaces.join(", ")));
        }
        for method in &record.methods {
            lines.push(format!(
                "- {} (complexity {})",
                method.signature, method.metrics.cyclomatic_complexity
            ));
        }
        lines.push(format!("Summary: {}", summary_text(&record.summary)));

        Self::new(format!("entity:{}", record.qualified_name), lines.join("\n"))
            .with_metadata("type", record.kind.as_str())
            .with_metadata("name", record.name.clone())
            .with_metadata("qualified_name", record.qualified_name.clone())
            .with_metadata("package", package)
            .with_metadata("summary_status", record.summary.status())
    }
}

fn summary_text(summary: &SummaryState) -> String {
    match summary {
        SummaryState::Summarized { text } => text.clone(),
        SummaryState::Partial { text, .. } => format!("{text} (partial)"),
        SummaryState::Unavailable { .. } => "No summary available".to_string(),
    }
}

/// Overview document (only when a narrative exists) followed by one document per record
#[must_use]
pub fn documents_from_graph(graph: &KnowledgeGraph) -> Vec<KnowledgeDocument> {
    let mut documents = Vec::with_capacity(graph.records.len() + 1);
    if let Some(text) = graph.overview.summary.as_ref().and_then(SummaryState::text) {
        documents.push(
            KnowledgeDocument::new(OVERVIEW_DOCUMENT_ID, text)
                .with_metadata("type", OVERVIEW_DOCUMENT_ID),
        );
    }
    documents.extend(graph.records.iter().map(KnowledgeDocument::from_record));
    documents
}
