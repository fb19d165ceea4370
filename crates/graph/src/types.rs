use knowledge_chunker::{ClassMetrics, MethodMetrics};
use knowledge_protocol::{
    EntityKind, EntityRef, LineSpan, Parameter, ParseFailure, ParsedField, SourceLocation,
};
use knowledge_summarizer::{OverviewPrompt, OverviewResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How much of an entity's summary survived summarization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryState {
    /// Every chunk covering the entity succeeded
    Summarized { text: String },
    /// Some chunks succeeded, some failed
    Partial { text: String, reason: String },
    /// No usable summary text
    Unavailable { reason: String },
}

impl SummaryState {
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Summarized { .. } => "summarized",
            Self::Partial { .. } => "partial",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Summarized { text } | Self::Partial { text, .. } => Some(text),
            Self::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Summarized { .. } => None,
            Self::Partial { reason, .. } | Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl From<OverviewResult> for SummaryState {
    fn from(result: OverviewResult) -> Self {
        match result {
            OverviewResult::Success { text, .. } => Self::Summarized { text },
            OverviewResult::Failure {
                kind,
                message,
                attempts,
            } => Self::Unavailable {
                reason: format!("{kind} after {attempts} attempt(s): {message}"),
            },
        }
    }
}

/// One method with its locally computed metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub signature: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub modifiers: Vec<String>,
    pub is_constructor: bool,
    pub metrics: MethodMetrics,
    pub span: LineSpan,
}

/// Final merged description of one class, interface or enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub entity: EntityRef,
    pub name: String,
    pub qualified_name: String,
    pub kind: EntityKind,
    pub package: Option<String>,
    pub superclass: Option<String>,
    /// Declaration order
    pub interfaces: Vec<String>,
    pub modifiers: Vec<String>,
    pub imports: BTreeSet<String>,
    pub fields: Vec<ParsedField>,
    /// Declaration order
    pub methods: Vec<MethodRecord>,
    pub metrics: ClassMetrics,
    pub summary: SummaryState,
    pub location: SourceLocation,
    /// Indices of the chunks whose content covered this entity
    pub chunks: Vec<usize>,
}

/// Project-wide aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectOverview {
    pub entity_count: usize,
    pub class_count: usize,
    pub interface_count: usize,
    pub enum_count: usize,
    pub method_count: usize,
    pub total_complexity: usize,
    /// Mean of per-entity average complexity over entities that declare methods
    pub average_complexity: f64,
    pub packages: BTreeSet<String>,
    /// Narrative from the overview model call, when one was made
    pub summary: Option<SummaryState>,
}

/// Everything one run learned about the repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    /// Discovery order
    pub records: Vec<KnowledgeRecord>,
    pub overview: ProjectOverview,
    pub parse_failures: Vec<ParseFailure>,
}

impl KnowledgeGraph {
    #[must_use]
    pub fn record(&self, qualified_name: &str) -> Option<&KnowledgeRecord> {
        self.records
            .iter()
            .find(|r| r.qualified_name == qualified_name)
    }

    /// Statistics for the narrative overview request
    #[must_use]
    pub fn overview_prompt(&self) -> OverviewPrompt {
        let overview = &self.overview;
        OverviewPrompt {
            total_classes: overview.class_count,
            total_interfaces: overview.interface_count,
            total_enums: overview.enum_count,
            total_methods: overview.method_count,
            avg_complexity: overview.average_complexity,
            packages: overview.packages.iter().cloned().collect(),
            class_names: self
                .records
                .iter()
                .filter(|r| r.kind == EntityKind::Class)
                .map(|r| r.name.clone())
                .collect(),
        }
    }

    pub fn set_overview_summary(&mut self, summary: SummaryState) {
        self.overview.summary = Some(summary);
    }

    /// Records per summary status: (summarized, partial, unavailable)
    #[must_use]
    pub fn summary_counts(&self) -> (usize, usize, usize) {
        self.records
            .iter()
            .fold((0, 0, 0), |(s, p, u), r| match r.summary {
                SummaryState::Summarized { .. } => (s + 1, p, u),
                SummaryState::Partial { .. } => (s, p + 1, u),
                SummaryState::Unavailable { .. } => (s, p, u + 1),
            })
    }
}
