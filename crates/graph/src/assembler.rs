use crate::types::{KnowledgeGraph, KnowledgeRecord, MethodRecord, ProjectOverview, SummaryState};
use knowledge_chunker::{round2, ChunkPlan, ComplexityAnalyzer};
use knowledge_protocol::{EntityKind, EntityRef, ParseFailure, ParsedEntity};
use knowledge_summarizer::SummaryResult;
use std::collections::{BTreeSet, HashMap, HashSet};

const UNRESOLVED: &str = "unresolved";

/// Folds chunk summaries and local metrics back onto their entities
#[derive(Debug, Clone, Default)]
pub struct KnowledgeAssembler {
    /// When set, summaries were never requested and every record is unavailable for this reason
    skipped_reason: Option<String>,
}

impl KnowledgeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembler for runs that never call the model
    #[must_use]
    pub fn without_summaries(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
        }
    }

    /// Build one record per entity, in discovery order, plus the project overview.
    ///
    /// `results` may be incomplete or unordered; a chunk with no result counts as failed.
    #[must_use]
    pub fn assemble(
        &self,
        entities: &[ParsedEntity],
        plan: &ChunkPlan,
        results: &[SummaryResult],
        parse_failures: Vec<ParseFailure>,
    ) -> KnowledgeGraph {
        let by_chunk: HashMap<usize, &SummaryResult> =
            results.iter().map(|r| (r.chunk_index(), r)).collect();

        let records: Vec<KnowledgeRecord> = entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                let entity_ref = EntityRef::new(index, entity.qualified_name.clone());
                let chunks = plan.chunks_for(&entity_ref);
                let summary = match &self.skipped_reason {
                    Some(reason) => SummaryState::Unavailable {
                        reason: reason.clone(),
                    },
                    None => merge_summary(&entity_ref, &chunks, &by_chunk),
                };
                build_record(entity_ref, entity, summary, chunks)
            })
            .collect();

        let overview = build_overview(&records);
        log::info!(
            "assembled {} records ({} classes, {} interfaces, {} enums, {} methods)",
            overview.entity_count,
            overview.class_count,
            overview.interface_count,
            overview.enum_count,
            overview.method_count
        );

        KnowledgeGraph {
            records,
            overview,
            parse_failures,
        }
    }
}

fn build_record(
    entity_ref: EntityRef,
    entity: &ParsedEntity,
    summary: SummaryState,
    chunks: Vec<usize>,
) -> KnowledgeRecord {
    let metrics = ComplexityAnalyzer::analyze_entity(entity);
    let methods = entity
        .methods
        .iter()
        .zip(metrics.methods.iter())
        .map(|(method, m)| MethodRecord {
            name: method.name.clone(),
            signature: method.signature(),
            parameters: method.parameters.clone(),
            return_type: method.return_type.clone(),
            modifiers: method.modifiers.clone(),
            is_constructor: method.is_constructor,
            metrics: *m,
            span: method.span,
        })
        .collect();

    KnowledgeRecord {
        entity: entity_ref,
        name: entity.name.clone(),
        qualified_name: entity.qualified_name.clone(),
        kind: entity.kind,
        package: entity.package.clone(),
        superclass: entity.superclass.clone(),
        interfaces: entity.interfaces.clone(),
        modifiers: entity.modifiers.clone(),
        imports: entity.imports.iter().cloned().collect(),
        fields: entity.fields.clone(),
        methods,
        metrics: metrics.class,
        summary,
        location: entity.location.clone(),
        chunks,
    }
}

/// Merge contributions in chunk-index order, dropping paragraphs already seen.
fn merge_summary(
    entity: &EntityRef,
    chunks: &[usize],
    results: &HashMap<usize, &SummaryResult>,
) -> SummaryState {
    let mut merged = ParagraphMerger::default();
    let mut failures: Vec<String> = Vec::new();
    let mut succeeded = 0usize;

    for &index in chunks {
        match results.get(&index) {
            Some(SummaryResult::Success { summary, .. }) => {
                succeeded += 1;
                if let Some(text) = summary.text_for(&entity.qualified_name) {
                    merged.push(text);
                }
            }
            Some(SummaryResult::Failure {
                kind,
                message,
                attempts,
                ..
            }) => {
                failures.push(format!(
                    "chunk {index}: {kind} after {attempts} attempt(s): {message}"
                ));
            }
            None => failures.push(format!("chunk {index}: {UNRESOLVED}")),
        }
    }

    let text = merged.finish();
    match (failures.is_empty(), text.is_empty()) {
        (true, false) => SummaryState::Summarized { text },
        (true, true) => SummaryState::Unavailable {
            reason: format!("model returned no summary across {succeeded} chunk(s)"),
        },
        (false, false) => SummaryState::Partial {
            text,
            reason: failures.join("; "),
        },
        (false, true) => SummaryState::Unavailable {
            reason: failures.join("; "),
        },
    }
}

#[derive(Default)]
struct ParagraphMerger {
    seen: HashSet<String>,
    paragraphs: Vec<String>,
}

impl ParagraphMerger {
    fn push(&mut self, text: &str) {
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            let key = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
            if self.seen.insert(key) {
                self.paragraphs.push(paragraph.to_string());
            }
        }
    }

    fn finish(self) -> String {
        self.paragraphs.join("\n\n")
    }
}

fn build_overview(records: &[KnowledgeRecord]) -> ProjectOverview {
    let count = |kind: EntityKind| records.iter().filter(|r| r.kind == kind).count();
    let with_methods: Vec<f64> = records
        .iter()
        .filter(|r| r.metrics.method_count > 0)
        .map(|r| r.metrics.average_complexity)
        .collect();
    let average_complexity = if with_methods.is_empty() {
        0.0
    } else {
        round2(with_methods.iter().sum::<f64>() / with_methods.len() as f64)
    };

    ProjectOverview {
        entity_count: records.len(),
        class_count: count(EntityKind::Class),
        interface_count: count(EntityKind::Interface),
        enum_count: count(EntityKind::Enum),
        method_count: records.iter().map(|r| r.metrics.method_count).sum(),
        total_complexity: records.iter().map(|r| r.metrics.total_complexity).sum(),
        average_complexity,
        packages: records
            .iter()
            .filter_map(|r| r.package.clone())
            .collect::<BTreeSet<_>>(),
        summary: None,
    }
}
