use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::tokens::TokenEstimator;
use crate::types::{Chunk, ChunkOverflowWarning, ChunkPlan, Fragment, FragmentKind, OverlapContext};
use knowledge_protocol::{EntityRef, ParsedEntity, ParsedMethod};
use std::fmt::Write as _;

/// Packs entity headers and methods into token-bounded chunks
pub struct StructuralChunker {
    config: ChunkerConfig,
    estimator: TokenEstimator,
}

impl StructuralChunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        let estimator = TokenEstimator::new(config.model_family);
        Ok(Self { config, estimator })
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub const fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Flatten entities into fragments: each header followed by its methods, in discovery order
    #[must_use]
    pub fn fragments(&self, entities: &[ParsedEntity]) -> Vec<Fragment> {
        let mut out = Vec::new();
        for (index, entity) in entities.iter().enumerate() {
            let entity_ref = EntityRef::new(index, entity.qualified_name.clone());

            let header = self.render_header(entity);
            out.push(Fragment {
                entity: entity_ref.clone(),
                kind: FragmentKind::Header,
                tokens: self.estimator.estimate(&header),
                text: header,
            });

            for (method_index, method) in entity.methods.iter().enumerate() {
                let text = render_method(entity, method);
                out.push(Fragment {
                    entity: entity_ref.clone(),
                    kind: FragmentKind::Method {
                        index: method_index,
                        name: method.name.clone(),
                    },
                    tokens: self.estimator.estimate(&text),
                    text,
                });
            }
        }
        out
    }

    /// Chunk the full ordered entity sequence
    #[must_use]
    pub fn chunk(&self, entities: &[ParsedEntity]) -> ChunkPlan {
        let plan = self.pack(self.fragments(entities));
        if !plan.is_empty() {
            log::debug!("{}", Self::get_stats(&plan.chunks));
        }
        plan
    }

    /// Pack an already rendered fragment sequence.
    ///
    /// Budget checks estimate the text the chunk will carry (overlap, fragments and the
    /// newlines joining them), never a sum of per-fragment estimates.
    #[must_use]
    pub fn pack(&self, fragments: Vec<Fragment>) -> ChunkPlan {
        let budget = self.config.chunk_size;
        let mut plan = ChunkPlan::default();
        let mut current: Option<(Chunk, String)> = None;

        for fragment in fragments {
            if fragment.tokens > budget {
                if let Some((open, _)) = current.take() {
                    plan.chunks.push(open);
                }
                let index = plan.chunks.len();
                let warning = ChunkOverflowWarning {
                    chunk_index: index,
                    entity: fragment.entity.clone(),
                    fragment: fragment.label(),
                    tokens: fragment.tokens,
                    budget,
                };
                log::warn!("{warning}");
                plan.warnings.push(warning);
                plan.chunks.push(Chunk {
                    index,
                    token_estimate: fragment.tokens,
                    fragments: vec![fragment],
                    overlap: None,
                    oversized: true,
                });
                continue;
            }

            if let Some((open, text)) = current.as_mut() {
                let candidate = format!("{text}\n{}", fragment.text);
                let tokens = self.estimator.estimate(&candidate);
                if tokens <= budget {
                    *text = candidate;
                    open.token_estimate = tokens;
                    open.fragments.push(fragment);
                    continue;
                }
            }

            if let Some((open, _)) = current.take() {
                plan.chunks.push(open);
            }
            let index = plan.chunks.len();
            let overlap = plan
                .chunks
                .last()
                .and_then(|previous| self.seed_overlap(previous, &fragment.text));
            let text = match &overlap {
                Some(overlap) => format!("{}\n{}", overlap.text, fragment.text),
                None => fragment.text.clone(),
            };
            let chunk = Chunk {
                index,
                token_estimate: self.estimator.estimate(&text),
                fragments: vec![fragment],
                overlap,
                oversized: false,
            };
            current = Some((chunk, text));
        }

        if let Some((open, _)) = current.take() {
            plan.chunks.push(open);
        }
        plan
    }

    /// Trailing context of `previous` that still leaves room for `next` in the chunk budget.
    ///
    /// Oldest overlap lines are dropped until overlap, separator and `next` fit together.
    fn seed_overlap(&self, previous: &Chunk, next: &str) -> Option<OverlapContext> {
        let next_tokens = self.estimator.estimate(next);
        let budget = self
            .config
            .overlap_size
            .min(self.config.chunk_size.saturating_sub(next_tokens));
        if budget == 0 {
            return None;
        }

        let mut text = self.estimator.tail_within(&previous.content(), budget);
        while !text.trim().is_empty()
            && self.estimator.estimate(&format!("{text}\n{next}")) > self.config.chunk_size
        {
            text = match text.split_once('\n') {
                Some((_, rest)) => rest.to_string(),
                None => String::new(),
            };
        }
        if text.trim().is_empty() {
            return None;
        }
        Some(OverlapContext {
            source_chunk: previous.index,
            tokens: self.estimator.estimate(&text),
            text,
        })
    }

    fn render_header(&self, entity: &ParsedEntity) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "// ---- {} {} ({}:{})",
            entity.kind, entity.qualified_name, entity.location.path, entity.location.span.start
        );
        if let Some(package) = &entity.package {
            let _ = writeln!(out, "package {package};");
        }
        let _ = write!(out, "{} {{", entity.declaration());

        let limit = self.config.max_header_fields;
        for field in entity.fields.iter().take(limit) {
            out.push_str("\n    ");
            for modifier in &field.modifiers {
                out.push_str(modifier);
                out.push(' ');
            }
            let _ = write!(out, "{} {};", field.type_name, field.name);
        }
        if entity.fields.len() > limit {
            let _ = write!(out, "\n    // ... {} more fields", entity.fields.len() - limit);
        }
        out
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn get_stats(chunks: &[Chunk]) -> ChunkingStats {
        let total_tokens: usize = chunks.iter().map(|c| c.token_estimate).sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_fragments: chunks.iter().map(|c| c.fragments.len()).sum(),
            total_tokens,
            overlap_tokens: chunks.iter().map(Chunk::overlap_tokens).sum(),
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_tokens / chunks.len()
            },
            max_tokens: chunks.iter().map(|c| c.token_estimate).max().unwrap_or(0),
            oversized_chunks: chunks.iter().filter(|c| c.oversized).count(),
        }
    }
}

fn render_method(entity: &ParsedEntity, method: &ParsedMethod) -> String {
    let body = match &method.source {
        Some(source) if !source.trim().is_empty() => source.clone(),
        _ => format!("{};", method.signature()),
    };
    format!("// {}#{}\n{body}", entity.qualified_name, method.name)
}

/// Statistics about chunking results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_fragments: usize,
    pub total_tokens: usize,
    pub overlap_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub max_tokens: usize,
    pub oversized_chunks: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Fragments: {} | Tokens: {} (overlap {}) | Avg: {} | Max: {} | Oversized: {}",
            self.total_chunks,
            self.total_fragments,
            self.total_tokens,
            self.overlap_tokens,
            self.avg_tokens_per_chunk,
            self.max_tokens,
            self.oversized_chunks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_protocol::{EntityKind, ParsedField};
    use pretty_assertions::assert_eq;

    fn entity(name: &str, methods: usize, body_len: usize) -> ParsedEntity {
        let mut entity = ParsedEntity::new(EntityKind::Class, name, Some("com.acme".into()));
        entity.location.path = format!("src/{name}.java");
        for i in 0..methods {
            let mut method = ParsedMethod::new(format!("m{i}"), "void");
            let body = (0..body_len)
                .map(|line| format!("        step{i}_{line}();"))
                .collect::<Vec<_>>()
                .join("\n");
            method.source = Some(format!("    void m{i}() {{\n{body}\n    }}"));
            entity.methods.push(method);
        }
        entity
    }

    fn chunker(chunk_size: usize, overlap_size: usize) -> StructuralChunker {
        StructuralChunker::new(ChunkerConfig::with_budget(chunk_size, overlap_size)).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = StructuralChunker::new(ChunkerConfig::with_budget(100, 100))
            .err()
            .unwrap();
        assert!(matches!(err, ChunkerError::InvalidConfig(_)));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let plan = chunker(200, 20).chunk(&[]);
        assert!(plan.is_empty());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn small_entity_fits_one_chunk() {
        let plan = chunker(3500, 300).chunk(&[entity("Calc", 2, 2)]);
        assert_eq!(plan.len(), 1);
        let chunk = &plan.chunks[0];
        assert_eq!(chunk.index, 0);
        assert!(chunk.overlap.is_none());
        assert_eq!(chunk.fragments.len(), 3);
        assert_eq!(chunk.fragments[0].kind, FragmentKind::Header);
    }

    #[test]
    fn header_renders_declaration_and_capped_fields() {
        let mut config = ChunkerConfig::default();
        config.max_header_fields = 1;
        let chunker = StructuralChunker::new(config).unwrap();

        let mut e = entity("Repo", 0, 0);
        e.superclass = Some("Base".into());
        for name in ["a", "b", "c"] {
            e.fields.push(ParsedField {
                name: name.into(),
                type_name: "int".into(),
                modifiers: vec!["private".into()],
            });
        }
        let fragments = chunker.fragments(&[e]);
        let header = &fragments[0].text;
        assert!(header.starts_with("// ---- class com.acme.Repo (src/Repo.java:0)"));
        assert!(header.contains("class Repo extends Base {"));
        assert!(header.contains("private int a;"));
        assert!(!header.contains("int b;"));
        assert!(header.contains("// ... 2 more fields"));
    }

    #[test]
    fn bodiless_methods_render_signature() {
        let mut e = ParsedEntity::new(EntityKind::Interface, "Store", None);
        e.methods.push(ParsedMethod::new("load", "String"));
        let fragments = chunker(3500, 300).fragments(&[e]);
        assert_eq!(fragments[1].text, "// Store#load\nString load();");
    }

    #[test]
    fn large_entity_splits_with_bounded_overlap() {
        let c = chunker(120, 20);
        let plan = c.chunk(&[entity("Big", 8, 6)]);
        assert!(plan.len() >= 2);

        for chunk in &plan.chunks {
            assert!(chunk.token_estimate <= 120 || chunk.oversized);
            assert_eq!(chunk.token_estimate, c.estimator().estimate(&chunk.text()));
        }
        for chunk in plan.chunks.iter().skip(1) {
            let overlap = chunk.overlap.as_ref().expect("overlap seeded");
            assert_eq!(overlap.source_chunk, chunk.index - 1);
            assert!(overlap.tokens <= 20);
            assert_eq!(overlap.tokens, c.estimator().estimate(&overlap.text));
            assert!(plan.chunks[chunk.index - 1].content().ends_with(&overlap.text));
        }
    }

    #[test]
    fn separators_and_overlap_count_against_budget() {
        let c = chunker(200, 30);
        for body_len in [4usize, 60] {
            let mut e = ParsedEntity::new(EntityKind::Class, "Many", Some("com.acme".into()));
            for i in 0..80 {
                let mut method = ParsedMethod::new(format!("m{i}"), "void");
                method.source = Some(format!("void m{i}() {{ {} }}", "x".repeat(body_len)));
                e.methods.push(method);
            }

            let plan = c.chunk(&[e]);
            assert!(plan.len() > 1);
            for chunk in plan.chunks.iter().filter(|chunk| !chunk.oversized) {
                let sent = c.estimator().estimate(&chunk.text());
                assert!(
                    sent <= 200,
                    "body {body_len}, chunk {}: {sent} tokens",
                    chunk.index
                );
                assert_eq!(chunk.token_estimate, sent);
            }
        }
    }

    #[test]
    fn oversized_fragment_gets_own_chunk_and_warning() {
        let c = chunker(40, 10);
        let mut e = entity("Huge", 0, 0);
        let mut method = ParsedMethod::new("everything", "void");
        method.source = Some("x".repeat(1000));
        e.methods.push(method);
        e.methods.push(ParsedMethod::new("tiny", "void"));

        let plan = c.chunk(&[e]);
        let oversized: Vec<&Chunk> = plan.chunks.iter().filter(|c| c.oversized).collect();
        assert_eq!(oversized.len(), 1);
        assert_eq!(oversized[0].fragments.len(), 1);
        assert!(oversized[0].overlap.is_none());
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].chunk_index, oversized[0].index);
        assert_eq!(plan.warnings[0].fragment, "Huge#everything");
        assert_eq!(plan.warnings[0].budget, 40);
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let plan = chunker(80, 10).chunk(&[entity("A", 4, 4), entity("B", 4, 4)]);
        for (i, chunk) in plan.chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
        let b = EntityRef::new(1, "com.acme.B");
        assert!(!plan.chunks_for(&b).is_empty());
    }

    #[test]
    fn test_chunking_stats() {
        let plan = chunker(120, 20).chunk(&[entity("Big", 8, 6)]);
        let stats = StructuralChunker::get_stats(&plan.chunks);
        assert_eq!(stats.total_chunks, plan.len());
        assert_eq!(stats.total_fragments, 9);
        assert!(stats.max_tokens <= 120);
        assert!(stats.to_string().starts_with("Chunks: "));
    }
}
