use knowledge_protocol::EntityRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What part of an entity a fragment carries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentKind {
    /// Declaration line, inheritance and fields
    Header,
    /// One method, by declaration index
    Method { index: usize, name: String },
}

/// Indivisible unit of chunking: an entity header or one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub entity: EntityRef,
    pub kind: FragmentKind,
    pub text: String,
    pub tokens: usize,
}

impl Fragment {
    /// Human-readable label for logs and warnings
    #[must_use]
    pub fn label(&self) -> String {
        match &self.kind {
            FragmentKind::Header => format!("{} (header)", self.entity.qualified_name),
            FragmentKind::Method { name, .. } => {
                format!("{}#{name}", self.entity.qualified_name)
            }
        }
    }
}

/// Trailing context copied from the previous chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapContext {
    /// Index of the chunk the text was copied from
    pub source_chunk: usize,
    pub text: String,
    pub tokens: usize,
}

/// A token-bounded, ordered slice of fragments sent as one summarization request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based, strictly increasing)
    pub index: usize,

    /// Unique content of this chunk
    pub fragments: Vec<Fragment>,

    /// Context duplicated from the previous chunk; never part of the unique content
    pub overlap: Option<OverlapContext>,

    /// Estimate of [`Chunk::text`], separators included
    pub token_estimate: usize,

    /// A single fragment larger than the chunk budget
    pub oversized: bool,
}

impl Chunk {
    /// Distinct entities whose fragments appear in this chunk, in order of first appearance
    #[must_use]
    pub fn entities(&self) -> Vec<EntityRef> {
        let mut out: Vec<EntityRef> = Vec::new();
        for fragment in &self.fragments {
            if !out.contains(&fragment.entity) {
                out.push(fragment.entity.clone());
            }
        }
        out
    }

    /// Unique content, fragments joined by newlines
    #[must_use]
    pub fn content(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Everything the chunk carries: overlap first, then the unique content
    #[must_use]
    pub fn text(&self) -> String {
        match &self.overlap {
            Some(overlap) => format!("{}\n{}", overlap.text, self.content()),
            None => self.content(),
        }
    }

    #[must_use]
    pub fn unique_tokens(&self) -> usize {
        self.fragments.iter().map(|f| f.tokens).sum()
    }

    #[must_use]
    pub fn overlap_tokens(&self) -> usize {
        self.overlap.as_ref().map_or(0, |o| o.tokens)
    }

    #[must_use]
    pub fn references(&self, entity: &EntityRef) -> bool {
        self.fragments.iter().any(|f| &f.entity == entity)
    }
}

/// Reported when a single fragment alone exceeds the chunk budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOverflowWarning {
    pub chunk_index: usize,
    pub entity: EntityRef,
    pub fragment: String,
    pub tokens: usize,
    pub budget: usize,
}

impl fmt::Display for ChunkOverflowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk {} holds oversized fragment {} ({} tokens > budget {})",
            self.chunk_index, self.fragment, self.tokens, self.budget
        )
    }
}

/// Output of the structural chunker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    pub warnings: Vec<ChunkOverflowWarning>,
}

impl ChunkPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Indices of every chunk whose unique content references `entity`
    #[must_use]
    pub fn chunks_for(&self, entity: &EntityRef) -> Vec<usize> {
        self.chunks
            .iter()
            .filter(|c| c.references(entity))
            .map(|c| c.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(entity: &EntityRef, kind: FragmentKind, text: &str) -> Fragment {
        Fragment {
            entity: entity.clone(),
            kind,
            text: text.to_string(),
            tokens: 1,
        }
    }

    #[test]
    fn chunk_lists_distinct_entities_in_order() {
        let a = EntityRef::new(0, "p.A");
        let b = EntityRef::new(1, "p.B");
        let chunk = Chunk {
            index: 0,
            fragments: vec![
                fragment(&a, FragmentKind::Header, "class A"),
                fragment(
                    &a,
                    FragmentKind::Method {
                        index: 0,
                        name: "run".into(),
                    },
                    "void run()",
                ),
                fragment(&b, FragmentKind::Header, "class B"),
            ],
            overlap: None,
            token_estimate: 3,
            oversized: false,
        };

        assert_eq!(chunk.entities(), vec![a.clone(), b.clone()]);
        assert_eq!(chunk.content(), "class A\nvoid run()\nclass B");
        assert_eq!(chunk.text(), chunk.content());
        assert!(chunk.references(&b));
        assert_eq!(chunk.unique_tokens(), 3);
        assert_eq!(chunk.overlap_tokens(), 0);
    }

    #[test]
    fn text_puts_overlap_before_content() {
        let a = EntityRef::new(0, "p.A");
        let chunk = Chunk {
            index: 1,
            fragments: vec![fragment(&a, FragmentKind::Header, "class A")],
            overlap: Some(OverlapContext {
                source_chunk: 0,
                text: "}".into(),
                tokens: 1,
            }),
            token_estimate: 3,
            oversized: false,
        };
        assert_eq!(chunk.text(), "}\nclass A");
    }

    #[test]
    fn fragment_labels_name_entity_and_method() {
        let a = EntityRef::new(0, "p.A");
        assert_eq!(fragment(&a, FragmentKind::Header, "").label(), "p.A (header)");
        let method = fragment(
            &a,
            FragmentKind::Method {
                index: 2,
                name: "load".into(),
            },
            "",
        );
        assert_eq!(method.label(), "p.A#load");
    }
}
