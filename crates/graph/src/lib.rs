//! # Knowledge Graph
//!
//! Per-entity knowledge records assembled from structure, metrics and chunk summaries.
//!
//! ## Architecture
//!
//! ```text
//! ParsedEntity[] + ChunkPlan + SummaryResult[]
//!     │
//!     ├──> KnowledgeAssembler
//!     │      ├─ Metrics per method and per entity (ComplexityAnalyzer)
//!     │      ├─ Relationship facts copied verbatim (superclass, interfaces, imports)
//!     │      ├─ Summary merge in chunk order, duplicate paragraphs dropped
//!     │      └─ Summarized / Partial / Unavailable per entity
//!     │
//!     ├──> KnowledgeGraph (records + project overview + parse failures)
//!     │
//!     └──> OutputSerializer
//!            └─ Deterministic JSON; unrenderable values reported, not fatal
//! ```

mod assembler;
mod error;
mod serializer;
mod types;

pub use assembler::KnowledgeAssembler;
pub use error::{GraphError, Result, SerializationError};
pub use serializer::{OutputSerializer, SerializedGraph, PARSE_FAILED_STATUS};
pub use types::{
    KnowledgeGraph, KnowledgeRecord, MethodRecord, ProjectOverview, SummaryState,
};
