//! # Knowledge Chunker
//!
//! Turns Java sources into entities and entities into token-bounded chunks.
//!
//! ## Architecture
//!
//! ```text
//! Java Source
//!     │
//!     ├──> Tree-sitter Parsing → ParsedFile (entities, methods, fields, decision points)
//!     │
//!     ├──> ComplexityAnalyzer → per-method and per-class metrics
//!     │
//!     └──> StructuralChunker
//!          ├─> Render header + method fragments
//!          ├─> Pack fragments under the token budget (never splitting one)
//!          ├─> Seed each new chunk with trailing overlap from the previous one
//!          └─> Emit ChunkPlan (chunks + oversized warnings)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use knowledge_chunker::{ChunkerConfig, JavaAstAnalyzer, StructuralChunker, TokenEstimator};
//!
//! let mut analyzer = JavaAstAnalyzer::new(TokenEstimator::default()).unwrap();
//! let file = analyzer
//!     .parse("Greeter.java", "class Greeter { String hi() { return \"hi\"; } }")
//!     .unwrap();
//!
//! let chunker = StructuralChunker::new(ChunkerConfig::default()).unwrap();
//! let plan = chunker.chunk(&file.entities);
//! assert_eq!(plan.chunks.len(), 1);
//! ```

mod ast_analyzer;
mod chunker;
mod complexity;
mod config;
mod error;
mod tokens;
mod types;

pub use ast_analyzer::JavaAstAnalyzer;
pub use chunker::{ChunkingStats, StructuralChunker};
pub use complexity::{round2, ClassMetrics, ComplexityAnalyzer, EntityMetrics, MethodMetrics};
pub use config::{ChunkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP_SIZE};
pub use error::{ChunkerError, Result};
pub use tokens::{ModelFamily, TokenEstimator};
pub use types::{Chunk, ChunkOverflowWarning, ChunkPlan, Fragment, FragmentKind, OverlapContext};
