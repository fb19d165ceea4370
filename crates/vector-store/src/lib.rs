//! # Knowledge Vector Store
//!
//! Turns a [`KnowledgeGraph`](knowledge_graph::KnowledgeGraph) into text documents and feeds
//! them to a vector store.
//!
//! ## Architecture
//!
//! ```text
//! KnowledgeGraph
//!     │
//!     ├──> documents_from_graph
//!     │      ├─ project_overview (when a narrative exists)
//!     │      └─ one document per class / interface / enum
//!     │
//!     └──> VectorSink::ingest
//!            └─ JsonDocumentStore: upsert by id, sha256 content hash, atomic save
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use knowledge_graph::KnowledgeGraph;
//! use knowledge_vector_store::{documents_from_graph, JsonDocumentStore, VectorSink};
//!
//! # async fn feed(graph: &KnowledgeGraph) -> knowledge_vector_store::Result<()> {
//! let mut store = JsonDocumentStore::open(".knowledge/vectors").await?;
//! let changed = store.ingest(documents_from_graph(graph)).await?;
//! println!("{changed} documents updated");
//! # Ok(())
//! # }
//! ```

mod error;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use store::{JsonDocumentStore, VectorSink, DOCUMENT_STORE_FILE, DOCUMENT_STORE_SCHEMA_VERSION};
pub use types::{documents_from_graph, KnowledgeDocument, OVERVIEW_DOCUMENT_ID};
