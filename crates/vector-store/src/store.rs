use crate::error::{Result, VectorStoreError};
use crate::types::KnowledgeDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DOCUMENT_STORE_SCHEMA_VERSION: u32 = 1;
pub const DOCUMENT_STORE_FILE: &str = "documents.json";

/// Ingestion boundary to a vector store
#[async_trait]
pub trait VectorSink: Send + Sync {
    /// Upsert documents by id; returns how many were new or changed
    async fn ingest(&mut self, documents: Vec<KnowledgeDocument>) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredDocument {
    content_hash: String,
    #[serde(flatten)]
    document: KnowledgeDocument,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDocuments {
    schema_version: u32,
    documents: BTreeMap<String, StoredDocument>,
}

/// File-backed document store keyed by document id
#[derive(Debug)]
pub struct JsonDocumentStore {
    path: PathBuf,
    documents: BTreeMap<String, StoredDocument>,
}

impl JsonDocumentStore {
    /// Open the store in `dir`, loading existing documents if present
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(DOCUMENT_STORE_FILE);
        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let persisted: PersistedDocuments = serde_json::from_slice(&bytes)?;
                if persisted.schema_version != DOCUMENT_STORE_SCHEMA_VERSION {
                    return Err(VectorStoreError::SchemaMismatch {
                        found: persisted.schema_version,
                        expected: DOCUMENT_STORE_SCHEMA_VERSION,
                    });
                }
                persisted.documents
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!(
            "opened document store {} ({} documents)",
            path.display(),
            documents.len()
        );
        Ok(Self { path, documents })
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedDocuments {
            schema_version: DOCUMENT_STORE_SCHEMA_VERSION,
            documents: self.documents.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&KnowledgeDocument> {
        self.documents.get(id).map(|stored| &stored.document)
    }
}

#[async_trait]
impl VectorSink for JsonDocumentStore {
    async fn ingest(&mut self, documents: Vec<KnowledgeDocument>) -> Result<usize> {
        let total = documents.len();
        let mut changed = 0usize;
        for document in documents {
            let content_hash = content_hash(&document);
            let unchanged = self
                .documents
                .get(&document.id)
                .is_some_and(|stored| stored.content_hash == content_hash);
            if unchanged {
                continue;
            }
            changed += 1;
            self.documents.insert(
                document.id.clone(),
                StoredDocument {
                    content_hash,
                    document,
                },
            );
        }

        if changed > 0 {
            self.save().await?;
        }
        log::info!(
            "document store: {changed} of {total} documents new or changed ({} stored)",
            self.documents.len()
        );
        Ok(changed)
    }
}

fn content_hash(document: &KnowledgeDocument) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.text.as_bytes());
    for (key, value) in &document.metadata {
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([b'=']);
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: &str, text: &str) -> KnowledgeDocument {
        KnowledgeDocument::new(id, text).with_metadata("type", "class")
    }

    #[tokio::test]
    async fn store_roundtrip_and_upsert() {
        let tmp = TempDir::new().unwrap();

        let mut store = JsonDocumentStore::open(tmp.path()).await.unwrap();
        assert!(store.is_empty());
        let written = store
            .ingest(vec![doc("entity:a.A", "alpha"), doc("entity:a.B", "beta")])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let mut reopened = JsonDocumentStore::open(tmp.path()).await.unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("entity:a.A").map(|d| d.text.as_str()), Some("alpha"));

        let written = reopened
            .ingest(vec![doc("entity:a.A", "alpha"), doc("entity:a.B", "beta v2")])
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(reopened.get("entity:a.B").map(|d| d.text.as_str()), Some("beta v2"));
    }

    #[tokio::test]
    async fn unchanged_ingest_does_not_rewrite() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonDocumentStore::open(tmp.path()).await.unwrap();
        assert_eq!(store.ingest(Vec::new()).await.unwrap(), 0);
        assert!(!store.path().exists());

        store.ingest(vec![doc("x", "same")]).await.unwrap();
        assert_eq!(store.ingest(vec![doc("x", "same")]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_unknown_schema() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(DOCUMENT_STORE_FILE),
            br#"{"schema_version": 99, "documents": {}}"#,
        )
        .await
        .unwrap();
        let err = JsonDocumentStore::open(tmp.path()).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::SchemaMismatch { found: 99, .. }));
    }

    #[test]
    fn metadata_changes_the_hash() {
        let a = doc("x", "same");
        let b = doc("x", "same").with_metadata("package", "p");
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }
}
