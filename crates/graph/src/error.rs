use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A value that could not be rendered; the rest of the document is still produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot serialize {path}: {message}")]
pub struct SerializationError {
    /// JSON path of the offending value, e.g. `entities[3].averageComplexity`
    pub path: String,
    pub message: String,
}

impl SerializationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
