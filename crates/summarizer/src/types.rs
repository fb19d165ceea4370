use crate::backend::FailureKind;
use crate::prompt::StructuredSummary;
use knowledge_protocol::EntityRef;
use serde::{Deserialize, Serialize};

/// Outcome of summarizing one chunk. Every chunk resolves to exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryResult {
    Success {
        chunk_index: usize,
        entities: Vec<EntityRef>,
        summary: StructuredSummary,
        attempts: u32,
    },
    Failure {
        chunk_index: usize,
        entities: Vec<EntityRef>,
        kind: FailureKind,
        /// Last error message, credentials masked
        message: String,
        attempts: u32,
    },
}

impl SummaryResult {
    #[must_use]
    pub const fn chunk_index(&self) -> usize {
        match self {
            Self::Success { chunk_index, .. } | Self::Failure { chunk_index, .. } => *chunk_index,
        }
    }

    #[must_use]
    pub fn entities(&self) -> &[EntityRef] {
        match self {
            Self::Success { entities, .. } | Self::Failure { entities, .. } => entities,
        }
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Outcome of the project-level narrative overview call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverviewResult {
    Success {
        text: String,
        attempts: u32,
    },
    Failure {
        kind: FailureKind,
        message: String,
        attempts: u32,
    },
}

impl OverviewResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
