//! # Knowledge Protocol
//!
//! Structural facts shared by every stage of the extraction pipeline.
//!
//! The parser produces [`ParsedFile`] values; the chunker, summarizer and assembler only
//! ever read them. [`EntityRef`] is the stable handle that chunks and summaries use to point
//! back at the entity they came from.
//!
//! [`Secret`] and [`Redactor`] keep credentials out of `Debug` output and log lines.

mod model;
mod secrets;

pub use model::{
    DecisionPoints, EntityKind, EntityRef, LineSpan, Parameter, ParseFailure, ParsedEntity,
    ParsedField, ParsedFile, ParsedMethod, SourceLocation,
};
pub use secrets::{Redactor, Secret, MASK};
