use crate::backend::BackendError;
use knowledge_chunker::Chunk;
use knowledge_protocol::EntityRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const CHUNK_SYSTEM_PROMPT: &str = "You are a senior software architect analyzing Java code. \
Provide clear, structured summaries.";

const OVERVIEW_SYSTEM_PROMPT: &str = "You are a senior software architect reviewing a codebase. \
Provide insightful analysis.";

/// Class names listed in the overview prompt before truncating
pub const MAX_CLASSES_IN_OVERVIEW: usize = 20;

/// One request to the model: a system message and a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub system: String,
    pub user: String,
}

impl PromptPayload {
    /// Prompt asking for per-entity summaries of one chunk
    #[must_use]
    pub fn for_chunk(chunk: &Chunk, total_chunks: usize) -> Self {
        let mut user = String::new();
        let _ = writeln!(
            user,
            "Analyze part {} of {} of a Java repository.\n",
            chunk.index + 1,
            total_chunks.max(1)
        );

        if let Some(overlap) = &chunk.overlap {
            let _ = writeln!(
                user,
                "Preceding context, already covered by the previous part. Use it for orientation \
                 only and do NOT summarize it again:\n```java\n{}\n```\n",
                overlap.text
            );
        }

        let _ = writeln!(user, "Code to summarize:\n```java\n{}\n```\n", chunk.content());

        let names: Vec<String> = chunk
            .entities()
            .into_iter()
            .map(|e| e.qualified_name)
            .collect();
        let _ = writeln!(user, "Entities in this part: {}\n", names.join(", "));

        user.push_str(
            "For each entity provide:\n\
             1. Purpose: What is the main purpose of this type?\n\
             2. Responsibilities: What are its key responsibilities?\n\
             3. Key Methods: Describe the most important methods shown (max 3-5)\n\
             4. Complexity Assessment: Comment on the overall complexity\n\
             5. Design Patterns: Identify any design patterns used\n\n\
             Keep each summary concise. Answer with JSON only, in this shape:\n\
             {\"entities\":[{\"entity\":\"<qualified name>\",\"summary\":\"<text>\"}]}",
        );

        Self {
            system: CHUNK_SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Project statistics sent for the narrative overview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewPrompt {
    pub total_classes: usize,
    pub total_interfaces: usize,
    pub total_enums: usize,
    pub total_methods: usize,
    pub avg_complexity: f64,
    pub packages: Vec<String>,
    /// Simple names in discovery order
    pub class_names: Vec<String>,
}

impl OverviewPrompt {
    #[must_use]
    pub fn to_payload(&self) -> PromptPayload {
        #[derive(Serialize)]
        struct Stats<'a> {
            total_classes: usize,
            total_interfaces: usize,
            total_enums: usize,
            total_methods: usize,
            packages: &'a [String],
            avg_complexity: f64,
        }

        let stats = Stats {
            total_classes: self.total_classes,
            total_interfaces: self.total_interfaces,
            total_enums: self.total_enums,
            total_methods: self.total_methods,
            packages: &self.packages,
            avg_complexity: if self.avg_complexity.is_finite() {
                self.avg_complexity
            } else {
                0.0
            },
        };
        let stats_json = serde_json::to_string_pretty(&stats).unwrap_or_default();

        let mut names = self
            .class_names
            .iter()
            .take(MAX_CLASSES_IN_OVERVIEW)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.class_names.len() > MAX_CLASSES_IN_OVERVIEW {
            names.push_str("...");
        }

        let user = format!(
            "Analyze this Java project based on the following statistics:\n\n{stats_json}\n\n\
             Class names: {names}\n\n\
             Provide a high-level overview including:\n\
             1. Project Purpose: What does this application do?\n\
             2. Architecture: What architectural patterns are used?\n\
             3. Main Components: What are the primary modules/components?\n\
             4. Technology Stack: What frameworks/libraries are evident?\n\
             5. Code Quality: Assessment based on complexity metrics\n\n\
             Keep it concise (200-300 words)."
        );

        PromptPayload {
            system: OVERVIEW_SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Parsed model answer for one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSummary {
    /// Per-entity text keyed by qualified name
    pub sections: BTreeMap<String, String>,
    /// Text that applies to every entity of the chunk
    pub shared: Option<String>,
}

impl StructuredSummary {
    /// Text for one entity: its own section, else the shared text
    #[must_use]
    pub fn text_for(&self, qualified_name: &str) -> Option<&str> {
        self.sections
            .get(qualified_name)
            .map(String::as_str)
            .or(self.shared.as_deref())
    }

    /// Leniently parse a raw completion for the given chunk entities.
    ///
    /// JSON (bare, fenced or embedded in prose) yields per-entity sections; sections naming an
    /// unknown entity fall into the shared text. Anything else becomes the shared text. Only an
    /// empty answer is rejected.
    pub fn parse(raw: &str, entities: &[EntityRef]) -> Result<Self, BackendError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BackendError::malformed("empty completion"));
        }

        let Some(envelope) = extract_envelope(trimmed) else {
            return Ok(Self {
                sections: BTreeMap::new(),
                shared: Some(trimmed.to_string()),
            });
        };

        let mut summary = Self::default();
        let mut unmatched: Vec<String> = Vec::new();
        for section in envelope.entities {
            let text = section.summary.trim();
            if text.is_empty() {
                continue;
            }
            match resolve_entity(&section.entity, entities) {
                Some(name) => {
                    summary
                        .sections
                        .entry(name.to_string())
                        .and_modify(|existing| {
                            existing.push_str("\n\n");
                            existing.push_str(text);
                        })
                        .or_insert_with(|| text.to_string());
                }
                None => unmatched.push(text.to_string()),
            }
        }
        if !unmatched.is_empty() {
            summary.shared = Some(unmatched.join("\n\n"));
        }

        if summary.sections.is_empty() && summary.shared.is_none() {
            return Err(BackendError::malformed("completion contained no summaries"));
        }
        Ok(summary)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    entities: Vec<EntitySection>,
}

#[derive(Deserialize)]
struct EntitySection {
    #[serde(default)]
    entity: String,
    #[serde(default)]
    summary: String,
}

fn extract_envelope(text: &str) -> Option<Envelope> {
    let body = strip_fence(text);
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        return Some(envelope).filter(|e| !e.entities.is_empty());
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Envelope>(&body[start..=end])
        .ok()
        .filter(|e| !e.entities.is_empty())
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Exact qualified name first, then a unique simple-name match
fn resolve_entity<'a>(name: &str, entities: &'a [EntityRef]) -> Option<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if let Some(exact) = entities.iter().find(|e| e.qualified_name == name) {
        return Some(&exact.qualified_name);
    }
    let suffix = format!(".{name}");
    let mut matches = entities
        .iter()
        .filter(|e| e.qualified_name.ends_with(&suffix));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(&only.qualified_name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FailureKind;
    use pretty_assertions::assert_eq;

    fn refs() -> Vec<EntityRef> {
        vec![
            EntityRef::new(0, "com.acme.Repo"),
            EntityRef::new(1, "com.acme.Service"),
        ]
    }

    #[test]
    fn parses_json_sections() {
        let raw = r#"{"entities":[{"entity":"com.acme.Repo","summary":"Stores rows."},{"entity":"Service","summary":"Coordinates."}]}"#;
        let summary = StructuredSummary::parse(raw, &refs()).unwrap();
        assert_eq!(summary.text_for("com.acme.Repo"), Some("Stores rows."));
        assert_eq!(summary.text_for("com.acme.Service"), Some("Coordinates."));
        assert_eq!(summary.shared, None);
    }

    #[test]
    fn parses_fenced_and_embedded_json() {
        let fenced = "```json\n{\"entities\":[{\"entity\":\"com.acme.Repo\",\"summary\":\"A\"}]}\n```";
        let summary = StructuredSummary::parse(fenced, &refs()).unwrap();
        assert_eq!(summary.text_for("com.acme.Repo"), Some("A"));

        let prose = "Here you go: {\"entities\":[{\"entity\":\"com.acme.Repo\",\"summary\":\"B\"}]} done";
        let summary = StructuredSummary::parse(prose, &refs()).unwrap();
        assert_eq!(summary.text_for("com.acme.Repo"), Some("B"));
    }

    #[test]
    fn plain_text_is_shared() {
        let summary = StructuredSummary::parse("  Repo stores rows.  ", &refs()).unwrap();
        assert_eq!(summary.text_for("com.acme.Repo"), Some("Repo stores rows."));
        assert_eq!(summary.text_for("com.acme.Service"), Some("Repo stores rows."));
    }

    #[test]
    fn unknown_entities_fall_back_to_shared() {
        let raw = r#"{"entities":[{"entity":"Other","summary":"Misc."}]}"#;
        let summary = StructuredSummary::parse(raw, &refs()).unwrap();
        assert!(summary.sections.is_empty());
        assert_eq!(summary.shared.as_deref(), Some("Misc."));
    }

    #[test]
    fn empty_completion_is_malformed() {
        let err = StructuredSummary::parse("   \n", &refs()).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn overview_prompt_truncates_class_names() {
        let prompt = OverviewPrompt {
            total_classes: 25,
            class_names: (0..25).map(|i| format!("C{i}")).collect(),
            packages: vec!["com.acme".into()],
            ..Default::default()
        };
        let payload = prompt.to_payload();
        assert!(payload.user.contains("C19..."));
        assert!(!payload.user.contains("C20"));
        assert!(payload.user.contains("\"total_classes\": 25"));
        assert!(payload.system.contains("senior software architect"));
    }
}
