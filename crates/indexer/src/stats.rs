use knowledge_chunker::ChunkPlan;
use knowledge_graph::KnowledgeGraph;
use knowledge_protocol::{EntityKind, ParsedFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Counters for one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files that parsed
    pub files: usize,
    pub parse_failures: usize,
    pub classes: usize,
    pub interfaces: usize,
    pub enums: usize,
    pub methods: usize,
    pub fields: usize,
    pub packages: BTreeSet<String>,

    pub chunks: usize,
    pub oversized_chunks: usize,

    pub summarized: usize,
    pub partial: usize,
    pub unavailable: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl RunStats {
    /// Repository statistics from the files that parsed
    pub fn from_parsed(files: &[ParsedFile], parse_failures: usize) -> Self {
        let mut stats = Self {
            files: files.len(),
            parse_failures,
            ..Default::default()
        };
        for file in files {
            if let Some(package) = &file.package {
                stats.packages.insert(package.clone());
            }
            for entity in &file.entities {
                match entity.kind {
                    EntityKind::Class => stats.classes += 1,
                    EntityKind::Interface => stats.interfaces += 1,
                    EntityKind::Enum => stats.enums += 1,
                }
                stats.methods += entity.methods.len();
                stats.fields += entity.fields.len();
            }
        }
        stats
    }

    pub fn record_plan(&mut self, plan: &ChunkPlan) {
        self.chunks = plan.len();
        self.oversized_chunks = plan.chunks.iter().filter(|c| c.oversized).count();
    }

    pub fn record_summaries(&mut self, graph: &KnowledgeGraph) {
        let (summarized, partial, unavailable) = graph.summary_counts();
        self.summarized = summarized;
        self.partial = partial;
        self.unavailable = unavailable;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repository statistics:")?;
        writeln!(
            f,
            "  Files:      {} parsed, {} skipped",
            self.files, self.parse_failures
        )?;
        writeln!(
            f,
            "  Types:      {} classes, {} interfaces, {} enums",
            self.classes, self.interfaces, self.enums
        )?;
        writeln!(f, "  Methods:    {}", self.methods)?;
        writeln!(f, "  Fields:     {}", self.fields)?;
        write!(f, "  Packages:   {}", self.packages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_protocol::{ParsedEntity, ParsedField, ParsedMethod};

    fn file(package: &str, entities: Vec<ParsedEntity>) -> ParsedFile {
        ParsedFile {
            path: format!("{package}/X.java"),
            package: Some(package.to_string()),
            imports: Vec::new(),
            entities,
        }
    }

    #[test]
    fn counts_entities_members_and_packages() {
        let mut order = ParsedEntity::new(EntityKind::Class, "Order", Some("shop".into()));
        order.methods = vec![ParsedMethod::new("total", "int"), ParsedMethod::new("add", "void")];
        order.fields = vec![ParsedField {
            name: "lines".into(),
            type_name: "List<Line>".into(),
            modifiers: vec!["private".into()],
        }];
        let repo = ParsedEntity::new(EntityKind::Interface, "Repo", Some("shop".into()));
        let status = ParsedEntity::new(EntityKind::Enum, "Status", Some("shop.model".into()));

        let stats = RunStats::from_parsed(
            &[file("shop", vec![order, repo]), file("shop.model", vec![status])],
            1,
        );
        assert_eq!(stats.files, 2);
        assert_eq!(stats.parse_failures, 1);
        assert_eq!((stats.classes, stats.interfaces, stats.enums), (1, 1, 1));
        assert_eq!(stats.methods, 2);
        assert_eq!(stats.fields, 1);
        assert_eq!(stats.packages.len(), 2);

        let rendered = stats.to_string();
        assert!(rendered.contains("2 parsed, 1 skipped"));
        assert!(rendered.ends_with("Packages:   2"));
    }
}
