use crate::error::{Result, SerializationError};
use crate::types::{KnowledgeGraph, KnowledgeRecord, SummaryState};
use knowledge_protocol::EntityKind;
use serde::Serialize;

/// Status written for files that were skipped because they did not parse
pub const PARSE_FAILED_STATUS: &str = "parse-failed";

/// Rendered output document plus the values that could not be rendered
#[derive(Debug, Clone)]
pub struct SerializedGraph {
    pub json: String,
    pub errors: Vec<SerializationError>,
}

/// Deterministic JSON rendering of a [`KnowledgeGraph`].
///
/// Entities are ordered by `(qualifiedName, path, startLine)`, set-valued fields are sorted,
/// sequences keep declaration order. The same graph always renders to the same bytes.
pub struct OutputSerializer;

impl OutputSerializer {
    pub fn serialize(graph: &KnowledgeGraph) -> Result<SerializedGraph> {
        let mut errors = Vec::new();

        let mut ordered: Vec<&KnowledgeRecord> = graph.records.iter().collect();
        ordered.sort_by(|a, b| {
            a.qualified_name
                .cmp(&b.qualified_name)
                .then_with(|| a.location.path.cmp(&b.location.path))
                .then_with(|| a.location.span.start.cmp(&b.location.span.start))
        });

        let mut entities = Vec::with_capacity(ordered.len());
        for record in ordered {
            let path = format!("entities[{}]", entities.len());
            let document = EntityDocument::from_record(record, &path, &mut errors);
            match serde_json::to_value(&document) {
                Ok(value) => entities.push(value),
                Err(e) => {
                    log::warn!("omitting {} from output: {e}", record.qualified_name);
                    errors.push(SerializationError::new(path, e.to_string()));
                }
            }
        }

        let mut parse_failures: Vec<ParseFailureDocument> = graph
            .parse_failures
            .iter()
            .map(|f| ParseFailureDocument {
                path: &f.path,
                status: PARSE_FAILED_STATUS,
                reason: &f.reason,
            })
            .collect();
        parse_failures.sort_by(|a, b| a.path.cmp(b.path).then_with(|| a.reason.cmp(b.reason)));

        let overview = &graph.overview;
        let document = OutputDocument {
            overview: OverviewDocument {
                entity_count: overview.entity_count,
                class_count: overview.class_count,
                interface_count: overview.interface_count,
                enum_count: overview.enum_count,
                method_count: overview.method_count,
                total_complexity: overview.total_complexity,
                average_complexity: finite(
                    overview.average_complexity,
                    "overview.averageComplexity",
                    &mut errors,
                ),
                packages: overview.packages.iter().map(String::as_str).collect(),
                summary: overview.summary.as_ref(),
            },
            entities,
            parse_failures,
        };

        let json = serde_json::to_string_pretty(&document)?;
        for error in &errors {
            log::warn!("{error}");
        }
        Ok(SerializedGraph { json, errors })
    }
}

/// Non-finite values become `null` and are reported
fn finite(value: f64, path: &str, errors: &mut Vec<SerializationError>) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        errors.push(SerializationError::new(path, format!("non-finite number {value}")));
        None
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputDocument<'a> {
    overview: OverviewDocument<'a>,
    entities: Vec<serde_json::Value>,
    parse_failures: Vec<ParseFailureDocument<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverviewDocument<'a> {
    entity_count: usize,
    class_count: usize,
    interface_count: usize,
    enum_count: usize,
    method_count: usize,
    total_complexity: usize,
    average_complexity: Option<f64>,
    packages: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a SummaryState>,
}

#[derive(Serialize)]
struct ParseFailureDocument<'a> {
    path: &'a str,
    status: &'static str,
    reason: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntityDocument<'a> {
    name: &'a str,
    qualified_name: &'a str,
    kind: EntityKind,
    package: Option<&'a str>,
    superclass: Option<&'a str>,
    interfaces: &'a [String],
    modifiers: &'a [String],
    methods: Vec<MethodDocument<'a>>,
    fields: Vec<FieldDocument<'a>>,
    method_count: usize,
    field_count: usize,
    average_complexity: Option<f64>,
    max_complexity: usize,
    total_complexity: usize,
    summary: &'a SummaryState,
    imports_used: Vec<&'a str>,
    location: LocationDocument<'a>,
    chunks: &'a [usize],
}

impl<'a> EntityDocument<'a> {
    fn from_record(
        record: &'a KnowledgeRecord,
        path: &str,
        errors: &mut Vec<SerializationError>,
    ) -> Self {
        let methods = record
            .methods
            .iter()
            .map(|m| MethodDocument {
                name: &m.name,
                signature: &m.signature,
                params: m
                    .parameters
                    .iter()
                    .map(|p| ParamDocument {
                        name: &p.name,
                        type_name: &p.type_name,
                    })
                    .collect(),
                return_type: &m.return_type,
                modifiers: &m.modifiers,
                constructor: m.is_constructor,
                complexity: m.metrics.cyclomatic_complexity,
                line_count: m.metrics.line_count,
                parameter_count: m.metrics.parameter_count,
            })
            .collect();

        Self {
            name: &record.name,
            qualified_name: &record.qualified_name,
            kind: record.kind,
            package: record.package.as_deref(),
            superclass: record.superclass.as_deref(),
            interfaces: &record.interfaces,
            modifiers: &record.modifiers,
            methods,
            fields: record
                .fields
                .iter()
                .map(|f| FieldDocument {
                    name: &f.name,
                    type_name: &f.type_name,
                    modifiers: &f.modifiers,
                })
                .collect(),
            method_count: record.metrics.method_count,
            field_count: record.metrics.field_count,
            average_complexity: finite(
                record.metrics.average_complexity,
                &format!("{path}.averageComplexity"),
                errors,
            ),
            max_complexity: record.metrics.max_complexity,
            total_complexity: record.metrics.total_complexity,
            summary: &record.summary,
            imports_used: record.imports.iter().map(String::as_str).collect(),
            location: LocationDocument {
                path: &record.location.path,
                start_line: record.location.span.start,
                end_line: record.location.span.end,
            },
            chunks: &record.chunks,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MethodDocument<'a> {
    name: &'a str,
    signature: &'a str,
    params: Vec<ParamDocument<'a>>,
    return_type: &'a str,
    modifiers: &'a [String],
    constructor: bool,
    complexity: usize,
    line_count: usize,
    parameter_count: usize,
}

#[derive(Serialize)]
struct ParamDocument<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: &'a str,
}

#[derive(Serialize)]
struct FieldDocument<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: &'a str,
    modifiers: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationDocument<'a> {
    path: &'a str,
    start_line: usize,
    end_line: usize,
}
