use crate::error::{ChunkerError, Result};
use crate::tokens::TokenEstimator;
use knowledge_protocol::{
    DecisionPoints, EntityKind, LineSpan, Parameter, ParsedEntity, ParsedField, ParsedFile,
    ParsedMethod, SourceLocation,
};
use tree_sitter::{Node, Parser};

/// Tree-sitter based extractor of classes, interfaces and enums from Java sources
pub struct JavaAstAnalyzer {
    parser: Parser,
    estimator: TokenEstimator,
}

impl JavaAstAnalyzer {
    /// Create new Java analyzer
    pub fn new(estimator: TokenEstimator) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser, estimator })
    }

    /// Parse one compilation unit. Any syntax error rejects the whole file.
    pub fn parse(&mut self, path: &str, source: &str) -> Result<ParsedFile> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ChunkerError::parse(path, "Failed to parse source code"))?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error(root).map_or(1, |node| node.start_position().row + 1);
            return Err(ChunkerError::parse(path, format!("syntax error near line {line}")));
        }

        let mut file = ParsedFile {
            path: path.to_string(),
            ..ParsedFile::default()
        };

        let mut cursor = root.walk();
        let children: Vec<Node> = root.named_children(&mut cursor).collect();
        for child in &children {
            match child.kind() {
                "package_declaration" => {
                    file.package = package_name(source, *child);
                }
                "import_declaration" => {
                    let import = import_path(source, *child);
                    if !import.is_empty() {
                        file.imports.push(import);
                    }
                }
                _ => {}
            }
        }

        for child in children {
            self.extract_type(source, &mut file, child, None);
        }

        log::debug!(
            "parsed {path}: {} entities, {} imports",
            file.entities.len(),
            file.imports.len()
        );
        Ok(file)
    }

    fn extract_type(
        &self,
        source: &str,
        file: &mut ParsedFile,
        node: Node,
        outer: Option<&str>,
    ) {
        let kind = match node.kind() {
            "class_declaration" | "record_declaration" => EntityKind::Class,
            "interface_declaration" => EntityKind::Interface,
            "enum_declaration" => EntityKind::Enum,
            _ => return,
        };
        let Some(name) = node
            .child_by_field_name("name")
            .map(|n| text(source, n).to_string())
        else {
            return;
        };

        let mut entity = ParsedEntity::new(kind, name.clone(), file.package.clone());
        if let Some(outer) = outer {
            entity.qualified_name = format!("{outer}.{name}");
        }
        entity.modifiers = modifiers(source, node);
        entity.imports = file.imports.clone();
        entity.location = SourceLocation {
            path: file.path.clone(),
            span: span(node),
        };

        if let Some(superclass) = node.child_by_field_name("superclass") {
            entity.superclass = first_named(superclass).map(|t| text(source, t).to_string());
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                entity.interfaces.extend(type_list(source, child));
            }
        }

        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_members(source, &mut entity, body, &mut nested);
        }

        let qualified = entity.qualified_name.clone();
        file.entities.push(entity);
        for inner in nested {
            self.extract_type(source, file, inner, Some(&qualified));
        }
    }

    fn collect_members<'t>(
        &self,
        source: &str,
        entity: &mut ParsedEntity,
        body: Node<'t>,
        nested: &mut Vec<Node<'t>>,
    ) {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" => {
                    entity.methods.push(self.method(source, member, None));
                }
                "constructor_declaration" => {
                    let name = entity.name.clone();
                    entity.methods.push(self.method(source, member, Some(&name)));
                }
                "field_declaration" | "constant_declaration" => {
                    entity.fields.extend(fields(source, member));
                }
                "class_declaration" | "record_declaration" | "interface_declaration"
                | "enum_declaration" => nested.push(member),
                // enum members live after the constants
                "enum_body_declarations" => {
                    self.collect_members(source, entity, member, nested);
                }
                _ => {}
            }
        }
    }

    fn method(&self, source: &str, node: Node, constructor_of: Option<&str>) -> ParsedMethod {
        let name = node
            .child_by_field_name("name")
            .map_or_else(String::new, |n| text(source, n).to_string());
        let return_type = match constructor_of {
            Some(owner) => owner.to_string(),
            None => node
                .child_by_field_name("type")
                .map_or_else(|| "void".to_string(), |t| text(source, t).to_string()),
        };

        let mut method = ParsedMethod::new(name, return_type);
        method.is_constructor = constructor_of.is_some();
        method.modifiers = modifiers(source, node);
        method.span = span(node);
        if let Some(params) = node.child_by_field_name("parameters") {
            method.parameters = parameters(source, params);
        }
        if let Some(body) = node.child_by_field_name("body") {
            let body_text = text(source, body);
            method.body_tokens = self.estimator.estimate(body_text);
            method.source = Some(text(source, node).to_string());
            count_decision_points(source, body, &mut method.decision_points);
        }
        method
    }
}

fn text<'s>(source: &'s str, node: Node) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn span(node: Node) -> LineSpan {
    LineSpan::new(node.start_position().row + 1, node.end_position().row + 1)
}

fn first_named(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).next();
    found
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

fn package_name(source: &str, node: Node) -> Option<String> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        .map(|c| text(source, c).to_string());
    found
}

fn import_path(source: &str, node: Node) -> String {
    text(source, node)
        .trim()
        .trim_start_matches("import")
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword modifiers; annotations are dropped
fn modifiers(source: &str, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(mods) = node
        .children(&mut cursor)
        .find(|c| c.kind() == "modifiers")
    else {
        return Vec::new();
    };
    let mut inner = mods.walk();
    let out = mods
        .children(&mut inner)
        .filter(|c| !matches!(c.kind(), "annotation" | "marker_annotation"))
        .map(|c| text(source, c).to_string())
        .filter(|t| !t.is_empty())
        .collect();
    out
}

fn type_list(source: &str, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(list) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "type_list")
    else {
        return Vec::new();
    };
    let mut inner = list.walk();
    let out = list
        .named_children(&mut inner)
        .map(|t| text(source, t).to_string())
        .collect();
    out
}

fn parameters(source: &str, node: Node) -> Vec<Parameter> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    for param in node.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let type_name = param
                    .child_by_field_name("type")
                    .map_or("", |t| text(source, t));
                let name = param
                    .child_by_field_name("name")
                    .map_or("", |n| text(source, n));
                out.push(Parameter::new(name, type_name));
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let mut type_name = String::new();
                let mut name = String::new();
                for child in param.named_children(&mut inner) {
                    match child.kind() {
                        "variable_declarator" => {
                            name = child
                                .child_by_field_name("name")
                                .map_or("", |n| text(source, n))
                                .to_string();
                        }
                        "modifiers" => {}
                        _ if type_name.is_empty() => type_name = text(source, child).to_string(),
                        _ => {}
                    }
                }
                out.push(Parameter::new(name, format!("{type_name}...")));
            }
            _ => {}
        }
    }
    out
}

fn fields(source: &str, node: Node) -> Vec<ParsedField> {
    let type_name = node
        .child_by_field_name("type")
        .map_or("", |t| text(source, t))
        .to_string();
    let modifiers = modifiers(source, node);

    let mut cursor = node.walk();
    let out = node
        .children_by_field_name("declarator", &mut cursor)
        .filter_map(|d| d.child_by_field_name("name"))
        .map(|n| ParsedField {
            name: text(source, n).to_string(),
            type_name: type_name.clone(),
            modifiers: modifiers.clone(),
        })
        .collect();
    out
}

fn count_decision_points(source: &str, node: Node, points: &mut DecisionPoints) {
    match node.kind() {
        "if_statement" => points.branches += 1,
        "for_statement" | "enhanced_for_statement" | "while_statement" | "do_statement" => {
            points.loops += 1;
        }
        "switch_label" => {
            if !text(source, node).trim_start().starts_with("default") {
                points.switch_cases += 1;
            }
        }
        "catch_clause" => points.catch_clauses += 1,
        "ternary_expression" => points.ternaries += 1,
        "binary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .map_or("", |op| text(source, op));
            if matches!(operator, "&&" | "||") {
                points.logical_operators += 1;
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        count_decision_points(source, child, points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::ComplexityAnalyzer;
    use pretty_assertions::assert_eq;

    fn analyzer() -> JavaAstAnalyzer {
        JavaAstAnalyzer::new(TokenEstimator::default()).unwrap()
    }

    const CALC: &str = r#"package com.acme.math;

import java.util.List;
import static java.lang.Math.max;

/** Adds things. */
public final class Calc extends Base implements Op, Comparable<Calc> {
    private static final int LIMIT = 10;
    private int a, b;

    public Calc(int a) {
        this.a = a;
    }

    public int add(int x, int y) {
        return x + y;
    }

    @Override
    public int clamp(int v, String... labels) {
        if (v > LIMIT && v < 100) {
            return LIMIT;
        }
        for (int i = 0; i < v; i++) {
            v = v > 0 ? v - 1 : v;
        }
        return v;
    }
}
"#;

    #[test]
    fn parses_class_structure() {
        let file = analyzer().parse("src/Calc.java", CALC).unwrap();
        assert_eq!(file.package.as_deref(), Some("com.acme.math"));
        assert_eq!(
            file.imports,
            vec!["java.util.List".to_string(), "static java.lang.Math.max".to_string()]
        );
        assert_eq!(file.entities.len(), 1);

        let calc = &file.entities[0];
        assert_eq!(calc.kind, EntityKind::Class);
        assert_eq!(calc.qualified_name, "com.acme.math.Calc");
        assert_eq!(calc.modifiers, vec!["public", "final"]);
        assert_eq!(calc.superclass.as_deref(), Some("Base"));
        assert_eq!(calc.interfaces, vec!["Op", "Comparable<Calc>"]);
        assert_eq!(calc.imports, file.imports);
        assert_eq!(calc.location.path, "src/Calc.java");
        assert_eq!(calc.location.span.start, 7);

        let fields: Vec<&str> = calc.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["LIMIT", "a", "b"]);
        assert_eq!(calc.fields[0].modifiers, vec!["private", "static", "final"]);

        let names: Vec<&str> = calc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Calc", "add", "clamp"]);
        assert!(calc.methods[0].is_constructor);
        assert_eq!(calc.methods[0].return_type, "Calc");
        assert_eq!(calc.methods[1].parameter_types(), vec!["int", "int"]);
        assert_eq!(calc.methods[2].modifiers, vec!["public"]);
        assert_eq!(calc.methods[2].parameters[1].type_name, "String...");
        assert!(calc.methods[1].source.as_deref().unwrap().contains("return x + y;"));
    }

    #[test]
    fn counts_decision_points_per_method() {
        let file = analyzer().parse("Calc.java", CALC).unwrap();
        let calc = &file.entities[0];
        let complexities: Vec<usize> = calc
            .methods
            .iter()
            .map(|m| ComplexityAnalyzer::analyze_method(m).cyclomatic_complexity)
            .collect();
        // clamp: if + && + for + ternary
        assert_eq!(complexities, vec![1, 1, 5]);
    }

    #[test]
    fn switch_cases_skip_default() {
        let source = r#"
class S {
    int pick(int v) {
        switch (v) {
            case 1: return 10;
            case 2: return 20;
            default: return 0;
        }
    }
    void guard() {
        try { run(); } catch (IllegalStateException e) { } catch (Exception e) { }
        do { run(); } while (ready() || waiting());
    }
}
"#;
        let file = analyzer().parse("S.java", source).unwrap();
        let methods = &file.entities[0].methods;
        assert_eq!(methods[0].decision_points.switch_cases, 2);
        assert_eq!(methods[1].decision_points.catch_clauses, 2);
        assert_eq!(methods[1].decision_points.loops, 1);
        assert_eq!(methods[1].decision_points.logical_operators, 1);
        assert_eq!(file.entities[0].qualified_name, "S");
    }

    #[test]
    fn interfaces_and_nested_types_become_entities() {
        let source = r#"
package p;

public interface Store extends Readable, Closeable {
    String load(String key);
}

enum Color implements Named {
    RED, GREEN;

    private final String label = "x";

    String label() { return label; }

    static class Palette {
        void paint() {}
    }
}
"#;
        let file = analyzer().parse("Store.java", source).unwrap();
        let names: Vec<&str> = file
            .entities
            .iter()
            .map(|e| e.qualified_name.as_str())
            .collect();
        assert_eq!(names, vec!["p.Store", "p.Color", "p.Color.Palette"]);

        let store = &file.entities[0];
        assert_eq!(store.kind, EntityKind::Interface);
        assert_eq!(store.interfaces, vec!["Readable", "Closeable"]);
        assert!(store.methods[0].source.is_none());
        assert_eq!(store.methods[0].signature(), "String load(String key)");

        let color = &file.entities[1];
        assert_eq!(color.kind, EntityKind::Enum);
        assert_eq!(color.interfaces, vec!["Named"]);
        assert_eq!(color.methods.len(), 1);
        assert_eq!(color.fields.len(), 1);
    }

    #[test]
    fn syntax_error_is_a_parse_error() {
        let err = analyzer()
            .parse("Broken.java", "public class Broken { void x( { }")
            .unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("Broken.java"));
    }
}
