use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a top-level or nested type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Interface,
    Enum,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive, 1-indexed line range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }
}

/// Where an entity was declared
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: String,
    pub span: LineSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Control-flow constructs that open an additional path through a method body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoints {
    /// `if` statements (each `else if` is its own `if`)
    pub branches: usize,
    /// `for`, enhanced `for`, `while`, `do`
    pub loops: usize,
    /// non-default `case` labels
    pub switch_cases: usize,
    pub catch_clauses: usize,
    /// `?:` expressions
    pub ternaries: usize,
    /// short-circuit `&&` / `||`
    pub logical_operators: usize,
}

impl DecisionPoints {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.branches
            + self.loops
            + self.switch_cases
            + self.catch_clauses
            + self.ternaries
            + self.logical_operators
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMethod {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// `void` when the declaration has no return type; the type name for constructors
    pub return_type: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Full declaration text; `None` for bodiless (abstract / interface) methods
    #[serde(default)]
    pub source: Option<String>,
    /// Raw token estimate of the body, filled in by the parser
    #[serde(default)]
    pub body_tokens: usize,
    #[serde(default)]
    pub decision_points: DecisionPoints,
    pub span: LineSpan,
    #[serde(default)]
    pub is_constructor: bool,
}

impl ParsedMethod {
    /// Bare method with no body, mostly useful for tests and synthetic input.
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: return_type.into(),
            modifiers: Vec::new(),
            source: None,
            body_tokens: 0,
            decision_points: DecisionPoints::default(),
            span: LineSpan::new(1, 1),
            is_constructor: false,
        }
    }

    /// `public static int parse(String raw, int radix)`
    #[must_use]
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = String::new();
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        if !self.is_constructor {
            out.push_str(&self.return_type);
            out.push(' ');
        }
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&params);
        out.push(')');
        out
    }

    #[must_use]
    pub fn parameter_types(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.type_name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedField {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// One class, interface or enum as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEntity {
    pub kind: EntityKind,
    pub name: String,
    pub qualified_name: String,
    pub package: Option<String>,
    pub superclass: Option<String>,
    /// Implemented interfaces (classes, enums) or extended interfaces (interfaces)
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub methods: Vec<ParsedMethod>,
    #[serde(default)]
    pub fields: Vec<ParsedField>,
    /// Imports of the containing file
    #[serde(default)]
    pub imports: Vec<String>,
    pub location: SourceLocation,
}

impl ParsedEntity {
    pub fn new(kind: EntityKind, name: impl Into<String>, package: Option<String>) -> Self {
        let name = name.into();
        let qualified_name = match &package {
            Some(pkg) if !pkg.is_empty() => format!("{pkg}.{name}"),
            _ => name.clone(),
        };
        Self {
            kind,
            name,
            qualified_name,
            package,
            superclass: None,
            interfaces: Vec::new(),
            modifiers: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            imports: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    /// `public abstract class Repo<T> extends Base implements Closeable`
    #[must_use]
    pub fn declaration(&self) -> String {
        let mut out = String::new();
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str(self.kind.as_str());
        out.push(' ');
        out.push_str(&self.name);

        if let Some(superclass) = &self.superclass {
            out.push_str(" extends ");
            out.push_str(superclass);
        }
        if !self.interfaces.is_empty() {
            let keyword = match self.kind {
                EntityKind::Interface => " extends ",
                EntityKind::Class | EntityKind::Enum => " implements ",
            };
            out.push_str(keyword);
            out.push_str(&self.interfaces.join(", "));
        }
        out
    }
}

/// Everything the parser extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub entities: Vec<ParsedEntity>,
}

/// Stable reference to an entity: its position in discovery order plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub index: usize,
    pub qualified_name: String,
}

impl EntityRef {
    pub fn new(index: usize, qualified_name: impl Into<String>) -> Self {
        Self {
            index,
            qualified_name: qualified_name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.qualified_name)
    }
}

/// A source file that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: String,
    pub reason: String,
}
