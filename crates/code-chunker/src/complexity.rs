use knowledge_protocol::{DecisionPoints, ParsedEntity, ParsedMethod};
use serde::{Deserialize, Serialize};

/// Locally computed metrics for one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetrics {
    /// `1 + decision points`, never zero
    pub cyclomatic_complexity: usize,
    pub parameter_count: usize,
    pub line_count: usize,
}

/// Aggregates over the methods of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub method_count: usize,
    pub field_count: usize,
    /// Mean method complexity rounded to two decimals; 0.0 without methods
    pub average_complexity: f64,
    pub max_complexity: usize,
    pub total_complexity: usize,
}

/// Metrics of an entity and each of its methods, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub methods: Vec<MethodMetrics>,
    pub class: ClassMetrics,
}

/// Pure cyclomatic-complexity and size metrics over parsed structure.
pub struct ComplexityAnalyzer;

impl ComplexityAnalyzer {
    #[must_use]
    pub const fn cyclomatic(points: &DecisionPoints) -> usize {
        1 + points.total()
    }

    #[must_use]
    pub fn analyze_method(method: &ParsedMethod) -> MethodMetrics {
        let line_count = match &method.source {
            Some(source) if !source.is_empty() => source.lines().count().max(1),
            _ => method.span.line_count(),
        };

        MethodMetrics {
            cyclomatic_complexity: Self::cyclomatic(&method.decision_points),
            parameter_count: method.parameters.len(),
            line_count,
        }
    }

    #[must_use]
    pub fn analyze_entity(entity: &ParsedEntity) -> EntityMetrics {
        let methods: Vec<MethodMetrics> = entity.methods.iter().map(Self::analyze_method).collect();
        let class = Self::aggregate(&methods, entity.fields.len());
        EntityMetrics { methods, class }
    }

    #[must_use]
    pub fn aggregate(methods: &[MethodMetrics], field_count: usize) -> ClassMetrics {
        let total_complexity: usize = methods.iter().map(|m| m.cyclomatic_complexity).sum();
        let max_complexity = methods
            .iter()
            .map(|m| m.cyclomatic_complexity)
            .max()
            .unwrap_or(0);
        let average_complexity = if methods.is_empty() {
            0.0
        } else {
            round2(total_complexity as f64 / methods.len() as f64)
        };

        ClassMetrics {
            method_count: methods.len(),
            field_count,
            average_complexity,
            max_complexity,
            total_complexity,
        }
    }
}

/// Round to two decimals
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_protocol::{EntityKind, LineSpan, Parameter, ParsedField};

    fn method_with(points: DecisionPoints) -> ParsedMethod {
        let mut method = ParsedMethod::new("run", "void");
        method.decision_points = points;
        method
    }

    #[test]
    fn zero_decision_points_is_complexity_one() {
        let metrics = ComplexityAnalyzer::analyze_method(&method_with(DecisionPoints::default()));
        assert_eq!(metrics.cyclomatic_complexity, 1);
    }

    #[test]
    fn each_decision_point_adds_one_path() {
        for n in 0..12 {
            let points = DecisionPoints {
                branches: n,
                ..Default::default()
            };
            assert_eq!(ComplexityAnalyzer::cyclomatic(&points), 1 + n);
        }

        let mixed = DecisionPoints {
            branches: 1,
            loops: 1,
            switch_cases: 2,
            catch_clauses: 1,
            ternaries: 1,
            logical_operators: 2,
        };
        assert_eq!(ComplexityAnalyzer::cyclomatic(&mixed), 9);
    }

    #[test]
    fn parameter_and_line_counts_come_from_structure() {
        let mut method = ParsedMethod::new("sum", "int");
        method.parameters = vec![Parameter::new("a", "int"), Parameter::new("b", "int")];
        method.span = LineSpan::new(4, 9);
        let metrics = ComplexityAnalyzer::analyze_method(&method);
        assert_eq!(metrics.parameter_count, 2);
        assert_eq!(metrics.line_count, 6);

        method.source = Some("int sum(int a, int b) {\n  return a + b;\n}".to_string());
        assert_eq!(ComplexityAnalyzer::analyze_method(&method).line_count, 3);
    }

    #[test]
    fn entity_aggregates_average_and_max() {
        let mut entity = ParsedEntity::new(EntityKind::Class, "Calc", None);
        entity.methods = vec![
            method_with(DecisionPoints::default()),
            method_with(DecisionPoints {
                branches: 1,
                loops: 1,
                ..Default::default()
            }),
            method_with(DecisionPoints {
                logical_operators: 1,
                ..Default::default()
            }),
        ];
        entity.fields = vec![ParsedField {
            name: "total".into(),
            type_name: "int".into(),
            modifiers: vec![],
        }];

        let metrics = ComplexityAnalyzer::analyze_entity(&entity);
        let complexities: Vec<usize> = metrics
            .methods
            .iter()
            .map(|m| m.cyclomatic_complexity)
            .collect();
        assert_eq!(complexities, vec![1, 3, 2]);
        assert_eq!(metrics.class.method_count, 3);
        assert_eq!(metrics.class.field_count, 1);
        assert_eq!(metrics.class.total_complexity, 6);
        assert_eq!(metrics.class.max_complexity, 3);
        assert!((metrics.class.average_complexity - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn entity_without_methods_has_zero_average() {
        let entity = ParsedEntity::new(EntityKind::Interface, "Marker", None);
        let metrics = ComplexityAnalyzer::analyze_entity(&entity);
        assert_eq!(metrics.class.method_count, 0);
        assert_eq!(metrics.class.average_complexity, 0.0);
    }

    #[test]
    fn averages_round_to_two_decimals() {
        let methods = [1, 1, 2].map(|c| MethodMetrics {
            cyclomatic_complexity: c,
            parameter_count: 0,
            line_count: 1,
        });
        let class = ComplexityAnalyzer::aggregate(&methods, 0);
        assert!((class.average_complexity - 1.33).abs() < 1e-9);
    }
}
