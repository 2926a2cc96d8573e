//! SHACL validation report.
//!
//! Besides the standard vocabulary, every result states whether the focus node is known not to
//! conform or whether its conformance is undefined in the well-founded model, using the
//! `wfs:conformance` property.

use crate::constraint::ConstraintComponent;
use crate::model::ShapeId;
use crate::path::PropertyPath;
use crate::term::deskolemize;
use crate::vocab::{sh, wfs};
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Graph, Literal, NamedNodeRef, Term, Triple};
use std::fmt;

/// Value of `sh:severity` / `sh:resultSeverity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl Severity {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Violation => sh::VIOLATION,
            Self::Warning => sh::WARNING,
            Self::Info => sh::INFO,
        }
    }

    /// The severity named by `iri`, if it is one of the three SHACL severities.
    pub fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        [Self::Violation, Self::Warning, Self::Info]
            .into_iter()
            .find(|severity| severity.iri() == iri)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iri().as_str().trim_start_matches(sh::NAMESPACE))
    }
}

/// The truth value of "the focus node conforms to the shape" for a reported focus node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conformance {
    /// The focus node does not conform.
    #[default]
    False,
    /// The well-founded model leaves the conformance undefined.
    Undefined,
}

impl Conformance {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::False => wfs::FALSE,
            Self::Undefined => wfs::UNDEFINED,
        }
    }
}

/// One `sh:result` of a report: a focus node that does not conform, or whose conformance is
/// undefined, and the constraint blamed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub focus_node: Term,
    /// Set when the blamed constraint belongs to a property shape.
    pub result_path: Option<PropertyPath>,
    /// The value node failing the blamed constraint, if the constraint is about value nodes.
    pub value: Option<Term>,
    pub source_shape: ShapeId,
    pub source_constraint_component: ConstraintComponent,
    /// The `sh:message` of the source shape.
    pub result_message: Option<Literal>,
    pub result_severity: Severity,
    pub conformance: Conformance,
}

impl ValidationResult {
    /// A violation without path, value or message.
    pub fn new(
        focus_node: Term,
        source_shape: ShapeId,
        source_constraint_component: ConstraintComponent,
    ) -> Self {
        Self {
            focus_node,
            result_path: None,
            value: None,
            source_shape,
            source_constraint_component,
            result_message: None,
            result_severity: Severity::Violation,
            conformance: Conformance::False,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: PropertyPath) -> Self {
        self.result_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Term) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: Literal) -> Self {
        self.result_message = Some(message);
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.result_severity = severity;
        self
    }

    #[must_use]
    pub fn with_conformance(mut self, conformance: Conformance) -> Self {
        self.conformance = conformance;
        self
    }
}

/// The outcome of a validation run.
///
/// Results are kept in insertion order without duplicates.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if every target of every shape conforms.
    ///
    /// Undefined conformance is not conformance.
    pub fn conforms(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// The results whose conformance is undefined.
    pub fn undefined(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.conformance == Conformance::Undefined)
    }

    /// Number of results with the [`Severity::Violation`] severity.
    pub fn violation_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.result_severity == Severity::Violation)
            .count()
    }

    pub fn add_result(&mut self, result: ValidationResult) {
        if !self.results.contains(&result) {
            self.results.push(result);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Builds the `sh:ValidationReport` graph.
    ///
    /// Skolem IRIs introduced while loading the data are turned back into blank nodes.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        let report = BlankNode::default();
        graph.insert(&Triple::new(report.clone(), rdf::TYPE, sh::VALIDATION_REPORT));
        graph.insert(&Triple::new(
            report.clone(),
            sh::CONFORMS,
            Literal::new_typed_literal(self.conforms().to_string(), xsd::BOOLEAN),
        ));
        for result in &self.results {
            let node = BlankNode::default();
            graph.insert(&Triple::new(report.clone(), sh::RESULT, node.clone()));
            let mut properties = vec![
                (rdf::TYPE, Term::from(sh::VALIDATION_RESULT)),
                (sh::FOCUS_NODE, deskolemize(result.focus_node.clone())),
                (sh::SOURCE_SHAPE, result.source_shape.to_term()),
                (
                    sh::SOURCE_CONSTRAINT_COMPONENT,
                    result.source_constraint_component.iri().into(),
                ),
                (sh::RESULT_SEVERITY, result.result_severity.iri().into()),
                (wfs::CONFORMANCE, result.conformance.iri().into()),
            ];
            if let Some(path) = &result.result_path {
                properties.push((sh::RESULT_PATH, path.to_graph(&mut graph)));
            }
            if let Some(value) = &result.value {
                properties.push((sh::VALUE, deskolemize(value.clone())));
            }
            if let Some(message) = &result.result_message {
                properties.push((sh::RESULT_MESSAGE, message.clone().into()));
            }
            for (predicate, object) in properties {
                graph.insert(&Triple::new(node.clone(), predicate, object));
            }
        }
        graph
    }
}
