//! SHACL validation entry point.

use crate::compiler::checks;
use crate::conditional::target_nodes;
use crate::constraint::ConstraintComponent;
use crate::deps::{has_recursion, referenced_shapes};
use crate::endpoint::{Endpoint, StoreEndpoint};
use crate::error::ShaclError;
use crate::model::{Shape, ShapeDocument, ShapeId};
use crate::program::{LogicProgram, ProgramOptions};
use crate::report::{Conformance, ValidationReport, ValidationResult};
use crate::solver::{GroundSolver, Solver};
use crate::unwind::{Extensions, Membership, unwind_all, violation};
use oxrdf::{Graph, NamedNode, Term};
use rustc_hash::FxHashSet;
use std::fmt;

/// How conditional answers are resolved into conformance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Unwinding when no shape is recursive, the logic program otherwise.
    #[default]
    Auto,
    /// Unwinding. Fails on recursive shapes.
    Unwinding,
    /// The well-founded model of the logic program.
    LogicProgram,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Unwinding => "unwinding",
            Self::LogicProgram => "logic program",
        })
    }
}

/// Validates data graphs against a shapes document.
///
/// The document caches every answer computed during validation: a validator is bound to a
/// single data graph.
///
/// ```
/// use oxrdf::{Graph, Literal, NamedNodeRef, Term, TripleRef};
/// use oxrdf::vocab::rdf;
/// use wfshacl::{ShaclValidator, ShapeDocument};
///
/// let sh = |name: &str| format!("http://www.w3.org/ns/shacl#{name}");
/// let shape = NamedNodeRef::new("http://example.org/Shape")?;
/// let node = NamedNodeRef::new("http://example.org/node")?;
/// let node_shape = sh("NodeShape");
/// let target_node = sh("targetNode");
/// let min_inclusive = sh("minInclusive");
/// let mut shapes = Graph::new();
/// shapes.insert(TripleRef::new(shape, rdf::TYPE, NamedNodeRef::new(&node_shape)?));
/// shapes.insert(TripleRef::new(shape, NamedNodeRef::new(&target_node)?, node));
/// shapes.insert(TripleRef::new(shape, NamedNodeRef::new(&min_inclusive)?, Literal::from(2).as_ref()));
///
/// let mut validator = ShaclValidator::new(ShapeDocument::from_graph(&shapes)?);
/// let report = validator.validate_graph(&Graph::new())?;
/// assert!(!report.conforms());
/// assert_eq!(report.results()[0].focus_node, Term::from(node));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[must_use]
pub struct ShaclValidator {
    document: ShapeDocument,
    strategy: Strategy,
    solver: Box<dyn Solver>,
    options: ProgramOptions,
    shapes_graph: Option<NamedNode>,
}

impl ShaclValidator {
    pub fn new(document: ShapeDocument) -> Self {
        Self {
            document,
            strategy: Strategy::default(),
            solver: Box::new(GroundSolver),
            options: ProgramOptions::default(),
            shapes_graph: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the solver computing the well-founded model. Defaults to [`GroundSolver`].
    pub fn with_solver(mut self, solver: impl Solver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    pub fn with_program_options(mut self, options: ProgramOptions) -> Self {
        self.options = options;
        self
    }

    /// Uploads the shapes to the given named graph of the endpoint before validating.
    pub fn with_shapes_graph(mut self, graph_name: NamedNode) -> Self {
        self.shapes_graph = Some(graph_name);
        self
    }

    pub fn document(&self) -> &ShapeDocument {
        &self.document
    }

    pub fn into_document(self) -> ShapeDocument {
        self.document
    }

    /// Validates the data graph behind `endpoint`.
    pub fn validate(&mut self, endpoint: &dyn Endpoint) -> Result<ValidationReport, ShaclError> {
        if let Some(graph_name) = &self.shapes_graph {
            endpoint.insert(&self.document.to_graph(), graph_name.as_ref())?;
        }
        if !self.document.is_answered() {
            self.answer(endpoint)?;
        }

        let mut report = ValidationReport::new();
        let ids = self
            .document
            .shapes()
            .iter()
            .filter(|shape| !shape.is_deactivated())
            .map(|shape| shape.id().clone())
            .collect::<Vec<_>>();
        for id in &ids {
            self.report_shape(id, endpoint, &mut report)?;
        }
        self.document.set_validated();
        tracing::info!(
            "Validated {} shapes: {} results, {} undefined",
            ids.len(),
            report.results().len(),
            report.undefined().count()
        );
        Ok(report)
    }

    /// Validates an in-memory data graph.
    pub fn validate_graph(&mut self, data: &Graph) -> Result<ValidationReport, ShaclError> {
        let endpoint = StoreEndpoint::from_graph(data)?;
        self.validate(&endpoint)
    }

    fn answer(&mut self, endpoint: &dyn Endpoint) -> Result<(), ShaclError> {
        let strategy = match self.strategy {
            Strategy::Auto if has_recursion(&self.document)? => Strategy::LogicProgram,
            Strategy::Auto => Strategy::Unwinding,
            strategy => strategy,
        };
        tracing::info!(
            "Answering {} shapes with the {strategy} strategy",
            self.document.len()
        );
        if strategy == Strategy::Unwinding {
            return unwind_all(&mut self.document, endpoint);
        }

        let program = LogicProgram::translate(&mut self.document, endpoint, &self.options)?;
        let model = self.solver.solve(&program)?;
        for (index, id) in program.shapes().iter().enumerate() {
            self.document
                .store_uncond_answers(id, program.extension(index, &model.true_atoms));
            self.document
                .store_undefined_answers(id, program.extension(index, &model.undefined));
        }
        self.document.set_answered();
        Ok(())
    }

    fn report_shape(
        &mut self,
        id: &ShapeId,
        endpoint: &dyn Endpoint,
        report: &mut ValidationReport,
    ) -> Result<(), ShaclError> {
        let targets = target_nodes(&mut self.document, id, endpoint)?
            .first_column()
            .cloned()
            .collect::<Vec<_>>();
        let document = &self.document;
        let conforming = document
            .uncond_answers(id)
            .map(|table| table.first_column().collect::<FxHashSet<_>>())
            .unwrap_or_default();
        let undefined = document
            .undefined_answers(id)
            .map(|table| table.first_column().collect::<FxHashSet<_>>())
            .unwrap_or_default();

        let mut seen = FxHashSet::default();
        let mut violating = Vec::new();
        for target in &targets {
            if conforming.contains(target) || !seen.insert(target) {
                continue;
            }
            if undefined.contains(target) {
                report.add_result(
                    self.fallback_result(id, target.clone())
                        .with_conformance(Conformance::Undefined),
                );
            } else {
                violating.push(target.clone());
            }
        }
        if violating.is_empty() {
            return Ok(());
        }

        // Blame the failing constraints, or the shape references when no constraint fails
        let mut blamed = FxHashSet::default();
        for check in checks(document, id, &violating)? {
            let table = endpoint.query(&check.query.to_string())?;
            let (Some(focus), value) = (table.column("sub"), table.column("value")) else {
                continue;
            };
            for row in table.rows() {
                let mut result =
                    self.result(&check.shape, row[focus].clone(), check.component);
                if let Some(path) = &check.path {
                    result = result.with_path(path.clone());
                }
                if let Some(value) = value {
                    result = result.with_value(row[value].clone());
                }
                blamed.insert(row[focus].clone());
                report.add_result(result);
            }
        }
        for focus in violating {
            if !blamed.contains(&focus) {
                report.add_result(self.fallback_result(id, focus));
            }
        }
        Ok(())
    }

    /// A result with the severity and message of `shape`.
    fn result(&self, shape: &ShapeId, focus: Term, component: ConstraintComponent) -> ValidationResult {
        let mut result = ValidationResult::new(focus, shape.clone(), component);
        if let Some(node) = self.document.get(shape).map(Shape::node) {
            result = result.with_severity(node.severity);
            if let Some(message) = &node.message {
                result = result.with_message(message.clone());
            }
        }
        result
    }

    /// A result blaming the shape reference `focus` fails on.
    fn fallback_result(&self, shape: &ShapeId, focus: Term) -> ValidationResult {
        let Some(found) = self.document.get(shape) else {
            return ValidationResult::new(focus, shape.clone(), ConstraintComponent::Node);
        };
        let blamed = self.blamed_dependency(shape, &focus);
        let dependency = blamed
            .and_then(|(index, _)| found.deps().get(index))
            .or_else(|| found.deps().first());
        let component = blamed
            .map(|(_, component)| component)
            .or_else(|| dependency.map(|d| d.component))
            .unwrap_or(ConstraintComponent::Node);
        let path = dependency
            .and_then(|d| d.via.as_ref())
            .and_then(|via| self.document.get(via))
            .or(Some(found))
            .and_then(Shape::as_property)
            .map(|property| property.path.clone());
        let source = dependency
            .and_then(|d| d.via.clone())
            .unwrap_or_else(|| shape.clone());
        let mut result = self.result(&source, focus, component);
        if let Some(path) = path {
            result = result.with_path(path);
        }
        result
    }

    /// The index of the first dependency of `shape` violated by `focus`, with the violated
    /// component.
    ///
    /// Dependencies violated whatever the undefined atoms are prevail over the ones only
    /// violated when undefined atoms are false.
    fn blamed_dependency(
        &self,
        shape: &ShapeId,
        focus: &Term,
    ) -> Option<(usize, ConstraintComponent)> {
        let deps = self.document.get(shape)?.deps();
        let table = self.document.cond_answers(shape)?;
        let grouped = table.regroup().ok()?;
        if !grouped.keys().contains(focus) {
            return None;
        }
        let mut certain = Extensions::default();
        let mut possible = Extensions::default();
        for name in deps.iter().flat_map(referenced_shapes) {
            let members = self
                .document
                .uncond_answers(name)
                .map(|table| table.first_column().cloned().collect::<FxHashSet<_>>())
                .unwrap_or_default();
            let mut possible_members = members.clone();
            if let Some(undefined) = self.document.undefined_answers(name) {
                possible_members.extend(undefined.first_column().cloned());
            }
            certain.insert(name.clone(), members);
            possible.insert(name.clone(), possible_members);
        }
        let values = deps
            .iter()
            .enumerate()
            .map(|(index, dependency)| {
                table
                    .column(&dependency.column_name(index))
                    .map_or(&[][..], |column| grouped.group(focus, column))
            })
            .collect::<Vec<_>>();
        let optimistic = Membership {
            positive: &possible,
            negative: &certain,
        };
        let pessimistic = Membership {
            positive: &certain,
            negative: &possible,
        };
        [optimistic, pessimistic].iter().find_map(|membership| {
            deps.iter()
                .zip(&values)
                .enumerate()
                .find_map(|(index, (dependency, values))| {
                    violation(dependency, values, membership).map(|component| (index, component))
                })
        })
    }
}

impl fmt::Debug for ShaclValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaclValidator")
            .field("document", &self.document)
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .field("shapes_graph", &self.shapes_graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeShape, ShapeRef, Target};
    use oxrdf::Literal;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::default().to_string(), "auto");
        assert_eq!(Strategy::LogicProgram.to_string(), "logic program");
    }

    #[test]
    fn test_empty_document_conforms() {
        let mut validator = ShaclValidator::new(ShapeDocument::new());
        let report = validator.validate_graph(&Graph::new()).unwrap();
        assert!(report.conforms());
        assert!(validator.document().is_validated());
    }

    #[test]
    fn test_deactivated_shape_is_skipped() {
        let mut shape = NodeShape::new(ex("S").into());
        shape.targets.push(Target::Node(ex("a").into()));
        shape.not.push(ShapeRef::positive(ex("S").into()));
        shape.deactivated = true;
        shape.message = Some(Literal::from("unused"));
        let mut document = ShapeDocument::new();
        document.insert(Shape::Node(shape)).unwrap();
        let mut validator = ShaclValidator::new(document);
        assert!(validator.validate_graph(&Graph::new()).unwrap().conforms());
    }
}
