#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod compiler;
mod conditional;
mod constraint;
mod deps;
mod endpoint;
mod error;
mod extract;
mod model;
mod path;
mod program;
mod report;
mod solver;
mod table;
pub mod term;
mod unwind;
mod validator;
pub mod vocab;

pub use conditional::{all_conditional_answers, conditional_answers, target_nodes};
pub use constraint::{
    Constraint, ConstraintComponent, NodeKind, PropertyPair, StringConstraint, ValueRange,
    ValueType,
};
pub use deps::{Closure, deps, has_recursion, transitive_closure};
pub use endpoint::{Endpoint, HttpEndpoint, StoreEndpoint};
pub use error::{EndpointError, EvaluationError, ShaclError, ShaclParseError, SolverError};
pub use model::{
    Dependency, DependencyMode, NodeShape, PropertyShape, QualifiedBounds, QualifiedValueShape,
    Shape, ShapeDocument, ShapeId, ShapeRef, Target,
};
pub use path::PropertyPath;
pub use program::{Atom, BodyLiteral, LogicProgram, Negation, Predicate, ProgramOptions, Rule};
pub use report::{Conformance, Severity, ValidationReport, ValidationResult};
pub use solver::{GroundSolver, Solver, SubprocessSolver, WellFoundedModel, parse_model};
pub use table::{GROUP_MARKER, GroupedTable, Table};
pub use unwind::{unconditional_answers, unwind_all};
pub use validator::{ShaclValidator, Strategy};
