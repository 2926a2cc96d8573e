//! Error types of the validator.

use oxrdf::{NamedNode, Term};
use std::io;
use std::time::Duration;

/// Main error type of the crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclError {
    /// The shapes document is malformed.
    #[error(transparent)]
    Parse(#[from] ShaclParseError),

    /// The endpoint failed to answer.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// The well-founded model solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// An evaluation invariant was violated.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Structural errors found while extracting shapes from a shapes graph.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaclParseError {
    /// Invalid shape definition.
    #[error("Invalid shape definition for {shape}: {message}")]
    InvalidShape { shape: Term, message: String },

    /// Missing required property.
    #[error("Missing required property {property} for shape {shape}")]
    MissingProperty { shape: Term, property: NamedNode },

    /// Invalid property value.
    #[error(
        "Invalid value for property {property} in shape {shape}: expected {expected}, got {actual}"
    )]
    InvalidPropertyValue {
        shape: Term,
        property: NamedNode,
        expected: String,
        actual: Term,
    },

    /// Invalid property path.
    #[error("Invalid property path in shape {shape}: {message}")]
    InvalidPropertyPath { shape: Term, message: String },

    /// Invalid RDF list.
    #[error("Invalid RDF list in shape {shape}: {message}")]
    InvalidRdfList { shape: Term, message: String },

    /// Two shapes share the same name.
    #[error("Duplicate shape {shape}")]
    DuplicateShape { shape: Term },

    /// A shape reference points to nothing that could be extracted.
    #[error("Shape {shape} references the unknown shape {reference}")]
    UnknownShape { shape: Term, reference: Term },

    /// Invalid regex pattern.
    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

impl ShaclParseError {
    pub fn invalid_shape(shape: impl Into<Term>, message: impl Into<String>) -> Self {
        Self::InvalidShape {
            shape: shape.into(),
            message: message.into(),
        }
    }

    pub fn missing_property(shape: impl Into<Term>, property: impl Into<NamedNode>) -> Self {
        Self::MissingProperty {
            shape: shape.into(),
            property: property.into(),
        }
    }

    pub fn invalid_property_value(
        shape: impl Into<Term>,
        property: impl Into<NamedNode>,
        expected: impl Into<String>,
        actual: impl Into<Term>,
    ) -> Self {
        Self::InvalidPropertyValue {
            shape: shape.into(),
            property: property.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_property_path(shape: impl Into<Term>, message: impl Into<String>) -> Self {
        Self::InvalidPropertyPath {
            shape: shape.into(),
            message: message.into(),
        }
    }

    pub fn invalid_rdf_list(shape: impl Into<Term>, message: impl Into<String>) -> Self {
        Self::InvalidRdfList {
            shape: shape.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_shape(shape: impl Into<Term>) -> Self {
        Self::DuplicateShape {
            shape: shape.into(),
        }
    }

    pub fn unknown_shape(shape: impl Into<Term>, reference: impl Into<Term>) -> Self {
        Self::UnknownShape {
            shape: shape.into(),
            reference: reference.into(),
        }
    }

    pub fn invalid_regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

/// Transport and protocol errors of an [`Endpoint`](crate::Endpoint).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EndpointError {
    /// Network or local I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The query results could not be parsed.
    #[error("Invalid query results: {0}")]
    Results(String),

    /// The query engine rejected or failed to evaluate the query.
    #[error("Query evaluation failed: {message}\n{query}")]
    Query { query: String, message: String },

    /// The endpoint returned something else than solutions.
    #[error("The endpoint did not return a solution sequence")]
    NotSolutions,

    /// The endpoint has no update URL configured.
    #[error("No update endpoint is configured")]
    ReadOnly,
}

impl EndpointError {
    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        Self::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }
}

/// Failures of a [`Solver`](crate::Solver).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SolverError {
    /// The solver process could not be started or talked to.
    #[error("Failed to run the solver {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The solver exited with a failure status.
    #[error("The solver {command} failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The solver did not answer in time.
    #[error("The solver {command} did not terminate within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The solver output mentions an atom the program does not contain.
    #[error("Unexpected atom in the solver output: {0}")]
    UnknownAtom(String),
}

/// Internal invariant violations during evaluation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// A shape with a cyclic dependency was given to the unwinding evaluator.
    #[error("Shape {shape} is recursive and cannot be unwound")]
    RecursiveShape { shape: Term },

    /// A dependee answer table has more than one column.
    #[error("The answers of {shape} are not unary ({arity} columns)")]
    NonUnaryDependee { shape: Term, arity: usize },

    /// A dependency has no matching column in its conditional answers.
    #[error("The conditional answers of {shape} have no column {column}")]
    MissingColumn { shape: Term, column: String },

    /// Two tables with different attributes were merged.
    #[error("Cannot merge a table with attributes {actual:?} into one with attributes {expected:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A row with a different number of terms than the table has attributes.
    #[error("Cannot push a row of {actual} terms into a table with attributes {header:?}")]
    ArityMismatch { header: Vec<String>, actual: usize },

    /// The conditional answers of a shape were needed before being computed.
    #[error("The conditional answers of {shape} have not been computed")]
    MissingAnswers { shape: Term },

    /// A name is not a shape of the document.
    #[error("Unknown shape {shape}")]
    UnknownShape { shape: Term },

    /// A qualified value shape expands into too many rules.
    #[error("The qualified value shape of {shape} needs more than {limit} rules")]
    ProgramTooLarge { shape: Term, limit: usize },

    /// A grouped column holds a value that is not a valid encoded term.
    #[error("Invalid grouped value '{0}'")]
    InvalidCell(String),
}

impl EvaluationError {
    pub fn unknown_shape(shape: impl Into<Term>) -> Self {
        Self::UnknownShape {
            shape: shape.into(),
        }
    }

    pub fn missing_column(shape: impl Into<Term>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            shape: shape.into(),
            column: column.into(),
        }
    }
}
