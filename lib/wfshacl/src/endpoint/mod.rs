//! The query engines the validator runs its queries on.

mod http;
mod store;

use crate::error::EndpointError;
use crate::table::Table;
use oxrdf::{BlankNode, Graph, NamedNodeRef, Variable};
use sparesults::QuerySolution;

pub use http::HttpEndpoint;
pub use store::StoreEndpoint;

/// A SPARQL endpoint holding the data graph.
///
/// Both operations are synchronous and idempotent.
pub trait Endpoint {
    /// Evaluates a SELECT query.
    ///
    /// Unbound values are returned as fresh blank nodes.
    fn query(&self, query: &str) -> Result<Table, EndpointError>;

    /// Adds the triples of `graph` to the named graph `graph_name`.
    fn insert(&self, graph: &Graph, graph_name: NamedNodeRef<'_>) -> Result<(), EndpointError>;
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
    fn query(&self, query: &str) -> Result<Table, EndpointError> {
        (*self).query(query)
    }

    fn insert(&self, graph: &Graph, graph_name: NamedNodeRef<'_>) -> Result<(), EndpointError> {
        (*self).insert(graph, graph_name)
    }
}

/// Collects a solution sequence into a [`Table`].
fn solutions_to_table<E: ToString>(
    variables: &[Variable],
    solutions: impl IntoIterator<Item = Result<QuerySolution, E>>,
) -> Result<Table, EndpointError> {
    let mut table = Table::new(variables.iter().map(|v| v.as_str().to_owned()));
    for solution in solutions {
        let solution = solution.map_err(|e| EndpointError::Results(e.to_string()))?;
        table.push(
            (0..variables.len())
                .map(|i| {
                    solution
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| BlankNode::default().into())
                })
                .collect(),
        )
        .map_err(|e| EndpointError::Results(e.to_string()))?;
    }
    tracing::debug!("The endpoint returned {} rows", table.len());
    Ok(table)
}
