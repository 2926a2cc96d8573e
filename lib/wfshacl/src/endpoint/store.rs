use crate::endpoint::{Endpoint, solutions_to_table};
use crate::error::EndpointError;
use crate::table::Table;
use crate::term::skolemize_triple;
use oxigraph::model::{GraphNameRef, QuadRef};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use oxrdf::{Graph, NamedNodeRef};
use std::io;

/// An [`Endpoint`] evaluating queries on an in-memory [`Store`].
///
/// ```
/// use oxrdf::{Graph, NamedNodeRef, TripleRef};
/// use wfshacl::{Endpoint, StoreEndpoint};
///
/// let ex = NamedNodeRef::new("http://example.com")?;
/// let mut graph = Graph::new();
/// graph.insert(TripleRef::new(ex, ex, ex));
/// let endpoint = StoreEndpoint::from_graph(&graph)?;
/// let table = endpoint.query("SELECT ?s WHERE { ?s ?p ?o }")?;
/// assert_eq!(table.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone)]
pub struct StoreEndpoint {
    store: Store,
}

impl StoreEndpoint {
    /// Creates an endpoint on an empty store.
    pub fn new() -> Result<Self, EndpointError> {
        Ok(Self {
            store: Store::new().map_err(io::Error::other)?,
        })
    }

    /// Wraps an existing store.
    pub fn from_store(store: Store) -> Self {
        Self { store }
    }

    /// Loads a data graph into the default graph.
    ///
    /// Blank nodes are skolemized so that queries can refer to them.
    pub fn from_graph(graph: &Graph) -> Result<Self, EndpointError> {
        let endpoint = Self::new()?;
        for triple in graph {
            let triple = skolemize_triple(triple);
            endpoint
                .store
                .insert(QuadRef::new(
                    &triple.subject,
                    &triple.predicate,
                    &triple.object,
                    GraphNameRef::DefaultGraph,
                ))
                .map_err(io::Error::other)?;
        }
        Ok(endpoint)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Endpoint for StoreEndpoint {
    fn query(&self, query: &str) -> Result<Table, EndpointError> {
        tracing::debug!("Evaluating query:\n{query}");
        let prepared = SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| EndpointError::query(query, e))?;
        let results = prepared
            .on_store(&self.store)
            .execute()
            .map_err(|e| EndpointError::query(query, e))?;
        let QueryResults::Solutions(solutions) = results else {
            return Err(EndpointError::NotSolutions);
        };
        let variables = solutions.variables().to_vec();
        solutions_to_table(&variables, solutions)
    }

    fn insert(&self, graph: &Graph, graph_name: NamedNodeRef<'_>) -> Result<(), EndpointError> {
        for triple in graph {
            let triple = skolemize_triple(triple);
            self.store
                .insert(QuadRef::new(
                    &triple.subject,
                    &triple.predicate,
                    &triple.object,
                    graph_name,
                ))
                .map_err(io::Error::other)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Literal, NamedNode, Term, Triple};

    #[test]
    fn test_unbound_values_are_blank_nodes() {
        let endpoint = StoreEndpoint::new().unwrap();
        let table = endpoint
            .query("SELECT ?a ?b WHERE { VALUES ?a { 1 } }")
            .unwrap();
        assert_eq!(table.header(), &["a", "b"]);
        assert_eq!(table.rows()[0][0], Term::from(Literal::from(1)));
        assert!(matches!(table.rows()[0][1], Term::BlankNode(_)));
    }

    #[test]
    fn test_blank_nodes_are_skolemized() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            oxrdf::BlankNode::new_unchecked("b1"),
            NamedNode::new_unchecked("http://example.org/p"),
            Literal::from(1),
        ));
        let endpoint = StoreEndpoint::from_graph(&graph).unwrap();
        let table = endpoint.query("SELECT ?s WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(
            table.rows()[0][0],
            Term::from(NamedNode::new_unchecked(
                "https://w3id.org/wfshacl/.well-known/genid/b1"
            ))
        );
    }

    #[test]
    fn test_insert_into_named_graph() {
        let endpoint = StoreEndpoint::new().unwrap();
        let ex = NamedNode::new_unchecked("http://example.org/g");
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex.clone(), ex.clone(), ex.clone()));
        endpoint.insert(&graph, ex.as_ref()).unwrap();
        assert!(
            endpoint
                .query("SELECT ?s WHERE { ?s ?p ?o }")
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            endpoint
                .query("SELECT ?s WHERE { GRAPH <http://example.org/g> { ?s ?p ?o } }")
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_syntax_error() {
        let endpoint = StoreEndpoint::new().unwrap();
        assert!(matches!(
            endpoint.query("SELECT WHERE"),
            Err(EndpointError::Query { .. })
        ));
    }
}
