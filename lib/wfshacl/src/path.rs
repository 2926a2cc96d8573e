//! SHACL property paths.
//!
//! Paths are parsed from their RDF syntax in the shapes graph and compiled into
//! SPARQL 1.1 property path expressions:
//! - Predicate path (simple IRI): `<p>`
//! - Sequence path (RDF list): `(<p>/<q>)`
//! - Alternative path (`sh:alternativePath`): `(<p>|<q>)`
//! - Inverse path (`sh:inversePath`): `^<p>`
//! - Zero-or-more path (`sh:zeroOrMorePath`): `<p>*`
//! - One-or-more path (`sh:oneOrMorePath`): `<p>+`
//! - Zero-or-one path (`sh:zeroOrOnePath`): `<p>?`

use crate::error::ShaclParseError;
use crate::extract::{object, parse_list};
use crate::vocab::sh;
use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, Graph, NamedNode, NamedNodeRef, Term, TermRef, Triple};
use std::fmt;

/// A SHACL property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// A simple predicate path (IRI).
    Predicate(NamedNode),

    /// A sequence of paths (executed in order).
    Sequence(Vec<PropertyPath>),

    /// Alternative paths (any one can match).
    Alternative(Vec<PropertyPath>),

    /// Inverse path (traverse in reverse direction).
    Inverse(Box<PropertyPath>),

    /// Zero or more repetitions of the path.
    ZeroOrMore(Box<PropertyPath>),

    /// One or more repetitions of the path.
    OneOrMore(Box<PropertyPath>),

    /// Zero or one occurrence of the path.
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    pub fn predicate(predicate: impl Into<NamedNode>) -> Self {
        Self::Predicate(predicate.into())
    }

    pub fn inverse(path: Self) -> Self {
        Self::Inverse(Box::new(path))
    }

    pub fn zero_or_more(path: Self) -> Self {
        Self::ZeroOrMore(Box::new(path))
    }

    pub fn one_or_more(path: Self) -> Self {
        Self::OneOrMore(Box::new(path))
    }

    pub fn zero_or_one(path: Self) -> Self {
        Self::ZeroOrOne(Box::new(path))
    }

    /// Parses the property path starting at `term` in the shapes graph.
    ///
    /// `shape` is only used to report errors.
    pub fn parse(graph: &Graph, term: TermRef<'_>, shape: &Term) -> Result<Self, ShaclParseError> {
        let node = match term {
            TermRef::NamedNode(node) => return Ok(Self::Predicate(node.into_owned())),
            TermRef::BlankNode(node) => node,
            _ => {
                return Err(ShaclParseError::invalid_property_path(
                    shape.clone(),
                    format!("{term} is not an IRI or a blank node"),
                ));
            }
        };
        let unary: [(NamedNodeRef<'_>, fn(Self) -> Self); 4] = [
            (sh::INVERSE_PATH, Self::inverse),
            (sh::ZERO_OR_MORE_PATH, Self::zero_or_more),
            (sh::ONE_OR_MORE_PATH, Self::one_or_more),
            (sh::ZERO_OR_ONE_PATH, Self::zero_or_one),
        ];
        for (predicate, build) in unary {
            if let Some(inner) = object(graph, node.into(), predicate) {
                return Ok(build(Self::parse(graph, inner.as_ref(), shape)?));
            }
        }
        if let Some(list) = object(graph, node.into(), sh::ALTERNATIVE_PATH) {
            return Self::parse_members(graph, list.as_ref(), shape).map(Self::Alternative);
        }
        if object(graph, node.into(), rdf::FIRST).is_some() {
            return Self::parse_members(graph, term, shape).map(Self::Sequence);
        }
        Err(ShaclParseError::invalid_property_path(
            shape.clone(),
            format!("unknown property path structure at {node}"),
        ))
    }

    fn parse_members(
        graph: &Graph,
        list: TermRef<'_>,
        shape: &Term,
    ) -> Result<Vec<Self>, ShaclParseError> {
        let members = parse_list(graph, list, shape)?;
        if members.is_empty() {
            return Err(ShaclParseError::invalid_property_path(
                shape.clone(),
                "sequence and alternative paths must not be empty",
            ));
        }
        members
            .iter()
            .map(|member| Self::parse(graph, member.as_ref(), shape))
            .collect()
    }

    /// Returns the predicate if this is a simple predicate path.
    pub fn as_predicate(&self) -> Option<&NamedNode> {
        match self {
            Self::Predicate(p) => Some(p),
            _ => None,
        }
    }

    /// The SPARQL 1.1 property path expression.
    pub fn to_sparql(&self) -> String {
        self.to_string()
    }

    /// Writes the SHACL RDF syntax of the path into `graph` and returns its root node.
    pub fn to_graph(&self, graph: &mut Graph) -> Term {
        fn unary(graph: &mut Graph, predicate: NamedNodeRef<'_>, inner: &PropertyPath) -> Term {
            let node = BlankNode::default();
            let inner = inner.to_graph(graph);
            graph.insert(&Triple::new(node.clone(), predicate, inner));
            node.into()
        }

        match self {
            Self::Predicate(p) => p.clone().into(),
            Self::Sequence(paths) => {
                let members = paths.iter().map(|p| p.to_graph(graph)).collect::<Vec<_>>();
                write_list(graph, members)
            }
            Self::Alternative(paths) => {
                let members = paths.iter().map(|p| p.to_graph(graph)).collect::<Vec<_>>();
                let list = write_list(graph, members);
                let node = BlankNode::default();
                graph.insert(&Triple::new(node.clone(), sh::ALTERNATIVE_PATH, list));
                node.into()
            }
            Self::Inverse(p) => unary(graph, sh::INVERSE_PATH, p),
            Self::ZeroOrMore(p) => unary(graph, sh::ZERO_OR_MORE_PATH, p),
            Self::OneOrMore(p) => unary(graph, sh::ONE_OR_MORE_PATH, p),
            Self::ZeroOrOne(p) => unary(graph, sh::ZERO_OR_ONE_PATH, p),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, path: &PropertyPath) -> fmt::Result {
            match path {
                PropertyPath::Predicate(_)
                | PropertyPath::Sequence(_)
                | PropertyPath::Alternative(_) => write!(f, "{path}"),
                _ => write!(f, "({path})"),
            }
        }

        match self {
            Self::Predicate(p) => write!(f, "{p}"),
            Self::Sequence(paths) | Self::Alternative(paths) => {
                let separator = if matches!(self, Self::Sequence(_)) {
                    "/"
                } else {
                    "|"
                };
                write!(f, "(")?;
                for (i, p) in paths.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{separator}")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Self::Inverse(p) => {
                write!(f, "^")?;
                operand(f, p)
            }
            Self::ZeroOrMore(p) => {
                operand(f, p)?;
                write!(f, "*")
            }
            Self::OneOrMore(p) => {
                operand(f, p)?;
                write!(f, "+")
            }
            Self::ZeroOrOne(p) => {
                operand(f, p)?;
                write!(f, "?")
            }
        }
    }
}

/// Writes an RDF list and returns its head.
pub(crate) fn write_list(graph: &mut Graph, members: Vec<Term>) -> Term {
    let mut head = Term::from(rdf::NIL.into_owned());
    for member in members.into_iter().rev() {
        let node = BlankNode::default();
        graph.insert(&Triple::new(node.clone(), rdf::FIRST, member));
        graph.insert(&Triple::new(node.clone(), rdf::REST, head));
        head = node.into();
    }
    head
}
