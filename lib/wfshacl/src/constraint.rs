//! SHACL constraint leaves.
//!
//! Leaves are grouped by family. Shape references (`sh:node`, `sh:and`...) are not leaves:
//! they live on the shapes themselves and induce [`Dependency`](crate::Dependency) records.

use crate::vocab::sh;
use oxrdf::{Literal, NamedNode, NamedNodeRef, Term};

/// A constraint leaf that can be decided without looking at other shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    ValueType(ValueType),
    ValueRange(ValueRange),
    String(StringConstraint),
    PropertyPair(PropertyPair),
    /// `sh:in`: every value is one of the listed terms.
    In(Vec<Term>),
    /// `sh:hasValue`: the term is one of the values.
    HasValue(Term),
    /// `sh:closed`: the values only have outgoing triples with allowed predicates.
    ///
    /// The allowed predicates are the ignored ones plus the predicates of the
    /// shape's own simple property paths.
    Closed { ignored: Vec<NamedNode> },
    /// `sh:uniqueLang`: no two values share a language tag.
    UniqueLang,
}

impl Constraint {
    pub fn component(&self) -> ConstraintComponent {
        match self {
            Self::ValueType(ValueType::Class(_)) => ConstraintComponent::Class,
            Self::ValueType(ValueType::Datatype(_)) => ConstraintComponent::Datatype,
            Self::ValueType(ValueType::NodeKind(_)) => ConstraintComponent::NodeKind,
            Self::ValueRange(ValueRange::MinExclusive(_)) => ConstraintComponent::MinExclusive,
            Self::ValueRange(ValueRange::MinInclusive(_)) => ConstraintComponent::MinInclusive,
            Self::ValueRange(ValueRange::MaxExclusive(_)) => ConstraintComponent::MaxExclusive,
            Self::ValueRange(ValueRange::MaxInclusive(_)) => ConstraintComponent::MaxInclusive,
            Self::String(StringConstraint::MinLength(_)) => ConstraintComponent::MinLength,
            Self::String(StringConstraint::MaxLength(_)) => ConstraintComponent::MaxLength,
            Self::String(StringConstraint::Pattern { .. }) => ConstraintComponent::Pattern,
            Self::String(StringConstraint::LanguageIn(_)) => ConstraintComponent::LanguageIn,
            Self::PropertyPair(PropertyPair::Equals(_)) => ConstraintComponent::Equals,
            Self::PropertyPair(PropertyPair::Disjoint(_)) => ConstraintComponent::Disjoint,
            Self::PropertyPair(PropertyPair::LessThan(_)) => ConstraintComponent::LessThan,
            Self::PropertyPair(PropertyPair::LessThanOrEquals(_)) => {
                ConstraintComponent::LessThanOrEquals
            }
            Self::In(_) => ConstraintComponent::In,
            Self::HasValue(_) => ConstraintComponent::HasValue,
            Self::Closed { .. } => ConstraintComponent::Closed,
            Self::UniqueLang => ConstraintComponent::UniqueLang,
        }
    }

    /// Checks if the constraint is decided value by value.
    ///
    /// The others look at the whole set of values of a focus node.
    pub fn is_per_value(&self) -> bool {
        matches!(
            self,
            Self::ValueType(_) | Self::ValueRange(_) | Self::String(_) | Self::In(_) | Self::Closed { .. }
        )
    }
}

/// Value type constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// `sh:class`, following `rdfs:subClassOf`.
    Class(NamedNode),
    /// `sh:datatype`. Ill-typed literals do not conform.
    Datatype(NamedNode),
    /// `sh:nodeKind`.
    NodeKind(NodeKind),
}

/// The values of `sh:nodeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::BlankNode => sh::BLANK_NODE,
            Self::Iri => sh::IRI,
            Self::Literal => sh::LITERAL,
            Self::BlankNodeOrIri => sh::BLANK_NODE_OR_IRI,
            Self::BlankNodeOrLiteral => sh::BLANK_NODE_OR_LITERAL,
            Self::IriOrLiteral => sh::IRI_OR_LITERAL,
        }
    }

    pub fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        [
            Self::BlankNode,
            Self::Iri,
            Self::Literal,
            Self::BlankNodeOrIri,
            Self::BlankNodeOrLiteral,
            Self::IriOrLiteral,
        ]
        .into_iter()
        .find(|kind| kind.iri() == iri)
    }

    pub fn allows_blank_node(self) -> bool {
        matches!(
            self,
            Self::BlankNode | Self::BlankNodeOrIri | Self::BlankNodeOrLiteral
        )
    }

    pub fn allows_iri(self) -> bool {
        matches!(self, Self::Iri | Self::BlankNodeOrIri | Self::IriOrLiteral)
    }

    pub fn allows_literal(self) -> bool {
        matches!(
            self,
            Self::Literal | Self::BlankNodeOrLiteral | Self::IriOrLiteral
        )
    }
}

/// Value range constraints, compared with the SPARQL ordering operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRange {
    MinExclusive(Literal),
    MinInclusive(Literal),
    MaxExclusive(Literal),
    MaxInclusive(Literal),
}

impl ValueRange {
    pub fn bound(&self) -> &Literal {
        match self {
            Self::MinExclusive(l)
            | Self::MinInclusive(l)
            | Self::MaxExclusive(l)
            | Self::MaxInclusive(l) => l,
        }
    }

    /// The SPARQL operator `value <op> bound` must satisfy.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::MinExclusive(_) => ">",
            Self::MinInclusive(_) => ">=",
            Self::MaxExclusive(_) => "<",
            Self::MaxInclusive(_) => "<=",
        }
    }
}

/// String based constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringConstraint {
    MinLength(u64),
    MaxLength(u64),
    /// `sh:pattern` with its optional `sh:flags`.
    Pattern {
        pattern: String,
        flags: Option<String>,
    },
    LanguageIn(Vec<String>),
}

/// Property pair constraints, relating the values to those of another predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPair {
    Equals(NamedNode),
    Disjoint(NamedNode),
    LessThan(NamedNode),
    LessThanOrEquals(NamedNode),
}

impl PropertyPair {
    pub fn predicate(&self) -> &NamedNode {
        match self {
            Self::Equals(p) | Self::Disjoint(p) | Self::LessThan(p) | Self::LessThanOrEquals(p) => {
                p
            }
        }
    }
}

/// A SHACL constraint component, as reported in `sh:sourceConstraintComponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintComponent {
    Class,
    Datatype,
    NodeKind,
    MinCount,
    MaxCount,
    MinExclusive,
    MaxExclusive,
    MinInclusive,
    MaxInclusive,
    MinLength,
    MaxLength,
    Pattern,
    LanguageIn,
    UniqueLang,
    Equals,
    Disjoint,
    LessThan,
    LessThanOrEquals,
    Not,
    And,
    Or,
    Xone,
    Node,
    Property,
    QualifiedMinCount,
    QualifiedMaxCount,
    Closed,
    HasValue,
    In,
}

impl ConstraintComponent {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Class => sh::CLASS_CONSTRAINT_COMPONENT,
            Self::Datatype => sh::DATATYPE_CONSTRAINT_COMPONENT,
            Self::NodeKind => sh::NODE_KIND_CONSTRAINT_COMPONENT,
            Self::MinCount => sh::MIN_COUNT_CONSTRAINT_COMPONENT,
            Self::MaxCount => sh::MAX_COUNT_CONSTRAINT_COMPONENT,
            Self::MinExclusive => sh::MIN_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxExclusive => sh::MAX_EXCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinInclusive => sh::MIN_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MaxInclusive => sh::MAX_INCLUSIVE_CONSTRAINT_COMPONENT,
            Self::MinLength => sh::MIN_LENGTH_CONSTRAINT_COMPONENT,
            Self::MaxLength => sh::MAX_LENGTH_CONSTRAINT_COMPONENT,
            Self::Pattern => sh::PATTERN_CONSTRAINT_COMPONENT,
            Self::LanguageIn => sh::LANGUAGE_IN_CONSTRAINT_COMPONENT,
            Self::UniqueLang => sh::UNIQUE_LANG_CONSTRAINT_COMPONENT,
            Self::Equals => sh::EQUALS_CONSTRAINT_COMPONENT,
            Self::Disjoint => sh::DISJOINT_CONSTRAINT_COMPONENT,
            Self::LessThan => sh::LESS_THAN_CONSTRAINT_COMPONENT,
            Self::LessThanOrEquals => sh::LESS_THAN_OR_EQUALS_CONSTRAINT_COMPONENT,
            Self::Not => sh::NOT_CONSTRAINT_COMPONENT,
            Self::And => sh::AND_CONSTRAINT_COMPONENT,
            Self::Or => sh::OR_CONSTRAINT_COMPONENT,
            Self::Xone => sh::XONE_CONSTRAINT_COMPONENT,
            Self::Node => sh::NODE_CONSTRAINT_COMPONENT,
            Self::Property => sh::PROPERTY_CONSTRAINT_COMPONENT,
            Self::QualifiedMinCount => sh::QUALIFIED_MIN_COUNT_CONSTRAINT_COMPONENT,
            Self::QualifiedMaxCount => sh::QUALIFIED_MAX_COUNT_CONSTRAINT_COMPONENT,
            Self::Closed => sh::CLOSED_CONSTRAINT_COMPONENT,
            Self::HasValue => sh::HAS_VALUE_CONSTRAINT_COMPONENT,
            Self::In => sh::IN_CONSTRAINT_COMPONENT,
        }
    }
}
