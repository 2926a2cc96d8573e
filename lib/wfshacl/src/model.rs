//! SHACL shape model types.
//!
//! This module defines the shape AST:
//! - [`ShapeId`] - Identifier for shapes (IRI or blank node)
//! - [`NodeShape`] and [`PropertyShape`] - the two shape variants, wrapped by [`Shape`]
//! - [`ShapeRef`] and [`Dependency`] - references between shapes
//! - [`Target`] - Target declarations for selecting focus nodes
//! - [`ShapeDocument`] - the arena owning every shape and the evaluation caches

use crate::constraint::{Constraint, ConstraintComponent};
use crate::error::ShaclParseError;
use crate::path::PropertyPath;
use crate::report::Severity;
use crate::table::{GROUP_MARKER, Table};
use crate::term::{local_name, variable_name};
use oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, TermRef};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Unique identifier for a shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeId {
    /// Named shape (IRI).
    Named(NamedNode),
    /// Anonymous shape (blank node).
    Blank(BlankNode),
}

impl ShapeId {
    pub fn to_term(&self) -> Term {
        match self {
            Self::Named(n) => n.clone().into(),
            Self::Blank(b) => b.clone().into(),
        }
    }

    pub fn as_term_ref(&self) -> TermRef<'_> {
        match self {
            Self::Named(n) => n.as_ref().into(),
            Self::Blank(b) => b.as_ref().into(),
        }
    }

    pub fn as_named(&self) -> Option<&NamedNode> {
        match self {
            Self::Named(n) => Some(n),
            Self::Blank(_) => None,
        }
    }

    /// A name usable as a SPARQL variable.
    pub fn variable(&self) -> String {
        variable_name(local_name(self.as_term_ref()))
    }
}

impl From<NamedNode> for ShapeId {
    fn from(n: NamedNode) -> Self {
        Self::Named(n)
    }
}

impl From<BlankNode> for ShapeId {
    fn from(b: BlankNode) -> Self {
        Self::Blank(b)
    }
}

impl From<NamedOrBlankNode> for ShapeId {
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(n) => Self::Named(n),
            NamedOrBlankNode::BlankNode(b) => Self::Blank(b),
        }
    }
}

impl From<ShapeId> for Term {
    fn from(id: ShapeId) -> Self {
        match id {
            ShapeId::Named(n) => n.into(),
            ShapeId::Blank(b) => b.into(),
        }
    }
}

impl From<ShapeId> for NamedOrBlankNode {
    fn from(id: ShapeId) -> Self {
        match id {
            ShapeId::Named(n) => n.into(),
            ShapeId::Blank(b) => b.into(),
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::Blank(b) => write!(f, "{b}"),
        }
    }
}

/// A reference to a shape. A negative reference holds when the shape does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeRef {
    pub name: ShapeId,
    pub negative: bool,
}

impl ShapeRef {
    pub fn positive(name: ShapeId) -> Self {
        Self {
            name,
            negative: false,
        }
    }

    pub fn negative(name: ShapeId) -> Self {
        Self {
            name,
            negative: true,
        }
    }
}

/// How the references of a [`Dependency`] combine on each value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyMode {
    /// Every value conforms to every reference.
    And,
    /// Every value conforms to at least one reference.
    Or,
    /// Every value conforms to exactly one reference.
    Xone,
    /// No value conforms to the reference.
    Not,
    /// The number of values conforming to the reference, and to none of the
    /// sibling shapes, lies within the qualified bounds.
    Qualified,
}

/// Bounds of a qualified value shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedBounds {
    pub min: Option<u64>,
    pub max: Option<u64>,
    /// Shapes the counted values must not conform to (`sh:qualifiedValueShapesDisjoint`).
    pub siblings: Vec<ShapeId>,
}

/// The references to other shapes a shape depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// The shape the dependency belongs to.
    pub origin: ShapeId,
    /// Never empty.
    pub references: Vec<ShapeRef>,
    pub mode: DependencyMode,
    /// Whether the dependency applies to value nodes rather than to the focus node.
    pub external: bool,
    /// The property shape producing the value nodes of an external dependency.
    pub via: Option<ShapeId>,
    /// The constraint component the dependency stems from.
    ///
    /// For qualified dependencies the reported component depends on which bound is broken.
    pub component: ConstraintComponent,
    pub qualified: Option<QualifiedBounds>,
}

impl Dependency {
    /// Name of the conditional answer column of the `index`-th dependency.
    pub fn column_name(&self, index: usize) -> String {
        let target = self
            .references
            .first()
            .map(|r| r.name.variable())
            .unwrap_or_default();
        format!("dep{index}_{target}_{GROUP_MARKER}")
    }
}

/// A `sh:qualifiedValueShape` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedValueShape {
    pub shape: ShapeId,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub disjoint: bool,
}

/// Target declaration for selecting focus nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Target a specific node.
    Node(Term),
    /// Target all instances of a class, following `rdfs:subClassOf`.
    Class(NamedNode),
    /// Target all subjects of triples with the given predicate.
    SubjectsOf(NamedNode),
    /// Target all objects of triples with the given predicate.
    ObjectsOf(NamedNode),
    /// Implicit target (shape is also a class).
    Implicit(NamedNode),
}

/// A node shape, also used as the value node part of property shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeShape {
    pub id: ShapeId,
    pub constraints: Vec<Constraint>,
    /// Property shapes (`sh:property`), in declaration order.
    pub properties: Vec<ShapeId>,
    pub and: Vec<Vec<ShapeRef>>,
    pub or: Vec<Vec<ShapeRef>>,
    pub xone: Vec<Vec<ShapeRef>>,
    pub not: Vec<ShapeRef>,
    /// Direct `sh:node` references.
    pub node: Vec<ShapeRef>,
    pub qualified: Vec<QualifiedValueShape>,
    pub targets: Vec<Target>,
    pub severity: Severity,
    pub message: Option<Literal>,
    pub deactivated: bool,
    /// The dependencies of the shape, including those of its property shapes.
    pub deps: Vec<Dependency>,
}

impl NodeShape {
    pub fn new(id: ShapeId) -> Self {
        Self {
            id,
            constraints: Vec::new(),
            properties: Vec::new(),
            and: Vec::new(),
            or: Vec::new(),
            xone: Vec::new(),
            not: Vec::new(),
            node: Vec::new(),
            qualified: Vec::new(),
            targets: Vec::new(),
            severity: Severity::Violation,
            message: None,
            deactivated: false,
            deps: Vec::new(),
        }
    }

    /// Every shape referenced by this shape, nested property shapes excluded.
    pub fn references(&self) -> impl Iterator<Item = &ShapeId> {
        self.and
            .iter()
            .chain(&self.or)
            .chain(&self.xone)
            .flatten()
            .chain(&self.not)
            .chain(&self.node)
            .map(|r| &r.name)
            .chain(self.qualified.iter().map(|q| &q.shape))
    }
}

/// A property shape: a path, cardinality bounds and the constraints on the value nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyShape {
    pub path: PropertyPath,
    pub min_count: Option<u64>,
    pub max_count: Option<u64>,
    pub node: NodeShape,
    /// The shape declaring this one with `sh:property`, if any.
    pub parent: Option<ShapeId>,
}

/// A shape of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Node(NodeShape),
    Property(PropertyShape),
}

impl Shape {
    pub fn id(&self) -> &ShapeId {
        &self.node().id
    }

    /// The node shape part, holding the constraints and references.
    pub fn node(&self) -> &NodeShape {
        match self {
            Self::Node(shape) => shape,
            Self::Property(shape) => &shape.node,
        }
    }

    pub(crate) fn node_mut(&mut self) -> &mut NodeShape {
        match self {
            Self::Node(shape) => shape,
            Self::Property(shape) => &mut shape.node,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyShape> {
        match self {
            Self::Node(_) => None,
            Self::Property(shape) => Some(shape),
        }
    }

    pub fn deps(&self) -> &[Dependency] {
        &self.node().deps
    }

    pub fn targets(&self) -> &[Target] {
        &self.node().targets
    }

    pub fn is_deactivated(&self) -> bool {
        self.node().deactivated
    }
}

/// The shapes of a shapes graph and the answers computed for them during one validation run.
///
/// Shapes are immutable once the document is built. Answers are cached per shape name:
/// once stored, an answer is never replaced.
#[derive(Debug, Default)]
pub struct ShapeDocument {
    shapes: Vec<Shape>,
    by_name: FxHashMap<ShapeId, usize>,
    referenced: FxHashSet<ShapeId>,
    cond_answers: FxHashMap<ShapeId, Table>,
    uncond_answers: FxHashMap<ShapeId, Table>,
    undefined: FxHashMap<ShapeId, Table>,
    targets: FxHashMap<ShapeId, Table>,
    answered: bool,
    validated: bool,
}

impl ShapeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shape. Names must be unique.
    pub fn insert(&mut self, shape: Shape) -> Result<(), ShaclParseError> {
        let id = shape.id().clone();
        if self.by_name.contains_key(&id) {
            return Err(ShaclParseError::duplicate_shape(id));
        }
        self.by_name.insert(id, self.shapes.len());
        self.shapes.push(shape);
        Ok(())
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.by_name.get(id).map(|i| &self.shapes[*i])
    }

    pub(crate) fn get_mut(&mut self, id: &ShapeId) -> Option<&mut Shape> {
        self.by_name.get(id).map(|i| &mut self.shapes[*i])
    }

    /// Position of the shape in declaration order.
    pub fn index_of(&self, id: &ShapeId) -> Option<usize> {
        self.by_name.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Checks that every dependency points to a shape of the document and indexes the
    /// referenced shapes.
    pub(crate) fn close_references(&mut self) -> Result<(), ShaclParseError> {
        let mut referenced = FxHashSet::default();
        for shape in &self.shapes {
            for dependency in shape.deps() {
                let names = dependency.references.iter().map(|r| &r.name).chain(
                    dependency
                        .qualified
                        .iter()
                        .flat_map(|bounds| &bounds.siblings),
                );
                for name in names {
                    if !self.by_name.contains_key(name) {
                        return Err(ShaclParseError::unknown_shape(
                            shape.id().clone(),
                            name.clone(),
                        ));
                    }
                    referenced.insert(name.clone());
                }
            }
        }
        self.referenced = referenced;
        Ok(())
    }

    /// Checks if some dependency refers to the shape.
    pub fn is_referenced(&self, id: &ShapeId) -> bool {
        self.referenced.contains(id)
    }

    /// Every `sh:targetNode` of the document.
    pub fn target_nodes(&self) -> Vec<Term> {
        let mut nodes = Vec::new();
        for shape in &self.shapes {
            for target in shape.targets() {
                if let Target::Node(node) = target {
                    if !nodes.contains(node) {
                        nodes.push(node.clone());
                    }
                }
            }
        }
        nodes
    }

    pub fn cond_answers(&self, id: &ShapeId) -> Option<&Table> {
        self.cond_answers.get(id)
    }

    pub fn uncond_answers(&self, id: &ShapeId) -> Option<&Table> {
        self.uncond_answers.get(id)
    }

    /// The focus nodes whose conformance is undefined in the well-founded model.
    pub fn undefined_answers(&self, id: &ShapeId) -> Option<&Table> {
        self.undefined.get(id)
    }

    pub fn targets(&self, id: &ShapeId) -> Option<&Table> {
        self.targets.get(id)
    }

    pub(crate) fn store_cond_answers(&mut self, id: &ShapeId, table: Table) {
        self.cond_answers.entry(id.clone()).or_insert(table);
    }

    pub(crate) fn store_uncond_answers(&mut self, id: &ShapeId, table: Table) {
        self.uncond_answers.entry(id.clone()).or_insert(table);
    }

    pub(crate) fn store_undefined_answers(&mut self, id: &ShapeId, table: Table) {
        self.undefined.entry(id.clone()).or_insert(table);
    }

    pub(crate) fn store_targets(&mut self, id: &ShapeId, table: Table) {
        self.targets.entry(id.clone()).or_insert(table);
    }

    /// Whether the unconditional answers of every shape are known.
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub(crate) fn set_answered(&mut self) {
        self.answered = true;
    }

    /// Whether a validation report has been computed from this document.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub(crate) fn set_validated(&mut self) {
        self.validated = true;
    }
}
