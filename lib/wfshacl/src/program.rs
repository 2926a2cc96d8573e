//! Translation of conditional answers into a normal logic program.
//!
//! Shapes become unary predicates `s<i>`, terms become constants `c<j>` and the bodies that
//! need more than a conjunction are expressed with auxiliary predicates `a<k>`.
//! The well-founded model of the program tells which focus nodes conform to which shapes,
//! whether the shapes are recursive or not.
//!
//! ```
//! use oxrdf::{Graph, NamedNodeRef, TripleRef};
//! use oxrdf::vocab::rdf;
//! use wfshacl::{LogicProgram, ProgramOptions, ShapeDocument, StoreEndpoint};
//!
//! let ex = NamedNodeRef::new("http://example.org/Shape")?;
//! let mut shapes = Graph::new();
//! shapes.insert(TripleRef::new(ex, rdf::TYPE, NamedNodeRef::new("http://www.w3.org/ns/shacl#NodeShape")?));
//! shapes.insert(TripleRef::new(ex, NamedNodeRef::new("http://www.w3.org/ns/shacl#targetNode")?, ex));
//! let mut document = ShapeDocument::from_graph(&shapes)?;
//!
//! let program = LogicProgram::translate(&mut document, &StoreEndpoint::new()?, &ProgramOptions::default())?;
//! assert_eq!(program.to_string(), "s0(c0).\n");
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use crate::compiler::shape_column;
use crate::conditional::all_conditional_answers;
use crate::endpoint::Endpoint;
use crate::error::{EvaluationError, ShaclError};
use crate::model::{Dependency, DependencyMode, ShapeDocument, ShapeId, ShapeRef};
use crate::table::Table;
use oxrdf::Term;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// How negated body literals are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Negation {
    /// `~p(c0)`, as DLV and its descendants expect.
    #[default]
    Tilde,
    /// `not p(c0)`, as clingo and XSB expect.
    Not,
}

/// Options of the translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    pub negation: Negation,
    /// Maximal number of rules a single qualified cardinality may expand into.
    pub max_subsets: usize,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            negation: Negation::default(),
            max_subsets: 10_000,
        }
    }
}

/// A predicate of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Predicate {
    /// The extension of the shape with the given document index.
    Shape(usize),
    /// An auxiliary predicate.
    Aux(usize),
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(i) => write!(f, "s{i}"),
            Self::Aux(k) => write!(f, "a{k}"),
        }
    }
}

/// A ground unary atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub predicate: Predicate,
    pub constant: usize,
}

impl Atom {
    pub fn new(predicate: Predicate, constant: usize) -> Self {
        Self {
            predicate,
            constant,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(c{})", self.predicate, self.constant)
    }
}

/// A possibly negated atom of a rule body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyLiteral {
    pub atom: Atom,
    pub negated: bool,
}

impl BodyLiteral {
    pub fn positive(atom: Atom) -> Self {
        Self {
            atom,
            negated: false,
        }
    }

    pub fn negative(atom: Atom) -> Self {
        Self {
            atom,
            negated: true,
        }
    }

    #[must_use]
    fn complement(self) -> Self {
        Self {
            atom: self.atom,
            negated: !self.negated,
        }
    }
}

/// A ground rule `head :- body.`, a fact when the body is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<BodyLiteral>,
}

impl Rule {
    pub fn fact(head: Atom) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

/// Which auxiliary predicate of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AuxKind {
    /// A value satisfies the disjunction (`sh:or`, `sh:xone`).
    Choice,
    /// A value counts for the qualified value shape.
    Counted,
    /// At least `min` values count.
    AtLeast,
    /// More than `max` values count.
    TooMany,
}

/// A ground normal logic program whose well-founded model holds the shape extensions.
#[derive(Debug, Clone, Default)]
pub struct LogicProgram {
    shapes: Vec<ShapeId>,
    columns: Vec<String>,
    constants: Vec<Term>,
    constant_ids: FxHashMap<Term, usize>,
    aux: FxHashMap<(usize, usize, AuxKind), usize>,
    defined: FxHashSet<Atom>,
    rules: Vec<Rule>,
    negation: Negation,
}

impl LogicProgram {
    /// Computes the conditional answers of every shape and translates them.
    pub fn translate(
        document: &mut ShapeDocument,
        endpoint: &dyn Endpoint,
        options: &ProgramOptions,
    ) -> Result<Self, ShaclError> {
        all_conditional_answers(document, endpoint)?;
        let program = Self::from_answers(document, options)?;
        tracing::debug!(
            "Logic program with {} rules over {} constants",
            program.rules.len(),
            program.constants.len()
        );
        Ok(program)
    }

    /// Translates the cached conditional answers of every shape of the document.
    pub(crate) fn from_answers(
        document: &ShapeDocument,
        options: &ProgramOptions,
    ) -> Result<Self, EvaluationError> {
        let mut program = Self {
            negation: options.negation,
            ..Self::default()
        };
        for shape in document.shapes() {
            program.shapes.push(shape.id().clone());
            program.columns.push(shape_column(shape.id()));
        }
        for (index, shape) in document.shapes().iter().enumerate() {
            let table = document
                .cond_answers(shape.id())
                .ok_or_else(|| EvaluationError::MissingAnswers {
                    shape: shape.id().clone().into(),
                })?;
            program.translate_shape(document, index, shape.deps(), table, options)?;
        }
        Ok(program)
    }

    fn translate_shape(
        &mut self,
        document: &ShapeDocument,
        index: usize,
        deps: &[Dependency],
        table: &Table,
        options: &ProgramOptions,
    ) -> Result<(), EvaluationError> {
        let columns = deps
            .iter()
            .enumerate()
            .map(|(j, dependency)| {
                let name = dependency.column_name(j);
                table
                    .column(&name)
                    .ok_or_else(|| EvaluationError::missing_column(self.shapes[index].clone(), name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let grouped = table.regroup()?;
        for key in grouped.keys() {
            let focus = self.constant(key);
            let mut body = Vec::new();
            for (j, (dependency, column)) in deps.iter().zip(&columns).enumerate() {
                let values = grouped.group(key, *column);
                self.expand(document, (index, j), dependency, focus, values, &mut body, options)?;
            }
            self.rules.push(Rule {
                head: Atom::new(Predicate::Shape(index), focus),
                body,
            });
        }
        Ok(())
    }

    /// Adds to `body` the literals meaning that `dependency` holds on `values`.
    #[allow(clippy::too_many_arguments)]
    fn expand(
        &mut self,
        document: &ShapeDocument,
        slot: (usize, usize),
        dependency: &Dependency,
        focus: usize,
        values: &[Term],
        body: &mut Vec<BodyLiteral>,
        options: &ProgramOptions,
    ) -> Result<(), EvaluationError> {
        let references = dependency
            .references
            .iter()
            .map(|reference| self.reference(document, reference))
            .collect::<Result<Vec<_>, _>>()?;
        match dependency.mode {
            DependencyMode::And | DependencyMode::Not => {
                for value in values {
                    let value = self.constant(value);
                    body.extend(references.iter().map(|r| r.literal(value)));
                }
            }
            DependencyMode::Or if references.len() == 1 => {
                for value in values {
                    let value = self.constant(value);
                    body.push(references[0].literal(value));
                }
            }
            DependencyMode::Or | DependencyMode::Xone => {
                let choice = self.aux(slot, AuxKind::Choice);
                for value in values {
                    let value = self.constant(value);
                    let atom = Atom::new(choice, value);
                    if self.defined.insert(atom) {
                        for (i, reference) in references.iter().enumerate() {
                            let mut rule_body = vec![reference.literal(value)];
                            if dependency.mode == DependencyMode::Xone {
                                rule_body.extend(
                                    references
                                        .iter()
                                        .enumerate()
                                        .filter(|(other, _)| *other != i)
                                        .map(|(_, other)| other.literal(value).complement()),
                                );
                            }
                            self.rules.push(Rule {
                                head: atom,
                                body: rule_body,
                            });
                        }
                    }
                    body.push(BodyLiteral::positive(atom));
                }
            }
            DependencyMode::Qualified => {
                let Some(bounds) = &dependency.qualified else {
                    return Ok(());
                };
                let siblings = bounds
                    .siblings
                    .iter()
                    .map(|sibling| self.reference(document, &ShapeRef::negative(sibling.clone())))
                    .collect::<Result<Vec<_>, _>>()?;
                let counted = self.aux(slot, AuxKind::Counted);
                let mut counted_atoms = Vec::with_capacity(values.len());
                for value in values {
                    let value = self.constant(value);
                    let atom = Atom::new(counted, value);
                    if self.defined.insert(atom) {
                        self.rules.push(Rule {
                            head: atom,
                            body: references
                                .iter()
                                .chain(&siblings)
                                .map(|r| r.literal(value))
                                .collect(),
                        });
                    }
                    counted_atoms.push(atom);
                }
                let shape = self.shapes[slot.0].clone();
                if let Some(min) = bounds.min.filter(|min| *min > 0) {
                    let at_least = Atom::new(self.aux(slot, AuxKind::AtLeast), focus);
                    let subsets = subsets(&counted_atoms, min, options.max_subsets, &shape)?;
                    self.rules.extend(subsets.into_iter().map(|subset| Rule {
                        head: at_least,
                        body: subset.into_iter().map(BodyLiteral::positive).collect(),
                    }));
                    body.push(BodyLiteral::positive(at_least));
                }
                if let Some(max) = bounds.max {
                    let too_many = Atom::new(self.aux(slot, AuxKind::TooMany), focus);
                    let subsets =
                        subsets(&counted_atoms, max.saturating_add(1), options.max_subsets, &shape)?;
                    self.rules.extend(subsets.into_iter().map(|subset| Rule {
                        head: too_many,
                        body: subset.into_iter().map(BodyLiteral::positive).collect(),
                    }));
                    body.push(BodyLiteral::negative(too_many));
                }
            }
        }
        Ok(())
    }

    fn reference(
        &self,
        document: &ShapeDocument,
        reference: &ShapeRef,
    ) -> Result<Reference, EvaluationError> {
        let index = document
            .index_of(&reference.name)
            .ok_or_else(|| EvaluationError::unknown_shape(reference.name.clone()))?;
        Ok(Reference {
            predicate: Predicate::Shape(index),
            negated: reference.negative,
        })
    }

    fn aux(&mut self, slot: (usize, usize), kind: AuxKind) -> Predicate {
        let next = self.aux.len();
        Predicate::Aux(*self.aux.entry((slot.0, slot.1, kind)).or_insert(next))
    }

    fn constant(&mut self, term: &Term) -> usize {
        if let Some(id) = self.constant_ids.get(term) {
            return *id;
        }
        let id = self.constants.len();
        self.constants.push(term.clone());
        self.constant_ids.insert(term.clone(), id);
        id
    }

    /// A program over `shapes` shapes, `constants` constants and `aux` auxiliary predicates.
    #[cfg(test)]
    pub(crate) fn from_rules(shapes: usize, constants: usize, aux: usize, rules: Vec<Rule>) -> Self {
        let mut program = Self {
            rules,
            ..Self::default()
        };
        for i in 0..shapes {
            let id = ShapeId::from(oxrdf::NamedNode::new_unchecked(format!(
                "http://example.org/s{i}"
            )));
            program.columns.push(shape_column(&id));
            program.shapes.push(id);
        }
        for j in 0..constants {
            program.constant(&oxrdf::NamedNode::new_unchecked(format!("http://example.org/c{j}")).into());
        }
        for k in 0..aux {
            program.aux.insert((k, 0, AuxKind::Choice), k);
        }
        program
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The shapes, indexed like the `s<i>` predicates.
    pub fn shapes(&self) -> &[ShapeId] {
        &self.shapes
    }

    /// The terms, indexed like the `c<j>` constants.
    pub fn constants(&self) -> &[Term] {
        &self.constants
    }

    pub fn aux_count(&self) -> usize {
        self.aux.len()
    }

    /// Checks that an atom only uses predicates and constants of the program.
    pub fn contains(&self, atom: &Atom) -> bool {
        let predicate = match atom.predicate {
            Predicate::Shape(i) => i < self.shapes.len(),
            Predicate::Aux(k) => k < self.aux.len(),
        };
        predicate && atom.constant < self.constants.len()
    }

    /// The table of the terms `c` such that `s<shape>(c)` is in `atoms`, in constant order.
    pub fn extension(&self, shape: usize, atoms: &FxHashSet<Atom>) -> Table {
        let name = self.columns.get(shape).cloned().unwrap_or_default();
        let mut constants = atoms
            .iter()
            .filter(|atom| atom.predicate == Predicate::Shape(shape))
            .map(|atom| atom.constant)
            .collect::<Vec<_>>();
        constants.sort_unstable();
        Table::unary(
            name,
            constants
                .into_iter()
                .filter_map(|c| self.constants.get(c).cloned()),
        )
    }
}

impl fmt::Display for LogicProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{}", rule.head)?;
            for (i, literal) in rule.body.iter().enumerate() {
                f.write_str(if i == 0 { " :- " } else { ", " })?;
                if literal.negated {
                    f.write_str(match self.negation {
                        Negation::Tilde => "~",
                        Negation::Not => "not ",
                    })?;
                }
                write!(f, "{}", literal.atom)?;
            }
            writeln!(f, ".")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct Reference {
    predicate: Predicate,
    negated: bool,
}

impl Reference {
    fn literal(self, constant: usize) -> BodyLiteral {
        BodyLiteral {
            atom: Atom::new(self.predicate, constant),
            negated: self.negated,
        }
    }
}

/// The subsets of `size` elements of `atoms`, in lexicographic order of positions.
fn subsets(
    atoms: &[Atom],
    size: u64,
    limit: usize,
    shape: &ShapeId,
) -> Result<Vec<Vec<Atom>>, EvaluationError> {
    let Ok(size) = usize::try_from(size) else {
        return Ok(Vec::new());
    };
    if size > atoms.len() {
        return Ok(Vec::new());
    }
    if binomial(atoms.len(), size).is_none_or(|count| count > limit) {
        return Err(EvaluationError::ProgramTooLarge {
            shape: shape.clone().into(),
            limit,
        });
    }
    let mut subsets = Vec::new();
    let mut positions = (0..size).collect::<Vec<_>>();
    loop {
        subsets.push(positions.iter().map(|p| atoms[*p]).collect());
        // Advance the rightmost position that can still move
        let Some(i) = (0..size)
            .rev()
            .find(|i| positions[*i] < atoms.len() - size + *i)
        else {
            return Ok(subsets);
        };
        positions[i] += 1;
        for j in i + 1..size {
            positions[j] = positions[j - 1] + 1;
        }
    }
}

fn binomial(n: usize, k: usize) -> Option<usize> {
    let k = k.min(n - k);
    let mut result = 1_usize;
    for i in 0..k {
        result = result.checked_mul(n - i)? / (i + 1);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintComponent;
    use crate::model::{NodeShape, QualifiedBounds, Shape};
    use crate::term::encode_term;
    use oxrdf::{Literal, NamedNode};

    fn ex(name: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn id(name: &str) -> ShapeId {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn cell(values: &[Term]) -> Term {
        let tokens = values
            .iter()
            .map(|v| encode_term(v.as_ref()))
            .collect::<Vec<_>>();
        Literal::new_simple_literal(tokens.join(" ")).into()
    }

    /// A document whose shapes have the given dependencies and conditional answers.
    fn document(shapes: Vec<(&str, Vec<Dependency>, Vec<(Term, Vec<Vec<Term>>)>)>) -> ShapeDocument {
        let mut document = ShapeDocument::new();
        let mut answers = Vec::new();
        for (name, deps, rows) in shapes {
            let mut shape = NodeShape::new(id(name));
            let mut header = vec![name.to_owned()];
            header.extend(deps.iter().enumerate().map(|(j, d)| d.column_name(j)));
            let mut table = Table::new(header);
            for (focus, cells) in rows {
                let mut row = vec![focus];
                row.extend(cells.iter().map(|values| cell(values)));
                table.push(row).unwrap();
            }
            shape.deps = deps;
            answers.push((id(name), table));
            document.insert(Shape::Node(shape)).unwrap();
        }
        for (name, table) in answers {
            document.store_cond_answers(&name, table);
        }
        document
    }

    fn dependency(origin: &str, mode: DependencyMode, references: Vec<ShapeRef>) -> Dependency {
        Dependency {
            origin: id(origin),
            references,
            mode,
            external: false,
            via: None,
            component: ConstraintComponent::Node,
            qualified: None,
        }
    }

    #[test]
    fn test_facts_and_negation() {
        let document = document(vec![
            (
                "A",
                vec![dependency("A", DependencyMode::Not, vec![ShapeRef::negative(id("B"))])],
                vec![(ex("x"), vec![vec![ex("x")]])],
            ),
            ("B", Vec::new(), vec![(ex("y"), Vec::new())]),
        ]);
        let program = LogicProgram::from_answers(&document, &ProgramOptions::default()).unwrap();
        assert_eq!(program.to_string(), "s0(c0) :- ~s1(c0).\ns1(c1).\n");

        let options = ProgramOptions {
            negation: Negation::Not,
            ..ProgramOptions::default()
        };
        let program = LogicProgram::from_answers(&document, &options).unwrap();
        assert_eq!(program.to_string(), "s0(c0) :- not s1(c0).\ns1(c1).\n");
    }

    #[test]
    fn test_disjunctions() {
        let refs = vec![ShapeRef::positive(id("A")), ShapeRef::positive(id("B"))];
        let document = document(vec![
            ("A", Vec::new(), Vec::new()),
            ("B", Vec::new(), Vec::new()),
            (
                "S",
                vec![
                    dependency("S", DependencyMode::Or, refs.clone()),
                    dependency("S", DependencyMode::Xone, refs),
                ],
                vec![(ex("x"), vec![vec![ex("v")], vec![ex("v")]])],
            ),
        ]);
        let program = LogicProgram::from_answers(&document, &ProgramOptions::default()).unwrap();
        assert_eq!(
            program.to_string(),
            "a0(c1) :- s0(c1).\n\
             a0(c1) :- s1(c1).\n\
             a1(c1) :- s0(c1), ~s1(c1).\n\
             a1(c1) :- s1(c1), ~s0(c1).\n\
             s2(c0) :- a0(c1), a1(c1).\n"
        );
        assert_eq!(program.aux_count(), 2);
    }

    #[test]
    fn test_qualified_expansion() {
        let mut qualified = dependency("S", DependencyMode::Qualified, vec![ShapeRef::positive(id("A"))]);
        qualified.qualified = Some(QualifiedBounds {
            min: Some(2),
            max: Some(2),
            siblings: vec![id("B")],
        });
        let document = document(vec![
            ("A", Vec::new(), Vec::new()),
            ("B", Vec::new(), Vec::new()),
            (
                "S",
                vec![qualified],
                vec![(ex("x"), vec![vec![ex("u"), ex("v"), ex("w")]])],
            ),
        ]);
        let program = LogicProgram::from_answers(&document, &ProgramOptions::default()).unwrap();
        let text = program.to_string();
        assert!(text.contains("a0(c1) :- s0(c1), ~s1(c1).\n"));
        // Three pairs for the lower bound and a single triple for the upper bound
        assert_eq!(text.matches("a1(c0) :- ").count(), 3);
        assert_eq!(text.matches("a2(c0) :- ").count(), 1);
        assert!(text.ends_with("s2(c0) :- a1(c0), ~a2(c0).\n"));

        let options = ProgramOptions {
            max_subsets: 2,
            ..ProgramOptions::default()
        };
        assert!(matches!(
            LogicProgram::from_answers(&document, &options),
            Err(EvaluationError::ProgramTooLarge { limit: 2, .. })
        ));
    }

    #[test]
    fn test_missing_answers() {
        let mut document = ShapeDocument::new();
        document.insert(Shape::Node(NodeShape::new(id("A")))).unwrap();
        assert!(matches!(
            LogicProgram::from_answers(&document, &ProgramOptions::default()),
            Err(EvaluationError::MissingAnswers { .. })
        ));
    }

    #[test]
    fn test_subsets() {
        let atoms = (0..4)
            .map(|c| Atom::new(Predicate::Aux(0), c))
            .collect::<Vec<_>>();
        let shape = id("S");
        assert_eq!(subsets(&atoms, 2, 100, &shape).unwrap().len(), 6);
        assert_eq!(subsets(&atoms, 0, 100, &shape).unwrap(), vec![Vec::new()]);
        assert!(subsets(&atoms, 5, 100, &shape).unwrap().is_empty());
        assert_eq!(binomial(40, 20), Some(137_846_528_820));
    }
}
