//! Resolution of conditional answers by unwinding, for shapes without recursion.
//!
//! The unconditional answers of a shape are computed from its conditional answers once the
//! unconditional answers of every shape it depends on are known.

use crate::conditional::conditional_answers;
use crate::constraint::ConstraintComponent;
use crate::deps::{referenced_shapes, transitive_closure};
use crate::endpoint::Endpoint;
use crate::error::{EvaluationError, ShaclError};
use crate::model::{Dependency, DependencyMode, ShapeDocument, ShapeId, ShapeRef};
use crate::table::Table;
use oxrdf::Term;
use rustc_hash::{FxHashMap, FxHashSet};

pub(crate) type Extensions = FxHashMap<ShapeId, FxHashSet<Term>>;

/// Computes and caches the focus nodes conforming to a shape.
///
/// Fails if the shape is recursive.
pub fn unconditional_answers<'a>(
    document: &'a mut ShapeDocument,
    id: &ShapeId,
    endpoint: &dyn Endpoint,
) -> Result<&'a Table, ShaclError> {
    if document.uncond_answers(id).is_none() {
        let table = unwind(document, id, endpoint)?;
        tracing::debug!("{id} has {} unconditional answers", table.len());
        document.store_uncond_answers(id, table);
    }
    document
        .uncond_answers(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()).into())
}

/// Computes the unconditional answers of every shape of the document.
pub fn unwind_all(document: &mut ShapeDocument, endpoint: &dyn Endpoint) -> Result<(), ShaclError> {
    let ids = document
        .shapes()
        .iter()
        .map(|shape| shape.id().clone())
        .collect::<Vec<_>>();
    for id in ids {
        unconditional_answers(document, &id, endpoint)?;
    }
    document.set_answered();
    Ok(())
}

fn unwind(
    document: &mut ShapeDocument,
    id: &ShapeId,
    endpoint: &dyn Endpoint,
) -> Result<Table, ShaclError> {
    if transitive_closure(document, id)?.recursive {
        return Err(EvaluationError::RecursiveShape { shape: id.clone().into() }.into());
    }
    let deps = document
        .get(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?
        .deps()
        .to_vec();

    // Dependees first
    let mut extensions = Extensions::default();
    for dependency in &deps {
        for name in referenced_shapes(dependency) {
            if extensions.contains_key(name) {
                continue;
            }
            let table = unconditional_answers(document, name, endpoint)?;
            if !table.is_unary() {
                return Err(EvaluationError::NonUnaryDependee {
                    shape: name.clone().into(),
                    arity: table.arity(),
                }
                .into());
            }
            extensions.insert(name.clone(), table.first_column().cloned().collect());
        }
    }

    let table = conditional_answers(document, id, endpoint)?;
    let columns = deps
        .iter()
        .enumerate()
        .map(|(index, dependency)| {
            let name = dependency.column_name(index);
            table
                .column(&name)
                .ok_or_else(|| EvaluationError::missing_column(id.clone(), name))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let grouped = table.regroup()?;
    let header = table
        .header()
        .first()
        .cloned()
        .unwrap_or_else(|| id.variable());
    let membership = Membership::exact(&extensions);
    let mut answers = Table::new([header]);
    for key in grouped.keys() {
        let conforms = deps
            .iter()
            .zip(&columns)
            .all(|(dependency, column)| {
                satisfies(dependency, grouped.group(key, *column), &membership)
            });
        if conforms {
            answers.push(vec![key.clone()])?;
        }
    }
    Ok(answers)
}

/// Shape extensions a dependency is checked against.
///
/// Positive references are looked up in `positive`, negative references and disjoint siblings
/// in `negative`. Unwinding uses the same extensions for both. The report builder passes the
/// true and the possibly true nodes of the well-founded model to tell which dependency is
/// certainly violated.
pub(crate) struct Membership<'a> {
    pub positive: &'a Extensions,
    pub negative: &'a Extensions,
}

impl<'a> Membership<'a> {
    pub fn exact(extensions: &'a Extensions) -> Self {
        Self {
            positive: extensions,
            negative: extensions,
        }
    }

    fn holds(&self, reference: &ShapeRef, value: &Term) -> bool {
        let extensions = if reference.negative {
            self.negative
        } else {
            self.positive
        };
        let member = extensions
            .get(&reference.name)
            .is_some_and(|extension| extension.contains(value));
        member != reference.negative
    }

    fn in_sibling(&self, siblings: &[ShapeId], value: &Term) -> bool {
        siblings.iter().any(|sibling| {
            self.negative
                .get(sibling)
                .is_some_and(|extension| extension.contains(value))
        })
    }
}

/// Checks a dependency on the set of nodes it applies to.
fn satisfies(dependency: &Dependency, values: &[Term], membership: &Membership<'_>) -> bool {
    violation(dependency, values, membership).is_none()
}

/// The constraint component a dependency violates on the set of nodes it applies to.
///
/// For qualified value shapes this is the bound that is actually exceeded.
pub(crate) fn violation(
    dependency: &Dependency,
    values: &[Term],
    membership: &Membership<'_>,
) -> Option<ConstraintComponent> {
    let references = &dependency.references;
    let satisfied = match dependency.mode {
        DependencyMode::And | DependencyMode::Not => values
            .iter()
            .all(|v| references.iter().all(|r| membership.holds(r, v))),
        DependencyMode::Or => values
            .iter()
            .all(|v| references.iter().any(|r| membership.holds(r, v))),
        DependencyMode::Xone => values
            .iter()
            .all(|v| references.iter().filter(|r| membership.holds(r, v)).count() == 1),
        DependencyMode::Qualified => {
            let Some(bounds) = &dependency.qualified else {
                return None;
            };
            let count = values
                .iter()
                .filter(|v| {
                    references.iter().all(|r| membership.holds(r, v))
                        && !membership.in_sibling(&bounds.siblings, v)
                })
                .count() as u64;
            if bounds.min.is_some_and(|min| count < min) {
                return Some(ConstraintComponent::QualifiedMinCount);
            }
            if bounds.max.is_some_and(|max| count > max) {
                return Some(ConstraintComponent::QualifiedMaxCount);
            }
            true
        }
    };
    (!satisfied).then_some(dependency.component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QualifiedBounds;
    use oxrdf::NamedNode;

    fn ex(name: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn id(name: &str) -> ShapeId {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn dependency(mode: DependencyMode, references: Vec<ShapeRef>) -> Dependency {
        Dependency {
            origin: id("S"),
            references,
            mode,
            external: true,
            via: None,
            component: ConstraintComponent::Node,
            qualified: None,
        }
    }

    fn extensions() -> Extensions {
        let mut extensions = Extensions::default();
        extensions.insert(id("A"), [ex("a"), ex("ab")].into_iter().collect());
        extensions.insert(id("B"), [ex("b"), ex("ab")].into_iter().collect());
        extensions
    }

    #[test]
    fn test_modes() {
        let extensions = extensions();
        let extensions = Membership::exact(&extensions);
        let a = ShapeRef::positive(id("A"));
        let b = ShapeRef::positive(id("B"));

        let and = dependency(DependencyMode::And, vec![a.clone(), b.clone()]);
        assert!(satisfies(&and, &[ex("ab")], &extensions));
        assert!(!satisfies(&and, &[ex("ab"), ex("a")], &extensions));
        assert!(satisfies(&and, &[], &extensions));

        let or = dependency(DependencyMode::Or, vec![a.clone(), b.clone()]);
        assert!(satisfies(&or, &[ex("a"), ex("b")], &extensions));
        assert!(!satisfies(&or, &[ex("a"), ex("c")], &extensions));

        let xone = dependency(DependencyMode::Xone, vec![a.clone(), b.clone()]);
        assert!(satisfies(&xone, &[ex("a"), ex("b")], &extensions));
        assert!(!satisfies(&xone, &[ex("ab")], &extensions));
        assert!(!satisfies(&xone, &[ex("c")], &extensions));

        let not = dependency(DependencyMode::Not, vec![ShapeRef::negative(id("A"))]);
        assert!(satisfies(&not, &[ex("b"), ex("c")], &extensions));
        assert!(!satisfies(&not, &[ex("b"), ex("a")], &extensions));
    }

    #[test]
    fn test_qualified() {
        let extensions = extensions();
        let extensions = Membership::exact(&extensions);
        let mut qualified = dependency(DependencyMode::Qualified, vec![ShapeRef::positive(id("A"))]);
        qualified.qualified = Some(QualifiedBounds {
            min: Some(1),
            max: Some(1),
            siblings: vec![id("B")],
        });
        assert!(satisfies(&qualified, &[ex("a"), ex("ab"), ex("c")], &extensions));
        assert!(!satisfies(&qualified, &[ex("ab")], &extensions));
        qualified.qualified = Some(QualifiedBounds {
            min: None,
            max: Some(1),
            siblings: Vec::new(),
        });
        assert!(!satisfies(&qualified, &[ex("a"), ex("ab")], &extensions));
    }

    #[test]
    fn test_violated_qualified_bound() {
        let extensions = extensions();
        let extensions = Membership::exact(&extensions);
        let mut qualified = dependency(DependencyMode::Qualified, vec![ShapeRef::positive(id("A"))]);
        qualified.component = ConstraintComponent::QualifiedMinCount;
        qualified.qualified = Some(QualifiedBounds {
            min: Some(1),
            max: Some(1),
            siblings: Vec::new(),
        });
        assert_eq!(
            violation(&qualified, &[ex("a"), ex("ab")], &extensions),
            Some(ConstraintComponent::QualifiedMaxCount)
        );
        assert_eq!(
            violation(&qualified, &[ex("c")], &extensions),
            Some(ConstraintComponent::QualifiedMinCount)
        );
        assert_eq!(violation(&qualified, &[ex("a"), ex("c")], &extensions), None);
    }

    #[test]
    fn test_three_valued_membership() {
        let certain = extensions();
        let mut possible = extensions();
        possible.entry(id("A")).or_default().insert(ex("u"));
        let not = dependency(DependencyMode::Not, vec![ShapeRef::negative(id("A"))]);
        let optimistic = Membership {
            positive: &possible,
            negative: &certain,
        };
        let pessimistic = Membership {
            positive: &certain,
            negative: &possible,
        };
        assert_eq!(violation(&not, &[ex("u")], &optimistic), None);
        assert_eq!(
            violation(&not, &[ex("u")], &pessimistic),
            Some(ConstraintComponent::Node)
        );
    }
}
