//! Dependency analysis over the shape graph.

use crate::error::EvaluationError;
use crate::model::{Dependency, ShapeDocument, ShapeId};
use rustc_hash::FxHashSet;

/// The precomputed dependencies of a shape.
pub fn deps<'a>(
    document: &'a ShapeDocument,
    shape: &ShapeId,
) -> Result<&'a [Dependency], EvaluationError> {
    document
        .get(shape)
        .map(|s| s.deps())
        .ok_or_else(|| EvaluationError::unknown_shape(shape.clone()))
}

/// The shapes reachable from a shape through its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Closure {
    /// Whether some dependency path leads back to the shape itself.
    pub recursive: bool,
    /// Every shape reachable from the shape, in depth-first discovery order.
    pub dependencies: Vec<ShapeId>,
}

/// Walks the dependencies of `shape` depth-first.
///
/// The shape is recursive iff it is reachable from itself. Shapes reachable along several
/// paths (diamonds) are not cycles: only the shapes of the current path count.
pub fn transitive_closure(
    document: &ShapeDocument,
    shape: &ShapeId,
) -> Result<Closure, EvaluationError> {
    let mut closure = Closure::default();
    let mut seen = FxHashSet::default();
    let mut path = Vec::new();
    visit(document, shape, shape, &mut path, &mut seen, &mut closure)?;
    Ok(closure)
}

fn visit(
    document: &ShapeDocument,
    root: &ShapeId,
    current: &ShapeId,
    path: &mut Vec<ShapeId>,
    seen: &mut FxHashSet<ShapeId>,
    closure: &mut Closure,
) -> Result<(), EvaluationError> {
    path.push(current.clone());
    for dependency in deps(document, current)? {
        for next in referenced_shapes(dependency) {
            if next == root {
                closure.recursive = true;
            }
            if path.contains(next) {
                continue;
            }
            if seen.insert(next.clone()) {
                closure.dependencies.push(next.clone());
                visit(document, root, next, path, seen, closure)?;
            }
        }
    }
    path.pop();
    Ok(())
}

/// The shapes whose extension a dependency needs, qualified siblings included.
pub(crate) fn referenced_shapes(dependency: &Dependency) -> impl Iterator<Item = &ShapeId> {
    dependency.references.iter().map(|r| &r.name).chain(
        dependency
            .qualified
            .iter()
            .flat_map(|bounds| &bounds.siblings),
    )
}

/// Checks whether any shape of the document is recursive.
pub fn has_recursion(document: &ShapeDocument) -> Result<bool, EvaluationError> {
    for shape in document.shapes() {
        if transitive_closure(document, shape.id())?.recursive {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintComponent;
    use crate::model::{DependencyMode, NodeShape, Shape, ShapeRef};
    use oxrdf::NamedNode;

    fn id(name: &str) -> ShapeId {
        NamedNode::new_unchecked(format!("http://example.org/{name}")).into()
    }

    fn document(edges: &[(&str, &[&str])]) -> ShapeDocument {
        let mut document = ShapeDocument::new();
        for (origin, targets) in edges {
            let mut shape = NodeShape::new(id(origin));
            for target in *targets {
                shape.deps.push(Dependency {
                    origin: id(origin),
                    references: vec![ShapeRef::positive(id(target))],
                    mode: DependencyMode::And,
                    external: true,
                    via: None,
                    component: ConstraintComponent::Node,
                    qualified: None,
                });
            }
            document.insert(Shape::Node(shape)).unwrap();
        }
        document
    }

    #[test]
    fn test_diamond_is_not_recursive() {
        let document = document(&[("A", &["B", "C"]), ("B", &["D"]), ("C", &["D"]), ("D", &[])]);
        let closure = transitive_closure(&document, &id("A")).unwrap();
        assert!(!closure.recursive);
        assert_eq!(closure.dependencies, vec![id("B"), id("D"), id("C")]);
        assert!(!has_recursion(&document).unwrap());
    }

    #[test]
    fn test_cycle_is_recursive() {
        let document = document(&[("A", &["B"]), ("B", &["A"]), ("C", &["A"])]);
        assert!(transitive_closure(&document, &id("A")).unwrap().recursive);
        assert!(transitive_closure(&document, &id("B")).unwrap().recursive);
        // C reaches a cycle but is not part of it
        let closure = transitive_closure(&document, &id("C")).unwrap();
        assert!(!closure.recursive);
        assert_eq!(closure.dependencies, vec![id("A"), id("B")]);
        assert!(has_recursion(&document).unwrap());
    }

    #[test]
    fn test_self_reference() {
        let document = document(&[("A", &["A"])]);
        assert!(transitive_closure(&document, &id("A")).unwrap().recursive);
    }

    #[test]
    fn test_unknown_shape() {
        let document = document(&[]);
        assert!(matches!(
            deps(&document, &id("A")),
            Err(EvaluationError::UnknownShape { .. })
        ));
    }
}
