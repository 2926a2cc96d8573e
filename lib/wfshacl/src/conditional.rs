//! Evaluation of the conditional answers of shapes.

use crate::compiler::{compile, targets_query};
use crate::endpoint::Endpoint;
use crate::error::{EvaluationError, ShaclError};
use crate::model::{ShapeDocument, ShapeId};
use crate::table::Table;

/// Computes and caches the conditional answers of a shape.
///
/// Each row holds a candidate focus node satisfying every constraint leaf of the shape and,
/// for every dependency of the shape, the encoded set of nodes it must be checked on.
pub fn conditional_answers<'a>(
    document: &'a mut ShapeDocument,
    id: &ShapeId,
    endpoint: &dyn Endpoint,
) -> Result<&'a Table, ShaclError> {
    if document.cond_answers(id).is_none() {
        let query = compile(document, id)?;
        tracing::debug!("Conditional query of {id}:\n{query}");
        let table = endpoint.query(&query.to_string())?;
        check_header(document, id, &table)?;
        tracing::debug!("{id} has {} conditional answers", table.len());
        document.store_cond_answers(id, table);
    }
    document
        .cond_answers(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()).into())
}

fn check_header(document: &ShapeDocument, id: &ShapeId, table: &Table) -> Result<(), EvaluationError> {
    let shape = document
        .get(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?;
    for (index, dependency) in shape.deps().iter().enumerate() {
        let column = dependency.column_name(index);
        if table.column(&column).is_none() {
            return Err(EvaluationError::missing_column(id.clone(), column));
        }
    }
    Ok(())
}

/// Computes and caches the focus nodes targeted by a shape.
pub fn target_nodes<'a>(
    document: &'a mut ShapeDocument,
    id: &ShapeId,
    endpoint: &dyn Endpoint,
) -> Result<&'a Table, ShaclError> {
    if document.targets(id).is_none() {
        let shape = document
            .get(id)
            .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?;
        let table = match targets_query(shape) {
            Some(query) => {
                tracing::debug!("Target query of {id}:\n{query}");
                endpoint.query(&query.to_string())?
            }
            None => Table::new(["sub"]),
        };
        document.store_targets(id, table);
    }
    document
        .targets(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()).into())
}

/// Computes the conditional answers of every shape of the document.
pub fn all_conditional_answers(
    document: &mut ShapeDocument,
    endpoint: &dyn Endpoint,
) -> Result<(), ShaclError> {
    let ids = document
        .shapes()
        .iter()
        .map(|shape| shape.id().clone())
        .collect::<Vec<_>>();
    for id in ids {
        conditional_answers(document, &id, endpoint)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::StoreEndpoint;
    use crate::model::{NodeShape, Shape, Target};
    use oxrdf::{Literal, NamedNode, Term};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    #[test]
    fn test_answers_are_cached() {
        let mut shape = NodeShape::new(ex("S").into());
        shape.targets.push(Target::Node(ex("a").into()));
        shape.targets.push(Target::Node(Literal::from(1).into()));
        let mut document = ShapeDocument::new();
        document.insert(Shape::Node(shape)).unwrap();
        let endpoint = StoreEndpoint::new().unwrap();

        let id = ShapeId::from(ex("S"));
        let first = conditional_answers(&mut document, &id, &endpoint)
            .unwrap()
            .clone();
        assert_eq!(first.len(), 2);
        assert_eq!(
            conditional_answers(&mut document, &id, &endpoint).unwrap(),
            &first
        );
        let targets = target_nodes(&mut document, &id, &endpoint).unwrap();
        assert!(targets.contains(&Term::from(ex("a"))));
        assert!(targets.contains(&Literal::from(1).into()));
    }
}
