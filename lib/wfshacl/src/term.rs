//! Term helpers shared by the query compiler and the evaluators.
//!
//! Terms themselves are the [`oxrdf`] ones. This module renders them as SPARQL constants,
//! maps blank nodes to and from skolem IRIs and encodes the value sets of conditional columns.

use crate::error::EvaluationError;
use oxrdf::vocab::xsd;
use oxrdf::{
    BlankNode, Literal, NamedNode, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef, Triple,
    TripleRef,
};
use percent_encoding::percent_decode_str;

/// Prefix of the IRIs standing for blank nodes inside a store.
pub const SKOLEM_PREFIX: &str = "https://w3id.org/wfshacl/.well-known/genid/";

/// Returns the skolem IRI of a blank node.
pub fn skolem_iri(node: &BlankNode) -> NamedNode {
    NamedNode::new_unchecked(format!("{SKOLEM_PREFIX}{}", node.as_str()))
}

pub fn is_skolem_iri(iri: &str) -> bool {
    iri.starts_with(SKOLEM_PREFIX)
}

/// Replaces a blank node by its skolem IRI.
pub fn skolemize(term: TermRef<'_>) -> Term {
    match term {
        TermRef::BlankNode(node) => skolem_iri(&node.into_owned()).into(),
        _ => term.into_owned(),
    }
}

fn skolemize_subject(subject: NamedOrBlankNodeRef<'_>) -> NamedOrBlankNode {
    match subject {
        NamedOrBlankNodeRef::BlankNode(node) => skolem_iri(&node.into_owned()).into(),
        NamedOrBlankNodeRef::NamedNode(node) => node.into_owned().into(),
    }
}

pub fn skolemize_triple(triple: TripleRef<'_>) -> Triple {
    Triple::new(
        skolemize_subject(triple.subject),
        triple.predicate.into_owned(),
        skolemize(triple.object),
    )
}

/// Maps a skolem IRI back to its blank node, leaving every other term untouched.
pub fn deskolemize(term: Term) -> Term {
    if let Term::NamedNode(node) = &term {
        if let Some(id) = node.as_str().strip_prefix(SKOLEM_PREFIX) {
            if let Ok(node) = BlankNode::new(id) {
                return node.into();
            }
        }
    }
    term
}

/// Renders a term as a SPARQL constant.
///
/// Blank nodes are not valid constants and are written as their skolem IRI.
pub fn to_sparql(term: TermRef<'_>) -> String {
    match term {
        TermRef::BlankNode(node) => skolem_iri(&node.into_owned()).to_string(),
        _ => term.to_string(),
    }
}

/// The last segment of an IRI, or the blank node identifier.
pub fn local_name(term: TermRef<'_>) -> &str {
    match term {
        TermRef::NamedNode(node) => {
            let iri = node.as_str();
            let trimmed = iri.trim_end_matches(['/', '#']);
            match trimmed.rfind(['#', '/', ':']) {
                Some(position) => &trimmed[position + 1..],
                None => trimmed,
            }
        }
        TermRef::BlankNode(node) => node.as_str(),
        _ => "",
    }
}

/// Restricts a name to the characters allowed in a SPARQL variable name.
pub fn variable_name(name: &str) -> String {
    let mut variable: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if variable.is_empty() {
        variable.push('_');
    }
    variable
}

/// SPARQL expression encoding the term bound to `variable` into a single whitespace-free token.
///
/// IRIs become `I<iri>`, literals `L<lexical>^<datatype>` or `L<lexical>@<language>`
/// and blank nodes `B`, every payload being percent-encoded. [`decode_cell`] reverses it.
pub fn encode_expression(variable: &str) -> String {
    format!(
        "IF(isIRI({variable}), CONCAT(\"I\", ENCODE_FOR_URI(STR({variable}))), \
         IF(isLiteral({variable}), CONCAT(\"L\", ENCODE_FOR_URI(STR({variable})), \
         IF(LANG({variable}) = \"\", CONCAT(\"^\", ENCODE_FOR_URI(STR(DATATYPE({variable})))), \
         CONCAT(\"@\", LANG({variable})))), \"B\"))"
    )
}

/// SPARQL aggregate collecting the distinct encoded values of `variable`.
///
/// Unbound values are encoded as the empty token so that they do not poison the whole group.
pub fn group_expression(variable: &str) -> String {
    format!(
        "GROUP_CONCAT(DISTINCT COALESCE({}, \"\"); SEPARATOR=\" \")",
        encode_expression(variable)
    )
}

/// Decodes a cell produced by [`group_expression`] into its distinct terms.
pub fn decode_cell(cell: &Term) -> Result<Vec<Term>, EvaluationError> {
    let Term::Literal(literal) = cell else {
        // Unbound aggregate
        return Ok(Vec::new());
    };
    let mut terms = Vec::new();
    for token in literal.value().split_whitespace() {
        let term = decode_token(token)?;
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    Ok(terms)
}

fn decode_token(token: &str) -> Result<Term, EvaluationError> {
    let invalid = || EvaluationError::InvalidCell(token.to_owned());
    let decode = |value: &str| {
        percent_decode_str(value)
            .decode_utf8()
            .map(|value| value.into_owned())
            .map_err(|_| invalid())
    };
    if token == "B" {
        tracing::warn!(
            "The endpoint returned a blank node value, it is replaced by a fresh blank node"
        );
        return Ok(BlankNode::default().into());
    }
    if let Some(iri) = token.strip_prefix('I') {
        return Ok(NamedNode::new(decode(iri)?).map_err(|_| invalid())?.into());
    }
    let literal = token.strip_prefix('L').ok_or_else(invalid)?;
    if let Some((value, datatype)) = literal.split_once('^') {
        let datatype = NamedNode::new(decode(datatype)?).map_err(|_| invalid())?;
        return Ok(if datatype.as_ref() == xsd::STRING {
            Literal::new_simple_literal(decode(value)?)
        } else {
            Literal::new_typed_literal(decode(value)?, datatype)
        }
        .into());
    }
    if let Some((value, language)) = literal.split_once('@') {
        return Ok(
            Literal::new_language_tagged_literal(decode(value)?, decode(language)?)
                .map_err(|_| invalid())?
                .into(),
        );
    }
    Err(invalid())
}

/// Encodes a term the way [`encode_expression`] does, for tables built outside of an endpoint.
pub fn encode_term(term: TermRef<'_>) -> String {
    use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

    let encode = |value: &str| utf8_percent_encode(value, NON_ALPHANUMERIC).to_string();
    match term {
        TermRef::NamedNode(node) => format!("I{}", encode(node.as_str())),
        TermRef::Literal(literal) => match literal.language() {
            Some(language) => format!("L{}@{language}", encode(literal.value())),
            None => format!(
                "L{}^{}",
                encode(literal.value()),
                encode(literal.datatype().as_str())
            ),
        },
        _ => "B".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::xsd;

    #[test]
    fn test_decode_cell() {
        let cell = Literal::new_simple_literal(format!(
            "{} {}  {} {}",
            encode_term(NamedNode::new_unchecked("http://example.org/a%20b?x=1#f").as_ref().into()),
            encode_term(Literal::new_typed_literal("12", xsd::INTEGER).as_ref().into()),
            encode_term(
                Literal::new_language_tagged_literal_unchecked("chat", "fr")
                    .as_ref()
                    .into()
            ),
            encode_term(NamedNode::new_unchecked("http://example.org/a%20b?x=1#f").as_ref().into()),
        ));
        let terms = decode_cell(&cell.into()).unwrap();
        assert_eq!(
            terms,
            vec![
                Term::from(NamedNode::new_unchecked("http://example.org/a%20b?x=1#f")),
                Literal::new_typed_literal("12", xsd::INTEGER).into(),
                Literal::new_language_tagged_literal_unchecked("chat", "fr").into(),
            ]
        );
    }

    #[test]
    fn test_decode_empty_cell() {
        assert!(
            decode_cell(&Literal::new_simple_literal("").into())
                .unwrap()
                .is_empty()
        );
        assert!(decode_cell(&BlankNode::default().into()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_string_literal() {
        let cell = Literal::new_simple_literal(encode_term(
            Literal::new_simple_literal("a \"quoted\" value").as_ref().into(),
        ));
        assert_eq!(
            decode_cell(&cell.into()).unwrap(),
            vec![Term::from(Literal::new_simple_literal("a \"quoted\" value"))]
        );
    }

    #[test]
    fn test_invalid_token() {
        decode_cell(&Literal::new_simple_literal("Xfoo").into()).unwrap_err();
    }

    #[test]
    fn test_skolemization() {
        let node = BlankNode::new_unchecked("b1");
        let skolem = skolemize(node.as_ref().into());
        assert_eq!(
            skolem,
            Term::from(NamedNode::new_unchecked(
                "https://w3id.org/wfshacl/.well-known/genid/b1"
            ))
        );
        assert_eq!(deskolemize(skolem), Term::from(node));
    }

    #[test]
    fn test_local_name() {
        assert_eq!(
            local_name(NamedNode::new_unchecked("http://example.org/ns#Person").as_ref().into()),
            "Person"
        );
        assert_eq!(
            local_name(NamedNode::new_unchecked("http://example.org/shapes/A/").as_ref().into()),
            "A"
        );
        assert_eq!(variable_name("my-shape.1"), "my_shape_1");
    }
}
