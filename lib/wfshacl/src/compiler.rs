//! Compilation of shapes into SPARQL SELECT queries.
//!
//! The query of a shape returns one row per candidate focus node that satisfies every
//! constraint leaf of the shape. Its first column is the focus node. Each following column
//! is the encoded set of the nodes one [`Dependency`] of the shape has to be checked on, as
//! produced by [`group_expression`]. Whether the focus node really conforms is only known
//! once those references are resolved by an evaluator.

use crate::constraint::{
    Constraint, ConstraintComponent, PropertyPair, StringConstraint, ValueType,
};
use crate::error::EvaluationError;
use crate::model::{NodeShape, PropertyShape, Shape, ShapeDocument, ShapeId, Target};
use crate::path::PropertyPath;
use crate::term::{SKOLEM_PREFIX, group_expression, to_sparql};
use oxrdf::vocab::{rdf, rdfs, xsd};
use oxrdf::{Literal, NamedNode, NamedNodeRef, Term};
use std::fmt;
use std::fmt::Write;

/// Name of the focus node variable.
const FOCUS: &str = "?sub";

/// A SPARQL SELECT query kept in pieces so that it can be renamed and embedded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectQuery {
    pub distinct: bool,
    /// Projection elements: variables or `(expression AS ?variable)`.
    pub head: Vec<String>,
    /// Elements of the `WHERE` group, in order.
    pub body: Vec<String>,
    /// `GROUP BY` conditions.
    pub group: Vec<String>,
    /// `HAVING` conditions, joined by `&&`.
    pub having: Vec<String>,
    /// Names of the projected variables, without the `?`.
    pub vars: Vec<String>,
}

impl SelectQuery {
    /// Returns a copy where every variable `?v` is renamed `?v_<salt>`.
    ///
    /// String literals and IRIs are left untouched.
    #[must_use]
    pub fn rename(&self, salt: impl fmt::Display) -> Self {
        let salt = salt.to_string();
        let rename_all = |parts: &[String]| {
            parts
                .iter()
                .map(|part| rename_variables(part, &salt))
                .collect::<Vec<_>>()
        };
        Self {
            distinct: self.distinct,
            head: rename_all(&self.head),
            body: rename_all(&self.body),
            group: rename_all(&self.group),
            having: rename_all(&self.having),
            vars: self.vars.iter().map(|v| format!("{v}_{salt}")).collect(),
        }
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.head.is_empty() {
            f.write_str("*")?;
        } else {
            f.write_str(&self.head.join(" "))?;
        }
        f.write_str(" WHERE {")?;
        for element in &self.body {
            write!(f, "\n  {element}")?;
        }
        f.write_str("\n}")?;
        if !self.group.is_empty() {
            write!(f, "\nGROUP BY {}", self.group.join(" "))?;
        }
        if !self.having.is_empty() {
            write!(f, "\nHAVING ({})", self.having.join(" && "))?;
        }
        Ok(())
    }
}

fn rename_variables(text: &str, salt: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        output.push(c);
        match c {
            '"' => {
                // String literal, with backslash escapes
                while let Some(c) = chars.next() {
                    output.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            output.push(escaped);
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '<' if chars
                .peek()
                .is_some_and(|next| !next.is_whitespace() && *next != '=') =>
            {
                // IRI, the comparison operators are always followed by a space or '='
                for c in chars.by_ref() {
                    output.push(c);
                    if c == '>' {
                        break;
                    }
                }
            }
            '?' => {
                let mut name = String::new();
                while let Some(next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                output.push_str(&name);
                if !name.is_empty() {
                    output.push('_');
                    output.push_str(salt);
                }
            }
            _ => (),
        }
    }
    output
}

// Targets and candidates

/// The query selecting the focus nodes of a target declaration, bound to `?sub`.
pub fn target_query(target: &Target) -> SelectQuery {
    let body = match target {
        Target::Node(node) => format!("VALUES {FOCUS} {{ {} }}", to_sparql(node.as_ref())),
        Target::Class(class) | Target::Implicit(class) => format!(
            "{FOCUS} <{}>/<{}>* <{}> .",
            rdf::TYPE.as_str(),
            rdfs::SUB_CLASS_OF.as_str(),
            class.as_str()
        ),
        Target::SubjectsOf(predicate) => format!("{FOCUS} <{}> ?object .", predicate.as_str()),
        Target::ObjectsOf(predicate) => format!("?subject <{}> {FOCUS} .", predicate.as_str()),
    };
    SelectQuery {
        distinct: true,
        head: vec![FOCUS.to_owned()],
        body: vec![body],
        vars: vec!["sub".to_owned()],
        ..SelectQuery::default()
    }
}

/// The union of the target queries of a shape, `None` when the shape has no target.
pub fn targets_query(shape: &Shape) -> Option<SelectQuery> {
    if shape.targets().is_empty() {
        return None;
    }
    let branches = shape
        .targets()
        .iter()
        .enumerate()
        .map(|(k, target)| {
            let query = target_query(target).rename(k);
            format!("{{ {{ {query} }} BIND(?sub_{k} AS {FOCUS}) }}")
        })
        .collect::<Vec<_>>();
    Some(SelectQuery {
        distinct: true,
        head: vec![FOCUS.to_owned()],
        body: vec![branches.join(" UNION ")],
        vars: vec!["sub".to_owned()],
        ..SelectQuery::default()
    })
}

/// The graph pattern binding `?sub` to the candidate focus nodes of a shape.
///
/// A referenced shape must be decided on every value node of the shapes referencing it, so its
/// candidates are all the nodes of the data graph plus the `sh:targetNode` constants.
/// Other shapes only need their targets.
pub fn candidates(document: &ShapeDocument, shape: &Shape) -> String {
    if document.is_referenced(shape.id()) {
        let mut branches = vec![
            format!("{{ {FOCUS} ?all_p ?all_o }}"),
            format!("{{ ?all_s ?all_p {FOCUS} }}"),
        ];
        let nodes = document.target_nodes();
        if !nodes.is_empty() {
            branches.push(format!("{{ {} }}", values(&nodes)));
        }
        return format!(
            "{{ SELECT DISTINCT {FOCUS} WHERE {{ {} }} }}",
            branches.join(" UNION ")
        );
    }
    match targets_query(shape) {
        Some(query) => format!("{{ {query} }}"),
        None => format!("VALUES {FOCUS} {{ }}"),
    }
}

fn values(nodes: &[Term]) -> String {
    let nodes = nodes
        .iter()
        .map(|node| to_sparql(node.as_ref()))
        .collect::<Vec<_>>();
    format!("VALUES {FOCUS} {{ {} }}", nodes.join(" "))
}

// Conditional queries

/// Compiles the conditional query of a shape over its default candidates.
pub fn compile(document: &ShapeDocument, id: &ShapeId) -> Result<SelectQuery, EvaluationError> {
    let shape = document
        .get(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?;
    compile_shape(document, shape, &candidates(document, shape))
}

/// Compiles the conditional query of a shape restricted to the given focus nodes.
pub fn compile_for(
    document: &ShapeDocument,
    id: &ShapeId,
    focus_nodes: &[Term],
) -> Result<SelectQuery, EvaluationError> {
    let shape = document
        .get(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?;
    compile_shape(document, shape, &values(focus_nodes))
}

/// Name of the focus node column of the query of a shape.
pub fn shape_column(id: &ShapeId) -> String {
    let variable = id.variable();
    if variable == "sub" || variable.starts_with("InnerObj") || variable.starts_with("dep") {
        format!("shape_{variable}")
    } else {
        variable
    }
}

/// Compiles a shape given the pattern binding its candidate focus nodes to `?sub`.
pub fn compile_shape(
    document: &ShapeDocument,
    shape: &Shape,
    candidates: &str,
) -> Result<SelectQuery, EvaluationError> {
    let column = shape_column(shape.id());
    let mut query = SelectQuery {
        distinct: false,
        head: vec![format!("({FOCUS} AS ?{column})")],
        body: vec![candidates.to_owned()],
        group: vec![FOCUS.to_owned()],
        having: Vec::new(),
        vars: vec![column],
    };
    if shape.is_deactivated() {
        return Ok(query);
    }

    let blocks = match shape {
        Shape::Node(node) => {
            let level = Level {
                node,
                path: None,
                allowed: allowed_predicates(document, node),
            };
            query.body.extend(level.constraints());
            property_shapes(document, node)
        }
        Shape::Property(property) => vec![property],
    };

    for (index, property) in blocks.iter().enumerate() {
        let variable = format!("?InnerObj_{index}");
        let level = Level {
            node: &property.node,
            path: Some(&property.path),
            allowed: allowed_predicates(document, &property.node),
        };
        query.body.extend(level.constraints());

        let has_dependency = shape
            .deps()
            .iter()
            .any(|d| d.via.as_ref() == Some(&property.node.id));
        if has_dependency || property.min_count.is_some() || property.max_count.is_some() {
            let pattern = format!("{FOCUS} {} {variable} .", property.path);
            if is_existential(property) {
                query.body.push(pattern);
            } else {
                query.body.push(format!("OPTIONAL {{ {pattern} }}"));
            }
        }
        if let Some(min) = property.min_count {
            query
                .having
                .push(format!("COUNT(DISTINCT {variable}) >= {min}"));
        }
        if let Some(max) = property.max_count {
            query
                .having
                .push(format!("COUNT(DISTINCT {variable}) <= {max}"));
        }
    }

    for (index, dependency) in shape.deps().iter().enumerate() {
        let name = dependency.column_name(index);
        let variable = match &dependency.via {
            None => FOCUS.to_owned(),
            Some(via) => blocks
                .iter()
                .position(|property| property.node.id == *via)
                .map(|block| format!("?InnerObj_{block}"))
                .ok_or_else(|| EvaluationError::missing_column(shape.id().clone(), &name))?,
        };
        query
            .head
            .push(format!("({} AS ?{name})", group_expression(&variable)));
        query.vars.push(name);
    }
    Ok(query)
}

fn property_shapes<'a>(document: &'a ShapeDocument, node: &NodeShape) -> Vec<&'a PropertyShape> {
    node.properties
        .iter()
        .filter_map(|id| document.get(id)?.as_property())
        .filter(|property| !property.node.deactivated)
        .collect()
}

/// Whether some constraint requires at least one value.
fn is_existential(property: &PropertyShape) -> bool {
    property.min_count.is_some_and(|min| min > 0)
        || property
            .node
            .constraints
            .iter()
            .any(|c| matches!(c, Constraint::HasValue(_)))
        || property
            .node
            .qualified
            .iter()
            .any(|q| q.min.is_some_and(|min| min > 0))
}

/// The predicates a closed shape allows: the ignored ones and those of its simple paths.
fn allowed_predicates(document: &ShapeDocument, node: &NodeShape) -> Vec<NamedNode> {
    let mut allowed = Vec::new();
    for constraint in &node.constraints {
        if let Constraint::Closed { ignored } = constraint {
            allowed.extend(ignored.iter().cloned());
            for property in property_shapes(document, node) {
                if let Some(predicate) = property.path.as_predicate() {
                    allowed.push(predicate.clone());
                }
            }
        }
    }
    allowed
}

/// The constraints of a node shape part, applied either to the focus node itself or to the
/// values reached through a path.
struct Level<'a> {
    node: &'a NodeShape,
    path: Option<&'a PropertyPath>,
    allowed: Vec<NamedNode>,
}

impl Level<'_> {
    /// Pattern binding `variable` to each value.
    fn generate(&self, variable: &str) -> String {
        match self.path {
            Some(path) => format!("{FOCUS} {path} {variable} ."),
            None => format!("BIND({FOCUS} AS {variable})"),
        }
    }

    /// Pattern checking that the already bound `variable` is a value.
    fn test(&self, variable: &str) -> String {
        match self.path {
            Some(path) => format!("{FOCUS} {path} {variable} ."),
            None => format!("FILTER(sameTerm({variable}, {FOCUS}))"),
        }
    }

    /// The condition every value must fulfill, `None` if there is nothing to check.
    fn value_condition(&self, variable: &str) -> Option<String> {
        let mut conditions = self
            .node
            .constraints
            .iter()
            .filter_map(|c| value_expression(c, variable, &self.allowed))
            .map(|expression| format!("COALESCE({expression}, false)"))
            .collect::<Vec<_>>();
        // No value conforms to one of zero shapes
        if self.node.or.iter().chain(&self.node.xone).any(Vec::is_empty) {
            conditions.push("false".to_owned());
        }
        (!conditions.is_empty()).then(|| conditions.join(" && "))
    }

    fn constraints(&self) -> Vec<String> {
        let mut body = Vec::new();
        match self.path {
            Some(_) => {
                if let Some(condition) = self.value_condition("?u") {
                    body.push(format!(
                        "FILTER NOT EXISTS {{ {} FILTER(!({condition})) }}",
                        self.generate("?u")
                    ));
                }
            }
            None => {
                if let Some(condition) = self.value_condition(FOCUS) {
                    body.push(format!("FILTER({condition})"));
                }
            }
        }
        for constraint in &self.node.constraints {
            match constraint {
                Constraint::HasValue(value) => body.push(format!(
                    "FILTER EXISTS {{ {} FILTER(sameTerm(?hv, {})) }}",
                    self.generate("?hv"),
                    to_sparql(value.as_ref())
                )),
                Constraint::PropertyPair(pair) => {
                    body.extend(self.pair_conditions(pair));
                }
                Constraint::UniqueLang if self.path.is_some() => body.push(format!(
                    "FILTER NOT EXISTS {{ {} {} {} }}",
                    self.generate("?ul1"),
                    self.generate("?ul2"),
                    same_language("?ul1", "?ul2")
                )),
                _ => (),
            }
        }
        body
    }

    fn pair_conditions(&self, pair: &PropertyPair) -> Vec<String> {
        let other = pair.predicate().as_str();
        match pair {
            PropertyPair::Equals(_) => vec![
                format!(
                    "FILTER NOT EXISTS {{ {} FILTER NOT EXISTS {{ {FOCUS} <{other}> ?eq }} }}",
                    self.generate("?eq")
                ),
                format!(
                    "FILTER NOT EXISTS {{ {FOCUS} <{other}> ?eq FILTER NOT EXISTS {{ {} }} }}",
                    self.test("?eq")
                ),
            ],
            PropertyPair::Disjoint(_) => vec![format!(
                "FILTER NOT EXISTS {{ {} {FOCUS} <{other}> ?dj . }}",
                self.generate("?dj")
            )],
            PropertyPair::LessThan(_) | PropertyPair::LessThanOrEquals(_) => vec![format!(
                "FILTER NOT EXISTS {{ {} {FOCUS} <{other}> ?lt2 FILTER(!COALESCE(?lt1 {} ?lt2, false)) }}",
                self.generate("?lt1"),
                comparison(pair)
            )],
        }
    }
}

fn comparison(pair: &PropertyPair) -> &'static str {
    if matches!(pair, PropertyPair::LessThanOrEquals(_)) {
        "<="
    } else {
        "<"
    }
}

fn same_language(left: &str, right: &str) -> String {
    format!(
        "FILTER(!sameTerm({left}, {right}) && LANG({left}) != \"\" && LCASE(LANG({left})) = LCASE(LANG({right})))"
    )
}

fn is_blank(variable: &str) -> String {
    format!("(isBlank({variable}) || (isIRI({variable}) && STRSTARTS(STR({variable}), \"{SKOLEM_PREFIX}\")))")
}

fn is_iri(variable: &str) -> String {
    format!("(isIRI({variable}) && !STRSTARTS(STR({variable}), \"{SKOLEM_PREFIX}\"))")
}

/// SPARQL casts accepting exactly the valid lexical forms of their datatype.
fn has_cast(datatype: NamedNodeRef<'_>) -> bool {
    [
        xsd::INTEGER,
        xsd::DECIMAL,
        xsd::DOUBLE,
        xsd::FLOAT,
        xsd::BOOLEAN,
        xsd::DATE_TIME,
    ]
    .contains(&datatype)
}

/// The boolean expression a single value must satisfy for a per-value constraint leaf.
fn value_expression(constraint: &Constraint, v: &str, allowed: &[NamedNode]) -> Option<String> {
    Some(match constraint {
        Constraint::ValueType(ValueType::Class(class)) => format!(
            "EXISTS {{ {v} <{}>/<{}>* <{}> }}",
            rdf::TYPE.as_str(),
            rdfs::SUB_CLASS_OF.as_str(),
            class.as_str()
        ),
        Constraint::ValueType(ValueType::Datatype(datatype)) => {
            let mut expression = format!("isLiteral({v}) && DATATYPE({v}) = <{}>", datatype.as_str());
            if has_cast(datatype.as_ref()) {
                write!(expression, " && isLiteral(<{}>(STR({v})))", datatype.as_str()).ok()?;
            }
            format!("({expression})")
        }
        Constraint::ValueType(ValueType::NodeKind(kind)) => {
            let mut alternatives = Vec::new();
            if kind.allows_blank_node() {
                alternatives.push(is_blank(v));
            }
            if kind.allows_iri() {
                alternatives.push(is_iri(v));
            }
            if kind.allows_literal() {
                alternatives.push(format!("isLiteral({v})"));
            }
            format!("({})", alternatives.join(" || "))
        }
        Constraint::ValueRange(range) => format!(
            "{v} {} {}",
            range.operator(),
            to_sparql(Term::from(range.bound().clone()).as_ref())
        ),
        Constraint::String(StringConstraint::MinLength(length)) => {
            format!("(!{} && STRLEN(STR({v})) >= {length})", is_blank(v))
        }
        Constraint::String(StringConstraint::MaxLength(length)) => {
            format!("(!{} && STRLEN(STR({v})) <= {length})", is_blank(v))
        }
        Constraint::String(StringConstraint::Pattern { pattern, flags }) => {
            let pattern = Literal::new_simple_literal(pattern);
            match flags {
                Some(flags) => format!(
                    "(!{} && REGEX(STR({v}), {pattern}, {}))",
                    is_blank(v),
                    Literal::new_simple_literal(flags)
                ),
                None => format!("(!{} && REGEX(STR({v}), {pattern}))", is_blank(v)),
            }
        }
        Constraint::String(StringConstraint::LanguageIn(languages)) => {
            if languages.is_empty() {
                "false".to_owned()
            } else {
                let alternatives = languages
                    .iter()
                    .map(|l| format!("LANGMATCHES(LANG({v}), {})", Literal::new_simple_literal(l)))
                    .collect::<Vec<_>>();
                format!("(isLiteral({v}) && ({}))", alternatives.join(" || "))
            }
        }
        Constraint::In(members) => {
            if members.is_empty() {
                "false".to_owned()
            } else {
                let alternatives = members
                    .iter()
                    .map(|m| format!("sameTerm({v}, {})", to_sparql(m.as_ref())))
                    .collect::<Vec<_>>();
                format!("({})", alternatives.join(" || "))
            }
        }
        Constraint::Closed { .. } => {
            if allowed.is_empty() {
                format!("NOT EXISTS {{ {v} ?closed_p ?closed_o }}")
            } else {
                let allowed = allowed
                    .iter()
                    .map(|p| format!("<{}>", p.as_str()))
                    .collect::<Vec<_>>();
                format!(
                    "NOT EXISTS {{ {v} ?closed_p ?closed_o FILTER(?closed_p NOT IN ({})) }}",
                    allowed.join(", ")
                )
            }
        }
        Constraint::HasValue(_) | Constraint::PropertyPair(_) | Constraint::UniqueLang => {
            return None;
        }
    })
}

// Diagnosis

/// A query finding the focus nodes violating one constraint of a shape.
///
/// The rows hold the focus node and, when the constraint blames a value, the value in the
/// `value` column.
#[derive(Debug, Clone)]
pub struct Check {
    pub shape: ShapeId,
    pub component: ConstraintComponent,
    pub path: Option<PropertyPath>,
    pub query: SelectQuery,
}

/// The single constraint queries of a shape over the given focus nodes.
///
/// Only constraint leaves and cardinalities are checked: shape references are resolved by
/// the evaluators.
pub fn checks(
    document: &ShapeDocument,
    id: &ShapeId,
    focus_nodes: &[Term],
) -> Result<Vec<Check>, EvaluationError> {
    let shape = document
        .get(id)
        .ok_or_else(|| EvaluationError::unknown_shape(id.clone()))?;
    let mut checks = Vec::new();
    if shape.is_deactivated() || focus_nodes.is_empty() {
        return Ok(checks);
    }
    let focus = values(focus_nodes);
    let properties = match shape {
        Shape::Node(node) => {
            let level = Level {
                node,
                path: None,
                allowed: allowed_predicates(document, node),
            };
            level_checks(&level, id, &focus, &mut checks);
            property_shapes(document, node)
        }
        Shape::Property(property) => vec![property],
    };
    for property in properties {
        let level = Level {
            node: &property.node,
            path: Some(&property.path),
            allowed: allowed_predicates(document, &property.node),
        };
        level_checks(&level, &property.node.id, &focus, &mut checks);
        let counts = [
            (property.min_count, ConstraintComponent::MinCount, "<"),
            (property.max_count, ConstraintComponent::MaxCount, ">"),
        ];
        for (bound, component, operator) in counts {
            let Some(bound) = bound else {
                continue;
            };
            checks.push(Check {
                shape: property.node.id.clone(),
                component,
                path: Some(property.path.clone()),
                query: SelectQuery {
                    head: vec![FOCUS.to_owned()],
                    body: vec![
                        focus.clone(),
                        format!("OPTIONAL {{ {FOCUS} {} ?value }}", property.path),
                    ],
                    group: vec![FOCUS.to_owned()],
                    having: vec![format!("COUNT(DISTINCT ?value) {operator} {bound}")],
                    vars: vec!["sub".to_owned()],
                    ..SelectQuery::default()
                },
            });
        }
    }
    Ok(checks)
}

fn level_checks(level: &Level<'_>, shape: &ShapeId, focus: &str, checks: &mut Vec<Check>) {
    let check = |component, body: Vec<String>, with_value: bool| {
        let mut head = vec![FOCUS.to_owned()];
        let mut vars = vec!["sub".to_owned()];
        if with_value {
            head.push("?value".to_owned());
            vars.push("value".to_owned());
        }
        let mut full_body = vec![focus.to_owned()];
        full_body.extend(body);
        Check {
            shape: shape.clone(),
            component,
            path: level.path.cloned(),
            query: SelectQuery {
                distinct: true,
                head,
                body: full_body,
                vars,
                ..SelectQuery::default()
            },
        }
    };

    for constraint in &level.node.constraints {
        if let Some(expression) = value_expression(constraint, "?value", &level.allowed) {
            checks.push(check(
                constraint.component(),
                vec![
                    level.generate("?value"),
                    format!("FILTER(!COALESCE({expression}, false))"),
                ],
                true,
            ));
            continue;
        }
        match constraint {
            Constraint::HasValue(value) => checks.push(check(
                ConstraintComponent::HasValue,
                vec![format!(
                    "FILTER NOT EXISTS {{ {} FILTER(sameTerm(?hv, {})) }}",
                    level.generate("?hv"),
                    to_sparql(value.as_ref())
                )],
                false,
            )),
            Constraint::PropertyPair(pair) => {
                let other = pair.predicate().as_str();
                let body = match pair {
                    PropertyPair::Equals(_) => format!(
                        "{{ {} FILTER NOT EXISTS {{ {FOCUS} <{other}> ?value }} }} UNION {{ {FOCUS} <{other}> ?value FILTER NOT EXISTS {{ {} }} }}",
                        level.generate("?value"),
                        level.test("?value")
                    ),
                    PropertyPair::Disjoint(_) => {
                        format!("{} {FOCUS} <{other}> ?value .", level.generate("?value"))
                    }
                    PropertyPair::LessThan(_) | PropertyPair::LessThanOrEquals(_) => format!(
                        "{} {FOCUS} <{other}> ?other FILTER(!COALESCE(?value {} ?other, false))",
                        level.generate("?value"),
                        comparison(pair)
                    ),
                };
                checks.push(check(constraint.component(), vec![body], true));
            }
            Constraint::UniqueLang if level.path.is_some() => checks.push(check(
                ConstraintComponent::UniqueLang,
                vec![
                    level.generate("?ul1"),
                    level.generate("?ul2"),
                    same_language("?ul1", "?ul2"),
                ],
                false,
            )),
            _ => (),
        }
    }
    for (lists, component) in [
        (&level.node.or, ConstraintComponent::Or),
        (&level.node.xone, ConstraintComponent::Xone),
    ] {
        if lists.iter().any(Vec::is_empty) {
            checks.push(check(component, vec![level.generate("?value")], true));
        }
    }
}
