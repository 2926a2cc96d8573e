//! Extraction of the shape AST from a shapes graph, and its re-emission as RDF.

use crate::constraint::{
    Constraint, ConstraintComponent, NodeKind, PropertyPair, StringConstraint, ValueRange,
    ValueType,
};
use crate::error::ShaclParseError;
use crate::model::{
    Dependency, DependencyMode, NodeShape, PropertyShape, QualifiedBounds, QualifiedValueShape,
    Shape, ShapeDocument, ShapeId, ShapeRef, Target,
};
use crate::path::{PropertyPath, write_list};
use crate::report::Severity;
use crate::vocab::sh;
use oxrdf::vocab::{rdf, rdfs, xsd};
use oxrdf::{
    Graph, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef,
    Triple,
};
use rustc_hash::{FxHashMap, FxHashSet};

impl ShapeDocument {
    /// Extracts every shape of a shapes graph.
    ///
    /// Shapes are the instances of `sh:NodeShape` and `sh:PropertyShape`, the subjects of
    /// target declarations and every node used as a shape by `sh:property`, `sh:node`,
    /// `sh:not`, `sh:qualifiedValueShape`, `sh:and`, `sh:or` or `sh:xone`.
    pub fn from_graph(graph: &Graph) -> Result<Self, ShaclParseError> {
        let (candidates, required_paths) = discover_shapes(graph)?;
        let mut parents = FxHashMap::<NamedOrBlankNode, ShapeId>::default();
        for triple in graph.triples_for_predicate(sh::PROPERTY) {
            if let Some(property) = as_subject(triple.object) {
                parents
                    .entry(property.into_owned())
                    .or_insert_with(|| triple.subject.into_owned().into());
            }
        }

        let mut document = Self::new();
        for candidate in &candidates {
            let shape = parse_shape(
                graph,
                candidate.as_ref(),
                required_paths.contains(candidate),
                parents.get(candidate).cloned(),
            )?;
            document.insert(shape)?;
        }

        let dependencies = document
            .shapes()
            .iter()
            .map(|shape| (shape.id().clone(), dependencies(&document, shape)))
            .collect::<Vec<_>>();
        for (id, deps) in dependencies {
            if let Some(shape) = document.get_mut(&id) {
                shape.node_mut().deps = deps;
            }
        }
        document.close_references()?;
        tracing::debug!("Extracted {} shapes", document.len());
        Ok(document)
    }

    /// Writes the shapes back as a SHACL shapes graph.
    ///
    /// Extracting the returned graph yields a document with the same shapes.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        for shape in self.shapes() {
            write_shape(&mut graph, shape);
        }
        graph
    }
}

// Discovery

fn discover_shapes(
    graph: &Graph,
) -> Result<(Vec<NamedOrBlankNode>, FxHashSet<NamedOrBlankNode>), ShaclParseError> {
    let mut candidates = Vec::new();
    let mut seen = FxHashSet::default();
    let mut required_paths = FxHashSet::default();
    let mut add = |node: NamedOrBlankNode| {
        if seen.insert(node.clone()) {
            candidates.push(node);
        }
    };

    for triple in graph.triples_for_predicate(rdf::TYPE) {
        if triple.object == sh::NODE_SHAPE.into() {
            add(triple.subject.into_owned());
        } else if triple.object == sh::PROPERTY_SHAPE.into() {
            add(triple.subject.into_owned());
            required_paths.insert(triple.subject.into_owned());
        }
    }
    for predicate in [
        sh::TARGET_NODE,
        sh::TARGET_CLASS,
        sh::TARGET_SUBJECTS_OF,
        sh::TARGET_OBJECTS_OF,
    ] {
        for triple in graph.triples_for_predicate(predicate) {
            add(triple.subject.into_owned());
        }
    }
    for predicate in [
        sh::PROPERTY,
        sh::NODE,
        sh::NOT,
        sh::QUALIFIED_VALUE_SHAPE,
    ] {
        for triple in graph.triples_for_predicate(predicate) {
            let shape = shape_reference(triple.subject.into(), predicate, triple.object)?;
            if predicate == sh::PROPERTY {
                required_paths.insert(shape.clone());
            }
            add(shape);
        }
    }
    for predicate in [sh::AND, sh::OR, sh::XONE] {
        for triple in graph.triples_for_predicate(predicate) {
            let owner = Term::from(triple.subject.into_owned());
            for member in parse_list(graph, triple.object, &owner)? {
                add(shape_reference(triple.subject.into(), predicate, member.as_ref())?);
            }
        }
    }
    Ok((candidates, required_paths))
}

fn shape_reference(
    owner: TermRef<'_>,
    predicate: NamedNodeRef<'_>,
    value: TermRef<'_>,
) -> Result<NamedOrBlankNode, ShaclParseError> {
    as_subject(value)
        .map(NamedOrBlankNodeRef::into_owned)
        .ok_or_else(|| {
            ShaclParseError::invalid_property_value(
                owner.into_owned(),
                predicate.into_owned(),
                "an IRI or a blank node",
                value.into_owned(),
            )
        })
}

// Per shape parsing

struct ShapeParser<'a> {
    graph: &'a Graph,
    subject: NamedOrBlankNodeRef<'a>,
    term: Term,
}

fn parse_shape(
    graph: &Graph,
    subject: NamedOrBlankNodeRef<'_>,
    path_required: bool,
    parent: Option<ShapeId>,
) -> Result<Shape, ShaclParseError> {
    let parser = ShapeParser {
        graph,
        subject,
        term: subject.into_owned().into(),
    };
    let mut node = NodeShape::new(subject.into_owned().into());
    parser.parse_targets(&mut node)?;
    parser.parse_constraints(&mut node)?;
    parser.parse_references(&mut node)?;
    parser.parse_metadata(&mut node)?;

    let Some(path) = parser.object(sh::PATH) else {
        if path_required {
            return Err(ShaclParseError::missing_property(parser.term, sh::PATH));
        }
        return Ok(Shape::Node(node));
    };
    Ok(Shape::Property(PropertyShape {
        path: PropertyPath::parse(graph, path.as_ref(), &parser.term)?,
        min_count: parser.count(sh::MIN_COUNT)?,
        max_count: parser.count(sh::MAX_COUNT)?,
        node,
        parent,
    }))
}

impl ShapeParser<'_> {
    fn object(&self, predicate: NamedNodeRef<'_>) -> Option<Term> {
        object(self.graph, self.subject, predicate)
    }

    fn objects(&self, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        objects(self.graph, self.subject, predicate)
    }

    fn invalid(&self, predicate: NamedNodeRef<'_>, expected: &str, actual: Term) -> ShaclParseError {
        ShaclParseError::invalid_property_value(
            self.term.clone(),
            predicate.into_owned(),
            expected,
            actual,
        )
    }

    fn iri(&self, predicate: NamedNodeRef<'_>, value: Term) -> Result<NamedNode, ShaclParseError> {
        match value {
            Term::NamedNode(node) => Ok(node),
            value => Err(self.invalid(predicate, "an IRI", value)),
        }
    }

    fn iris(&self, predicate: NamedNodeRef<'_>) -> Result<Vec<NamedNode>, ShaclParseError> {
        self.objects(predicate)
            .into_iter()
            .map(|value| self.iri(predicate, value))
            .collect()
    }

    fn literal(&self, predicate: NamedNodeRef<'_>, value: Term) -> Result<Literal, ShaclParseError> {
        match value {
            Term::Literal(literal) => Ok(literal),
            value => Err(self.invalid(predicate, "a literal", value)),
        }
    }

    fn count(&self, predicate: NamedNodeRef<'_>) -> Result<Option<u64>, ShaclParseError> {
        let Some(value) = self.object(predicate) else {
            return Ok(None);
        };
        if let Term::Literal(literal) = &value {
            if let Ok(count) = literal.value().trim().parse::<u64>() {
                return Ok(Some(count));
            }
        }
        Err(self.invalid(predicate, "a non-negative integer", value))
    }

    fn boolean(&self, predicate: NamedNodeRef<'_>) -> Result<Option<bool>, ShaclParseError> {
        let Some(value) = self.object(predicate) else {
            return Ok(None);
        };
        if let Term::Literal(literal) = &value {
            match literal.value() {
                "true" | "1" => return Ok(Some(true)),
                "false" | "0" => return Ok(Some(false)),
                _ => (),
            }
        }
        Err(self.invalid(predicate, "a boolean", value))
    }

    fn list(&self, predicate: NamedNodeRef<'_>) -> Result<Vec<Vec<Term>>, ShaclParseError> {
        self.objects(predicate)
            .iter()
            .map(|head| parse_list(self.graph, head.as_ref(), &self.term))
            .collect()
    }

    fn parse_targets(&self, node: &mut NodeShape) -> Result<(), ShaclParseError> {
        for value in self.objects(sh::TARGET_NODE) {
            node.targets.push(Target::Node(value));
        }
        for class in self.iris(sh::TARGET_CLASS)? {
            node.targets.push(Target::Class(class));
        }
        for predicate in self.iris(sh::TARGET_SUBJECTS_OF)? {
            node.targets.push(Target::SubjectsOf(predicate));
        }
        for predicate in self.iris(sh::TARGET_OBJECTS_OF)? {
            node.targets.push(Target::ObjectsOf(predicate));
        }
        if let NamedOrBlankNodeRef::NamedNode(iri) = self.subject {
            if self
                .graph
                .objects_for_subject_predicate(iri, rdf::TYPE)
                .any(|t| t == rdfs::CLASS.into())
            {
                node.targets.push(Target::Implicit(iri.into_owned()));
            }
        }
        Ok(())
    }

    fn parse_constraints(&self, node: &mut NodeShape) -> Result<(), ShaclParseError> {
        let constraints = &mut node.constraints;

        for class in self.iris(sh::CLASS)? {
            constraints.push(Constraint::ValueType(ValueType::Class(class)));
        }
        for datatype in self.iris(sh::DATATYPE)? {
            constraints.push(Constraint::ValueType(ValueType::Datatype(datatype)));
        }
        for kind in self.iris(sh::NODE_KIND)? {
            let kind = NodeKind::from_iri(kind.as_ref())
                .ok_or_else(|| self.invalid(sh::NODE_KIND, "a SHACL node kind", kind.into()))?;
            constraints.push(Constraint::ValueType(ValueType::NodeKind(kind)));
        }

        let ranges: [(NamedNodeRef<'_>, fn(Literal) -> ValueRange); 4] = [
            (sh::MIN_EXCLUSIVE, ValueRange::MinExclusive),
            (sh::MIN_INCLUSIVE, ValueRange::MinInclusive),
            (sh::MAX_EXCLUSIVE, ValueRange::MaxExclusive),
            (sh::MAX_INCLUSIVE, ValueRange::MaxInclusive),
        ];
        for (predicate, build) in ranges {
            for value in self.objects(predicate) {
                constraints.push(Constraint::ValueRange(build(
                    self.literal(predicate, value)?,
                )));
            }
        }

        if let Some(length) = self.count(sh::MIN_LENGTH)? {
            constraints.push(Constraint::String(StringConstraint::MinLength(length)));
        }
        if let Some(length) = self.count(sh::MAX_LENGTH)? {
            constraints.push(Constraint::String(StringConstraint::MaxLength(length)));
        }
        let flags = self
            .object(sh::FLAGS)
            .map(|flags| self.literal(sh::FLAGS, flags))
            .transpose()?
            .map(|flags| flags.value().to_owned());
        for pattern in self.objects(sh::PATTERN) {
            let pattern = self.literal(sh::PATTERN, pattern)?.value().to_owned();
            check_pattern(&self.term, &pattern, flags.as_deref())?;
            constraints.push(Constraint::String(StringConstraint::Pattern {
                pattern,
                flags: flags.clone(),
            }));
        }
        for languages in self.list(sh::LANGUAGE_IN)? {
            let languages = languages
                .into_iter()
                .map(|language| {
                    self.literal(sh::LANGUAGE_IN, language)
                        .map(|l| l.value().to_owned())
                })
                .collect::<Result<Vec<_>, _>>()?;
            constraints.push(Constraint::String(StringConstraint::LanguageIn(languages)));
        }

        let pairs: [(NamedNodeRef<'_>, fn(NamedNode) -> PropertyPair); 4] = [
            (sh::EQUALS, PropertyPair::Equals),
            (sh::DISJOINT, PropertyPair::Disjoint),
            (sh::LESS_THAN, PropertyPair::LessThan),
            (sh::LESS_THAN_OR_EQUALS, PropertyPair::LessThanOrEquals),
        ];
        for (predicate, build) in pairs {
            for other in self.iris(predicate)? {
                constraints.push(Constraint::PropertyPair(build(other)));
            }
        }

        for values in self.list(sh::IN)? {
            constraints.push(Constraint::In(values));
        }
        for value in self.objects(sh::HAS_VALUE) {
            constraints.push(Constraint::HasValue(value));
        }
        if self.boolean(sh::CLOSED)? == Some(true) {
            let mut ignored = Vec::new();
            for list in self.list(sh::IGNORED_PROPERTIES)? {
                for member in list {
                    ignored.push(self.iri(sh::IGNORED_PROPERTIES, member)?);
                }
            }
            constraints.push(Constraint::Closed { ignored });
        }
        if self.boolean(sh::UNIQUE_LANG)? == Some(true) {
            constraints.push(Constraint::UniqueLang);
        }
        Ok(())
    }

    fn parse_references(&self, node: &mut NodeShape) -> Result<(), ShaclParseError> {
        let to_refs = |predicate: NamedNodeRef<'_>, list: Vec<Term>| {
            list.into_iter()
                .map(|member| {
                    shape_reference(self.term.as_ref(), predicate, member.as_ref())
                        .map(|name| ShapeRef::positive(name.into()))
                })
                .collect::<Result<Vec<_>, _>>()
        };
        for list in self.list(sh::AND)? {
            node.and.push(to_refs(sh::AND, list)?);
        }
        for list in self.list(sh::OR)? {
            node.or.push(to_refs(sh::OR, list)?);
        }
        for list in self.list(sh::XONE)? {
            node.xone.push(to_refs(sh::XONE, list)?);
        }
        for value in self.objects(sh::NOT) {
            let name = shape_reference(self.term.as_ref(), sh::NOT, value.as_ref())?;
            node.not.push(ShapeRef::negative(name.into()));
        }
        for value in self.objects(sh::NODE) {
            let name = shape_reference(self.term.as_ref(), sh::NODE, value.as_ref())?;
            node.node.push(ShapeRef::positive(name.into()));
        }
        for value in self.objects(sh::PROPERTY) {
            let name = shape_reference(self.term.as_ref(), sh::PROPERTY, value.as_ref())?;
            node.properties.push(name.into());
        }
        let qualified = self.objects(sh::QUALIFIED_VALUE_SHAPE);
        if !qualified.is_empty() {
            let min = self.count(sh::QUALIFIED_MIN_COUNT)?;
            let max = self.count(sh::QUALIFIED_MAX_COUNT)?;
            let disjoint = self
                .boolean(sh::QUALIFIED_VALUE_SHAPES_DISJOINT)?
                .unwrap_or(false);
            for value in qualified {
                let name =
                    shape_reference(self.term.as_ref(), sh::QUALIFIED_VALUE_SHAPE, value.as_ref())?;
                node.qualified.push(QualifiedValueShape {
                    shape: name.into(),
                    min,
                    max,
                    disjoint,
                });
            }
        }
        Ok(())
    }

    fn parse_metadata(&self, node: &mut NodeShape) -> Result<(), ShaclParseError> {
        if let Some(severity) = self.object(sh::SEVERITY) {
            let iri = self.iri(sh::SEVERITY, severity)?;
            node.severity = Severity::from_iri(iri.as_ref())
                .ok_or_else(|| self.invalid(sh::SEVERITY, "a SHACL severity", iri.into()))?;
        }
        if let Some(message) = self.object(sh::MESSAGE) {
            node.message = Some(self.literal(sh::MESSAGE, message)?);
        }
        node.deactivated = self.boolean(sh::DEACTIVATED)?.unwrap_or(false);
        Ok(())
    }
}

fn check_pattern(shape: &Term, pattern: &str, flags: Option<&str>) -> Result<(), ShaclParseError> {
    let flags = flags.unwrap_or_default();
    if let Some(flag) = flags.chars().find(|c| !matches!(c, 'i' | 's' | 'm' | 'x')) {
        return Err(ShaclParseError::invalid_shape(
            shape.clone(),
            format!("unsupported regular expression flag '{flag}'"),
        ));
    }
    let pattern = if flags.is_empty() {
        pattern.to_owned()
    } else {
        format!("(?{flags}){pattern}")
    };
    regex::Regex::new(&pattern)
        .map(|_| ())
        .map_err(|e| ShaclParseError::invalid_regex(pattern, e.to_string()))
}

// Dependencies

/// Computes the dependencies of a shape: the references of its value node part, and for
/// node shapes those of its property shapes, which apply to their value nodes.
fn dependencies(document: &ShapeDocument, shape: &Shape) -> Vec<Dependency> {
    let mut deps = Vec::new();
    if shape.is_deactivated() {
        return deps;
    }
    match shape {
        Shape::Node(node) => {
            local_dependencies(document, &node.id, node, None, &mut deps);
            for property in &node.properties {
                if let Some(Shape::Property(property)) = document.get(property) {
                    if !property.node.deactivated {
                        block_dependencies(document, &node.id, property, &mut deps);
                    }
                }
            }
        }
        Shape::Property(property) => {
            block_dependencies(document, &property.node.id, property, &mut deps);
        }
    }
    deps
}

fn block_dependencies(
    document: &ShapeDocument,
    origin: &ShapeId,
    property: &PropertyShape,
    deps: &mut Vec<Dependency>,
) {
    let via = &property.node.id;
    local_dependencies(document, origin, &property.node, Some(via), deps);
    for nested in &property.node.properties {
        if document.get(nested).is_some_and(|s| !s.is_deactivated()) {
            deps.push(Dependency {
                origin: origin.clone(),
                references: vec![ShapeRef::positive(nested.clone())],
                mode: DependencyMode::And,
                external: true,
                via: Some(via.clone()),
                component: ConstraintComponent::Property,
                qualified: None,
            });
        }
    }
}

fn local_dependencies(
    document: &ShapeDocument,
    origin: &ShapeId,
    node: &NodeShape,
    via: Option<&ShapeId>,
    deps: &mut Vec<Dependency>,
) {
    let dependency = |references: Vec<ShapeRef>,
                      mode: DependencyMode,
                      component: ConstraintComponent,
                      qualified: Option<QualifiedBounds>| Dependency {
        origin: origin.clone(),
        references,
        mode,
        external: via.is_some(),
        via: via.cloned(),
        component,
        qualified,
    };
    // Empty lists are handled by the compiler: an empty sh:and always holds,
    // an empty sh:or or sh:xone never does.
    for references in node.and.iter().filter(|r| !r.is_empty()) {
        deps.push(dependency(
            references.clone(),
            DependencyMode::And,
            ConstraintComponent::And,
            None,
        ));
    }
    for references in node.or.iter().filter(|r| !r.is_empty()) {
        deps.push(dependency(
            references.clone(),
            DependencyMode::Or,
            ConstraintComponent::Or,
            None,
        ));
    }
    for references in node.xone.iter().filter(|r| !r.is_empty()) {
        deps.push(dependency(
            references.clone(),
            DependencyMode::Xone,
            ConstraintComponent::Xone,
            None,
        ));
    }
    for reference in &node.not {
        deps.push(dependency(
            vec![reference.clone()],
            DependencyMode::Not,
            ConstraintComponent::Not,
            None,
        ));
    }
    for reference in &node.node {
        deps.push(dependency(
            vec![reference.clone()],
            DependencyMode::And,
            ConstraintComponent::Node,
            None,
        ));
    }
    for qualified in &node.qualified {
        let siblings = if qualified.disjoint {
            sibling_shapes(document, &node.id, &qualified.shape)
        } else {
            Vec::new()
        };
        deps.push(dependency(
            vec![ShapeRef::positive(qualified.shape.clone())],
            DependencyMode::Qualified,
            if qualified.min.is_some() {
                ConstraintComponent::QualifiedMinCount
            } else {
                ConstraintComponent::QualifiedMaxCount
            },
            Some(QualifiedBounds {
                min: qualified.min,
                max: qualified.max,
                siblings,
            }),
        ));
    }
}

/// The qualified value shapes of the other property shapes of the parents of `property`.
fn sibling_shapes(
    document: &ShapeDocument,
    property: &ShapeId,
    qualified: &ShapeId,
) -> Vec<ShapeId> {
    let mut siblings = Vec::new();
    for parent in document.shapes() {
        let properties = &parent.node().properties;
        if !properties.contains(property) {
            continue;
        }
        for sibling in properties.iter().filter(|p| *p != property) {
            let Some(sibling) = document.get(sibling) else {
                continue;
            };
            for shape in &sibling.node().qualified {
                if shape.shape != *qualified && !siblings.contains(&shape.shape) {
                    siblings.push(shape.shape.clone());
                }
            }
        }
    }
    siblings
}

// Re-emission

fn write_shape(graph: &mut Graph, shape: &Shape) {
    let subject = NamedOrBlankNode::from(shape.id().clone());
    let node = shape.node();
    let add = |graph: &mut Graph, predicate: NamedNodeRef<'_>, object: Term| {
        graph.insert(&Triple::new(subject.clone(), predicate, object));
    };
    let integer = |value: u64| Term::from(Literal::new_typed_literal(value.to_string(), xsd::INTEGER));
    let boolean = |value: bool| Term::from(Literal::new_typed_literal(value.to_string(), xsd::BOOLEAN));

    match shape {
        Shape::Node(_) => add(graph, rdf::TYPE, sh::NODE_SHAPE.into()),
        Shape::Property(property) => {
            add(graph, rdf::TYPE, sh::PROPERTY_SHAPE.into());
            let path = property.path.to_graph(graph);
            add(graph, sh::PATH, path);
            if let Some(count) = property.min_count {
                add(graph, sh::MIN_COUNT, integer(count));
            }
            if let Some(count) = property.max_count {
                add(graph, sh::MAX_COUNT, integer(count));
            }
        }
    }

    for target in &node.targets {
        match target {
            Target::Node(value) => add(graph, sh::TARGET_NODE, value.clone()),
            Target::Class(class) => add(graph, sh::TARGET_CLASS, class.clone().into()),
            Target::SubjectsOf(p) => add(graph, sh::TARGET_SUBJECTS_OF, p.clone().into()),
            Target::ObjectsOf(p) => add(graph, sh::TARGET_OBJECTS_OF, p.clone().into()),
            Target::Implicit(_) => add(graph, rdf::TYPE, rdfs::CLASS.into()),
        }
    }

    let mut flags_written = false;
    for constraint in &node.constraints {
        match constraint {
            Constraint::ValueType(ValueType::Class(c)) => add(graph, sh::CLASS, c.clone().into()),
            Constraint::ValueType(ValueType::Datatype(d)) => {
                add(graph, sh::DATATYPE, d.clone().into());
            }
            Constraint::ValueType(ValueType::NodeKind(k)) => {
                add(graph, sh::NODE_KIND, k.iri().into_owned().into());
            }
            Constraint::ValueRange(range) => {
                let predicate = match range {
                    ValueRange::MinExclusive(_) => sh::MIN_EXCLUSIVE,
                    ValueRange::MinInclusive(_) => sh::MIN_INCLUSIVE,
                    ValueRange::MaxExclusive(_) => sh::MAX_EXCLUSIVE,
                    ValueRange::MaxInclusive(_) => sh::MAX_INCLUSIVE,
                };
                add(graph, predicate, range.bound().clone().into());
            }
            Constraint::String(StringConstraint::MinLength(l)) => {
                add(graph, sh::MIN_LENGTH, integer(*l));
            }
            Constraint::String(StringConstraint::MaxLength(l)) => {
                add(graph, sh::MAX_LENGTH, integer(*l));
            }
            Constraint::String(StringConstraint::Pattern { pattern, flags }) => {
                add(graph, sh::PATTERN, Literal::new_simple_literal(pattern).into());
                if let Some(flags) = flags {
                    if !flags_written {
                        add(graph, sh::FLAGS, Literal::new_simple_literal(flags).into());
                        flags_written = true;
                    }
                }
            }
            Constraint::String(StringConstraint::LanguageIn(languages)) => {
                let members = languages
                    .iter()
                    .map(|l| Literal::new_simple_literal(l).into())
                    .collect();
                let list = write_list(graph, members);
                add(graph, sh::LANGUAGE_IN, list);
            }
            Constraint::PropertyPair(pair) => {
                let predicate = match pair {
                    PropertyPair::Equals(_) => sh::EQUALS,
                    PropertyPair::Disjoint(_) => sh::DISJOINT,
                    PropertyPair::LessThan(_) => sh::LESS_THAN,
                    PropertyPair::LessThanOrEquals(_) => sh::LESS_THAN_OR_EQUALS,
                };
                add(graph, predicate, pair.predicate().clone().into());
            }
            Constraint::In(values) => {
                let list = write_list(graph, values.clone());
                add(graph, sh::IN, list);
            }
            Constraint::HasValue(value) => add(graph, sh::HAS_VALUE, value.clone()),
            Constraint::Closed { ignored } => {
                add(graph, sh::CLOSED, boolean(true));
                if !ignored.is_empty() {
                    let list = write_list(graph, ignored.iter().cloned().map(Into::into).collect());
                    add(graph, sh::IGNORED_PROPERTIES, list);
                }
            }
            Constraint::UniqueLang => add(graph, sh::UNIQUE_LANG, boolean(true)),
        }
    }

    for property in &node.properties {
        add(graph, sh::PROPERTY, property.to_term());
    }
    for (predicate, lists) in [(sh::AND, &node.and), (sh::OR, &node.or), (sh::XONE, &node.xone)] {
        for references in lists {
            let list = write_list(graph, references.iter().map(|r| r.name.to_term()).collect());
            add(graph, predicate, list);
        }
    }
    for reference in &node.not {
        add(graph, sh::NOT, reference.name.to_term());
    }
    for reference in &node.node {
        add(graph, sh::NODE, reference.name.to_term());
    }
    if let Some(first) = node.qualified.first() {
        for qualified in &node.qualified {
            add(graph, sh::QUALIFIED_VALUE_SHAPE, qualified.shape.to_term());
        }
        if let Some(min) = first.min {
            add(graph, sh::QUALIFIED_MIN_COUNT, integer(min));
        }
        if let Some(max) = first.max {
            add(graph, sh::QUALIFIED_MAX_COUNT, integer(max));
        }
        if first.disjoint {
            add(graph, sh::QUALIFIED_VALUE_SHAPES_DISJOINT, boolean(true));
        }
    }

    if node.severity != Severity::Violation {
        add(graph, sh::SEVERITY, node.severity.iri().into_owned().into());
    }
    if let Some(message) = &node.message {
        add(graph, sh::MESSAGE, message.clone().into());
    }
    if node.deactivated {
        add(graph, sh::DEACTIVATED, boolean(true));
    }
}

// Graph helpers

pub(crate) fn as_subject(term: TermRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(node.into()),
        TermRef::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}

pub(crate) fn object(
    graph: &Graph,
    subject: NamedOrBlankNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Option<Term> {
    graph
        .object_for_subject_predicate(subject, predicate)
        .map(TermRef::into_owned)
}

pub(crate) fn objects(
    graph: &Graph,
    subject: NamedOrBlankNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Vec<Term> {
    graph
        .objects_for_subject_predicate(subject, predicate)
        .map(TermRef::into_owned)
        .collect()
}

/// Reads the members of the RDF list starting at `head`.
pub(crate) fn parse_list(
    graph: &Graph,
    head: TermRef<'_>,
    shape: &Term,
) -> Result<Vec<Term>, ShaclParseError> {
    let mut members = Vec::new();
    let mut visited = FxHashSet::default();
    let mut current = head.into_owned();
    loop {
        if current == rdf::NIL.into() {
            return Ok(members);
        }
        let Some(node) = as_subject(current.as_ref()) else {
            return Err(ShaclParseError::invalid_rdf_list(
                shape.clone(),
                format!("{current} is not a list node"),
            ));
        };
        if !visited.insert(node.into_owned()) {
            return Err(ShaclParseError::invalid_rdf_list(
                shape.clone(),
                "the list is cyclic",
            ));
        }
        let first = object(graph, node, rdf::FIRST).ok_or_else(|| {
            ShaclParseError::invalid_rdf_list(shape.clone(), "missing rdf:first")
        })?;
        let rest = object(graph, node, rdf::REST).ok_or_else(|| {
            ShaclParseError::invalid_rdf_list(shape.clone(), "missing rdf:rest")
        })?;
        members.push(first);
        current = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::BlankNode;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{name}"))
    }

    fn id(name: &str) -> ShapeId {
        ex(name).into()
    }

    #[test]
    fn test_empty_graph() {
        let document = ShapeDocument::from_graph(&Graph::new()).unwrap();
        assert!(document.is_empty());
    }

    #[test]
    fn test_property_shape_dependencies() {
        let mut graph = Graph::new();
        let property = BlankNode::default();
        graph.insert(&Triple::new(ex("S"), rdf::TYPE, sh::NODE_SHAPE));
        graph.insert(&Triple::new(ex("S"), sh::TARGET_CLASS, ex("Person")));
        graph.insert(&Triple::new(ex("S"), sh::NOT, ex("T")));
        graph.insert(&Triple::new(ex("S"), sh::PROPERTY, property.clone()));
        graph.insert(&Triple::new(property.clone(), sh::PATH, ex("knows")));
        graph.insert(&Triple::new(property.clone(), sh::NODE, ex("S")));
        graph.insert(&Triple::new(
            property.clone(),
            sh::MIN_COUNT,
            Literal::new_typed_literal("1", xsd::INTEGER),
        ));
        graph.insert(&Triple::new(ex("T"), rdf::TYPE, sh::NODE_SHAPE));

        let document = ShapeDocument::from_graph(&graph).unwrap();
        assert_eq!(document.len(), 3);
        let shape = document.get(&id("S")).unwrap();
        assert_eq!(shape.targets(), &[Target::Class(ex("Person"))]);
        let deps = shape.deps();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].mode, DependencyMode::Not);
        assert!(!deps[0].external);
        assert_eq!(deps[0].references, vec![ShapeRef::negative(id("T"))]);
        assert_eq!(deps[1].mode, DependencyMode::And);
        assert!(deps[1].external);
        assert_eq!(deps[1].via, Some(ShapeId::Blank(property.clone())));
        assert_eq!(deps[1].component, ConstraintComponent::Node);

        let Some(Shape::Property(property)) = document.get(&property.into()) else {
            panic!("the property shape should be extracted")
        };
        assert_eq!(property.min_count, Some(1));
        assert_eq!(property.parent, Some(id("S")));
        assert!(document.is_referenced(&id("S")));
    }

    #[test]
    fn test_ranges_and_property_pairs() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("P"), rdf::TYPE, sh::PROPERTY_SHAPE));
        graph.insert(&Triple::new(ex("P"), sh::PATH, ex("start")));
        graph.insert(&Triple::new(ex("P"), sh::MAX_EXCLUSIVE, Literal::from(10)));
        graph.insert(&Triple::new(ex("P"), sh::LESS_THAN, ex("end")));
        graph.insert(&Triple::new(ex("P"), sh::DISJOINT, ex("other")));

        let document = ShapeDocument::from_graph(&graph).unwrap();
        let Some(Shape::Property(property)) = document.get(&id("P")) else {
            panic!("the property shape should be extracted")
        };
        let constraints = &property.node.constraints;
        assert!(constraints.contains(&Constraint::ValueRange(ValueRange::MaxExclusive(
            Literal::from(10)
        ))));
        assert!(constraints.contains(&Constraint::PropertyPair(PropertyPair::LessThan(ex("end")))));
        assert!(constraints.contains(&Constraint::PropertyPair(PropertyPair::Disjoint(ex(
            "other"
        )))));
        assert!(
            !constraints
                .iter()
                .any(|c| matches!(c, Constraint::PropertyPair(PropertyPair::Equals(_))))
        );
    }

    #[test]
    fn test_implicit_class_target() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("Person"), rdf::TYPE, sh::NODE_SHAPE));
        graph.insert(&Triple::new(ex("Person"), rdf::TYPE, rdfs::CLASS));
        let document = ShapeDocument::from_graph(&graph).unwrap();
        assert_eq!(
            document.get(&id("Person")).unwrap().targets(),
            &[Target::Implicit(ex("Person"))]
        );
    }

    #[test]
    fn test_structural_errors() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("P"), rdf::TYPE, sh::PROPERTY_SHAPE));
        assert!(matches!(
            ShapeDocument::from_graph(&graph),
            Err(ShaclParseError::MissingProperty { .. })
        ));

        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("P"), rdf::TYPE, sh::PROPERTY_SHAPE));
        graph.insert(&Triple::new(ex("P"), sh::PATH, ex("p")));
        graph.insert(&Triple::new(
            ex("P"),
            sh::MIN_COUNT,
            Literal::new_simple_literal("many"),
        ));
        assert!(matches!(
            ShapeDocument::from_graph(&graph),
            Err(ShaclParseError::InvalidPropertyValue { .. })
        ));

        let mut graph = Graph::new();
        let list = BlankNode::default();
        graph.insert(&Triple::new(ex("S"), rdf::TYPE, sh::NODE_SHAPE));
        graph.insert(&Triple::new(ex("S"), sh::AND, list.clone()));
        graph.insert(&Triple::new(list.clone(), rdf::FIRST, ex("T")));
        assert!(matches!(
            ShapeDocument::from_graph(&graph),
            Err(ShaclParseError::InvalidRdfList { .. })
        ));

        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("S"), rdf::TYPE, sh::NODE_SHAPE));
        graph.insert(&Triple::new(ex("S"), sh::PATTERN, Literal::new_simple_literal("(")));
        assert!(matches!(
            ShapeDocument::from_graph(&graph),
            Err(ShaclParseError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_qualified_siblings() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(ex("S"), rdf::TYPE, sh::NODE_SHAPE));
        for (property, qualified) in [("P1", "Q1"), ("P2", "Q2")] {
            graph.insert(&Triple::new(ex("S"), sh::PROPERTY, ex(property)));
            graph.insert(&Triple::new(ex(property), sh::PATH, ex("p")));
            graph.insert(&Triple::new(
                ex(property),
                sh::QUALIFIED_VALUE_SHAPE,
                ex(qualified),
            ));
            graph.insert(&Triple::new(
                ex(property),
                sh::QUALIFIED_MIN_COUNT,
                Literal::new_typed_literal("1", xsd::INTEGER),
            ));
            graph.insert(&Triple::new(
                ex(property),
                sh::QUALIFIED_VALUE_SHAPES_DISJOINT,
                Literal::new_typed_literal("true", xsd::BOOLEAN),
            ));
        }
        let document = ShapeDocument::from_graph(&graph).unwrap();
        let deps = document.get(&id("P1")).unwrap().deps();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].mode, DependencyMode::Qualified);
        assert_eq!(
            deps[0].qualified.as_ref().map(|q| q.siblings.clone()),
            Some(vec![id("Q2")])
        );
    }
}
