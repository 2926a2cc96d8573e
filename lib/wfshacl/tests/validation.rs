//! Integration tests for validation under the well-founded semantics.

use oxrdf::vocab::rdf;
use oxrdf::{Graph, Literal, NamedNode, Term, TripleRef};
use oxrdfio::{RdfFormat, RdfParser};
use spargebra::SparqlParser;
use wfshacl::vocab::{sh, wfs};
use wfshacl::{
    Conformance, ConstraintComponent, EvaluationError, GroundSolver, LogicProgram, ProgramOptions,
    PropertyPath, ShaclError, ShaclValidator, ShapeDocument, ShapeId, Solver, StoreEndpoint,
    Strategy, ValidationReport, compiler, conditional_answers, has_recursion,
    transitive_closure, unconditional_answers,
};

/// Helper to parse a Turtle string into a Graph.
fn parse_turtle(turtle: &str) -> Graph {
    let mut graph = Graph::new();
    let parser = RdfParser::from_format(RdfFormat::Turtle);
    for quad_result in parser.for_reader(turtle.as_bytes()) {
        let quad = quad_result.expect("Failed to parse turtle");
        graph.insert(quad.as_ref());
    }
    graph
}

/// Helper to parse shapes from Turtle.
fn parse_shapes(turtle: &str) -> ShapeDocument {
    ShapeDocument::from_graph(&parse_turtle(turtle)).expect("Failed to parse shapes")
}

fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.org/{name}"))
}

fn validate(shapes: &str, data: &str, strategy: Strategy) -> ValidationReport {
    ShaclValidator::new(parse_shapes(shapes))
        .with_strategy(strategy)
        .validate_graph(&parse_turtle(data))
        .expect("Validation failed")
}

/// The (focus node, constraint component) pairs of a report, sorted.
fn blamed(report: &ValidationReport) -> Vec<(String, String)> {
    let mut pairs = report
        .results()
        .iter()
        .map(|r| {
            (
                r.focus_node.to_string(),
                r.source_constraint_component.iri().as_str().to_owned(),
            )
        })
        .collect::<Vec<_>>();
    pairs.sort();
    pairs.dedup();
    pairs
}

fn pair(focus: impl Into<Term>, component: ConstraintComponent) -> (String, String) {
    (
        focus.into().to_string(),
        component.iri().as_str().to_owned(),
    )
}

// =============================================================================
// Seed scenarios
// =============================================================================

#[test]
fn test_node_min_inclusive() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:TestShape a sh:NodeShape ;
            sh:minInclusive 2 ;
            sh:targetNode 1, 2, 3 .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:ValidInstance ex:value 1, 2, 3 .
    "#;

    let report = validate(shapes, data, Strategy::Auto);
    assert!(!report.conforms());
    assert_eq!(report.results().len(), 1);
    let result = &report.results()[0];
    assert_eq!(result.focus_node, Literal::from(1).into());
    assert_eq!(result.value, Some(Literal::from(1).into()));
    assert_eq!(
        result.source_constraint_component,
        ConstraintComponent::MinInclusive
    );
    assert_eq!(result.source_shape, ShapeId::from(ex("TestShape")));
    assert_eq!(result.conformance, Conformance::False);
}

#[test]
fn test_property_min_count() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:TestShape a sh:NodeShape ;
            sh:targetNode ex:InvalidResource1, ex:ValidResource1 ;
            sh:property [
                sh:path ex:testProperty ;
                sh:minCount 1
            ] .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

        ex:InvalidResource1 a rdfs:Resource .
        ex:ValidResource1 ex:testProperty "value" .
    "#;

    for strategy in [Strategy::Unwinding, Strategy::LogicProgram] {
        let report = validate(shapes, data, strategy);
        assert_eq!(report.results().len(), 1, "{strategy}");
        let result = &report.results()[0];
        assert_eq!(result.focus_node, ex("InvalidResource1").into());
        assert_eq!(
            result.source_constraint_component,
            ConstraintComponent::MinCount
        );
        assert_eq!(
            result.result_path,
            Some(PropertyPath::predicate(ex("testProperty")))
        );
        assert!(result.value.is_none());
    }
}

#[test]
fn test_node_not() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:TestShape a sh:NodeShape ;
            sh:not [
                a sh:NodeShape ;
                sh:class ex:NotType
            ] ;
            sh:targetNode ex:InvalidInstance1, ex:ValidInstance1 .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:InvalidInstance1 a ex:NotType .
        ex:ValidInstance1 a ex:OtherType .
    "#;

    let mut document = parse_shapes(shapes);
    assert!(!has_recursion(&document).unwrap());
    let endpoint = StoreEndpoint::from_graph(&parse_turtle(data)).unwrap();
    let id = ShapeId::from(ex("TestShape"));
    let answers = unconditional_answers(&mut document, &id, &endpoint).unwrap();
    assert!(answers.contains(&ex("ValidInstance1").into()));
    assert!(!answers.contains(&ex("InvalidInstance1").into()));

    let report = validate(shapes, data, Strategy::Auto);
    assert_eq!(
        blamed(&report),
        vec![pair(ex("InvalidInstance1"), ConstraintComponent::Not)]
    );
}

const PERSON_SHAPES: &str = r#"
    @prefix sh: <http://www.w3.org/ns/shacl#> .
    @prefix ex: <http://example.org/> .
    @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
    @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

    ex:PersonShape a sh:NodeShape ;
        sh:targetClass ex:Person ;
        sh:property [
            sh:path ex:ssn ;
            sh:maxCount 1 ;
            sh:datatype xsd:string ;
            sh:pattern "^\\d{3}-\\d{2}-\\d{4}$"
        ] ;
        sh:property [
            sh:path ex:worksFor ;
            sh:class ex:Company ;
            sh:nodeKind sh:IRI
        ] ;
        sh:property [
            sh:path [ sh:inversePath ex:worksFor ] ;
            sh:name "employee"
        ] ;
        sh:closed true ;
        sh:ignoredProperties ( rdf:type ) .
"#;

const PERSON_DATA: &str = r#"
    @prefix ex: <http://example.org/> .
    @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

    ex:Alice a ex:Person ;
        ex:ssn "987-65-432A" .
    ex:Bob a ex:Person ;
        ex:ssn "123-45-6789" ;
        ex:ssn "124-35-6789" .
    ex:Calvin a ex:Person ;
        ex:birthDate "1971-07-07"^^xsd:date ;
        ex:worksFor ex:UntypedCompany .
    ex:Dora a ex:Person ;
        ex:ssn "123-45-6789" .
"#;

#[test]
fn test_person_example() {
    let unwinding = validate(PERSON_SHAPES, PERSON_DATA, Strategy::Unwinding);
    let program = validate(PERSON_SHAPES, PERSON_DATA, Strategy::LogicProgram);

    let expected = vec![
        pair(ex("Alice"), ConstraintComponent::Pattern),
        pair(ex("Bob"), ConstraintComponent::MaxCount),
        pair(ex("Calvin"), ConstraintComponent::Class),
        pair(ex("Calvin"), ConstraintComponent::Closed),
    ];
    assert_eq!(blamed(&unwinding), expected);
    assert_eq!(blamed(&program), expected);
    assert!(unwinding.undefined().next().is_none());
}

#[test]
fn test_inverse_path() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:TestShape a sh:PropertyShape ;
            sh:path [ sh:inversePath ex:child ] ;
            sh:minCount 2 ;
            sh:targetNode ex:InvalidResource1, ex:ValidResource1 .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:Parent1 ex:child ex:ValidResource1, ex:InvalidResource1 .
        ex:Parent2 ex:child ex:ValidResource1 .
    "#;

    let document = parse_shapes(shapes);
    let query = compiler::compile(&document, &ex("TestShape").into())
        .unwrap()
        .to_string();
    assert!(query.contains("^<http://example.org/child>"), "{query}");

    let report = validate(shapes, data, Strategy::Auto);
    assert_eq!(
        blamed(&report),
        vec![pair(ex("InvalidResource1"), ConstraintComponent::MinCount)]
    );
    assert_eq!(
        report.results()[0].result_path,
        Some(PropertyPath::inverse(PropertyPath::predicate(ex("child"))))
    );
}

const PARADOX_SHAPES: &str = r#"
    @prefix sh: <http://www.w3.org/ns/shacl#> .
    @prefix ex: <http://example.org/> .

    ex:A a sh:NodeShape ;
        sh:targetNode ex:x ;
        sh:not ex:B .
    ex:B a sh:NodeShape ;
        sh:targetNode ex:x ;
        sh:not ex:A .
"#;

#[test]
fn test_mutual_negation_is_undefined() {
    let mut document = parse_shapes(PARADOX_SHAPES);
    assert!(transitive_closure(&document, &ex("A").into()).unwrap().recursive);

    let endpoint = StoreEndpoint::new().unwrap();
    let program =
        LogicProgram::translate(&mut document, &endpoint, &ProgramOptions::default()).unwrap();
    let model = GroundSolver.solve(&program).unwrap();
    assert!(model.true_atoms.is_empty());
    assert_eq!(model.undefined.len(), 2);

    let report = validate(PARADOX_SHAPES, "", Strategy::Auto);
    assert!(!report.conforms());
    let undefined = report
        .undefined()
        .map(|r| (r.source_shape.clone(), r.focus_node.clone()))
        .collect::<Vec<_>>();
    assert_eq!(undefined.len(), 2);
    assert!(undefined.contains(&(ex("A").into(), ex("x").into())));
    assert!(undefined.contains(&(ex("B").into(), ex("x").into())));

    let graph = report.to_graph();
    assert!(graph.contains(TripleRef::new(
        graph
            .subjects_for_predicate_object(rdf::TYPE, sh::VALIDATION_REPORT)
            .next()
            .unwrap(),
        sh::CONFORMS,
        Literal::from(false).as_ref(),
    )));
    assert_eq!(
        graph
            .subjects_for_predicate_object(wfs::CONFORMANCE, wfs::UNDEFINED)
            .count(),
        2
    );
}

#[test]
fn test_unwinding_rejects_recursion() {
    let result = ShaclValidator::new(parse_shapes(PARADOX_SHAPES))
        .with_strategy(Strategy::Unwinding)
        .validate_graph(&Graph::new());
    assert!(matches!(
        result,
        Err(ShaclError::Evaluation(EvaluationError::RecursiveShape { .. }))
    ));
}

// =============================================================================
// Recursion
// =============================================================================

#[test]
fn test_positive_recursion_is_false() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:Knows a sh:NodeShape ;
            sh:targetNode ex:a, ex:c ;
            sh:property [
                sh:path ex:knows ;
                sh:node ex:Knows
            ] .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:a ex:knows ex:b .
        ex:b ex:knows ex:a .
        ex:c ex:knows ex:d .
    "#;

    let report = validate(shapes, data, Strategy::Auto);
    let focus_nodes = report
        .results()
        .iter()
        .map(|r| r.focus_node.clone())
        .collect::<Vec<_>>();
    assert_eq!(focus_nodes, vec![Term::from(ex("a"))]);
    assert!(report.undefined().next().is_none());
}

#[test]
fn test_odd_loop_through_property() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:Odd a sh:NodeShape ;
            sh:targetNode ex:a, ex:c ;
            sh:property [
                sh:path ex:next ;
                sh:not ex:Odd
            ] .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:a ex:next ex:a .
        ex:c ex:next ex:d .
    "#;

    let report = validate(shapes, data, Strategy::LogicProgram);
    let undefined = report
        .undefined()
        .map(|r| r.focus_node.clone())
        .collect::<Vec<_>>();
    assert_eq!(undefined, vec![Term::from(ex("a"))]);
    let defined = report
        .results()
        .iter()
        .filter(|r| r.conformance == Conformance::False)
        .map(|r| r.focus_node.clone())
        .collect::<Vec<_>>();
    assert_eq!(defined, vec![Term::from(ex("c"))]);
}

// =============================================================================
// Logical constraints
// =============================================================================

const LOGICAL_SHAPES: &str = r#"
    @prefix sh: <http://www.w3.org/ns/shacl#> .
    @prefix ex: <http://example.org/> .

    ex:Red a sh:NodeShape ; sh:class ex:Red .
    ex:Blue a sh:NodeShape ; sh:class ex:Blue .

    ex:Either a sh:NodeShape ;
        sh:targetNode ex:x, ex:y, ex:z ;
        sh:property [
            sh:path ex:p ;
            sh:or ( ex:Red ex:Blue )
        ] .

    ex:Exactly a sh:NodeShape ;
        sh:targetNode ex:x, ex:y, ex:z ;
        sh:property [
            sh:path ex:p ;
            sh:xone ( ex:Red ex:Blue )
        ] .

    ex:OneRed a sh:NodeShape ;
        sh:targetNode ex:x, ex:y, ex:z ;
        sh:property [
            sh:path ex:p ;
            sh:qualifiedValueShape ex:Red ;
            sh:qualifiedMinCount 1 ;
            sh:qualifiedMaxCount 1
        ] .
"#;

const LOGICAL_DATA: &str = r#"
    @prefix ex: <http://example.org/> .

    ex:r1 a ex:Red .
    ex:r2 a ex:Red .
    ex:b1 a ex:Blue .
    ex:rb a ex:Red, ex:Blue .
    ex:n a ex:Green .

    ex:x ex:p ex:r1, ex:b1 .
    ex:y ex:p ex:r1, ex:r2, ex:rb .
    ex:z ex:p ex:n .
"#;

#[test]
fn test_strategies_agree() {
    let data = parse_turtle(LOGICAL_DATA);
    let mut unwinding =
        ShaclValidator::new(parse_shapes(LOGICAL_SHAPES)).with_strategy(Strategy::Unwinding);
    let mut program =
        ShaclValidator::new(parse_shapes(LOGICAL_SHAPES)).with_strategy(Strategy::LogicProgram);
    let unwinding_report = unwinding.validate_graph(&data).unwrap();
    let program_report = program.validate_graph(&data).unwrap();
    assert_eq!(blamed(&unwinding_report), blamed(&program_report));

    let conforming = |validator: &ShaclValidator, shape: &str| {
        let mut nodes = validator
            .document()
            .uncond_answers(&ex(shape).into())
            .unwrap()
            .first_column()
            .filter(|node| ["x", "y", "z"].map(|n| Term::from(ex(n))).contains(node))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        nodes.sort();
        nodes
    };
    let x = ex("x").to_string();
    let y = ex("y").to_string();
    for (shape, expected) in [
        ("Either", vec![x.clone(), y]),
        ("Exactly", vec![x.clone()]),
        ("OneRed", vec![x]),
    ] {
        assert_eq!(conforming(&unwinding, shape), expected, "{shape}");
        assert_eq!(conforming(&program, shape), expected, "{shape}");
    }
    for shape in ["Red", "Blue"] {
        assert_eq!(conforming(&unwinding, shape), conforming(&program, shape));
    }
}

#[test]
fn test_blame_names_the_violated_reference() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:S a sh:NodeShape ;
            sh:targetNode ex:x ;
            sh:not ex:B ;
            sh:property [ sh:path ex:p ; sh:node ex:C ] .
        ex:B a sh:NodeShape ; sh:class ex:Nope .
        ex:C a sh:NodeShape ; sh:class ex:Thing .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:x ex:p ex:y .
    "#;
    for strategy in [Strategy::Unwinding, Strategy::LogicProgram] {
        let report = validate(shapes, data, strategy);
        assert_eq!(report.results().len(), 1, "{strategy}");
        let result = &report.results()[0];
        assert_eq!(result.focus_node, Term::from(ex("x")));
        assert_eq!(
            result.source_constraint_component,
            ConstraintComponent::Node,
            "{strategy}"
        );
        assert_eq!(
            result.result_path,
            Some(PropertyPath::predicate(ex("p"))),
            "{strategy}"
        );
        assert_ne!(result.source_shape, ShapeId::from(ex("S")));
    }
}

#[test]
fn test_blame_names_the_exceeded_qualified_bound() {
    let shapes = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix ex: <http://example.org/> .

        ex:Hand a sh:NodeShape ;
            sh:targetNode ex:h1, ex:h2 ;
            sh:property [
                sh:path ex:digit ;
                sh:qualifiedValueShape ex:Thumb ;
                sh:qualifiedMinCount 1 ;
                sh:qualifiedMaxCount 1
            ] .
        ex:Thumb a sh:NodeShape ; sh:class ex:ThumbClass .
    "#;
    let data = r#"
        @prefix ex: <http://example.org/> .
        ex:h1 ex:digit ex:f1 .
        ex:h2 ex:digit ex:t1, ex:t2 .
        ex:t1 a ex:ThumbClass .
        ex:t2 a ex:ThumbClass .
    "#;
    for strategy in [Strategy::Unwinding, Strategy::LogicProgram] {
        let report = validate(shapes, data, strategy);
        assert_eq!(
            blamed(&report),
            vec![
                pair(ex("h1"), ConstraintComponent::QualifiedMinCount),
                pair(ex("h2"), ConstraintComponent::QualifiedMaxCount),
            ],
            "{strategy}"
        );
    }
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_answers_are_idempotent() {
    let mut document = parse_shapes(LOGICAL_SHAPES);
    let endpoint = StoreEndpoint::from_graph(&parse_turtle(LOGICAL_DATA)).unwrap();
    for shape in ["Either", "Exactly", "OneRed", "Red"] {
        let id = ShapeId::from(ex(shape));
        let conditional = conditional_answers(&mut document, &id, &endpoint)
            .unwrap()
            .clone();
        let first = unconditional_answers(&mut document, &id, &endpoint)
            .unwrap()
            .clone();
        assert_eq!(
            unconditional_answers(&mut document, &id, &endpoint).unwrap(),
            &first
        );
        assert_eq!(
            conditional_answers(&mut document, &id, &endpoint).unwrap(),
            &conditional
        );
    }
}

#[test]
fn test_validation_is_repeatable() {
    let mut validator = ShaclValidator::new(parse_shapes(PERSON_SHAPES));
    let endpoint = StoreEndpoint::from_graph(&parse_turtle(PERSON_DATA)).unwrap();
    let first = validator.validate(&endpoint).unwrap();
    let second = validator.validate(&endpoint).unwrap();
    assert_eq!(first.results(), second.results());
}

#[test]
fn test_shapes_round_trip() {
    for shapes in [PERSON_SHAPES, LOGICAL_SHAPES, PARADOX_SHAPES] {
        let document = parse_shapes(shapes);
        let reparsed = ShapeDocument::from_graph(&document.to_graph()).unwrap();
        assert_eq!(document.len(), reparsed.len());
        for shape in document.shapes() {
            assert_eq!(reparsed.get(shape.id()), Some(shape));
        }
    }
}

#[test]
fn test_compiled_queries_parse() {
    for shapes in [PERSON_SHAPES, LOGICAL_SHAPES, PARADOX_SHAPES] {
        let document = parse_shapes(shapes);
        for shape in document.shapes() {
            let query = compiler::compile(&document, shape.id()).unwrap().to_string();
            if let Err(error) = SparqlParser::new().parse_query(&query) {
                panic!("{error} in\n{query}");
            }
            if let Some(targets) = compiler::targets_query(shape) {
                let targets = targets.to_string();
                SparqlParser::new()
                    .parse_query(&targets)
                    .unwrap_or_else(|e| panic!("{e} in\n{targets}"));
            }
        }
    }
}

#[test]
fn test_shapes_graph_upload() {
    let endpoint = StoreEndpoint::new().unwrap();
    let graph_name = ex("shapes");
    ShaclValidator::new(parse_shapes(PARADOX_SHAPES))
        .with_shapes_graph(graph_name.clone())
        .validate(&endpoint)
        .unwrap();
    let table = wfshacl::Endpoint::query(
        &endpoint,
        &format!("SELECT ?s WHERE {{ GRAPH {graph_name} {{ ?s a <{}> }} }}", sh::NODE_SHAPE.as_str()),
    )
    .unwrap();
    assert_eq!(table.len(), 2);
}
