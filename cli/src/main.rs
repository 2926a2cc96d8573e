#![allow(clippy::print_stderr, clippy::use_debug)]
use crate::cli::{Args, Command, NegationArg, StrategyArg};
use anyhow::{Context, bail};
use clap::Parser;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Graph, NamedNode};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write, stdout};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wfshacl::compiler::compile;
use wfshacl::{
    Endpoint, HttpEndpoint, Negation, ProgramOptions, ShaclError, ShaclParseError, ShaclValidator,
    ShapeDocument, ShapeId, StoreEndpoint, Strategy, SubprocessSolver,
};

mod cli;

const NON_CONFORMING: u8 = 1;
const STRUCTURAL_ERROR: u8 = 2;
const FAILURE: u8 = 3;

pub fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error:?}");
            ExitCode::from(if is_structural(&error) {
                STRUCTURAL_ERROR
            } else {
                FAILURE
            })
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    match args.command {
        Command::Validate {
            shapes,
            endpoint,
            update_endpoint,
            user,
            password,
            data,
            strategy,
            solver,
            solver_arg,
            negation,
            timeout,
            shapes_graph,
            format,
        } => {
            let format = rdf_format_from_name(&format)?;
            let document = load_shapes(&shapes)?;
            let timeout = timeout.map(Duration::from_millis);

            let mut validator = ShaclValidator::new(document)
                .with_strategy(match strategy {
                    StrategyArg::Auto => Strategy::Auto,
                    StrategyArg::Unwinding => Strategy::Unwinding,
                    StrategyArg::Program => Strategy::LogicProgram,
                })
                .with_program_options(ProgramOptions {
                    negation: match negation {
                        NegationArg::Tilde => Negation::Tilde,
                        NegationArg::Not => Negation::Not,
                    },
                    ..ProgramOptions::default()
                });
            if let Some(command) = solver {
                let mut solver = SubprocessSolver::new(command).with_args(solver_arg);
                if let Some(timeout) = timeout {
                    solver = solver.with_timeout(timeout);
                }
                validator = validator.with_solver(solver);
            }
            if let Some(graph) = shapes_graph {
                validator = validator.with_shapes_graph(
                    NamedNode::new(&graph)
                        .with_context(|| format!("The shapes graph name {graph} is invalid"))?,
                );
            }

            let endpoint: Box<dyn Endpoint> = if let Some(url) = endpoint {
                let mut endpoint = HttpEndpoint::new(url);
                if let Some(update_url) = update_endpoint {
                    endpoint = endpoint.with_update_url(update_url);
                }
                if let (Some(user), Some(password)) = (user, password) {
                    endpoint = endpoint.with_basic_auth(user, password);
                }
                if let Some(timeout) = timeout {
                    endpoint = endpoint.with_timeout(timeout);
                }
                Box::new(endpoint)
            } else if let Some(data) = data {
                let graph = load_graph(&data)?;
                Box::new(StoreEndpoint::from_graph(&graph)?)
            } else {
                bail!("Either --endpoint or --data must be set")
            };

            let report = validator.validate(endpoint.as_ref())?;
            let mut serializer = RdfSerializer::from_format(format)
                .with_prefix("sh", "http://www.w3.org/ns/shacl#")?
                .with_prefix("wfs", "https://w3id.org/wfshacl#")?
                .for_writer(BufWriter::new(stdout().lock()));
            for triple in &report.to_graph() {
                serializer.serialize_triple(triple)?;
            }
            serializer.finish()?.flush()?;
            Ok(if report.conforms() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(NON_CONFORMING)
            })
        }
        Command::Compile { shapes, shape } => {
            let document = load_shapes(&shapes)?;
            let ids = if let Some(shape) = shape {
                let id = ShapeId::from(
                    NamedNode::new(&shape)
                        .with_context(|| format!("The shape name {shape} is invalid"))?,
                );
                if document.get(&id).is_none() {
                    bail!("The shape {shape} is not defined in {}", shapes.display())
                }
                vec![id]
            } else {
                document
                    .shapes()
                    .iter()
                    .map(|shape| shape.id().clone())
                    .collect()
            };
            let mut output = BufWriter::new(stdout().lock());
            for id in ids {
                writeln!(output, "# {id}")?;
                writeln!(output, "{}\n", compile(&document, &id)?)?;
            }
            output.flush()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_shapes(path: &Path) -> anyhow::Result<ShapeDocument> {
    let graph = load_graph(path)?;
    let document = ShapeDocument::from_graph(&graph)
        .with_context(|| format!("Invalid shapes graph {}", path.display()))?;
    tracing::debug!("Loaded {} shapes from {}", document.len(), path.display());
    Ok(document)
}

fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let format = match path.extension().and_then(OsStr::to_str) {
        Some(ext) => RdfFormat::from_extension(ext)
            .with_context(|| format!("The file extension '{ext}' is unknown"))?,
        None => RdfFormat::Turtle,
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open file {}", path.display()))?;
    let mut graph = Graph::new();
    for quad in RdfParser::from_format(format).for_reader(BufReader::new(file)) {
        let quad = quad.with_context(|| format!("Failed to parse file {}", path.display()))?;
        graph.insert(quad.as_ref());
    }
    Ok(graph)
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    if let Some(t) = RdfFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = RdfFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The file format '{name}' is unknown")
}

/// Checks if the failure comes from the shapes graph itself.
fn is_structural(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<ShaclParseError>()
            || matches!(cause.downcast_ref::<ShaclError>(), Some(ShaclError::Parse(_)))
    })
}
