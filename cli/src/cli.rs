use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "wfshacl")]
/// SHACL validation of RDF graphs with recursive shapes under the well-founded semantics
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a data graph against a shapes graph
    ///
    /// The validation report is written to stdout.
    /// The exit code is 0 if the data conforms, 1 if it does not, 2 if the shapes graph is invalid
    /// and 3 on any other failure.
    Validate {
        /// File containing the shapes graph
        ///
        /// The format is guessed from the file extension, Turtle by default.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// URL of the SPARQL endpoint serving the data graph
        #[arg(short, long, required_unless_present = "data", conflicts_with = "data", value_hint = ValueHint::Url)]
        endpoint: Option<String>,
        /// URL of the SPARQL update endpoint
        ///
        /// Only required with --shapes-graph.
        #[arg(long, requires = "endpoint", value_hint = ValueHint::Url)]
        update_endpoint: Option<String>,
        /// User name for the HTTP Basic authentication to the endpoint
        #[arg(long, requires_all = ["endpoint", "password"])]
        user: Option<String>,
        /// Password for the HTTP Basic authentication to the endpoint
        #[arg(long, requires = "user")]
        password: Option<String>,
        /// File containing the data graph, loaded into an in-memory store
        ///
        /// The format is guessed from the file extension, Turtle by default.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        data: Option<PathBuf>,
        /// How recursive shapes are resolved
        #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
        strategy: StrategyArg,
        /// External command computing the well-founded model of the logic program
        ///
        /// The program is written to its stdin and the model is read from its stdout.
        /// By default, the model is computed in process.
        #[arg(long, value_hint = ValueHint::CommandName)]
        solver: Option<String>,
        /// Argument given to the external solver
        #[arg(long, requires = "solver", allow_hyphen_values = true)]
        solver_arg: Vec<String>,
        /// Syntax of negation in the logic program given to the external solver
        #[arg(long, value_enum, default_value_t = NegationArg::Tilde)]
        negation: NegationArg,
        /// Timeout in milliseconds of each endpoint request and of the external solver
        #[arg(long)]
        timeout: Option<u64>,
        /// Name of the graph the shapes are uploaded to before validating
        #[arg(long, value_hint = ValueHint::Url)]
        shapes_graph: Option<String>,
        /// The format of the validation report
        ///
        /// It can be an extension like "ttl" or a MIME type like "text/turtle".
        #[arg(long, default_value = "ttl")]
        format: String,
    },
    /// Print the conditional queries the shapes are compiled into
    Compile {
        /// File containing the shapes graph
        ///
        /// The format is guessed from the file extension, Turtle by default.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        shapes: PathBuf,
        /// Only print the query of the shape with the given IRI
        #[arg(long, value_hint = ValueHint::Url)]
        shape: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Unwinding without recursion, the logic program otherwise
    Auto,
    /// Resolve the shapes one after the other, fails on recursive shapes
    Unwinding,
    /// Compute the well-founded model of a logic program
    Program,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NegationArg {
    /// `~atom`
    Tilde,
    /// `not atom`
    Not,
}
