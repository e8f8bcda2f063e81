use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use triplesql::compiler::{CastPolicy, CompilerOptions, SqlDialect};

#[derive(Parser)]
#[command(about, version, name = "triplesql")]
/// TripleSQL command line toolkit: compiles SPARQL queries to SQL and runs them
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the SQL statement a SPARQL query compiles to
    Compile {
        #[command(flatten)]
        query: QueryInput,
        /// The SQL dialect to render
        ///
        /// One of "baseline", "postgresql", "mysql" or "h2".
        #[arg(long, default_value_t = SqlDialect::Baseline)]
        dialect: SqlDialect,
        /// RDF file whose nodes are used to resolve the constants of the query
        ///
        /// Without a file, constants are matched by joining the node table.
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: Option<PathBuf>,
        /// The format of the data file
        ///
        /// By default the format is guessed from the file extension.
        #[arg(long, requires = "data")]
        data_format: Option<String>,
        #[command(flatten)]
        options: CompilerFlags,
    },
    /// Load an RDF file and evaluate a SPARQL query against it
    Query {
        #[command(flatten)]
        query: QueryInput,
        /// RDF file to load
        ///
        /// If no file is given, stdin is read.
        #[arg(long, value_hint = ValueHint::FilePath)]
        data: Option<PathBuf>,
        /// The format of the data
        ///
        /// It can be an extension like "nt" or a MIME type like "application/n-triples".
        ///
        /// By default the format is guessed from the data file extension.
        #[arg(long, required_unless_present = "data")]
        data_format: Option<String>,
        /// The format of the results
        ///
        /// Solutions can be written as "json", "xml", "csv" or "tsv". Graphs can be written in
        /// any RDF format. Defaults to "json" for solutions and "nt" for graphs.
        #[arg(long)]
        results_format: Option<String>,
        /// Print the compiled SQL statement to stderr before running it
        #[arg(long)]
        explain: bool,
        #[command(flatten)]
        options: CompilerFlags,
    },
}

#[derive(ClapArgs)]
pub struct QueryInput {
    /// The SPARQL query
    #[arg(short, long, required_unless_present = "query_file", conflicts_with = "query_file")]
    pub query: Option<String>,
    /// File holding the SPARQL query
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub query_file: Option<PathBuf>,
    /// Base IRI of the query
    #[arg(long, value_hint = ValueHint::Url)]
    pub query_base: Option<String>,
}

#[derive(ClapArgs)]
pub struct CompilerFlags {
    /// How numeric operands are read from nodes
    ///
    /// One of "strict", "loose" or "none".
    #[arg(long, default_value_t = CastPolicy::Strict)]
    cast_policy: CastPolicy,
    /// Join the node table for constants instead of inlining their ids
    #[arg(long)]
    no_preload: bool,
    /// Evaluate REDUCED like DISTINCT
    #[arg(long)]
    reduced_as_distinct: bool,
}

impl CompilerFlags {
    pub fn to_options(&self) -> CompilerOptions {
        CompilerOptions::default()
            .with_cast_policy(self.cast_policy)
            .with_preloaded_constants(!self.no_preload)
            .with_reduced_as_distinct(self.reduced_as_distinct)
    }
}
