#![allow(
    clippy::print_stderr,
    clippy::print_stdout,
    reason = "The results and the compiled SQL are the output of the command"
)]
use crate::cli::{Args, Command, QueryInput};
use anyhow::{bail, Context};
use clap::Parser;
use oxrdfio::{RdfFormat, RdfParser};
use sparesults::QueryResultsFormat;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{stdin, stdout, BufReader, Read, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use triplesql::compiler::{NodeResolver, SqlCompiler};
use triplesql::results::QueryResults;
use triplesql::sparql::Query;
use triplesql::storage::MemStorage;
use triplesql::store::Store;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    init_logging();
    let matches = Args::parse();
    match matches.command {
        Command::Compile {
            query,
            dialect,
            data,
            data_format,
            options,
        } => {
            let query = read_query(&query)?;
            let storage = match data {
                Some(data) => {
                    let format = data_format_of(data_format.as_deref(), Some(&data))?;
                    let storage = MemStorage::new();
                    let file = File::open(&data)
                        .with_context(|| format!("Could not open {}", data.display()))?;
                    for quad in RdfParser::from_format(format).for_reader(BufReader::new(file)) {
                        storage.insert(quad?.as_ref());
                    }
                    Some(storage)
                }
                None => None,
            };
            let prepared = query.prepare()?;
            let compiler = SqlCompiler::new(options.to_options().with_dialect(dialect));
            let resolver = storage
                .as_ref()
                .map(|storage| -> &dyn NodeResolver { storage });
            let compiled = compiler.compile(prepared.pattern(), resolver)?;
            println!("{}", compiled.sql());
            Ok(())
        }
        Command::Query {
            query,
            data,
            data_format,
            results_format,
            explain,
            options,
        } => {
            let query = read_query(&query)?;
            let store = Store::new(options.to_options());
            let format = data_format_of(data_format.as_deref(), data.as_deref())?;
            let loaded = match &data {
                Some(data) => store.load_from_reader(
                    format,
                    BufReader::new(
                        File::open(data)
                            .with_context(|| format!("Could not open {}", data.display()))?,
                    ),
                )?,
                None => store.load_from_reader(format, stdin().lock())?,
            };
            tracing::info!(loaded, "Loaded data");

            if explain {
                eprintln!("{}", store.explain(query.clone())?.sql());
            }
            let results = store.query(query).await?;
            let writer = stdout().lock();
            match results {
                QueryResults::Graph(_) => {
                    let format = match results_format {
                        Some(format) => rdf_format_from_name(&format)?,
                        None => RdfFormat::NTriples,
                    };
                    results.write_graph(writer, format).await?.flush()?;
                }
                results => {
                    let format = match results_format {
                        Some(format) => query_results_format_from_name(&format)?,
                        None => QueryResultsFormat::Json,
                    };
                    results.write(writer, format).await?.flush()?;
                }
            }
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_query(input: &QueryInput) -> anyhow::Result<Query> {
    let query = match (&input.query, &input.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(file)) => fs::read_to_string(file)
            .with_context(|| format!("Could not read the query file {}", file.display()))?,
        (None, None) => {
            let mut query = String::new();
            stdin().lock().read_to_string(&mut query)?;
            query
        }
    };
    Query::parse(&query, input.query_base.as_deref()).context("Invalid SPARQL query")
}

fn data_format_of(name: Option<&str>, path: Option<&Path>) -> anyhow::Result<RdfFormat> {
    if let Some(name) = name {
        rdf_format_from_name(name)
    } else if let Some(path) = path {
        rdf_format_from_path(path)
    } else {
        bail!("The --data-format option must be set when reading from stdin")
    }
}

fn format_from_path<T>(
    path: &Path,
    from_extension: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        from_extension(ext).map_err(|e| {
            e.context(format!(
                "Not able to guess the file format from file name extension '{ext}'"
            ))
        })
    } else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    }
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    format_from_path(path, |ext| {
        RdfFormat::from_extension(ext)
            .with_context(|| format!("The file extension '{ext}' is unknown"))
    })
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

fn query_results_format_from_name(name: &str) -> anyhow::Result<QueryResultsFormat> {
    if let Some(t) = QueryResultsFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = QueryResultsFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The query results format '{name}' is unknown")
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use anyhow::Result;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use assert_fs::NamedTempFile;
    use predicates::prelude::*;

    const DATA: &str = "<http://example.com/s> <http://example.com/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n\
                        <http://example.com/s> <http://example.com/q> <http://example.com/o> .\n";

    fn cli_command() -> Command {
        let mut command = Command::new(env!("CARGO"));
        command.arg("run").arg("--bin").arg("triplesql").arg("--");
        command
    }

    #[test]
    fn cli_help() {
        cli_command()
            .assert()
            .failure()
            .stdout("")
            .stderr(predicate::str::contains("TripleSQL"));
    }

    #[test]
    fn cli_compile_without_data_joins_constants() {
        cli_command()
            .arg("compile")
            .arg("--query")
            .arg("SELECT ?s WHERE { ?s <http://example.com/p> ?o }")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("SELECT "))
            .stdout(predicate::str::contains("nodes AS c1"));
    }

    #[test]
    fn cli_compile_reports_dialect_gaps() {
        cli_command()
            .arg("compile")
            .arg("--dialect")
            .arg("baseline")
            .arg("--query")
            .arg("SELECT ?s WHERE { ?s ?p ?o FILTER(REGEX(STR(?o), \"^(a|b)\")) }")
            .assert()
            .failure()
            .stderr(predicate::str::contains("baseline"));
    }

    #[test]
    fn cli_compile_rejects_unknown_dialects() {
        cli_command()
            .arg("compile")
            .arg("--dialect")
            .arg("oracle")
            .arg("--query")
            .arg("SELECT * WHERE { ?s ?p ?o }")
            .assert()
            .failure()
            .stderr(predicate::str::contains("'oracle' is not a valid dialect"));
    }

    #[test]
    fn cli_compile_with_data_inlines_ids() -> Result<()> {
        let data_file = NamedTempFile::new("data.nt")?;
        data_file.write_str(DATA)?;
        cli_command()
            .arg("compile")
            .arg("--data")
            .arg(data_file.path())
            .arg("--query")
            .arg("SELECT ?s WHERE { ?s <http://example.com/p> ?o }")
            .assert()
            .success()
            .stdout(predicate::str::contains("predicate_id = 2"));
        Ok(())
    }

    #[test]
    fn cli_query_writes_csv() {
        cli_command()
            .arg("query")
            .arg("--data-format")
            .arg("nt")
            .arg("--results-format")
            .arg("csv")
            .arg("--query")
            .arg("SELECT ?o WHERE { <http://example.com/s> <http://example.com/q> ?o }")
            .write_stdin(DATA)
            .assert()
            .success()
            .stdout("o\r\nhttp://example.com/o\r\n");
    }

    #[test]
    fn cli_query_construct_writes_ntriples() -> Result<()> {
        let query_file = NamedTempFile::new("query.rq")?;
        query_file.write_str(
            "CONSTRUCT { ?o <http://example.com/r> ?s } WHERE { ?s <http://example.com/q> ?o }",
        )?;
        cli_command()
            .arg("query")
            .arg("--data-format")
            .arg("nt")
            .arg("--query-file")
            .arg(query_file.path())
            .write_stdin(DATA)
            .assert()
            .success()
            .stdout("<http://example.com/o> <http://example.com/r> <http://example.com/s> .\n");
        Ok(())
    }

    #[test]
    fn clap_debug() {
        use clap::CommandFactory;

        Args::command().debug_assert()
    }
}
