//! exo CLI tool
//!
//! Command-line interface for building and querying exograph document graphs.
//!
//! ## Commands
//!
//! - `graph build`: parse the content directory, build the graph and save it
//! - `graph stats`: summarize a saved graph
//! - `graph calc`: run the calculation recipes from `exo.toml` over a saved graph
//! - `graph query ...`: look up nodes, neighbours and edges of a saved graph (JSON output)
//! - `resolve <path>`: resolve a semantic request path against a saved graph
//!
//! Paths in `exo.toml` are relative to the directory holding it. Logging goes to stderr and
//! is raised with repeated `-v` flags; `RUST_LOG` takes precedence when set.

use clap::{ArgAction, Parser, Subcommand};
use exograph::{
    codec::MARKUP,
    config::{ExoConfig, DEFAULT_CONFIG_FILE},
    corpus,
    graph::{DocumentGraph, CALCULATIONS},
    paths::SemanticPath,
    query::{self, Direction, NodeFilter},
    ExoError,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exo")]
#[command(author, version, about = "Build and query semantic document graphs", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Graph construction and inspection
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },

    /// Resolve a semantic path such as `/site/~view/in/physics`
    Resolve {
        path: String,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Parse every document under the content root and save the graph
    Build {
        /// Exit with an error when any link target is unresolved
        #[arg(long)]
        strict: bool,
    },

    /// Print vertex, edge and predicate counts of the saved graph
    Stats,

    /// Evaluate the configured calculation recipes
    Calc,

    /// Query the saved graph
    Query {
        #[command(subcommand)]
        query: QueryCommands,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Restrict to this document and everything transitively `in` it
    #[arg(long)]
    in_subgraph: Option<String>,

    /// Restrict to edges carrying this predicate
    #[arg(long)]
    predicate: Option<String>,
}

impl From<FilterArgs> for NodeFilter {
    fn from(args: FilterArgs) -> Self {
        NodeFilter {
            in_subgraph: args.in_subgraph,
            predicate: args.predicate,
        }
    }
}

#[derive(Subcommand)]
enum QueryCommands {
    /// List nodes
    Nodes {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Look up a node by name, or by UUID with `--id`
    Node {
        key: String,

        #[arg(long)]
        id: bool,
    },

    /// Neighbours of a node
    Neighbors {
        name: String,

        #[arg(long, value_enum, default_value_t = Direction::All)]
        direction: Direction,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Edges of a node
    Edges {
        name: String,

        #[arg(long, value_enum, default_value_t = Direction::All)]
        direction: Direction,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<ExoConfig, ExoError> {
    let base = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(ExoConfig::load(path)?.relative_to(base))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExoError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build(config: &ExoConfig, strict: bool) -> Result<(), ExoError> {
    let documents = corpus::load_dir(&MARKUP, &config.content_root, &config.extension)?;
    let (graph, report) = DocumentGraph::build(documents);
    for diagnostic in report.diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
    println!("{report}");
    if strict && !report.is_clean() {
        return Err(ExoError::Invariant(format!(
            "{} unresolved link target(s)",
            report.unresolved().count()
        )));
    }
    if let Some(parent) = config.graph_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    graph.save(&config.graph_file)?;
    println!("saved {}", config.graph_file.display());
    Ok(())
}

fn stats(graph: &DocumentGraph) {
    let view = graph.view();
    println!("vertices: {}", view.vertex_count());
    println!("edges:    {}", view.edge_count());
    println!("dag:      {}", view.is_dag());
    println!("planar:   {}", view.is_planar());
    println!("predicates:");
    for (predicate, count) in view.predicate_counts() {
        println!("  {predicate:<12} {count}");
    }
}

fn run(cli: Cli) -> Result<(), ExoError> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Graph { command } => match command {
            GraphCommands::Build { strict } => build(&config, strict)?,
            GraphCommands::Stats => stats(&DocumentGraph::load(&config.graph_file)?),
            GraphCommands::Calc => {
                let graph = DocumentGraph::load(&config.graph_file)?;
                print_json(
                    &graph
                        .view()
                        .calculate_recipes(&CALCULATIONS, &config.recipes)?,
                )?;
            }
            GraphCommands::Query { query: request } => {
                let graph = DocumentGraph::load(&config.graph_file)?;
                let view = graph.view();
                match request {
                    QueryCommands::Nodes { filter } => {
                        print_json(&query::nodes(&view, &filter.into())?)?
                    }
                    QueryCommands::Node { key, id } => {
                        let record = if id {
                            query::node_by_id(&view, &key.parse()?)?
                        } else {
                            query::node_by_name(&view, &key)?
                        };
                        print_json(&record)?
                    }
                    QueryCommands::Neighbors {
                        name,
                        direction,
                        filter,
                    } => print_json(&query::neighbors(&view, &name, direction, &filter.into())?)?,
                    QueryCommands::Edges {
                        name,
                        direction,
                        filter,
                    } => print_json(&query::edges(&view, &name, direction, &filter.into())?)?,
                }
            }
        },
        Commands::Resolve { path } => {
            let path: SemanticPath = path.parse()?;
            let graph = if path.is_bundle() {
                DocumentGraph::default()
            } else {
                DocumentGraph::load(&config.graph_file)?
            };
            print_json(&query::resolve_path(&graph.view(), &path)?)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
