//! Specgraph CLI - Command-line interface for Specgraph
//!
//! Compiles business specs into a dependency graph and answers lineage,
//! impact and change-planning questions about it. Commands run against the
//! project in the current directory, configured by `.specgraph/config.json`.

use clap::{Parser, Subcommand};
use colored::Colorize;
use specgraph_graph::LineageDirection;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "specgraph")]
#[command(author = "Specgraph Contributors")]
#[command(version)]
#[command(about = "Dependency graph and change planning for business specs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Specgraph in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Compile specs into the graph document
    Compile {
        /// Write the graph here instead of the configured path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show graph statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Show a node
    Node {
        /// Node id, e.g. asset.entity.order
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Show incoming and outgoing edges of a node
    Edges {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Walk the graph from a node
    Lineage {
        id: String,

        /// upstream (who points here) or downstream (where this points)
        #[arg(short, long, default_value = "upstream")]
        direction: LineageDirection,

        #[arg(long)]
        json: bool,
    },

    /// Search nodes by id or label
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(short, long, default_value = "10")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// List nodes
    List {
        /// Only nodes of this type (asset, algorithm, workflow, skill, ...)
        #[arg(short = 't', long = "type")]
        node_type: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Preview everything affected by changing an entity
    Impact {
        /// Entity id
        entity: String,

        #[arg(long)]
        json: bool,
    },

    /// Show direct and transitive dependencies of an entity
    Deps {
        entity: String,

        #[arg(long)]
        json: bool,
    },

    /// Rate the risk of changing an entity
    Risk {
        entity: String,

        #[arg(long)]
        json: bool,
    },

    /// Check whether two entities can change concurrently
    Parallel {
        a: String,
        b: String,

        #[arg(long)]
        json: bool,
    },

    /// List in-flight changes that conflict with an entity
    Conflicts {
        entity: String,

        /// Entities currently being changed
        in_flight: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Order entity changes so dependencies land first
    Order {
        #[arg(required = true)]
        entities: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Report dependency cycles between entities
    Cycles {
        #[arg(long)]
        json: bool,
    },

    /// Print the entity dependency diagram as Mermaid
    Mermaid,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = std::env::current_dir()
        .map_err(Into::into)
        .and_then(|root| run(cli.command, root));

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(command: Commands, root: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init { path } => commands::init(&path),
        Commands::Compile { output, json } => commands::compile(&root, output.as_deref(), json),
        Commands::Stats { json } => commands::stats(&root, json),
        Commands::Node { id, json } => commands::node(&root, &id, json),
        Commands::Edges { id, json } => commands::edges(&root, &id, json),
        Commands::Lineage {
            id,
            direction,
            json,
        } => commands::lineage(&root, &id, direction, json),
        Commands::Search { query, limit, json } => commands::search(&root, &query, limit, json),
        Commands::List { node_type, json } => commands::list(&root, node_type.as_deref(), json),
        Commands::Impact { entity, json } => commands::impact(&root, &entity, json),
        Commands::Deps { entity, json } => commands::deps(&root, &entity, json),
        Commands::Risk { entity, json } => commands::risk(&root, &entity, json),
        Commands::Parallel { a, b, json } => commands::parallel(&root, &a, &b, json),
        Commands::Conflicts {
            entity,
            in_flight,
            json,
        } => commands::conflicts(&root, &entity, &in_flight, json),
        Commands::Order { entities, json } => commands::order(&root, &entities, json),
        Commands::Cycles { json } => commands::cycles(&root, json),
        Commands::Mermaid => commands::mermaid(&root),
    }
}
