//! Stratigraph CLI - Inspect schemas and load graphs from the command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, graph, schema};
use config::Config;
use output::OutputFormat;
use stratigraph_core::Schema;

#[derive(Parser)]
#[command(name = "stratigraph")]
#[command(author, version, about = "Typed property graphs for stratigraphic records")]
pub struct Cli {
    /// Schema table (JSON); the builtin schema is used when absent
    #[arg(long, global = true, env = "STRATIGRAPH_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Output format: table, json
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the connection schema
    Schema(schema::SchemaArgs),
    /// Load and query graph documents
    Graph(graph::GraphArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context shared by the schema and graph commands
pub struct AppContext {
    pub config: Config,
    pub schema: Arc<Schema>,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = Config::load();

        let schema = match cli.schema.as_ref().or(config.schema_path.as_ref()) {
            Some(path) => {
                tracing::debug!("Using schema at: {:?}", path);
                let schema = Schema::from_path(path)
                    .with_context(|| format!("Failed to load schema {}", path.display()))?;
                Arc::new(schema)
            }
            None => Schema::builtin(),
        };

        let format = OutputFormat::from(cli.format.as_deref().unwrap_or(&config.format));

        Ok(Self {
            config,
            schema,
            format,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting stratigraph CLI");

    match &cli.command {
        Commands::Schema(args) => schema::run(args, &AppContext::new(&cli)?)?,
        Commands::Graph(args) => graph::run(args, &AppContext::new(&cli)?)?,
        Commands::Config(args) => commands::config::run(args, cli.format.as_deref())?,
        Commands::Completions(args) => completions::run(args)?,
    }

    Ok(())
}
