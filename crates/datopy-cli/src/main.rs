//! Datopy CLI
//!
//! Developer tool for inspecting, validating, and processing JSON records.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::infer::QueryKind;

/// Datopy - data models for retrieved media metadata
#[derive(Parser)]
#[command(name = "datopy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "datopy.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new datopy project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Infer the type tree and JSON Schema of a record
    Infer {
        /// Record file (.json or .jsonl); the first record is used
        file: String,

        /// Source name used in saved file names
        #[arg(long, default_value = "local")]
        source: String,

        /// Kind of media the record describes
        #[arg(long, value_enum)]
        query_kind: Option<QueryKind>,

        /// Queried title
        #[arg(long)]
        title: Option<String>,

        /// Queried artist (albums only)
        #[arg(long)]
        artist: Option<String>,

        /// Write the data model files to the project output directory
        #[arg(long)]
        save: bool,
    },

    /// Validate record files against a JSON Schema
    Validate {
        /// Builtin schema, project schema, or schema file
        #[arg(short, long)]
        schema: String,

        /// Record files or directories
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show keys present in a reference record but missing from a candidate
    Diff {
        /// Reference record file
        reference: String,

        /// Candidate record file
        candidate: String,
    },

    /// Flatten records into a CSV table
    Normalize {
        /// Record file (.json or .jsonl)
        file: String,

        /// Output CSV path (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run processors
    Run {
        /// Run a specific processor only
        #[arg(short, long)]
        processor: Option<String>,
    },

    /// List processors
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Infer {
            file,
            source,
            query_kind,
            title,
            artist,
            save,
        } => {
            let query = commands::infer::query(query_kind, title, artist)?;
            commands::infer::run(&cli.config, &file, &source, query.as_ref(), save).await?;
        }
        Commands::Validate { schema, paths } => {
            commands::validate::run(&cli.config, &schema, &paths).await?;
        }
        Commands::Diff {
            reference,
            candidate,
        } => {
            commands::diff::run(&reference, &candidate).await?;
        }
        Commands::Normalize { file, output } => {
            commands::normalize::run(&file, output.as_deref()).await?;
        }
        Commands::Run { processor } => {
            commands::run::run(&cli.config, processor.as_deref()).await?;
        }
        Commands::List => {
            commands::list::run(&cli.config).await?;
        }
    }

    Ok(())
}
