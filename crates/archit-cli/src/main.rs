//! Archit CLI tool.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "archit")]
#[command(about = "Compose deployment topologies from an architecture document", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, env = "ARCHIT_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Document location and variables, shared by every command.
#[derive(Args)]
pub struct DocumentArgs {
    /// Path to the architecture document
    #[arg(env = "ARCHIT_DOCUMENT", default_value = "archit.yaml")]
    pub path: PathBuf,

    /// Custom variable for `${name}` references (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = commands::parse_var)]
    pub vars: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode and validate an architecture document
    Validate {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Assemble the document and print the resulting plan
    Plan {
        #[command(flatten)]
        document: DocumentArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Assemble the document and hand it to the dry-run provisioner
    Provision {
        #[command(flatten)]
        document: DocumentArgs,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Validate { document } => {
            commands::validate(&document)?;
        }
        Commands::Plan { document, format } => {
            commands::plan::plan(&document, format)?;
        }
        Commands::Provision { document } => {
            commands::provision::provision(&document).await?;
        }
    }

    Ok(())
}
