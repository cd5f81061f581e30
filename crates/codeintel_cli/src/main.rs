//! Codeintel CLI - Command-line interface for structural code intelligence.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "codeintel")]
#[command(about = "Symbols and relationships from source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root holding codeintel.toml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract symbols and relationships from files or directories
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output format (json, text)
        #[arg(long, default_value = "text")]
        format: String,
        /// Skip language servers and use bundled backends only
        #[arg(long)]
        no_lsp: bool,
    },
    /// Show call-hierarchy edges for the symbol at a position
    Calls {
        /// File containing the symbol
        file: PathBuf,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
        /// Language whose configured server to use (defaults to the file's language)
        #[arg(long)]
        language: Option<String>,
    },
    /// Show backends per language and whether they can run
    Status,
}

fn main() -> Result<()> {
    // Respects RUST_LOG (e.g., RUST_LOG=codeintel_core=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            paths,
            format,
            no_lsp,
        } => commands::analyze::run(&cli.root, &paths, &format, no_lsp),
        Commands::Calls {
            file,
            line,
            column,
            language,
        } => commands::calls::run(&cli.root, &file, line, column, language.as_deref()),
        Commands::Status => commands::status::run(&cli.root),
    }
}
