//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod llm;
mod ocr;
mod process;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions, Settings};
use crate::extract::TextExtractor;
use crate::llm::backend_from_config;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "mailroom")]
#[command(about = "Classify emails and documents against a request taxonomy")]
#[command(version)]
pub struct Cli {
    /// Settings file path (defaults to ./mailroom.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Taxonomy JSON file (overrides the settings file)
    #[arg(short, long, global = true, env = "MAILROOM_TAXONOMY")]
    taxonomy: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a file, or every file in a directory
    Process {
        /// Input file or directory
        input: PathBuf,
        /// Output JSON file
        #[arg(short, long, default_value = "output.json")]
        output: PathBuf,
    },

    /// Start the upload server
    Serve {
        /// Address to bind to (e.g., "5000", "0.0.0.0:5000")
        #[arg(default_value = "127.0.0.1:5000")]
        bind: String,
    },

    /// Check that OCR and PDF tools are installed
    OcrCheck,

    /// List models available from the Ollama endpoint
    LlmModels,
}

/// Build the pipeline from settings; fails if the taxonomy cannot be loaded.
fn build_pipeline(settings: &Settings) -> anyhow::Result<Pipeline> {
    let taxonomy = settings.load_taxonomy()?;
    tracing::info!(
        "Loaded taxonomy with {} request type(s) and {} field(s) from {}",
        taxonomy.request_types.len(),
        taxonomy.fields.len(),
        settings.taxonomy.display()
    );

    let backend = backend_from_config(&settings.llm)?;
    let extractor = TextExtractor::with_language(&settings.ocr_language);
    Ok(Pipeline::new(extractor, backend, Arc::new(taxonomy)))
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        taxonomy: cli.taxonomy,
    };
    let settings = load_settings(&options)?;

    match cli.command {
        Commands::Process { input, output } => {
            process::cmd_process(&settings, &input, &output).await
        }
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::OcrCheck => ocr::cmd_ocr_check(&settings),
        Commands::LlmModels => llm::cmd_llm_models(&settings).await,
    }
}
