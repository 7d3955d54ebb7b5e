//! mailroom - email and document intake classification.
//!
//! Turns emails (.eml, .msg), PDFs, Word documents, images and plain text
//! into plain text, with OCR where no text layer exists, and asks a language
//! model to classify the result against a configurable request taxonomy.

pub mod cli;
pub mod config;
pub mod container;
pub mod extract;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod server;

pub use config::{ConfigError, Settings, Taxonomy};
pub use extract::{ExtractionError, TextExtractor};
pub use llm::{backend_from_config, ClassificationBackend, LlmConfig, LlmProvider};
pub use models::{ClassificationResult, ProcessedFileRecord, SourceDocument};
pub use pipeline::{Pipeline, ProcessOutcome};
