//! Data models for mailroom.

mod classification;
mod document;

pub use classification::{ClassificationResult, OutputRecord, ProcessedFileRecord};
pub use document::{ContainerFormat, DocumentFormat, SourceDocument, TextFormat};
