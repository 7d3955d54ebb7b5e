//! Email container unpacking.
//!
//! Splits a container into its body text and the text of every attachment
//! the extractors understand. Attachments are tagged with a [`TextFormat`]
//! while the container is parsed (media type for MIME, filename extension
//! for Outlook), then extracted in enumeration order. Attachments with no
//! format, or whose extraction fails, are skipped.

mod mime;
mod outlook;

use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::TextExtractor;
use crate::models::{ContainerFormat, TextFormat};

/// Errors that can occur while unpacking a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Failed to parse {format} container: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    fn parse(format: ContainerFormat, reason: impl Into<String>) -> Self {
        Self::Parse {
            format: format.as_str(),
            reason: reason.into(),
        }
    }
}

/// An attachment as found in the container, before extraction.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    /// Filename, if the container names one.
    pub filename: Option<String>,
    /// Format resolved at the container boundary; `None` if unsupported.
    pub format: Option<TextFormat>,
    pub data: Vec<u8>,
}

/// Parsed container: body text plus undecoded attachments.
#[derive(Debug, Clone, Default)]
pub struct ParsedContainer {
    pub body: String,
    pub attachments: Vec<RawAttachment>,
}

/// Container body and extracted attachment texts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackedContainer {
    pub body: String,
    pub attachments: Vec<String>,
}

/// Parse a container without extracting its attachments.
pub fn parse(bytes: &[u8], format: ContainerFormat) -> Result<ParsedContainer, ContainerError> {
    match format {
        ContainerFormat::MimeEmail => mime::parse_mime(bytes),
        ContainerFormat::OutlookMessage => outlook::parse_outlook(bytes),
    }
}

/// Parse a container and extract text from each supported attachment.
pub fn unpack(
    bytes: &[u8],
    format: ContainerFormat,
    extractor: &TextExtractor,
) -> Result<UnpackedContainer, ContainerError> {
    let parsed = parse(bytes, format)?;
    let mut attachments = Vec::with_capacity(parsed.attachments.len());

    for attachment in &parsed.attachments {
        let name = attachment.filename.as_deref().unwrap_or("<unnamed>");
        let Some(text_format) = attachment.format else {
            debug!("Skipping unsupported attachment {}", name);
            continue;
        };

        match extractor.extract(&attachment.data, text_format) {
            Ok(text) => {
                debug!(
                    "Extracted {} chars from {} attachment {}",
                    text.len(),
                    text_format.as_str(),
                    name
                );
                attachments.push(text);
            }
            Err(e) => warn!("Skipping attachment {}: {}", name, e),
        }
    }

    Ok(UnpackedContainer {
        body: parsed.body,
        attachments,
    })
}
