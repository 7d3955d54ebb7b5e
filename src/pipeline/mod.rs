//! Document pipeline: extract, aggregate, classify, record.
//!
//! Every recognized document yields exactly one [`ProcessedFileRecord`].
//! Extraction and container failures are logged and recorded with an empty
//! result; the model is not called for them. Unrecognized files are skipped.

mod aggregate;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Taxonomy;
use crate::container::{self, ContainerError};
use crate::extract::{ExtractionError, TextExtractor};
use crate::llm::ClassificationBackend;
use crate::models::{DocumentFormat, OutputRecord, ProcessedFileRecord, SourceDocument};

pub use aggregate::aggregate;

/// Why a document's text could not be produced.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from batch input and output, outside any single document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of offering one path to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Recorded(ProcessedFileRecord),
    /// Not a recognized document format.
    Skipped(PathBuf),
}

impl ProcessOutcome {
    pub fn record(self) -> Option<ProcessedFileRecord> {
        match self {
            Self::Recorded(record) => Some(record),
            Self::Skipped(_) => None,
        }
    }
}

/// Produce the classification input for a document.
///
/// Containers contribute their aggregated body and attachments; other
/// documents contribute their extracted text alone.
pub fn extract_content(
    extractor: &TextExtractor,
    document: &SourceDocument,
) -> Result<String, DocumentError> {
    match document.format() {
        DocumentFormat::Text(format) => Ok(extractor.extract(document.content(), format)?),
        DocumentFormat::Container(format) => {
            let unpacked = container::unpack(document.content(), format, extractor)?;
            debug!(
                "{}: body of {} chars, {} attachment text(s)",
                document.filename(),
                unpacked.body.len(),
                unpacked.attachments.len()
            );
            Ok(aggregate(&unpacked.body, &unpacked.attachments))
        }
    }
}

/// Sequential document processor.
pub struct Pipeline {
    extractor: TextExtractor,
    backend: Arc<dyn ClassificationBackend>,
    taxonomy: Arc<Taxonomy>,
}

impl Pipeline {
    pub fn new(
        extractor: TextExtractor,
        backend: Arc<dyn ClassificationBackend>,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        Self {
            extractor,
            backend,
            taxonomy,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Extract, aggregate and classify one document.
    ///
    /// Extraction runs on the blocking pool since OCR shells out.
    pub async fn process_document(&self, document: SourceDocument) -> ProcessedFileRecord {
        let filename = document.filename().to_string();
        info!("Processing {} ({})", filename, document.format());

        let extractor = self.extractor.clone();
        let content = tokio::task::spawn_blocking(move || extract_content(&extractor, &document))
            .await
            .map_err(DocumentError::from)
            .and_then(|result| result);

        let content = match content {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to extract {}: {}", filename, e);
                return ProcessedFileRecord::empty(filename);
            }
        };

        debug!("Classifying {} chars from {}", content.len(), filename);
        let result = self.backend.classify(&content, &self.taxonomy).await;
        if result.is_empty() {
            warn!("No classification for {}", filename);
        } else {
            info!(
                "Classified {} as {}",
                filename,
                result.request_type.as_deref().unwrap_or("<none>")
            );
        }
        ProcessedFileRecord::new(filename, result)
    }

    /// Process a file if its format is recognized.
    ///
    /// A recognized file that cannot be read is still recorded, with an
    /// empty result.
    pub async fn process_path(&self, path: &Path) -> ProcessOutcome {
        match SourceDocument::read(path) {
            Ok(Some(document)) => ProcessOutcome::Recorded(self.process_document(document).await),
            Ok(None) => {
                debug!("Skipping unrecognized file {}", path.display());
                ProcessOutcome::Skipped(path.to_path_buf())
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                ProcessOutcome::Recorded(ProcessedFileRecord::empty(file_name(path)))
            }
        }
    }

    /// Process every file in `dir`, in filename order.
    pub async fn process_dir(&self, dir: &Path) -> Result<Vec<ProcessedFileRecord>, PipelineError> {
        let mut records = Vec::new();
        for path in list_inputs(dir)? {
            if let Some(record) = self.process_path(&path).await.record() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Regular files directly inside `dir`, sorted by filename.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let read_err = |source| PipelineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    Ok(paths)
}

/// Serialize records as the output artifact (4-space indented JSON array).
pub fn output_json(records: &[ProcessedFileRecord]) -> Result<Vec<u8>, PipelineError> {
    let output: Vec<OutputRecord> = records.iter().map(OutputRecord::from).collect();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    output.serialize(&mut serializer)?;
    Ok(buf)
}

/// Write the output artifact to `path`.
pub fn write_output(path: &Path, records: &[ProcessedFileRecord]) -> Result<(), PipelineError> {
    let json = output_json(records)?;
    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    writer.write_all(&json).map_err(write_err)?;
    writer.flush().map_err(write_err)?;
    info!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;
    use crate::extract::docx_testing::{build_docx, DOCUMENT_XML};
    use crate::extract::ocr_testing::EchoOcr;
    use crate::extract::pdf_testing::FakePdf;
    use crate::llm::testing::RecordingBackend;
    use crate::models::{ClassificationResult, ContainerFormat, TextFormat};

    fn fee_payment() -> ClassificationResult {
        ClassificationResult {
            request_type: Some("Fee Payment".to_string()),
            confidence_score: Some(json!(0.8)),
            ..Default::default()
        }
    }

    fn pipeline(backend: Arc<RecordingBackend>, pages: Vec<&'static str>) -> Pipeline {
        let extractor =
            TextExtractor::with_backends(Arc::new(EchoOcr::default()), Arc::new(FakePdf::new(pages)));
        Pipeline::new(extractor, backend, Arc::new(Taxonomy::default()))
    }

    #[tokio::test]
    async fn test_text_document_classified_on_its_text() {
        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let pipeline = pipeline(backend.clone(), vec![]);

        let document = SourceDocument::new(
            "note.txt",
            b"Pay the agency fee".to_vec(),
            DocumentFormat::Text(TextFormat::PlainText),
        );
        let record = pipeline.process_document(document).await;

        assert_eq!(record, ProcessedFileRecord::new("note.txt", fee_payment()));
        assert_eq!(backend.contents(), vec!["Pay the agency fee".to_string()]);
    }

    #[tokio::test]
    async fn test_extraction_failure_records_empty_without_model_call() {
        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let pipeline = pipeline(backend.clone(), vec![]);

        let document = SourceDocument::new(
            "broken.msg",
            b"not a compound file".to_vec(),
            DocumentFormat::Container(ContainerFormat::OutlookMessage),
        );
        let record = pipeline.process_document(document).await;

        assert_eq!(record, ProcessedFileRecord::empty("broken.msg"));
        assert!(backend.contents().is_empty());
    }

    #[tokio::test]
    async fn test_email_content_is_aggregated() {
        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let pipeline = pipeline(backend.clone(), vec!["PDF TEXT"]);

        let eml = "From: a@example.com\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
Body\r\n\
--b\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"a.pdf\"\r\n\
\r\n\
%PDF\r\n\
--b--\r\n";
        let document = SourceDocument::from_bytes("mail.eml", eml.as_bytes().to_vec()).unwrap();
        pipeline.process_document(document).await;

        let contents = backend.contents();
        assert_eq!(contents.len(), 1);
        assert!(contents[0].starts_with("Body"));
        assert!(contents[0].ends_with("\nPDF TEXT"));
    }

    #[tokio::test]
    async fn test_word_document_classified_on_its_text() {
        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let pipeline = pipeline(backend.clone(), vec![]);

        let docx = build_docx(&[("word/document.xml", DOCUMENT_XML.as_bytes())]);
        let document = SourceDocument::from_bytes("Request.DOCX", docx).unwrap();
        let record = pipeline.process_document(document).await;

        assert_eq!(record.filename, "Request.DOCX");
        assert_eq!(
            backend.contents(),
            vec!["Please process the fee payment\n\nAmount:\tUSD 1,200 & fees".to_string()]
        );
    }

    #[tokio::test]
    async fn test_process_dir_sorted_and_skips_unrecognized() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.TXT"), "first").unwrap();
        fs::write(dir.path().join("archive.zip"), "PK").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let pipeline = pipeline(backend.clone(), vec![]);
        let records = pipeline.process_dir(dir.path()).await.unwrap();

        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        assert_eq!(backend.contents(), vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_process_path_skips_unknown_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b").unwrap();

        let backend = Arc::new(RecordingBackend::new(fee_payment()));
        let outcome = pipeline(backend, vec![]).process_path(&path).await;
        assert_eq!(outcome, ProcessOutcome::Skipped(path));
    }

    #[test]
    fn test_output_json_indent_and_defaults() {
        let records = vec![
            ProcessedFileRecord::new("a.txt", fee_payment()),
            ProcessedFileRecord::empty("b.pdf"),
        ];
        let json = String::from_utf8(output_json(&records).unwrap()).unwrap();

        assert!(json.starts_with("[\n    {\n        \"filename\": \"a.txt\""));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value[1],
            json!({
                "filename": "b.pdf",
                "request_type": "",
                "sub_request_type": "",
                "confidence_score": "",
                "reasoning": "",
                "extracted_information": {}
            })
        );
        assert_eq!(value[0]["confidence_score"], json!(0.8));
    }

    #[test]
    fn test_write_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.json");
        write_output(&path, &[ProcessedFileRecord::empty("x.png")]).unwrap();

        let value: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }
}
