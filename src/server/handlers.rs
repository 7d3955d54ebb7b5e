//! HTTP request handlers.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::models::{DocumentFormat, SourceDocument};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn home() -> impl IntoResponse {
    Json(json!({"message": "Welcome to the mailroom API!"}))
}

/// Store an uploaded document and return its classification record.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        match field.bytes().await {
            Ok(bytes) => {
                upload = Some((filename, bytes.to_vec()));
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to read upload bytes: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Failed to read file data");
            }
        }
    }

    let Some((raw_name, content)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file part");
    };

    // Only the final path component is kept so uploads stay inside their directory.
    let filename = Path::new(&raw_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if filename.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No selected file");
    }

    let Some(format) = DocumentFormat::from_filename(&filename) else {
        return error_response(StatusCode::BAD_REQUEST, "File type not allowed");
    };

    let upload_dir = state.upload_dir.join(Uuid::new_v4().to_string());
    let stored_path = upload_dir.join(&filename);
    let stored = async {
        tokio::fs::create_dir_all(&upload_dir).await?;
        tokio::fs::write(&stored_path, &content).await
    };
    if let Err(e) = stored.await {
        tracing::error!("Failed to store upload {}: {}", stored_path.display(), e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store file");
    }
    tracing::info!("Stored upload at {}", stored_path.display());

    let document = SourceDocument::new(filename, content, format);
    let record = state.pipeline.process_document(document).await;
    Json(record).into_response()
}
