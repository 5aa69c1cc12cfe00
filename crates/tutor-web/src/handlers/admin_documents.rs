//! Admin document management: upload, listing and indexer controls.
//!
//! The external indexer owns the `processing`/`completed` transitions. This
//! side only inserts rows as `pending` and marks them `failed` when the
//! indexing trigger itself cannot be delivered.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use serde::Deserialize;
use serde_json::json;
use tutor_common::{ApiError, ApiMessage, ApiResponse, FieldError};
use tutor_db::{DocumentRepository, DocumentStatus, NewDocument};
use tutor_rag::IndexerClient;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::extract::{ensure_valid, non_blank, page_from, parse_id, AppQuery};
use crate::state::SharedState;

pub const UPLOAD_FIELD: &str = "document";
const PDF_MIME: &str = "application/pdf";
const EMBED_BATCH_SIZE: u32 = 50;
const EMBED_MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetryFailedQuery {
    pub document_id: Option<String>,
}

/// A PDF is recognised by its declared content type or its extension.
pub fn is_pdf(filename: &str, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case(PDF_MIME))
        || FsPath::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Unique on-disk name: `<millis>-<uuid>.pdf`.
pub fn stored_name() -> String {
    format!("{}-{}.pdf", chrono::Utc::now().timestamp_millis(), Uuid::new_v4())
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the `document` field out of the form, enforcing type and size.
async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        if !is_pdf(&filename, field.content_type()) {
            return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max_bytes {
                return Err(ApiError::BadRequest(format!(
                    "File too large (max {} MB)",
                    max_bytes / (1024 * 1024)
                )));
            }
        }
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
        }
        return Ok(Upload { filename, bytes });
    }
    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Fire the indexing request in the background. A failed trigger marks the
/// document `failed` so it does not sit in `pending` forever.
fn spawn_index(documents: DocumentRepository, indexer: IndexerClient, id: i64, file_path: String) {
    tokio::spawn(async move {
        match indexer.index_document(id, &file_path, false).await {
            Ok(_) => tracing::info!(document_id = id, "indexing triggered"),
            Err(e) => {
                tracing::error!(document_id = id, error = %e, "indexing trigger failed");
                if let Err(db_err) = documents
                    .set_status(id, DocumentStatus::Failed, Some(&e.to_string()))
                    .await
                {
                    tracing::error!(
                        document_id = id,
                        error = %db_err,
                        "could not mark document failed"
                    );
                }
            }
        }
    });
}

/// POST /api/admin/documents/upload
pub async fn upload_document(
    State(state): State<SharedState>,
    Extension(admin): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let uploads = &state.config.uploads;
    let upload = read_upload(&mut multipart, uploads.max_bytes).await?;

    tokio::fs::create_dir_all(&uploads.dir)
        .await
        .map_err(|e| ApiError::internal("Failed to store upload", e))?;
    let path: PathBuf = uploads.dir.join(stored_name());
    tokio::fs::write(&path, &upload.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to store upload", e))?;
    let file_path = path.to_string_lossy().into_owned();

    let document = match state
        .documents
        .create(&NewDocument {
            filename: upload.filename,
            file_path: file_path.clone(),
            file_size: upload.bytes.len() as i64,
            mime_type: PDF_MIME.to_string(),
            uploaded_by: Some(admin.id),
        })
        .await
    {
        Ok(doc) => doc,
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        document_id = document.id,
        filename = %document.filename,
        bytes = document.file_size,
        "document uploaded"
    );
    spawn_index(state.documents.clone(), state.rag.indexer().clone(), document.id, file_path);

    Ok(ApiResponse::created(json!({ "document": document })))
}

/// GET /api/admin/documents
pub async fn list_documents(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<DocumentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    let page = page_from(query.page.as_deref(), query.limit.as_deref(), &mut errors);
    let status = non_blank(query.status).and_then(|s| {
        let parsed = DocumentStatus::parse(&s);
        if parsed.is_none() {
            errors.push(FieldError::new(
                "status",
                "Status must be pending, processing, completed or failed",
            ));
        }
        parsed
    });
    ensure_valid(errors)?;

    let (documents, total) = state.documents.list(status, page).await?;
    Ok(ApiResponse::ok(json!({ "documents": documents, "pagination": page.with_total(total) })))
}

/// GET /api/admin/documents/{id}
pub async fn get_document(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid document ID")?;
    let document = state
        .documents
        .find_with_counts(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;
    Ok(ApiResponse::ok(json!({ "document": document })))
}

/// DELETE /api/admin/documents/{id}
pub async fn delete_document(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid document ID")?;
    let document = state
        .documents
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    if let Err(e) = tokio::fs::remove_file(&document.file_path).await {
        tracing::warn!(
            document_id = id,
            path = %document.file_path,
            error = %e,
            "stored file not removed"
        );
    }
    tracing::info!(document_id = id, "document deleted");
    Ok(ApiMessage::new("Document deleted successfully"))
}

/// POST /api/admin/documents/{id}/reindex
pub async fn reindex_document(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid document ID")?;
    let document = state
        .documents
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    let removed = state.documents.delete_chunks(id).await?;
    state.documents.set_status(id, DocumentStatus::Pending, None).await?;
    tracing::info!(document_id = id, removed_chunks = removed, "reindex requested");

    spawn_index(state.documents.clone(), state.rag.indexer().clone(), id, document.file_path);

    Ok(ApiResponse::accepted(json!({
        "message": "Reindexing started",
        "document_id": id,
        "removed_chunks": removed,
    })))
}

/// POST /api/admin/documents/{id}/embed
pub async fn embed_document(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid document ID")?;
    let document = state
        .documents
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".to_string()))?;

    if document.status != DocumentStatus::Completed.as_str() {
        return Err(ApiError::BadRequest(format!(
            "Document must be completed before embedding (status: {})",
            document.status
        )));
    }

    let result = state
        .rag
        .indexer()
        .embed(id, EMBED_BATCH_SIZE, EMBED_MAX_RETRIES)
        .await?;
    tracing::info!(document_id = id, "embedding run finished");
    Ok(ApiResponse::ok(result))
}

/// POST /api/admin/documents/retry-failed
pub async fn retry_failed(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<RetryFailedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = match non_blank(query.document_id) {
        Some(raw) => Some(parse_id(&raw, "Invalid document ID")?),
        None => None,
    };
    let result = state.rag.indexer().retry_failed(document_id).await?;
    Ok(ApiResponse::ok(result))
}
