//! Knowledge-base documents and the chunk rows the indexer produces for them.

use crate::error::Result;
use crate::schema::{Document, DocumentStatus, DocumentWithCounts, NewDocument};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tutor_common::Page;

const DOCUMENT_COLUMNS: &str = "id, filename, file_path, file_size, mime_type, status, \
                                error_message, uploaded_by, created_at, updated_at";

const WITH_COUNTS: &str = r#"
    SELECT d.id, d.filename, d.file_path, d.file_size, d.mime_type, d.status,
           d.error_message, d.uploaded_by, d.created_at, d.updated_at,
           COUNT(c.id)                                    AS chunk_count,
           COUNT(c.id) FILTER (WHERE c.status = 'embedded') AS embedded_count,
           COUNT(c.id) FILTER (WHERE c.status = 'pending')  AS pending_count,
           COUNT(c.id) FILTER (WHERE c.status = 'failed')   AS failed_count
    FROM documents d
    LEFT JOIN chunks c ON c.document_id = d.id
"#;

#[derive(Clone, Debug)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn create(&self, doc: &NewDocument) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "INSERT INTO documents (filename, file_path, file_size, mime_type, status, uploaded_by)
             VALUES ($1, $2, $3, $4, 'pending', $5)
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(&doc.filename)
        .bind(&doc.file_path)
        .bind(doc.file_size)
        .bind(&doc.mime_type)
        .bind(doc.uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(
            document_id = document.id,
            filename = %document.filename,
            "document registered"
        );
        Ok(document)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    pub async fn find_with_counts(&self, id: i64) -> Result<Option<DocumentWithCounts>> {
        let mut qb = QueryBuilder::<Postgres>::new(WITH_COUNTS);
        qb.push(" WHERE d.id = ").push_bind(id).push(" GROUP BY d.id");
        let document = qb.build_query_as::<DocumentWithCounts>().fetch_optional(&self.pool).await?;
        Ok(document)
    }

    /// Paginated listing, newest first, optionally narrowed to one status.
    pub async fn list(
        &self,
        status: Option<DocumentStatus>,
        page: Page,
    ) -> Result<(Vec<DocumentWithCounts>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents d");
        if let Some(status) = status {
            count.push(" WHERE d.status = ").push_bind(status.as_str());
        }
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(WITH_COUNTS);
        if let Some(status) = status {
            select.push(" WHERE d.status = ").push_bind(status.as_str());
        }
        select
            .push(" GROUP BY d.id ORDER BY d.created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let documents = select
            .build_query_as::<DocumentWithCounts>()
            .fetch_all(&self.pool)
            .await?;

        Ok((documents, total))
    }

    /// Record a status transition. `error` is cleared unless the document failed.
    pub async fn set_status(
        &self,
        id: i64,
        status: DocumentStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let error = match status {
            DocumentStatus::Failed => error,
            _ => None,
        };
        let updated = sqlx::query(
            "UPDATE documents SET status = $2, error_message = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await?
        .rows_affected();
        tracing::debug!(document_id = id, status = status.as_str(), "document status updated");
        Ok(updated > 0)
    }

    /// Remove all chunks so the document can be indexed from scratch.
    pub async fn delete_chunks(&self, id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM chunks WHERE document_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted)
    }

    /// Delete a document (chunks cascade) and hand back the removed row so the
    /// caller can clean up the stored file.
    pub async fn delete(&self, id: i64) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "DELETE FROM documents WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }
}
