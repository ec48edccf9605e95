//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vaultmind_core::{Error, Note, NoteRecord, NoteRepository, Result};

/// PostgreSQL implementation of [`NoteRepository`].
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_note(row: sqlx::postgres::PgRow) -> Note {
    Note {
        id: row.get("id"),
        vault_id: row.get("vault_id"),
        rel_path: row.get("rel_path"),
        folder: row.get("folder"),
        title: row.get("title"),
        content_hash: row.get("content_hash"),
        updated_at: row.get("updated_at_utc"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn get_by_vault_and_path(
        &self,
        vault_id: i64,
        rel_path: &str,
    ) -> Result<Option<Note>> {
        let row = sqlx::query(
            r#"
            SELECT id, vault_id, rel_path, folder, title, content_hash, updated_at_utc
            FROM note
            WHERE vault_id = $1 AND rel_path = $2
            "#,
        )
        .bind(vault_id)
        .bind(rel_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_note))
    }

    async fn upsert(&self, record: NoteRecord) -> Result<Uuid> {
        // The conflict arm leaves `id` untouched, which is what keeps note
        // ids stable across re-indexes.
        let row = sqlx::query(
            r#"
            INSERT INTO note (id, vault_id, rel_path, folder, title, content_hash, updated_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (vault_id, rel_path) DO UPDATE SET
                folder = EXCLUDED.folder,
                title = EXCLUDED.title,
                content_hash = EXCLUDED.content_hash,
                updated_at_utc = EXCLUDED.updated_at_utc
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(record.vault_id)
        .bind(&record.rel_path)
        .bind(&record.folder)
        .bind(&record.title)
        .bind(&record.content_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM note")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_unique_folders(&self, vault_ids: &[i64]) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT folder FROM note
            WHERE folder <> ''
              AND (cardinality($1::bigint[]) = 0 OR vault_id = ANY($1))
            ORDER BY folder
            "#,
        )
        .bind(vault_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("folder")).collect())
    }
}
