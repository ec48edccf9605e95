//! Chunk repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vaultmind_core::{ChunkRepository, Error, Result, StoredChunk};

/// PostgreSQL implementation of [`ChunkRepository`].
pub struct PgChunkRepository {
    pool: Pool<Postgres>,
}

impl PgChunkRepository {
    /// Create a new PgChunkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_chunk(row: sqlx::postgres::PgRow) -> StoredChunk {
    StoredChunk {
        id: row.get("id"),
        note_id: row.get("note_id"),
        chunk_index: row.get("chunk_index"),
        heading_path: row.get("heading_path"),
        text: row.get("body"),
    }
}

#[async_trait]
impl ChunkRepository for PgChunkRepository {
    async fn insert_all(&self, chunks: &[StoredChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunk (id, note_id, chunk_index, heading_path, body)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET
                    note_id = EXCLUDED.note_id,
                    chunk_index = EXCLUDED.chunk_index
                "#,
            )
            .bind(&chunk.id)
            .bind(chunk.note_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.heading_path)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_by_note(&self, note_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM chunk WHERE note_id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_ids_by_note(&self, note_id: Uuid) -> Result<Vec<String>> {
        let rows =
            sqlx::query("SELECT id FROM chunk WHERE note_id = $1 ORDER BY chunk_index")
                .bind(note_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<StoredChunk>> {
        let row = sqlx::query(
            "SELECT id, note_id, chunk_index, heading_path, body FROM chunk WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_chunk))
    }
}
