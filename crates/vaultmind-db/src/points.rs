//! Vector point store backed by pgvector.
//!
//! Points live in a dedicated table with one metadata column per payload
//! field and deliberately no foreign key to `chunk`: alignment between the
//! two is the indexing pipeline's responsibility. Search is cosine
//! similarity via the `<=>` operator with exact-match filtering on the
//! vault id and path-aware prefix filtering on the folder label.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use vaultmind_core::defaults::POINT_COLLECTION;
use vaultmind_core::{
    Error, Point, PointFilter, PointPayload, Result, ScoredPoint, Vector, VectorStore,
};

use crate::escape_like;

/// PostgreSQL/pgvector implementation of [`VectorStore`].
pub struct PgVectorStore {
    pool: Pool<Postgres>,
}

impl PgVectorStore {
    /// Create a new PgVectorStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Read the vector width of the existing point table, if present.
    async fn stored_dimension(&self) -> Result<Option<usize>> {
        let row = sqlx::query(
            r#"
            SELECT a.atttypmod AS dim
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            WHERE c.relname = $1 AND a.attname = 'embedding'
            "#,
        )
        .bind(POINT_COLLECTION)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| r.get::<i32, _>("dim") as usize))
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn ensure_collection(&self, dim: usize) -> Result<()> {
        if let Some(existing) = self.stored_dimension().await? {
            if existing != dim {
                return Err(Error::VectorStore(format!(
                    "point collection exists with dimension {existing}, configured {dim}"
                )));
            }
            return Ok(());
        }

        // Table and index names are compile-time constants; only the
        // numeric width is interpolated.
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {POINT_COLLECTION} (
                id            TEXT PRIMARY KEY,
                embedding     vector({dim}) NOT NULL,
                vault_id      BIGINT NOT NULL,
                vault_name    TEXT NOT NULL,
                note_id       UUID NOT NULL,
                rel_path      TEXT NOT NULL,
                folder        TEXT NOT NULL,
                heading_path  TEXT NOT NULL,
                chunk_index   INTEGER NOT NULL,
                note_title    TEXT NOT NULL
            )
            "#
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{POINT_COLLECTION}_scope \
             ON {POINT_COLLECTION} (vault_id, folder)"
        );
        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.stored_dimension().await?.is_some())
    }

    async fn upsert(&self, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let sql = format!(
            r#"
            INSERT INTO {POINT_COLLECTION}
                (id, embedding, vault_id, vault_name, note_id, rel_path,
                 folder, heading_path, chunk_index, note_title)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                embedding = EXCLUDED.embedding,
                vault_id = EXCLUDED.vault_id,
                vault_name = EXCLUDED.vault_name,
                note_id = EXCLUDED.note_id,
                rel_path = EXCLUDED.rel_path,
                folder = EXCLUDED.folder,
                heading_path = EXCLUDED.heading_path,
                chunk_index = EXCLUDED.chunk_index,
                note_title = EXCLUDED.note_title
            "#
        );

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for point in &points {
            sqlx::query(&sql)
                .bind(&point.id)
                .bind(&point.vector)
                .bind(point.payload.vault_id)
                .bind(&point.payload.vault_name)
                .bind(point.payload.note_id)
                .bind(&point.payload.rel_path)
                .bind(&point.payload.folder)
                .bind(&point.payload.heading_path)
                .bind(point.payload.chunk_index)
                .bind(&point.payload.note_title)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &Vector,
        limit: usize,
        filter: &PointFilter,
    ) -> Result<Vec<ScoredPoint>> {
        // An empty folder prefix is no restriction at all.
        let prefix = filter.folder_prefix.as_deref().filter(|p| !p.is_empty());
        let like_pattern = prefix.map(|p| format!("{}/%", escape_like(p)));

        let sql = format!(
            r#"
            SELECT id, vault_id, vault_name, note_id, rel_path, folder,
                   heading_path, chunk_index, note_title,
                   1 - (embedding <=> $1) AS score
            FROM {POINT_COLLECTION}
            WHERE ($2::BIGINT IS NULL OR vault_id = $2)
              AND ($3::TEXT IS NULL OR folder = $3 OR folder LIKE $4 ESCAPE '\')
            ORDER BY embedding <=> $1, id
            LIMIT $5
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(vector)
            .bind(filter.vault_id)
            .bind(prefix)
            .bind(like_pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| ScoredPoint {
                id: row.get("id"),
                score: row.get::<f64, _>("score") as f32,
                payload: PointPayload {
                    vault_id: row.get("vault_id"),
                    vault_name: row.get("vault_name"),
                    note_id: row.get("note_id"),
                    rel_path: row.get("rel_path"),
                    folder: row.get("folder"),
                    heading_path: row.get("heading_path"),
                    chunk_index: row.get("chunk_index"),
                    note_title: row.get("note_title"),
                },
            })
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!("DELETE FROM {POINT_COLLECTION} WHERE id = ANY($1)");
        sqlx::query(&sql)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let sql = format!("DELETE FROM {POINT_COLLECTION}");
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
