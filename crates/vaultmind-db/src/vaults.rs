//! Vault repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use vaultmind_core::{Error, Result, Vault, VaultRepository};

/// PostgreSQL implementation of [`VaultRepository`].
pub struct PgVaultRepository {
    pool: Pool<Postgres>,
}

impl PgVaultRepository {
    /// Create a new PgVaultRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_vault(row: sqlx::postgres::PgRow) -> Vault {
    Vault {
        id: row.get("id"),
        name: row.get("name"),
        root: row.get("root"),
    }
}

#[async_trait]
impl VaultRepository for PgVaultRepository {
    async fn ensure(&self, name: &str, root: &str) -> Result<Vault> {
        let row = sqlx::query(
            r#"
            INSERT INTO vault (name, root)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET root = EXCLUDED.root
            RETURNING id, name, root
            "#,
        )
        .bind(name)
        .bind(root)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(map_vault(row))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Vault>> {
        let row = sqlx::query("SELECT id, name, root FROM vault WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(map_vault))
    }

    async fn list(&self) -> Result<Vec<Vault>> {
        let rows = sqlx::query("SELECT id, name, root FROM vault ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_vault).collect())
    }
}
