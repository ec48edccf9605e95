//! # vaultmind-db
//!
//! PostgreSQL storage layer for vaultmind.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for vaults, notes, and chunks
//! - A pgvector-backed implementation of the vector point store
//!
//! ## Example
//!
//! ```rust,ignore
//! use vaultmind_db::Database;
//! use vaultmind_core::VaultRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/vaultmind").await?;
//!     let vault = db.vaults.ensure("personal", "/home/me/notes").await?;
//!     println!("vault {} -> {}", vault.name, vault.root);
//!     Ok(())
//! }
//! ```

pub mod chunks;
pub mod notes;
pub mod points;
pub mod pool;
pub mod vaults;

pub use chunks::PgChunkRepository;
pub use notes::PgNoteRepository;
pub use points::PgVectorStore;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use vaults::PgVaultRepository;

use vaultmind_core::Result;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Vault repository.
    pub vaults: PgVaultRepository,
    /// Note repository.
    pub notes: PgNoteRepository,
    /// Chunk repository.
    pub chunks: PgChunkRepository,
    /// pgvector point store.
    pub points: PgVectorStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            vaults: PgVaultRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            chunks: PgChunkRepository::new(pool.clone()),
            points: PgVectorStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                vaultmind_core::Error::Database(sqlx::Error::Migrate(Box::new(e)))
            })?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("a%b"), "a\\%b");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_escape_like_escapes_backslash_first() {
        // "\%" must become "\\\%", not "\\%".
        assert_eq!(escape_like("\\%"), "\\\\\\%");
    }
}
