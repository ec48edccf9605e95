//! Server configuration from environment variables.

use vaultmind_core::{defaults, Error, Result};

/// One configured vault: a name and a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultDir {
    pub name: String,
    pub root: String,
}

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres DSN. Required; the process aborts without it.
    pub database_url: String,
    /// Configured vaults.
    pub vaults: Vec<VaultDir>,
    /// HTTP port.
    pub port: u16,
}

impl AppConfig {
    /// Build configuration from the environment.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_URL` | — (required) | Postgres DSN |
    /// | `VAULT_DIRS` | — (required) | `name=path[,name=path]` |
    /// | `VAULTMIND_PORT` | `8080` | HTTP port |
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;

        let vault_dirs = std::env::var("VAULT_DIRS")
            .map_err(|_| Error::Config("VAULT_DIRS is not set".into()))?;
        let vaults = parse_vault_dirs(&vault_dirs)?;

        let port = std::env::var("VAULTMIND_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::SERVER_PORT);

        Ok(Self {
            database_url,
            vaults,
            port,
        })
    }
}

/// Parse `name=path[,name=path...]` into vault definitions.
pub fn parse_vault_dirs(value: &str) -> Result<Vec<VaultDir>> {
    let mut vaults = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, root) = entry.split_once('=').ok_or_else(|| {
            Error::Config(format!("invalid VAULT_DIRS entry (want name=path): {entry}"))
        })?;
        let name = name.trim();
        let root = root.trim();
        if name.is_empty() || root.is_empty() {
            return Err(Error::Config(format!(
                "invalid VAULT_DIRS entry (empty name or path): {entry}"
            )));
        }
        if vaults.iter().any(|v: &VaultDir| v.name == name) {
            return Err(Error::Config(format!("duplicate vault name: {name}")));
        }
        vaults.push(VaultDir {
            name: name.to_string(),
            root: root.to_string(),
        });
    }
    if vaults.is_empty() {
        return Err(Error::Config("VAULT_DIRS defines no vaults".into()));
    }
    Ok(vaults)
}
