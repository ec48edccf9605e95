//! Shared application state handed to every handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use vaultmind_index::Indexer;
use vaultmind_query::QueryEngine;

/// Wired components shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub indexer: Indexer,
    /// Cancelled on shutdown; threaded into every ask and indexing run.
    pub shutdown: CancellationToken,
}
