//! # vaultmind-core
//!
//! Core types, traits, and abstractions for the vaultmind library.
//!
//! This crate provides the foundational data structures, the error
//! taxonomy, deterministic identity, and the capability trait definitions
//! that other vaultmind crates depend on.

pub mod defaults;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod testing;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use identity::{chunk_id, content_hash, folder_of};
pub use models::*;
pub use traits::*;
