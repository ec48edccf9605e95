//! Deterministic identity for notes and chunks.
//!
//! Chunk ids are a cryptographic hash of the chunk's identifying fields so
//! identical content yields identical ids across processes and indexing
//! runs. This is the only mechanism that keeps re-indexed content aligned
//! with previously stored vectors.

use sha2::{Digest, Sha256};

/// Compute the deterministic id of a chunk.
///
/// The id is the hex SHA-256 of vault id (decimal), relative path (as
/// stored, case-preserving), heading path (as stored), and chunk text,
/// joined by NUL bytes. NUL cannot appear in any of the inputs, so the
/// encoding is injective.
pub fn chunk_id(vault_id: i64, rel_path: &str, heading_path: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(vault_id.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(rel_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(heading_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the content hash of raw note bytes, formatted `sha256:<hex>`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Derive the folder label from a relative path: all segments except the
/// filename, empty for root-level files.
pub fn folder_of(rel_path: &str) -> String {
    match rel_path.rfind('/') {
        Some(idx) => rel_path[..idx].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = chunk_id(1, "notes/tips.md", "# Go Tips", "- no built-in string sort");
        let b = chunk_id(1, "notes/tips.md", "# Go Tips", "- no built-in string sort");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_chunk_id_varies_with_each_field() {
        let base = chunk_id(1, "a.md", "# A", "text");
        assert_ne!(base, chunk_id(2, "a.md", "# A", "text"));
        assert_ne!(base, chunk_id(1, "b.md", "# A", "text"));
        assert_ne!(base, chunk_id(1, "a.md", "# B", "text"));
        assert_ne!(base, chunk_id(1, "a.md", "# A", "other"));
    }

    #[test]
    fn test_chunk_id_field_boundaries_are_unambiguous() {
        // Without a delimiter these two would collide.
        let a = chunk_id(1, "ab", "c", "d");
        let b = chunk_id(1, "a", "bc", "d");
        assert_ne!(a, b);
    }

    #[test]
    fn test_chunk_id_preserves_case() {
        assert_ne!(
            chunk_id(1, "Notes/Tips.md", "# A", "t"),
            chunk_id(1, "notes/tips.md", "# A", "t")
        );
    }

    #[test]
    fn test_content_hash_format() {
        let h = content_hash(b"hello");
        assert!(h.starts_with("sha256:"));
        assert_eq!(h.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_content_hash_detects_change() {
        assert_ne!(content_hash(b"hello"), content_hash(b"hello "));
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
    }

    #[test]
    fn test_folder_of_nested_path() {
        assert_eq!(folder_of("a/b/c.md"), "a/b");
    }

    #[test]
    fn test_folder_of_root_file() {
        assert_eq!(folder_of("root.md"), "");
    }

    #[test]
    fn test_folder_of_single_dir() {
        assert_eq!(folder_of("notes/tips.md"), "notes");
    }
}
