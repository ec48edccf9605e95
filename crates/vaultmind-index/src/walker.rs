//! Vault directory traversal.
//!
//! Walks a vault's root directory and yields its Markdown files with
//! forward-slash relative paths and derived folder labels. Hidden
//! directories and files (dot-prefixed) are skipped.

use std::path::Path;

use walkdir::WalkDir;

use vaultmind_core::{folder_of, Error, Result};

/// A Markdown file discovered inside a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    /// Path relative to the vault root, forward-slash separated.
    pub rel_path: String,
    /// Directory portion of `rel_path`; empty for root-level files.
    pub folder: String,
}

/// Walk a vault root and return its Markdown files, sorted by relative
/// path for deterministic traversal order.
pub fn walk_vault(root: &Path) -> Result<Vec<NoteFile>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "vault root is not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    // depth 0 is the root itself, which may legitimately be dot-named.
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name().to_str()));

    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_markdown(entry.file_name().to_str()) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Internal(format!("walk produced out-of-root path: {e}")))?;
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(NoteFile {
            folder: folder_of(&rel_path),
            rel_path,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn is_hidden(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

fn is_markdown(name: Option<&str>) -> bool {
    name.is_some_and(|n| {
        Path::new(n)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_walk_yields_markdown_with_folders() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "root.md", "# Root");
        write(dir.path(), "a/b/deep.md", "# Deep");
        write(dir.path(), "a/ignored.txt", "not markdown");

        let files = walk_vault(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                NoteFile {
                    rel_path: "a/b/deep.md".into(),
                    folder: "a/b".into()
                },
                NoteFile {
                    rel_path: "root.md".into(),
                    folder: "".into()
                },
            ]
        );
    }

    #[test]
    fn test_walk_skips_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".obsidian/config.md", "# hidden");
        write(dir.path(), ".hidden.md", "# hidden file");
        write(dir.path(), "visible.md", "# ok");

        let files = walk_vault(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "visible.md");
    }

    #[test]
    fn test_walk_accepts_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "NOTE.MD", "# caps");

        let files = walk_vault(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_walk_missing_root_is_config_error() {
        let err = walk_vault(Path::new("/nonexistent/vault/root")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_walk_order_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.md", "a.md", "b.md"] {
            write(dir.path(), name, "# x");
        }
        let files = walk_vault(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
    }
}
