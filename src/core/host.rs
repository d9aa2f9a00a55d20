//! Host file system abstraction.
//!
//! The engine never touches the file system directly: everything goes
//! through a [`Host`], so editors can serve unsaved buffers and tests can
//! run against in-memory documents. `resolve` is pure (no IO) - it only
//! computes what URI a `$ref` points at.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use glob::Pattern;
use walkdir::WalkDir;

use crate::core::loader::hash_text;

/// The contents of one host read.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub text: String,
    /// Modification time in milliseconds since the epoch.
    pub mtime: u64,
    /// SHA-1 of `text`, hex encoded.
    pub hash: String,
}

impl FileContent {
    pub fn new(text: String, mtime: u64) -> Self {
        let hash = hash_text(&text);
        Self { text, mtime, hash }
    }
}

pub trait Host: Sync {
    /// Read a document. Errors here are genuine IO failures; the engine
    /// absorbs them for dependent documents and falls back to fragment
    /// mode for the primary one.
    fn read(&self, uri: &str) -> Result<FileContent>;

    fn exists(&self, uri: &str) -> bool;

    /// All URIs matching any of the glob patterns.
    fn glob(&self, patterns: &[&str]) -> Vec<String>;

    /// Resolve a `$ref` string against the referencing document's URI.
    /// Pure: no IO, no existence checks.
    fn resolve(&self, from_uri: &str, reference: &str) -> String {
        resolve_reference(from_uri, reference)
    }
}

/// Default pure `$ref` resolution: URLs pass through, absolute paths are
/// kept, relative paths resolve against the referencing document's
/// directory with `.` / `..` normalization.
pub fn resolve_reference(from_uri: &str, reference: &str) -> String {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }
    if reference.starts_with('/') {
        return normalize_path(Path::new(reference));
    }
    let base = Path::new(from_uri).parent().unwrap_or(Path::new(""));
    normalize_path(&base.join(reference))
}

fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::Prefix(prefix) => parts.push(prefix.as_os_str().to_string_lossy().to_string()),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

// ============================================================
// File system host
// ============================================================

/// A host backed by the real file system, rooted at a directory. URIs are
/// paths relative to the root (absolute paths pass through).
pub struct FsHost {
    root: PathBuf,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Host for FsHost {
    fn read(&self, uri: &str) -> Result<FileContent> {
        let path = self.full_path(uri);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {:?}", path))?;
        let mtime = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(FileContent::new(text, mtime))
    }

    fn exists(&self, uri: &str) -> bool {
        self.full_path(uri).is_file()
    }

    fn glob(&self, patterns: &[&str]) -> Vec<String> {
        let compiled: Vec<Pattern> = patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        let mut uris = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let uri = relative.to_string_lossy().replace('\\', "/");
            if compiled.iter().any(|p| p.matches(&uri)) {
                uris.push(uri);
            }
        }
        uris.sort();
        uris
    }
}

// ============================================================
// In-memory host
// ============================================================

/// A host serving a fixed set of in-memory documents. Useful for tests
/// and for embedding where buffers come from an editor.
#[derive(Default)]
pub struct MemoryHost {
    files: HashMap<String, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(uri.into(), text.into());
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, text: impl Into<String>) {
        self.files.insert(uri.into(), text.into());
    }

    pub fn remove(&mut self, uri: &str) {
        self.files.remove(uri);
    }
}

impl Host for MemoryHost {
    fn read(&self, uri: &str) -> Result<FileContent> {
        let text = self
            .files
            .get(uri)
            .with_context(|| format!("No such document: {}", uri))?;
        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(FileContent::new(text.clone(), mtime))
    }

    fn exists(&self, uri: &str) -> bool {
        self.files.contains_key(uri)
    }

    fn glob(&self, patterns: &[&str]) -> Vec<String> {
        let compiled: Vec<Pattern> = patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        let mut uris: Vec<String> = self
            .files
            .keys()
            .filter(|uri| compiled.iter().any(|p| p.matches(uri)))
            .cloned()
            .collect();
        uris.sort();
        uris
    }
}

#[cfg(test)]
mod tests {
    use crate::core::host::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_reference("api.yaml", "./schemas/Pet.yaml"),
            "schemas/Pet.yaml"
        );
        assert_eq!(
            resolve_reference("specs/api.yaml", "Pet.yaml"),
            "specs/Pet.yaml"
        );
        assert_eq!(
            resolve_reference("specs/api.yaml", "../common/Error.yaml"),
            "common/Error.yaml"
        );
    }

    #[test]
    fn test_resolve_absolute_and_urls() {
        assert_eq!(
            resolve_reference("api.yaml", "/shared/Pet.yaml"),
            "/shared/Pet.yaml"
        );
        assert_eq!(
            resolve_reference("api.yaml", "https://example.com/Pet.yaml"),
            "https://example.com/Pet.yaml"
        );
    }

    #[test]
    fn test_resolve_is_pure() {
        // Resolution never checks existence.
        assert_eq!(
            resolve_reference("a/b/c.yaml", "./missing/thing.yaml"),
            "a/b/missing/thing.yaml"
        );
    }

    #[test]
    fn test_memory_host() {
        let host = MemoryHost::new()
            .with_file("api.yaml", "openapi: 3.0.3\n")
            .with_file("schemas/Pet.yaml", "type: object\n");

        assert!(host.exists("api.yaml"));
        assert!(!host.exists("missing.yaml"));
        let content = host.read("api.yaml").unwrap();
        assert_eq!(content.text, "openapi: 3.0.3\n");
        assert!(!content.hash.is_empty());

        let uris = host.glob(&["**/*.yaml"]);
        assert_eq!(uris, vec!["api.yaml", "schemas/Pet.yaml"]);
    }

    #[test]
    fn test_fs_host() {
        use std::fs;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("schemas")).unwrap();
        fs::write(dir.path().join("api.yaml"), "openapi: 3.0.3\n").unwrap();
        fs::write(dir.path().join("schemas/Pet.json"), "{}").unwrap();

        let host = FsHost::new(dir.path());
        assert!(host.exists("api.yaml"));
        assert!(host.exists("schemas/Pet.json"));
        assert!(!host.exists("nope.yaml"));

        let uris = host.glob(&["**/*.yaml", "**/*.json"]);
        assert_eq!(uris, vec!["api.yaml", "schemas/Pet.json"]);

        let content = host.read("api.yaml").unwrap();
        assert_eq!(content.text, "openapi: 3.0.3\n");
    }
}
