//! Host directory references

use super::error::EngineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A directory on the host, optionally with subdirectories left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    root: PathBuf,
    excludes: Vec<String>,
}

impl Directory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Returns a copy without `path` (relative to the root) and its contents
    pub fn without_directory(&self, path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .trim_start_matches("./")
            .trim_end_matches('/')
            .to_string();

        let mut next = self.clone();
        if !normalized.is_empty() && !next.excludes.contains(&normalized) {
            next.excludes.push(normalized);
        }
        next
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.excludes
            .iter()
            .any(|exclude| relative.starts_with(exclude))
    }

    fn walk(&self) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry.path()))
    }

    fn relative<'a>(&self, entry: &'a DirEntry) -> Option<&'a Path> {
        entry
            .path()
            .strip_prefix(&self.root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
    }

    /// Relative paths of all files that survive the excludes, sorted
    pub fn entries(&self) -> Result<Vec<PathBuf>, EngineError> {
        let mut files = Vec::new();
        for entry in self.walk() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(relative) = self.relative(&entry) {
                files.push(relative.to_path_buf());
            }
        }
        Ok(files)
    }

    /// Tar archive of the directory, ready to be uploaded into a container
    pub fn tarball(&self) -> Result<Vec<u8>, EngineError> {
        let mut builder = tar::Builder::new(Vec::new());
        builder.follow_symlinks(false);

        for entry in self.walk() {
            let entry = entry?;
            if let Some(relative) = self.relative(&entry) {
                builder.append_path_with_name(entry.path(), relative)?;
            }
        }

        Ok(builder.into_inner()?)
    }

    /// sha256 over relative paths and file contents
    pub fn digest(&self) -> Result<String, EngineError> {
        let mut hasher = Sha256::new();
        for relative in self.entries()? {
            let path = self.root.join(&relative);
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            if path.is_file() {
                hasher.update(std::fs::read(&path)?);
            }
            hasher.update([0u8]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}
