//! In-memory file store.

use crate::errors::AdminError;
use crate::resources::FileStoreAdmin;
use async_trait::async_trait;
use dashmap::DashMap;

/// Files keyed by absolute path, each holding lines of text.
///
/// Directories are implicit: a directory exists while some file lives
/// under it.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    files: DashMap<String, Vec<String>>,
}

impl InMemoryFileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line to a file, creating it if needed.
    pub fn append(&self, path: &str, line: impl Into<String>) {
        self.files
            .entry(path.to_string())
            .or_default()
            .push(line.into());
    }

    /// Moves a file into another directory, keeping its file name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    pub fn move_file(&self, path: &str, to_dir: &str) -> Result<String, AdminError> {
        let (_, lines) = self.files.remove(path).ok_or(AdminError::NotFound)?;
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let target = join(to_dir, file_name);
        self.files.insert(target.clone(), lines);
        Ok(target)
    }

    /// Returns the sorted paths of every file under a directory.
    #[must_use]
    pub fn list(&self, dir: &str) -> Vec<String> {
        let prefix = dir_prefix(dir);
        let mut paths: Vec<String> = self
            .files
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths
    }

    /// Returns the lines of a file.
    #[must_use]
    pub fn read(&self, path: &str) -> Option<Vec<String>> {
        self.files.get(path).map(|lines| lines.value().clone())
    }

    /// Returns true if any file lives under the directory.
    #[must_use]
    pub fn dir_exists(&self, dir: &str) -> bool {
        !self.list(dir).is_empty()
    }
}

/// Joins a directory and a file name with exactly one separator.
#[must_use]
pub fn join(dir: &str, file_name: &str) -> String {
    format!("{}{file_name}", dir_prefix(dir))
}

fn dir_prefix(dir: &str) -> String {
    if dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{dir}/")
    }
}

#[async_trait]
impl FileStoreAdmin for InMemoryFileStore {
    async fn delete_directories(&self, paths: &[String]) -> Result<(), AdminError> {
        let prefixes: Vec<String> = paths.iter().map(|p| dir_prefix(p)).collect();
        self.files
            .retain(|path, _| !prefixes.iter().any(|prefix| path.starts_with(prefix)));
        Ok(())
    }
}
