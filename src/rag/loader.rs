use std::path::{Path, PathBuf};

use super::types::Document;
use crate::core::errors::ApiError;

/// Reads every `*.txt` file directly inside a directory (no recursion),
/// sorted by file name so index builds are reproducible.
///
/// A document's source is its path, relative to `source_root` when one is
/// set and the file lies beneath it.
pub struct DocumentLoader {
    dir: PathBuf,
    source_root: Option<PathBuf>,
}

impl DocumentLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            source_root: None,
        }
    }

    pub fn relative_to(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<Vec<Document>, ApiError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            ApiError::internal(format!(
                "Failed to read document directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_text_file(path))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                ApiError::internal(format!("Failed to read {}: {}", path.display(), e))
            })?;
            tracing::debug!("Loaded document {} ({} bytes)", path.display(), content.len());
            documents.push(Document {
                source: self.source_name(&path),
                content,
            });
        }

        Ok(documents)
    }

    fn source_name(&self, path: &Path) -> String {
        let relative = self
            .source_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        relative.to_string_lossy().into_owned()
    }
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}
