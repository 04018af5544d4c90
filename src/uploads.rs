use std::path::{Component, Path, PathBuf};

use crate::error::{CaixaError, Result};

/// Object storage holding uploaded spreadsheets.
pub trait FileStore {
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Uploads kept as plain files under one directory.
pub struct DirFileStore {
    root: PathBuf,
}

impl DirFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rel = Path::new(path);
        let inside = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || !inside {
            return None;
        }
        Some(self.root.join(rel))
    }
}

impl FileStore for DirFileStore {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self
            .resolve(path)
            .ok_or_else(|| CaixaError::UploadNotFound(path.to_string()))?;
        std::fs::read(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CaixaError::UploadNotFound(path.to_string()),
            _ => CaixaError::Io(e),
        })
    }
}
