use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

/// Location of a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file name '{0}' is not allowed")]
    InvalidName(String),
    #[error("unable to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("unable to remove {path}: {source}")]
    Remove {
        path: String,
        source: std::io::Error,
    },
}

/// Destination for generated document files.
pub trait DocumentStore: Send + Sync + Debug {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError>;
    fn remove(&self, file: &StoredFile) -> Result<(), StoreError>;
}

/// Writes artifacts into a directory that is served publicly under `public_url`.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
    public_url: String,
}

impl FileSystemStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\')
        && !name.starts_with('.')
}

impl DocumentStore for FileSystemStore {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
        if !is_plain_file_name(file_name) {
            return Err(StoreError::InvalidName(file_name.to_string()));
        }

        let path = self.root.join(file_name);
        let display = path.display().to_string();
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.display().to_string(),
            source,
        })?;
        fs::write(&path, bytes).map_err(|source| StoreError::Write {
            path: display.clone(),
            source,
        })?;

        Ok(StoredFile {
            path: display,
            url: format!("{}/{}", self.public_url, file_name),
        })
    }

    fn remove(&self, file: &StoredFile) -> Result<(), StoreError> {
        match fs::remove_file(&file.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                path: file.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_under_root_and_builds_public_url() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileSystemStore::new(dir.path().join("documents"), "/documents/");

        let stored = store
            .store("app-000001-consent.html", b"<p>consent</p>")
            .expect("stored");

        assert_eq!(stored.url, "/documents/app-000001-consent.html");
        let written = fs::read(&stored.path).expect("file exists");
        assert_eq!(written, b"<p>consent</p>");

        store.remove(&stored).expect("removed");
        assert!(!std::path::Path::new(&stored.path).exists());
        store.remove(&stored).expect("removing twice is fine");
    }

    #[test]
    fn refuses_path_traversal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileSystemStore::new(dir.path(), "/documents");

        for name in ["../escape.pdf", "nested/file.pdf", ".hidden", ""] {
            assert!(matches!(
                store.store(name, b"x"),
                Err(StoreError::InvalidName(_))
            ));
        }
    }
}
