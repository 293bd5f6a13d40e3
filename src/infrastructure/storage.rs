use crate::domain::document::{Document, StoredDocument};
use crate::domain::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

fn storage_err(msg: impl Into<String>) -> AppError {
    AppError::StorageError(msg.into())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| storage_err(format!("Failed to create dir {}: {e}", path.display())))?;
    }
    Ok(())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Writes through a temp file and renames it into place.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            storage_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.write_all(bytes).map_err(|e| {
            storage_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.sync_all().ok();
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        storage_err(format!("Failed to move {} into place: {e}", path.display()))
    })
}

/// Content-addressed store for uploaded requirement documents.
///
/// Files land under `<data_dir>/documents/<sha256>.<ext>`; a second upload of
/// the same bytes resolves to the existing file without rewriting it.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join("documents");
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn persist(&self, document: &Document) -> Result<StoredDocument> {
        let digest = sha256_hex(&document.bytes);
        let extension = document
            .kind()
            .map(|kind| kind.extension())
            .unwrap_or("bin");
        let path = self.root.join(format!("{}.{}", digest, extension));

        if path.exists() {
            debug!(digest = %digest, "Document already persisted");
        } else {
            atomic_write_bytes(&path, &document.bytes)?;
            info!(
                digest = %digest,
                bytes = document.len(),
                path = %path.display(),
                "Persisted uploaded document"
            );
        }

        Ok(StoredDocument {
            digest,
            location: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("casewise-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_persist_is_content_addressed() {
        let dir = temp_dir();
        let store = DocumentStore::new(&dir).unwrap();
        let document = Document::new(b"Req 1: log in".to_vec(), "text/plain");

        let first = store.persist(&document).unwrap();
        let second = store.persist(&document).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.digest, sha256_hex(b"Req 1: log in"));
        assert!(first.location.ends_with(".txt"));
        assert_eq!(fs::read(&first.location).unwrap(), b"Req 1: log in");

        let entries = fs::read_dir(store.root()).unwrap().count();
        assert_eq!(entries, 1);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_distinct_uploads_get_distinct_files() {
        let dir = temp_dir();
        let store = DocumentStore::new(&dir).unwrap();

        let a = store
            .persist(&Document::new(b"A".to_vec(), "text/markdown"))
            .unwrap();
        let b = store
            .persist(&Document::new(b"B".to_vec(), "text/markdown"))
            .unwrap();

        assert_ne!(a.location, b.location);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
