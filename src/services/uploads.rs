use crate::utils::validation::{sanitize_filename, validate_file_size};
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Flat directory of user-submitted files
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Stores `data` under the sanitized form of `original_name`, replacing
    /// any file of the same name. Oversized payloads are rejected before
    /// anything touches the filesystem.
    pub async fn save(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, UploadError> {
        if validate_file_size(data.len(), self.max_file_size).is_err() {
            return Err(UploadError::TooLarge {
                size: data.len(),
                limit: self.max_file_size,
            });
        }

        let name = sanitize_filename(original_name)
            .map_err(|_| UploadError::InvalidName(original_name.to_string()))?;

        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(&name), data).await?;

        tracing::info!("📦 Stored upload '{}' ({} bytes)", name, data.len());

        Ok(StoredFile {
            name,
            size: data.len() as u64,
        })
    }

    /// Whether the upload directory exists and is a directory
    pub async fn is_available(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .is_ok_and(|meta| meta.is_dir())
    }

    /// Names of the stored files, sorted
    pub async fn list(&self) -> Result<Vec<String>, UploadError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    /// Opens a stored file for download. Names that would not survive
    /// sanitization are treated as missing.
    pub async fn open(&self, name: &str) -> Result<(fs::File, u64), UploadError> {
        match sanitize_filename(name) {
            Ok(sanitized) if sanitized == name => {}
            _ => return Err(UploadError::NotFound(name.to_string())),
        }

        let path = self.root.join(name);
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(UploadError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(UploadError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let file = fs::File::open(&path).await?;
        Ok((file, metadata.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_save_list_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), 1024);

        assert!(store.list().await.unwrap().is_empty());

        let stored = store.save("notes.txt", b"hello").await.unwrap();
        assert_eq!(
            stored,
            StoredFile {
                name: "notes.txt".to_string(),
                size: 5
            }
        );
        store.save("b.bin", &[0u8; 10]).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["b.bin", "notes.txt"]);

        let (mut file, len) = store.open("notes.txt").await.unwrap();
        assert_eq!(len, 5);
        let mut contents = String::new();
        file.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "hello");
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        store.save("a.txt", b"first").await.unwrap();
        store.save("../a.txt", b"second").await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.txt"]);
        let on_disk = std::fs::read(dir.path().join("a.txt")).unwrap();
        assert_eq!(on_disk, b"second");
    }

    #[tokio::test]
    async fn test_availability_follows_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), 8);
        assert!(!store.is_available().await);

        store.save("a.txt", b"a").await.unwrap();
        assert!(store.is_available().await);
    }

    #[tokio::test]
    async fn test_oversized_file_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 8);

        let err = store.save("big.bin", &[1u8; 9]).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 9, limit: 8 }));
        assert!(store.list().await.unwrap().is_empty());

        // Exactly at the limit is fine
        store.save("ok.bin", &[1u8; 8]).await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_root() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("uploads");
        let store = UploadStore::new(&root, 1024);

        let stored = store.save("../../escape.txt", b"x").await.unwrap();
        assert_eq!(stored.name, "escape.txt");
        assert!(root.join("escape.txt").exists());
        assert!(!outer.path().join("escape.txt").exists());

        let stored = store.save("../uploads/nested/a.txt", b"y").await.unwrap();
        assert_eq!(stored.name, "uploads_nested_a.txt");
        assert!(root.join("uploads_nested_a.txt").is_file());
        assert!(!root.join("nested").exists());

        assert!(matches!(
            store.save("..", b"x").await.unwrap_err(),
            UploadError::InvalidName(_)
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_unsafe_and_missing_names() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"top secret").unwrap();
        let store = UploadStore::new(outer.path().join("uploads"), 1024);
        store.save("public.txt", b"hi").await.unwrap();
        std::fs::create_dir(outer.path().join("uploads").join("nested")).unwrap();

        for name in ["../secret.txt", "missing.txt", "nested", ""] {
            assert!(
                matches!(store.open(name).await, Err(UploadError::NotFound(_))),
                "{name} should not be served"
            );
        }
        assert_eq!(store.list().await.unwrap(), vec!["public.txt"]);
    }
}
