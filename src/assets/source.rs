use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

/// Byte-level access to frame artwork files
///
/// Implementations return `Ok(None)` when the file does not exist so that
/// callers can treat optional assets (masks) as absent rather than failed.
pub trait AssetSource: Send + Sync {
    /// Fetch the raw bytes of a file by its name relative to the asset root
    fn fetch(&self, file_name: &str) -> impl Future<Output = std::io::Result<Option<Vec<u8>>>> + Send;

    /// Human readable location of a file, used in error messages
    fn describe(&self, file_name: &str) -> String;
}

/// Assets stored in a local directory
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssets {
    fn fetch(&self, file_name: &str) -> impl Future<Output = std::io::Result<Option<Vec<u8>>>> + Send {
        let path = self.root.join(file_name);
        async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    debug!("Read {} bytes from {}", bytes.len(), path.display());
                    Ok(Some(bytes))
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        }
    }

    fn describe(&self, file_name: &str) -> String {
        self.root.join(file_name).display().to_string()
    }
}

/// In-memory assets, keyed by file name
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(file_name.into(), bytes);
    }

    pub fn with_file(mut self, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(file_name, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn fetch(&self, file_name: &str) -> impl Future<Output = std::io::Result<Option<Vec<u8>>>> + Send {
        let found = self.files.get(file_name).cloned();
        async move { Ok(found) }
    }

    fn describe(&self, file_name: &str) -> String {
        format!("memory:{}", file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_directory_missing_file_is_none() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("present.png"), b"abc").unwrap();

        let assets = DirectoryAssets::new(dir.path());
        assert_eq!(assets.fetch("present.png").await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(assets.fetch("absent.png").await.unwrap(), None);
        assert!(assets.describe("absent.png").ends_with("absent.png"));
    }

    #[tokio::test]
    async fn test_memory_assets() {
        let assets = MemoryAssets::new().with_file("a.png", vec![1, 2, 3]);
        assert_eq!(assets.fetch("a.png").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(assets.fetch("b.png").await.unwrap(), None);
    }
}
