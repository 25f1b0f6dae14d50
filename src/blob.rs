use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::entities::ContentKind;

/// path-addressed object storage. paths are namespaced by the owner's email.
#[async_trait]
pub trait BlobStore {
    /// returns the public url of the stored object.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
    async fn download_url(&self, path: &str) -> Result<String>;
}

pub fn media_path(email: &str, kind: ContentKind, name: &str) -> String {
    format!("{}/{}/{}", email, kind.as_str(), name)
}

pub fn profile_pic_path(email: &str) -> String { format!("{}/profilepic", email) }

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() || path.starts_with('/') {
        bail!("invalid blob path: {:?}", path);
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        bail!("invalid blob path: {:?}", path);
    }

    Ok(())
}

pub struct InMemoryBlobs(Mutex<HashMap<String, Vec<u8>>>);

impl InMemoryBlobs {
    pub fn new() -> Self { Self(Mutex::new(HashMap::new())) }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> { self.0.lock().await.get(path).cloned() }
}

impl Default for InMemoryBlobs {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl BlobStore for InMemoryBlobs {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        check_path(path)?;
        self.0.lock().await.insert(path.to_string(), bytes);

        Ok(format!("memory://{}", path))
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        check_path(path)?;
        match self.0.lock().await.contains_key(path) {
            true => Ok(format!("memory://{}", path)),
            false => bail!("cannot find blob: {}", path),
        }
    }
}

/// objects live as plain files under `root`.
pub struct FsBlobs {
    root: PathBuf,
}

impl FsBlobs {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    fn locate(&self, path: &str) -> Result<PathBuf> {
        check_path(path)?;
        Ok(self.root.join(path))
    }
}

fn file_url(p: &std::path::Path) -> String { format!("file://{}", p.display()) }

#[async_trait]
impl BlobStore for FsBlobs {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let target = self.locate(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }

        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("cannot write {}", target.display()))?;
        tracing::debug!("stored blob at {}", target.display());

        Ok(file_url(&target))
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        let target = self.locate(path)?;
        match tokio::fs::try_exists(&target).await? {
            true => Ok(file_url(&target)),
            false => bail!("cannot find blob: {}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_namespaced() {
        assert_eq!(
            media_path("me@x.com", ContentKind::Ebook, "book.pdf"),
            "me@x.com/ebook/book.pdf"
        );
        assert_eq!(profile_pic_path("me@x.com"), "me@x.com/profilepic");
    }

    #[tokio::test]
    async fn memory_round_trip() {
        let blobs = InMemoryBlobs::new();

        assert!(blobs.download_url("a@b/image/x.png").await.is_err());
        let url = blobs.upload("a@b/image/x.png", vec![1, 2]).await.unwrap();
        assert_eq!(url, "memory://a@b/image/x.png");
        assert_eq!(blobs.download_url("a@b/image/x.png").await.unwrap(), url);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let blobs = InMemoryBlobs::new();

        assert!(blobs.upload("../etc/passwd", vec![]).await.is_err());
        assert!(blobs.upload("/abs", vec![]).await.is_err());
        assert!(blobs.upload("a//b", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn fs_store_writes_files() {
        let root = std::env::temp_dir().join(format!("m-temple-blobs-{}", uuid::Uuid::new_v4()));
        let blobs = FsBlobs::new(&root);

        let url = blobs.upload("me@x.com/quote/q.txt", b"hi".to_vec()).await.unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(
            tokio::fs::read(root.join("me@x.com/quote/q.txt")).await.unwrap(),
            b"hi"
        );
        assert_eq!(blobs.download_url("me@x.com/quote/q.txt").await.unwrap(), url);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
