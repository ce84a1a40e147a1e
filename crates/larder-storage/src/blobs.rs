// SPDX-FileCopyrightText: 2026 Larder Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem implementation of the [`BlobStore`] trait.
//!
//! Blob names are relative, slash-separated paths resolved under a root
//! directory. Names that are absolute or contain `..` are refused so a blob
//! can never land outside the root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use larder_config::model::MediaConfig;
use larder_core::{BlobStore, HealthStatus, LarderError};
use tracing::debug;

/// Stores blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(&config.root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a blob name to its file path, refusing anything that could escape
    /// the root.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, LarderError> {
        let relative = Path::new(name);
        let mut path = self.root.clone();
        let mut segments = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    segments += 1;
                }
                Component::CurDir => {}
                _ => {
                    return Err(LarderError::Blob {
                        message: format!("refusing blob name outside media root: {name}"),
                        source: None,
                    });
                }
            }
        }
        if segments == 0 {
            return Err(LarderError::Blob {
                message: "empty blob name".to_string(),
                source: None,
            });
        }
        Ok(path)
    }
}

fn blob_err(message: String, err: std::io::Error) -> LarderError {
    LarderError::Blob {
        message,
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn health_check(&self) -> Result<HealthStatus, LarderError> {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            return Ok(HealthStatus::Unhealthy(format!(
                "cannot create {}: {e}",
                self.root.display()
            )));
        }
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.permissions().readonly() => Ok(HealthStatus::Degraded(format!(
                "{} is read-only",
                self.root.display()
            ))),
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "cannot stat {}: {e}",
                self.root.display()
            ))),
        }
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, LarderError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| blob_err(format!("cannot create directory for {name}"), e))?;
        }

        // Write beside the target and rename so readers never see a torn file.
        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| blob_err(format!("cannot write {name}"), e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(blob_err(format!("cannot move {name} into place"), e));
        }

        debug!(name = %name, bytes = bytes.len(), "blob saved");
        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> Result<(), LarderError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name = %name, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(blob_err(format!("cannot delete {name}"), e)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, LarderError> {
        let path = self.path_for(name)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| blob_err(format!("cannot check {name}"), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_names() {
        let store = FsBlobStore::new("/srv/media");
        for name in ["/etc/passwd", "../x.jpg", "foods/../../x.jpg", "", "."] {
            assert!(store.path_for(name).is_err(), "{name:?} should be refused");
        }
    }

    #[test]
    fn resolves_nested_names_under_root() {
        let store = FsBlobStore::new("/srv/media");
        assert_eq!(
            store.path_for("foods/123/sig_large.jpg").unwrap(),
            PathBuf::from("/srv/media/foods/123/sig_large.jpg")
        );
        assert_eq!(
            store.path_for("./foods/a.jpg").unwrap(),
            PathBuf::from("/srv/media/foods/a.jpg")
        );
    }

    #[tokio::test]
    async fn save_exists_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let name = store
            .save("foods/123/front_large.jpg", b"\xff\xd8jpeg")
            .await
            .unwrap();
        assert_eq!(name, "foods/123/front_large.jpg");
        assert!(store.exists(&name).await.unwrap());
        let on_disk = std::fs::read(dir.path().join("foods/123/front_large.jpg")).unwrap();
        assert_eq!(on_disk, b"\xff\xd8jpeg");

        store.delete(&name).await.unwrap();
        assert!(!store.exists(&name).await.unwrap());
        // Deleting again is fine.
        store.delete(&name).await.unwrap();
    }

    #[tokio::test]
    async fn save_overwrites_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        store.save("foods/1/a_large.jpg", b"one").await.unwrap();
        store.save("foods/1/a_large.jpg", b"two").await.unwrap();
        let on_disk = std::fs::read(dir.path().join("foods/1/a_large.jpg")).unwrap();
        assert_eq!(on_disk, b"two");
    }

    #[tokio::test]
    async fn health_check_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("media"));
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(dir.path().join("media").is_dir());
    }
}
