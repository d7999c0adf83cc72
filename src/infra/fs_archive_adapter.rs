use crate::app::ports::ArchiveSinkPort;
use crate::domain::{ArchiveKey, ClassifiedEvent};
use crate::error::SinkFault;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Archive store on the local filesystem, one file per key under `root`.
///
/// Writes go to a temp file that is renamed over the target, so a blob is
/// either fully replaced or left untouched.
pub struct FsArchiveStore {
    root: PathBuf,
}

impl FsArchiveStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ArchiveKey) -> Result<PathBuf, SinkFault> {
        let relative = Path::new(key.as_str());
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative.is_absolute() || !only_normal {
            return Err(SinkFault::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Read back a stored blob, `None` if nothing was written at `key`.
    pub async fn get(&self, key: &ArchiveKey) -> Result<Option<String>, SinkFault> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArchiveSinkPort for FsArchiveStore {
    async fn put(&self, key: &ArchiveKey, event: &ClassifiedEvent) -> Result<(), SinkFault> {
        let path = self.path_for(key)?;
        let body = event.to_json()?;

        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, body.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }
}
