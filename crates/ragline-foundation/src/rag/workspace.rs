//! On-disk workspace: uploaded documents and the full-corpus reset

use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::ChunkStore;
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub struct Workspace {
    data_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl Workspace {
    /// Use `data_dir` as the workspace root, creating it and `uploads/`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> RagResult<Self> {
        let data_dir = data_dir.into();
        let uploads_dir = data_dir.join("uploads");
        tokio::fs::create_dir_all(&uploads_dir).await?;
        Ok(Self {
            data_dir,
            uploads_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Path of an uploaded document. `name` must be a bare file name.
    pub fn upload_path(&self, name: &str) -> RagResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) if file == name => {
                Ok(self.uploads_dir.join(file))
            }
            _ => Err(RagError::InvalidInput(format!(
                "'{name}' is not a plain file name"
            ))),
        }
    }

    /// Write an uploaded document, replacing any file of the same name.
    pub async fn store_upload(&self, name: &str, bytes: &[u8]) -> RagResult<PathBuf> {
        let path = self.upload_path(name)?;
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(&path, bytes).await?;
        info!(file = name, bytes = bytes.len(), "upload stored");
        Ok(path)
    }

    /// Discard every chunk and every uploaded document.
    pub async fn reset(&self, store: &dyn ChunkStore) -> RagResult<()> {
        store.reset().await?;
        match tokio::fs::remove_dir_all(&self.uploads_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        info!(data_dir = %self.data_dir.display(), "workspace reset");
        Ok(())
    }
}
