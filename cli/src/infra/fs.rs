//! Filesystem infrastructure: implements `ArtifactStore` with `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures_util::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::application::ports::{ArtifactStore, ByteStream};

const READ_CHUNK: usize = 64 * 1024;

/// Snapshot directories under a configurable root (system temp dir by default).
#[derive(Debug, Clone, Default)]
pub struct LocalArtifactStore {
    root: Option<PathBuf>,
}

impl LocalArtifactStore {
    #[must_use]
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl ArtifactStore for LocalArtifactStore {
    async fn create_snapshot_dir(&self, application: &str) -> Result<PathBuf> {
        let root = self.root.clone().unwrap_or_else(std::env::temp_dir);
        let prefix = format!("migra-snap-{application}-");
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&root)
                .with_context(|| format!("creating {}", root.display()))?;
            let dir = tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir_in(&root)
                .with_context(|| format!("creating snapshot directory in {}", root.display()))?;
            Ok::<PathBuf, anyhow::Error>(dir.keep())
        })
        .await
        .context("spawn_blocking for create_snapshot_dir")?
    }

    async fn write_artifact(&self, path: &Path, mut data: ByteStream) -> Result<u64> {
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("creating {}", path.display()))?;
        let mut written: u64 = 0;
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("flushing {}", path.display()))?;
        Ok(written)
    }

    async fn open_artifact(&self, path: &Path) -> Result<(u64, ByteStream)> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        let size = file
            .metadata()
            .await
            .with_context(|| format!("reading size of {}", path.display()))?
            .len();
        let chunks = ReaderStream::with_capacity(file, READ_CHUNK).map_err(anyhow::Error::from);
        Ok((size, chunks.boxed()))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        ignore_missing(tokio::fs::remove_file(path).await)
            .with_context(|| format!("removing {}", path.display()))
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        ignore_missing(tokio::fs::remove_dir_all(path).await)
            .with_context(|| format!("removing {}", path.display()))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}
