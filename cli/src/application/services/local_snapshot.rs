//! Application service: snapshots kept on the local filesystem.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::ArtifactStore;
use crate::domain::{MANIFEST_FILE, Snapshot};

/// A snapshot is available when every item records an artifact path and
/// every artifact exists.
pub async fn available(snapshot: &Snapshot, store: &impl ArtifactStore) -> bool {
    if !snapshot.has_all_paths() {
        return false;
    }
    for path in snapshot.items.iter().filter_map(|item| item.artifact()) {
        if !store.exists(path).await {
            tracing::debug!(path = %path.display(), "artifact missing");
            return false;
        }
    }
    true
}

/// Delete the local artifacts, manifest and directory of a snapshot and
/// forget the artifact paths. A removed snapshot is never available again.
///
/// # Errors
///
/// Returns the first deletion failure. Files that are already gone are not
/// an error.
pub async fn remove_local(snapshot: &mut Snapshot, store: &impl ArtifactStore) -> Result<()> {
    for item in &snapshot.items {
        if let Some(path) = item.artifact() {
            store
                .remove_file(path)
                .await
                .with_context(|| format!("cannot remove artifact {}", path.display()))?;
        }
    }
    snapshot.clear_paths();
    store
        .remove_file(&snapshot.manifest_path())
        .await
        .context("cannot remove snapshot manifest")?;
    store
        .remove_dir(&snapshot.directory)
        .await
        .with_context(|| format!("cannot remove {}", snapshot.directory.display()))?;
    tracing::info!(directory = %snapshot.directory.display(), "local snapshot removed");
    Ok(())
}

/// Write the snapshot manifest into the snapshot directory.
///
/// # Errors
///
/// Returns an error if the manifest cannot be serialized or written.
pub async fn save_manifest(snapshot: &Snapshot, store: &impl ArtifactStore) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).context("cannot serialize snapshot")?;
    let path = snapshot.manifest_path();
    store
        .write_file(&path, &json)
        .await
        .with_context(|| format!("cannot write {}", path.display()))
}

/// Load the snapshot saved in `directory`.
///
/// The recorded directory is replaced with `directory`, so a snapshot copied
/// elsewhere stays usable as long as its artifacts were copied along.
///
/// # Errors
///
/// Returns an error if the manifest is missing, malformed or records the
/// same artifact twice.
pub async fn load_snapshot(store: &impl ArtifactStore, directory: &Path) -> Result<Snapshot> {
    let path = directory.join(MANIFEST_FILE);
    let json = store
        .read_to_string(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut snapshot: Snapshot =
        serde_json::from_str(&json).with_context(|| format!("cannot parse {}", path.display()))?;

    if snapshot.directory != directory {
        for item in &mut snapshot.items {
            let file = item
                .artifact()
                .and_then(Path::file_name)
                .map(ToOwned::to_owned);
            if let Some(file) = file {
                item.local_path = Some(directory.join(file));
            }
        }
        snapshot.directory = directory.to_path_buf();
    }
    snapshot.check_distinct_paths()?;
    Ok(snapshot)
}
