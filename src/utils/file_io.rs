use std::fs::Permissions;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing::error;

use crate::CommitError;

pub fn create_parent_dir_if_not_exist(path: &Path) -> Result<(), CommitError> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(parent_dir) {
                error!("Failed to create directory {:?}: {:?}", parent_dir, e);
                return Err(CommitError::io(parent_dir, e));
            }
        }
    }
    Ok(())
}

/// Unique hidden path next to `target`, e.g. `dir/.app.conf.orig-V1StGXR8`.
///
/// Staying in the target's directory keeps renames on one file system.
pub fn sibling_path(
    target: &Path,
    label: &str,
) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unique = format!(".{file_name}.{label}-{}", nanoid::nanoid!(8));
    match target.parent() {
        Some(parent) => parent.join(unique),
        None => PathBuf::from(unique),
    }
}

/// Writes `content` to `path` with the given mode and flushes it to disk.
pub async fn write_file(
    path: &Path,
    content: &[u8],
    mode: u32,
) -> Result<(), CommitError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| CommitError::io(path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| CommitError::io(path, e))?;
    file.set_permissions(Permissions::from_mode(mode))
        .await
        .map_err(|e| CommitError::io(path, e))?;
    file.sync_all().await.map_err(|e| CommitError::io(path, e))?;
    debug!("wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

pub async fn rename(
    from: &Path,
    to: &Path,
) -> Result<(), CommitError> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| CommitError::io(from, e))
}

/// Removes a file; a file that is already gone is not an error
pub async fn delete_file(path: &Path) -> Result<(), CommitError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CommitError::io(path, e)),
    }
}

pub async fn file_exists(path: &Path) -> Result<bool, CommitError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| CommitError::io(path, e))
}
