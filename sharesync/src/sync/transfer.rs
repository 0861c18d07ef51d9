use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes downloaded content to `target`, replacing any previous file.
///
/// Bytes land in a `.partial` sibling first, so `target` never holds a
/// truncated download.
pub async fn write_content(target: &Path, data: &[u8]) -> Result<(), TransferError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| TransferError::io(parent, err))?;
    }
    let partial = partial_path(target);
    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(|err| TransferError::io(&partial, err))?;
    file.write_all(data)
        .await
        .map_err(|err| TransferError::io(&partial, err))?;
    file.flush()
        .await
        .map_err(|err| TransferError::io(&partial, err))?;
    file.sync_all()
        .await
        .map_err(|err| TransferError::io(&partial, err))?;
    drop(file);

    if let Err(err) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(TransferError::io(target, err));
    }
    Ok(())
}

/// Removes a file or directory tree. A missing path counts as removed.
///
/// Returns whether anything was deleted.
pub async fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

pub async fn file_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
