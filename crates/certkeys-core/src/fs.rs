//! Crash-safe file helpers.
//!
//! Writers stage content in a temporary file next to the target and rename
//! it into place, so readers observe either the previous file or the new one.
//! Concurrent writers are not coordinated: the last rename wins.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CertError, Result};

/// Mode for directories holding identities and secrets.
pub const PRIVATE_DIR_MODE: u32 = 0o740;

/// Mode for private keys and combined PEM files.
pub const SECRET_FILE_MODE: u32 = 0o600;

/// Mode for certificates and configuration files.
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Mode for downloaded tool binaries.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Atomically write `contents` to `path`, replacing any existing file.
pub async fn write_atomic(path: &Path, contents: impl Into<Vec<u8>>, mode: u32) -> Result<()> {
    persist(path.to_path_buf(), contents.into(), mode, true).await
}

/// Atomically write `contents` to `path`, failing if it already exists.
pub async fn write_new(path: &Path, contents: impl Into<Vec<u8>>, mode: u32) -> Result<()> {
    persist(path.to_path_buf(), contents.into(), mode, false).await
}

/// Read a whole text file, or `None` if it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CertError::io(path, e)),
    }
}

/// Read a whole text file that must exist.
pub async fn read_required(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CertError::io(path, e))
}

/// Remove a file if present. Returns whether something was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CertError::io(path, e)),
    }
}

/// True if `path` exists and is a regular file (symlinks are followed).
pub async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// True if anything exists at `path`.
pub async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| CertError::io(path, e))
}

/// Recursively create `path` with [`PRIVATE_DIR_MODE`].
pub async fn create_private_dir(path: &Path) -> Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(PRIVATE_DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|e| CertError::io(path, e))
}

/// `path` made absolute against the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| CertError::io(path, e))
}

async fn persist(path: PathBuf, contents: Vec<u8>, mode: u32, replace: bool) -> Result<()> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || persist_blocking(&path, &contents, mode, replace))
        .await
        .map_err(|e| CertError::Io {
            path: display,
            source: io::Error::other(e),
        })?
}

fn persist_blocking(path: &Path, contents: &[u8], mode: u32, replace: bool) -> Result<()> {
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|e| CertError::io(parent, e))?;
    staged
        .write_all(contents)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| CertError::io(staged.path(), e))?;
    set_mode(staged.as_file(), mode).map_err(|e| CertError::io(staged.path(), e))?;

    let persisted = if replace {
        staged.persist(path)
    } else {
        staged.persist_noclobber(path)
    };
    persisted.map_err(|e| CertError::io(path, e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: u32) -> io::Result<()> {
    Ok(())
}
