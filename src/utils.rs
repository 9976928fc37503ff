//! File system and logging helpers.
//!
//! - Atomic whole-file replacement for the feed and state artifacts
//! - Writability probes for output directories
//! - String truncation for log fields

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// with an ellipsis and the number of omitted bytes appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Directory that will hold `path`; `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path).await?;
    let _ = fs::remove_file(&probe_path).await;
    debug!("Output directory is writable");
    Ok(())
}

/// Replace the file at `path` with `contents` in one step.
///
/// The bytes are written and synced to a sibling temporary file which is then
/// renamed over `path`, so readers see either the old or the new file, never a
/// partial one. The parent directory is synced after the rename, so once this
/// returns the replacement survives a power loss. On failure the temporary
/// file is removed and `path` is left as it was.
///
/// # Arguments
///
/// * `path` - The file to replace; its directory must already exist
/// * `contents` - The complete new contents
///
/// # Errors
///
/// Returns an error if:
/// - `path` has no file name
/// - The temporary file cannot be created, written or synced
/// - The rename fails (for example when `path` is a directory)
/// - The parent directory cannot be synced
#[instrument(level = "debug", skip_all, fields(path = %path.display(), bytes = contents.len()))]
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let dir = parent_dir(path);
    let tmp_path = dir.join(tmp_name);

    let result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    sync_dir(&dir).await
}

/// Flush directory entries (creations, renames) in `dir` to disk.
#[cfg(unix)]
pub async fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

/// No-op where a directory cannot be opened as a file.
#[cfg(not(unix))]
pub async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
