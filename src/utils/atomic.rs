//! Atomic file operations
//!
//! The flat-file visit log is rewritten as a whole on every append, so a
//! crash mid-write must never leave a truncated document behind.
//!
//! # Pattern
//!
//! 1. Write to a temporary file (.tmp) next to the target
//! 2. Call sync_all() to flush to disk
//! 3. Rename temp file to final path (atomic on POSIX filesystems)
//!
//! Readers of the final path therefore see either the previous document or
//! the new one, never a partial state.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

/// Result type for atomic operations
pub type AtomicResult<T> = Result<T, AtomicError>;

/// Errors that can occur during atomic operations
#[derive(Debug, Error)]
pub enum AtomicError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("path has no file name: {0}")]
    InvalidPath(String),
}

/// Atomically replace `path` with `content`
///
/// The temp file lives in the same directory as `path` so the final rename
/// never crosses a filesystem boundary.
///
/// ```ignore
/// atomic_write("data/visits.json", "{\"totalViews\":0}")?;
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> AtomicResult<()> {
    let path = path.as_ref();
    if path.file_name().is_none() {
        return Err(AtomicError::InvalidPath(path.display().to_string()));
    }
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    if let Err(e) = file.write_all(content.as_bytes()).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Remove leftover `.tmp` files from interrupted writes
///
/// Only regular files are removed. Returns the number of files deleted.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> AtomicResult<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_temp = path.extension().map(|e| e == "tmp").unwrap_or(false);
        if is_temp && entry.file_type()?.is_file() {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
