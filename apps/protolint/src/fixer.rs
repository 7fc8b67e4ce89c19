//! Line-buffer persistence for fix mode.
//!
//! A file is rewritten as a whole: the lines are joined with the configured
//! newline, staged in a temporary file next to the target, given the
//! target's permission bits, and renamed over it. A failed write leaves the
//! original untouched.
//!
//! Nothing here takes a lock. Callers must not fix the same path from two
//! rule instances at once.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Read `path` and split it on `newline`.
///
/// A trailing newline produces a final empty element, so joining the result
/// with the same newline reproduces the file byte for byte.
pub fn read_lines(path: &Path, newline: &str) -> Result<Vec<String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read lines: {}", path.display()))?;
    Ok(text.split(newline).map(str::to_string).collect())
}

/// Replace the contents of the existing file at `path` with `lines` joined by
/// `newline`, keeping its permission bits.
pub fn write_lines_to_existing_file(path: &Path, lines: &[String], newline: &str) -> Result<()> {
    let permissions = fs::metadata(path)
        .with_context(|| format!("stat: {}", path.display()))?
        .permissions();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in: {}", dir.display()))?;
    staged
        .write_all(lines.join(newline).as_bytes())
        .with_context(|| format!("write temp: {}", staged.path().display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("sync temp: {}", staged.path().display()))?;
    fs::set_permissions(staged.path(), permissions)
        .with_context(|| format!("set permissions: {}", staged.path().display()))?;
    staged
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace: {}", path.display()))?;
    Ok(())
}

/// Persistence seam for rules that rewrite files.
pub trait LineWriter: Send + Sync {
    fn write_lines(&self, path: &Path, lines: &[String], newline: &str) -> Result<()>;
}

/// Writes straight to the filesystem via [`write_lines_to_existing_file`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLineWriter;

impl LineWriter for FsLineWriter {
    fn write_lines(&self, path: &Path, lines: &[String], newline: &str) -> Result<()> {
        write_lines_to_existing_file(path, lines, newline)
    }
}
