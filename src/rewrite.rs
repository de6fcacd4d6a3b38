//! Line-range rewriting.
//!
//! Fixes are computed against the original line numbers, then applied in
//! descending start-line order to a copy of the original text, so no edit
//! shifts the lines of another. The file is written once, through a
//! uniquely named temp file in the same directory and a rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Replace lines `start_line..=end_line` (1-indexed) with `replacement`.
///
/// An empty replacement deletes the lines. A non-empty replacement carries
/// its own line terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start_line: usize,
    pub end_line: usize,
    pub replacement: String,
}

impl Edit {
    pub fn delete(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            replacement: String::new(),
        }
    }

    pub fn replace(start_line: usize, end_line: usize, replacement: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            replacement: replacement.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("edit at lines {start}-{end} overlaps edit at lines {other_start}-{other_end}")]
    Overlap {
        start: usize,
        end: usize,
        other_start: usize,
        other_end: usize,
    },

    #[error("edit at lines {start}-{end} is outside the file ({lines} lines)")]
    OutOfRange {
        start: usize,
        end: usize,
        lines: usize,
    },

    #[error("{} changed on disk since it was read", .0.display())]
    Modified(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RewriteError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        RewriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Apply `edits` to `text`, all expressed against the original lines.
pub fn apply_edits(text: &str, edits: &[Edit]) -> Result<String, RewriteError> {
    let mut lines: Vec<&str> = text.split_inclusive('\n').collect();

    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.start_line.cmp(&a.start_line));

    for edit in &ordered {
        if edit.start_line == 0 || edit.end_line < edit.start_line || edit.end_line > lines.len() {
            return Err(RewriteError::OutOfRange {
                start: edit.start_line,
                end: edit.end_line,
                lines: lines.len(),
            });
        }
    }
    for pair in ordered.windows(2) {
        let (later, earlier) = (pair[0], pair[1]);
        if earlier.end_line >= later.start_line {
            return Err(RewriteError::Overlap {
                start: earlier.start_line,
                end: earlier.end_line,
                other_start: later.start_line,
                other_end: later.end_line,
            });
        }
    }

    for edit in ordered {
        lines.splice(
            edit.start_line - 1..edit.end_line,
            std::iter::once(edit.replacement.as_str()),
        );
    }
    Ok(lines.concat())
}

/// Write `contents` to `path` through a sibling temp file and a rename.
///
/// The temp file is removed if anything fails before the rename.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), RewriteError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RewriteError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| RewriteError::io(tmp.path(), e))?;

    if let Ok(meta) = fs::metadata(path) {
        if let Err(e) = fs::set_permissions(tmp.path(), meta.permissions()) {
            tracing::debug!("keeping default permissions on {}: {}", path.display(), e);
        }
    }

    tmp.persist(path)
        .map_err(|e| RewriteError::io(path, e.error))?;
    Ok(())
}

/// Rewrite one file. Fails without touching it when the on-disk text no
/// longer matches `original`.
///
/// Returns the number of edits applied.
pub fn rewrite_file(path: &Path, original: &str, edits: &[Edit]) -> Result<usize, RewriteError> {
    if edits.is_empty() {
        return Ok(0);
    }
    let current = fs::read_to_string(path).map_err(|e| RewriteError::io(path, e))?;
    if current != original {
        return Err(RewriteError::Modified(path.to_path_buf()));
    }
    let updated = apply_edits(original, edits)?;
    write_atomic(path, &updated)?;
    Ok(edits.len())
}
