use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};

/// Writes `contents` to `path` so that the destination either holds the
/// complete text or is left as it was.
///
/// The text goes to a temporary file in the destination directory first and
/// is then renamed over `path`. A failed write removes the temporary file.
///
/// # Errors
///
/// Returns [`Error::Write`] if the temporary file cannot be created, written,
/// or moved into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let write_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;

    info!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

/// Reads the whole input file as UTF-8 text.
///
/// # Errors
///
/// Returns [`Error::Read`] if the file is missing or unreadable.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}
