// SPDX-License-Identifier: CEPL-1.0
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReadFileError {
    #[error("failed to open {path}: {source}")]
    FileOpen { path: PathBuf, source: io::Error },

    #[error("failed to determine size of {path}: {source}")]
    FileSize { path: PathBuf, source: io::Error },

    #[error("failed to allocate {size} bytes for {path}")]
    Allocation { path: PathBuf, size: u64 },

    #[error("short read on {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: usize,
        actual: usize,
        /// Set when the read stopped on an I/O error rather than at EOF.
        source: Option<io::Error>,
    },
}

/// Reads a whole file into memory. The returned buffer's length is the exact
/// file size; nothing is appended.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, ReadFileError> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|source| ReadFileError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let size = file
        .metadata()
        .map_err(|source| ReadFileError::FileSize {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let alloc_err = || ReadFileError::Allocation {
        path: path.to_path_buf(),
        size,
    };
    let expected = usize::try_from(size).map_err(|_| alloc_err())?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(expected).map_err(|_| alloc_err())?;

    // read_to_end keeps whatever arrived before an error in `buf`
    let (actual, source) = match file.take(size).read_to_end(&mut buf) {
        Ok(n) => (n, None),
        Err(e) => (buf.len(), Some(e)),
    };
    if actual != expected || source.is_some() {
        return Err(ReadFileError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual,
            source,
        });
    }

    debug!("read {} bytes from {}", actual, path.display());
    Ok(buf)
}
