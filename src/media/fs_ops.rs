//! File-system capability consumed by the media storage manager.
//!
//! Kept behind a trait so tests can inject failing implementations; the
//! manager's fallback chains (copy then move, move then copy) are
//! exercised without touching platform-specific failure modes.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileInfo {
    pub exists: bool,
    pub is_directory: bool,
}

pub trait FileOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Rename only; cross-device fallback is the caller's concern.
    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file. With `idempotent`, a missing file is success.
    fn delete(&self, path: &Path, idempotent: bool) -> io::Result<()>;

    fn get_info(&self, path: &Path) -> FileInfo;

    fn make_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// `std::fs`-backed implementation used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOps;

impl FileOps for LocalFileOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn delete(&self, path: &Path, idempotent: bool) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if idempotent && err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn get_info(&self, path: &Path) -> FileInfo {
        match fs::metadata(path) {
            Ok(meta) => FileInfo {
                exists: true,
                is_directory: meta.is_dir(),
            },
            Err(_) => FileInfo::default(),
        }
    }

    fn make_dir_all(&self, path: &Path) -> io::Result<()> {
        // create_dir_all treats "already exists" as success, which also
        // covers two saves racing to create the tree.
        fs::create_dir_all(path)
    }
}
