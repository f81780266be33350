//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets the IRQ readers work against the real
//! `/proc` and `/sys` pseudo filesystems on Linux as well as against
//! in-memory or on-disk synthetic trees in tests.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A single directory entry, as needed for walking `/sys/kernel/irq/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name of the entry (not the full path).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Abstraction for filesystem operations.
///
/// Implementations are shared between the detail worker threads and thus
/// must be `Send + Sync`.
pub trait FileSystem: Send + Sync {
    /// Opens a file for streaming reads.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Reads the whole file into `buf`, replacing its previous contents but
    /// keeping its allocation.
    ///
    /// # Returns
    /// The number of bytes read, or an I/O error if the file cannot be read.
    fn read_into(&self, path: &Path, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Lists the entries of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// Initial capacity of a read buffer; comfortably larger than any
/// `actions` or `*_list` pseudo file.
pub const SCRATCH_CAPACITY: usize = 512;

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn read_into(&self, path: &Path, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        if buf.capacity() < SCRATCH_CAPACITY {
            buf.reserve(SCRATCH_CAPACITY);
        }
        // Pseudo files report a size of 0 (procfs) or 4096 (sysfs), so
        // std::fs::read's size hint is useless here; just read to EOF.
        File::open(path)?.read_to_end(buf)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntry { name, is_dir });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fs_read_into_reuses_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let long = dir.path().join("long");
        let short = dir.path().join("short");
        std::fs::write(&long, "0-3,8-11\n").unwrap();
        std::fs::write(&short, "1\n").unwrap();

        let fs = RealFs::new();
        let mut buf = Vec::new();
        assert_eq!(fs.read_into(&long, &mut buf).unwrap(), 9);
        assert_eq!(buf, b"0-3,8-11\n");
        let cap = buf.capacity();

        assert_eq!(fs.read_into(&short, &mut buf).unwrap(), 2);
        assert_eq!(buf, b"1\n");
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn test_real_fs_read_into_missing() {
        let fs = RealFs::new();
        let mut buf = Vec::new();
        let err = fs
            .read_into(Path::new("/nonexistent/path/12345"), &mut buf)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_real_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("42")).unwrap();
        std::fs::write(dir.path().join("file"), "x").unwrap();

        let fs = RealFs::new();
        let mut entries = fs.read_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![DirEntry::new("42", true), DirEntry::new("file", false)]
        );
    }

    #[test]
    fn test_real_fs_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interrupts");
        std::fs::write(&path, " CPU0\n").unwrap();

        let mut content = String::new();
        RealFs::new()
            .open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, " CPU0\n");
    }
}
