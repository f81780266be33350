//! In-memory mock filesystem for testing without real `/proc` and `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use std::collections::{HashMap, HashSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::{ACTIONS_FILE, EFFECTIVE_AFFINITY_FILE};
use crate::fs::{DirEntry, FileSystem};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various interrupt configurations without needing actual Linux access.
/// Paths follow the default layout below `/`.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, Vec<u8>>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds an IRQ with its `/sys/kernel/irq/N/actions` and
    /// `/proc/irq/N/effective_affinity_list` files, verbatim (so include the
    /// trailing newline).
    pub fn add_irq(&mut self, irq: u32, actions: &str, effective_affinity: &str) {
        self.add_file(
            format!("/sys/kernel/irq/{}/{}", irq, ACTIONS_FILE),
            actions,
        );
        self.add_file(
            format!("/proc/irq/{}/{}", irq, EFFECTIVE_AFFINITY_FILE),
            effective_affinity,
        );
    }

    /// Sets `/proc/interrupts`.
    pub fn set_interrupts(&mut self, table: &str) {
        self.add_file("/proc/interrupts", table);
    }

    fn file(&self, path: &Path) -> io::Result<&[u8]> {
        self.files.get(path).map(Vec::as_slice).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}

impl FileSystem for MockFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let content = self.file(path)?.to_vec();
        Ok(Box::new(io::Cursor::new(content)))
    }

    fn read_into(&self, path: &Path, buf: &mut Vec<u8>) -> io::Result<usize> {
        let content = self.file(path)?;
        buf.clear();
        buf.extend_from_slice(content);
        Ok(content.len())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let child_name = |p: &PathBuf| -> Option<String> {
            if p.parent() != Some(path) || p == path {
                return None;
            }
            p.file_name().and_then(|n| n.to_str()).map(str::to_owned)
        };

        let mut entries: Vec<DirEntry> = self
            .files
            .keys()
            .filter_map(|p| child_name(p).map(|name| DirEntry::new(name, false)))
            .chain(
                self.directories
                    .iter()
                    .filter_map(|p| child_name(p).map(|name| DirEntry::new(name, true))),
            )
            .collect();
        // Real directories come in no particular order either, but keep test
        // failures reproducible.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/interrupts", "  CPU0\n");

        let mut buf = Vec::new();
        assert_eq!(
            fs.read_into(Path::new("/proc/interrupts"), &mut buf).unwrap(),
            7
        );
        assert_eq!(buf, b"  CPU0\n");
        assert!(fs.read_dir(Path::new("/proc")).is_ok());
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_irq(1, "timer\n", "0\n");
        fs.add_irq(9, "acpi\n", "0\n");
        fs.add_file("/sys/kernel/irq/README", "hello\n");

        let entries = fs.read_dir(Path::new("/sys/kernel/irq")).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry::new("1", true),
                DirEntry::new("9", true),
                DirEntry::new("README", false),
            ]
        );

        let irq1 = fs.read_dir(Path::new("/sys/kernel/irq/1")).unwrap();
        assert_eq!(irq1, vec![DirEntry::new("actions", false)]);
    }

    #[test]
    fn test_mock_fs_missing() {
        let fs = MockFs::new();
        assert_eq!(
            fs.read_dir(Path::new("/sys/kernel/irq")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert!(fs.open(Path::new("/proc/interrupts")).is_err());
    }

    #[test]
    fn test_mock_fs_open() {
        let mut fs = MockFs::new();
        fs.set_interrupts(" CPU0\n 0: 1\n");
        let mut content = String::new();
        fs.open(Path::new("/proc/interrupts"))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, " CPU0\n 0: 1\n");
    }
}
