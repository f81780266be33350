//! Single-threaded detail collection, in directory listing order.

use std::sync::Arc;
use std::vec;

use super::{DetailRecord, read_details};
use crate::config::IrqPaths;
use crate::fs::{DirEntry, FileSystem, SCRATCH_CAPACITY};
use crate::observer::{Diagnostic, SharedObserver};

/// Reads the IRQ details one directory after the other on the calling
/// thread, reusing a single read buffer. Same records as [`super::Details`],
/// but in listing order and without any threads.
pub struct SequentialDetails<F> {
    fs: Arc<F>,
    paths: IrqPaths,
    observer: SharedObserver,
    /// `None` until the first pull lists the directory.
    entries: Option<vec::IntoIter<DirEntry>>,
    scratch: Vec<u8>,
}

impl<F: FileSystem> SequentialDetails<F> {
    pub fn new(fs: Arc<F>, paths: IrqPaths, observer: SharedObserver) -> Self {
        Self {
            fs,
            paths,
            observer,
            entries: None,
            scratch: Vec::new(),
        }
    }

    fn list(&self) -> vec::IntoIter<DirEntry> {
        let dir = self.paths.irq_dir();
        match self.fs.read_dir(&dir) {
            Ok(entries) => entries.into_iter(),
            Err(e) => {
                self.observer.observe(&Diagnostic::SourceUnavailable {
                    path: dir,
                    kind: e.kind(),
                });
                Vec::new().into_iter()
            }
        }
    }
}

impl<F: FileSystem> Iterator for SequentialDetails<F> {
    type Item = DetailRecord;

    fn next(&mut self) -> Option<DetailRecord> {
        if self.entries.is_none() {
            self.entries = Some(self.list());
            self.scratch.reserve(SCRATCH_CAPACITY);
        }
        let entries = self.entries.as_mut()?;
        for entry in entries.by_ref().filter(|entry| entry.is_dir) {
            match read_details(&*self.fs, &self.paths, &entry.name, &mut self.scratch) {
                Ok(record) => return Some(record),
                Err(reason) => self.observer.observe(&Diagnostic::DetailSkipped {
                    name: entry.name,
                    reason,
                }),
            }
        }
        None
    }
}
