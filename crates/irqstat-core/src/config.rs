//! Locations of the IRQ pseudo files and tuning knobs for detail collection.

use std::path::{Path, PathBuf};

/// Per-IRQ file under `sys/kernel/irq/N/` listing the registered actions.
pub const ACTIONS_FILE: &str = "actions";

/// Per-IRQ file under `proc/irq/N/` listing the effective CPU affinity.
pub const EFFECTIVE_AFFINITY_FILE: &str = "effective_affinity_list";

/// Where to find the interrupt pseudo files.
///
/// All locations are relative to `root`, which is `/` on a live system and
/// the top of a synthetic tree in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqPaths {
    pub root: PathBuf,
    pub proc_interrupts: PathBuf,
    pub sys_kernel_irq: PathBuf,
    pub proc_irq: PathBuf,
}

impl Default for IrqPaths {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl IrqPaths {
    /// Standard layout below the given root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            proc_interrupts: PathBuf::from("proc/interrupts"),
            sys_kernel_irq: PathBuf::from("sys/kernel/irq"),
            proc_irq: PathBuf::from("proc/irq"),
        }
    }

    /// Full path of the interrupt counter table.
    pub fn interrupts(&self) -> PathBuf {
        self.root.join(&self.proc_interrupts)
    }

    /// Full path of the directory holding one subdirectory per IRQ.
    pub fn irq_dir(&self) -> PathBuf {
        self.root.join(&self.sys_kernel_irq)
    }

    /// Full path of the actions file for the IRQ directory `name`.
    pub fn actions(&self, name: &str) -> PathBuf {
        self.root
            .join(&self.sys_kernel_irq)
            .join(name)
            .join(ACTIONS_FILE)
    }

    /// Full path of the effective affinity file for the IRQ directory `name`.
    pub fn effective_affinity(&self, name: &str) -> PathBuf {
        self.root
            .join(&self.proc_irq)
            .join(name)
            .join(EFFECTIVE_AFFINITY_FILE)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Default number of detail worker threads.
pub const DEFAULT_WORKERS: usize = 16;

/// Default capacity of the job and result queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Tuning for concurrent detail collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailOptions {
    workers: usize,
    queue_capacity: usize,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DetailOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads. Zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the capacity of both the job and the result queue. Zero is
    /// treated as one.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn capacity(&self) -> usize {
        self.queue_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = IrqPaths::default();
        assert_eq!(paths.interrupts(), PathBuf::from("/proc/interrupts"));
        assert_eq!(paths.irq_dir(), PathBuf::from("/sys/kernel/irq"));
        assert_eq!(
            paths.actions("42"),
            PathBuf::from("/sys/kernel/irq/42/actions")
        );
        assert_eq!(
            paths.effective_affinity("42"),
            PathBuf::from("/proc/irq/42/effective_affinity_list")
        );
    }

    #[test]
    fn test_synthetic_root() {
        let paths = IrqPaths::with_root("/tmp/snapshot");
        assert_eq!(
            paths.actions("7"),
            PathBuf::from("/tmp/snapshot/sys/kernel/irq/7/actions")
        );
        assert_eq!(paths.root(), Path::new("/tmp/snapshot"));
    }

    #[test]
    fn test_detail_options_clamp() {
        let opts = DetailOptions::new().workers(0).queue_capacity(0);
        assert_eq!(opts.worker_count(), 1);
        assert_eq!(opts.capacity(), 1);

        let opts = DetailOptions::default();
        assert_eq!(opts.worker_count(), DEFAULT_WORKERS);
        assert_eq!(opts.capacity(), DEFAULT_QUEUE_CAPACITY);
    }
}
