//! Entry points bundling a filesystem, paths and options.

use std::io::{self, BufReader, Read};
use std::sync::Arc;

use crate::config::{DetailOptions, IrqPaths};
use crate::counters::{CounterTable, FilterError, IrqFilter};
use crate::details::{CancelToken, Details, SequentialDetails};
use crate::fs::{FileSystem, RealFs};
use crate::observer::{Diagnostic, Observer, SharedObserver, default_observer};

/// Counter table read from a [`FileSystem`].
pub type Counters = CounterTable<BufReader<Box<dyn Read + Send>>>;

/// Source of IRQ counters and details.
///
/// Every call produces a fresh, single-use sequence; sequences are
/// independent of each other.
pub struct IrqSource<F: FileSystem + 'static> {
    fs: Arc<F>,
    paths: IrqPaths,
    options: DetailOptions,
    observer: SharedObserver,
}

impl IrqSource<RealFs> {
    /// The live system's `/proc` and `/sys`.
    pub fn live() -> Self {
        Self::new(RealFs::new(), IrqPaths::default())
    }
}

impl<F: FileSystem + 'static> IrqSource<F> {
    pub fn new(fs: F, paths: IrqPaths) -> Self {
        Self {
            fs: Arc::new(fs),
            paths,
            options: DetailOptions::default(),
            observer: default_observer(),
        }
    }

    pub fn with_options(mut self, options: DetailOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the default `tracing` observer.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn paths(&self) -> &IrqPaths {
        &self.paths
    }

    pub fn options(&self) -> DetailOptions {
        self.options
    }

    /// Per-CPU counters of all numbered IRQs.
    pub fn counters(&self) -> Counters {
        let path = self.paths.interrupts();
        let reader = match self.fs.open(&path) {
            Ok(reader) => reader,
            Err(e) => {
                self.observer.observe(&Diagnostic::SourceUnavailable {
                    path,
                    kind: e.kind(),
                });
                Box::new(io::empty())
            }
        };
        CounterTable::new(BufReader::new(reader)).with_observer(Arc::clone(&self.observer))
    }

    /// Per-CPU counters of only the IRQs in `filter`.
    pub fn counters_for(&self, filter: IrqFilter) -> Counters {
        self.counters().with_filter(filter)
    }

    /// Details of all IRQs, read concurrently.
    pub fn details(&self) -> Details<F> {
        self.details_with_cancel(CancelToken::new())
    }

    /// Like [`IrqSource::details`], cancellable through `cancel`.
    pub fn details_with_cancel(&self, cancel: CancelToken) -> Details<F> {
        Details::with_cancel(
            Arc::clone(&self.fs),
            self.paths.clone(),
            self.options,
            Arc::clone(&self.observer),
            cancel,
        )
    }

    /// Details of all IRQs, read on the calling thread.
    pub fn details_sequential(&self) -> SequentialDetails<F> {
        SequentialDetails::new(
            Arc::clone(&self.fs),
            self.paths.clone(),
            Arc::clone(&self.observer),
        )
    }
}

/// Counters of all numbered IRQs from the live `/proc/interrupts`.
pub fn all_counters() -> Counters {
    IrqSource::live().counters()
}

/// Counters of the given IRQs from the live `/proc/interrupts`. The IRQ
/// numbers must be in ascending order.
pub fn counters_for(sorted_irqs: Vec<u32>) -> Result<Counters, FilterError> {
    Ok(IrqSource::live().counters_for(IrqFilter::new(sorted_irqs)?))
}

/// Details of all IRQs of the live system.
pub fn all_details() -> Details<RealFs> {
    IrqSource::live().details()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFs;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    fn typical() -> IrqSource<MockFs> {
        IrqSource::new(MockFs::typical_system(), IrqPaths::default())
    }

    #[test]
    fn test_counters_typical_system() {
        let rows: Vec<_> = typical().counters().collect();
        let irqs: Vec<u32> = rows.iter().map(|r| r.irq).collect();
        assert_eq!(irqs, vec![0, 8, 9, 16, 120, 124, 125, 126]);
        assert!(rows.iter().all(|r| r.counters.len() == 4 && &*r.cpus == [0, 1, 2, 3]));
    }

    #[test]
    fn test_counters_for() {
        let filter = IrqFilter::new(vec![9, 125, 999]).unwrap();
        let rows: Vec<_> = typical().counters_for(filter).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].counters, vec![0, 1234, 0, 0]);
        assert_eq!(rows[1].irq, 125);
    }

    #[test]
    fn test_details_typical_system() {
        let source = typical().with_options(DetailOptions::new().workers(3));
        let irqs: BTreeSet<u32> = source.details().map(|r| r.irq).collect();
        assert_eq!(
            irqs,
            BTreeSet::from([0, 8, 9, 16, 120, 124, 125, 126])
        );

        let shared = source
            .details_sequential()
            .find(|r| r.irq == 16)
            .unwrap();
        assert_eq!(shared.actions, vec!["i801_smbus", "idma64.0"]);
    }

    #[test]
    fn test_details_match_counters() {
        let source = typical();
        let counted: BTreeSet<u32> = source.counters().map(|r| r.irq).collect();
        for detail in source.details() {
            assert!(counted.contains(&detail.irq));
            assert!(!detail.actions.is_empty());
            assert!(!detail.affinities.is_empty());
        }
    }

    #[test]
    fn test_unavailable_source_is_empty() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let source = IrqSource::new(MockFs::new(), IrqPaths::default())
            .with_observer(move |d: &Diagnostic| sink.lock().unwrap().push(d.clone()));

        assert_eq!(source.counters().count(), 0);
        assert_eq!(source.details().count(), 0);
        assert_eq!(source.details_sequential().count(), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(
            seen.iter()
                .all(|d| matches!(d, Diagnostic::SourceUnavailable { .. }))
        );
    }

    #[test]
    fn test_independent_sequences() {
        let source = typical();
        let mut first = source.counters();
        let second: Vec<_> = source.counters().collect();
        let rest: Vec<_> = first.by_ref().collect();
        assert_eq!(rest, second);
    }

    #[test]
    fn test_live_counters_for_rejects_unsorted() {
        assert!(counters_for(vec![3, 1]).is_err());
    }
}
