//! irqstat-core — reading Linux IRQ counters and details.
//!
//! Provides:
//! - `counters` — streaming parser for `/proc/interrupts`
//! - `details` — concurrent reader for per-IRQ actions and effective affinity
//! - `ranges` — parser for the kernel's `0-3,8` CPU list notation
//! - `fs` — filesystem abstraction (`RealFs`) and `mock` — in-memory `MockFs`
//! - `observer` — diagnostics for the otherwise silent record streams
//! - `source` — entry points for the live system or a synthetic root
//!
//! # Usage
//!
//! ```no_run
//! use irqstat_core::{IrqFilter, IrqSource};
//!
//! let source = IrqSource::live();
//! for irq in source.counters_for(IrqFilter::from_unsorted(vec![0, 8])) {
//!     println!("{}: {}", irq.irq, irq.total());
//! }
//! for details in source.details() {
//!     println!("{}: {:?}", details.irq, details.actions);
//! }
//! ```
//!
//! With `MockFs` in place of the real filesystem:
//!
//! ```
//! use irqstat_core::config::IrqPaths;
//! use irqstat_core::{IrqSource, MockFs};
//!
//! let source = IrqSource::new(MockFs::typical_system(), IrqPaths::default());
//! assert_eq!(source.counters().count(), 8);
//! ```

pub mod config;
pub mod counters;
pub mod cursor;
pub mod details;
pub mod fs;
pub mod mock;
pub mod observer;
pub mod ranges;
pub mod source;

pub use counters::{CounterRecord, CounterTable, CountersRef, CpuList, FilterError, IrqFilter};
pub use details::{CancelToken, DetailRecord, Details, SequentialDetails};
pub use fs::{FileSystem, RealFs};
pub use mock::MockFs;
pub use observer::{Diagnostic, Observer, TracingObserver};
pub use ranges::{CpuRange, parse_range_list};
pub use source::{Counters, IrqSource, all_counters, all_details, counters_for};
