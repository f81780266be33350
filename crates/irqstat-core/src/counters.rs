//! Streaming parser for `/proc/interrupts`.
//!
//! The table starts with a header naming the online CPUs:
//!
//! ```text
//!            CPU0       CPU1       CPU2       CPU3
//!   0:         44          0          0          0  IR-IO-APIC    2-edge      timer
//!   8:          0          0          0          0  IR-IO-APIC    8-edge      rtc0
//! NMI:          0          0          0          0   Non-maskable interrupts
//! ```
//!
//! Only the numbered IRQ rows are produced. The kernel emits them before any
//! architecture specific rows (`NMI:`, `LOC:`, ...), so the first row not
//! starting with a number ends the table. Chip, domain, trigger and action
//! columns after the counters are ignored.

use std::io::BufRead;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::observer::{Diagnostic, SharedObserver, TableEnd, default_observer};

/// Numbers of the online CPUs, in header order. Maps the index of a counter
/// to its CPU. Shared by all records of one table.
pub type CpuList = Arc<[u32]>;

/// Per-CPU counters of a single IRQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub irq: u32,
    /// One counter per online CPU, same order as `cpus`.
    pub counters: Vec<u64>,
    pub cpus: CpuList,
}

impl CounterRecord {
    /// Pairs of (CPU number, counter).
    pub fn per_cpu(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.cpus.iter().copied().zip(self.counters.iter().copied())
    }

    /// Sum of all counters, saturating.
    pub fn total(&self) -> u64 {
        self.counters.iter().fold(0u64, |acc, &c| acc.saturating_add(c))
    }
}

/// Borrowed view of the row just parsed.
///
/// `counters` points into the table's reused buffer and is overwritten by the
/// next row; use [`CountersRef::to_record`] to keep it.
#[derive(Debug, Clone, Copy)]
pub struct CountersRef<'a> {
    pub irq: u32,
    pub counters: &'a [u64],
    pub cpus: &'a CpuList,
}

impl CountersRef<'_> {
    pub fn to_record(&self) -> CounterRecord {
        CounterRecord {
            irq: self.irq,
            counters: self.counters.to_vec(),
            cpus: Arc::clone(self.cpus),
        }
    }
}

/// Error type for invalid IRQ filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// `irq` at `index` is smaller than the IRQ number before it.
    Unsorted { index: usize, irq: u32 },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::Unsorted { index, irq } => write!(
                f,
                "IRQ filter not in ascending order: {} at index {}",
                irq, index
            ),
        }
    }
}

impl std::error::Error for FilterError {}

/// Ascending list of the IRQ numbers to report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrqFilter {
    irqs: Vec<u32>,
}

impl IrqFilter {
    /// Wraps an already sorted list. Rows are matched by binary search, so
    /// an unsorted list is rejected rather than silently mismatching.
    pub fn new(irqs: Vec<u32>) -> Result<Self, FilterError> {
        if let Some(pos) = irqs.windows(2).position(|w| w[0] > w[1]) {
            return Err(FilterError::Unsorted {
                index: pos + 1,
                irq: irqs[pos + 1],
            });
        }
        Ok(Self { irqs })
    }

    /// Sorts and deduplicates `irqs`.
    pub fn from_unsorted(mut irqs: Vec<u32>) -> Self {
        irqs.sort_unstable();
        irqs.dedup();
        Self { irqs }
    }

    pub fn contains(&self, irq: u32) -> bool {
        self.irqs.binary_search(&irq).is_ok()
    }

    pub fn irqs(&self) -> &[u32] {
        &self.irqs
    }
}

/// Parses the header line into the list of online CPU numbers.
///
/// Every field must be `CPU<n>`; a single other field rejects the whole
/// header.
pub fn parse_cpu_header(line: &[u8]) -> Option<Vec<u32>> {
    let mut cur = Cursor::new(line);
    let fields = cur.count_fields();
    if fields == 0 {
        return None;
    }
    let mut cpus = Vec::with_capacity(fields);
    while !cur.skip_spaces() {
        if !cur.skip_literal("CPU") {
            return None;
        }
        cpus.push(cur.parse_u32()?);
    }
    (cpus.len() == fields).then_some(cpus)
}

/// Parses one IRQ row into `counters`, which holds one slot per online CPU.
///
/// Returns `Ok(None)` for rows rejected by `filter`; their counters are not
/// looked at.
fn parse_row(
    line: &[u8],
    filter: Option<&IrqFilter>,
    counters: &mut [u64],
) -> Result<Option<u32>, TableEnd> {
    let mut cur = Cursor::new(line);
    if cur.skip_spaces() {
        return Err(TableEnd::BlankLine);
    }
    let irq = cur.parse_u32().ok_or(TableEnd::NamedIrq)?;
    if !cur.skip_literal(":") {
        return Err(TableEnd::MissingColon);
    }
    if let Some(filter) = filter
        && !filter.contains(irq)
    {
        return Ok(None);
    }
    for slot in counters.iter_mut() {
        if cur.skip_spaces() {
            return Err(TableEnd::ShortRow);
        }
        *slot = cur.parse_u64().ok_or(TableEnd::BadCounter)?;
    }
    Ok(Some(irq))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Rows,
    Done,
}

/// Single-pass reader producing the IRQ rows of an interrupt table.
///
/// Nothing is read until the first row is requested. Any malformed row ends
/// the table for good; rows already produced are unaffected.
pub struct CounterTable<R> {
    reader: R,
    line: Vec<u8>,
    line_no: usize,
    state: State,
    cpus: CpuList,
    counters: Vec<u64>,
    filter: Option<IrqFilter>,
    observer: SharedObserver,
}

impl<R: BufRead> CounterTable<R> {
    /// Creates a table reader producing all numbered IRQs.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(256),
            line_no: 0,
            state: State::Header,
            cpus: Arc::from(Vec::new()),
            counters: Vec::new(),
            filter: None,
            observer: default_observer(),
        }
    }

    /// Restricts the produced rows to the IRQs in `filter`.
    pub fn with_filter(mut self, filter: IrqFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Online CPUs from the header, available once the first row has been
    /// requested and the header turned out valid.
    pub fn online_cpus(&self) -> Option<&[u32]> {
        match self.state {
            State::Header => None,
            _ if self.cpus.is_empty() => None,
            _ => Some(&self.cpus[..]),
        }
    }

    /// Reads the next line into the line buffer, without its line ending.
    fn read_line(&mut self) -> bool {
        self.line.clear();
        match self.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => false,
            Ok(_) => {
                self.line_no += 1;
                if self.line.last() == Some(&b'\n') {
                    self.line.pop();
                    if self.line.last() == Some(&b'\r') {
                        self.line.pop();
                    }
                }
                true
            }
            Err(_) => {
                self.end(TableEnd::ReadFailed);
                false
            }
        }
    }

    fn end(&mut self, reason: TableEnd) {
        self.state = State::Done;
        self.observer.observe(&Diagnostic::TableEnded {
            line: self.line_no,
            reason,
        });
    }

    fn read_header(&mut self) -> bool {
        if !self.read_line() {
            self.state = State::Done;
            return false;
        }
        match parse_cpu_header(&self.line) {
            Some(cpus) => {
                self.counters = vec![0; cpus.len()];
                self.cpus = Arc::from(cpus);
                self.state = State::Rows;
                true
            }
            None => {
                self.state = State::Done;
                self.observer.observe(&Diagnostic::MalformedHeader);
                false
            }
        }
    }

    /// Parses the next wanted row and lends out its counters.
    pub fn next_row(&mut self) -> Option<CountersRef<'_>> {
        if self.state == State::Header && !self.read_header() {
            return None;
        }
        while self.state == State::Rows {
            if !self.read_line() {
                self.state = State::Done;
                break;
            }
            match parse_row(&self.line, self.filter.as_ref(), &mut self.counters) {
                Ok(Some(irq)) => {
                    return Some(CountersRef {
                        irq,
                        counters: &self.counters,
                        cpus: &self.cpus,
                    });
                }
                Ok(None) => continue,
                Err(reason) => self.end(reason),
            }
        }
        None
    }
}

impl<R: BufRead> Iterator for CounterTable<R> {
    type Item = CounterRecord;

    fn next(&mut self) -> Option<CounterRecord> {
        self.next_row().map(|row| row.to_record())
    }
}
