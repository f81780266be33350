//! Per-IRQ details: registered actions and effective CPU affinity.
//!
//! Unlike the counters these are scattered over two small pseudo files per
//! IRQ, `/sys/kernel/irq/N/actions` and `/proc/irq/N/effective_affinity_list`.
//! [`Details`] reads them with a pool of worker threads so that the kernel
//! renders many files in parallel; [`SequentialDetails`] does the same work
//! on the calling thread.
//!
//! An IRQ directory yields a record only if it is named by a number and both
//! files are readable, non-empty and newline-terminated, and the affinity
//! list contains at least one range. Everything else is skipped.

mod cancel;
mod pipeline;
mod sequential;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::IrqPaths;
use crate::cursor::Cursor;
use crate::fs::FileSystem;
use crate::observer::{DetailFile, SkipReason};
use crate::ranges::{CpuRange, parse_range_list};

pub use cancel::CancelToken;
pub use pipeline::Details;
pub use sequential::SequentialDetails;

/// Actions and effective affinity of a single IRQ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub irq: u32,
    /// Registered actions, in chain order.
    pub actions: Vec<String>,
    /// CPUs the IRQ is currently routed to.
    pub affinities: Vec<CpuRange>,
}

/// Parses an IRQ directory name; only plain decimal numbers qualify.
fn parse_irq_name(name: &str) -> Option<u32> {
    let mut cur = Cursor::new(name.as_bytes());
    let irq = cur.parse_u32()?;
    cur.at_end().then_some(irq)
}

/// Reads a single-line pseudo file into `scratch` and returns the line
/// without its terminating newline.
fn read_line_file<'b, F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
    scratch: &'b mut Vec<u8>,
    file: DetailFile,
) -> Result<&'b [u8], SkipReason> {
    fs.read_into(path, scratch)
        .map_err(|e| SkipReason::Unreadable(file, e.kind()))?;
    match scratch.split_last() {
        None => Err(SkipReason::Empty(file)),
        Some((&b'\n', line)) => Ok(line),
        Some(_) => Err(SkipReason::NoTrailingNewline(file)),
    }
}

/// Gathers the details of the IRQ directory `name`, using `scratch` as the
/// read buffer for both files.
pub(crate) fn read_details<F: FileSystem + ?Sized>(
    fs: &F,
    paths: &IrqPaths,
    name: &str,
    scratch: &mut Vec<u8>,
) -> Result<DetailRecord, SkipReason> {
    let irq = parse_irq_name(name).ok_or(SkipReason::NotANumber)?;

    let line = read_line_file(fs, &paths.actions(name), scratch, DetailFile::Actions)?;
    let actions = String::from_utf8_lossy(line)
        .split(',')
        .map(str::to_owned)
        .collect();

    let line = read_line_file(
        fs,
        &paths.effective_affinity(name),
        scratch,
        DetailFile::EffectiveAffinity,
    )?;
    let affinities = parse_range_list(line);
    if affinities.is_empty() {
        return Err(SkipReason::NoAffinities);
    }

    Ok(DetailRecord {
        irq,
        actions,
        affinities,
    })
}
