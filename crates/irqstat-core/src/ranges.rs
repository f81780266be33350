//! Parser for the kernel's compact CPU list format, such as `0-3,8,10-11`.
//!
//! This is the format of `/proc/irq/N/effective_affinity_list`,
//! `smp_affinity_list` and friends.

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;

/// Inclusive range of CPU numbers. A single CPU `n` is `{ from: n, to: n }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CpuRange {
    pub from: u32,
    pub to: u32,
}

impl CpuRange {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    pub fn single(cpu: u32) -> Self {
        Self { from: cpu, to: cpu }
    }

    /// Returns `true` if `cpu` lies within this range.
    pub fn contains(&self, cpu: u32) -> bool {
        self.from <= cpu && cpu <= self.to
    }
}

impl std::fmt::Display for CpuRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Parses a comma-separated list of CPU numbers and `from-to` ranges.
///
/// Parsing is strict about what follows a number: only end of input, `,`,
/// or a complete `-<number>` is accepted. Anything else drops the token it
/// trails and ends parsing, so only the ranges validated before the bad
/// token are returned. Input that does not start with a digit yields an
/// empty list.
///
/// A range is not checked for `from <= to`.
pub fn parse_range_list(input: &[u8]) -> Vec<CpuRange> {
    let mut cur = Cursor::new(input);
    let mut ranges = Vec::new();

    while !cur.at_end() {
        let Some(from) = cur.parse_u32() else {
            break;
        };
        match cur.next() {
            None => {
                ranges.push(CpuRange::single(from));
                break;
            }
            Some(b',') => ranges.push(CpuRange::single(from)),
            Some(b'-') => {
                let Some(to) = cur.parse_u32() else {
                    break;
                };
                ranges.push(CpuRange::new(from, to));
                if cur.peek() == Some(b',') {
                    cur.next();
                }
            }
            Some(_) => break,
        }
    }

    ranges
}

/// Formats ranges back into the kernel's list notation.
pub fn format_range_list(ranges: &[CpuRange]) -> String {
    ranges
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
