//! Diagnostics for the otherwise silent record streams.
//!
//! Neither the counter table nor the detail collection ever returns an error:
//! bad input simply yields fewer records. What went wrong is reported to an
//! [`Observer`] instead, which by default forwards to `tracing`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};

/// Why the counter table stopped producing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEnd {
    /// A line with nothing but spaces.
    BlankLine,
    /// A line not starting with an IRQ number, such as `NMI:`. All numbered
    /// IRQs come first, so this is the regular end of the table.
    NamedIrq,
    /// IRQ number not followed by `:`.
    MissingColon,
    /// Fewer counter columns than online CPUs.
    ShortRow,
    /// A counter column that isn't a number.
    BadCounter,
    /// The underlying reader failed.
    ReadFailed,
}

impl std::fmt::Display for TableEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableEnd::BlankLine => write!(f, "blank line"),
            TableEnd::NamedIrq => write!(f, "named IRQ"),
            TableEnd::MissingColon => write!(f, "missing ':' after IRQ number"),
            TableEnd::ShortRow => write!(f, "too few counter columns"),
            TableEnd::BadCounter => write!(f, "non-numeric counter"),
            TableEnd::ReadFailed => write!(f, "read error"),
        }
    }
}

/// Which per-IRQ file a detail skip refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailFile {
    Actions,
    EffectiveAffinity,
}

impl std::fmt::Display for DetailFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailFile::Actions => write!(f, "actions"),
            DetailFile::EffectiveAffinity => write!(f, "effective_affinity_list"),
        }
    }
}

/// Why an IRQ directory did not produce a detail record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Directory name is not an IRQ number.
    NotANumber,
    /// File could not be opened or read.
    Unreadable(DetailFile, io::ErrorKind),
    /// File was empty.
    Empty(DetailFile),
    /// File contents did not end in a newline.
    NoTrailingNewline(DetailFile),
    /// Affinity list parsed into no ranges at all.
    NoAffinities,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotANumber => write!(f, "not an IRQ number"),
            SkipReason::Unreadable(file, kind) => write!(f, "cannot read {}: {}", file, kind),
            SkipReason::Empty(file) => write!(f, "{} is empty", file),
            SkipReason::NoTrailingNewline(file) => write!(f, "{} lacks trailing newline", file),
            SkipReason::NoAffinities => write!(f, "no effective affinities"),
        }
    }
}

/// A single diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Counter table could not be opened or detail root could not be listed.
    SourceUnavailable { path: PathBuf, kind: io::ErrorKind },
    /// Header line of the counter table is not a list of `CPU<n>` tokens.
    MalformedHeader,
    /// Counter table ended at the given (1-based) line.
    TableEnded { line: usize, reason: TableEnd },
    /// An IRQ directory was skipped.
    DetailSkipped { name: String, reason: SkipReason },
}

/// Receives diagnostics. Implementations must be cheap and must not block,
/// as they are called from the detail workers.
pub trait Observer: Send + Sync {
    fn observe(&self, diagnostic: &Diagnostic);
}

impl<T> Observer for T
where
    T: Fn(&Diagnostic) + Send + Sync,
{
    fn observe(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Default observer, turning diagnostics into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::SourceUnavailable { path, kind } => {
                debug!(path = %path.display(), error = %kind, "IRQ source unavailable");
            }
            Diagnostic::MalformedHeader => debug!("malformed interrupt table header"),
            Diagnostic::TableEnded { line, reason } => {
                trace!(line, %reason, "interrupt table ended");
            }
            Diagnostic::DetailSkipped { name, reason } => {
                trace!(irq = %name, %reason, "skipping IRQ details");
            }
        }
    }
}

/// Shared observer handle, as held by the parsers and detail workers.
pub type SharedObserver = Arc<dyn Observer>;

pub(crate) fn default_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}
