//! irqstat - dump Linux IRQ counters and details.
//!
//! Reads `/proc/interrupts` for per-CPU counters, and `/sys/kernel/irq/N/`
//! plus `/proc/irq/N/` for actions and effective CPU affinities. `--root`
//! points it at a captured or synthetic tree instead of the live system.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, debug, error};
use tracing_subscriber::EnvFilter;

use irqstat_core::config::{DEFAULT_WORKERS, DetailOptions, IrqPaths};
use irqstat_core::ranges::format_range_list;
use irqstat_core::{CounterRecord, DetailRecord, IrqFilter, IrqSource, RealFs};

/// Linux IRQ counters and details.
#[derive(Parser)]
#[command(
    name = "irqstat",
    about = "Dump Linux IRQ counters and details",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("IRQSTAT_GIT_SHA"), ")")
)]
struct Args {
    /// Root directory containing proc/ and sys/ (for testing/snapshots).
    #[arg(long, default_value = "/")]
    root: PathBuf,

    /// Emit JSON instead of a text table.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Per-CPU interrupt counters from /proc/interrupts.
    Counters {
        /// Only report these IRQ numbers (repeatable).
        #[arg(long = "irq", value_name = "N")]
        irqs: Vec<u32>,

        /// Show one column per online CPU instead of just the total.
        #[arg(long)]
        per_cpu: bool,

        /// Stop after this many IRQs.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Registered actions and effective CPU affinity per IRQ.
    Details {
        /// Number of concurrent reader threads.
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Read on a single thread, in directory order.
        #[arg(long)]
        sequential: bool,

        /// Stop after this many IRQs.
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so they never mix with the dump on stdout.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["irqstat", "irqstat_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[derive(Serialize)]
struct Dump<T> {
    timestamp: String,
    root: PathBuf,
    irqs: Vec<T>,
}

impl<T> Dump<T> {
    fn new(root: PathBuf, irqs: Vec<T>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            root,
            irqs,
        }
    }
}

fn write_json<T: Serialize>(out: &mut impl Write, dump: &Dump<T>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, dump)?;
    writeln!(out)
}

fn write_counters(out: &mut impl Write, rows: &[CounterRecord], per_cpu: bool) -> io::Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    write!(out, "{:>5} {:>14}", "IRQ", "TOTAL")?;
    if per_cpu {
        for cpu in first.cpus.iter() {
            write!(out, " {:>12}", format!("CPU{}", cpu))?;
        }
    }
    writeln!(out)?;

    for row in rows {
        write!(out, "{:>5} {:>14}", row.irq, row.total())?;
        if per_cpu {
            for count in &row.counters {
                write!(out, " {:>12}", count)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_details(out: &mut impl Write, records: &[DetailRecord]) -> io::Result<()> {
    writeln!(out, "{:>5} {:<16} ACTIONS", "IRQ", "AFFINITY")?;
    for record in records {
        writeln!(
            out,
            "{:>5} {:<16} {}",
            record.irq,
            format_range_list(&record.affinities),
            record.actions.join(",")
        )?;
    }
    Ok(())
}

fn run(args: &Args, source: &IrqSource<RealFs>, out: &mut impl Write) -> io::Result<()> {
    match &args.command {
        Command::Counters {
            irqs,
            per_cpu,
            limit,
        } => {
            let counters = if irqs.is_empty() {
                source.counters()
            } else {
                source.counters_for(IrqFilter::from_unsorted(irqs.clone()))
            };
            let rows: Vec<CounterRecord> = counters.take(limit.unwrap_or(usize::MAX)).collect();
            debug!(irqs = rows.len(), "read interrupt counters");
            if args.json {
                write_json(out, &Dump::new(args.root.clone(), rows))
            } else {
                write_counters(out, &rows, *per_cpu)
            }
        }
        Command::Details {
            sequential, limit, ..
        } => {
            let limit = limit.unwrap_or(usize::MAX);
            let mut records: Vec<DetailRecord> = if *sequential {
                source.details_sequential().take(limit).collect()
            } else {
                source.details().take(limit).collect()
            };
            records.sort_by_key(|r| r.irq);
            debug!(irqs = records.len(), "read IRQ details");
            if args.json {
                write_json(out, &Dump::new(args.root.clone(), records))
            } else {
                write_details(out, &records)
            }
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut source = IrqSource::new(RealFs::new(), IrqPaths::with_root(&args.root));
    if let Command::Details { workers, .. } = &args.command {
        source = source.with_options(DetailOptions::new().workers(*workers));
    }
    debug!(root = %args.root.display(), "irqstat {} starting", env!("CARGO_PKG_VERSION"));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match run(&args, &source, &mut out).and_then(|()| out.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to write output");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irqstat_core::CpuRange;
    use std::sync::Arc;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "irqstat", "--root", "/tmp/x", "--json", "counters", "--irq", "9", "--irq", "1",
        ])
        .unwrap();
        assert_eq!(args.root, PathBuf::from("/tmp/x"));
        assert!(args.json);
        match args.command {
            Command::Counters { irqs, .. } => assert_eq!(irqs, vec![9, 1]),
            Command::Details { .. } => panic!("expected counters"),
        }

        let args = Args::try_parse_from(["irqstat", "details", "--workers", "4"]).unwrap();
        match args.command {
            Command::Details {
                workers,
                sequential,
                ..
            } => {
                assert_eq!(workers, 4);
                assert!(!sequential);
            }
            Command::Counters { .. } => panic!("expected details"),
        }
    }

    #[test]
    fn test_write_counters() {
        let rows = vec![CounterRecord {
            irq: 9,
            counters: vec![1, 2],
            cpus: Arc::from(vec![0, 3]),
        }];
        let mut out = Vec::new();
        write_counters(&mut out, &rows, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().next().unwrap().contains("CPU3"));
        assert!(text.lines().nth(1).unwrap().trim_start().starts_with("9"));
        assert!(text.contains(" 3 "));

        let mut out = Vec::new();
        write_counters(&mut out, &[], false).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_write_details() {
        let records = vec![DetailRecord {
            irq: 16,
            actions: vec!["i801_smbus".into(), "idma64.0".into()],
            affinities: vec![CpuRange::new(0, 1), CpuRange::single(3)],
        }];
        let mut out = Vec::new();
        write_details(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0-1,3"));
        assert!(text.contains("i801_smbus,idma64.0"));
    }

    #[test]
    fn test_run_against_synthetic_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("proc/irq/42")).unwrap();
        std::fs::create_dir_all(dir.path().join("sys/kernel/irq/42")).unwrap();
        std::fs::write(
            dir.path().join("proc/interrupts"),
            "  CPU0 CPU1\n 42: 5 6 x\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("sys/kernel/irq/42/actions"), "foo\n").unwrap();
        std::fs::write(
            dir.path().join("proc/irq/42/effective_affinity_list"),
            "1\n",
        )
        .unwrap();

        let root = dir.path().to_str().unwrap();
        let source = IrqSource::new(RealFs::new(), IrqPaths::with_root(root));

        let args = Args::try_parse_from(["irqstat", "--root", root, "counters"]).unwrap();
        let mut out = Vec::new();
        run(&args, &source, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("11"));

        let args = Args::try_parse_from(["irqstat", "--json", "details"]).unwrap();
        let mut out = Vec::new();
        run(&args, &source, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["irqs"][0]["irq"], 42);
        assert_eq!(json["irqs"][0]["actions"][0], "foo");
        assert_eq!(json["irqs"][0]["affinities"][0]["from"], 1);
    }
}
