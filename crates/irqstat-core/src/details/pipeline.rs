//! Concurrent fan-out/fan-in collection of IRQ details.
//!
//! ```text
//!  producer ──names──▶ [job queue] ──▶ worker × N ──records──▶ [result queue] ──▶ Details::next
//!     │                                   │                          ▲
//!     └───────────────── joined by ───────┴──── coordinator ── closes┘
//! ```
//!
//! The producer lists the IRQ directory and closes the job queue when done.
//! Each worker owns its scratch buffer. The coordinator is the only holder
//! of the original result sender: it joins producer and workers first and
//! then drops it, so the result queue is closed exactly once and only when
//! nobody can send into it anymore.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender, bounded, select};
use tracing::{debug, trace, warn};

use super::{CancelToken, DetailRecord, read_details};
use crate::config::{DetailOptions, IrqPaths};
use crate::fs::{FileSystem, SCRATCH_CAPACITY};
use crate::observer::{Diagnostic, SharedObserver};

/// Everything needed to start the threads on the first pull.
struct Launch<F> {
    fs: Arc<F>,
    paths: Arc<IrqPaths>,
    options: DetailOptions,
    observer: SharedObserver,
}

struct Running {
    results: Receiver<DetailRecord>,
    coordinator: Option<JoinHandle<()>>,
}

enum State<F> {
    Pending(Launch<F>),
    Running(Running),
    Finished,
}

/// Single-use sequence of IRQ details, collected by a pool of worker
/// threads.
///
/// No thread is started before the first call to `next`. Records arrive in
/// completion order, not in IRQ or directory order.
///
/// Dropping the sequence stops the remaining work, discards records still
/// queued, and waits for all threads to exit. Threads stuck in a file read
/// finish that read first. Dropping never raises the caller's
/// [`CancelToken`], so one token can serve several sequences.
pub struct Details<F: FileSystem + 'static> {
    state: State<F>,
    stop: Stop,
    yielded: usize,
}

/// What the threads watch: the caller's token, and the sequence's own one
/// raised when it is dropped.
#[derive(Clone)]
struct Stop {
    caller: CancelToken,
    local: CancelToken,
}

impl Stop {
    fn new(caller: CancelToken) -> Self {
        Self {
            caller,
            local: CancelToken::new(),
        }
    }

    fn is_set(&self) -> bool {
        self.caller.is_cancelled() || self.local.is_cancelled()
    }
}

impl<F: FileSystem + 'static> Details<F> {
    pub fn new(
        fs: Arc<F>,
        paths: IrqPaths,
        options: DetailOptions,
        observer: SharedObserver,
    ) -> Self {
        Self::with_cancel(fs, paths, options, observer, CancelToken::new())
    }

    /// Like [`Details::new`], but cancellable from elsewhere via `cancel`.
    ///
    /// Once `cancel` is raised, `next` returns `None`, even if records are
    /// still queued.
    pub fn with_cancel(
        fs: Arc<F>,
        paths: IrqPaths,
        options: DetailOptions,
        observer: SharedObserver,
        cancel: CancelToken,
    ) -> Self {
        Self {
            state: State::Pending(Launch {
                fs,
                paths: Arc::new(paths),
                options,
                observer,
            }),
            stop: Stop::new(cancel),
            yielded: 0,
        }
    }

    /// Token cancelling this sequence.
    pub fn cancel_token(&self) -> CancelToken {
        self.stop.caller.clone()
    }

    /// Stops the threads (if any) and waits for them.
    fn shutdown(&mut self) {
        if let State::Running(running) = std::mem::replace(&mut self.state, State::Finished) {
            let Running {
                results,
                coordinator,
            } = running;
            // Unblocks workers waiting to hand in a result.
            drop(results);
            if let Some(coordinator) = coordinator
                && coordinator.join().is_err()
            {
                warn!("IRQ detail coordinator panicked");
            }
            debug!(records = self.yielded, "IRQ detail collection finished");
        }
    }
}

impl<F: FileSystem + 'static> Iterator for Details<F> {
    type Item = DetailRecord;

    fn next(&mut self) -> Option<DetailRecord> {
        if self.stop.caller.is_cancelled() {
            self.shutdown();
            return None;
        }
        self.state = match std::mem::replace(&mut self.state, State::Finished) {
            State::Pending(launch) => State::Running(launch.start(&self.stop)),
            state => state,
        };
        let State::Running(running) = &self.state else {
            return None;
        };
        let record = select! {
            recv(running.results) -> record => record.ok(),
            recv(self.stop.caller.signal()) -> _ => None,
        };
        // select! picks at random when both are ready.
        match record.filter(|_| !self.stop.caller.is_cancelled()) {
            Some(record) => {
                self.yielded += 1;
                Some(record)
            }
            None => {
                self.shutdown();
                None
            }
        }
    }
}

impl<F: FileSystem + 'static> Drop for Details<F> {
    fn drop(&mut self) {
        self.stop.local.cancel();
        self.shutdown();
    }
}

fn spawn_named<T, G>(name: String, f: G) -> io::Result<JoinHandle<T>>
where
    T: Send + 'static,
    G: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new().name(name).spawn(f)
}

impl<F: FileSystem + 'static> Launch<F> {
    fn start(self, stop: &Stop) -> Running {
        let workers = self.options.worker_count();
        let (job_tx, job_rx) = bounded::<String>(self.options.capacity());
        let (result_tx, result_rx) = bounded::<DetailRecord>(self.options.capacity());
        debug!(workers, capacity = self.options.capacity(), "starting IRQ detail workers");

        let mut handles = Vec::with_capacity(workers + 1);

        let producer = Producer {
            fs: Arc::clone(&self.fs),
            paths: Arc::clone(&self.paths),
            jobs: job_tx,
            stop: stop.clone(),
            observer: Arc::clone(&self.observer),
        };
        match spawn_named("irq-detail-producer".into(), move || producer.run()) {
            Ok(handle) => handles.push(handle),
            Err(e) => warn!(error = %e, "failed to spawn IRQ detail producer"),
        }

        for id in 0..workers {
            let worker = Worker {
                id,
                fs: Arc::clone(&self.fs),
                paths: Arc::clone(&self.paths),
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                stop: stop.clone(),
                observer: Arc::clone(&self.observer),
            };
            match spawn_named(format!("irq-detail-{id}"), move || worker.run()) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!(worker = id, error = %e, "failed to spawn IRQ detail worker"),
            }
        }
        // Once all workers are gone the producer must not block on a job
        // queue nobody drains.
        drop(job_rx);

        let coordinator = spawn_named("irq-detail-close".into(), move || {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("IRQ detail thread panicked");
                }
            }
            // Sole closer of the result queue.
            drop(result_tx);
        });
        let coordinator = match coordinator {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The closure and with it the result sender are gone now, so
                // the queue still closes once the workers are done; they just
                // run detached.
                warn!(error = %e, "failed to spawn IRQ detail coordinator");
                None
            }
        };

        Running {
            results: result_rx,
            coordinator,
        }
    }
}

struct Producer<F> {
    fs: Arc<F>,
    paths: Arc<IrqPaths>,
    jobs: Sender<String>,
    stop: Stop,
    observer: SharedObserver,
}

impl<F: FileSystem> Producer<F> {
    /// Queues the name of every IRQ directory; returning closes the job
    /// queue.
    fn run(self) {
        let dir = self.paths.irq_dir();
        let entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.observer.observe(&Diagnostic::SourceUnavailable {
                    path: dir,
                    kind: e.kind(),
                });
                return;
            }
        };
        for entry in entries.into_iter().filter(|entry| entry.is_dir) {
            let queued = select! {
                send(self.jobs, entry.name) -> res => res.is_ok(),
                recv(self.stop.caller.signal()) -> _ => false,
                recv(self.stop.local.signal()) -> _ => false,
            };
            if !queued {
                break;
            }
        }
    }
}

struct Worker<F> {
    id: usize,
    fs: Arc<F>,
    paths: Arc<IrqPaths>,
    jobs: Receiver<String>,
    results: Sender<DetailRecord>,
    stop: Stop,
    observer: SharedObserver,
}

impl<F: FileSystem> Worker<F> {
    fn run(self) {
        let mut scratch = Vec::with_capacity(SCRATCH_CAPACITY);
        let mut done = 0usize;
        loop {
            let job = select! {
                recv(self.stop.caller.signal()) -> _ => None,
                recv(self.stop.local.signal()) -> _ => None,
                recv(self.jobs) -> job => job.ok(),
            };
            let Some(name) = job.filter(|_| !self.stop.is_set()) else {
                break;
            };

            let record = match read_details(&*self.fs, &self.paths, &name, &mut scratch) {
                Ok(record) => record,
                Err(reason) => {
                    self.observer
                        .observe(&Diagnostic::DetailSkipped { name, reason });
                    continue;
                }
            };
            let delivered = select! {
                send(self.results, record) -> res => res.is_ok(),
                recv(self.stop.caller.signal()) -> _ => false,
                recv(self.stop.local.signal()) -> _ => false,
            };
            if !delivered {
                break;
            }
            done += 1;
        }
        trace!(worker = self.id, records = done, "IRQ detail worker exiting");
    }
}
