/*!
 * Parallel archive bruteforce engine
 *
 * The coordinator walks the candidate space prefix by prefix and keeps a
 * bounded queue topped up for a fixed pool of workers. Each worker owns its own
 * oracle (one open archive handle) and pulls partitions until the queue
 * is empty or the shared cancellation flag is raised.
 *
 * Performance notes:
 * - Lock-free flag and counter, mutex only for the single claim
 * - Attempts flushed to the shared counter in batches
 * - Zero-allocation candidate cursor in the inner loop
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::config::CrackConfig;
use crate::error::{CrackError, Result};
use crate::oracle::{Oracle, OracleFactory};
use crate::password_gen::{partition_cursor, Alphabet, Partition, PartitionCursor};
use crate::report::PasswordStore;
use crate::state::SearchState;

/// Attempts counted locally before touching the shared counter
pub const FLUSH_INTERVAL: u64 = 4096;

/// Queued partitions per worker
pub const QUEUE_DEPTH: usize = 4;

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Idle,
    Dispatching,
    Cancelling,
    Draining,
    Done,
}

/// Events streamed to the caller while a run is in progress
#[derive(Debug, Clone, PartialEq)]
pub enum CrackProgress {
    Started {
        total: u64,
        partitions: u64,
        workers: usize,
    },
    Phase(CoordinatorPhase),
    Progress {
        current: u64,
        total: u64,
        elapsed: Duration,
        rate: f64,
    },
    WorkerError {
        partition: String,
        reason: String,
    },
    Found(String),
}

/// Counters shared by every run outcome
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    /// Approximate: in-flight workers may not flush after an early stop
    pub attempts: u64,
    pub elapsed: Duration,
    pub workers: usize,
    pub partitions: u64,
    pub failed_partitions: usize,
}

impl RunStats {
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    Found {
        password: String,
        stats: RunStats,
        /// Set when the password could not be saved
        persist_warning: Option<String>,
    },
    Exhausted {
        stats: RunStats,
    },
    /// Cancelled from outside before any password was claimed
    Stopped {
        stats: RunStats,
    },
}

impl RunResult {
    pub fn stats(&self) -> &RunStats {
        match self {
            RunResult::Found { stats, .. }
            | RunResult::Exhausted { stats }
            | RunResult::Stopped { stats } => stats,
        }
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            RunResult::Found { password, .. } => Some(password),
            _ => None,
        }
    }
}

/// Search one partition
///
/// Checks the cancellation flag before every candidate. On a match the
/// worker claims the password slot; only the winner raises the flag and
/// returns the password, a late finder returns `None`.
pub fn search_partition<O: Oracle + ?Sized>(
    partition: &Partition,
    alphabet: &Alphabet,
    oracle: &mut O,
    state: &SearchState,
) -> Option<String> {
    let mut cursor = partition.candidates(alphabet);
    let mut tally = 0u64;

    while let Some(candidate) = cursor.advance() {
        if state.is_cancelled() {
            state.add_attempts(tally);
            return None;
        }

        tally += 1;

        if oracle.try_unlock(candidate) {
            state.add_attempts(tally);
            let password = String::from_utf8_lossy(candidate).into_owned();

            if state.claim(&password) {
                state.cancel();
                return Some(password);
            }
            return None;
        }

        if tally == FLUSH_INTERVAL {
            state.add_attempts(tally);
            tally = 0;
        }
    }

    state.add_attempts(tally);
    None
}

enum WorkerReport {
    Finished {
        worker: usize,
        partition: String,
        found: Option<String>,
    },
    Failed {
        worker: usize,
        partition: String,
        reason: String,
    },
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("Unknown panic")
        .to_string()
}

/// Worker thread body: pull partitions until the queue drains or the run stops
fn run_worker<F: OracleFactory>(
    worker: usize,
    factory: &F,
    alphabet: &Alphabet,
    state: &SearchState,
    tasks: Receiver<Partition>,
    reports: Sender<WorkerReport>,
) {
    let mut oracle: Option<F::Oracle> = None;

    while !state.is_cancelled() {
        let partition = match tasks.recv() {
            Ok(partition) => partition,
            Err(_) => break,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> std::result::Result<Option<String>, String> {
            if oracle.is_none() {
                oracle = Some(factory.open().map_err(|e| e.to_string())?);
            }
            Ok(oracle
                .as_mut()
                .and_then(|active| search_partition(&partition, alphabet, active, state)))
        }));

        let report = match outcome {
            Ok(Ok(found)) => WorkerReport::Finished {
                worker,
                partition: partition.label(),
                found,
            },
            Ok(Err(reason)) => WorkerReport::Failed {
                worker,
                partition: partition.label(),
                reason,
            },
            Err(payload) => {
                // The oracle may be in a bad state, reopen for the next partition
                oracle = None;
                WorkerReport::Failed {
                    worker,
                    partition: partition.label(),
                    reason: panic_message(payload.as_ref()),
                }
            }
        };

        if reports.send(report).is_err() {
            break;
        }
    }
}

/// Producer side of the task queue
///
/// Pulls partitions from the prefix cursor only as fast as the bounded
/// queue drains, so memory stays at `workers * QUEUE_DEPTH` partitions
/// whatever the prefix length.
struct Feeder<'a> {
    cursor: PartitionCursor<'a>,
    pending: Option<Partition>,
    tx: Option<Sender<Partition>>,
}

impl<'a> Feeder<'a> {
    fn new(cursor: PartitionCursor<'a>, tx: Sender<Partition>) -> Self {
        Self {
            cursor,
            pending: None,
            tx: Some(tx),
        }
    }

    /// Queue partitions until the queue is full or the cursor runs out
    fn fill(&mut self) {
        let exhausted = match &self.tx {
            Some(tx) => loop {
                let Some(partition) = self.pending.take().or_else(|| self.cursor.next()) else {
                    break true;
                };

                match tx.try_send(partition) {
                    Ok(()) => {}
                    Err(TrySendError::Full(partition)) => {
                        self.pending = Some(partition);
                        break false;
                    }
                    Err(TrySendError::Disconnected(_)) => break true,
                }
            },
            None => false,
        };

        if exhausted {
            // Workers see the disconnect once the queue drains
            self.tx = None;
        }
    }

    /// Stop handing out partitions
    fn close(&mut self) {
        self.tx = None;
        self.pending = None;
    }

    fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

/// Multi-threaded bruteforce against a password-protected archive
pub struct ArchiveBruteForcer {
    config: CrackConfig,
    alphabet: Alphabet,
    state: Arc<SearchState>,
    progress_tx: Option<UnboundedSender<CrackProgress>>,
}

impl ArchiveBruteForcer {
    pub fn new(config: CrackConfig) -> Result<Self> {
        config.validate()?;
        let alphabet = config.alphabet()?;

        Ok(Self {
            config,
            alphabet,
            state: Arc::new(SearchState::new()),
            progress_tx: None,
        })
    }

    /// Stream progress events to `tx`
    pub fn with_progress(mut self, tx: UnboundedSender<CrackProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Shared state of this run; `cancel()` on it stops the search
    pub fn state(&self) -> Arc<SearchState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &CrackConfig {
        &self.config
    }

    fn emit(&self, event: CrackProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(event);
        }
    }

    fn enter(&self, phase: &mut CoordinatorPhase, next: CoordinatorPhase) {
        if *phase != next {
            debug!(from = ?*phase, to = ?next, "Coordinator phase change");
            *phase = next;
            self.emit(CrackProgress::Phase(next));
        }
    }

    fn report_progress(&self, start: Instant, total: u64) {
        let current = self.state.attempts();
        let elapsed = start.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { current as f64 / secs } else { 0.0 };

        debug!(
            attempts = current,
            elapsed_secs = format_args!("{:.1}", secs),
            rate = format_args!("{:.0}", rate),
            "Progress"
        );

        self.emit(CrackProgress::Progress {
            current,
            total,
            elapsed,
            rate,
        });
    }

    /// Run the search to completion
    ///
    /// Returns an error only when the archive check fails before dispatch.
    /// Worker failures are contained per partition.
    pub fn run<F, S>(self, factory: &mut F, store: &S) -> Result<RunResult>
    where
        F: OracleFactory,
        S: PasswordStore + ?Sized,
    {
        let start = Instant::now();
        let mut phase = CoordinatorPhase::Idle;

        if let Err(e) = factory.validate() {
            error!(error = %e, "Archive check failed, nothing dispatched");
            return Err(e.into());
        }

        let cursor = partition_cursor(&self.alphabet, self.config.length, self.config.prefix_length)?;
        let total = self
            .alphabet
            .space_size(self.config.length)
            .unwrap_or(u64::MAX);
        let partition_count = cursor.total();
        let workers = self
            .config
            .worker_count()
            .min(usize::try_from(partition_count).unwrap_or(usize::MAX))
            .max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("crack-worker-{}", i))
            .build()
            .map_err(|e| CrackError::ThreadPool(e.to_string()))?;

        let (task_tx, task_rx) = crossbeam_channel::bounded::<Partition>(workers * QUEUE_DEPTH);
        let mut feeder = Feeder::new(cursor, task_tx);
        feeder.fill();

        let (report_tx, report_rx) = crossbeam_channel::unbounded::<WorkerReport>();

        info!(
            charset = self.alphabet.as_str(),
            length = self.config.length,
            total,
            partitions = partition_count,
            workers,
            "Starting bruteforce"
        );
        self.emit(CrackProgress::Started {
            total,
            partitions: partition_count,
            workers,
        });

        let factory: &F = factory;
        let alphabet = &self.alphabet;
        let state: &SearchState = &self.state;

        let failed_partitions = pool.in_place_scope(|scope| {
            for worker in 0..workers {
                let tasks = task_rx.clone();
                let reports = report_tx.clone();
                scope.spawn(move |_| run_worker(worker, factory, alphabet, state, tasks, reports));
            }
            drop(report_tx);

            self.enter(&mut phase, CoordinatorPhase::Dispatching);
            self.collect(&mut phase, &mut feeder, &task_rx, &report_rx, start, total)
        });

        self.enter(&mut phase, CoordinatorPhase::Done);
        self.report_progress(start, total);

        let stats = RunStats {
            attempts: self.state.attempts(),
            elapsed: start.elapsed(),
            workers,
            partitions: partition_count,
            failed_partitions,
        };

        let result = match self.state.found() {
            Some(password) => {
                let persist_warning = match store.persist(&password) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!(error = %e, "Password found but could not be saved");
                        Some(format!("Failed to save password: {}", e))
                    }
                };

                info!(
                    attempts = stats.attempts,
                    elapsed_secs = format_args!("{:.2}", stats.elapsed.as_secs_f64()),
                    "Password found"
                );

                RunResult::Found {
                    password,
                    stats,
                    persist_warning,
                }
            }
            None if self.state.is_cancelled() => {
                info!(attempts = stats.attempts, "Search stopped before completion");
                RunResult::Stopped { stats }
            }
            None => {
                info!(attempts = stats.attempts, "Search space exhausted");
                RunResult::Exhausted { stats }
            }
        };

        Ok(result)
    }

    /// Coordinator loop: gather worker reports until every worker has returned
    fn collect(
        &self,
        phase: &mut CoordinatorPhase,
        feeder: &mut Feeder<'_>,
        tasks: &Receiver<Partition>,
        reports: &Receiver<WorkerReport>,
        start: Instant,
        total: u64,
    ) -> usize {
        let interval = self.config.progress_interval();
        let mut next_report = start + interval;
        let mut failed = 0;

        loop {
            if self.state.is_cancelled() && *phase != CoordinatorPhase::Cancelling {
                // Withdraw everything not yet handed to a worker
                feeder.close();
                let withdrawn = tasks.try_iter().count();
                debug!(withdrawn, "Cancelling queued partitions");
                self.enter(phase, CoordinatorPhase::Cancelling);
            } else {
                feeder.fill();
                if *phase == CoordinatorPhase::Dispatching && feeder.is_closed() && tasks.is_empty() {
                    self.enter(phase, CoordinatorPhase::Draining);
                }
            }

            let timeout = next_report.saturating_duration_since(Instant::now());
            match reports.recv_timeout(timeout) {
                Ok(WorkerReport::Finished {
                    worker,
                    partition,
                    found,
                }) => {
                    debug!(worker, partition = %partition, "Partition finished");
                    if let Some(password) = found {
                        info!(worker, partition = %partition, "Worker claimed password");
                        self.emit(CrackProgress::Found(password));
                    }
                }
                Ok(WorkerReport::Failed {
                    worker,
                    partition,
                    reason,
                }) => {
                    failed += 1;
                    warn!(worker, partition = %partition, reason = %reason, "Partition failed");
                    self.emit(CrackProgress::WorkerError { partition, reason });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if now >= next_report {
                self.report_progress(start, total);
                next_report = now + interval;
            }
        }

        if self.state.is_cancelled() {
            self.enter(phase, CoordinatorPhase::Cancelling);
        }

        failed
    }
}
