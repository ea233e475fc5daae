//! Fixed-size worker pool.
//!
//! Tasks flow to workers over a bounded channel; each worker handles one file at a time and
//! reports its [`Outcome`] back over an unbounded channel so feeding never waits on collection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

use crate::organize::{Organizer, Outcome};
use crate::scan::AudioTask;

/// Tasks queued per worker before the feeder blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Shared stop request, raised by the interrupt handler.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub discovered: usize,
    pub moved: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Moved { .. } => self.moved += 1,
            Outcome::Planned { .. } => self.planned += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Tasks that reached a terminal outcome.
    pub fn processed(&self) -> usize {
        self.moved + self.planned + self.skipped + self.failed
    }
}

/// Running pool of `size` workers sharing one [`Organizer`].
pub struct WorkerPool {
    task_tx: Option<Sender<AudioTask>>,
    outcome_rx: Receiver<Outcome>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancelFlag,
}

impl WorkerPool {
    /// Spawn `size` named worker threads. Worker ids start at 1.
    pub fn spawn(size: usize, organizer: Organizer, cancel: CancelFlag) -> Result<Self> {
        let size = size.max(1);
        let (task_tx, task_rx) = bounded::<AudioTask>(size * QUEUE_DEPTH_PER_WORKER);
        let (outcome_tx, outcome_rx) = unbounded::<Outcome>();

        let mut workers = Vec::with_capacity(size);
        for id in 1..=size {
            let task_rx = task_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let organizer = organizer.clone();
            let cancel = cancel.clone();
            let handle = std::thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker_loop(id, &organizer, &task_rx, &outcome_tx, &cancel))
                .with_context(|| format!("spawn worker {id}"))?;
            workers.push(handle);
        }

        Ok(Self {
            task_tx: Some(task_tx),
            outcome_rx,
            workers,
            cancel,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue one task. Returns `false` once the pool stopped accepting work.
    pub fn submit(&self, task: AudioTask) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.task_tx.as_ref() {
            Some(tx) => tx.send(task).is_ok(),
            None => false,
        }
    }

    /// Close the queue, wait for every worker, and tally what they reported.
    pub fn join(mut self) -> Summary {
        drop(self.task_tx.take());

        let mut summary = Summary::default();
        for outcome in self.outcome_rx.iter() {
            summary.record(&outcome);
        }

        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "worker panicked");
            }
        }
        summary
    }
}

fn worker_loop(
    id: usize,
    organizer: &Organizer,
    tasks: &Receiver<AudioTask>,
    outcomes: &Sender<Outcome>,
    cancel: &CancelFlag,
) {
    let span = tracing::info_span!("worker", id);
    let _enter = span.enter();

    for task in tasks.iter() {
        if cancel.is_cancelled() {
            tracing::debug!("stop requested; abandoning queue");
            break;
        }
        let outcome = organizer.extract_and_move(&task.path, &task.root);
        outcome.log();
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

/// Feed every task to a pool of `size` workers and wait for all of them.
///
/// Stops submitting as soon as `cancel` is raised; already-queued tasks are abandoned.
pub fn process_all(
    tasks: Vec<AudioTask>,
    size: usize,
    organizer: Organizer,
    cancel: &CancelFlag,
) -> Result<Summary> {
    let discovered = tasks.len();
    let pool = WorkerPool::spawn(size, organizer, cancel.clone())?;

    for task in tasks {
        if !pool.submit(task) {
            break;
        }
    }

    let mut summary = pool.join();
    summary.discovered = discovered;
    Ok(summary)
}
