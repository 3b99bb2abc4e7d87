//! The background thread that runs solver jobs.
//!
//! There is one worker thread and one job slot. A caller whose budget runs
//! out leaves its job running, and the slot stays taken until that job
//! finishes; later callers wait for the slot within their own budget. At most
//! one solve is ever in progress, however many requests time out.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Budgets are capped at one hour.
const MAX_BUDGET: Duration = Duration::from_secs(3600);

type Job = Box<dyn FnOnce() + Send + 'static>;

static WORKER: Mutex<Option<Sender<Job>>> = Mutex::new(None);
static SLOT: Slot = Slot::new();

struct Slot {
    busy: Mutex<bool>,
    freed: Condvar,
}

impl Slot {
    const fn new() -> Self {
        Self {
            busy: Mutex::new(false),
            freed: Condvar::new(),
        }
    }
}

/// Holds the job slot. Dropping it frees the slot, also during a panic.
struct BusyGuard;

impl BusyGuard {
    /// Wait until the slot is free or `deadline` passes.
    fn acquire(deadline: Instant) -> Option<Self> {
        let mut busy = SLOT.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while *busy {
            let left = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())?;
            let (guard, _) = SLOT
                .freed
                .wait_timeout(busy, left)
                .unwrap_or_else(PoisonError::into_inner);
            busy = guard;
        }
        *busy = true;
        Some(BusyGuard)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *SLOT.busy.lock().unwrap_or_else(PoisonError::into_inner) = false;
        SLOT.freed.notify_one();
    }
}

/// How a budgeted job ended, from the caller's point of view.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Budgeted<T> {
    Done(T),
    /// An earlier job held the slot for the whole budget.
    Busy,
    /// The job was still running when the budget ran out.
    TimedOut,
    /// The job panicked.
    Failed,
}

/// Run `task` on the worker thread and wait at most `budget` for it,
/// including any wait for the slot.
pub(crate) fn run<T, F>(budget: Duration, task: F) -> io::Result<Budgeted<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let deadline = Instant::now() + budget.min(MAX_BUDGET);
    let Some(guard) = BusyGuard::acquire(deadline) else {
        return Ok(Budgeted::Busy);
    };

    let (tx, rx) = mpsc::channel();
    submit(Box::new(move || {
        let result = catch_unwind(AssertUnwindSafe(task)).ok();
        drop(guard);
        // The caller is gone if its budget already ran out.
        let _ = tx.send(result);
    }))?;

    let left = deadline.saturating_duration_since(Instant::now());
    Ok(match rx.recv_timeout(left) {
        Ok(Some(value)) => Budgeted::Done(value),
        Ok(None) | Err(RecvTimeoutError::Disconnected) => Budgeted::Failed,
        Err(RecvTimeoutError::Timeout) => Budgeted::TimedOut,
    })
}

/// Hand a job to the worker, starting it on first use or after it died.
fn submit(job: Job) -> io::Result<()> {
    let mut worker = WORKER.lock().unwrap_or_else(PoisonError::into_inner);
    let job = match worker.as_ref() {
        Some(tx) => match tx.send(job) {
            Ok(()) => return Ok(()),
            Err(mpsc::SendError(job)) => job,
        },
        None => job,
    };

    let tx = spawn()?;
    // A send failure drops the job, which frees the slot and disconnects
    // the caller.
    let _ = tx.send(job);
    *worker = Some(tx);
    Ok(())
}

fn spawn() -> io::Result<Sender<Job>> {
    let (tx, rx) = mpsc::channel::<Job>();
    thread::Builder::new()
        .name("optimizer".into())
        .spawn(move || {
            while let Ok(job) = rx.recv() {
                job();
            }
        })?;
    debug!("started solver worker");
    Ok(tx)
}
