//! Notification scheduling and batches
//!
//! Stores never fire their change listeners directly. They hand a keyed
//! [`Task`] to [`schedule`], which forwards it to whatever [`Scheduler`] the
//! thread's scheduler [`Hook`] currently holds:
//!
//! - outside a batch that is [`Immediate`], which runs the task on the spot;
//! - inside [`batch`] it is a deferring scheduler that queues tasks by key,
//!   so a store scheduling several times inside one batch fires once.
//!
//! When the outermost batch scope exits (normally or by unwinding) the
//! deferring scheduler is released and the queue is flushed, right away for
//! [`BatchMode::Sync`] or on the next frame tick for [`BatchMode::Async`].
//! Batches only defer *notifications*; state changes are visible at once.

use crate::errors::{Error, Result};
use crate::hook::{Hook, Release};
use crate::ticks::{driver_generation, tick_driver};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Identifies the source of a scheduled notification
pub type NotifyKey = u64;

/// A scheduled notification
pub type Task = Rc<dyn Fn()>;

static NEXT_NOTIFY_KEY: AtomicU64 = AtomicU64::new(1);

/// Allocate a key for a new notification source
pub fn next_notify_key() -> NotifyKey {
    NEXT_NOTIFY_KEY.fetch_add(1, Ordering::Relaxed)
}

/// Decides when a scheduled notification runs
pub trait Scheduler {
    fn schedule(&self, key: NotifyKey, task: Task);

    fn name(&self) -> &'static str;
}

/// Runs every task as soon as it is scheduled
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, _key: NotifyKey, task: Task) {
        task();
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// Queues tasks until the enclosing batch flushes
struct Deferring;

impl Scheduler for Deferring {
    fn schedule(&self, key: NotifyKey, task: Task) {
        PENDING.with(|pending| {
            pending.borrow_mut().insert(key, task);
        });
    }

    fn name(&self) -> &'static str {
        "deferring"
    }
}

thread_local! {
    static SCHEDULER: Hook<Rc<dyn Scheduler>> = Hook::new(Rc::new(Immediate));
    static PENDING: RefCell<IndexMap<NotifyKey, Task>> = RefCell::new(IndexMap::new());
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    /// Generation of the driver holding an unrun flush tick
    static TICK_REQUESTED: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Hand `task` to the active scheduler
pub fn schedule(key: NotifyKey, task: Task) {
    let scheduler = current_scheduler();
    scheduler.schedule(key, task);
}

/// The scheduler the hook currently holds
pub fn current_scheduler() -> Rc<dyn Scheduler> {
    SCHEDULER.with(Hook::current)
}

/// The thread's scheduler hook, for installing a custom scheduler in a scope
pub fn scheduler_hook() -> Hook<Rc<dyn Scheduler>> {
    SCHEDULER.with(Hook::clone)
}

/// Whether a batch scope is open on this thread
pub fn is_batching() -> bool {
    DEPTH.with(Cell::get) > 0
}

/// Number of notifications queued for the next flush
pub fn pending_notifications() -> usize {
    PENDING.with(|pending| pending.borrow().len())
}

/// When a finished batch delivers its queued notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Flush as soon as the outermost scope exits
    #[default]
    Sync,
    /// Flush on the next frame tick; batches before that tick share one flush
    Async,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchMode::Sync => f.write_str("sync"),
            BatchMode::Async => f.write_str("async"),
        }
    }
}

impl FromStr for BatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(BatchMode::Sync),
            "async" => Ok(BatchMode::Async),
            other => Err(Error::configuration(format!(
                "unknown batch mode '{other}' (expected sync or async)"
            ))),
        }
    }
}

/// Run `f` with change notifications deferred and coalesced, flushing synchronously
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    batch_with(BatchMode::Sync, f)
}

/// Run `f` with change notifications deferred and coalesced.
///
/// Only the outermost call installs the deferring scheduler and decides the
/// flush mode; nested calls just run `f`. If `f` returns a future, only its
/// construction happens inside the batch.
pub fn batch_with<R>(mode: BatchMode, f: impl FnOnce() -> R) -> R {
    let outermost = DEPTH.with(|depth| {
        let current = depth.get();
        depth.set(current + 1);
        current == 0
    });

    let _scope = if outermost {
        let deferring: Rc<dyn Scheduler> = Rc::new(Deferring);
        let release = SCHEDULER.with(|hook| hook.setup(deferring)).activate();
        trace!(%mode, "batch opened");
        BatchScope {
            release: Some(release),
            mode: Some(mode),
        }
    } else {
        BatchScope {
            release: None,
            mode: None,
        }
    };

    f()
}

/// Closes a batch level on every exit path
struct BatchScope {
    release: Option<Release>,
    mode: Option<BatchMode>,
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release.release();
        }
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));

        match self.mode {
            Some(BatchMode::Sync) => {
                flush_pending();
            }
            Some(BatchMode::Async) => request_flush_tick(),
            None => {}
        }
    }
}

fn request_flush_tick() {
    if pending_notifications() == 0 {
        return;
    }
    let generation = driver_generation();
    if TICK_REQUESTED.with(Cell::get) == Some(generation) {
        return;
    }

    TICK_REQUESTED.with(|requested| requested.set(Some(generation)));
    trace!(generation, "async flush requested");
    let claim = TickClaim { generation };
    tick_driver().request_tick(Box::new(move || {
        drop(claim);
        // An open batch flushes (or re-requests) when it closes.
        if !is_batching() {
            flush_pending();
        }
    }));
}

/// Holds the thread's outstanding flush request until its tick runs or is dropped unrun
struct TickClaim {
    generation: u64,
}

impl Drop for TickClaim {
    fn drop(&mut self) {
        TICK_REQUESTED.with(|requested| {
            if requested.get() == Some(self.generation) {
                requested.set(None);
            }
        });
    }
}

/// Deliver every queued notification, repeating until the queue is empty.
///
/// Returns how many notifications ran. Does nothing inside an open batch.
pub fn flush_pending() -> usize {
    if is_batching() {
        return 0;
    }

    let mut delivered = 0;
    loop {
        let tasks: Vec<Task> = PENDING.with(|pending| {
            pending
                .borrow_mut()
                .drain(..)
                .map(|(_, task)| task)
                .collect()
        });
        if tasks.is_empty() {
            break;
        }
        trace!(count = tasks.len(), "flushing deferred notifications");
        for task in tasks {
            task();
            delivered += 1;
        }
    }
    delivered
}
