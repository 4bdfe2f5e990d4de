//! Frame-tick drivers for asynchronous batch flushing
//!
//! An `Async` batch does not flush when its scope ends; it asks the
//! thread's [`TickDriver`] for a tick and flushes then. The default driver is
//! [`ManualTicks`], which queues ticks until [`run_pending_ticks`] is called
//! (an event loop calls it once per frame). [`TokioTicks`] hands ticks to
//! the tokio `LocalSet` the caller is running in.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Deferred callback run on the next tick
pub type Tick = Box<dyn FnOnce()>;

/// Source of "next frame" callbacks
pub trait TickDriver {
    /// Run `tick` at the next frame boundary
    fn request_tick(&self, tick: Tick);
}

/// Queues ticks until they are run explicitly
#[derive(Default)]
pub struct ManualTicks {
    queue: RefCell<VecDeque<Tick>>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every queued tick, including ticks queued while running. Returns the count.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(tick) => {
                    tick();
                    ran += 1;
                }
                None => break,
            }
        }
        if ran > 0 {
            trace!(ticks = ran, "ran pending ticks");
        }
        ran
    }

    /// Number of ticks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl TickDriver for ManualTicks {
    fn request_tick(&self, tick: Tick) {
        self.queue.borrow_mut().push_back(tick);
    }
}

impl fmt::Debug for ManualTicks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTicks")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Runs ticks as local tokio tasks after yielding once.
///
/// Must be used from inside a `tokio::task::LocalSet`; `spawn_local` panics
/// anywhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTicks;

impl TickDriver for TokioTicks {
    fn request_tick(&self, tick: Tick) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            tick();
        });
    }
}

thread_local! {
    static MANUAL: Rc<ManualTicks> = Rc::new(ManualTicks::new());
    static DRIVER: RefCell<Option<Rc<dyn TickDriver>>> = const { RefCell::new(None) };
    static GENERATION: Cell<u64> = const { Cell::new(0) };
}

/// The driver installed on this thread, [`ManualTicks`] unless replaced
pub fn tick_driver() -> Rc<dyn TickDriver> {
    DRIVER
        .with(|driver| driver.borrow().clone())
        .unwrap_or_else(|| MANUAL.with(|manual| manual.clone() as Rc<dyn TickDriver>))
}

/// Install a driver for this thread, returning the previous one
pub fn set_tick_driver(driver: Rc<dyn TickDriver>) -> Rc<dyn TickDriver> {
    let previous = tick_driver();
    DRIVER.with(|slot| *slot.borrow_mut() = Some(driver));
    bump_generation();
    previous
}

/// Go back to the thread's built-in [`ManualTicks`]
pub fn reset_tick_driver() {
    DRIVER.with(|slot| *slot.borrow_mut() = None);
    bump_generation();
}

/// Changes every time the thread's driver is replaced
pub(crate) fn driver_generation() -> u64 {
    GENERATION.with(Cell::get)
}

fn bump_generation() {
    GENERATION.with(|generation| generation.set(generation.get().wrapping_add(1)));
    trace!(generation = driver_generation(), "tick driver replaced");
}

/// Run the ticks queued on the thread's built-in [`ManualTicks`]
pub fn run_pending_ticks() -> usize {
    let manual = MANUAL.with(Rc::clone);
    manual.run_pending()
}
