//! Core primitives for the `canopy` state runtime.
//!
//! Everything the state layer is built from lives here, with no knowledge of
//! stores or domains:
//!
//! - **`events`**: the ordered [`Emitter`] and its [`Subscription`] handles.
//! - **`hook`**: [`Hook`], a dynamic-scope cell with stack-disciplined overrides.
//! - **`equality`**: named comparison strategies and the [`StructuralEq`] trait.
//! - **`scheduler`**: the notification scheduler hook and [`batch`].
//! - **`ticks`**: frame-tick drivers used by asynchronous batches.
//! - **`errors`**: the shared [`Error`] enum and [`Result`] alias.

pub mod equality;
pub mod errors;
pub mod events;
pub mod hook;
pub mod scheduler;
pub mod ticks;

pub use self::{
    equality::{eq_at_depth, Equality, EqualityStrategy, StructuralEq},
    errors::{Error, Result, ResultExt},
    events::{Emitter, Subscription},
    hook::{scoped, Hook, Release, Setup},
    scheduler::{batch, batch_with, flush_pending, is_batching, BatchMode, NotifyKey},
    ticks::{run_pending_ticks, set_tick_driver, ManualTicks, TickDriver, TokioTicks},
};
