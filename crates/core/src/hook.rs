//! Dynamic-scope cells
//!
//! A [`Hook`] holds a value that code further down the call stack reads
//! through [`Hook::current`]. Callers override it for the extent of a scope
//! by activating a [`Setup`], which pushes the new value and returns a
//! [`Release`] guard restoring the previous one. Guards restore on drop, so
//! the stack unwinds correctly through early returns and panics.
//!
//! Releases must happen in reverse activation order; [`scoped`] enforces that.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A mutable cell with scoped push/pop overrides
pub struct Hook<T> {
    slot: Rc<RefCell<T>>,
}

impl<T: Clone + 'static> Hook<T> {
    /// Create a hook holding `initial`
    pub fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
        }
    }

    /// The value visible at this point of the call stack
    pub fn current(&self) -> T {
        self.slot.borrow().clone()
    }

    /// Prepare an override. Nothing changes until the setup is activated.
    pub fn setup(&self, value: T) -> Setup {
        let slot = self.slot.clone();
        Setup::new(move || {
            let prior = std::mem::replace(&mut *slot.borrow_mut(), value);
            Release::new(move || {
                *slot.borrow_mut() = prior;
            })
        })
    }

    /// Run `f` with `value` installed
    pub fn with<R>(&self, value: T, f: impl FnOnce() -> R) -> R {
        scoped([self.setup(value)], f)
    }
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("current", &*self.slot.borrow())
            .finish()
    }
}

/// A pending override produced by [`Hook::setup`]
pub struct Setup {
    activate: Box<dyn FnOnce() -> Release>,
}

impl Setup {
    fn new(activate: impl FnOnce() -> Release + 'static) -> Self {
        Self {
            activate: Box::new(activate),
        }
    }

    /// Push the value, returning the guard that pops it
    pub fn activate(self) -> Release {
        (self.activate)()
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setup")
    }
}

/// Restores a hook's previous value when released or dropped
#[must_use = "dropping a Release immediately restores the previous value"]
pub struct Release {
    restore: Option<Box<dyn FnOnce()>>,
}

impl Release {
    fn new(restore: impl FnOnce() + 'static) -> Self {
        Self {
            restore: Some(Box::new(restore)),
        }
    }

    /// Restore the previous value now
    pub fn release(mut self) {
        self.restore_now();
    }

    fn restore_now(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.restore_now();
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("pending", &self.restore.is_some())
            .finish()
    }
}

/// Guards released newest-first on drop
struct ReleaseStack(Vec<Release>);

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        while let Some(release) = self.0.pop() {
            release.release();
        }
    }
}

/// Activate `setups` in order, run `f`, then release in reverse order.
///
/// Release happens on every exit path, including a panic in `f` or in one
/// of the later activations.
pub fn scoped<R>(setups: impl IntoIterator<Item = Setup>, f: impl FnOnce() -> R) -> R {
    let mut stack = ReleaseStack(Vec::new());
    for setup in setups {
        stack.0.push(setup.activate());
    }
    let out = f();
    drop(stack);
    out
}
