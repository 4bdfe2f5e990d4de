//! Subscription handles returned by emitters

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Cancel = Box<dyn FnOnce()>;

/// Handle to a registered listener.
///
/// Cloning shares the handle. `unsubscribe` is idempotent: the first call
/// detaches the listener, later calls do nothing. Dropping the handle does
/// **not** unsubscribe; listeners live until removed or their emitter clears.
#[derive(Clone)]
pub struct Subscription {
    cancel: Rc<RefCell<Option<Cancel>>>,
}

impl Subscription {
    /// Wrap a cancellation callback
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Rc::new(RefCell::new(Some(Box::new(cancel)))),
        }
    }

    /// A handle with nothing to cancel
    pub fn noop() -> Self {
        Self {
            cancel: Rc::new(RefCell::new(None)),
        }
    }

    /// Combine several handles into one that cancels all of them in order
    pub fn all(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
        })
    }

    /// Detach the listener
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether `unsubscribe` still has work to do
    pub fn is_active(&self) -> bool {
        self.cancel.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
