//! Shared ownership tokens with destructor callbacks.
//!
//! A [`ReferenceCount`] is the ownership primitive of the value model: a
//! strictly positive atomic counter paired with a destructor that runs
//! exactly once when the last holder releases its token. Cloning a token
//! increments the counter, dropping one decrements it.
//!
//! The counter is backed by [`Arc`], so increments and decrements are atomic
//! fetch-add/fetch-sub with release ordering on decrement and an acquire
//! fence before the destructor runs. The nullable handle of the interface
//! contract maps to `Option<ReferenceCount>`, for which clone and drop are
//! naturally no-ops on `None`.

use std::fmt;
use std::sync::Arc;

struct Finalizer {
    on_zero: Option<Box<dyn FnOnce()>>,
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        // Runs on the thread that releases the last token. The destructor
        // must not assume it runs where the token was created.
        if let Some(destructor) = self.on_zero.take() {
            destructor();
        }
    }
}

/// A counted ownership token.
///
/// The destructor passed to [`ReferenceCount::new`] is invoked exactly once,
/// when the last clone of the token is dropped.
#[derive(Clone)]
pub struct ReferenceCount {
    inner: Arc<Finalizer>,
}

impl ReferenceCount {
    /// Allocates a new token with counter 1.
    pub fn new(destructor: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Arc::new(Finalizer {
                on_zero: Some(Box::new(destructor)),
            }),
        }
    }

    /// Allocates a token with no destructor, useful as a pure pin.
    pub fn pinning_nothing() -> Self {
        Self {
            inner: Arc::new(Finalizer { on_zero: None }),
        }
    }

    /// Returns the number of live tokens sharing this counter.
    pub fn count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns `true` when both tokens share one counter.
    pub fn same_counter(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ReferenceCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCount")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn destructor_runs_once_at_zero() {
        let calls = Rc::new(Cell::new(0u32));
        let calls_in = calls.clone();

        let token = ReferenceCount::new(move || calls_in.set(calls_in.get() + 1));
        assert_eq!(token.count(), 1);

        let clone = token.clone();
        assert_eq!(token.count(), 2);

        drop(clone);
        assert_eq!(calls.get(), 0);
        assert_eq!(token.count(), 1);

        drop(token);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn increment_then_decrement_is_a_no_op() {
        let released = Rc::new(Cell::new(false));
        let released_in = released.clone();

        let token = ReferenceCount::new(move || released_in.set(true));
        let before = token.count();

        let clone = token.clone();
        drop(clone);

        assert_eq!(token.count(), before);
        assert!(!released.get());
    }

    #[test]
    fn null_handle_operations_are_no_ops() {
        let mut handle: Option<ReferenceCount> = None;
        // Clone and drop of a null handle must not do anything observable.
        let copy = handle.clone();
        assert!(copy.is_none());
        handle.take();
    }

    #[test]
    fn chained_destructors_terminate() {
        // A destructor that releases another token: the chain must unwind
        // without recursion problems for acyclic ownership.
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));

        let order_a = order.clone();
        let inner = ReferenceCount::new(move || order_a.borrow_mut().push("inner"));

        let order_b = order.clone();
        let outer = ReferenceCount::new(move || {
            order_b.borrow_mut().push("outer");
            drop(inner);
        });

        drop(outer);
        assert_eq!(*order.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn pin_token_counts() {
        let pin = ReferenceCount::pinning_nothing();
        let other = pin.clone();
        assert!(pin.same_counter(&other));
        assert_eq!(pin.count(), 2);
    }
}
