// The counting here follows the non-atomic strong count of the rust standard library Rc.

use base::cell::Cell;
use base::fmt;

use crate::traits::private::{Sealed, Token};
use crate::traits::CountStorage;

/// A non-thread-safe reference count, to be embedded in an object that a `RetainPtr` manages.
///
/// A fresh count starts at one: the share that the first `RetainPtr` adopts. Since it is built on
/// a `Cell`, an object embedding it is not `Sync`, and neither are `RetainPtr`s to it `Send`.
/// Only the counting traits of this crate can read or change the count.
pub struct RefCount {
    strong: Cell<isize>,
}

impl RefCount {
    /// Creates a count of one.
    #[inline]
    pub const fn new() -> Self {
        RefCount { strong: Cell::new(1) }
    }
}

impl Default for RefCount {
    #[inline]
    fn default() -> Self {
        RefCount::new()
    }
}

impl Clone for RefCount {
    /// Creates a fresh count of one.
    ///
    /// A copy of an object is a new object, so it does not inherit the shares of the original.
    #[inline]
    fn clone(&self) -> Self {
        RefCount::new()
    }
}

impl fmt::Debug for RefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefCount { .. }")
    }
}

impl Sealed for RefCount {}

impl CountStorage for RefCount {
    #[inline]
    fn increment(&self, _: Token) {
        let strong = self.strong.get();

        // We want to abort on overflow instead of dropping the value.
        // The reference count will never be zero when this is called.
        if strong <= 0 || strong == isize::MAX {
            panic!("reference count overflow");
        }
        self.strong.set(strong + 1);
    }

    #[inline]
    fn decrement(&self, _: Token) -> bool {
        let strong = self.strong.get();
        debug_assert!(strong > 0, "decremented a released reference count");
        self.strong.set(strong - 1);
        strong == 1
    }

    #[inline]
    fn load(&self, _: Token) -> isize {
        self.strong.get()
    }
}
