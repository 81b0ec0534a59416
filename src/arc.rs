// The counting here follows the atomic strong count of the rust standard library Arc.

use base::fmt;
use base::sync::atomic;
use base::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crate::traits::private::{Sealed, Token};
use crate::traits::CountStorage;

/// A soft limit on the amount of shares that may be taken of an object.
///
/// Going above this limit will abort your program (although not
/// necessarily) at _exactly_ `MAX_REFCOUNT + 1` references.
const MAX_REFCOUNT: isize = isize::MAX;

macro_rules! acquire {
    ($x:expr) => {
        atomic::fence(Acquire)
    };
}

/// A thread-safe reference count, to be embedded in an object that a `RetainPtr` manages.
///
/// A fresh count starts at one: the share that the first `RetainPtr` adopts. Increments are
/// relaxed; the decrement that releases the last share synchronizes with every decrement before
/// it, so the object is destroyed only after all other holders are done with it. Only the
/// counting traits of this crate can read or change the count.
pub struct AtomicRefCount {
    strong: atomic::AtomicIsize,
}

impl AtomicRefCount {
    /// Creates a count of one.
    #[inline]
    pub const fn new() -> Self {
        AtomicRefCount { strong: atomic::AtomicIsize::new(1) }
    }
}

impl Default for AtomicRefCount {
    #[inline]
    fn default() -> Self {
        AtomicRefCount::new()
    }
}

impl Clone for AtomicRefCount {
    /// Creates a fresh count of one.
    ///
    /// A copy of an object is a new object, so it does not inherit the shares of the original.
    #[inline]
    fn clone(&self) -> Self {
        AtomicRefCount::new()
    }
}

impl fmt::Debug for AtomicRefCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AtomicRefCount { .. }")
    }
}

impl Sealed for AtomicRefCount {}

impl CountStorage for AtomicRefCount {
    #[inline]
    fn increment(&self, _: Token) {
        // Using a relaxed ordering is alright here, as knowledge of the
        // original reference prevents other threads from erroneously deleting
        // the object.
        //
        // As explained in the [Boost documentation][1], Increasing the
        // reference counter can always be done with memory_order_relaxed: New
        // references to an object can only be formed from an existing
        // reference, and passing an existing reference from one thread to
        // another must already provide any required synchronization.
        //
        // [1]: (www.boost.org/doc/libs/1_55_0/doc/html/atomic/usage_examples.html)
        let old_size = self.strong.fetch_add(1, Relaxed);

        // Guard against massive refcounts in case someone is leaking shares
        // through `release`. We racily saturate on the assumption that there
        // aren't ~2 billion threads incrementing the count at once.
        if old_size < 0 || old_size == MAX_REFCOUNT {
            panic!("reference count overflow");
        }
    }

    #[inline]
    fn decrement(&self, _: Token) -> bool {
        // Because `fetch_sub` is already atomic, we do not need to synchronize
        // with other threads unless we are going to delete the object.
        if self.strong.fetch_sub(1, Release) != 1 {
            return false;
        }

        // This fence is needed to prevent reordering of use of the data and
        // deletion of the data. Because it is marked `Release`, the decreasing
        // of the reference count synchronizes with this `Acquire` fence. This
        // means that use of the data happens before decreasing the reference
        // count, which happens before this fence, which happens before the
        // deletion of the data.
        acquire!(self.strong);
        true
    }

    #[inline]
    fn load(&self, _: Token) -> isize {
        self.strong.load(Relaxed)
    }
}
