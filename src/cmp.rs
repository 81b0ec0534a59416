//! Comparison, hashing and formatting of `RetainPtr`s, all by the identity of the pointee.

use base::cmp::Ordering;
use base::fmt;
use base::hash::{Hash, Hasher};

use crate::retain::RetainPtr;
use crate::traits::RetainTraits;

impl<T, P, U, Q> PartialEq<RetainPtr<U, Q>> for RetainPtr<T, P>
where
    T: ?Sized,
    P: RetainTraits<T>,
    U: ?Sized,
    Q: RetainTraits<U>,
{
    /// Two `RetainPtr`s are equal if they point to the same address, or are both empty. The
    /// pointees are never compared.
    #[inline]
    fn eq(&self, other: &RetainPtr<U, Q>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Eq for RetainPtr<T, P> {}

impl<T, P, U, Q> PartialOrd<RetainPtr<U, Q>> for RetainPtr<T, P>
where
    T: ?Sized,
    P: RetainTraits<T>,
    U: ?Sized,
    Q: RetainTraits<U>,
{
    /// Orders by address; an empty `RetainPtr` comes before all others.
    #[inline]
    fn partial_cmp(&self, other: &RetainPtr<U, Q>) -> Option<Ordering> {
        Some(self.addr().cmp(&other.addr()))
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Ord for RetainPtr<T, P> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Hash for RetainPtr<T, P>
where
    P::Pointer: Hash,
{
    /// Hashes the address of the pointee, the same identity equality compares. Trait object
    /// metadata is left out, so equal handles hash equally whichever vtable they carry.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state)
    }
}

impl<T: ?Sized, P: RetainTraits<T>> fmt::Pointer for RetainPtr<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.addr(), f)
    }
}

impl<T: ?Sized, P: RetainTraits<T>> fmt::Debug for RetainPtr<T, P> {
    /// Writes the address of the pointee, like `{:p}` does for a raw pointer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.addr(), f)
    }
}
