//! Counting traits: the policy a `RetainPtr` consults for every change to an object's count.

use base::fmt;
use base::marker::PhantomData;
use base::ptr::NonNull;

#[cfg(feature = "alloc")]
use base::prelude::v1::*;

use crate::clamp::{clamp_cast, Arithmetic};

pub(crate) mod private {
    pub trait Sealed {}

    /// Capability handed to count storage by the counting traits of this crate.
    ///
    /// Nothing outside the crate can construct one, so nothing outside the crate can touch an
    /// embedded count directly.
    #[derive(Clone, Copy)]
    pub struct Token(());

    impl Token {
        #[inline]
        pub(crate) const fn new() -> Self {
            Token(())
        }
    }
}

use private::Token;

/// Take over a share the caller already holds, leaving the count untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Adopt;

/// Acquire an additional share, incrementing the count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Retain;

/// The way a raw pointer enters a `RetainPtr`. Implemented by [`Adopt`] and [`Retain`] only.
pub trait Disposition: private::Sealed + Copy + Default {
    /// Whether entering a `RetainPtr` with this disposition increments the count.
    const RETAINS: bool;
}

impl private::Sealed for Adopt {}
impl private::Sealed for Retain {}

impl Disposition for Adopt {
    const RETAINS: bool = false;
}

impl Disposition for Retain {
    const RETAINS: bool = true;
}

/// Storage for an embedded reference count. Implemented by [`RefCount`](crate::RefCount) and
/// [`AtomicRefCount`](crate::AtomicRefCount) only.
///
/// All operations require a token that only this crate can mint.
pub trait CountStorage: private::Sealed {
    #[doc(hidden)]
    fn increment(&self, token: Token);

    /// Returns `true` if this released the last share.
    #[doc(hidden)]
    fn decrement(&self, token: Token) -> bool;

    #[doc(hidden)]
    fn load(&self, token: Token) -> isize;
}

/// An object that embeds its own reference count.
///
/// # Safety
///
/// `ref_count` must always return the same count, embedded in `self`. Objects managed through
/// [`DefaultTraits`] must live in a `Box` allocation, since the last decrement frees them as one.
///
/// # Examples
///
/// ```
/// use retain_ptr::{make_retain, RefCount, RefCounted};
///
/// struct Node {
///     count: RefCount,
///     value: u32,
/// }
///
/// unsafe impl RefCounted for Node {
///     type Counter = RefCount;
///
///     fn ref_count(&self) -> &RefCount {
///         &self.count
///     }
/// }
///
/// let node = make_retain(Node { count: RefCount::new(), value: 7 });
/// assert_eq!(node.value, 7);
/// assert_eq!(node.use_count(), 1);
/// ```
pub unsafe trait RefCounted {
    type Counter: CountStorage;

    fn ref_count(&self) -> &Self::Counter;
}

/// The representation a `RetainPtr` stores for its pointee.
///
/// # Safety
///
/// `from_non_null` followed by `into_non_null` must give back the original pointer, and the
/// other way around.
pub unsafe trait RawPointer<T: ?Sized>: Copy {
    fn into_non_null(self) -> NonNull<T>;

    /// # Safety
    ///
    /// `ptr` must be a pointer this representation can stand for.
    unsafe fn from_non_null(ptr: NonNull<T>) -> Self;
}

unsafe impl<T: ?Sized> RawPointer<T> for NonNull<T> {
    #[inline]
    fn into_non_null(self) -> NonNull<T> {
        self
    }

    #[inline]
    unsafe fn from_non_null(ptr: NonNull<T>) -> Self {
        ptr
    }
}

/// The integer type a policy reports use counts in, or [`Unsupported`].
pub trait UseCount: Copy {
    /// Whether the policy reports use counts at all.
    const SUPPORTED: bool;

    /// The count, saturated to the range of `isize`.
    fn to_isize(self) -> isize;
}

impl<N: Arithmetic> UseCount for N {
    const SUPPORTED: bool = true;

    #[inline]
    fn to_isize(self) -> isize {
        clamp_cast(self)
    }
}

/// Marks counting traits that cannot report how many shares an object has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unsupported;

impl UseCount for Unsupported {
    const SUPPORTED: bool = false;

    #[inline]
    fn to_isize(self) -> isize {
        -1
    }
}

/// How a `RetainPtr<T, Self>` counts shares of its pointee.
///
/// Implement this to put a `RetainPtr` around objects whose count lives somewhere this crate
/// does not know about, e.g. a foreign object with its own `add_ref`/`release` entry points.
///
/// # Safety
///
/// `increment` must add one share and `decrement` must remove one, disposing of the object once
/// no share is left. Both must be sound to call concurrently whenever `T: Sync`. If objects reach
/// these traits through [`make_retain_with_traits`](crate::make_retain_with_traits), they are
/// `Box` allocations.
pub unsafe trait RetainTraits<T: ?Sized> {
    /// The pointer representation stored and handed out by the `RetainPtr`.
    type Pointer: RawPointer<T>;

    /// What constructing from a bare pointer does: [`Adopt`] or [`Retain`].
    type DefaultAction: Disposition;

    /// The integer type `use_count` reports in, or [`Unsupported`].
    type Count: UseCount;

    /// # Safety
    ///
    /// `ptr` must point to a live object the caller holds a share of.
    unsafe fn increment(ptr: Self::Pointer);

    /// # Safety
    ///
    /// `ptr` must point to a live object, and the caller gives up one share of it.
    unsafe fn decrement(ptr: Self::Pointer);

    /// # Safety
    ///
    /// `ptr` must point to a live object the caller holds a share of.
    #[inline]
    unsafe fn use_count(ptr: Self::Pointer) -> Option<Self::Count> {
        let _ = ptr;
        None
    }
}

/// The counting traits used when a `RetainPtr` does not name any: they operate on the count of
/// any [`RefCounted`] object and free it as a `Box` when the count reaches zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DefaultTraits;

impl fmt::Debug for DefaultTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultTraits")
    }
}

#[cfg(feature = "alloc")]
unsafe impl<T: ?Sized + RefCounted> RetainTraits<T> for DefaultTraits {
    type Pointer = NonNull<T>;
    type DefaultAction = Adopt;
    type Count = isize;

    #[inline]
    unsafe fn increment(ptr: NonNull<T>) {
        unsafe { ptr.as_ref() }.ref_count().increment(Token::new());
    }

    #[inline]
    unsafe fn decrement(ptr: NonNull<T>) {
        if unsafe { ptr.as_ref() }.ref_count().decrement(Token::new()) {
            unsafe { destroy(ptr) };
        }
    }

    #[inline]
    unsafe fn use_count(ptr: NonNull<T>) -> Option<isize> {
        Some(unsafe { ptr.as_ref() }.ref_count().load(Token::new()))
    }
}

#[cfg(feature = "alloc")]
#[inline(never)]
unsafe fn destroy<T: ?Sized>(ptr: NonNull<T>) {
    log::trace!("last share released, destroying object at {:p}", ptr);
    // The count just reached zero, so nobody else can reach the object.
    drop(unsafe { Box::from_raw(ptr.as_ptr()) });
}

/// Marks counting traits `Self` as able to give up a share that `Q` acquired, and the other way
/// around. Every set of counting traits is compatible with itself.
///
/// # Safety
///
/// Both sets of traits must operate on the same count of the same object.
pub unsafe trait CompatibleTraits<Q: ?Sized> {}

unsafe impl<P: ?Sized> CompatibleTraits<P> for P {}

/// A zero-sized stand-in for counting traits bound to a single element type, for APIs that want
/// to carry a policy choice around as a value.
pub struct TraitsOf<T: ?Sized, P>(PhantomData<fn(&T) -> P>);

impl<T: ?Sized, P: RetainTraits<T>> TraitsOf<T, P> {
    pub const fn new() -> Self {
        TraitsOf(PhantomData)
    }

    /// Whether these traits report use counts.
    pub const fn has_use_count(&self) -> bool {
        <P::Count as UseCount>::SUPPORTED
    }

    /// Whether constructing from a bare pointer increments the count.
    pub const fn retains_by_default(&self) -> bool {
        <P::DefaultAction as Disposition>::RETAINS
    }
}
