use base::fmt;
use base::marker::PhantomData;
use base::mem;
use base::ops::{Deref, DerefMut};
use base::ptr::{self, NonNull};
use base::sync::atomic::{self, Ordering::Acquire};

#[cfg(feature = "alloc")]
use base::prelude::v1::*;

use crate::error::{RetainError, TryUniqueError};
use crate::traits::{DefaultTraits, Disposition, RawPointer, RetainTraits, UseCount};
#[cfg(feature = "alloc")]
use crate::traits::RefCounted;

/// A pointer that extends the lifetime of a self-disposing object.
///
/// A `RetainPtr` is either empty, or it holds exactly one share of the count embedded in its
/// pointee. Cloning takes another share, dropping gives the share back, and moving hands it over
/// untouched. How shares are counted is up to the counting traits `P`; by default that is
/// [`DefaultTraits`], which works with any object embedding a [`RefCount`](crate::RefCount) or an
/// [`AtomicRefCount`](crate::AtomicRefCount).
///
/// There is no implicit conversion to a raw pointer; use [`get`](RetainPtr::get) or
/// [`release`](RetainPtr::release) to get one explicitly.
///
/// # Examples
///
/// ```
/// use retain_ptr::{make_retain, AtomicRefCount, RefCounted, RetainPtr};
///
/// struct Config {
///     count: AtomicRefCount,
///     name: &'static str,
/// }
///
/// unsafe impl RefCounted for Config {
///     type Counter = AtomicRefCount;
///
///     fn ref_count(&self) -> &AtomicRefCount {
///         &self.count
///     }
/// }
///
/// let first = make_retain(Config { count: AtomicRefCount::new(), name: "prod" });
/// let second = first.clone();
/// assert_eq!(first.use_count(), 2);
///
/// let third = second;
/// assert_eq!(third.use_count(), 2);
///
/// drop(first);
/// assert_eq!(third.use_count(), 1);
/// assert_eq!(third.name, "prod");
/// ```
pub struct RetainPtr<T: ?Sized, P: RetainTraits<T> = DefaultTraits> {
    ptr: Option<P::Pointer>,
    phantom: PhantomData<T>,
    traits: PhantomData<fn() -> P>,
}

unsafe impl<T: ?Sized + Sync + Send, P: RetainTraits<T>> Send for RetainPtr<T, P> {}
unsafe impl<T: ?Sized + Sync + Send, P: RetainTraits<T>> Sync for RetainPtr<T, P> {}

impl<T: ?Sized, P: RetainTraits<T>> RetainPtr<T, P> {
    /// Creates an empty `RetainPtr`.
    #[inline]
    pub const fn null() -> Self {
        RetainPtr { ptr: None, phantom: PhantomData, traits: PhantomData }
    }

    /// Creates a `RetainPtr` that takes over the share `ptr` already stands for, leaving the
    /// count untouched.
    ///
    /// # Safety
    ///
    /// If `ptr` is `Some`, it must point to a live object, and the caller must hold a share of it
    /// that nothing else will give back (e.g. the initial share of a freshly created object, or one
    /// obtained from [`release`](RetainPtr::release)).
    #[inline]
    pub unsafe fn adopt(ptr: Option<P::Pointer>) -> Self {
        RetainPtr { ptr, phantom: PhantomData, traits: PhantomData }
    }

    /// Creates a `RetainPtr` that takes an additional share of `ptr`, incrementing its count if it
    /// is `Some`.
    ///
    /// # Safety
    ///
    /// If `ptr` is `Some`, it must point to a live object that is kept alive by a share held
    /// elsewhere.
    #[inline]
    pub unsafe fn retain(ptr: Option<P::Pointer>) -> Self {
        if let Some(ptr) = ptr {
            unsafe { P::increment(ptr) };
        }
        unsafe { Self::adopt(ptr) }
    }

    /// Creates a `RetainPtr` by adopting or retaining `ptr`, as `disposition` says.
    ///
    /// # Safety
    ///
    /// The requirements of [`adopt`](RetainPtr::adopt) or [`retain`](RetainPtr::retain) apply,
    /// depending on `disposition`.
    #[inline]
    pub unsafe fn with_disposition<D: Disposition>(
        ptr: Option<P::Pointer>,
        disposition: D,
    ) -> Self {
        let _ = disposition;
        if D::RETAINS {
            unsafe { Self::retain(ptr) }
        } else {
            unsafe { Self::adopt(ptr) }
        }
    }

    /// Creates a `RetainPtr` from `ptr` with the default action of the counting traits: adopting
    /// for [`DefaultTraits`].
    ///
    /// # Safety
    ///
    /// The requirements of [`adopt`](RetainPtr::adopt) or [`retain`](RetainPtr::retain) apply,
    /// depending on `P::DefaultAction`.
    #[inline]
    pub unsafe fn from_raw(ptr: Option<P::Pointer>) -> Self {
        unsafe { Self::with_disposition(ptr, P::DefaultAction::default()) }
    }

    /// Returns the stored pointer without affecting ownership.
    #[inline]
    pub fn get(&self) -> Option<P::Pointer> {
        self.ptr
    }

    /// Returns the address of the pointee, or a null pointer if empty.
    #[inline]
    pub fn addr(&self) -> *const () {
        match self.ptr {
            Some(ptr) => ptr.into_non_null().as_ptr() as *const (),
            None => ptr::null(),
        }
    }

    /// Returns `true` if this `RetainPtr` holds no share.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Returns `true` if this `RetainPtr` holds a share of an object.
    #[inline]
    pub fn is_owning(&self) -> bool {
        self.ptr.is_some()
    }

    /// Returns a reference to the pointee, or [`RetainError::Empty`].
    #[inline]
    pub fn try_get(&self) -> Result<&T, RetainError> {
        match self.ptr {
            // The share held by `self` keeps the object alive for as long as `self` is borrowed.
            Some(ptr) => Ok(unsafe { ptr.into_non_null().as_ref() }),
            None => Err(RetainError::Empty),
        }
    }

    /// Returns a reference to the pointee without checking for emptiness.
    ///
    /// # Safety
    ///
    /// `self` must not be empty.
    #[inline]
    pub unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_owning());
        match self.ptr {
            Some(ptr) => unsafe { ptr.into_non_null().as_ref() },
            None => unsafe { base::hint::unreachable_unchecked() },
        }
    }

    /// The number of shares of the pointee.
    ///
    /// Returns `0` if empty and `-1` if the counting traits do not report counts. Counts beyond
    /// `isize::MAX` saturate.
    #[inline]
    pub fn use_count(&self) -> isize {
        if !<P::Count as UseCount>::SUPPORTED {
            return -1;
        }
        match self.ptr {
            Some(ptr) => match unsafe { P::use_count(ptr) } {
                Some(count) => count.to_isize(),
                None => -1,
            },
            None => 0,
        }
    }

    /// Returns `true` if the counting traits report that `self` holds the only share.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    /// Gives up ownership without touching the count, leaving `self` empty.
    ///
    /// The caller becomes responsible for the share: it has to be given back, e.g. by adopting the
    /// pointer into a new `RetainPtr`, or the object leaks.
    #[inline]
    #[must_use = "losing the pointer leaks the share it stands for"]
    pub fn release(&mut self) -> Option<P::Pointer> {
        self.ptr.take()
    }

    /// Like [`release`](RetainPtr::release), consuming `self`.
    #[inline]
    #[must_use = "losing the pointer leaks the share it stands for"]
    pub fn into_raw(mut self) -> Option<P::Pointer> {
        self.release()
    }

    /// Empties `self`, giving back its share.
    #[inline]
    pub fn reset(&mut self) {
        if let Some(old) = self.ptr.take() {
            unsafe { P::decrement(old) };
        }
    }

    /// Replaces the pointee by `ptr`, adopting or retaining it as `disposition` says, and gives
    /// back the share of the previous pointee.
    ///
    /// # Safety
    ///
    /// Same as [`with_disposition`](RetainPtr::with_disposition).
    #[inline]
    pub unsafe fn reset_with<D: Disposition>(&mut self, ptr: Option<P::Pointer>, disposition: D) {
        *self = unsafe { Self::with_disposition(ptr, disposition) };
    }

    /// Replaces the pointee by `ptr` with the default action of the counting traits.
    ///
    /// # Safety
    ///
    /// Same as [`from_raw`](RetainPtr::from_raw).
    #[inline]
    pub unsafe fn reset_to(&mut self, ptr: Option<P::Pointer>) {
        *self = unsafe { Self::from_raw(ptr) };
    }

    /// Exchanges the pointees of `self` and `other`. No count changes.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
    }

    /// Empties `self`, returning what it held. No count changes.
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::null())
    }

    /// Returns a mutable reference to the pointee if `self` holds its only share.
    ///
    /// Returns `None` if the counting traits do not report counts.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_unique() {
            // Pairs with the release decrements of the shares given back before.
            atomic::fence(Acquire);
            self.ptr.map(|ptr| unsafe { &mut *ptr.into_non_null().as_ptr() })
        } else {
            None
        }
    }

    /// Turns `self` into a [`UniqueRetain`] if it holds the only share of its pointee.
    ///
    /// # Errors
    ///
    /// Hands `self` back if it is empty, shared, or its counting traits do not report counts.
    pub fn try_into_unique(self) -> Result<UniqueRetain<T, P>, TryUniqueError<T, P>> {
        let error = match self.use_count() {
            1 => {
                atomic::fence(Acquire);
                return Ok(UniqueRetain(self));
            }
            0 => RetainError::Empty,
            -1 => RetainError::UseCountUnsupported,
            n => RetainError::Shared(n),
        };
        Err(TryUniqueError::new(self, error))
    }

    /// Turns `self` into a [`UniqueRetain`] without checking the count.
    ///
    /// # Safety
    ///
    /// `self` must not be empty, and no other share of the pointee may be used for as long as the
    /// `UniqueRetain` lives.
    #[inline]
    pub unsafe fn into_unique_unchecked(self) -> UniqueRetain<T, P> {
        debug_assert!(self.is_owning());
        UniqueRetain(self)
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Clone for RetainPtr<T, P> {
    /// Makes another `RetainPtr` to the same object, taking an additional share.
    #[inline]
    fn clone(&self) -> Self {
        unsafe { Self::retain(self.ptr) }
    }

    /// Takes a share of `source`'s pointee before giving back the share of the current one, so
    /// that assigning a `RetainPtr` to itself, or to another to the same object, never destroys it.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        if let Some(ptr) = source.ptr {
            unsafe { P::increment(ptr) };
        }
        if let Some(old) = mem::replace(&mut self.ptr, source.ptr) {
            unsafe { P::decrement(old) };
        }
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Drop for RetainPtr<T, P> {
    /// Gives back the share held by this `RetainPtr`, if any.
    ///
    /// If that was the last share, the counting traits dispose of the object.
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Default for RetainPtr<T, P> {
    /// Creates an empty `RetainPtr`.
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Deref for RetainPtr<T, P> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if `self` is empty.
    #[inline]
    #[track_caller]
    fn deref(&self) -> &T {
        match self.ptr {
            Some(ptr) => unsafe { ptr.into_non_null().as_ref() },
            None => deref_empty(),
        }
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn deref_empty() -> ! {
    panic!("dereferenced an empty RetainPtr")
}

/// Exchanges the pointees of `a` and `b`. No count changes.
#[inline]
pub fn swap<T: ?Sized, P: RetainTraits<T>>(a: &mut RetainPtr<T, P>, b: &mut RetainPtr<T, P>) {
    a.swap(b);
}

/// Moves `value` into a new allocation and returns a `RetainPtr` adopting its initial share.
///
/// # Examples
///
/// ```
/// use retain_ptr::{make_retain, RefCount, RefCounted};
///
/// #[derive(Default)]
/// struct Buffer {
///     count: RefCount,
///     bytes: Vec<u8>,
/// }
///
/// unsafe impl RefCounted for Buffer {
///     type Counter = RefCount;
///
///     fn ref_count(&self) -> &RefCount {
///         &self.count
///     }
/// }
///
/// let buffer = make_retain(Buffer::default());
/// assert!(buffer.is_owning());
/// assert_eq!(buffer.use_count(), 1);
/// assert!(buffer.bytes.is_empty());
/// ```
#[cfg(feature = "alloc")]
#[inline]
pub fn make_retain<T: RefCounted>(value: T) -> RetainPtr<T> {
    make_retain_with_traits(value)
}

/// Like [`make_retain`], with explicitly chosen counting traits.
///
/// The traits must dispose of the object as the `Box` allocation it is.
#[cfg(feature = "alloc")]
#[inline]
pub fn make_retain_with_traits<T, P: RetainTraits<T>>(value: T) -> RetainPtr<T, P> {
    let ptr = NonNull::from(Box::leak(Box::new(value)));
    // A new object starts out with the one share we adopt here.
    unsafe { RetainPtr::adopt(Some(P::Pointer::from_non_null(ptr))) }
}

/// A `RetainPtr` known to hold the only share of its pointee, which it can therefore mutate.
pub struct UniqueRetain<T: ?Sized, P: RetainTraits<T> = DefaultTraits>(RetainPtr<T, P>);

unsafe impl<T: ?Sized + Sync + Send, P: RetainTraits<T>> Send for UniqueRetain<T, P> {}
unsafe impl<T: ?Sized + Sync + Send, P: RetainTraits<T>> Sync for UniqueRetain<T, P> {}

#[cfg(feature = "alloc")]
impl<T: RefCounted> UniqueRetain<T> {
    /// Moves `value` into a new allocation, owned by the returned `UniqueRetain` alone.
    #[inline]
    pub fn new(value: T) -> Self {
        UniqueRetain(make_retain(value))
    }
}

impl<T: ?Sized, P: RetainTraits<T>> UniqueRetain<T, P> {
    /// Gives up exclusive access, returning a `RetainPtr` that can be cloned again.
    #[inline]
    pub fn share(self) -> RetainPtr<T, P> {
        self.0
    }
}

impl<T: ?Sized, P: RetainTraits<T>> Deref for UniqueRetain<T, P> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.0.get_unchecked() }
    }
}

impl<T: ?Sized, P: RetainTraits<T>> DerefMut for UniqueRetain<T, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // We know this to be uniquely owned
        match self.0.ptr {
            Some(ptr) => unsafe { &mut *ptr.into_non_null().as_ptr() },
            None => deref_empty(),
        }
    }
}

impl<T: ?Sized, P: RetainTraits<T>> From<UniqueRetain<T, P>> for RetainPtr<T, P> {
    #[inline]
    fn from(unique: UniqueRetain<T, P>) -> Self {
        unique.share()
    }
}

impl<T: ?Sized, P: RetainTraits<T>> fmt::Pointer for UniqueRetain<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

impl<T: ?Sized, P: RetainTraits<T>> fmt::Debug for UniqueRetain<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

/// Implemented by [`RetainPtr`] and references to it, for generic code that has to tell those
/// apart from other pointers. See also [`is_retain_ptr!`](crate::is_retain_ptr).
pub trait RetainPointer {
    type Element: ?Sized;
    type Traits: RetainTraits<Self::Element>;
}

impl<T: ?Sized, P: RetainTraits<T>> RetainPointer for RetainPtr<T, P> {
    type Element = T;
    type Traits = P;
}

impl<'a, R: RetainPointer + ?Sized> RetainPointer for &'a R {
    type Element = R::Element;
    type Traits = R::Traits;
}

impl<'a, R: RetainPointer + ?Sized> RetainPointer for &'a mut R {
    type Element = R::Element;
    type Traits = R::Traits;
}

#[doc(hidden)]
pub struct Probe<X: ?Sized>(PhantomData<fn(&X)>);

impl<X: ?Sized> Probe<X> {
    #[doc(hidden)]
    pub const fn new() -> Self {
        Probe(PhantomData)
    }
}

#[doc(hidden)]
pub trait ProbeRetain {
    fn is_retain_ptr(&self) -> bool {
        true
    }
}

impl<X: RetainPointer + ?Sized> ProbeRetain for Probe<X> {}

#[doc(hidden)]
pub trait ProbeOther {
    fn is_retain_ptr(&self) -> bool {
        false
    }
}

impl<X: ?Sized> ProbeOther for &Probe<X> {}

/// Evaluates to `true` if the given type is a [`RetainPtr`] or a reference to one.
///
/// # Examples
///
/// ```
/// use retain_ptr::{is_retain_ptr, RefCount, RefCounted, RetainPtr};
///
/// struct Leaf(RefCount);
///
/// unsafe impl RefCounted for Leaf {
///     type Counter = RefCount;
///
///     fn ref_count(&self) -> &RefCount {
///         &self.0
///     }
/// }
///
/// assert!(is_retain_ptr!(RetainPtr<Leaf>));
/// assert!(is_retain_ptr!(&RetainPtr<Leaf>));
/// assert!(!is_retain_ptr!(Box<Leaf>));
/// ```
#[macro_export]
macro_rules! is_retain_ptr {
    ($t:ty) => {{
        #[allow(unused_imports)]
        use $crate::{ProbeOther as _, ProbeRetain as _};
        (&$crate::Probe::<$t>::new()).is_retain_ptr()
    }};
}
