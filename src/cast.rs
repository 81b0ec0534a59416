//! Conversions between `RetainPtr`s to related types.
//!
//! Every cast comes in a copying form, which takes `&self` and a new share for the result, and a
//! consuming form, which moves the share of `self` into the result and leaves the count alone.

use base::any::Any;
use base::ptr::NonNull;

use crate::retain::RetainPtr;
use crate::traits::{CompatibleTraits, RawPointer, RetainTraits};

/// `Self` is a more specific kind of `Base`: trait objects and the types implementing them.
///
/// # Safety
///
/// `upcast` must return a pointer to the same address, whose count is the one of `Self`, so that
/// a share taken through one pointer can be given back through the other, including the last one.
pub unsafe trait DerivedFrom<Base: ?Sized> {
    fn upcast(ptr: NonNull<Self>) -> NonNull<Base>;
}

unsafe impl<T: ?Sized> DerivedFrom<T> for T {
    #[inline]
    fn upcast(ptr: NonNull<T>) -> NonNull<T> {
        ptr
    }
}

/// Declares a type as derived from a trait object it implements.
///
/// # Examples
///
/// ```
/// use retain_ptr::{derived_from, make_retain, AsAny, AtomicRefCount, RefCounted, RetainPtr};
///
/// trait Shape: RefCounted<Counter = AtomicRefCount> + AsAny {
///     fn area(&self) -> f64;
/// }
///
/// struct Square {
///     count: AtomicRefCount,
///     side: f64,
/// }
///
/// unsafe impl RefCounted for Square {
///     type Counter = AtomicRefCount;
///
///     fn ref_count(&self) -> &AtomicRefCount {
///         &self.count
///     }
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// derived_from!(Square => dyn Shape);
///
/// let square = make_retain(Square { count: AtomicRefCount::new(), side: 2.0 });
/// let shape: RetainPtr<dyn Shape> = square.upcast();
/// assert_eq!(shape.area(), 4.0);
/// assert_eq!(square.use_count(), 2);
///
/// let back: RetainPtr<Square> = shape.dynamic_cast();
/// assert_eq!(back, square);
/// ```
#[macro_export]
macro_rules! derived_from {
    ($derived:ty => $base:ty) => {
        unsafe impl $crate::DerivedFrom<$base> for $derived {
            #[inline]
            fn upcast(ptr: ::core::ptr::NonNull<Self>) -> ::core::ptr::NonNull<$base> {
                ptr
            }
        }
    };
}

/// A view of an object as `dyn Any`, for checking its concrete type at runtime.
///
/// Implemented for every `'static` type; make it a supertrait of a trait to allow runtime checked
/// downcasts from its trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: ?Sized, P: RetainTraits<T>> RetainPtr<T, P> {
    #[inline]
    fn map_copied<U: ?Sized, Q>(&self, f: impl FnOnce(NonNull<T>) -> NonNull<U>) -> RetainPtr<U, Q>
    where
        Q: RetainTraits<U>,
    {
        match self.get() {
            Some(ptr) => {
                unsafe { P::increment(ptr) };
                let target = f(ptr.into_non_null());
                unsafe { RetainPtr::adopt(Some(Q::Pointer::from_non_null(target))) }
            }
            None => RetainPtr::null(),
        }
    }

    #[inline]
    fn map_moved<U: ?Sized, Q>(
        mut self,
        f: impl FnOnce(NonNull<T>) -> NonNull<U>,
    ) -> RetainPtr<U, Q>
    where
        Q: RetainTraits<U>,
    {
        match self.release() {
            Some(ptr) => {
                let target = f(ptr.into_non_null());
                unsafe { RetainPtr::adopt(Some(Q::Pointer::from_non_null(target))) }
            }
            None => RetainPtr::null(),
        }
    }

    /// Returns a `RetainPtr` to `self`'s pointee as a `B`, taking another share.
    #[inline]
    pub fn upcast<B: ?Sized, Q>(&self) -> RetainPtr<B, Q>
    where
        T: DerivedFrom<B>,
        Q: RetainTraits<B> + CompatibleTraits<P>,
    {
        self.map_copied(<T as DerivedFrom<B>>::upcast)
    }

    /// Converts `self` into a `RetainPtr` to its pointee as a `B`, moving its share.
    #[inline]
    pub fn into_upcast<B: ?Sized, Q>(self) -> RetainPtr<B, Q>
    where
        T: DerivedFrom<B>,
        Q: RetainTraits<B> + CompatibleTraits<P>,
    {
        self.map_moved(<T as DerivedFrom<B>>::upcast)
    }

    /// Points `self` at `source`'s pointee, taking a share of it before giving back the share of
    /// the current pointee.
    #[inline]
    pub fn clone_from_derived<U: ?Sized, Q>(&mut self, source: &RetainPtr<U, Q>)
    where
        U: DerivedFrom<T>,
        Q: RetainTraits<U>,
        P: CompatibleTraits<Q>,
    {
        *self = source.upcast();
    }

    /// Returns a `RetainPtr` to `self`'s pointee as a `U`, taking another share, without checking
    /// that it actually is one.
    ///
    /// # Safety
    ///
    /// The pointee must be a `U`.
    #[inline]
    pub unsafe fn static_downcast<U, Q>(&self) -> RetainPtr<U, Q>
    where
        U: DerivedFrom<T>,
        Q: RetainTraits<U> + CompatibleTraits<P>,
    {
        self.map_copied(NonNull::cast)
    }

    /// Converts `self` into a `RetainPtr` to its pointee as a `U`, moving its share, without
    /// checking that it actually is one.
    ///
    /// # Safety
    ///
    /// The pointee must be a `U`.
    #[inline]
    pub unsafe fn into_static_downcast<U, Q>(self) -> RetainPtr<U, Q>
    where
        U: DerivedFrom<T>,
        Q: RetainTraits<U> + CompatibleTraits<P>,
    {
        self.map_moved(NonNull::cast)
    }

    /// Returns a `RetainPtr` to `self`'s pointee as a `U` if it is one, taking another share.
    /// Otherwise returns an empty `RetainPtr` and leaves the count alone.
    #[inline]
    pub fn dynamic_cast<U, Q>(&self) -> RetainPtr<U, Q>
    where
        T: AsAny,
        U: DerivedFrom<T> + Any,
        Q: RetainTraits<U> + CompatibleTraits<P>,
    {
        if self.is::<U>() {
            self.map_copied(NonNull::cast)
        } else {
            if self.is_owning() {
                log::debug!("{:p} is not a {}", self.addr(), base::any::type_name::<U>());
            }
            RetainPtr::null()
        }
    }

    /// Converts `self` into a `RetainPtr` to its pointee as a `U` if it is one, moving its share.
    /// Otherwise gives back the share of `self` and returns an empty `RetainPtr`.
    #[inline]
    pub fn into_dynamic_cast<U, Q>(self) -> RetainPtr<U, Q>
    where
        T: AsAny,
        U: DerivedFrom<T> + Any,
        Q: RetainTraits<U> + CompatibleTraits<P>,
    {
        match self.try_downcast() {
            Ok(ptr) => ptr,
            Err(ptr) => {
                if ptr.is_owning() {
                    log::trace!(
                        "{:p} is not a {}, releasing its share",
                        ptr.addr(),
                        base::any::type_name::<U>()
                    );
                }
                RetainPtr::null()
            }
        }
    }

    /// Converts `self` into a `RetainPtr` to its pointee as a `U` if it is one, moving its share.
    ///
    /// # Errors
    ///
    /// Hands back `self` untouched if its pointee is not a `U`.
    #[inline]
    pub fn try_downcast<U, Q>(self) -> Result<RetainPtr<U, Q>, Self>
    where
        T: AsAny,
        U: DerivedFrom<T> + Any,
        Q: RetainTraits<U> + CompatibleTraits<P>,
    {
        if self.is::<U>() {
            Ok(self.map_moved(NonNull::cast))
        } else {
            Err(self)
        }
    }

    /// Returns `true` if the pointee is a `U`.
    #[inline]
    pub fn is<U: Any>(&self) -> bool
    where
        T: AsAny,
    {
        match self.try_get() {
            Ok(value) => value.as_any().is::<U>(),
            Err(_) => false,
        }
    }

    /// Returns a `RetainPtr` to `self`'s pointee as a `U`, taking another share, with no checks
    /// at all.
    ///
    /// # Safety
    ///
    /// The pointee must be valid as a `U`, and `Q` must count it the way `P` does.
    #[inline]
    pub unsafe fn reinterpret_cast<U, Q>(&self) -> RetainPtr<U, Q>
    where
        Q: RetainTraits<U>,
    {
        self.map_copied(NonNull::cast)
    }

    /// Converts `self` into a `RetainPtr` to its pointee as a `U`, moving its share, with no
    /// checks at all.
    ///
    /// # Safety
    ///
    /// The pointee must be valid as a `U`, and `Q` must count it the way `P` does.
    #[inline]
    pub unsafe fn into_reinterpret_cast<U, Q>(self) -> RetainPtr<U, Q>
    where
        Q: RetainTraits<U>,
    {
        self.map_moved(NonNull::cast)
    }
}
