//! Objects whose count is managed by someone else, reached through custom counting traits.

use std::cell::Cell;
use std::collections::HashSet;
use std::ptr::NonNull;

use retain_ptr::{Adopt, RawPointer, Retain, RetainPtr, RetainTraits, TraitsOf, Unsupported};

/// Stands in for an object handed out by a foreign library, with its own count entry points.
struct Lookup {
    refs: Cell<u32>,
    key: &'static str,
}

impl Lookup {
    fn new(key: &'static str) -> Self {
        Lookup { refs: Cell::new(1), key }
    }

    fn add_ref(&self) -> u32 {
        self.refs.set(self.refs.get() + 1);
        self.refs.get()
    }

    fn release(&self) -> u32 {
        self.refs.set(self.refs.get() - 1);
        self.refs.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LookupRef(NonNull<Lookup>);

unsafe impl RawPointer<Lookup> for LookupRef {
    fn into_non_null(self) -> NonNull<Lookup> {
        self.0
    }

    unsafe fn from_non_null(ptr: NonNull<Lookup>) -> Self {
        LookupRef(ptr)
    }
}

impl LookupRef {
    fn of(lookup: &Lookup) -> Self {
        LookupRef(NonNull::from(lookup))
    }
}

/// Retains by default and cannot report counts.
struct LookupTraits;

unsafe impl RetainTraits<Lookup> for LookupTraits {
    type Pointer = LookupRef;
    type DefaultAction = Retain;
    type Count = Unsupported;

    unsafe fn increment(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.add_ref();
    }

    unsafe fn decrement(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.release();
    }
}

/// Like `LookupTraits`, reporting the foreign count.
struct CountedLookupTraits;

unsafe impl RetainTraits<Lookup> for CountedLookupTraits {
    type Pointer = LookupRef;
    type DefaultAction = Retain;
    type Count = u32;

    unsafe fn increment(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.add_ref();
    }

    unsafe fn decrement(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.release();
    }

    unsafe fn use_count(ptr: LookupRef) -> Option<u32> {
        Some(unsafe { ptr.0.as_ref() }.refs.get())
    }
}

/// Reports a count wider than `isize`.
struct HugeCountTraits;

unsafe impl RetainTraits<Lookup> for HugeCountTraits {
    type Pointer = LookupRef;
    type DefaultAction = Retain;
    type Count = u64;

    unsafe fn increment(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.add_ref();
    }

    unsafe fn decrement(ptr: LookupRef) {
        unsafe { ptr.0.as_ref() }.release();
    }

    unsafe fn use_count(_: LookupRef) -> Option<u64> {
        Some(u64::MAX)
    }
}

struct LookupResource(RetainPtr<Lookup, LookupTraits>);

impl LookupResource {
    fn new(lookup: &Lookup) -> Self {
        LookupResource(unsafe { RetainPtr::from_raw(Some(LookupRef::of(lookup))) })
    }
}

#[test]
fn from_raw_retains_with_foreign_traits() {
    let lookup = Lookup::new("users");
    {
        let resource = LookupResource::new(&lookup);
        assert_eq!(lookup.refs.get(), 2);
        assert_eq!(resource.0.key, "users");

        let copy = resource.0.clone();
        assert_eq!(lookup.refs.get(), 3);

        drop(copy);
        assert_eq!(lookup.refs.get(), 2);
    }
    assert_eq!(lookup.refs.get(), 1);
}

#[test]
fn explicit_counting_still_balances() {
    let lookup = Lookup::new("orders");
    {
        let resource = LookupResource::new(&lookup);
        assert_eq!(lookup.add_ref(), 3);

        let mut other = RetainPtr::<Lookup, LookupTraits>::null();
        other.clone_from(&resource.0);
        assert_eq!(lookup.refs.get(), 4);

        assert_eq!(lookup.release(), 3);
    }
    assert_eq!(lookup.refs.get(), 1);
}

#[test]
fn use_count_is_unsupported() {
    let lookup = Lookup::new("items");
    let ptr: RetainPtr<Lookup, LookupTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&lookup))) };
    assert_eq!(ptr.use_count(), -1);
    assert!(!ptr.is_unique());

    let empty = RetainPtr::<Lookup, LookupTraits>::null();
    assert_eq!(empty.use_count(), -1);

    assert!(!TraitsOf::<Lookup, LookupTraits>::new().has_use_count());
    assert!(TraitsOf::<Lookup, LookupTraits>::new().retains_by_default());
}

#[test]
fn shares_cannot_be_proven_unique_without_counts() {
    let lookup = Lookup::new("items");
    let mut ptr: RetainPtr<Lookup, LookupTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&lookup))) };
    assert!(ptr.get_mut().is_none());

    let err = ptr.try_into_unique().unwrap_err();
    assert_eq!(err.error(), retain_ptr::RetainError::UseCountUnsupported);
    drop(err.into_inner());
    assert_eq!(lookup.refs.get(), 1);
}

#[test]
fn foreign_counts_are_reported() {
    let lookup = Lookup::new("sessions");
    let ptr: RetainPtr<Lookup, CountedLookupTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&lookup))) };
    assert_eq!(ptr.use_count(), 2);

    let empty = RetainPtr::<Lookup, CountedLookupTraits>::null();
    assert_eq!(empty.use_count(), 0);
}

#[test]
fn wide_counts_saturate() {
    let lookup = Lookup::new("events");
    let ptr: RetainPtr<Lookup, HugeCountTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&lookup))) };
    assert_eq!(ptr.use_count(), isize::MAX);
}

#[test]
fn adopting_skips_the_increment() {
    let lookup = Lookup::new("carts");
    lookup.add_ref();
    let ptr: RetainPtr<Lookup, LookupTraits> =
        unsafe { RetainPtr::adopt(Some(LookupRef::of(&lookup))) };
    assert_eq!(lookup.refs.get(), 2);
    drop(ptr);
    assert_eq!(lookup.refs.get(), 1);
}

#[test]
fn reset_to_retains_by_default() {
    let first = Lookup::new("first");
    let second = Lookup::new("second");
    let mut ptr: RetainPtr<Lookup, LookupTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&first))) };
    assert_eq!(first.refs.get(), 2);

    unsafe { ptr.reset_to(Some(LookupRef::of(&second))) };
    assert_eq!(first.refs.get(), 1);
    assert_eq!(second.refs.get(), 2);
    assert_eq!(ptr.key, "second");

    unsafe { ptr.reset_to(ptr.get()) };
    assert_eq!(second.refs.get(), 2);

    unsafe { ptr.reset_to(None) };
    assert!(ptr.is_null());
    assert_eq!(second.refs.get(), 1);
}

#[test]
fn reset_with_adopt_takes_over_a_share() {
    let first = Lookup::new("first");
    let second = Lookup::new("second");
    let mut ptr: RetainPtr<Lookup, LookupTraits> =
        unsafe { RetainPtr::from_raw(Some(LookupRef::of(&first))) };

    second.add_ref();
    unsafe { ptr.reset_with(Some(LookupRef::of(&second)), Adopt) };
    assert_eq!(first.refs.get(), 1);
    assert_eq!(second.refs.get(), 2);

    unsafe { ptr.reset_with(Some(LookupRef::of(&first)), Retain) };
    assert_eq!(first.refs.get(), 2);
    assert_eq!(second.refs.get(), 1);

    drop(ptr);
    assert_eq!(first.refs.get(), 1);
}

#[test]
fn hashed_by_the_foreign_pointer() {
    let first = Lookup::new("a");
    let second = Lookup::new("b");

    let mut set = HashSet::new();
    for lookup in [&first, &second, &first] {
        let ptr: RetainPtr<Lookup, LookupTraits> =
            unsafe { RetainPtr::from_raw(Some(LookupRef::of(lookup))) };
        set.insert(ptr);
    }
    assert_eq!(set.len(), 2);
    assert_eq!(first.refs.get(), 2);
    assert_eq!(second.refs.get(), 2);

    drop(set);
    assert_eq!(first.refs.get(), 1);
    assert_eq!(second.refs.get(), 1);
}
