//! An intrusive reference-counting pointer.
//!
//! A [`RetainPtr`] extends the lifetime of an object that carries its own reference count, rather
//! than one living in a separately allocated control block. Objects opt in by embedding a
//! [`RefCount`] or an [`AtomicRefCount`] and implementing [`RefCounted`]; objects whose count is
//! managed elsewhere (e.g. by a foreign library) can be handled through custom [`RetainTraits`].
#![no_std]
#![allow(unused_unsafe)]
// #![cfg_attr(feature = "unstable", coerce_unsized, dispatch_from_dyn)]
extern crate maybe_std as base;

#[cfg(test)]
extern crate std;

mod clamp;
mod cmp;
mod error;
mod retain;
mod traits;

pub mod cast;

mod rc;
pub use rc::*;

#[cfg(all(feature = "atomic", target_has_atomic = "ptr"))]
mod arc;
#[cfg(all(feature = "atomic", target_has_atomic = "ptr"))]
pub use arc::*;

pub use cast::{AsAny, DerivedFrom};
pub use clamp::{clamp_cast, Arithmetic};
pub use error::{RetainError, TryUniqueError};
#[cfg(feature = "alloc")]
pub use retain::{make_retain, make_retain_with_traits};
pub use retain::{swap, RetainPointer, RetainPtr, UniqueRetain};
#[doc(hidden)]
pub use retain::{Probe, ProbeOther, ProbeRetain};
pub use traits::{
    Adopt, CompatibleTraits, CountStorage, DefaultTraits, Disposition, RawPointer, RefCounted,
    Retain, RetainTraits, TraitsOf, Unsupported, UseCount,
};
