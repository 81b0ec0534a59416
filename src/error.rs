use base::fmt;

use thiserror::Error;

use crate::retain::RetainPtr;
use crate::traits::{DefaultTraits, RetainTraits};

/// Why a `RetainPtr` could not provide what was asked of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RetainError {
    #[error("the retain pointer is empty")]
    Empty,
    #[error("the object is shared by {0} retain pointers")]
    Shared(isize),
    #[error("the counting traits do not report use counts")]
    UseCountUnsupported,
}

/// Returned by [`RetainPtr::try_into_unique`], handing the pointer back.
#[derive(Error)]
#[error("{error}")]
pub struct TryUniqueError<T: ?Sized, P: RetainTraits<T> = DefaultTraits> {
    ptr: RetainPtr<T, P>,
    error: RetainError,
}

impl<T: ?Sized, P: RetainTraits<T>> TryUniqueError<T, P> {
    pub(crate) fn new(ptr: RetainPtr<T, P>, error: RetainError) -> Self {
        TryUniqueError { ptr, error }
    }

    pub fn error(&self) -> RetainError {
        self.error
    }

    /// Returns the pointer that could not be made unique, still holding its share.
    pub fn into_inner(self) -> RetainPtr<T, P> {
        self.ptr
    }
}

impl<T: ?Sized, P: RetainTraits<T>> fmt::Debug for TryUniqueError<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryUniqueError")
            .field("ptr", &self.ptr)
            .field("error", &self.error)
            .finish()
    }
}
