//! Saturating numeric conversion.

use num_traits::{Bounded, NumCast, Zero};

/// The primitive integer and floating point types.
pub trait Arithmetic: Copy + PartialOrd + NumCast + Bounded + Zero {}

macro_rules! arithmetic {
    ($($t:ty),*) => {
        $(impl Arithmetic for $t {})*
    };
}

arithmetic!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Converts `from` to `To`, saturating at the bounds of `To` instead of wrapping.
///
/// Values too small for `To` become `To::min_value()`, values too large become
/// `To::max_value()`, and NaN becomes zero. Floating point inputs that fit are truncated toward
/// zero.
///
/// # Examples
///
/// ```
/// use retain_ptr::clamp_cast;
///
/// assert_eq!(clamp_cast::<u8, i32>(300), 255);
/// assert_eq!(clamp_cast::<u8, i32>(-5), 0);
/// assert_eq!(clamp_cast::<i16, i16>(-5), -5);
/// assert_eq!(clamp_cast::<i32, f64>(1e300), i32::MAX);
/// ```
#[inline]
#[allow(clippy::eq_op)]
pub fn clamp_cast<To: Arithmetic, From: Arithmetic>(from: From) -> To {
    if let Some(to) = <To as NumCast>::from(from) {
        return to;
    }

    if from != from {
        To::zero()
    } else if from < From::zero() {
        To::min_value()
    } else {
        To::max_value()
    }
}
