//! Mixed-radix word codec.
//!
//! The protocol carries one fixed-width unsigned integer per session,
//! transmitted as `list_size` digits in radix `max_value`, least-significant
//! digit first. These are pure, stateless helpers shared by both roles and
//! by the report formatting.
//!
//! The payload width in bits is `list_size * log2(radix)`, which is
//! fractional when the radix is not a power of two; the hex width derived
//! from it always rounds up, so the hex form can represent a superset of
//! the digit domain.

use rand::Rng;

/// Number of payload bits for a given digit count and radix.
#[inline]
#[must_use]
pub fn num_bits(list_size: usize, radix: u32) -> f64 {
    list_size as f64 * f64::from(radix).log2()
}

/// Composes an LSB-first digit sequence into an integer.
///
/// `value = Σ digits[i] * radix^i`. The caller must ensure the result fits
/// in a `u64`; composition wraps silently otherwise.
#[must_use]
pub fn digits_to_integer(digits: &[u32], radix: u32) -> u64 {
    digits.iter().rev().fold(0u64, |acc, &d| {
        acc.wrapping_mul(u64::from(radix)).wrapping_add(u64::from(d))
    })
}

/// Decomposes an integer into exactly `list_size` LSB-first digits.
///
/// Precondition: `value < radix^list_size`. Out-of-range values wrap
/// silently (the high digits are simply lost); validating the range is the
/// caller's responsibility.
#[must_use]
pub fn integer_to_digits(value: u64, list_size: usize, radix: u32) -> Vec<u32> {
    let radix = u64::from(radix);
    let mut digits = Vec::with_capacity(list_size);
    let mut feed = value;
    for _ in 0..list_size {
        digits.push((feed % radix) as u32);
        feed /= radix;
    }
    digits
}

/// Renders `value` as zero-padded hexadecimal, `ceil(num_bits / 4)` digits
/// wide.
#[must_use]
pub fn to_fixed_hex(value: u64, num_bits: f64) -> String {
    let width = (num_bits / 4.0).ceil() as usize;
    format!("{value:0width$x}")
}

/// Samples a payload uniformly from `[0, 2^num_bits)`.
///
/// Fractional bit counts floor the exclusive bound, matching the hex-width
/// convention above. Precondition: `num_bits < 64`.
#[must_use]
pub fn random_integer(num_bits: f64) -> u64 {
    let bound = num_bits.exp2().floor() as u64;
    rand::thread_rng().gen_range(0..bound)
}
