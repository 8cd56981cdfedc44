//! # Description
//! the signed fixed-point arithmetic used by the MAC stage and the activation unit
//!
//! every value is carried in an `i64` and is interpreted as a two's complement
//! number of the width of the register that holds it. the arithmetic is pure,
//! there is no state in this module.

/// the largest value representable with `width` signed bits
pub fn max_value(width: u32) -> i64 {
    (1i64 << (width - 1)) - 1
}

/// the smallest value representable with `width` signed bits
pub fn min_value(width: u32) -> i64 {
    -(1i64 << (width - 1))
}

/// # Description
/// keep the low `width` bits of `value` and sign-extend them, the same as
/// assigning to a signed register of that width
///
/// # Example
/// ```
/// use pe_grid::accelerator::fixed_point::wrap;
/// assert_eq!(wrap(127, 8), 127);
/// assert_eq!(wrap(128, 8), -128);
/// assert_eq!(wrap(255, 8), -1);
/// assert_eq!(wrap(-129, 8), 127);
/// ```
pub fn wrap(value: i64, width: u32) -> i64 {
    if width >= 64 {
        return value;
    }
    let shift = 64 - width;
    (value << shift) >> shift
}

/// full precision product of an activation and a weight
pub fn multiply(activation: i64, weight: i64) -> i64 {
    activation * weight
}

/// add a product into the accumulator, wrapping at the accumulator width
pub fn accumulate(accumulator: i64, product: i64, accum_width: u32) -> i64 {
    wrap(accumulator.wrapping_add(product), accum_width)
}

/// # Description
/// narrow an accumulator value to `data_width` bits
/// - above the max: clamp to the max
/// - below the min: clamp to the min
/// - otherwise keep the low bits with the sign
///
/// # Example
/// ```
/// use pe_grid::accelerator::fixed_point::saturate;
/// assert_eq!(saturate(300, 8), 127);
/// assert_eq!(saturate(-300, 8), -128);
/// assert_eq!(saturate(-5, 8), -5);
/// ```
pub fn saturate(value: i64, data_width: u32) -> i64 {
    if value > max_value(data_width) {
        max_value(data_width)
    } else if value < min_value(data_width) {
        min_value(data_width)
    } else {
        wrap(value, data_width)
    }
}

/// test the sign bit of a `width`-bit register
pub fn is_negative(value: i64, width: u32) -> bool {
    wrap(value, width) < 0
}
