/// the sigmoid approximation over -8..+7 (in units of 2^frac_bits),
/// expressed on the 0..255 output scale
pub const SIGMOID_LUT: [i64; 16] = [
    0, 13, 26, 51, 77, 102, 128, 153, 179, 204, 230, 243, 250, 253, 255, 255,
];

/// # Description
/// compute the table index of an accumulated sum
/// - `sum <= -8 * 2^frac_bits` gives 0
/// - `sum >= 7 * 2^frac_bits` gives 15
/// - otherwise the integer part offset by 8, modulo 16
///
/// # Example
/// ```
/// use pe_grid::accelerator::sigmoid::index_for;
/// assert_eq!(index_for(0, 4), 8);
/// assert_eq!(index_for(-16, 4), 7);
/// assert_eq!(index_for(1000, 4), 15);
/// assert_eq!(index_for(-1000, 4), 0);
/// ```
pub fn index_for(sum: i64, frac_bits: u32) -> usize {
    let one = 1i64 << frac_bits;
    if sum <= -8 * one {
        0
    } else if sum >= 7 * one {
        15
    } else {
        ((sum >> frac_bits) + 8).rem_euclid(16) as usize
    }
}

pub fn lookup(index: usize) -> i64 {
    SIGMOID_LUT[index % SIGMOID_LUT.len()]
}
