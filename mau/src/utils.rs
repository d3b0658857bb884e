//! Utilities.

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (::std::mem::size_of::<usize>() * 8) - (value - 1).leading_zeros() as usize
    }
}

/// Returns a mask of the `width` low bits. Widths of 64 or more give all ones.
pub const fn low_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Returns a mask of the `width` low bits of a 128-bit word.
pub const fn low_mask_u128(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1 << width) - 1
    }
}

/// Shifts right, giving zero instead of overflowing when `shift` reaches the width of `u32`.
pub const fn shr_or_zero(value: u32, shift: u32) -> u32 {
    match value.checked_shr(shift) {
        Some(v) => v,
        None => 0,
    }
}

/// Extracts `width` bits starting at `lsb` from a 128-bit word.
pub const fn extract_u128(word: u128, lsb: usize, width: usize) -> u128 {
    if lsb >= 128 {
        0
    } else {
        (word >> lsb) & low_mask_u128(width)
    }
}

/// Returns `value` with `width` bits at `lsb` replaced by the low bits of `field`.
pub const fn deposit(value: u32, field: u32, lsb: u32, width: u32) -> u32 {
    if width == 0 || lsb >= 32 {
        return value;
    }
    let mask = (low_mask(width as usize) as u32).wrapping_shl(lsb);
    (value & !mask) | (field.wrapping_shl(lsb) & mask)
}

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}
