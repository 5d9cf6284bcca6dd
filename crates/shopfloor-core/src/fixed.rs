use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Volume in cubic units. Fixed-point so capacity checks are bit-identical
/// on every platform.
pub type Volume = Fixed64;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use at API edges, never inside a transaction.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert an f64 to Fixed64, or `None` when it is not finite or falls
/// outside the Q32.32 range. Use for values read from files.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    if v.is_finite() { Fixed64::checked_from_num(v) } else { None }
}

/// Convert Fixed64 to f64. Use only for display and reporting.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Volume occupied by `quantity` units of `per_unit` volume, or `None` if
/// the product does not fit in a [`Volume`].
#[inline]
pub fn volume_for(quantity: u32, per_unit: Volume) -> Option<Volume> {
    per_unit.checked_mul_int(quantity as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed64_basic_arithmetic() {
        let a = f64_to_fixed64(1.5);
        let b = f64_to_fixed64(2.0);
        assert_eq!(fixed64_to_f64(a + b), 3.5);
    }

    #[test]
    fn volume_for_scales_per_unit() {
        let per_unit = f64_to_fixed64(0.25);
        assert_eq!(volume_for(8, per_unit), Some(f64_to_fixed64(2.0)));
        assert_eq!(volume_for(0, per_unit), Some(Fixed64::ZERO));
    }

    #[test]
    fn volume_for_reports_overflow() {
        assert_eq!(volume_for(3, Fixed64::MAX), None);
        assert_eq!(volume_for(3_000_000_000, f64_to_fixed64(1.0)), None);
        assert!(volume_for(2_000_000_000, f64_to_fixed64(1.0)).is_some());
    }

    #[test]
    fn checked_conversion_rejects_out_of_range() {
        assert_eq!(checked_f64_to_fixed64(0.5), Some(f64_to_fixed64(0.5)));
        assert_eq!(checked_f64_to_fixed64(5_000_000_000.0), None);
        assert_eq!(checked_f64_to_fixed64(f64::NAN), None);
        assert_eq!(checked_f64_to_fixed64(f64::INFINITY), None);
        assert_eq!(checked_f64_to_fixed64(-1.5), Some(f64_to_fixed64(-1.5)));
    }

    #[test]
    fn hundredths_accumulate_close_to_exact() {
        let v = volume_for(2000, f64_to_fixed64(0.01)).unwrap();
        assert!((fixed64_to_f64(v) - 20.0).abs() < 1e-3);
    }
}
