//! Fixed-point formatting of report figures.

use rust_decimal::{Decimal, RoundingStrategy};

/// Literal shown where a figure is structurally not applicable (e.g. the
/// limit cell of a fundamental row). Callers place it directly; the
/// formatter never produces it.
pub const NOT_APPLICABLE: &str = "—";

/// Convert through the shortest decimal representation so that a value the
/// sheet meant as `1.005` rounds as `1.005`, not as its slightly-smaller
/// binary neighbor.
fn to_decimal(value: f64) -> Decimal {
    let s = format!("{value}");
    s.parse::<Decimal>()
        .unwrap_or_else(|_| Decimal::try_from(value).unwrap_or_default())
}

/// Round half-up to `scale` decimal places and render as a plain
/// fixed-point string: no scientific notation, no grouping separators,
/// always exactly `scale` fractional digits.
///
/// Half-up means ties move away from zero in both directions:
/// `1.005 → "1.01"`, `-0.005 → "-0.01"`. Unit adjustments (V→kV, nominal
/// subtraction) are the caller's job and happen before formatting.
#[must_use]
pub fn format_fixed(value: f64, scale: u32) -> String {
    let rounded =
        to_decimal(value).round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.prec$}", prec = scale as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_half_up_not_bankers() {
        assert_eq!(format_fixed(1.005, 2), "1.01");
        assert_eq!(format_fixed(2.675, 2), "2.68");
        assert_eq!(format_fixed(0.125, 2), "0.13");
    }

    #[test]
    fn test_negative_ties_keep_sign() {
        assert_eq!(format_fixed(-0.005, 2), "-0.01");
        assert_eq!(format_fixed(-1.005, 2), "-1.01");
    }

    #[test]
    fn test_zero_pads_fraction() {
        assert_eq!(format_fixed(0.0, 2), "0.00");
        assert_eq!(format_fixed(3.0, 2), "3.00");
        assert_eq!(format_fixed(2.1, 2), "2.10");
    }

    #[test]
    fn test_plain_fixed_point_output() {
        assert_eq!(format_fixed(6350.0 / 1000.0, 2), "6.35");
        assert_eq!(format_fixed(12345.678, 2), "12345.68");
        assert_eq!(format_fixed(0.000_4, 2), "0.00");
    }

    #[test]
    fn test_other_scales() {
        assert_eq!(format_fixed(1.2345, 3), "1.235");
        assert_eq!(format_fixed(1.5, 0), "2");
    }
}
