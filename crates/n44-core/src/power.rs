//! Numeric conventions shared by the update engine and the reports.

/// Decimal places used for every derived quantity unless stated otherwise.
pub const ROUND_DIGITS: i32 = 4;

/// Round `value` to `digits` decimal places (half away from zero).
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Reactive power drawn at `power_factor` for a given active power,
/// `P * tan(acos(pf))` rounded to [`ROUND_DIGITS`].
pub fn reactive_power(active: f64, power_factor: f64) -> f64 {
    round_to(active * power_factor.acos().tan(), ROUND_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_four_digits() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-1.23454, 4), -1.2345);
        assert_eq!(round_to(1234.4, 0), 1234.0);
    }

    #[test]
    fn reactive_power_at_095() {
        let expected = (100.0_f64 * 0.95_f64.acos().tan() * 1e4).round() / 1e4;
        assert_eq!(reactive_power(100.0, 0.95), expected);
        assert!((reactive_power(100.0, 0.95) - 32.8684).abs() < 1e-9);
        assert_eq!(reactive_power(-100.0, 0.95), -expected);
    }

    #[test]
    fn unity_power_factor_has_no_reactive_part() {
        assert_eq!(reactive_power(250.0, 1.0), 0.0);
    }
}
