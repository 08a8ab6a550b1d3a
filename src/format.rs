/// Formats `value` like C's `%.<significant>g`.
///
/// Uses scientific notation when the decimal exponent is below -4 or at
/// least `significant`, fixed notation otherwise, and strips trailing zeros
/// from the fraction in both cases.
pub fn format_general(value: f64, significant: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let precision = significant.max(1);
    // rounding to `precision` digits can carry into the exponent, so read it back
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(value: f64) -> String {
        format_general(value, 10)
    }

    #[test]
    fn fixed_notation() {
        assert_eq!(g(14.0), "14");
        assert_eq!(g(100.0), "100");
        assert_eq!(g(-2.5), "-2.5");
        assert_eq!(g(0.0001), "0.0001");
        assert_eq!(g(std::f64::consts::PI), "3.141592654");
        assert_eq!(g(1234567890.0), "1234567890");
        assert_eq!(g(0.1 + 0.2), "0.3");
        assert_eq!(g(0.0), "0");
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(g(1e20), "1e+20");
        assert_eq!(g(0.00001), "1e-05");
        assert_eq!(g(1234567890123.0), "1.23456789e+12");
        assert_eq!(g(9999999999.7), "1e+10");
        assert_eq!(g(-6.02e-23), "-6.02e-23");
        assert_eq!(g(1.5e300), "1.5e+300");
    }

    #[test]
    fn precision_is_configurable() {
        assert_eq!(format_general(std::f64::consts::PI, 3), "3.14");
        assert_eq!(format_general(1234.0, 3), "1.23e+03");
        assert_eq!(format_general(2.0 / 3.0, 0), "0.7");
    }

    #[test]
    fn non_finite() {
        assert_eq!(g(f64::NAN), "nan");
        assert_eq!(g(f64::INFINITY), "inf");
        assert_eq!(g(f64::NEG_INFINITY), "-inf");
    }
}
