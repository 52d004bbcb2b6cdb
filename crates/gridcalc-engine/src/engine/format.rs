/// Computed value of a formula that could not be evaluated.
pub const ERROR_SENTINEL: &str = "#ERR";

/// Computed value of a formula that reached itself under [`super::CyclePolicy::Flag`].
pub const CYCLE_SENTINEL: &str = "#CYCLE";

/// True for the sentinels a formula can produce instead of a number.
pub fn is_error_value(value: &str) -> bool {
    value == ERROR_SENTINEL || value == CYCLE_SENTINEL
}

/// Format a number as canonical decimal text.
///
/// Integral values print without a fractional part, everything else uses the
/// shortest representation that round-trips. Non-finite values are errors.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        ERROR_SENTINEL.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Parse cell text as a number. Surrounding whitespace is ignored;
/// `inf`/`NaN` spellings are not numbers.
pub fn parse_number(text: &str) -> Option<f64> {
    let n = text.trim().parse::<f64>().ok()?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_integral() {
        assert_eq!(format_number(11.0), "11");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_format_number_fractional() {
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_format_number_non_finite_is_error() {
        assert_eq!(format_number(f64::INFINITY), ERROR_SENTINEL);
        assert_eq!(format_number(f64::NAN), ERROR_SENTINEL);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("x"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(ERROR_SENTINEL), None);
    }
}
