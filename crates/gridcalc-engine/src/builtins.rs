//! Built-in range aggregates.
//!
//! Conventions:
//! - Aggregate names are matched case-insensitively (`SUM`, `sum`, `Sum`).
//! - Each aggregate takes exactly one `REF:REF` range argument.
//! - Aggregates read computed values; absent cells read as the empty string.
//! - If you add a new aggregate, add it to `RANGE_BUILTINS` and the name
//!   alternation in `range_fn_re` picks it up.

use regex::Regex;
use std::sync::OnceLock;

use crate::engine::{format_number, is_error_value, parse_number};

pub struct RangeBuiltin {
    pub sheet_name: &'static str,
    pub apply: fn(&[&str]) -> f64,
}

pub const RANGE_BUILTINS: &[RangeBuiltin] = &[
    RangeBuiltin {
        sheet_name: "SUM",
        apply: sum_values,
    },
    RangeBuiltin {
        sheet_name: "AVG",
        apply: avg_values,
    },
    RangeBuiltin {
        sheet_name: "COUNT",
        apply: count_values,
    },
];

/// Regex that matches aggregate calls like `SUM(A1:B5)`.
///
/// Captures:
/// - group 1: function name as written (e.g. `sum`)
/// - group 2: the raw argument text (e.g. ` A1:B5 `)
pub fn range_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = RANGE_BUILTINS
            .iter()
            .map(|b| b.sheet_name)
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b({})\(([^)]+)\)", names))
            .expect("built-in range regex must compile")
    })
}

pub fn find_range_builtin(name: &str) -> Option<&'static RangeBuiltin> {
    RANGE_BUILTINS
        .iter()
        .find(|b| b.sheet_name.eq_ignore_ascii_case(name))
}

/// Apply a named aggregate and render the result as canonical text.
pub fn apply_range_builtin(name: &str, values: &[&str]) -> String {
    let result = find_range_builtin(name)
        .map(|b| (b.apply)(values))
        .unwrap_or(0.0);
    format_number(result)
}

fn sum_values(values: &[&str]) -> f64 {
    values.iter().filter_map(|v| parse_number(v)).sum()
}

fn avg_values(values: &[&str]) -> f64 {
    let nums: Vec<f64> = values.iter().filter_map(|v| parse_number(v)).collect();
    if nums.is_empty() {
        return 0.0;
    }
    nums.iter().sum::<f64>() / nums.len() as f64
}

fn count_values(values: &[&str]) -> f64 {
    values
        .iter()
        .filter(|v| !v.is_empty() && !is_error_value(v))
        .count() as f64
}
