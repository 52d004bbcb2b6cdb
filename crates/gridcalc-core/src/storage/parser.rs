//! Parser for .grd grid files
//!
//! One stored row per line:
//!
//! ```text
//! # Gridcalc grid budget
//! A1: "5" => "5" @ 2026-10-19T12:00:00+00:00
//! B1: "=A1+1" => "6" @ 2026-10-19T12:00:00+00:00
//! ```

use super::CellRecord;
use crate::error::{GridcalcError, Result};
use gridcalc_engine::engine::CellRef;

/// Parse .grd content into stored rows.
pub fn parse_grd_content(content: &str) -> Result<Vec<CellRecord>> {
    let mut records = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        records.push(parse_line(line, line_num + 1)?);
    }

    Ok(records)
}

fn parse_line(line: &str, line_num: usize) -> Result<CellRecord> {
    let parse_err = |message: String| GridcalcError::Parse {
        line: line_num,
        message,
    };

    // Parse "CELLREF: "RAW" => "VALUE" @ TIMESTAMP" format
    let Some((cell_ref_str, rest)) = line.split_once(':') else {
        return Err(parse_err(
            "Expected 'CELLREF: \"RAW\" => \"VALUE\"' format".to_string(),
        ));
    };

    let cell_ref_str = cell_ref_str.trim();
    if CellRef::from_str(cell_ref_str).is_none() {
        return Err(parse_err(format!("Invalid cell reference: {}", cell_ref_str)));
    }

    let (raw_value, rest) = parse_quoted(rest.trim_start()).ok_or_else(|| {
        parse_err("Expected quoted raw value".to_string())
    })?;

    let rest = rest
        .trim_start()
        .strip_prefix("=>")
        .ok_or_else(|| parse_err("Expected '=>' after raw value".to_string()))?;

    let (value, rest) = parse_quoted(rest.trim_start()).ok_or_else(|| {
        parse_err("Expected quoted computed value".to_string())
    })?;

    let rest = rest.trim();
    let updated_at = if rest.is_empty() {
        String::new()
    } else {
        rest.strip_prefix('@')
            .map(|ts| ts.trim().to_string())
            .ok_or_else(|| parse_err(format!("Unexpected trailing text: {}", rest)))?
    };

    Ok(CellRecord {
        cell_coordinate: cell_ref_str.to_string(),
        raw_value,
        value,
        updated_at,
    })
}

/// Read one double-quoted string from the start of `input`, returning its
/// unescaped content and whatever follows the closing quote.
fn parse_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some((out, &body[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            _ => out.push(ch),
        }
    }

    // Unterminated string
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_literal() {
        let records = parse_grd_content(r#"A1: "42" => "42" @ 2026-01-01T00:00:00+00:00"#).unwrap();
        assert_eq!(
            records,
            vec![CellRecord {
                cell_coordinate: "A1".to_string(),
                raw_value: "42".to_string(),
                value: "42".to_string(),
                updated_at: "2026-01-01T00:00:00+00:00".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_formula_with_colon_in_range() {
        let records = parse_grd_content(r#"B1: "=SUM(A1:A3)" => "6""#).unwrap();
        assert_eq!(records[0].raw_value, "=SUM(A1:A3)");
        assert_eq!(records[0].value, "6");
        assert_eq!(records[0].updated_at, "");
    }

    #[test]
    fn test_parse_escapes() {
        let records = parse_grd_content(r#"A1: "He said \"hi\"\nbye \\ ok" => """#).unwrap();
        assert_eq!(records[0].raw_value, "He said \"hi\"\nbye \\ ok");
        assert_eq!(records[0].value, "");
    }

    #[test]
    fn test_skip_comments_and_empty_lines() {
        let content = r#"
# This is a comment
A1: "1" => "1"

# Another comment

B1: "=A1" => "1"
"#;
        assert_eq!(parse_grd_content(content).unwrap().len(), 2);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_grd_content("A1: \"1\" => \"1\"\nA2 \"2\"").unwrap_err();
        assert!(matches!(err, GridcalcError::Parse { line: 2, .. }));

        let err = parse_grd_content("a1: \"1\" => \"1\"").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at line 1: Invalid cell reference: a1");

        let err = parse_grd_content("A1: \"1 => \"1\"").unwrap_err();
        assert!(matches!(err, GridcalcError::Parse { line: 1, .. }));

        let err = parse_grd_content("A1: \"1\" => \"1\" junk").unwrap_err();
        assert!(matches!(err, GridcalcError::Parse { line: 1, .. }));
    }
}
