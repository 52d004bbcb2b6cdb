//! Writer for .grd grid files

use super::CellRecord;
use gridcalc_engine::engine::CellRef;

/// Write stored rows to .grd format, sorted row-major for consistent output.
pub fn write_grd_content(grid_id: &str, records: &[CellRecord]) -> String {
    let mut lines = vec![format!("# Gridcalc grid {}", grid_id)];

    let mut sorted: Vec<(CellRef, &CellRecord)> = records
        .iter()
        .filter_map(|r| CellRef::from_str(&r.cell_coordinate).map(|cr| (cr, r)))
        .collect();
    sorted.sort_by_key(|(cell_ref, _)| *cell_ref);

    for (_, record) in sorted {
        let mut line = format!(
            "{}: \"{}\" => \"{}\"",
            record.cell_coordinate,
            escape_grd_text(&record.raw_value),
            escape_grd_text(&record.value)
        );
        if !record.updated_at.is_empty() {
            line.push_str(" @ ");
            line.push_str(&record.updated_at);
        }
        lines.push(line);
    }

    lines.join("\n") + "\n"
}

fn escape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
