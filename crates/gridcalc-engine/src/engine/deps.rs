//! Dependency discovery from formula strings.
//!
//! There is no stored dependency graph: when a cell changes, every formula in
//! the snapshot is inspected to see whether it reads that cell.
//!
//! Handles:
//! - Bare cell references: `A1`, `B2`, looked for outside function-call
//!   argument spans so names and arguments never produce false matches
//! - Range references: `SUM(A1:B5)`, looked for across the whole body and
//!   matched by rectangular containment

use regex::Regex;
use std::sync::OnceLock;

use super::cell::Grid;
use super::cell_ref::{CellRef, cell_token_re};

/// Inclusive rectangle between two corner references, normalised so that
/// the corners may be given in any order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl CellRange {
    pub fn from_corners(start: CellRef, end: CellRef) -> CellRange {
        CellRange {
            min_row: start.row.min(end.row),
            max_row: start.row.max(end.row),
            min_col: start.col.min(end.col),
            max_col: start.col.max(end.col),
        }
    }

    pub fn contains(&self, cell_ref: &CellRef) -> bool {
        (self.min_row..=self.max_row).contains(&cell_ref.row)
            && (self.min_col..=self.max_col).contains(&cell_ref.col)
    }

    /// Number of cells covered, or `None` if it does not fit in `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        let rows = (self.max_row - self.min_row).checked_add(1)?;
        let cols = (self.max_col - self.min_col).checked_add(1)?;
        rows.checked_mul(cols)
    }

    /// Every position in the range, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |row| (self.min_col..=self.max_col).map(move |col| CellRef::new(col, row)))
    }
}

/// Parse a range like "A1:B5". Surrounding whitespace is allowed; anything
/// else that is not exactly two valid references separated by `:` is `None`.
pub fn parse_range(range: &str) -> Option<CellRange> {
    let (start, end) = range.trim().split_once(':')?;
    let start = CellRef::from_str(start)?;
    let end = CellRef::from_str(end)?;
    Some(CellRange::from_corners(start, end))
}

/// Whether a formula body (without `=`) reads `changed`, directly or through a range.
pub fn formula_reads(body: &str, changed: &CellRef) -> bool {
    let outside_calls = call_span_re().replace_all(body, "");
    let direct = cell_token_re()
        .find_iter(&outside_calls)
        .filter_map(|m| CellRef::from_str(m.as_str()))
        .any(|cr| cr == *changed);
    if direct {
        return true;
    }

    range_token_re().captures_iter(body).any(|caps| {
        match (CellRef::from_str(&caps[1]), CellRef::from_str(&caps[2])) {
            (Some(start), Some(end)) => CellRange::from_corners(start, end).contains(changed),
            _ => false,
        }
    })
}

/// Cells whose formula reads `changed`, each reported once, sorted row-major.
pub fn find_dependents(grid: &Grid, changed: &CellRef) -> Vec<CellRef> {
    let mut dependents: Vec<CellRef> = grid
        .iter()
        .filter_map(|(cell_ref, cell)| {
            let body = cell.formula()?;
            formula_reads(body, changed).then_some(*cell_ref)
        })
        .collect();
    dependents.sort();
    dependents.dedup();
    log::debug!("Cells dependent on {}: {:?}", changed, dependents);
    dependents
}

fn call_span_re() -> &'static Regex {
    static CALL_RE: OnceLock<Regex> = OnceLock::new();
    CALL_RE.get_or_init(|| {
        Regex::new(r"[A-Za-z]+\([^)]*\)").expect("call span regex must compile")
    })
}

fn range_token_re() -> &'static Regex {
    static RANGE_RE: OnceLock<Regex> = OnceLock::new();
    RANGE_RE.get_or_init(|| {
        Regex::new(r"([A-Z]+[0-9]+):([A-Z]+[0-9]+)").expect("range token regex must compile")
    })
}
