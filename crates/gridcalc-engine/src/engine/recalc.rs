//! Recalculation of a grid after a single cell edit.
//!
//! [`apply_edit`] stores the new raw text, evaluates it, then walks the
//! dependents of the edited cell breadth-first. Every dependent is recomputed
//! against the snapshot as it stands, so a chain sees values its upstream
//! cells were just given. A dependent is processed at most once per edit, which
//! is what guarantees termination when formulas form a cycle: a cyclic cell
//! keeps whatever value its single recomputation produced. The edited cell is
//! not pre-marked, so when it sits on a cycle it is recomputed one more time.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::cell::{Cell, Grid};
use super::cell_ref::CellRef;
use super::deps::find_dependents;
use super::eval::{CyclePolicy, Evaluator};
use crate::error::{EngineError, Result};

/// Knobs for a recalculation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcOptions {
    pub cycle_policy: CyclePolicy,
}

/// One cell written by an edit, in the shape the storage layer persists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedCell {
    pub cell_coordinate: String,
    pub raw_value: String,
    pub computed_value: String,
}

/// Apply an edit with default options. See [`apply_edit_with_options`].
pub fn apply_edit(grid: &mut Grid, cell_coordinate: &str, raw_value: &str) -> Result<Vec<ChangedCell>> {
    apply_edit_with_options(grid, cell_coordinate, raw_value, RecalcOptions::default())
}

/// Set `cell_coordinate` to `raw_value` and recompute every cell that depends
/// on it, directly or transitively.
///
/// Returns the changed cells in processing order, the edited cell first.
/// Fails only when `cell_coordinate` is not a valid reference; the snapshot is
/// untouched in that case.
pub fn apply_edit_with_options(
    grid: &mut Grid,
    cell_coordinate: &str,
    raw_value: &str,
    options: RecalcOptions,
) -> Result<Vec<ChangedCell>> {
    let target = CellRef::from_str(cell_coordinate)
        .ok_or_else(|| EngineError::InvalidReference(cell_coordinate.to_string()))?;

    let mut changed = vec![recompute(grid, target, raw_value.to_string(), options)];

    let mut worklist: VecDeque<CellRef> = find_dependents(grid, &target).into();
    let mut visited: HashSet<CellRef> = HashSet::new();

    while let Some(cell_ref) = worklist.pop_front() {
        if !visited.insert(cell_ref) {
            continue;
        }
        let raw = grid.raw_value(&cell_ref).to_string();
        if raw.is_empty() {
            continue;
        }
        log::debug!("Recalculating dependent cell {}", cell_ref);
        changed.push(recompute(grid, cell_ref, raw, options));

        worklist.extend(
            find_dependents(grid, &cell_ref)
                .into_iter()
                .filter(|dep| !visited.contains(dep)),
        );
    }

    log::info!(
        "Applied edit to {}: {} cell(s) changed",
        target,
        changed.len()
    );
    Ok(changed)
}

/// Store `raw_value` at `cell_ref`, evaluate it against the updated snapshot
/// and record the result.
fn recompute(grid: &mut Grid, cell_ref: CellRef, raw_value: String, options: RecalcOptions) -> ChangedCell {
    let previous = grid.computed_value(&cell_ref).to_string();
    grid.set(cell_ref, Cell::new(raw_value.clone(), previous));

    let computed_value = match raw_value.strip_prefix('=') {
        Some(body) => Evaluator::new(grid, options.cycle_policy).evaluate_cell(&cell_ref, body),
        None => raw_value.clone(),
    };
    grid.set(cell_ref, Cell::new(raw_value.clone(), computed_value.clone()));
    log::debug!("Set {} to '{}' (computed '{}')", cell_ref, raw_value, computed_value);

    ChangedCell {
        cell_coordinate: cell_ref.to_string(),
        raw_value,
        computed_value,
    }
}
