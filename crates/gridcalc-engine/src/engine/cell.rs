//! Cell data structures for the grid snapshot.
//!
//! - [`Cell`] - Raw text as the user typed it plus its computed value
//! - [`Grid`] - Sparse, transaction-local map from [`CellRef`] to [`Cell`]
//!
//! A snapshot is built from stored rows at the start of an edit or a read and
//! dropped once the result has been persisted or returned. Blank cells are not
//! kept: every entry has a non-empty raw or computed value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::cell_ref::CellRef;

/// A cell in the grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Text as entered; a leading `=` marks a formula.
    pub raw_value: String,
    /// Canonical number, literal text, empty, or an error sentinel.
    pub computed_value: String,
}

impl Cell {
    pub fn new(raw_value: impl Into<String>, computed_value: impl Into<String>) -> Cell {
        Cell {
            raw_value: raw_value.into(),
            computed_value: computed_value.into(),
        }
    }

    /// A literal cell: its computed value is its raw text.
    pub fn literal(text: &str) -> Cell {
        Cell::new(text, text)
    }

    /// Formula body without the leading `=`, if this cell holds a formula.
    pub fn formula(&self) -> Option<&str> {
        self.raw_value.strip_prefix('=')
    }

    pub fn is_formula(&self) -> bool {
        self.formula().is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.raw_value.is_empty() && self.computed_value.is_empty()
    }
}

/// Sparse grid snapshot.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    cells: HashMap<CellRef, Cell>,
}

impl Grid {
    pub fn new() -> Grid {
        Grid::default()
    }

    /// Materialise one stored row. Rows whose coordinate does not decode, or
    /// that carry neither a raw nor a computed value, are skipped.
    /// Returns whether the row was kept.
    pub fn load_cell(&mut self, coordinate: &str, raw_value: &str, computed_value: &str) -> bool {
        let Some(cell_ref) = CellRef::from_str(coordinate) else {
            log::warn!("Skipping stored row with invalid coordinate '{}'", coordinate);
            return false;
        };
        let cell = Cell::new(raw_value, computed_value);
        if cell.is_blank() {
            return false;
        }
        self.cells.insert(cell_ref, cell);
        true
    }

    pub fn get(&self, cell_ref: &CellRef) -> Option<&Cell> {
        self.cells.get(cell_ref)
    }

    /// Raw text of a cell, empty when the cell is absent.
    pub fn raw_value(&self, cell_ref: &CellRef) -> &str {
        self.cells
            .get(cell_ref)
            .map(|c| c.raw_value.as_str())
            .unwrap_or("")
    }

    /// Computed value of a cell, empty when the cell is absent.
    pub fn computed_value(&self, cell_ref: &CellRef) -> &str {
        self.cells
            .get(cell_ref)
            .map(|c| c.computed_value.as_str())
            .unwrap_or("")
    }

    /// Store a cell, dropping the entry instead when it is blank.
    pub fn set(&mut self, cell_ref: CellRef, cell: Cell) {
        if cell.is_blank() {
            self.cells.remove(&cell_ref);
        } else {
            self.cells.insert(cell_ref, cell);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.cells.iter()
    }

    /// Cells sorted row-major, for stable output.
    pub fn sorted(&self) -> Vec<(&CellRef, &Cell)> {
        let mut cells: Vec<_> = self.cells.iter().collect();
        cells.sort_by_key(|(cell_ref, _)| **cell_ref);
        cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(CellRef, Cell)> for Grid {
    fn from_iter<I: IntoIterator<Item = (CellRef, Cell)>>(iter: I) -> Self {
        let mut grid = Grid::new();
        for (cell_ref, cell) in iter {
            grid.set(cell_ref, cell);
        }
        grid
    }
}
