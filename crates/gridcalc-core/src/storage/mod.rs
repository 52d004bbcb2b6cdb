//! Storage port and the stores that implement it.
//!
//! The engine never touches storage: the service loads a grid's rows through
//! [`GridStore::load_grid`], materialises a snapshot, and hands the changed
//! cells back through [`GridStore::persist_changed_cells`].

mod file;
mod memory;
mod parser;
mod writer;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use parser::parse_grd_content;
pub use writer::write_grd_content;

use gridcalc_engine::engine::{ChangedCell, Grid};
use serde::{Deserialize, Serialize};

use crate::error::{GridcalcError, Result};

/// One stored cell row, keyed by `(grid id, cell_coordinate)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    pub cell_coordinate: String,
    pub raw_value: String,
    /// Computed value.
    pub value: String,
    pub updated_at: String,
}

impl CellRecord {
    pub fn from_changed(cell: &ChangedCell, updated_at: &str) -> CellRecord {
        CellRecord {
            cell_coordinate: cell.cell_coordinate.clone(),
            raw_value: cell.raw_value.clone(),
            value: cell.computed_value.clone(),
            updated_at: updated_at.to_string(),
        }
    }
}

/// Persistence collaborator for grids.
pub trait GridStore: Send + Sync {
    /// Every stored row of a grid; an unknown grid has no rows.
    fn load_grid(&self, grid_id: &str) -> Result<Vec<CellRecord>>;

    /// Upsert each changed cell under `(grid_id, cell_coordinate)`, stamped
    /// with `updated_at`. Writing the same cells twice leaves the same state.
    fn persist_changed_cells(
        &self,
        grid_id: &str,
        cells: &[ChangedCell],
        updated_at: &str,
    ) -> Result<()>;
}

impl<S: GridStore + ?Sized> GridStore for Box<S> {
    fn load_grid(&self, grid_id: &str) -> Result<Vec<CellRecord>> {
        (**self).load_grid(grid_id)
    }

    fn persist_changed_cells(
        &self,
        grid_id: &str,
        cells: &[ChangedCell],
        updated_at: &str,
    ) -> Result<()> {
        (**self).persist_changed_cells(grid_id, cells, updated_at)
    }
}

/// Materialise stored rows as a snapshot.
pub fn snapshot_from_records(records: &[CellRecord]) -> Grid {
    let mut grid = Grid::new();
    for record in records {
        grid.load_cell(&record.cell_coordinate, &record.raw_value, &record.value);
    }
    grid
}

/// Grid ids name files on disk, so they are limited to ASCII letters,
/// digits, `-` and `_`.
pub fn validate_grid_id(grid_id: &str) -> Result<()> {
    if grid_id.is_empty() {
        return Err(GridcalcError::Validation("Missing gridFileId".to_string()));
    }
    if !grid_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(GridcalcError::Validation(format!("Invalid gridFileId: {}", grid_id)));
    }
    Ok(())
}
