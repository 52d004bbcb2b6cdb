//! Store that keeps one `.grd` file per grid under a data directory.

use gridcalc_engine::engine::{CellRef, ChangedCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use super::{CellRecord, GridStore, parse_grd_content, validate_grid_id, write_grd_content};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn grid_path(&self, grid_id: &str) -> PathBuf {
        self.dir.join(format!("{}.grd", grid_id))
    }
}

impl GridStore for FileStore {
    fn load_grid(&self, grid_id: &str) -> Result<Vec<CellRecord>> {
        validate_grid_id(grid_id)?;
        let path = self.grid_path(grid_id);
        if !path.exists() {
            log::info!("No stored rows for grid '{}'", grid_id);
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let records = parse_grd_content(&content)?;
        log::info!(
            "Loaded {} row(s) for grid '{}' from {}",
            records.len(),
            grid_id,
            path.display()
        );
        Ok(records)
    }

    fn persist_changed_cells(
        &self,
        grid_id: &str,
        cells: &[ChangedCell],
        updated_at: &str,
    ) -> Result<()> {
        validate_grid_id(grid_id)?;

        let mut rows: BTreeMap<CellRef, CellRecord> = BTreeMap::new();
        for record in self.load_grid(grid_id)? {
            if let Some(cell_ref) = CellRef::from_str(&record.cell_coordinate) {
                rows.insert(cell_ref, record);
            }
        }
        for cell in cells {
            let Some(cell_ref) = CellRef::from_str(&cell.cell_coordinate) else {
                log::warn!("Not persisting invalid coordinate '{}'", cell.cell_coordinate);
                continue;
            };
            rows.insert(cell_ref, CellRecord::from_changed(cell, updated_at));
        }

        let records: Vec<CellRecord> = rows.into_values().collect();
        let content = write_grd_content(grid_id, &records);

        // Write beside the target then rename, so readers never see half a file
        let path = self.grid_path(grid_id);
        let tmp_path = path.with_extension("grd.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;

        log::info!(
            "Persisted {} cell(s) for grid '{}' to {}",
            cells.len(),
            grid_id,
            path.display()
        );
        Ok(())
    }
}
