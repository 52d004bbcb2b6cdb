//! In-process store, for tests and for running without a data directory.

use dashmap::DashMap;
use gridcalc_engine::engine::{CellRef, ChangedCell};
use std::collections::BTreeMap;

use super::{CellRecord, GridStore};
use crate::error::Result;

/// Grids held in a concurrent map; rows within a grid are kept row-major.
#[derive(Debug, Default)]
pub struct MemoryStore {
    grids: DashMap<String, BTreeMap<CellRef, CellRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as if they had been stored earlier. Rows whose coordinate
    /// does not decode are dropped.
    pub fn seed(&self, grid_id: &str, records: impl IntoIterator<Item = CellRecord>) {
        let mut grid = self.grids.entry(grid_id.to_string()).or_default();
        for record in records {
            if let Some(cell_ref) = CellRef::from_str(&record.cell_coordinate) {
                grid.insert(cell_ref, record);
            }
        }
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }
}

impl GridStore for MemoryStore {
    fn load_grid(&self, grid_id: &str) -> Result<Vec<CellRecord>> {
        let records: Vec<CellRecord> = self
            .grids
            .get(grid_id)
            .map(|grid| grid.values().cloned().collect())
            .unwrap_or_default();
        log::info!("Loaded {} row(s) for grid '{}'", records.len(), grid_id);
        Ok(records)
    }

    fn persist_changed_cells(
        &self,
        grid_id: &str,
        cells: &[ChangedCell],
        updated_at: &str,
    ) -> Result<()> {
        let mut grid = self.grids.entry(grid_id.to_string()).or_default();
        for cell in cells {
            let Some(cell_ref) = CellRef::from_str(&cell.cell_coordinate) else {
                log::warn!("Not persisting invalid coordinate '{}'", cell.cell_coordinate);
                continue;
            };
            grid.insert(cell_ref, CellRecord::from_changed(cell, updated_at));
        }
        log::info!("Persisted {} cell(s) for grid '{}'", cells.len(), grid_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(coordinate: &str, raw: &str, computed: &str) -> ChangedCell {
        ChangedCell {
            cell_coordinate: coordinate.to_string(),
            raw_value: raw.to_string(),
            computed_value: computed.to_string(),
        }
    }

    #[test]
    fn test_unknown_grid_is_empty() {
        let store = MemoryStore::new();
        assert!(store.load_grid("nope").unwrap().is_empty());
    }

    #[test]
    fn test_persist_upserts_and_orders_rows() {
        let store = MemoryStore::new();
        store
            .persist_changed_cells("g", &[changed("B2", "1", "1"), changed("A10", "2", "2")], "t1")
            .unwrap();
        store
            .persist_changed_cells("g", &[changed("B2", "3", "3")], "t2")
            .unwrap();

        let rows = store.load_grid("g").unwrap();
        let coordinates: Vec<&str> = rows.iter().map(|r| r.cell_coordinate.as_str()).collect();
        assert_eq!(coordinates, vec!["B2", "A10"]);
        assert_eq!(rows[0].value, "3");
        assert_eq!(rows[0].updated_at, "t2");
        assert_eq!(rows[1].updated_at, "t1");
    }

    #[test]
    fn test_persist_is_idempotent() {
        let store = MemoryStore::new();
        let cells = [changed("A1", "=1+1", "2")];
        store.persist_changed_cells("g", &cells, "t").unwrap();
        let first = store.load_grid("g").unwrap();
        store.persist_changed_cells("g", &cells, "t").unwrap();
        assert_eq!(store.load_grid("g").unwrap(), first);
        assert_eq!(store.grid_count(), 1);
    }
}
