//! Cell-update service.
//!
//! [`GridService`] is the transaction boundary around the engine. Each
//! operation validates its input, loads the grid through the store into a
//! fresh snapshot, runs the engine and persists what changed. Edits to the
//! same grid are serialised through a per-grid lock; different grids proceed
//! in parallel. A grid's lock entry lives only while edits hold or wait on it.

mod event;

pub use event::Response;

use chrono::Utc;
use dashmap::DashMap;
use gridcalc_engine::engine::{ChangedCell, Evaluator, Grid, RecalcOptions, apply_edit_with_options};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{GridcalcError, Result};
use crate::storage::{GridStore, snapshot_from_records, validate_grid_id};

/// Result of an `update_cell` operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub grid_file_id: String,
    pub changed_cells: Vec<ChangedCell>,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub raw_value: String,
    pub computed_value: String,
}

/// Every stored cell of a grid, keyed by coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridData {
    pub grid_file_id: String,
    pub grid_data: BTreeMap<String, CellData>,
}

pub struct GridService<S: GridStore> {
    store: S,
    options: RecalcOptions,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: GridStore> GridService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, RecalcOptions::default())
    }

    pub fn with_options(store: S, options: RecalcOptions) -> Self {
        GridService {
            store,
            options,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn grid_lock(&self, grid_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(grid_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn load_snapshot(&self, grid_id: &str) -> Result<Grid> {
        let records = self.store.load_grid(grid_id)?;
        Ok(snapshot_from_records(&records))
    }

    /// Drop the lock entry for `grid_id` once no edit holds or waits on it.
    fn release_grid_lock(&self, grid_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(grid_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Set one cell and persist it together with every recalculated dependent.
    pub fn update_cell(&self, grid_id: &str, cell_coordinate: &str, raw_value: &str) -> Result<UpdateResult> {
        validate_grid_id(grid_id)?;
        if cell_coordinate.is_empty() {
            return Err(GridcalcError::Validation(
                "Missing required parameters".to_string(),
            ));
        }

        let lock = self.grid_lock(grid_id);
        let result = {
            // A panic in another edit leaves nothing half-written in the snapshot,
            // which is discarded, so a poisoned lock is still usable.
            let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.apply_and_persist(grid_id, cell_coordinate, raw_value)
        };
        self.release_grid_lock(grid_id, lock);
        result
    }

    fn apply_and_persist(&self, grid_id: &str, cell_coordinate: &str, raw_value: &str) -> Result<UpdateResult> {
        let mut grid = self.load_snapshot(grid_id)?;
        let changed_cells = apply_edit_with_options(&mut grid, cell_coordinate, raw_value, self.options)?;

        let updated_at = Utc::now().to_rfc3339();
        self.store
            .persist_changed_cells(grid_id, &changed_cells, &updated_at)?;

        log::info!(
            "Updated {}!{}: {} cell(s) persisted",
            grid_id,
            cell_coordinate,
            changed_cells.len()
        );

        Ok(UpdateResult {
            grid_file_id: grid_id.to_string(),
            changed_cells,
            updated_at,
        })
    }

    /// Every stored cell of a grid, as last persisted.
    pub fn get_grid_data(&self, grid_id: &str) -> Result<GridData> {
        validate_grid_id(grid_id)?;
        let grid_data = self
            .store
            .load_grid(grid_id)?
            .into_iter()
            .map(|record| {
                (
                    record.cell_coordinate,
                    CellData {
                        raw_value: record.raw_value,
                        computed_value: record.value,
                    },
                )
            })
            .collect();
        Ok(GridData {
            grid_file_id: grid_id.to_string(),
            grid_data,
        })
    }

    /// Evaluate a formula without storing anything, against a grid's stored
    /// cells or against an empty snapshot. A leading `=` is optional.
    pub fn evaluate(&self, grid_id: Option<&str>, formula: &str) -> Result<String> {
        let grid = match grid_id {
            Some(id) => {
                validate_grid_id(id)?;
                self.load_snapshot(id)?
            }
            None => Grid::new(),
        };
        let body = formula.trim();
        let body = body.strip_prefix('=').unwrap_or(body);
        Ok(Evaluator::new(&grid, self.options.cycle_policy).evaluate(body))
    }
}
