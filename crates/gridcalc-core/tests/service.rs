//! End-to-end behaviour of the cell-update service over both stores.

use gridcalc_core::{ChangedCell, CyclePolicy, FileStore, GridService, GridStore, MemoryStore, RecalcOptions};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn summary(cells: &[ChangedCell]) -> Vec<(String, String)> {
    cells
        .iter()
        .map(|c| (c.cell_coordinate.clone(), c.computed_value.clone()))
        .collect()
}

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(c, v)| (c.to_string(), v.to_string()))
        .collect()
}

fn seeded<S: GridStore>(store: S, cells: &[(&str, &str)]) -> GridService<S> {
    let service = GridService::new(store);
    for (coordinate, raw) in cells {
        service.update_cell("sheet", coordinate, raw).unwrap();
    }
    service
}

#[test]
fn test_single_dependency() {
    let service = seeded(MemoryStore::new(), &[("A1", "5"), ("B1", "=A1+1")]);
    let result = service.update_cell("sheet", "A1", "10").unwrap();
    assert_eq!(summary(&result.changed_cells), pairs(&[("A1", "10"), ("B1", "11")]));
}

#[test]
fn test_chained_dependency() {
    let service = seeded(MemoryStore::new(), &[("A1", "1"), ("B1", "=A1*2"), ("C1", "=B1+1")]);
    let result = service.update_cell("sheet", "A1", "3").unwrap();
    assert_eq!(
        summary(&result.changed_cells),
        pairs(&[("A1", "3"), ("B1", "6"), ("C1", "7")])
    );

    let data = service.get_grid_data("sheet").unwrap();
    assert_eq!(data.grid_data["C1"].computed_value, "7");
}

#[test]
fn test_aggregates_over_mixed_values() {
    let service = seeded(
        MemoryStore::new(),
        &[
            ("A1", "2"),
            ("A2", "x"),
            ("B1", "=SUM(A1:A3)"),
            ("B2", "=AVG(A1:A3)"),
            ("B3", "=COUNT(A1:A3)"),
        ],
    );
    let data = service.get_grid_data("sheet").unwrap();
    assert_eq!(data.grid_data["B1"].computed_value, "2");
    assert_eq!(data.grid_data["B2"].computed_value, "2");
    assert_eq!(data.grid_data["B3"].computed_value, "2");
}

#[test]
fn test_self_reference_terminates() {
    let service = GridService::new(MemoryStore::new());
    let result = service.update_cell("sheet", "A1", "=A1").unwrap();
    assert!(result.changed_cells.iter().all(|c| c.computed_value == "0"));

    let flagged = GridService::with_options(
        MemoryStore::new(),
        RecalcOptions {
            cycle_policy: CyclePolicy::Flag,
        },
    );
    let result = flagged.update_cell("sheet", "A1", "=A1").unwrap();
    assert!(result.changed_cells.iter().all(|c| c.computed_value == "#CYCLE"));
}

#[test]
fn test_mutual_cycle_stores_last_recomputation() {
    let service = seeded(MemoryStore::new(), &[("A1", "1"), ("B1", "=A1*2")]);
    let result = service.update_cell("sheet", "A1", "=B1+1").unwrap();
    assert_eq!(
        summary(&result.changed_cells),
        pairs(&[("A1", "1"), ("B1", "2"), ("A1", "1")])
    );

    let rows = service.store().load_grid("sheet").unwrap();
    let stored: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r.cell_coordinate.as_str(), r.value.as_str()))
        .collect();
    assert_eq!(stored, vec![("A1", "1"), ("B1", "2")]);
}

#[test]
fn test_invalid_expression_is_error_value() {
    let service = seeded(MemoryStore::new(), &[("A1", "1"), ("B1", "2")]);
    let result = service.update_cell("sheet", "C1", "=A1&B1").unwrap();
    assert_eq!(summary(&result.changed_cells), pairs(&[("C1", "#ERR")]));
}

#[test]
fn test_repeated_edit_is_idempotent() {
    let service = seeded(MemoryStore::new(), &[("A1", "1"), ("B1", "=A1+1"), ("C1", "=SUM(A1:B1)")]);
    let first = service.update_cell("sheet", "A1", "4").unwrap();
    let second = service.update_cell("sheet", "A1", "4").unwrap();
    assert_eq!(first.changed_cells, second.changed_cells);
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let service = seeded(FileStore::new(dir.path()).unwrap(), &[("A1", "5"), ("B1", "=A1+1")]);
        service.update_cell("sheet", "A1", "\"quoted\" text").unwrap();
    }

    let service = GridService::new(FileStore::new(dir.path()).unwrap());
    let data = service.get_grid_data("sheet").unwrap();
    assert_eq!(data.grid_data["A1"].raw_value, "\"quoted\" text");
    assert_eq!(data.grid_data["B1"].computed_value, "1");

    let result = service.update_cell("sheet", "A1", "41").unwrap();
    assert_eq!(summary(&result.changed_cells), pairs(&[("A1", "41"), ("B1", "42")]));
}

#[test]
fn test_concurrent_edits_to_one_grid_are_serialised() {
    let service = Arc::new(GridService::new(MemoryStore::new()));
    service.update_cell("sheet", "A1", "=SUM(B1:B8)").unwrap();

    let handles: Vec<_> = (1..=8)
        .map(|row| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .update_cell("sheet", &format!("B{}", row), &row.to_string())
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let data = service.get_grid_data("sheet").unwrap();
    assert_eq!(data.grid_data["A1"].computed_value, "36");
}

#[test]
fn test_handle_round_trip() {
    let service = GridService::new(MemoryStore::new());
    let response = service.handle(&json!({
        "operation": "update_cell",
        "gridFileId": "sheet",
        "cellCoordinate": "A1",
        "rawValue": "=2*(3+4)",
    }));
    assert_eq!(response.status_code, 200);

    let response = service.handle_str(r#"{"operation":"get_grid_data","gridFileId":"sheet"}"#);
    assert_eq!(
        response.body,
        json!({
            "gridFileId": "sheet",
            "gridData": { "A1": { "rawValue": "=2*(3+4)", "computedValue": "14" } }
        })
    );
}
