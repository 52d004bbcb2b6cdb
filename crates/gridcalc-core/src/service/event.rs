//! JSON event front end for [`GridService`].
//!
//! An event names an `operation` plus its parameters:
//!
//! ```json
//! {"operation": "update_cell", "gridFileId": "g1", "cellCoordinate": "B1", "rawValue": "=A1+1"}
//! {"operation": "get_grid_data", "gridFileId": "g1"}
//! ```

use serde::Serialize;
use serde_json::{Value, json};

use super::GridService;
use crate::error::GridcalcError;
use crate::storage::GridStore;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: Value,
}

impl Response {
    fn ok(body: impl Serialize) -> Response {
        match serde_json::to_value(body) {
            Ok(body) => Response {
                status_code: 200,
                body,
            },
            Err(e) => Response::from_error(&GridcalcError::Json(e)),
        }
    }

    fn bad_request(message: &str) -> Response {
        Response {
            status_code: 400,
            body: json!({ "error": message }),
        }
    }

    fn from_error(err: &GridcalcError) -> Response {
        let status_code = if err.is_client_error() { 400 } else { 500 };
        if status_code == 500 {
            log::error!("Handler error: {}", err);
        }
        Response {
            status_code,
            body: json!({ "error": err.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// A string parameter. Numbers and booleans are accepted as their text so
/// `"rawValue": 5` means the same as `"rawValue": "5"`.
fn text_param(event: &Value, key: &str) -> Option<String> {
    match event.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<S: GridStore> GridService<S> {
    /// Dispatch one event to the operation it names.
    pub fn handle(&self, event: &Value) -> Response {
        let operation = event.get("operation").and_then(Value::as_str);
        log::info!("Received event: operation={:?}", operation);
        match operation {
            Some("update_cell") => self.handle_update_cell(event),
            Some("get_grid_data") => self.handle_get_grid_data(event),
            _ => Response::bad_request("Invalid operation"),
        }
    }

    /// Parse `line` as a JSON event and handle it.
    pub fn handle_str(&self, line: &str) -> Response {
        match serde_json::from_str::<Value>(line) {
            Ok(event) => self.handle(&event),
            Err(e) => Response::bad_request(&format!("Invalid JSON: {}", e)),
        }
    }

    fn handle_update_cell(&self, event: &Value) -> Response {
        let grid_id = text_param(event, "gridFileId").filter(|s| !s.is_empty());
        let coordinate = text_param(event, "cellCoordinate").filter(|s| !s.is_empty());
        // An empty raw value is an edit that clears the cell
        let raw_value = text_param(event, "rawValue");

        let (Some(grid_id), Some(coordinate), Some(raw_value)) = (grid_id, coordinate, raw_value)
        else {
            return Response::bad_request("Missing required parameters");
        };

        match self.update_cell(&grid_id, &coordinate, &raw_value) {
            Ok(result) => Response::ok(result),
            Err(e) => Response::from_error(&e),
        }
    }

    fn handle_get_grid_data(&self, event: &Value) -> Response {
        let Some(grid_id) = text_param(event, "gridFileId").filter(|s| !s.is_empty()) else {
            return Response::bad_request("Missing gridFileId");
        };
        match self.get_grid_data(&grid_id) {
            Ok(data) => Response::ok(data),
            Err(e) => Response::from_error(&e),
        }
    }
}
