//! gridcalc-core - Storage port, grid stores and the cell-update service.

pub mod config;
pub mod error;
pub mod service;
pub mod storage;

pub use config::{Config, StoreKind};
pub use error::{GridcalcError, Result};
pub use service::{CellData, GridData, GridService, Response, UpdateResult};
pub use storage::{CellRecord, FileStore, GridStore, MemoryStore};

pub use gridcalc_engine::engine::{ChangedCell, CyclePolicy, RecalcOptions};
