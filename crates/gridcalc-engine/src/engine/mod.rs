//! Spreadsheet engine API.
//!
//! This module provides the formula evaluation and recalculation engine:
//!
//! - [`CellRef`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`Cell`], [`Grid`] - Transaction-local snapshot of a grid's cells
//! - [`evaluate_arithmetic`] - Arithmetic parser for substituted expressions
//! - [`Evaluator`], [`evaluate_formula`] - Formula evaluation with cycle tracking
//! - [`find_dependents`] - Discover formulas that read a changed cell
//! - [`apply_edit`] - Apply an edit and recalculate everything downstream
//! - [`format_number`], [`parse_number`] - Canonical numeric text

mod arith;
mod cell;
mod cell_ref;
mod deps;
mod eval;
mod format;
mod recalc;

pub use crate::error::{EngineError, Result};
pub use arith::{ArithError, evaluate_arithmetic};
pub use cell::{Cell, Grid};
pub use cell_ref::CellRef;
pub use deps::{CellRange, find_dependents, formula_reads, parse_range};
pub use eval::{CyclePolicy, Evaluator, evaluate_formula};
pub use format::{CYCLE_SENTINEL, ERROR_SENTINEL, format_number, is_error_value, parse_number};
pub use recalc::{ChangedCell, RecalcOptions, apply_edit, apply_edit_with_options};
