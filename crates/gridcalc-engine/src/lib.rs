//! gridcalc_engine - Formula evaluation and dependency propagation.

pub(crate) mod builtins;
pub mod engine;
pub mod error;
