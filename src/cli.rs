//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use gridcalc_core::{Config, CyclePolicy, StoreKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridcalc")]
#[command(
    version,
    about = "Spreadsheet formula evaluation with dependency propagation"
)]
pub struct Cli {
    /// Config file (default: <config_dir>/gridcalc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding .grd grid files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep grids in memory for this run only
    #[arg(long, global = true)]
    pub memory: bool,

    /// What a circular reference evaluates to
    #[arg(long, global = true, value_enum)]
    pub cycle_policy: Option<CyclePolicyArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set a cell and recalculate its dependents
    Set {
        grid: String,
        cell: String,
        /// Literal text, or a formula starting with '='
        raw: String,
    },

    /// Print every stored cell of a grid
    Get { grid: String },

    /// Evaluate a formula without storing it
    Eval {
        /// Formula body; the leading '=' is optional
        formula: String,

        /// Resolve references against this grid
        #[arg(short, long)]
        grid: Option<String>,
    },

    /// Read JSON events from stdin, one per line, and print one response per line
    Handle,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CyclePolicyArg {
    Propagate,
    Flag,
}

impl From<CyclePolicyArg> for CyclePolicy {
    fn from(arg: CyclePolicyArg) -> Self {
        match arg {
            CyclePolicyArg::Propagate => CyclePolicy::Propagate,
            CyclePolicyArg::Flag => CyclePolicy::Flag,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if self.memory {
            config.store = StoreKind::Memory;
        }
        if let Some(policy) = self.cycle_policy {
            config.cycle_policy = policy.into();
        }
    }
}
