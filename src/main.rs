//! Gridcalc - spreadsheet formula evaluation from the command line

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use gridcalc_core::{Config, FileStore, GridService, GridStore, MemoryStore, StoreKind};
use gridcalc_engine::engine::is_error_value;
use std::io::{self, BufRead, Write};

use cli::{Cli, Commands};

type Service = GridService<Box<dyn GridStore>>;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    cli.apply_overrides(&mut config);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let service = build_service(&config)?;

    match cli.command {
        Commands::Set { grid, cell, raw } => {
            let result = service.update_cell(&grid, &cell, &raw)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Get { grid } => {
            let data = service.get_grid_data(&grid)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Eval { formula, grid } => {
            let value = service.evaluate(grid.as_deref(), &formula)?;
            println!("{}", value);
            if is_error_value(&value) {
                return Ok(1);
            }
        }
        Commands::Handle => handle_stdin(&service)?,
    }
    Ok(0)
}

fn build_service(config: &Config) -> Result<Service> {
    let store: Box<dyn GridStore> = match config.store {
        StoreKind::Memory => Box::new(MemoryStore::new()),
        StoreKind::File => {
            let dir = config.resolved_data_dir()?;
            log::debug!("Using grid files in {}", dir.display());
            let store = FileStore::new(&dir)
                .with_context(|| format!("Failed to open data dir '{}'", dir.display()))?;
            Box::new(store)
        }
    };
    Ok(GridService::with_options(store, config.recalc_options()))
}

fn handle_stdin(service: &Service) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = service.handle_str(&line);
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}
