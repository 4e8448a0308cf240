//! # Reference Data Report
//!
//! File: cli/src/commands/data.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `statbot data` loads the reference CSV exactly as the server would and
//! prints what the model will see: row count, column names and the rendered
//! table. It needs no API key, and a missing or unreadable file is reported
//! rather than treated as a failure.
//!
use super::CommonArgs;
use crate::chat::dataset::read_reference_table;
use crate::core::config::{self, ConfigOverrides};
use crate::core::error::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Arguments for `statbot data`.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Number of rows to render.
    #[arg(long, short, default_value_t = 10)]
    pub rows: usize,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn handle_data(args: DataArgs) -> Result<()> {
    info!("Handling data command with args: {:?}", args);

    let overrides = ConfigOverrides {
        data: args.common.data.clone(),
        ..Default::default()
    };
    let config = config::load_config(args.common.config.as_deref())?.with_overrides(&overrides)?;

    report(&config.data.path, args.rows, &mut std::io::stdout())
}

fn report<W: Write>(path: &Path, rows: usize, out: &mut W) -> Result<()> {
    let table = match read_reference_table(path) {
        Ok(table) => table,
        Err(e) => {
            writeln!(out, "No reference data: {}", e)?;
            return Ok(());
        }
    };

    writeln!(out, "Reference data: {}", path.display())?;
    writeln!(out, "Rows:    {}", table.len())?;
    writeln!(out, "Columns: {}", table.columns().join(", "))?;
    writeln!(out)?;
    writeln!(out, "{}", table.render(rows))?;
    if table.len() > rows {
        writeln!(out, "... {} more rows", table.len() - rows)?;
    }
    Ok(())
}
