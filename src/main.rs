//! SalesPulse - Sales KPI Analysis & Dashboard Engine
//!
//! Loads the transaction spreadsheets, cleans them, computes the KPI
//! catalogue and emits the view models as JSON for a rendering layer.

mod charts;
mod dashboard;
mod data;
mod kpi;

use std::env;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dashboard::{render, summarize, DashboardState};
use data::{FilterOptions, FilterState, TableCache, TableSchema};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let summary_path = args.next().unwrap_or_else(|| "data_kpi.xlsx".to_string());
    let dashboard_path = args
        .next()
        .unwrap_or_else(|| "data_dashboard_large.xlsx".to_string());

    let mut cache = TableCache::new();

    let summary_table = cache
        .get_or_load(Path::new(&summary_path), &TableSchema::kpi_summary())
        .with_context(|| format!("loading {summary_path}"))?;
    let report = summarize(&summary_table)?;

    let dashboard_table = cache
        .get_or_load(Path::new(&dashboard_path), &TableSchema::dashboard())
        .with_context(|| format!("loading {dashboard_path}"))?;
    let filter_options = FilterOptions::from_table(&dashboard_table)?;
    let state = DashboardState::new(dashboard_table, FilterState::default());
    let outcome = render(&state)?;

    let output = serde_json::json!({
        "kpi_report": report,
        "dashboard": {
            "filters": filter_options,
            "view": outcome,
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
