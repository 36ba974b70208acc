//! Dashboard State
//! Ties a cached table to the active filters and exposes the pure render
//! entry points.

use std::sync::Arc;

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

use crate::data::{CleanTable, FilterState};

use super::view::{DashboardView, KpiReport};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Everything one dashboard run depends on: the cleaned table plus the
/// active filter selections. Re-rendering after a filter change means
/// calling `render` again with an updated state.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub table: Arc<CleanTable>,
    pub filters: FilterState,
}

impl DashboardState {
    pub fn new(table: Arc<CleanTable>, filters: FilterState) -> Self {
        Self { table, filters }
    }
}

/// Outcome of a dashboard run. Filters that exclude every row produce
/// `NoData` instead of aggregates over an empty table, where means and
/// argmax are undefined.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardOutcome {
    View(Box<DashboardView>),
    NoData,
}

/// Recompute the dashboard for the current state.
pub fn render(state: &DashboardState) -> Result<DashboardOutcome, DashboardError> {
    let filtered = state.filters.apply(&state.table)?;
    if filtered.is_empty() {
        return Ok(DashboardOutcome::NoData);
    }
    let view = DashboardView::build(&filtered)?;
    Ok(DashboardOutcome::View(Box::new(view)))
}

/// Build the static KPI report over the summary dataset.
pub fn summarize(table: &CleanTable) -> Result<KpiReport, DashboardError> {
    KpiReport::build(table)
}
