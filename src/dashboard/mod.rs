//! Dashboard module - filterable view models for the rendering layer

mod state;
mod view;

pub use state::{render, summarize, DashboardError, DashboardOutcome, DashboardState};
pub use view::{
    CategorySection, DashboardView, KpiReport, Metric, OverviewSection, PaymentSection,
    SatisfactionSection, StoreSection,
};
