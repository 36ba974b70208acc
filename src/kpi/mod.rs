//! KPI module - descriptive sales aggregates

mod calculator;

pub use calculator::{
    CategoryQuantity, CategoryRevenue, CategoryShare, CategoryStoreRevenue, ClientValue,
    ClvSummary, DailyPoint, GroupMean, KpiCalculator, PaymentShare, RecurrenceStats, StoreSummary,
};
