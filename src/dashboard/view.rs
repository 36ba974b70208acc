//! View Models
//! Serializable tables, scalars and chart series handed to the rendering
//! layer. Building a view is pure: same table in, same view out.

use serde::Serialize;

use crate::charts::{BarSeries, GroupedBarSeries, Histogram, LineSeries, PieSeries};
use crate::data::CleanTable;
use crate::kpi::{
    CategoryQuantity, CategoryRevenue, CategoryShare, CategoryStoreRevenue, ClientValue,
    DailyPoint, GroupMean, KpiCalculator, PaymentShare, RecurrenceStats, StoreSummary,
};

use super::state::DashboardError;

/// A display-ready scalar: the raw value plus its formatted text.
#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub value: f64,
    pub display: String,
}

impl Metric {
    /// Amount with thousands separators and the currency suffix.
    pub fn currency(value: f64) -> Self {
        let display = if value.is_finite() {
            format!("{} XAF", group_thousands(value, 2))
        } else {
            "n/a".to_string()
        };
        Self { value, display }
    }

    pub fn count(count: usize) -> Self {
        Self {
            value: count as f64,
            display: group_thousands(count as f64, 0),
        }
    }

    /// Plain two-decimal scalar (satisfaction scores, rates).
    pub fn score(value: f64) -> Self {
        let display = if value.is_finite() {
            format!("{value:.2}")
        } else {
            "n/a".to_string()
        };
        Self { value, display }
    }
}

/// Format with thousands separators: 1234.5 -> "1,234.50".
fn group_thousands(value: f64, decimals: usize) -> String {
    let negative = value < 0.0;
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, dec_part) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(dec) = dec_part {
        out.push('.');
        out.push_str(dec);
    }
    out
}

/// Static KPI report over the summary dataset.
#[derive(Debug, Clone, Serialize)]
pub struct KpiReport {
    pub average_transaction: Metric,
    pub categories: Vec<CategoryShare>,
    pub category_pie: PieSeries,
    pub recurrence: RecurrenceStats,
    pub payments: Vec<PaymentShare>,
    pub payment_bar: BarSeries,
    pub average_clv: Metric,
    pub top_clients: Vec<ClientValue>,
    pub category_revenue: Vec<CategoryRevenue>,
    pub category_revenue_bar: BarSeries,
    pub best_category: Option<CategoryRevenue>,
}

impl KpiReport {
    pub fn build(table: &CleanTable) -> Result<KpiReport, DashboardError> {
        let schema = table.schema();
        let categories = KpiCalculator::category_distribution(table)?;
        let payments = KpiCalculator::payment_method_mix(table)?;
        let clv = KpiCalculator::customer_lifetime_value(table)?;
        let performance = KpiCalculator::category_performance(table)?;

        Ok(KpiReport {
            average_transaction: Metric::currency(KpiCalculator::average_transaction(table)?),
            category_pie: PieSeries::new(
                categories
                    .iter()
                    .map(|share| (share.category.clone(), share.count as f64)),
            ),
            categories,
            recurrence: KpiCalculator::recurrence_rate(table)?,
            payment_bar: BarSeries::new(
                &schema.payment_method,
                "Part (%)",
                payments
                    .iter()
                    .map(|share| (share.method.clone(), share.share_pct)),
            ),
            payments,
            average_clv: Metric::currency(clv.average_clv),
            top_clients: clv.top(10).to_vec(),
            best_category: performance.first().cloned(),
            category_revenue_bar: BarSeries::new(
                &schema.category,
                &schema.amount,
                performance
                    .iter()
                    .map(|entry| (entry.category.clone(), entry.revenue)),
            ),
            category_revenue: performance,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewSection {
    pub total_sales: Metric,
    pub transactions: Metric,
    pub average_transaction: Metric,
    pub average_satisfaction: Metric,
    pub daily_sales: Vec<DailyPoint>,
    pub daily_sales_chart: LineSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSection {
    pub summary: Vec<StoreSummary>,
    pub sales_share: PieSeries,
    pub average_basket: BarSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySection {
    pub quantities: Vec<CategoryQuantity>,
    pub quantity_chart: BarSeries,
    pub revenue_by_store: Vec<CategoryStoreRevenue>,
    pub revenue_by_store_chart: GroupedBarSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSection {
    pub mix: Vec<PaymentShare>,
    pub mix_chart: PieSeries,
    pub most_used: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SatisfactionSection {
    pub average: Metric,
    pub by_store: Vec<GroupMean>,
    pub by_store_chart: BarSeries,
    pub by_category: Vec<GroupMean>,
    pub by_category_chart: BarSeries,
    pub distribution: Histogram,
}

/// The full interactive dashboard over a (filtered) dashboard table.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub overview: OverviewSection,
    pub stores: StoreSection,
    pub categories: CategorySection,
    pub payments: PaymentSection,
    pub satisfaction: SatisfactionSection,
}

impl DashboardView {
    pub fn build(table: &CleanTable) -> Result<DashboardView, DashboardError> {
        let schema = table.schema();
        let store_label = schema.store.as_deref().unwrap_or("Magasin");
        let date_label = schema.date.as_deref().unwrap_or("Date_Transaction");
        let score_label = schema.satisfaction.as_deref().unwrap_or("Satisfaction");

        let daily = KpiCalculator::daily_sales(table)?;
        let overview = OverviewSection {
            total_sales: Metric::currency(KpiCalculator::total_sales(table)?),
            transactions: Metric::count(KpiCalculator::transaction_count(table)),
            average_transaction: Metric::currency(KpiCalculator::average_transaction(table)?),
            average_satisfaction: Metric::score(KpiCalculator::satisfaction_average(table)?),
            daily_sales_chart: LineSeries::new(date_label, &schema.amount, &daily),
            daily_sales: daily,
        };

        let summary = KpiCalculator::store_summary(table)?;
        let stores = StoreSection {
            sales_share: PieSeries::new(
                summary
                    .iter()
                    .map(|store| (store.store.clone(), store.total_sales)),
            ),
            average_basket: BarSeries::new(
                store_label,
                &schema.amount,
                summary
                    .iter()
                    .map(|store| (store.store.clone(), store.average_transaction)),
            ),
            summary,
        };

        let quantities = KpiCalculator::quantity_by_category(table)?;
        let by_store = KpiCalculator::revenue_by_category_and_store(table)?;
        let categories = CategorySection {
            quantity_chart: BarSeries::new(
                &schema.category,
                schema.quantity.as_deref().unwrap_or("Quantite"),
                quantities
                    .iter()
                    .map(|entry| (entry.category.clone(), entry.quantity)),
            ),
            quantities,
            revenue_by_store_chart: GroupedBarSeries::new(
                &schema.category,
                &schema.amount,
                by_store
                    .iter()
                    .map(|entry| (entry.category.clone(), entry.store.clone(), entry.revenue)),
            ),
            revenue_by_store: by_store,
        };

        let mix = KpiCalculator::payment_method_mix(table)?;
        let payments = PaymentSection {
            most_used: mix.first().map(|share| share.method.clone()),
            mix_chart: PieSeries::new(
                mix.iter()
                    .map(|share| (share.method.clone(), share.count as f64)),
            ),
            mix,
        };

        // Both grouping dimensions are independent, compute them together
        let mut dims: Vec<&str> = Vec::new();
        if let Some(name) = &schema.store {
            dims.push(name);
        }
        dims.push(&schema.category);
        let mut means = KpiCalculator::satisfaction_by_dims(table, &dims)?;
        let by_store = schema
            .store
            .as_ref()
            .and_then(|name| means.remove(name.as_str()))
            .unwrap_or_default();
        let by_category = means.remove(schema.category.as_str()).unwrap_or_default();
        let scores = KpiCalculator::satisfaction_scores(table)?;
        let satisfaction = SatisfactionSection {
            average: Metric::score(KpiCalculator::satisfaction_average(table)?),
            by_store_chart: BarSeries::new(
                store_label,
                score_label,
                by_store.iter().map(|group| (group.group.clone(), group.mean)),
            ),
            by_store,
            by_category_chart: BarSeries::new(
                &schema.category,
                score_label,
                by_category
                    .iter()
                    .map(|group| (group.group.clone(), group.mean)),
            ),
            by_category,
            distribution: Histogram::from_scores(&scores, 5),
        };

        Ok(DashboardView {
            overview,
            stores,
            categories,
            payments,
            satisfaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataLoader, TableSchema};
    use polars::prelude::*;

    fn summary_table() -> CleanTable {
        let raw = DataFrame::new(vec![
            Column::new("ID_Client".into(), vec!["C1", "C1", "C2"]),
            Column::new("Categorie_Produit".into(), vec!["Food", "Food", "Tech"]),
            Column::new("Mode_Paiement".into(), vec!["Carte", "Carte", "Espèces"]),
            Column::new("Montant_Transaction".into(), vec!["100", "50", "200"]),
        ])
        .unwrap();
        DataLoader::clean(&raw, &TableSchema::kpi_summary()).unwrap()
    }

    fn dashboard_table() -> CleanTable {
        let raw = DataFrame::new(vec![
            Column::new("ID_Client".into(), vec!["C1", "C2", "C3"]),
            Column::new("Categorie_Produit".into(), vec!["Food", "Tech", "Food"]),
            Column::new("Magasin".into(), vec!["Douala", "Douala", "Yaoundé"]),
            Column::new("Mode_Paiement".into(), vec!["Carte", "Carte", "Espèces"]),
            Column::new("Montant".into(), vec!["1000", "2000", "3000"]),
            Column::new("Quantite".into(), vec!["1", "2", "3"]),
            Column::new("Satisfaction_Client".into(), vec!["4", "5", "3"]),
            Column::new(
                "Date_Transaction".into(),
                vec!["2024-01-01", "2024-01-02", "2024-01-02"],
            ),
        ])
        .unwrap();
        DataLoader::clean(&raw, &TableSchema::dashboard()).unwrap()
    }

    #[test]
    fn currency_metrics_use_thousands_separators() {
        assert_eq!(Metric::currency(1234.5).display, "1,234.50 XAF");
        assert_eq!(Metric::currency(0.0).display, "0.00 XAF");
        assert_eq!(Metric::currency(1_000_000.99).display, "1,000,000.99 XAF");
        assert_eq!(Metric::count(12345).display, "12,345");
        assert_eq!(Metric::currency(f64::NAN).display, "n/a");
    }

    #[test]
    fn report_names_the_best_category() {
        let report = KpiReport::build(&summary_table()).unwrap();
        let best = report.best_category.unwrap();
        assert_eq!(best.category, "Tech");
        assert!((best.revenue - 200.0).abs() < f64::EPSILON);
        assert_eq!(report.average_transaction.display, "116.67 XAF");
        assert_eq!(report.top_clients.len(), 2);
    }

    #[test]
    fn dashboard_view_covers_every_section() {
        let view = DashboardView::build(&dashboard_table()).unwrap();
        assert_eq!(view.overview.total_sales.display, "6,000.00 XAF");
        assert_eq!(view.overview.transactions.display, "3");
        assert_eq!(view.overview.daily_sales.len(), 2);
        assert_eq!(view.stores.summary.len(), 2);
        assert_eq!(view.categories.revenue_by_store.len(), 3);
        assert_eq!(view.payments.most_used.as_deref(), Some("Carte"));
        assert_eq!(view.satisfaction.distribution.total(), 3);
        assert_eq!(view.satisfaction.by_store.len(), 2);
    }

    #[test]
    fn view_serializes_for_the_rendering_layer() {
        let view = DashboardView::build(&dashboard_table()).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["overview"]["total_sales"]["display"].is_string());
        assert!(json["satisfaction"]["distribution"]["bins"].is_array());
    }
}
