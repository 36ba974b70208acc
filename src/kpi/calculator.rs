//! KPI Calculator Module
//! One pure aggregation per KPI over the cleaned transaction table.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::CleanTable;

/// Count and share of one category label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: usize,
    pub share_pct: f64,
}

/// Normalized frequency of one payment method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentShare {
    pub method: String,
    pub count: usize,
    pub share_pct: f64,
}

/// Distinct-client recurrence. A client recurs when it has more than one
/// transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecurrenceStats {
    pub total_clients: usize,
    pub recurring_clients: usize,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientValue {
    pub client: String,
    pub clv: f64,
}

/// Per-client lifetime values, descending, plus their mean.
#[derive(Debug, Clone, Serialize)]
pub struct ClvSummary {
    pub per_client: Vec<ClientValue>,
    pub average_clv: f64,
}

impl ClvSummary {
    /// Highest-value clients, at most `n`.
    pub fn top(&self, n: usize) -> &[ClientValue] {
        &self.per_client[..self.per_client.len().min(n)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub store: String,
    pub total_sales: f64,
    pub transactions: usize,
    pub average_transaction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryQuantity {
    pub category: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStoreRevenue {
    pub category: String,
    pub store: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: f64,
}

/// Mean of a numeric column within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub mean: f64,
    pub count: usize,
}

/// Handles the KPI aggregations. Every function is pure over the table it
/// receives; callers that cannot tolerate NaN results (the dashboard)
/// short-circuit empty input before getting here.
pub struct KpiCalculator;

impl KpiCalculator {
    /// Mean transaction amount. NaN on an empty table.
    pub fn average_transaction(table: &CleanTable) -> PolarsResult<f64> {
        let amounts = Self::amounts(table)?;
        if amounts.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(amounts.iter().sum::<f64>() / amounts.len() as f64)
    }

    pub fn total_sales(table: &CleanTable) -> PolarsResult<f64> {
        Ok(Self::amounts(table)?.iter().sum())
    }

    pub fn transaction_count(table: &CleanTable) -> usize {
        table.height()
    }

    /// Sales count and share per category, descending by count. Ties keep
    /// first-occurrence order.
    pub fn category_distribution(table: &CleanTable) -> PolarsResult<Vec<CategoryShare>> {
        let labels = table.strings(&table.schema().category)?;
        Ok(Self::label_shares(&labels)
            .into_iter()
            .map(|(category, count, share_pct)| CategoryShare {
                category,
                count,
                share_pct,
            })
            .collect())
    }

    /// Share of distinct clients with more than one transaction.
    pub fn recurrence_rate(table: &CleanTable) -> PolarsResult<RecurrenceStats> {
        let Some(client_col) = &table.schema().client_id else {
            return Ok(RecurrenceStats::default());
        };
        let counts = Self::count_by_label(&table.strings(client_col)?);
        let total_clients = counts.len();
        let recurring_clients = counts.iter().filter(|(_, count)| *count > 1).count();
        let rate_pct = if total_clients > 0 {
            recurring_clients as f64 / total_clients as f64 * 100.0
        } else {
            0.0
        };
        Ok(RecurrenceStats {
            total_clients,
            recurring_clients,
            rate_pct,
        })
    }

    /// Normalized payment-method frequencies, descending. The head is the
    /// most-used method.
    pub fn payment_method_mix(table: &CleanTable) -> PolarsResult<Vec<PaymentShare>> {
        let labels = table.strings(&table.schema().payment_method)?;
        Ok(Self::label_shares(&labels)
            .into_iter()
            .map(|(method, count, share_pct)| PaymentShare {
                method,
                count,
                share_pct,
            })
            .collect())
    }

    /// Lifetime value per client (sum of its amounts), descending.
    pub fn customer_lifetime_value(table: &CleanTable) -> PolarsResult<ClvSummary> {
        let Some(client_col) = &table.schema().client_id else {
            return Ok(ClvSummary {
                per_client: Vec::new(),
                average_clv: f64::NAN,
            });
        };
        let keys = table.strings(client_col)?;
        let amounts = Self::amounts(table)?;
        let mut per_client: Vec<ClientValue> = Self::sum_by_key(&keys, &amounts)
            .into_iter()
            .map(|(client, total, _)| ClientValue { client, clv: total })
            .collect();
        per_client.sort_by(|a, b| b.clv.partial_cmp(&a.clv).unwrap_or(Ordering::Equal));
        let average_clv = if per_client.is_empty() {
            f64::NAN
        } else {
            per_client.iter().map(|c| c.clv).sum::<f64>() / per_client.len() as f64
        };
        Ok(ClvSummary {
            per_client,
            average_clv,
        })
    }

    /// Revenue per category, descending. Ties keep first-occurrence order,
    /// so the head is a deterministic best category.
    pub fn category_performance(table: &CleanTable) -> PolarsResult<Vec<CategoryRevenue>> {
        let keys = table.strings(&table.schema().category)?;
        let amounts = Self::amounts(table)?;
        let mut revenue: Vec<CategoryRevenue> = Self::sum_by_key(&keys, &amounts)
            .into_iter()
            .map(|(category, total, _)| CategoryRevenue {
                category,
                revenue: total,
            })
            .collect();
        revenue.sort_by(|a, b| b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal));
        Ok(revenue)
    }

    /// Revenue, transaction count and mean basket per store.
    pub fn store_summary(table: &CleanTable) -> PolarsResult<Vec<StoreSummary>> {
        let Some(store_col) = &table.schema().store else {
            return Ok(Vec::new());
        };
        let keys = table.strings(store_col)?;
        let amounts = Self::amounts(table)?;
        Ok(Self::sum_by_key(&keys, &amounts)
            .into_iter()
            .map(|(store, total, count)| StoreSummary {
                store,
                total_sales: total,
                transactions: count,
                average_transaction: total / count as f64,
            })
            .collect())
    }

    /// Units sold per category; null quantities contribute nothing.
    pub fn quantity_by_category(table: &CleanTable) -> PolarsResult<Vec<CategoryQuantity>> {
        let schema = table.schema();
        let Some(quantity_col) = &schema.quantity else {
            return Ok(Vec::new());
        };
        let keys = table.strings(&schema.category)?;
        let quantities = table.floats(quantity_col)?;
        let (keys, values) = Self::paired(&keys, &quantities);
        Ok(Self::sum_by_key(&keys, &values)
            .into_iter()
            .map(|(category, total, _)| CategoryQuantity {
                category,
                quantity: total,
            })
            .collect())
    }

    /// Revenue per (category, store) pair, first-occurrence order.
    pub fn revenue_by_category_and_store(
        table: &CleanTable,
    ) -> PolarsResult<Vec<CategoryStoreRevenue>> {
        let schema = table.schema();
        let Some(store_col) = &schema.store else {
            return Ok(Vec::new());
        };
        let categories = table.strings(&schema.category)?;
        let stores = table.strings(store_col)?;
        let amounts = Self::amounts(table)?;

        let mut order: Vec<(String, String)> = Vec::new();
        let mut totals: HashMap<(String, String), f64> = HashMap::new();
        for ((category, store), amount) in categories.iter().zip(&stores).zip(&amounts) {
            let (Some(category), Some(store)) = (category, store) else {
                continue;
            };
            let key = (category.clone(), store.clone());
            if !totals.contains_key(&key) {
                order.push(key.clone());
            }
            *totals.entry(key).or_insert(0.0) += amount;
        }
        Ok(order
            .into_iter()
            .map(|key| {
                let revenue = totals[&key];
                CategoryStoreRevenue {
                    category: key.0,
                    store: key.1,
                    revenue,
                }
            })
            .collect())
    }

    /// Revenue per transaction date, ascending.
    pub fn daily_sales(table: &CleanTable) -> PolarsResult<Vec<DailyPoint>> {
        let Some(date_col) = &table.schema().date else {
            return Ok(Vec::new());
        };
        let dates = table.dates(date_col)?;
        let amounts = Self::amounts(table)?;
        let mut totals: HashMap<NaiveDate, f64> = HashMap::new();
        for (date, amount) in dates.iter().zip(&amounts) {
            let Some(date) = date else { continue };
            *totals.entry(*date).or_insert(0.0) += amount;
        }
        let mut points: Vec<DailyPoint> = totals
            .into_iter()
            .map(|(date, total)| DailyPoint { date, total })
            .collect();
        points.sort_by_key(|point| point.date);
        Ok(points)
    }

    /// Mean satisfaction score; null scores are excluded. NaN when no
    /// score survives.
    pub fn satisfaction_average(table: &CleanTable) -> PolarsResult<f64> {
        let scores = Self::satisfaction_scores(table)?;
        if scores.is_empty() {
            return Ok(f64::NAN);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Non-null satisfaction scores, in row order.
    pub fn satisfaction_scores(table: &CleanTable) -> PolarsResult<Vec<f64>> {
        let Some(score_col) = &table.schema().satisfaction else {
            return Ok(Vec::new());
        };
        Ok(table.floats(score_col)?.into_iter().flatten().collect())
    }

    /// Mean satisfaction grouped by `group_col`; null scores excluded.
    pub fn satisfaction_by(table: &CleanTable, group_col: &str) -> PolarsResult<Vec<GroupMean>> {
        let Some(score_col) = &table.schema().satisfaction else {
            return Ok(Vec::new());
        };
        let keys = table.strings(group_col)?;
        let scores = table.floats(score_col)?;
        let (keys, values) = Self::paired(&keys, &scores);
        Ok(Self::sum_by_key(&keys, &values)
            .into_iter()
            .map(|(group, total, count)| GroupMean {
                group,
                mean: total / count as f64,
                count,
            })
            .collect())
    }

    /// Grouped satisfaction means for several dimensions in parallel.
    pub fn satisfaction_by_dims(
        table: &CleanTable,
        dims: &[&str],
    ) -> PolarsResult<HashMap<String, Vec<GroupMean>>> {
        dims.par_iter()
            .map(|dim| Self::satisfaction_by(table, dim).map(|means| ((*dim).to_string(), means)))
            .collect()
    }

    /// Amount column values; non-null for every row after cleaning.
    fn amounts(table: &CleanTable) -> PolarsResult<Vec<f64>> {
        Ok(table
            .floats(&table.schema().amount)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Keep only rows where both the key and the value are present.
    fn paired(keys: &[Option<String>], values: &[Option<f64>]) -> (Vec<Option<String>>, Vec<f64>) {
        let mut kept_keys = Vec::new();
        let mut kept_values = Vec::new();
        for (key, value) in keys.iter().zip(values) {
            if let (Some(key), Some(value)) = (key, value) {
                kept_keys.push(Some(key.clone()));
                kept_values.push(*value);
            }
        }
        (kept_keys, kept_values)
    }

    /// Sum and count of `values` per key, in first-occurrence key order.
    fn sum_by_key(keys: &[Option<String>], values: &[f64]) -> Vec<(String, f64, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, (f64, usize)> = HashMap::new();
        for (key, value) in keys.iter().zip(values) {
            let Some(key) = key else { continue };
            if !totals.contains_key(key) {
                order.push(key.clone());
            }
            let entry = totals.entry(key.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        order
            .into_iter()
            .map(|key| {
                let (total, count) = totals[&key];
                (key, total, count)
            })
            .collect()
    }

    /// Occurrences per label, in first-occurrence order.
    fn count_by_label(labels: &[Option<String>]) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for label in labels.iter().flatten() {
            if !counts.contains_key(label) {
                order.push(label.clone());
            }
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        order
            .into_iter()
            .map(|label| {
                let count = counts[&label];
                (label, count)
            })
            .collect()
    }

    /// Counts plus percentage shares, stably sorted by descending count so
    /// ties resolve to the first occurrence.
    fn label_shares(labels: &[Option<String>]) -> Vec<(String, usize, f64)> {
        let counted = Self::count_by_label(labels);
        let total: usize = counted.iter().map(|(_, count)| *count).sum();
        let mut shares: Vec<(String, usize, f64)> = counted
            .into_iter()
            .map(|(label, count)| {
                let pct = if total > 0 {
                    count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                (label, count, pct)
            })
            .collect();
        shares.sort_by(|a, b| b.1.cmp(&a.1));
        shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataLoader, TableSchema};

    fn summary_table(rows: &[(&str, &str, &str)]) -> CleanTable {
        let clients: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let categories: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let amounts: Vec<&str> = rows.iter().map(|r| r.2).collect();
        let raw = DataFrame::new(vec![
            Column::new("ID_Client".into(), clients),
            Column::new("Categorie_Produit".into(), categories),
            Column::new("Mode_Paiement".into(), vec!["Carte"; rows.len()]),
            Column::new("Montant_Transaction".into(), amounts),
        ])
        .unwrap();
        DataLoader::clean(&raw, &TableSchema::kpi_summary()).unwrap()
    }

    fn dashboard_table() -> CleanTable {
        let raw = DataFrame::new(vec![
            Column::new("ID_Client".into(), vec!["C1", "C2", "C3", "C4"]),
            Column::new(
                "Categorie_Produit".into(),
                vec!["Food", "Tech", "Food", "Tech"],
            ),
            Column::new(
                "Magasin".into(),
                vec!["Douala", "Douala", "Yaoundé", "Yaoundé"],
            ),
            Column::new(
                "Mode_Paiement".into(),
                vec!["Carte", "Espèces", "Carte", "Mobile Money"],
            ),
            Column::new("Montant".into(), vec!["100", "200", "300", "400"]),
            Column::new("Quantite".into(), vec!["1", "2", "x", "4"]),
            Column::new("Satisfaction_Client".into(), vec!["4", "", "5", "3"]),
            Column::new(
                "Date_Transaction".into(),
                vec!["2024-01-01", "2024-01-01", "2024-01-02", "2024-01-03"],
            ),
        ])
        .unwrap();
        DataLoader::clean(&raw, &TableSchema::dashboard()).unwrap()
    }

    #[test]
    fn kpi_catalogue_end_to_end() {
        let table = summary_table(&[
            ("C1", "Food", "100"),
            ("C1", "Food", "50"),
            ("C2", "Tech", "200"),
        ]);

        let average = KpiCalculator::average_transaction(&table).unwrap();
        assert!((average - 116.666_666).abs() < 0.001);

        let distribution = KpiCalculator::category_distribution(&table).unwrap();
        assert_eq!(distribution[0].category, "Food");
        assert!((distribution[0].share_pct - 66.666_666).abs() < 0.001);
        assert_eq!(distribution[1].category, "Tech");
        assert!((distribution[1].share_pct - 33.333_333).abs() < 0.001);

        let recurrence = KpiCalculator::recurrence_rate(&table).unwrap();
        assert_eq!(recurrence.total_clients, 2);
        assert_eq!(recurrence.recurring_clients, 1);
        assert!((recurrence.rate_pct - 50.0).abs() < f64::EPSILON);

        let clv = KpiCalculator::customer_lifetime_value(&table).unwrap();
        assert_eq!(clv.per_client[0].client, "C2");
        assert!((clv.per_client[0].clv - 200.0).abs() < f64::EPSILON);
        assert_eq!(clv.per_client[1].client, "C1");
        assert!((clv.per_client[1].clv - 150.0).abs() < f64::EPSILON);
        assert!((clv.average_clv - 175.0).abs() < f64::EPSILON);

        let performance = KpiCalculator::category_performance(&table).unwrap();
        assert_eq!(performance[0].category, "Tech");
        assert!((performance[0].revenue - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let table = summary_table(&[
            ("C1", "Food", "10"),
            ("C2", "Tech", "10"),
            ("C3", "Tech", "10"),
            ("C4", "Mode", "10"),
        ]);
        let distribution = KpiCalculator::category_distribution(&table).unwrap();
        let total: f64 = distribution.iter().map(|share| share.share_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn recurrence_rate_extremes() {
        let singles = summary_table(&[("C1", "Food", "10"), ("C2", "Food", "10")]);
        let stats = KpiCalculator::recurrence_rate(&singles).unwrap();
        assert!((stats.rate_pct - 0.0).abs() < f64::EPSILON);

        let repeats = summary_table(&[
            ("C1", "Food", "10"),
            ("C1", "Food", "10"),
            ("C2", "Food", "10"),
            ("C2", "Food", "10"),
        ]);
        let stats = KpiCalculator::recurrence_rate(&repeats).unwrap();
        assert!((stats.rate_pct - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clv_totals_match_overall_sales() {
        let table = summary_table(&[
            ("C1", "Food", "120,50"),
            ("C2", "Tech", "80"),
            ("C1", "Mode", "19,50"),
        ]);
        let clv = KpiCalculator::customer_lifetime_value(&table).unwrap();
        let per_client_total: f64 = clv.per_client.iter().map(|c| c.clv).sum();
        let overall = KpiCalculator::total_sales(&table).unwrap();
        assert!((per_client_total - overall).abs() < 1e-9);
    }

    #[test]
    fn tied_best_category_is_first_occurrence() {
        let table = summary_table(&[("C1", "Beta", "100"), ("C2", "Alpha", "100")]);
        let performance = KpiCalculator::category_performance(&table).unwrap();
        assert_eq!(performance[0].category, "Beta");
    }

    #[test]
    fn most_used_payment_method_is_head_of_mix() {
        let table = dashboard_table();
        let mix = KpiCalculator::payment_method_mix(&table).unwrap();
        assert_eq!(mix[0].method, "Carte");
        assert_eq!(mix[0].count, 2);
        assert!((mix[0].share_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn store_summary_sums_and_counts() {
        let table = dashboard_table();
        let summary = KpiCalculator::store_summary(&table).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].store, "Douala");
        assert!((summary[0].total_sales - 300.0).abs() < f64::EPSILON);
        assert_eq!(summary[0].transactions, 2);
        assert!((summary[0].average_transaction - 150.0).abs() < f64::EPSILON);
        assert_eq!(summary[1].store, "Yaoundé");
        assert!((summary[1].total_sales - 700.0).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_sales_aggregate_by_date_in_order() {
        let table = dashboard_table();
        let daily = KpiCalculator::daily_sales(&table).unwrap();
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!((daily[0].total - 300.0).abs() < f64::EPSILON);
        assert!((daily[1].total - 300.0).abs() < f64::EPSILON);
        assert!((daily[2].total - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn null_quantities_are_skipped() {
        let table = dashboard_table();
        let quantities = KpiCalculator::quantity_by_category(&table).unwrap();
        let food = quantities.iter().find(|q| q.category == "Food").unwrap();
        let tech = quantities.iter().find(|q| q.category == "Tech").unwrap();
        assert!((food.quantity - 1.0).abs() < f64::EPSILON);
        assert!((tech.quantity - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn satisfaction_means_exclude_nulls() {
        let table = dashboard_table();
        let average = KpiCalculator::satisfaction_average(&table).unwrap();
        assert!((average - 4.0).abs() < f64::EPSILON);

        let by_store = KpiCalculator::satisfaction_by(&table, "Magasin").unwrap();
        let douala = by_store.iter().find(|g| g.group == "Douala").unwrap();
        assert_eq!(douala.count, 1);
        assert!((douala.mean - 4.0).abs() < f64::EPSILON);
        let yaounde = by_store.iter().find(|g| g.group == "Yaoundé").unwrap();
        assert_eq!(yaounde.count, 2);
        assert!((yaounde.mean - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parallel_dimension_means_match_sequential() {
        let table = dashboard_table();
        let dims = KpiCalculator::satisfaction_by_dims(&table, &["Magasin", "Categorie_Produit"])
            .unwrap();
        assert_eq!(
            dims["Magasin"],
            KpiCalculator::satisfaction_by(&table, "Magasin").unwrap()
        );
        assert_eq!(
            dims["Categorie_Produit"],
            KpiCalculator::satisfaction_by(&table, "Categorie_Produit").unwrap()
        );
    }

    #[test]
    fn revenue_by_category_and_store_covers_all_pairs() {
        let table = dashboard_table();
        let pairs = KpiCalculator::revenue_by_category_and_store(&table).unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0].category, "Food");
        assert_eq!(pairs[0].store, "Douala");
        assert!((pairs[0].revenue - 100.0).abs() < f64::EPSILON);
    }
}
