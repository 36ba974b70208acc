//! Filter Module
//! Sidebar filter selections applied to the cleaned table ahead of any
//! aggregation.

use std::collections::HashSet;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::CleanTable;

/// Active filter selections. An empty selection list leaves its dimension
/// unrestricted, mirroring a multiselect defaulted to every value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub stores: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    /// Inclusive range on the transaction date.
    #[serde(default)]
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterState {
    /// Apply the selections as a row mask and return the narrowed table.
    pub fn apply(&self, table: &CleanTable) -> PolarsResult<CleanTable> {
        let schema = table.schema();
        let mut keep = vec![true; table.height()];

        if let Some(name) = &schema.store {
            Self::restrict(&mut keep, table, name, &self.stores)?;
        }
        Self::restrict(&mut keep, table, &schema.category, &self.categories)?;
        Self::restrict(&mut keep, table, &schema.payment_method, &self.payment_methods)?;

        if let (Some((start, end)), Some(name)) = (self.date_range, &schema.date) {
            let dates = table.dates(name)?;
            for (slot, date) in keep.iter_mut().zip(&dates) {
                *slot = *slot && date.map_or(false, |d| d >= start && d <= end);
            }
        }

        if keep.iter().all(|k| *k) {
            return Ok(table.clone());
        }
        let mask = BooleanChunked::new("keep".into(), keep);
        Ok(table.with_frame(table.frame().filter(&mask)?))
    }

    fn restrict(
        keep: &mut [bool],
        table: &CleanTable,
        column: &str,
        selection: &[String],
    ) -> PolarsResult<()> {
        if selection.is_empty() {
            return Ok(());
        }
        let allowed: HashSet<&str> = selection.iter().map(String::as_str).collect();
        let values = table.strings(column)?;
        for (slot, value) in keep.iter_mut().zip(&values) {
            *slot = *slot && value.as_deref().is_some_and(|v| allowed.contains(v));
        }
        Ok(())
    }
}

/// Distinct values and date bounds the rendering layer needs to populate
/// its filter widgets.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub stores: Vec<String>,
    pub categories: Vec<String>,
    pub payment_methods: Vec<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterOptions {
    pub fn from_table(table: &CleanTable) -> PolarsResult<Self> {
        let schema = table.schema();
        let stores = match &schema.store {
            Some(name) => Self::distinct(table, name)?,
            None => Vec::new(),
        };
        let categories = Self::distinct(table, &schema.category)?;
        let payment_methods = Self::distinct(table, &schema.payment_method)?;
        let date_range = match &schema.date {
            Some(name) => {
                let dates: Vec<NaiveDate> = table.dates(name)?.into_iter().flatten().collect();
                dates.iter().min().copied().zip(dates.iter().max().copied())
            }
            None => None,
        };
        Ok(Self {
            stores,
            categories,
            payment_methods,
            date_range,
        })
    }

    /// Distinct non-null values in first-occurrence order.
    fn distinct(table: &CleanTable, column: &str) -> PolarsResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for value in table.strings(column)?.into_iter().flatten() {
            if seen.insert(value.clone()) {
                out.push(value);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataLoader, TableSchema};

    fn dashboard_table() -> CleanTable {
        let raw = DataFrame::new(vec![
            Column::new("ID_Client".into(), vec!["C1", "C2", "C3", "C4"]),
            Column::new(
                "Categorie_Produit".into(),
                vec!["Alimentation", "Tech", "Alimentation", "Mode"],
            ),
            Column::new(
                "Magasin".into(),
                vec!["Douala", "Douala", "Yaoundé", "Yaoundé"],
            ),
            Column::new(
                "Mode_Paiement".into(),
                vec!["Carte", "Espèces", "Mobile Money", "Carte"],
            ),
            Column::new("Montant".into(), vec!["100", "200", "300", "400"]),
            Column::new("Quantite".into(), vec!["1", "2", "3", "4"]),
            Column::new("Satisfaction_Client".into(), vec!["4", "5", "3", "4"]),
            Column::new(
                "Date_Transaction".into(),
                vec!["2024-01-01", "2024-01-15", "2024-02-01", "2024-02-15"],
            ),
        ])
        .unwrap();
        DataLoader::clean(&raw, &TableSchema::dashboard()).unwrap()
    }

    #[test]
    fn empty_selections_keep_everything() {
        let table = dashboard_table();
        let filtered = FilterState::default().apply(&table).unwrap();
        assert_eq!(filtered.height(), 4);
    }

    #[test]
    fn restricts_by_store_and_category() {
        let table = dashboard_table();
        let filters = FilterState {
            stores: vec!["Douala".to_string()],
            categories: vec!["Alimentation".to_string()],
            ..FilterState::default()
        };
        let filtered = filters.apply(&table).unwrap();
        assert_eq!(filtered.height(), 1);
        let clients = filtered.strings("ID_Client").unwrap();
        assert_eq!(clients, vec![Some("C1".to_string())]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let table = dashboard_table();
        let filters = FilterState {
            date_range: Some((
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            )),
            ..FilterState::default()
        };
        let filtered = filters.apply(&table).unwrap();
        assert_eq!(filtered.height(), 2);
    }

    #[test]
    fn excluding_range_empties_the_table() {
        let table = dashboard_table();
        let filters = FilterState {
            date_range: Some((
                NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            )),
            ..FilterState::default()
        };
        let filtered = filters.apply(&table).unwrap();
        assert!(filtered.is_empty());
    }

    #[test]
    fn options_list_first_occurrence_distincts() {
        let table = dashboard_table();
        let options = FilterOptions::from_table(&table).unwrap();
        assert_eq!(options.stores, vec!["Douala", "Yaoundé"]);
        assert_eq!(options.categories, vec!["Alimentation", "Tech", "Mode"]);
        assert_eq!(
            options.date_range,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            ))
        );
    }
}
