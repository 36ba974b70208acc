//! Column Schema Module
//! Maps the logical transaction fields onto source column names.

use serde::{Deserialize, Serialize};

/// Column names of one dataset variant.
///
/// The two shipped datasets share the whole cleaning and aggregation
/// pipeline; only their column names differ, so everything downstream is
/// parameterized by this schema instead of duplicating the pipeline per
/// dataset. Optional fields are columns that only the dashboard dataset
/// carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub amount: String,
    pub category: String,
    pub payment_method: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub satisfaction: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl TableSchema {
    /// Schema of the static KPI summary dataset.
    pub fn kpi_summary() -> Self {
        Self {
            amount: "Montant_Transaction".to_string(),
            category: "Categorie_Produit".to_string(),
            payment_method: "Mode_Paiement".to_string(),
            client_id: Some("ID_Client".to_string()),
            store: None,
            quantity: None,
            satisfaction: None,
            date: None,
        }
    }

    /// Schema of the interactive dashboard dataset.
    pub fn dashboard() -> Self {
        Self {
            amount: "Montant".to_string(),
            category: "Categorie_Produit".to_string(),
            payment_method: "Mode_Paiement".to_string(),
            client_id: Some("ID_Client".to_string()),
            store: Some("Magasin".to_string()),
            quantity: Some("Quantite".to_string()),
            satisfaction: Some("Satisfaction_Client".to_string()),
            date: Some("Date_Transaction".to_string()),
        }
    }

    /// Every column the schema expects to find in the source, in pipeline
    /// order. All of them must be present for a load to succeed.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![
            self.amount.as_str(),
            self.category.as_str(),
            self.payment_method.as_str(),
        ];
        for optional in [
            &self.client_id,
            &self.store,
            &self.quantity,
            &self.satisfaction,
            &self.date,
        ] {
            if let Some(name) = optional {
                columns.push(name.as_str());
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_schema_lists_every_column() {
        let schema = TableSchema::dashboard();
        let columns = schema.columns();
        for expected in [
            "Montant",
            "Categorie_Produit",
            "Mode_Paiement",
            "ID_Client",
            "Magasin",
            "Quantite",
            "Satisfaction_Client",
            "Date_Transaction",
        ] {
            assert!(columns.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn summary_schema_has_no_dashboard_columns() {
        let schema = TableSchema::kpi_summary();
        assert!(schema.store.is_none());
        assert!(schema.date.is_none());
        assert_eq!(schema.columns().len(), 4);
    }

    #[test]
    fn deserializes_from_partial_config() {
        let schema: TableSchema = serde_json::from_str(
            r#"{"amount": "Total", "category": "Cat", "payment_method": "Pay"}"#,
        )
        .unwrap();
        assert_eq!(schema.amount, "Total");
        assert!(schema.client_id.is_none());
        assert!(schema.date.is_none());
    }
}
