//! Spreadsheet Loader Module
//! Handles CSV/XLSX loading and row-level cleaning using Polars.

use std::path::Path;

use calamine::{Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use super::schema::TableSchema;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load table: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Failed to open workbook: {0}")]
    WorkbookError(#[from] calamine::Error),
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),
    #[error("Sheet has no rows")]
    EmptySheet,
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

/// A cleaned, immutable transaction table and the schema it was built with.
///
/// Invariants: the amount column is non-null `f64` in every row; when the
/// schema has a date column it is stored with the `Date` dtype and is
/// non-null in every row. Rows that violated either were dropped during
/// cleaning and are accounted for in `dropped_rows`.
#[derive(Debug, Clone)]
pub struct CleanTable {
    df: DataFrame,
    schema: TableSchema,
    dropped_rows: usize,
}

impl CleanTable {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Rows discarded during cleaning because amount or date was unusable.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Same schema over a narrowed frame (used by filtering).
    pub(crate) fn with_frame(&self, df: DataFrame) -> CleanTable {
        CleanTable {
            df,
            schema: self.schema.clone(),
            dropped_rows: 0,
        }
    }

    /// Column values as strings; nulls stay null.
    pub fn strings(&self, name: &str) -> PolarsResult<Vec<Option<String>>> {
        let casted = self.df.column(name)?.cast(&DataType::String)?;
        let ca = casted.str()?;
        Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Column values as floats; nulls stay null.
    pub fn floats(&self, name: &str) -> PolarsResult<Vec<Option<f64>>> {
        let casted = self.df.column(name)?.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        Ok(ca.into_iter().collect())
    }

    /// Date column values, read back from the `Date` dtype.
    pub fn dates(&self, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
        let casted = self.df.column(name)?.cast(&DataType::Int32)?;
        let ca = casted.i32()?;
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        Ok(ca
            .into_iter()
            .map(|v| v.map(|days| epoch + chrono::Duration::days(days as i64)))
            .collect())
    }
}

/// Loads transaction spreadsheets and cleans them against a schema.
pub struct DataLoader;

impl DataLoader {
    /// Load a spreadsheet and clean it according to `schema`.
    ///
    /// Fatal errors (unreadable file, missing columns) abort the load; bad
    /// cells only drop their row, and the drop count is reported.
    pub fn load(path: &Path, schema: &TableSchema) -> Result<CleanTable, LoaderError> {
        let raw = Self::read_raw(path)?;
        let table = Self::clean(&raw, schema)?;
        info!(
            source = %path.display(),
            rows = table.height(),
            dropped = table.dropped_rows(),
            "loaded transaction table"
        );
        if table.dropped_rows() > 0 {
            warn!(
                dropped = table.dropped_rows(),
                "discarded rows with unusable amount or date"
            );
        }
        Ok(table)
    }

    fn read_raw(path: &Path) -> Result<DataFrame, LoaderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Self::read_csv(path),
            "xlsx" | "xlsm" | "xls" => Self::read_workbook(path),
            other => Err(LoaderError::UnsupportedFormat(other.to_string())),
        }
    }

    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        // Lazy scan keeps memory flat on the large dashboard file
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Read the first worksheet into a string-typed frame. Cells are
    /// stringified so the same cleaning path handles CSV and XLSX sources.
    fn read_workbook(path: &Path) -> Result<DataFrame, LoaderError> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(LoaderError::EmptySheet)?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .ok_or(LoaderError::EmptySheet)?
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); header.len()];
        for row in rows {
            for (i, column) in values.iter_mut().enumerate() {
                column.push(row.get(i).and_then(Self::cell_to_string));
            }
        }

        let columns: Vec<Column> = header
            .into_iter()
            .zip(values)
            .map(|(name, column)| Column::new(name.as_str().into(), column))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    fn cell_to_string(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty => None,
            Data::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
            Data::Float(f) => Some(f.to_string()),
            Data::Int(i) => Some(i.to_string()),
            Data::Bool(b) => Some(b.to_string()),
            Data::DateTime(dt) => {
                let datetime = Self::excel_serial_to_datetime(dt.as_f64());
                Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            Data::DateTimeIso(s) => Some(s.clone()),
            Data::DurationIso(s) => Some(s.clone()),
            Data::Error(_) => None,
        }
    }

    /// Clean a raw frame: normalize amounts, parse dates, coerce numeric
    /// columns, and drop rows whose amount or date is unusable.
    pub fn clean(raw: &DataFrame, schema: &TableSchema) -> Result<CleanTable, LoaderError> {
        for name in schema.columns() {
            if raw.column(name).is_err() {
                return Err(LoaderError::MissingColumn(name.to_string()));
            }
        }

        let height = raw.height();
        let amounts = Self::parse_column(raw.column(&schema.amount)?, Self::parse_amount)?;
        let dates = match &schema.date {
            Some(name) => Some(Self::parse_column(raw.column(name)?, Self::parse_date)?),
            None => None,
        };

        // Only amount and date decide row retention
        let keep: Vec<bool> = (0..height)
            .map(|i| amounts[i].is_some() && dates.as_ref().map_or(true, |d| d[i].is_some()))
            .collect();
        let kept = keep.iter().filter(|k| **k).count();

        let mut columns: Vec<Column> = Vec::new();
        if let Some(name) = &schema.client_id {
            columns.push(Self::string_column(raw.column(name)?, name, &keep)?);
        }
        columns.push(Self::string_column(
            raw.column(&schema.category)?,
            &schema.category,
            &keep,
        )?);
        if let Some(name) = &schema.store {
            columns.push(Self::string_column(raw.column(name)?, name, &keep)?);
        }
        columns.push(Self::string_column(
            raw.column(&schema.payment_method)?,
            &schema.payment_method,
            &keep,
        )?);

        let amount_values: Vec<f64> = amounts
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .filter_map(|(v, _)| *v)
            .collect();
        columns.push(Column::new(schema.amount.as_str().into(), amount_values));

        if let Some(name) = &schema.quantity {
            let parsed = Self::parse_column(raw.column(name)?, Self::parse_number)?;
            columns.push(Column::new(
                name.as_str().into(),
                Self::retain(&parsed, &keep),
            ));
        }
        if let Some(name) = &schema.satisfaction {
            let parsed = Self::parse_column(raw.column(name)?, Self::parse_number)?;
            columns.push(Column::new(
                name.as_str().into(),
                Self::retain(&parsed, &keep),
            ));
        }
        if let (Some(name), Some(dates)) = (&schema.date, &dates) {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            let days: Vec<i32> = dates
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .filter_map(|(date, _)| *date)
                .map(|date| (date - epoch).num_days() as i32)
                .collect();
            columns.push(Column::new(name.as_str().into(), days).cast(&DataType::Date)?);
        }

        let df = DataFrame::new(columns)?;
        Ok(CleanTable {
            df,
            schema: schema.clone(),
            dropped_rows: height - kept,
        })
    }

    /// Normalize a currency-formatted string and parse it as a float.
    ///
    /// Strips the `XAF` and `€` markers and space separators, and turns the
    /// decimal comma into a point: `"1 234,50 XAF"` -> `1234.50`.
    pub fn parse_amount(raw: &str) -> Option<f64> {
        let cleaned: String = raw
            .replace("XAF", "")
            .replace('€', "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        cleaned
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Parse a transaction date. Accepts ISO date/datetime strings,
    /// `DD/MM/YYYY`, and raw Excel serial numbers.
    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(parsed.date());
            }
        }
        for format in ["%Y-%m-%d", "%d/%m/%Y"] {
            if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
                return Some(parsed);
            }
        }
        raw.parse::<f64>().ok().map(Self::excel_serial_to_date)
    }

    fn parse_number(raw: &str) -> Option<f64> {
        raw.trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Excel's day zero is 1899-12-30.
    fn excel_serial_to_date(serial: f64) -> NaiveDate {
        let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
        base + chrono::Duration::days(serial as i64)
    }

    fn excel_serial_to_datetime(serial: f64) -> NaiveDateTime {
        let midnight = Self::excel_serial_to_date(serial).and_time(NaiveTime::MIN);
        let seconds = (serial.fract() * 86_400.0).round() as i64;
        midnight + chrono::Duration::seconds(seconds)
    }

    fn parse_column<T>(
        column: &Column,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<Option<T>>, LoaderError> {
        Ok(Self::string_values(column)?
            .iter()
            .map(|v| v.as_deref().and_then(&parse))
            .collect())
    }

    fn string_values(column: &Column) -> Result<Vec<Option<String>>, LoaderError> {
        let casted = column.cast(&DataType::String)?;
        let ca = casted.str()?;
        Ok(ca
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect())
    }

    fn string_column(column: &Column, name: &str, keep: &[bool]) -> Result<Column, LoaderError> {
        let values = Self::string_values(column)?;
        Ok(Column::new(name.into(), Self::retain(&values, keep)))
    }

    fn retain<T: Clone>(values: &[Option<T>], keep: &[bool]) -> Vec<Option<T>> {
        values
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| v.clone())
            .collect()
    }
}
