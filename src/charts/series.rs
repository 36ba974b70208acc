//! Chart Series Module
//! Toolkit-agnostic series for the rendering layer's bar/pie/line/histogram
//! charts. No colors, no layout, just labeled numbers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::kpi::DailyPoint;

/// One labeled bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarPoint {
    pub label: String,
    pub value: f64,
}

/// Bar chart series: one bar per label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub label_axis: String,
    pub value_axis: String,
    pub points: Vec<BarPoint>,
}

impl BarSeries {
    pub fn new(
        label_axis: &str,
        value_axis: &str,
        points: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            label_axis: label_axis.to_string(),
            value_axis: value_axis.to_string(),
            points: points
                .into_iter()
                .map(|(label, value)| BarPoint { label, value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarPoint {
    pub label: String,
    pub group: String,
    pub value: f64,
}

/// Grouped (stackable) bar series: one bar per (label, group) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarSeries {
    pub label_axis: String,
    pub value_axis: String,
    pub points: Vec<GroupedBarPoint>,
}

impl GroupedBarSeries {
    pub fn new(
        label_axis: &str,
        value_axis: &str,
        points: impl IntoIterator<Item = (String, String, f64)>,
    ) -> Self {
        Self {
            label_axis: label_axis.to_string(),
            value_axis: value_axis.to_string(),
            points: points
                .into_iter()
                .map(|(label, group, value)| GroupedBarPoint {
                    label,
                    group,
                    value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

/// Pie chart series; the renderer normalizes slices as it sees fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSeries {
    pub slices: Vec<PieSlice>,
}

impl PieSeries {
    pub fn new(slices: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            slices: slices
                .into_iter()
                .map(|(label, value)| PieSlice { label, value })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-indexed line series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub x_axis: String,
    pub y_axis: String,
    pub points: Vec<LinePoint>,
}

impl LineSeries {
    pub fn new(x_axis: &str, y_axis: &str, daily: &[DailyPoint]) -> Self {
        Self {
            x_axis: x_axis.to_string(),
            y_axis: y_axis.to_string(),
            points: daily
                .iter()
                .map(|point| LinePoint {
                    date: point.date,
                    value: point.total,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over raw values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn from_scores(values: &[f64], bin_count: usize) -> Self {
        if values.is_empty() || bin_count == 0 {
            return Self { bins: Vec::new() };
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = if max > min {
            (max - min) / bin_count as f64
        } else {
            1.0
        };

        let mut counts = vec![0usize; bin_count];
        for value in values {
            let index = (((value - min) / width) as usize).min(bin_count - 1);
            counts[index] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect();
        Self { bins }
    }

    /// Total observations across bins.
    pub fn total(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}
