//! Charts module - chart-ready data series

mod series;

pub use series::{
    BarPoint, BarSeries, GroupedBarPoint, GroupedBarSeries, Histogram, HistogramBin, LinePoint,
    LineSeries, PieSeries, PieSlice,
};
