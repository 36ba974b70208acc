//! Data module - spreadsheet loading, cleaning, caching and filtering

mod cache;
mod filter;
mod loader;
mod schema;

pub use cache::TableCache;
pub use filter::{FilterOptions, FilterState};
pub use loader::{CleanTable, DataLoader, LoaderError};
pub use schema::TableSchema;
