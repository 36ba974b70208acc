//! Table Cache Module
//! Explicit memoization of cleaned tables keyed by source path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::loader::{CleanTable, DataLoader, LoaderError};
use super::schema::TableSchema;

/// Caches cleaned tables per source path so repeated dashboard runs skip
/// re-reading the spreadsheet. Invalidation is manual: callers that know a
/// source changed call `invalidate` before the next load.
#[derive(Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, Arc<CleanTable>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it on a miss.
    pub fn get_or_load(
        &mut self,
        path: &Path,
        schema: &TableSchema,
    ) -> Result<Arc<CleanTable>, LoaderError> {
        if let Some(table) = self.entries.get(path) {
            debug!(source = %path.display(), "table cache hit");
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(DataLoader::load(path, schema)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }

    /// Drop the cached table for `path`; the next load re-reads the file.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("data_kpi.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ID_Client,Categorie_Produit,Mode_Paiement,Montant_Transaction").unwrap();
        write!(file, "{body}").unwrap();
        path
    }

    #[test]
    fn repeated_loads_share_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "C1,Tech,Carte,100\n");
        let schema = TableSchema::kpi_summary();

        let mut cache = TableCache::new();
        let first = cache.get_or_load(&path, &schema).unwrap();
        let second = cache.get_or_load(&path, &schema).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "C1,Tech,Carte,100\n");
        let schema = TableSchema::kpi_summary();

        let mut cache = TableCache::new();
        let first = cache.get_or_load(&path, &schema).unwrap();

        write_fixture(dir.path(), "C1,Tech,Carte,100\nC2,Tech,Carte,200\n");
        cache.invalidate(&path);
        let second = cache.get_or_load(&path, &schema).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.height(), 1);
        assert_eq!(second.height(), 2);
    }
}
