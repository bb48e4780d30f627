//! Per-session state and the content-keyed table cache.

use crate::loader::{load_orders, LoadOptions, OrderTable};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Identity of an upload: blake3 digest of the raw bytes plus the parse options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileKey(blake3::Hash);

impl FileKey {
    pub fn new(bytes: &[u8], options: &LoadOptions) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(bytes);
        hasher.update(&[options.delimiter, u8::from(options.has_header)]);
        let compression = options.compression.map(|c| c.extension()).unwrap_or("");
        hasher.update(compression.as_bytes());
        Self(hasher.finalize())
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 16 hex chars are plenty for log lines
        write!(f, "{}", &self.0.to_hex()[..16])
    }
}

/// Parsed tables keyed by [`FileKey`]. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct TableCache {
    tables: Arc<RwLock<HashMap<FileKey, Arc<OrderTable>>>>,
}

/// Result of a cache lookup, reporting whether parsing happened.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub table: Arc<OrderTable>,
    pub hit: bool,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the table for these bytes, parsing only on a miss.
    pub fn get_or_load(
        &self,
        bytes: &[u8],
        options: &LoadOptions,
        source: &str,
    ) -> Result<CacheLookup> {
        let key = FileKey::new(bytes, options);

        if let Some(table) = self.get(&key)? {
            tracing::debug!(%key, source, "table cache hit");
            return Ok(CacheLookup { table, hit: true });
        }

        tracing::debug!(%key, source, "table cache miss");
        let table = Arc::new(load_orders(bytes, options)?.with_source(source));

        let mut tables = self
            .tables
            .write()
            .map_err(|_| eyre!("Table cache lock poisoned"))?;
        // Another reader may have inserted the same key meanwhile; keep the first.
        let table = tables.entry(key).or_insert(table).clone();
        Ok(CacheLookup { table, hit: false })
    }

    pub fn get(&self, key: &FileKey) -> Result<Option<Arc<OrderTable>>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| eyre!("Table cache lock poisoned"))?;
        Ok(tables.get(key).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|_| eyre!("Table cache lock poisoned"))?;
        Ok(tables.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Explicit per-session context handed to the request handler.
#[derive(Clone, Default)]
pub struct Session {
    table: Option<Arc<OrderTable>>,
    path: Option<PathBuf>,
    options: Option<LoadOptions>,
    pub show_full_data: bool,
    pub scroll_offset: usize,
    pub cache_hits: usize,
    cache: TableCache,
}

impl Session {
    pub fn new(cache: TableCache) -> Self {
        Self {
            cache,
            ..Self::default()
        }
    }

    pub fn table(&self) -> Option<&Arc<OrderTable>> {
        self.table.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> Option<&LoadOptions> {
        self.options.as_ref()
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Read `path` and make its table current. On error the previous table stays.
    pub fn open(&mut self, path: &Path, options: &LoadOptions) -> Result<CacheLookup> {
        let bytes = std::fs::read(path)?;
        let lookup = self
            .cache
            .get_or_load(&bytes, options, &path.display().to_string())?;

        if lookup.hit {
            self.cache_hits += 1;
        }
        let changed = self
            .table
            .as_ref()
            .map(|current| current.key() != lookup.table.key())
            .unwrap_or(true);
        if changed {
            self.scroll_offset = 0;
        }

        self.table = Some(lookup.table.clone());
        self.path = Some(path.to_path_buf());
        self.options = Some(*options);
        Ok(lookup)
    }

    /// Install an already-built table (used for in-memory data).
    pub fn set_table(&mut self, table: Arc<OrderTable>) {
        self.table = Some(table);
        self.path = None;
        self.options = None;
        self.scroll_offset = 0;
    }

    pub fn toggle_full_data(&mut self) {
        self.show_full_data = !self.show_full_data;
        self.scroll_offset = 0;
    }

    /// Rows the overview should show given the sample size
    pub fn visible_rows(&self, sample_rows: usize) -> usize {
        let height = self.table.as_ref().map(|t| t.height()).unwrap_or(0);
        if self.show_full_data {
            height
        } else {
            height.min(sample_rows)
        }
    }

    pub fn scroll_by(&mut self, delta: isize, sample_rows: usize) {
        let max = self.visible_rows(sample_rows).saturating_sub(1);
        let next = self.scroll_offset as isize + delta;
        self.scroll_offset = next.clamp(0, max as isize) as usize;
    }

    pub fn scroll_to_end(&mut self, sample_rows: usize) {
        self.scroll_offset = self.visible_rows(sample_rows).saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderlens_cli::CompressionFormat;

    const CSV: &[u8] = b"order_id,order_status,order_purchase_timestamp,order_approved_at,order_delivered_carrier_date,order_delivered_customer_date,order_estimated_delivery_date
1,delivered,2024-01-01 00:00:00,2024-01-01 03:00:00,2024-01-05,2024-01-08,2024-01-10
";

    #[test]
    fn test_file_key_depends_on_options() {
        let a = FileKey::new(CSV, &LoadOptions::default());
        let b = FileKey::new(CSV, &LoadOptions::default().with_delimiter(b';'));
        let c = FileKey::new(
            CSV,
            &LoadOptions::default().with_compression(Some(CompressionFormat::Gzip)),
        );
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, FileKey::new(CSV, &LoadOptions::default()));
    }

    #[test]
    fn test_cache_hit_returns_same_arc() {
        let cache = TableCache::new();
        let first = cache
            .get_or_load(CSV, &LoadOptions::default(), "a.csv")
            .unwrap();
        let second = cache
            .get_or_load(CSV, &LoadOptions::default(), "b.csv")
            .unwrap();
        assert!(!first.hit);
        assert!(second.hit);
        assert!(Arc::ptr_eq(&first.table, &second.table));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_cache_clone_shares_entries() {
        let cache = TableCache::new();
        let shared = cache.clone();
        cache
            .get_or_load(CSV, &LoadOptions::default(), "a.csv")
            .unwrap();
        assert_eq!(shared.len().unwrap(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = TableCache::new();
        assert!(cache
            .get_or_load(b"a,b\n1,2\n", &LoadOptions::default(), "bad.csv")
            .is_err());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_cache_reports_errors() {
        let cache = TableCache::new();
        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tables.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(cache.len().is_err());
        assert!(cache.is_empty().is_err());
        assert!(cache
            .get(&FileKey::new(CSV, &LoadOptions::default()))
            .is_err());
        assert!(cache
            .get_or_load(CSV, &LoadOptions::default(), "a.csv")
            .is_err());
    }

    #[test]
    fn test_scroll_clamps_to_visible_rows() {
        let cache = TableCache::new();
        let lookup = cache
            .get_or_load(CSV, &LoadOptions::default(), "a.csv")
            .unwrap();
        let mut session = Session::new(cache);
        session.set_table(lookup.table);
        session.scroll_by(10, 5);
        assert_eq!(session.scroll_offset, 0);
        session.scroll_by(-3, 5);
        assert_eq!(session.scroll_offset, 0);
    }
}
