use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::coordinator::TransactionCoordinator;
use crate::error::DbResult;
use crate::transaction::TransactionId;
use crate::tuple::TupleDesc;

/// Default number of 4096-byte frames in the page cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Engine configuration. The cache capacity is the single tuning knob
/// of the storage core.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub cache_capacity: usize,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        EngineConfig {
            data_dir: data_dir.into(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}

/// The engine context: owns the coordinator, the catalog and the
/// configuration, and vends transaction ids. Operators receive a
/// reference to this instead of reaching for globals.
pub struct Engine {
    config: EngineConfig,
    catalog: Arc<Catalog>,
    pool: TransactionCoordinator,
    next_tid: AtomicU64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Engine {
        let catalog = Arc::new(Catalog::new());
        let pool = TransactionCoordinator::new(Arc::clone(&catalog), config.cache_capacity);
        Engine {
            config,
            catalog,
            pool,
            next_tid: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.pool
    }

    /// Starts a transaction: a fresh opaque id. Completion goes through
    /// `coordinator().transaction_complete`.
    pub fn begin(&self) -> TransactionId {
        TransactionId::new(self.next_tid.fetch_add(1, Ordering::SeqCst))
    }

    /// Registers a table named `name`, backed by `<name>.dat` in the
    /// data directory.
    pub fn add_table(&self, name: &str, desc: TupleDesc) -> DbResult<u64> {
        let path = self.config.data_dir.join(format!("{name}.dat"));
        self.catalog.add_table(path, name, desc)
    }

    /// Loads and registers every table described by a JSON schema file.
    pub fn load_schema(&self, schema_path: impl AsRef<Path>) -> DbResult<Vec<u64>> {
        self.catalog
            .load_schema(schema_path, &self.config.data_dir)
    }
}
