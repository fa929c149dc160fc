use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::basalt_debug_log;
use crate::error::{DbError, DbResult};
use crate::heap::HeapFile;
use crate::tuple::{FieldType, TupleDesc};

/// Derives a table id from the absolute path of its backing file.
pub(crate) fn table_id_for_path(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

/// The catalog maps table ids to their backing heap files and schemas.
/// Tables are registered at startup (or loaded from a schema file) and
/// looked up by the page store and the coordinator on every operation.
#[derive(Debug, Default)]
pub struct Catalog {
    inner: Mutex<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    tables: HashMap<u64, Arc<HeapFile>>,
    by_name: HashMap<String, u64>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Registers a table backed by `path`. Re-registering the same path
    /// (same id) replaces the previous entry.
    pub fn add_table(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        desc: TupleDesc,
    ) -> DbResult<u64> {
        let file = Arc::new(HeapFile::open(path, desc)?);
        let id = file.id();
        basalt_debug_log!("[Catalog::add_table] Registered '{}' as table {}", name, id);
        let mut inner = self.inner.lock().unwrap();
        inner.tables.insert(id, file);
        inner.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn heap_file(&self, table: u64) -> DbResult<Arc<HeapFile>> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(&table)
            .cloned()
            .ok_or_else(|| DbError::invalid(format!("unknown table id {table}")))
    }

    pub fn tuple_desc(&self, table: u64) -> DbResult<TupleDesc> {
        Ok(self.heap_file(table)?.tuple_desc().clone())
    }

    pub fn table_id(&self, name: &str) -> Option<u64> {
        self.inner.lock().unwrap().by_name.get(name).copied()
    }

    /// Loads table definitions from a JSON schema file and registers
    /// each one, backed by `<table>.dat` in `data_dir`. Returns the
    /// registered table ids in file order.
    pub fn load_schema(
        &self,
        schema_path: impl AsRef<Path>,
        data_dir: impl AsRef<Path>,
    ) -> DbResult<Vec<u64>> {
        let raw = fs::read_to_string(schema_path.as_ref())?;
        let defs: Vec<TableDef> = serde_json::from_str(&raw)
            .map_err(|err| DbError::invalid(format!("malformed schema file: {err}")))?;

        let mut ids = Vec::with_capacity(defs.len());
        for def in defs {
            if def.columns.is_empty() {
                return Err(DbError::invalid(format!(
                    "table '{}' has no columns",
                    def.name
                )));
            }
            let types = def.columns.iter().map(|c| c.column_type.into()).collect();
            let names = def
                .columns
                .iter()
                .map(|c| Some(c.name.clone()))
                .collect();
            let desc = TupleDesc::new(types, names);
            let path = data_dir.as_ref().join(format!("{}.dat", def.name));
            ids.push(self.add_table(path, &def.name, desc)?);
        }
        Ok(ids)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnDef {
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ColumnType {
    Int,
    Text,
}

impl From<ColumnType> for FieldType {
    fn from(c: ColumnType) -> FieldType {
        match c {
            ColumnType::Int => FieldType::Int,
            ColumnType::Text => FieldType::Text,
        }
    }
}
