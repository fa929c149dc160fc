use basalt::{Engine, EngineConfig, Field, FieldType, Tuple, TupleDesc};
use tempfile::TempDir;

/// An engine over a fresh temp directory with the given cache capacity.
/// The directory must outlive the engine, so both come back.
pub fn setup_engine(cache_capacity: usize) -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let engine = Engine::new(EngineConfig::new(dir.path()).with_cache_capacity(cache_capacity));
    (dir, engine)
}

/// Registers a single-column int table and returns its id.
pub fn int_table(engine: &Engine, name: &str) -> u64 {
    let desc = TupleDesc::new(vec![FieldType::Int], vec![Some("v".to_string())]);
    engine.add_table(name, desc).unwrap()
}

pub fn int_tuple(engine: &Engine, table: u64, v: i32) -> Tuple {
    let desc = engine.catalog().tuple_desc(table).unwrap();
    Tuple::new(desc, vec![Field::Int(v)]).unwrap()
}
