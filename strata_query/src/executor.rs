//! The operator capability: open, next, rewind, close, plus the schema
//! of the rows produced. `next` returning `Ok(None)` is exhaustion, so
//! there is no separate has-next probe.

use basalt::{DbError, DbResult, Tuple, TupleDesc};

pub mod aggregate;
pub mod dml;
pub mod filter;
pub mod scan;

pub trait Operator {
    fn open(&mut self) -> DbResult<()>;
    fn next(&mut self) -> DbResult<Option<Tuple>>;
    fn rewind(&mut self) -> DbResult<()>;
    fn close(&mut self);
    fn tuple_desc(&self) -> &TupleDesc;
}

/// An operator over an in-memory list of tuples. Feeds `Insert`, and
/// carries the one-row counts that DML operators produce.
pub struct TupleList {
    desc: TupleDesc,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl TupleList {
    pub fn new(desc: TupleDesc, tuples: Vec<Tuple>) -> DbResult<TupleList> {
        for t in &tuples {
            if *t.desc() != desc {
                return Err(DbError::invalid(
                    "tuple schema does not match the list schema",
                ));
            }
        }
        Ok(TupleList {
            desc,
            tuples,
            cursor: 0,
            opened: false,
        })
    }
}

impl Operator for TupleList {
    fn open(&mut self) -> DbResult<()> {
        self.opened = true;
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if !self.opened || self.cursor >= self.tuples.len() {
            return Ok(None);
        }
        let tuple = self.tuples[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(tuple))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
