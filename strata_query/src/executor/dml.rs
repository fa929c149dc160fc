use basalt::{DbError, DbResult, Engine, Field, FieldType, TransactionId, Tuple, TupleDesc};

use super::Operator;

fn count_desc() -> TupleDesc {
    TupleDesc::unnamed(vec![FieldType::Int])
}

fn count_tuple(desc: &TupleDesc, count: i32) -> DbResult<Tuple> {
    Tuple::new(desc.clone(), vec![Field::Int(count)])
}

/// Inserts every tuple from the child into a table and yields a single
/// one-field tuple carrying the number of inserted rows. The child's
/// schema must equal the table's.
pub struct Insert<'a, C> {
    engine: &'a Engine,
    tid: TransactionId,
    table: u64,
    child: C,
    desc: TupleDesc,
    count: Option<i32>,
    delivered: bool,
}

impl<'a, C: Operator> Insert<'a, C> {
    pub fn new(engine: &'a Engine, tid: TransactionId, table: u64, child: C) -> Insert<'a, C> {
        Insert {
            engine,
            tid,
            table,
            child,
            desc: count_desc(),
            count: None,
            delivered: false,
        }
    }
}

impl<C: Operator> Operator for Insert<'_, C> {
    /// Drains the child through the coordinator. All the page writes
    /// happen here; `next` just reports the count.
    fn open(&mut self) -> DbResult<()> {
        let table_desc = self.engine.catalog().tuple_desc(self.table)?;
        if *self.child.tuple_desc() != table_desc {
            return Err(DbError::invalid(
                "child schema differs from the table being inserted into",
            ));
        }

        self.child.open()?;
        let mut count = 0;
        while let Some(mut tuple) = self.child.next()? {
            self.engine
                .coordinator()
                .insert_tuple(self.tid, self.table, &mut tuple)?;
            count += 1;
        }
        self.count = Some(count);
        self.delivered = false;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        let Some(count) = self.count else {
            return Ok(None);
        };
        if self.delivered {
            return Ok(None);
        }
        self.delivered = true;
        Ok(Some(count_tuple(&self.desc, count)?))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.delivered = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}

/// Deletes every tuple produced by the child (which must yield stored
/// tuples, carrying record ids) and yields the count of deleted rows.
pub struct Delete<'a, C> {
    engine: &'a Engine,
    tid: TransactionId,
    child: C,
    desc: TupleDesc,
    count: Option<i32>,
    delivered: bool,
}

impl<'a, C: Operator> Delete<'a, C> {
    pub fn new(engine: &'a Engine, tid: TransactionId, child: C) -> Delete<'a, C> {
        Delete {
            engine,
            tid,
            child,
            desc: count_desc(),
            count: None,
            delivered: false,
        }
    }
}

impl<C: Operator> Operator for Delete<'_, C> {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.engine.coordinator().delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.count = Some(count);
        self.delivered = false;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        let Some(count) = self.count else {
            return Ok(None);
        };
        if self.delivered {
            return Ok(None);
        }
        self.delivered = true;
        Ok(Some(count_tuple(&self.desc, count)?))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.delivered = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
