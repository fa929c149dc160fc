use basalt::heap::HeapIter;
use basalt::{DbResult, Engine, FieldType, TransactionId, Tuple, TupleDesc};

use super::Operator;

/// Sequential scan over a table, in page-then-slot order, reading every
/// page with a shared lock on behalf of the scanning transaction.
pub struct SeqScan<'a> {
    iter: HeapIter<'a>,
    desc: TupleDesc,
}

impl<'a> SeqScan<'a> {
    /// Field names in the scan's schema are prefixed with the table
    /// alias, `alias.field`.
    pub fn new(
        engine: &'a Engine,
        tid: TransactionId,
        table: u64,
        alias: &str,
    ) -> DbResult<SeqScan<'a>> {
        let file = engine.catalog().heap_file(table)?;
        let base = file.tuple_desc();

        let types: Vec<FieldType> = (0..base.num_fields()).map(|i| base.field_type(i)).collect();
        let names = (0..base.num_fields())
            .map(|i| Some(format!("{alias}.{}", base.field_name(i).unwrap_or("null"))))
            .collect();
        let desc = TupleDesc::new(types, names);

        Ok(SeqScan {
            iter: file.iter(engine.coordinator(), tid),
            desc,
        })
    }
}

impl Operator for SeqScan<'_> {
    fn open(&mut self) -> DbResult<()> {
        self.iter.open()
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        self.iter.next()
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.iter.rewind()
    }

    fn close(&mut self) {
        self.iter.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
