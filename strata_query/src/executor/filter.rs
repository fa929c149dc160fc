use basalt::{DbResult, Field, Tuple, TupleDesc};

use super::Operator;

/// Comparison operators for predicates. `Like` is substring containment
/// on text fields and plain equality on ints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

/// Compares one field of a tuple against a constant operand. A type
/// mismatch between the field and the operand never matches.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: CmpOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CmpOp, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn eval(&self, tuple: &Tuple) -> bool {
        match (tuple.field(self.field), &self.operand) {
            (Field::Int(a), Field::Int(b)) => match self.op {
                CmpOp::Eq | CmpOp::Like => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
            },
            (Field::Text(a), Field::Text(b)) => match self.op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Like => a.contains(b.as_str()),
            },
            _ => false,
        }
    }
}

/// Relational select: passes through the child's tuples that satisfy
/// the predicate.
pub struct Filter<C> {
    predicate: Predicate,
    child: C,
}

impl<C: Operator> Filter<C> {
    pub fn new(predicate: Predicate, child: C) -> Filter<C> {
        Filter { predicate, child }
    }
}

impl<C: Operator> Operator for Filter<C> {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if self.predicate.eval(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TupleList;
    use basalt::FieldType;

    fn int_list(values: &[i32]) -> TupleList {
        let desc = TupleDesc::unnamed(vec![FieldType::Int]);
        let tuples = values
            .iter()
            .map(|&v| Tuple::new(desc.clone(), vec![Field::Int(v)]).unwrap())
            .collect();
        TupleList::new(desc, tuples).unwrap()
    }

    #[test]
    fn filter_keeps_matching_tuples() {
        let pred = Predicate::new(0, CmpOp::Gt, Field::Int(2));
        let mut filter = Filter::new(pred, int_list(&[1, 2, 3, 4]));
        filter.open().unwrap();

        let mut kept = Vec::new();
        while let Some(t) = filter.next().unwrap() {
            kept.push(t.field(0).clone());
        }
        assert_eq!(kept, vec![Field::Int(3), Field::Int(4)]);
    }

    #[test]
    fn type_mismatch_never_matches() {
        let pred = Predicate::new(0, CmpOp::Eq, Field::Text("3".into()));
        let mut filter = Filter::new(pred, int_list(&[3]));
        filter.open().unwrap();
        assert!(filter.next().unwrap().is_none());
    }

    #[test]
    fn like_is_substring_containment_on_text() {
        let desc = TupleDesc::unnamed(vec![FieldType::Text]);
        let tuples = ["basalt", "granite"]
            .iter()
            .map(|s| Tuple::new(desc.clone(), vec![Field::Text(s.to_string())]).unwrap())
            .collect();
        let list = TupleList::new(desc, tuples).unwrap();

        let pred = Predicate::new(0, CmpOp::Like, Field::Text("sal".into()));
        let mut filter = Filter::new(pred, list);
        filter.open().unwrap();

        let hit = filter.next().unwrap().unwrap();
        assert_eq!(hit.field(0), &Field::Text("basalt".into()));
        assert!(filter.next().unwrap().is_none());
    }
}
