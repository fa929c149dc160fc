use std::collections::BTreeMap;

use basalt::{DbError, DbResult, Field, FieldType, Tuple, TupleDesc};

use super::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// Computes one aggregate over the child, optionally grouped by a
/// second field. Int fields support every operator; text fields support
/// `Count` only. Output rows are `(value)` or `(group, value)`, grouped
/// rows in group-key order.
pub struct Aggregate<C> {
    child: C,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    desc: TupleDesc,
    results: Vec<Tuple>,
    cursor: usize,
}

impl<C: Operator> Aggregate<C> {
    pub fn new(
        child: C,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> DbResult<Aggregate<C>> {
        let child_desc = child.tuple_desc();
        if child_desc.field_type(agg_field) == FieldType::Text && op != AggOp::Count {
            return Err(DbError::invalid(format!(
                "{op:?} is not defined over text fields"
            )));
        }

        let desc = match group_field {
            Some(g) => TupleDesc::new(
                vec![child_desc.field_type(g), FieldType::Int],
                vec![
                    child_desc.field_name(g).map(str::to_string),
                    None,
                ],
            ),
            None => TupleDesc::unnamed(vec![FieldType::Int]),
        };

        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            desc,
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn finish(&self, acc: &Acc) -> i32 {
        match self.op {
            AggOp::Count => acc.count as i32,
            AggOp::Sum => acc.sum as i32,
            AggOp::Avg => (acc.sum / acc.count) as i32,
            AggOp::Min => acc.min,
            AggOp::Max => acc.max,
        }
    }
}

struct Acc {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

impl Acc {
    fn merge(&mut self, field: &Field) {
        self.count += 1;
        if let Field::Int(v) = field {
            self.sum += i64::from(*v);
            self.min = self.min.min(*v);
            self.max = self.max.max(*v);
        }
    }
}

impl Default for Acc {
    fn default() -> Self {
        Acc {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }
}

impl<C: Operator> Operator for Aggregate<C> {
    /// Drains the child and materializes the aggregate rows.
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;

        let mut grouped: BTreeMap<Field, Acc> = BTreeMap::new();
        let mut ungrouped = Acc::default();
        let mut saw_any = false;

        while let Some(tuple) = self.child.next()? {
            saw_any = true;
            let value = tuple.field(self.agg_field);
            match self.group_field {
                Some(g) => {
                    let key = tuple.field(g).clone();
                    let acc = grouped.entry(key).or_default();
                    acc.merge(value);
                }
                None => ungrouped.merge(value),
            }
        }

        self.results.clear();
        match self.group_field {
            Some(_) => {
                for (key, acc) in &grouped {
                    let row = Tuple::new(
                        self.desc.clone(),
                        vec![key.clone(), Field::Int(self.finish(acc))],
                    )?;
                    self.results.push(row);
                }
            }
            None => {
                if saw_any {
                    let row =
                        Tuple::new(self.desc.clone(), vec![Field::Int(self.finish(&ungrouped))])?;
                    self.results.push(row);
                }
            }
        }
        self.cursor = 0;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if self.cursor >= self.results.len() {
            return Ok(None);
        }
        let row = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(row))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.results.clear();
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TupleList;

    fn pairs(rows: &[(i32, i32)]) -> TupleList {
        let desc = TupleDesc::new(
            vec![FieldType::Int, FieldType::Int],
            vec![Some("g".to_string()), Some("v".to_string())],
        );
        let tuples = rows
            .iter()
            .map(|&(g, v)| {
                Tuple::new(desc.clone(), vec![Field::Int(g), Field::Int(v)]).unwrap()
            })
            .collect();
        TupleList::new(desc, tuples).unwrap()
    }

    fn drain<C: Operator>(agg: &mut Aggregate<C>) -> Vec<Vec<Field>> {
        agg.open().unwrap();
        let mut rows = Vec::new();
        while let Some(t) = agg.next().unwrap() {
            rows.push(t.fields().to_vec());
        }
        rows
    }

    #[test]
    fn ungrouped_sum_min_max_avg_count() {
        let rows = [(0, 2), (0, 4), (0, 9)];
        for (op, expected) in [
            (AggOp::Sum, 15),
            (AggOp::Min, 2),
            (AggOp::Max, 9),
            (AggOp::Avg, 5),
            (AggOp::Count, 3),
        ] {
            let mut agg = Aggregate::new(pairs(&rows), 1, None, op).unwrap();
            assert_eq!(drain(&mut agg), vec![vec![Field::Int(expected)]], "{op:?}");
        }
    }

    #[test]
    fn grouped_results_come_out_in_key_order() {
        let rows = [(2, 10), (1, 1), (2, 30), (1, 3)];
        let mut agg = Aggregate::new(pairs(&rows), 1, Some(0), AggOp::Sum).unwrap();
        assert_eq!(
            drain(&mut agg),
            vec![
                vec![Field::Int(1), Field::Int(4)],
                vec![Field::Int(2), Field::Int(40)],
            ]
        );
    }

    #[test]
    fn empty_ungrouped_input_yields_no_row() {
        let mut agg = Aggregate::new(pairs(&[]), 1, None, AggOp::Sum).unwrap();
        assert!(drain(&mut agg).is_empty());
    }

    #[test]
    fn text_fields_only_count() {
        let desc = TupleDesc::unnamed(vec![FieldType::Text]);
        let tuples = vec![
            Tuple::new(desc.clone(), vec![Field::Text("a".into())]).unwrap(),
            Tuple::new(desc.clone(), vec![Field::Text("b".into())]).unwrap(),
        ];
        let list = TupleList::new(desc.clone(), tuples).unwrap();
        let mut agg = Aggregate::new(list, 0, None, AggOp::Count).unwrap();
        assert_eq!(drain(&mut agg), vec![vec![Field::Int(2)]]);

        let empty = TupleList::new(desc, Vec::new()).unwrap();
        assert!(Aggregate::new(empty, 0, None, AggOp::Min).is_err());
    }
}
