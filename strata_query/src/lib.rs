//! # Strata Query
//! Relational operators over the basalt storage core. Every operator
//! reaches storage exclusively through the transaction coordinator:
//! `get_page` for reads, `insert_tuple` / `delete_tuple` for writes,
//! `transaction_complete` to finish.

pub mod executor;

pub use executor::aggregate::{AggOp, Aggregate};
pub use executor::dml::{Delete, Insert};
pub use executor::filter::{CmpOp, Filter, Predicate};
pub use executor::scan::SeqScan;
pub use executor::{Operator, TupleList};
