use std::fmt;
use std::io;

/// Errors surfaced by the storage core. None of these are recovered
/// internally; the caller decides whether to abort or retry the
/// transaction at its own level.
#[derive(Debug)]
pub enum DbError {
    /// The calling transaction was chosen as a deadlock victim and must
    /// unwind. Locks it already held stay in place until
    /// `transaction_complete(tid, false)`.
    Aborted,
    /// An I/O failure from the page store, or an eviction failure when
    /// every resident page is dirty.
    Storage(io::Error),
    /// A malformed request: a page that does not belong to the named
    /// table, a schema mismatch on insert, an unknown table id.
    Invalid(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        DbError::Invalid(detail.into())
    }
}

impl From<io::Error> for DbError {
    fn from(err: io::Error) -> Self {
        DbError::Storage(err)
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Aborted => write!(f, "transaction aborted to break a deadlock"),
            DbError::Storage(err) => write!(f, "storage error: {err}"),
            DbError::Invalid(detail) => write!(f, "invalid request: {detail}"),
        }
    }
}

impl std::error::Error for DbError {}
