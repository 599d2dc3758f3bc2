//! Transaction store port trait.

use crate::domain::account::StoreTarget;
use crate::domain::error::ImportError;
use crate::domain::transaction::{ReconciliationKey, TransactionRecord};

pub trait StorePort {
    /// Reconciliation keys of every record already stored for `target`.
    fn fetch_existing(&self, target: &StoreTarget) -> Result<Vec<ReconciliationKey>, ImportError>;

    /// Append `records` in the given order. Implementations must not reorder
    /// or deduplicate.
    fn append(&self, target: &StoreTarget, records: &[TransactionRecord]) -> Result<usize, ImportError>;
}
