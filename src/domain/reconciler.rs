//! Detection of new records as a multiset difference on `(date, amount)`.

use crate::domain::transaction::{ReconciliationKey, TransactionRecord};
use std::collections::HashMap;

/// Returns the records of `source` not matched by a key in `stored`.
///
/// Every stored key consumes at most one source record with the same key, so a
/// key seen `m` times in the source and `k` times in the store yields
/// `max(m - k, 0)` new records. Earlier source occurrences are consumed first;
/// source order is preserved.
pub fn reconcile(
    source: Vec<TransactionRecord>,
    stored: &[ReconciliationKey],
) -> Vec<TransactionRecord> {
    let mut remaining = key_counts(stored);
    source
        .into_iter()
        .filter(|record| match remaining.get_mut(&record.key()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .collect()
}

fn key_counts(keys: &[ReconciliationKey]) -> HashMap<ReconciliationKey, usize> {
    let mut counts = HashMap::with_capacity(keys.len());
    for key in keys {
        *counts.entry(ReconciliationKey::new(key.date, key.amount)).or_insert(0) += 1;
    }
    counts
}
