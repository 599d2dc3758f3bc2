//! Rule-driven description and category labelling.

use crate::domain::rule::{RuleBook, RuleTable};
use crate::domain::transaction::TransactionRecord;

/// Label a single record. Both tables are matched against the original
/// description, never against a label produced by the other table.
pub fn classify_record(
    mut record: TransactionRecord,
    description_rules: &RuleTable,
    category_rules: &RuleTable,
) -> TransactionRecord {
    record.description = description_rules
        .last_match(&record.original_description)
        .unwrap_or(&record.original_description)
        .to_string();
    record.category = category_rules
        .last_match(&record.original_description)
        .map(str::to_string);
    record
}

pub fn classify(records: Vec<TransactionRecord>, rules: &RuleBook) -> Vec<TransactionRecord> {
    records
        .into_iter()
        .map(|r| classify_record(r, &rules.description, &rules.category))
        .collect()
}
