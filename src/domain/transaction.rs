//! Canonical transaction record and its reconciliation key.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Calendar format used when dates are written to the store.
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub original_description: String,
    pub description: String,
    pub amount: Decimal,
    pub category: Option<String>,
    /// Account-specific pass-through columns, in store column order.
    pub extra: Vec<(String, String)>,
}

impl TransactionRecord {
    pub fn new(date: NaiveDate, original_description: impl Into<String>, amount: Decimal) -> Self {
        let original_description = original_description.into();
        Self {
            date,
            description: original_description.clone(),
            original_description,
            amount,
            category: None,
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, column: &str, value: impl Into<String>) -> Self {
        self.extra.push((column.to_string(), value.into()));
        self
    }

    pub fn key(&self) -> ReconciliationKey {
        ReconciliationKey::new(self.date, self.amount)
    }

    pub fn store_date(&self) -> String {
        self.date.format(STORE_DATE_FORMAT).to_string()
    }
}

/// The `(date, amount)` pair used to recognise previously imported records.
///
/// Amounts are normalized so that `1.50` and `1.5` compare and hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReconciliationKey {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl ReconciliationKey {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self {
            date,
            amount: amount.normalize(),
        }
    }
}
