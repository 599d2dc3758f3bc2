//! Account configuration and per-account normalization.

use crate::domain::error::ImportError;
use crate::domain::transaction::TransactionRecord;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Shape of a source export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `Date, Description, Amount` bank or card download.
    Bank,
    /// Brokerage export with a preamble and one `Account` column per row.
    Investment { skip_rows: usize },
}

impl SourceFormat {
    pub const DEFAULT_SKIP_ROWS: usize = 5;

    pub fn layout(&self) -> StoreLayout {
        match self {
            SourceFormat::Bank => StoreLayout::Bank,
            SourceFormat::Investment { .. } => StoreLayout::Investment,
        }
    }
}

/// Pass-through columns carried by investment records, in store order.
pub const INVESTMENT_EXTRA_COLUMNS: [&str; 4] = [
    "securitySymbol",
    "securityDescription",
    "transQuantity",
    "securityPrice",
];

/// Column set of an account table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    Bank,
    Investment,
}

impl fmt::Display for StoreLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLayout::Bank => write!(f, "bank"),
            StoreLayout::Investment => write!(f, "investment"),
        }
    }
}

/// Where an account's records live in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub table: String,
    pub layout: StoreLayout,
}

/// Table names end up in SQL text, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Raw export row before it is assigned to an account.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Sub-account tag for exports covering several accounts.
    pub sub_account: Option<String>,
    pub record: TransactionRecord,
}

impl RawRecord {
    pub fn untagged(record: TransactionRecord) -> Self {
        Self {
            sub_account: None,
            record,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountConfig {
    /// Key of the account's config section.
    pub id: String,
    /// Display name used in prompts.
    pub name: String,
    pub source: PathBuf,
    pub format: SourceFormat,
    pub target: StoreTarget,
    pub invert_amounts: bool,
    pub apply_rules: bool,
    pub sub_account: Option<String>,
}

impl AccountConfig {
    pub fn bank(id: &str, name: &str, table: &str, source: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source: source.into(),
            format: SourceFormat::Bank,
            target: StoreTarget {
                table: table.to_string(),
                layout: StoreLayout::Bank,
            },
            invert_amounts: false,
            apply_rules: true,
            sub_account: None,
        }
    }

    pub fn investment(
        id: &str,
        name: &str,
        table: &str,
        source: impl Into<PathBuf>,
        sub_account: &str,
    ) -> Self {
        let format = SourceFormat::Investment {
            skip_rows: SourceFormat::DEFAULT_SKIP_ROWS,
        };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source: source.into(),
            format,
            target: StoreTarget {
                table: table.to_string(),
                layout: format.layout(),
            },
            invert_amounts: false,
            apply_rules: false,
            sub_account: Some(sub_account.to_string()),
        }
    }

    pub fn location(&self) -> String {
        self.source.display().to_string()
    }

    /// Apply the account's sign convention.
    pub fn normalize(&self, mut records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
        if self.invert_amounts {
            for record in &mut records {
                record.amount = -record.amount;
            }
        }
        records
    }
}

/// Select this account's rows from a source export.
///
/// `claimed` holds every sub-account tag configured against the same source.
/// Any row carrying a tag outside that set (or no tag at all, for a tagged
/// account) aborts with [`ImportError::UnassignedRecords`].
pub fn select_records(
    account: &AccountConfig,
    raw: Vec<RawRecord>,
    claimed: &BTreeSet<String>,
) -> Result<Vec<TransactionRecord>, ImportError> {
    let Some(tag) = account.sub_account.as_deref() else {
        return Ok(raw.into_iter().map(|r| r.record).collect());
    };

    let unassigned: Vec<&RawRecord> = raw
        .iter()
        .filter(|r| !r.sub_account.as_ref().is_some_and(|t| claimed.contains(t)))
        .collect();
    if !unassigned.is_empty() {
        let tags: BTreeSet<&str> = unassigned
            .iter()
            .map(|r| r.sub_account.as_deref().unwrap_or("<none>"))
            .collect();
        return Err(ImportError::UnassignedRecords {
            location: account.location(),
            count: unassigned.len(),
            tags: tags.into_iter().collect::<Vec<_>>().join(", "),
        });
    }

    Ok(raw
        .into_iter()
        .filter(|r| r.sub_account.as_deref() == Some(tag))
        .map(|r| r.record)
        .collect())
}
