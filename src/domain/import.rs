//! Per-account import pipeline and boundary-resolution policy.
//!
//! Each account runs `Collected → Reconciled → BoundaryChecked → Confirmed →
//! Imported`, or stops at one of the gates. Accounts are processed one at a
//! time and never share state beyond the store handle.

use crate::domain::account::{select_records, AccountConfig};
use crate::domain::classifier::classify;
use crate::domain::error::{ErrorScope, ImportError};
use crate::domain::reconciler::reconcile;
use crate::domain::rule::RuleBook;
use crate::domain::transaction::{ReconciliationKey, TransactionRecord};
use crate::ports::interaction_port::InteractionPort;
use crate::ports::source_port::SourcePort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportStage {
    Collected,
    Reconciled,
    BoundaryChecked,
    Confirmed,
    Imported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Interactive,
    /// Reconcile and classify only: no prompts, no append.
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    NothingToImport,
    Imported { count: usize },
    Declined,
    Previewed { count: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

impl fmt::Display for AccountOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountOutcome::NothingToImport => write!(f, "nothing to import"),
            AccountOutcome::Imported { count } => write!(f, "imported {count}"),
            AccountOutcome::Declined => write!(f, "import aborted"),
            AccountOutcome::Previewed { count } => write!(f, "{count} pending"),
            AccountOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            AccountOutcome::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub account: String,
    pub source_count: usize,
    pub new_count: usize,
    pub dropped_older: usize,
    pub no_overlap: bool,
    /// Last stage the pipeline reached.
    pub stage: ImportStage,
    pub outcome: AccountOutcome,
}

impl AccountReport {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            source_count: 0,
            new_count: 0,
            dropped_older: 0,
            no_overlap: false,
            stage: ImportStage::Collected,
            outcome: AccountOutcome::NothingToImport,
        }
    }

    fn from_error(account: &str, err: &ImportError) -> Self {
        let reason = err.to_string();
        let outcome = match err {
            ImportError::SourceNotFound { .. } => AccountOutcome::Skipped { reason },
            _ => AccountOutcome::Failed { reason },
        };
        Self {
            outcome,
            ..Self::new(account)
        }
    }
}

/// Result of reconciling one account's source records against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan {
    pub new_records: Vec<TransactionRecord>,
    pub source_count: usize,
    pub newest_stored: Option<NaiveDate>,
}

impl ReconciliationPlan {
    pub fn build(source: Vec<TransactionRecord>, stored: &[ReconciliationKey]) -> Self {
        let source_count = source.len();
        Self {
            new_records: reconcile(source, stored),
            source_count,
            newest_stored: newest_stored_date(stored),
        }
    }

    /// None of the source records matched the store: the export likely does
    /// not overlap the stored history at all.
    pub fn no_overlap(&self) -> bool {
        !self.new_records.is_empty() && self.new_records.len() == self.source_count
    }

    pub fn older_than_stored(&self) -> Vec<TransactionRecord> {
        match self.newest_stored {
            Some(newest) => self
                .new_records
                .iter()
                .filter(|r| r.date < newest)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

pub fn newest_stored_date(stored: &[ReconciliationKey]) -> Option<NaiveDate> {
    stored.iter().map(|k| k.date).max()
}

/// Keep records dated on or after `newest`.
pub fn drop_older(records: Vec<TransactionRecord>, newest: NaiveDate) -> Vec<TransactionRecord> {
    records.into_iter().filter(|r| r.date >= newest).collect()
}

/// Sub-account tags configured against the same export as `account`.
pub fn claimed_tags(accounts: &[AccountConfig], account: &AccountConfig) -> BTreeSet<String> {
    accounts
        .iter()
        .filter(|a| a.source == account.source)
        .filter_map(|a| a.sub_account.clone())
        .collect()
}

pub struct Importer<'a> {
    source: &'a dyn SourcePort,
    store: &'a dyn StorePort,
    rules: &'a RuleBook,
    ui: &'a mut dyn InteractionPort,
    mode: ImportMode,
}

impl<'a> Importer<'a> {
    pub fn new(
        source: &'a dyn SourcePort,
        store: &'a dyn StorePort,
        rules: &'a RuleBook,
        ui: &'a mut dyn InteractionPort,
    ) -> Self {
        Self {
            source,
            store,
            rules,
            ui,
            mode: ImportMode::Interactive,
        }
    }

    pub fn with_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run every account in order. Account-scoped failures are reported and
    /// recorded; run-scoped failures stop the run immediately.
    pub fn run(&mut self, accounts: &[AccountConfig]) -> Result<Vec<AccountReport>, ImportError> {
        self.run_only(accounts, &[])
    }

    /// Like [`Importer::run`], restricted to the account ids in `only` (all
    /// accounts when empty). Sub-account tags are still claimed across the
    /// full configured list.
    pub fn run_only(
        &mut self,
        accounts: &[AccountConfig],
        only: &[String],
    ) -> Result<Vec<AccountReport>, ImportError> {
        let mut reports = Vec::with_capacity(accounts.len());

        for account in accounts
            .iter()
            .filter(|a| only.is_empty() || only.iter().any(|id| id.eq_ignore_ascii_case(&a.id)))
        {
            let claimed = claimed_tags(accounts, account);
            let result = self
                .collect(account, &claimed)
                .and_then(|records| self.import_account(account, records));

            match result {
                Ok(report) => reports.push(report),
                Err(e) if e.scope() == ErrorScope::Account => {
                    warn!(account = %account.name, error = %e, "account pipeline stopped");
                    let report = AccountReport::from_error(&account.name, &e);
                    match &report.outcome {
                        AccountOutcome::Skipped { .. } => {
                            self.ui.notify(&format!("Skipping {}: {}.", account.name, e))
                        }
                        _ => self
                            .ui
                            .warn(&format!("{} import failed: {}.", account.name, e)),
                    }
                    reports.push(report);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(reports)
    }

    /// Read the account's export, keep its rows, and apply its sign convention.
    pub fn collect(
        &self,
        account: &AccountConfig,
        claimed: &BTreeSet<String>,
    ) -> Result<Vec<TransactionRecord>, ImportError> {
        let raw = self
            .source
            .read_source(&account.name, &account.source, account.format)?;
        debug!(account = %account.name, rows = raw.len(), "source read");
        let records = select_records(account, raw, claimed)?;
        Ok(account.normalize(records))
    }

    /// Take already-collected records through reconciliation, classification,
    /// the boundary check and the confirmation gate.
    pub fn import_account(
        &mut self,
        account: &AccountConfig,
        records: Vec<TransactionRecord>,
    ) -> Result<AccountReport, ImportError> {
        let name = account.name.as_str();
        let mut report = AccountReport::new(name);

        let stored = self.store.fetch_existing(&account.target)?;
        let plan = ReconciliationPlan::build(records, &stored);
        report.stage = ImportStage::Reconciled;
        report.source_count = plan.source_count;
        report.new_count = plan.new_records.len();
        info!(
            account = name,
            source = plan.source_count,
            stored = stored.len(),
            new = plan.new_records.len(),
            "reconciled"
        );

        if plan.new_records.is_empty() {
            self.ui.notify(&format!("No new {name} transactions."));
            return Ok(report);
        }

        let no_overlap = plan.no_overlap();
        let older = plan.older_than_stored();
        let newest_stored = plan.newest_stored;
        let mut pending = if account.apply_rules {
            classify(plan.new_records, self.rules)
        } else {
            plan.new_records
        };

        let title = format!("New {name} transactions:");
        self.ui.show_records(&title, &pending);

        if no_overlap {
            report.no_overlap = true;
            self.ui.warn(&format!(
                "There is no overlap between old and new {name} transactions. \
                 Recommend downloading transactions with a larger date range."
            ));
        }

        if let (Some(newest), false) = (newest_stored, older.is_empty()) {
            debug!(account = name, older = older.len(), %newest, "records older than store");
            if self.mode == ImportMode::Preview {
                self.ui.notify(&format!(
                    "{} of these are older than the newest stored {name} transaction ({newest}).",
                    older.len()
                ));
            } else {
                self.ui.show_records(
                    &format!("These new {name} transactions are older than those in the database:"),
                    &older,
                );
                let include = self.ui.confirm("Should they be included in the import?");
                if !include.is_accept() {
                    let before = pending.len();
                    pending = drop_older(pending, newest);
                    report.dropped_older = before - pending.len();
                    info!(account = name, dropped = report.dropped_older, "older records dropped");
                }
                self.ui.show_records(&title, &pending);
            }
        }
        report.stage = ImportStage::BoundaryChecked;

        if self.mode == ImportMode::Preview {
            report.outcome = AccountOutcome::Previewed {
                count: pending.len(),
            };
            return Ok(report);
        }

        if pending.is_empty() {
            self.ui
                .notify(&format!("No {name} transactions left to import."));
            return Ok(report);
        }

        if !self
            .ui
            .confirm(&format!("Import new {name} transactions?"))
            .is_accept()
        {
            self.ui.notify(&format!("{name} import aborted."));
            report.outcome = AccountOutcome::Declined;
            return Ok(report);
        }
        report.stage = ImportStage::Confirmed;

        self.ui.notify("Importing transactions...");
        let count = self.store.append(&account.target, &pending)?;
        report.stage = ImportStage::Imported;
        report.outcome = AccountOutcome::Imported { count };
        info!(account = name, count, table = %account.target.table, "imported");
        self.ui
            .notify(&format!("Imported {count} {name} transactions."));

        Ok(report)
    }
}
