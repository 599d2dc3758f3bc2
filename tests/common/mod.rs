#![allow(dead_code)]

use chrono::NaiveDate;
use ledger_import::domain::account::{RawRecord, SourceFormat, StoreTarget};
use ledger_import::domain::error::ImportError;
use ledger_import::domain::rule::{RuleBook, RuleTable};
use ledger_import::domain::transaction::{ReconciliationKey, TransactionRecord};
use ledger_import::ports::interaction_port::{Decision, InteractionPort};
use ledger_import::ports::source_port::SourcePort;
use ledger_import::ports::store_port::StorePort;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Exports keyed by location. Unknown locations are `SourceNotFound`.
pub struct MockSource {
    pub exports: HashMap<PathBuf, Vec<RawRecord>>,
    pub errors: HashMap<PathBuf, String>,
    pub reads: RefCell<Vec<PathBuf>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            exports: HashMap::new(),
            errors: HashMap::new(),
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn with_records(mut self, location: &str, records: Vec<TransactionRecord>) -> Self {
        self.exports.insert(
            PathBuf::from(location),
            records.into_iter().map(RawRecord::untagged).collect(),
        );
        self
    }

    pub fn with_raw(mut self, location: &str, raw: Vec<RawRecord>) -> Self {
        self.exports.insert(PathBuf::from(location), raw);
        self
    }

    pub fn with_format_error(mut self, location: &str, reason: &str) -> Self {
        self.errors.insert(PathBuf::from(location), reason.to_string());
        self
    }
}

impl SourcePort for MockSource {
    fn read_source(
        &self,
        account: &str,
        location: &Path,
        _format: SourceFormat,
    ) -> Result<Vec<RawRecord>, ImportError> {
        self.reads.borrow_mut().push(location.to_path_buf());
        if let Some(reason) = self.errors.get(location) {
            return Err(ImportError::SourceFormat {
                location: location.display().to_string(),
                reason: reason.clone(),
            });
        }
        self.exports
            .get(location)
            .cloned()
            .ok_or_else(|| ImportError::SourceNotFound {
                account: account.to_string(),
                location: location.display().to_string(),
            })
    }
}

/// In-memory store. Tables listed in `reject` fail every append with a
/// constraint violation.
#[derive(Default)]
pub struct MockStore {
    pub tables: RefCell<HashMap<String, Vec<TransactionRecord>>>,
    pub reject: Vec<String>,
    pub unavailable: bool,
    pub appends: RefCell<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<TransactionRecord>) -> Self {
        self.tables.borrow_mut().insert(table.to_string(), rows);
        self
    }

    pub fn rejecting(mut self, table: &str) -> Self {
        self.reject.push(table.to_string());
        self
    }

    pub fn rows(&self, table: &str) -> Vec<TransactionRecord> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    pub fn append_count(&self) -> usize {
        self.appends.borrow().len()
    }
}

impl StorePort for MockStore {
    fn fetch_existing(&self, target: &StoreTarget) -> Result<Vec<ReconciliationKey>, ImportError> {
        if self.unavailable {
            return Err(ImportError::StoreUnavailable {
                reason: "database is locked".into(),
            });
        }
        Ok(self.rows(&target.table).iter().map(TransactionRecord::key).collect())
    }

    fn append(&self, target: &StoreTarget, records: &[TransactionRecord]) -> Result<usize, ImportError> {
        self.appends.borrow_mut().push(target.table.clone());
        if self.reject.contains(&target.table) {
            return Err(ImportError::ConstraintViolation {
                table: target.table.clone(),
                reason: "FOREIGN KEY constraint failed".into(),
            });
        }
        self.tables
            .borrow_mut()
            .entry(target.table.clone())
            .or_default()
            .extend_from_slice(records);
        Ok(records.len())
    }
}

/// Answers prompts from a queue and records everything shown. An exhausted
/// queue declines.
#[derive(Default)]
pub struct ScriptedInteraction {
    pub answers: VecDeque<Decision>,
    pub questions: Vec<String>,
    pub notices: Vec<String>,
    pub warnings: Vec<String>,
    pub shown: Vec<(String, Vec<TransactionRecord>)>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: &[Decision]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn accepting_all(prompts: usize) -> Self {
        Self::answering(&vec![Decision::Accept; prompts])
    }
}

impl InteractionPort for ScriptedInteraction {
    fn show_records(&mut self, title: &str, records: &[TransactionRecord]) {
        self.shown.push((title.to_string(), records.to_vec()));
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn confirm(&mut self, question: &str) -> Decision {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(Decision::Decline)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn amount(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn rec(d: &str, amt: &str, desc: &str) -> TransactionRecord {
    TransactionRecord::new(date(d), desc, amount(amt))
}

pub fn tagged(tag: &str, record: TransactionRecord) -> RawRecord {
    RawRecord {
        sub_account: Some(tag.to_string()),
        record,
    }
}

pub fn rule_table(pairs: &[(&str, &str)]) -> RuleTable {
    pairs
        .iter()
        .map(|(p, r)| (p.to_string(), r.to_string()))
        .collect()
}

pub fn rule_book(description: &[(&str, &str)], category: &[(&str, &str)]) -> RuleBook {
    RuleBook::new(rule_table(description), rule_table(category))
}
