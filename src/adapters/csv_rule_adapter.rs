//! Rule list loader.
//!
//! Rule files are headerless two-column CSV: `pattern,replacement`. Row order
//! is table order.

use crate::domain::error::ImportError;
use crate::domain::rule::{Rule, RuleBook, RuleTable};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RuleRow {
    pattern: String,
    replacement: String,
}

pub fn load_rule_table(path: &Path) -> Result<RuleTable, ImportError> {
    let file = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| ImportError::RuleFormat {
        file: file.clone(),
        reason: e.to_string(),
    })?;
    let table = parse_rule_table(&content, &file)?;
    info!(file = %file, rules = table.len(), "rules loaded");
    Ok(table)
}

pub fn load_rule_book(description: &Path, category: &Path) -> Result<RuleBook, ImportError> {
    Ok(RuleBook::new(
        load_rule_table(description)?,
        load_rule_table(category)?,
    ))
}

/// Any malformed row rejects the whole table.
pub fn parse_rule_table(content: &str, file: &str) -> Result<RuleTable, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let malformed = |line: u64, reason: String| ImportError::RuleFormat {
        file: file.to_string(),
        reason: format!("line {line}: {reason}"),
    };

    let mut rules = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| ImportError::RuleFormat {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 1);
        if record.len() != 2 {
            return Err(malformed(
                line,
                format!("expected 2 fields, found {}", record.len()),
            ));
        }
        let row: RuleRow = record
            .deserialize(None)
            .map_err(|e| malformed(line, e.to_string()))?;
        if row.pattern.is_empty() {
            return Err(malformed(line, "empty pattern".to_string()));
        }
        rules.push(Rule::new(row.pattern, row.replacement));
    }

    Ok(RuleTable::new(rules))
}
