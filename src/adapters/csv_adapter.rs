//! CSV export source adapter.
//!
//! Normalizes bank/card downloads and brokerage exports into canonical
//! records. Columns are located by header name so reordered exports still
//! load.

use crate::domain::account::{RawRecord, SourceFormat, INVESTMENT_EXTRA_COLUMNS};
use crate::domain::error::ImportError;
use crate::domain::transaction::TransactionRecord;
use crate::ports::source_port::SourcePort;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Accepted export date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];

const BANK_DATE: &[&str] = &["Date"];
const BANK_DESCRIPTION: &[&str] = &["Description"];
const BANK_AMOUNT: &[&str] = &["Amount"];

const INV_DATE: &[&str] = &["Run Date", "Date"];
const INV_ACCOUNT: &[&str] = &["Account"];
const INV_DESCRIPTION: &[&str] = &["Action", "Description"];
const INV_AMOUNT: &[&str] = &["Amount ($)", "Amount"];
const INV_SYMBOL: &[&str] = &["Symbol"];
const INV_SECURITY: &[&str] = &["Security Description"];
const INV_QUANTITY: &[&str] = &["Quantity"];
const INV_PRICE: &[&str] = &["Price ($)", "Price"];

pub struct CsvSourceAdapter;

impl SourcePort for CsvSourceAdapter {
    fn read_source(
        &self,
        account: &str,
        location: &Path,
        format: SourceFormat,
    ) -> Result<Vec<RawRecord>, ImportError> {
        let shown = location.display().to_string();
        let content = fs::read_to_string(location).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ImportError::SourceNotFound {
                account: account.to_string(),
                location: shown.clone(),
            },
            _ => ImportError::SourceFormat {
                location: shown.clone(),
                reason: e.to_string(),
            },
        })?;

        let records = match format {
            SourceFormat::Bank => parse_bank(&content, &shown)?,
            SourceFormat::Investment { skip_rows } => {
                parse_investment(&content, &shown, skip_rows)?
            }
        };
        debug!(location = %shown, rows = records.len(), "export parsed");
        Ok(records)
    }
}

/// Parse a `Date, Description, Amount` export.
pub fn parse_bank(content: &str, location: &str) -> Result<Vec<RawRecord>, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(content.as_bytes());
    let headers = read_headers(&mut rdr, location)?;
    let date_col = require_column(&headers, BANK_DATE, location)?;
    let desc_col = require_column(&headers, BANK_DESCRIPTION, location)?;
    let amount_col = require_column(&headers, BANK_AMOUNT, location)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| format_error(location, e.to_string()))?;
        if is_blank(&row) {
            continue;
        }
        let line = line_of(&row);
        let date = parse_field(&row, date_col, line, location, "date", parse_date)?;
        let amount = parse_field(&row, amount_col, line, location, "amount", parse_amount)?;
        let description = row.get(desc_col).unwrap_or_default();
        records.push(RawRecord::untagged(TransactionRecord::new(
            date,
            description,
            amount,
        )));
    }
    Ok(records)
}

/// Parse a brokerage export.
///
/// The first `skip_rows` lines are preamble. Rows whose field count differs
/// from the header are skipped. The export lists newest first; the result is
/// oldest first.
pub fn parse_investment(
    content: &str,
    location: &str,
    skip_rows: usize,
) -> Result<Vec<RawRecord>, ImportError> {
    let body = content
        .lines()
        .skip(skip_rows)
        .collect::<Vec<_>>()
        .join("\n");
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());
    let headers = read_headers(&mut rdr, location)?;
    let date_col = require_column(&headers, INV_DATE, location)?;
    let account_col = require_column(&headers, INV_ACCOUNT, location)?;
    let desc_col = require_column(&headers, INV_DESCRIPTION, location)?;
    let amount_col = require_column(&headers, INV_AMOUNT, location)?;
    let extra_cols = [
        find_column(&headers, INV_SYMBOL),
        find_column(&headers, INV_SECURITY),
        find_column(&headers, INV_QUANTITY),
        find_column(&headers, INV_PRICE),
    ];

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| format_error(location, e.to_string()))?;
        if is_blank(&row) {
            continue;
        }
        let line = line_of(&row);
        if row.len() != headers.len() {
            debug!(location, line, fields = row.len(), "skipping bad line");
            continue;
        }

        let date = parse_field(&row, date_col, line, location, "date", parse_date)?;
        let amount = parse_field(&row, amount_col, line, location, "amount", parse_amount)?;
        let mut record =
            TransactionRecord::new(date, row.get(desc_col).unwrap_or_default(), amount);
        for (column, idx) in INVESTMENT_EXTRA_COLUMNS.iter().zip(extra_cols) {
            let value = idx.and_then(|i| row.get(i)).unwrap_or_default();
            record = record.with_extra(column, value);
        }
        let tag = row.get(account_col).unwrap_or_default();
        records.push(RawRecord {
            sub_account: (!tag.is_empty()).then(|| tag.to_string()),
            record,
        });
    }

    records.reverse();
    Ok(records)
}

/// Parse an export date, discarding any time-of-day suffix.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.trim().split([' ', 'T']).next().unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

/// Parse an export amount: `$` and thousands separators are ignored and
/// `(x)` means `-x`.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };
    let digits = digits.strip_prefix('+').unwrap_or(digits);
    let value = Decimal::from_str(digits).ok()?;
    Some(if negative { -value } else { value })
}

fn read_headers<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    location: &str,
) -> Result<StringRecord, ImportError> {
    let headers = rdr
        .headers()
        .map_err(|e| format_error(location, e.to_string()))?
        .clone();
    if headers.is_empty() {
        return Err(format_error(location, "no header row".to_string()));
    }
    Ok(headers)
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    })
}

fn require_column(
    headers: &StringRecord,
    names: &[&str],
    location: &str,
) -> Result<usize, ImportError> {
    find_column(headers, names)
        .ok_or_else(|| format_error(location, format!("missing {} column", names[0])))
}

fn parse_field<T>(
    row: &StringRecord,
    col: usize,
    line: u64,
    location: &str,
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ImportError> {
    let text = row.get(col).unwrap_or_default();
    parse(text).ok_or_else(|| format_error(location, format!("line {line}: invalid {field} {text:?}")))
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(str::is_empty)
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or_default()
}

fn format_error(location: &str, reason: String) -> ImportError {
    ImportError::SourceFormat {
        location: location.to_string(),
        reason,
    }
}
