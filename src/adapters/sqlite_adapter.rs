//! SQLite transaction store adapter.
//!
//! One database file holds a table per account. Connections enforce foreign
//! keys so `transCategory` must reference a known category.

use crate::domain::account::{
    is_plain_identifier, StoreLayout, StoreTarget, INVESTMENT_EXTRA_COLUMNS,
};
use crate::domain::error::ImportError;
use crate::domain::transaction::{ReconciliationKey, TransactionRecord, STORE_DATE_FORMAT};
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{params_from_iter, ErrorCode, OpenFlags};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Decimal places kept when reading REAL amounts back.
const REAL_AMOUNT_SCALE: u32 = 6;

pub const CATEGORY_TABLE: &str = "Categories";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Open an existing database. A missing file is never created.
    pub fn open(path: &Path) -> Result<Self, ImportError> {
        if !path.is_file() {
            return Err(ImportError::StoreUnavailable {
                reason: format!("{} does not exist", path.display()),
            });
        }
        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::build(manager)
    }

    /// Open or create a database file.
    pub fn create(path: &Path) -> Result<Self, ImportError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::build(manager)
    }

    pub fn in_memory() -> Result<Self, ImportError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::build(manager)
    }

    fn build(manager: SqliteConnectionManager) -> Result<Self, ImportError> {
        // One connection for the whole run.
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .map_err(|e: r2d2::Error| ImportError::StoreUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, ImportError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| ImportError::StoreUnavailable {
                reason: e.to_string(),
            })
    }

    /// Create the category table and any missing account tables. Existing
    /// tables are left untouched.
    pub fn initialize_schema(&self, targets: &[StoreTarget]) -> Result<(), ImportError> {
        let conn = self.connection()?;

        let mut ddl = format!(
            "CREATE TABLE IF NOT EXISTS {CATEGORY_TABLE} (
                categoryName TEXT PRIMARY KEY NOT NULL
            );"
        );
        for target in targets {
            check_identifier(&target.table)?;
            ddl.push_str(&table_ddl(target));
        }

        conn.execute_batch(&ddl)
            .map_err(|e: rusqlite::Error| ImportError::StoreQuery {
                table: CATEGORY_TABLE.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    pub fn insert_categories(&self, names: &[&str]) -> Result<(), ImportError> {
        let conn = self.connection()?;
        for name in names {
            conn.execute(
                &format!("INSERT OR IGNORE INTO {CATEGORY_TABLE} (categoryName) VALUES (?1)"),
                [name],
            )
            .map_err(|e: rusqlite::Error| ImportError::StoreQuery {
                table: CATEGORY_TABLE.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Number of rows in an account table.
    pub fn count(&self, target: &StoreTarget) -> Result<usize, ImportError> {
        check_identifier(&target.table)?;
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", target.table), [], |row| {
                row.get(0)
            })
            .map_err(|e| query_error(&target.table, e))?;
        Ok(count as usize)
    }
}

impl StorePort for SqliteAdapter {
    fn fetch_existing(&self, target: &StoreTarget) -> Result<Vec<ReconciliationKey>, ImportError> {
        check_identifier(&target.table)?;
        let conn = self.connection()?;

        let query = format!("SELECT transDate, transAmount FROM \"{}\"", target.table);
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| query_error(&target.table, e))?;

        let rows = stmt
            .query_map([], |row| {
                let date = stored_date(row.get_ref(0)?)?;
                let amount = stored_amount(row.get_ref(1)?)?;
                Ok(ReconciliationKey::new(date, amount))
            })
            .map_err(|e| query_error(&target.table, e))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|e| query_error(&target.table, e))?);
        }
        debug!(table = %target.table, rows = keys.len(), "stored keys fetched");
        Ok(keys)
    }

    fn append(&self, target: &StoreTarget, records: &[TransactionRecord]) -> Result<usize, ImportError> {
        check_identifier(&target.table)?;
        let mut conn = self.connection()?;

        let columns = layout_columns(target.layout);
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            target.table,
            columns.join(", "),
            placeholders
        );

        let tx = conn
            .transaction()
            .map_err(|e| append_error(&target.table, e))?;
        {
            let mut stmt = tx.prepare(&sql).map_err(|e| append_error(&target.table, e))?;
            for record in records {
                let values = row_values(target, record)?;
                stmt.execute(params_from_iter(values))
                    .map_err(|e| append_error(&target.table, e))?;
            }
        }
        tx.commit().map_err(|e| append_error(&target.table, e))?;

        debug!(table = %target.table, rows = records.len(), "appended");
        Ok(records.len())
    }
}

fn layout_columns(layout: StoreLayout) -> Vec<&'static str> {
    match layout {
        StoreLayout::Bank => vec![
            "transDate",
            "transOriginalDescription",
            "transDescription",
            "transAmount",
            "transCategory",
        ],
        StoreLayout::Investment => {
            let mut cols = vec!["transDate", "transDescription"];
            cols.extend(INVESTMENT_EXTRA_COLUMNS);
            cols.push("transAmount");
            cols
        }
    }
}

fn table_ddl(target: &StoreTarget) -> String {
    match target.layout {
        StoreLayout::Bank => format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                transDate TEXT NOT NULL,
                transOriginalDescription TEXT,
                transDescription TEXT,
                transAmount REAL NOT NULL,
                transCategory TEXT REFERENCES {CATEGORY_TABLE}(categoryName)
            );",
            target.table
        ),
        StoreLayout::Investment => format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                transDate TEXT NOT NULL,
                transDescription TEXT,
                securitySymbol TEXT,
                securityDescription TEXT,
                transQuantity REAL,
                securityPrice REAL,
                transAmount REAL NOT NULL
            );",
            target.table
        ),
    }
}

fn row_values(target: &StoreTarget, record: &TransactionRecord) -> Result<Vec<Value>, ImportError> {
    let amount = record
        .amount
        .to_f64()
        .ok_or_else(|| ImportError::ConstraintViolation {
            table: target.table.clone(),
            reason: format!("amount {} is not representable", record.amount),
        })?;

    let mut values = vec![Value::Text(record.store_date())];
    match target.layout {
        StoreLayout::Bank => {
            values.push(Value::Text(record.original_description.clone()));
            values.push(Value::Text(record.description.clone()));
            values.push(Value::Real(amount));
            values.push(record.category.clone().map_or(Value::Null, Value::Text));
        }
        StoreLayout::Investment => {
            values.push(Value::Text(record.description.clone()));
            for column in INVESTMENT_EXTRA_COLUMNS {
                values.push(extra_value(record, column));
            }
            values.push(Value::Real(amount));
        }
    }
    Ok(values)
}

/// Investment columns declared REAL; the rest are stored as text.
const REAL_EXTRA_COLUMNS: [&str; 2] = ["transQuantity", "securityPrice"];

/// Empty pass-through fields are stored as NULL. Finite numbers in REAL
/// columns are stored as REAL; everything else keeps its text.
fn extra_value(record: &TransactionRecord, column: &str) -> Value {
    let text = record
        .extra
        .iter()
        .find(|(name, _)| name == column)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Value::Null;
    }
    if REAL_EXTRA_COLUMNS.contains(&column) {
        if let Ok(n) = text.trim().parse::<f64>() {
            if n.is_finite() {
                return Value::Real(n);
            }
        }
    }
    Value::Text(text.to_string())
}

fn conversion(col: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, ty, msg.into())
}

fn stored_text(col: usize, bytes: &[u8]) -> rusqlite::Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| conversion(col, Type::Text, e.to_string()))
}

fn stored_date(value: ValueRef<'_>) -> rusqlite::Result<NaiveDate> {
    let ValueRef::Text(bytes) = value else {
        return Err(conversion(0, value.data_type(), "date is not text".to_string()));
    };
    let text = stored_text(0, bytes)?;
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, STORE_DATE_FORMAT)
        .map_err(|e| conversion(0, Type::Text, format!("{text:?}: {e}")))
}

fn stored_amount(value: ValueRef<'_>) -> rusqlite::Result<Decimal> {
    match value {
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::from_f64(f)
            .map(|d| d.round_dp(REAL_AMOUNT_SCALE))
            .ok_or_else(|| conversion(1, Type::Real, format!("amount {f} out of range"))),
        ValueRef::Text(bytes) => Decimal::from_str(stored_text(1, bytes)?.trim())
            .map_err(|e| conversion(1, Type::Text, e.to_string())),
        other => Err(conversion(1, other.data_type(), "amount is not numeric".to_string())),
    }
}

fn check_identifier(table: &str) -> Result<(), ImportError> {
    if is_plain_identifier(table) {
        Ok(())
    } else {
        Err(ImportError::StoreQuery {
            table: table.to_string(),
            reason: "not a valid table name".to_string(),
        })
    }
}

fn query_error(table: &str, e: rusqlite::Error) -> ImportError {
    ImportError::StoreQuery {
        table: table.to_string(),
        reason: e.to_string(),
    }
}

fn append_error(table: &str, e: rusqlite::Error) -> ImportError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => ImportError::ConstraintViolation {
            table: table.to_string(),
            reason: e.to_string(),
        },
        Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt) => {
            ImportError::StoreUnavailable {
                reason: e.to_string(),
            }
        }
        _ => query_error(table, e),
    }
}
