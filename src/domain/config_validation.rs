//! Configuration validation.
//!
//! Builds the run settings from a [`ConfigPort`] and rejects anything invalid
//! before any account is touched.

use crate::domain::account::{is_plain_identifier, AccountConfig, SourceFormat, StoreTarget};
use crate::domain::error::ImportError;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub store_path: PathBuf,
    pub description_rules: PathBuf,
    pub category_rules: PathBuf,
    pub accounts: Vec<AccountConfig>,
}

impl ImportSettings {
    pub fn targets(&self) -> Vec<StoreTarget> {
        self.accounts.iter().map(|a| a.target.clone()).collect()
    }
}

/// Read and validate the whole configuration. Relative paths are resolved
/// against `base_dir`, normally the config file's directory.
pub fn load_settings(config: &dyn ConfigPort, base_dir: &Path) -> Result<ImportSettings, ImportError> {
    let store_path = resolve_path(base_dir, &require_string(config, "store", "path")?);
    let description_rules = resolve_path(base_dir, &require_string(config, "rules", "description")?);
    let category_rules = resolve_path(base_dir, &require_string(config, "rules", "category")?);
    let accounts = build_accounts(config, base_dir)?;
    Ok(ImportSettings {
        store_path,
        description_rules,
        category_rules,
        accounts,
    })
}

pub fn build_accounts(
    config: &dyn ConfigPort,
    base_dir: &Path,
) -> Result<Vec<AccountConfig>, ImportError> {
    let ids = parse_account_list(&require_string(config, "import", "accounts")?);
    if ids.is_empty() {
        return Err(ImportError::ConfigInvalid {
            section: "import".to_string(),
            key: "accounts".to_string(),
            reason: "no accounts listed".to_string(),
        });
    }

    let accounts = ids
        .iter()
        .map(|id| build_account(config, id, base_dir))
        .collect::<Result<Vec<_>, _>>()?;
    validate_unique(&accounts)?;
    Ok(accounts)
}

pub fn parse_account_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn build_account(
    config: &dyn ConfigPort,
    id: &str,
    base_dir: &Path,
) -> Result<AccountConfig, ImportError> {
    let name = config
        .get_string(id, "name")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| id.to_string());
    let table = require_string(config, id, "table")?;
    if !is_plain_identifier(&table) {
        return Err(invalid(
            id,
            "table",
            format!("{table:?} is not a valid table name"),
        ));
    }
    let source = resolve_path(base_dir, &require_string(config, id, "source")?);

    let format_name = config
        .get_string(id, "format")
        .unwrap_or_else(|| "bank".to_string());
    let mut account = match format_name.trim().to_lowercase().as_str() {
        "bank" => AccountConfig::bank(id, &name, &table, source),
        "investment" => {
            let sub_account = config
                .get_string(id, "sub_account")
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    invalid(id, "sub_account", "required for investment accounts".to_string())
                })?;
            let skip_rows = config
                .get_count(id, "skip_rows")
                .map_err(|raw| {
                    invalid(id, "skip_rows", format!("{raw:?} is not a non-negative integer"))
                })?
                .unwrap_or(SourceFormat::DEFAULT_SKIP_ROWS);
            let mut account =
                AccountConfig::investment(id, &name, &table, source, sub_account.trim());
            account.format = SourceFormat::Investment { skip_rows };
            account
        }
        other => {
            return Err(invalid(
                id,
                "format",
                format!("unknown format {other:?}, expected bank or investment"),
            ));
        }
    };

    account.invert_amounts = optional_bool(config, id, "invert_amounts")?.unwrap_or(false);
    account.apply_rules = optional_bool(config, id, "apply_rules")?.unwrap_or(account.apply_rules);
    Ok(account)
}

fn optional_bool(config: &dyn ConfigPort, id: &str, key: &str) -> Result<Option<bool>, ImportError> {
    config
        .get_bool(id, key)
        .map_err(|raw| invalid(id, key, format!("{raw:?} is not true or false")))
}

fn validate_unique(accounts: &[AccountConfig]) -> Result<(), ImportError> {
    let mut ids = HashSet::new();
    let mut tables = HashSet::new();
    for account in accounts {
        if !ids.insert(account.id.as_str()) {
            return Err(invalid(
                "import",
                "accounts",
                format!("account {} listed twice", account.id),
            ));
        }
        if !tables.insert(account.target.table.to_lowercase()) {
            return Err(invalid(
                &account.id,
                "table",
                format!("table {} is used by another account", account.target.table),
            ));
        }
    }
    Ok(())
}

/// Every `--account` id must name a configured account.
pub fn validate_account_filter(
    accounts: &[AccountConfig],
    only: &[String],
) -> Result<(), ImportError> {
    for id in only {
        if !accounts.iter().any(|a| a.id.eq_ignore_ascii_case(id)) {
            return Err(invalid(
                "import",
                "accounts",
                format!("unknown account {id:?}"),
            ));
        }
    }
    Ok(())
}

fn require_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, ImportError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ImportError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn invalid(section: &str, key: &str, reason: String) -> ImportError {
    ImportError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
