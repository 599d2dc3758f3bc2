//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_rule_adapter::load_rule_book;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{load_settings, validate_account_filter, ImportSettings};
use crate::domain::error::ImportError;
use crate::domain::import::{AccountOutcome, AccountReport, ImportMode, Importer};
use crate::ports::interaction_port::InteractionPort;
use crate::ports::source_port::SourcePort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(
    name = "ledger-import",
    about = "Import new bank and brokerage transactions into a local ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile exports against the store and append confirmed records
    Import {
        #[arg(short, long)]
        config: PathBuf,
        /// Only process these account ids (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,
    },
    /// Show what would be imported without prompting or writing
    Preview {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long = "account")]
        accounts: Vec<String>,
    },
    /// Validate the configuration and both rule files
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create missing store tables
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Import { config, accounts } => {
            run_import(&config, &accounts, ImportMode::Interactive)
        }
        Command::Preview { config, accounts } => run_import(&config, &accounts, ImportMode::Preview),
        Command::Validate { config } => run_validate(&config),
        Command::Init { config } => run_init(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ImportError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Load the config file and validate it into run settings.
pub fn load_import_settings(config_path: &Path) -> Result<ImportSettings, ExitCode> {
    let adapter = load_config(config_path)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    load_settings(&adapter, base_dir).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Load both rule tables and run the import pipeline over the configured
/// accounts.
pub fn run_import_with(
    settings: &ImportSettings,
    only: &[String],
    mode: ImportMode,
    source: &dyn SourcePort,
    store: &dyn StorePort,
    ui: &mut dyn InteractionPort,
) -> Result<Vec<AccountReport>, ImportError> {
    validate_account_filter(&settings.accounts, only)?;
    let rules = load_rule_book(&settings.description_rules, &settings.category_rules)?;
    Importer::new(source, store, &rules, ui)
        .with_mode(mode)
        .run_only(&settings.accounts, only)
}

fn run_import(config_path: &Path, only: &[String], mode: ImportMode) -> ExitCode {
    tracing::debug!(config = %config_path.display(), ?mode, "starting run");
    let settings = match load_import_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::console_adapter::ConsoleInteraction;
        use crate::adapters::csv_adapter::CsvSourceAdapter;
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::open(&settings.store_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let mut ui = ConsoleInteraction::stdio();
        match run_import_with(&settings, only, mode, &CsvSourceAdapter, &store, &mut ui) {
            Ok(reports) => {
                for line in summary_lines(&reports) {
                    eprintln!("{line}");
                }
                ExitCode::from(summary_status(&reports))
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (settings, only, mode);
        eprintln!("error: sqlite feature is required for import");
        ExitCode::from(1)
    }
}

pub fn summary_lines(reports: &[AccountReport]) -> Vec<String> {
    let mut lines = vec![String::new(), "=== Import Summary ===".to_string()];
    for report in reports {
        let mut line = format!("  {}:  {}", report.account, report.outcome);
        if report.source_count > 0 {
            line.push_str(&format!(
                " ({} in export, {} new",
                report.source_count, report.new_count
            ));
            if report.dropped_older > 0 {
                line.push_str(&format!(", {} older dropped", report.dropped_older));
            }
            line.push(')');
        }
        if report.no_overlap {
            line.push_str(" [no overlap]");
        }
        lines.push(line);
    }
    lines
}

/// Process status for a completed run: skipped accounts still count as
/// success, a failed account does not.
pub fn summary_status(reports: &[AccountReport]) -> u8 {
    if reports
        .iter()
        .any(|r| matches!(r.outcome, AccountOutcome::Failed { .. }))
    {
        1
    } else {
        0
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let settings = match load_import_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let rules = match load_rule_book(&settings.description_rules, &settings.category_rules) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStore: {}", settings.store_path.display());
    eprintln!("\nRules:");
    eprintln!(
        "  description: {} rules ({})",
        rules.description.len(),
        settings.description_rules.display()
    );
    eprintln!(
        "  category:    {} rules ({})",
        rules.category.len(),
        settings.category_rules.display()
    );

    eprintln!("\nAccounts:");
    for account in &settings.accounts {
        let mut line = format!(
            "  {} ({}): {} table {} <- {}",
            account.id,
            account.name,
            account.target.layout,
            account.target.table,
            account.source.display()
        );
        if let Some(tag) = &account.sub_account {
            line.push_str(&format!(" [{tag}]"));
        }
        if account.invert_amounts {
            line.push_str(" (inverted)");
        }
        if !account.apply_rules {
            line.push_str(" (no rules)");
        }
        eprintln!("{line}");
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_init(config_path: &Path) -> ExitCode {
    let settings = match load_import_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::create(&settings.store_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if let Err(e) = store.initialize_schema(&settings.targets()) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!(
            "Initialized {} with {} account tables",
            settings.store_path.display(),
            settings.accounts.len()
        );
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = settings;
        eprintln!("error: sqlite feature is required for init");
        ExitCode::from(1)
    }
}
