//! CLI integration tests.
//!
//! Tests cover:
//! - Settings loading from INI files on disk (relative path resolution)
//! - `init` creating the store
//! - Full import runs over real CSV exports, rule files and SQLite
//! - Preview, reruns, missing exports, rule and constraint failures

mod common;

use common::*;
use ledger_import::cli::{self, Cli};
use ledger_import::domain::account::SourceFormat;
use ledger_import::domain::error::ImportError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LEDGER_INI: &str = r#"
[store]
path = ledger.db

[rules]
description = Description rules.csv
category = Category rules.csv

[import]
accounts = visa, checking, investment_1, investment_2

[visa]
name = Visa
table = Visa_7651
source = exports/visa.csv
invert_amounts = true

[checking]
name = Checking
table = Checking_4883
source = exports/checking.csv

[investment_1]
name = Account_1
table = Investment_1
source = exports/investment_transactions.csv
format = investment
sub_account = ACCOUNT_1

[investment_2]
name = Account_2
table = Investment_2
source = exports/investment_transactions.csv
format = investment
sub_account = ACCOUNT_2
"#;

const DESCRIPTION_RULES: &str = "coffee,Blue Bottle\nsafeway,Safeway\nACME,Acme Payroll\n";
const CATEGORY_RULES: &str = "coffee,Dining\nsafeway,Groceries\npayroll,Income\nrent,Housing\n";

const VISA_CSV: &str = "Date,Description,Amount\n\
03/01/2024,SQ *BLUE BOTTLE COFFEE,4.50\n\
03/02/2024,SAFEWAY #123,52.10\n";

const CHECKING_CSV: &str = "Date,Description,Amount\n\
2024-03-01,PAYROLL ACME,\"1,200.00\"\n\
2024-03-03,RENT MARCH,(1500.00)\n";

const INVESTMENT_CSV: &str = "Brokerage\n\
\n\
Account History\n\
Date range: 2024-03-01 to 2024-03-31\n\
\n\
Run Date,Account,Action,Symbol,Security Description,Security Type,Quantity,Price ($),Commission ($),Fees ($),Accrued Interest ($),Amount ($),Settlement Date\n\
03/14/2024,ACCOUNT_1,YOU BOUGHT FXAIX,FXAIX,FIDELITY 500 INDEX,Mutual Fund,2.5,170.10,,,,-425.25,03/15/2024\n\
03/10/2024,ACCOUNT_2,DIVIDEND RECEIVED,SPAXX,FIDELITY GOVERNMENT MONEY MARKET,Cash,,,,,,3.12,\n\
03/05/2024,ACCOUNT_1,ELECTRONIC FUNDS TRANSFER,,No Description,Cash,,,,,,500.00,\n\
\n\
\"The data and information in this spreadsheet is provided for informational purposes only.\"\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("exports")).unwrap();
        let fixture = Self { dir };
        fixture.write("ledger.ini", LEDGER_INI);
        fixture.write("Description rules.csv", DESCRIPTION_RULES);
        fixture.write("Category rules.csv", CATEGORY_RULES);
        fixture.write("exports/visa.csv", VISA_CSV);
        fixture.write("exports/checking.csv", CHECKING_CSV);
        fixture.write("exports/investment_transactions.csv", INVESTMENT_CSV);
        fixture
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).unwrap();
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> PathBuf {
        self.path("ledger.ini")
    }
}

mod settings {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let fixture = Fixture::new();
        let settings = cli::load_import_settings(&fixture.config()).unwrap();

        assert_eq!(settings.store_path, fixture.path("ledger.db"));
        assert_eq!(settings.description_rules, fixture.path("Description rules.csv"));
        assert_eq!(settings.accounts.len(), 4);
        assert_eq!(settings.accounts[0].source, fixture.path("exports/visa.csv"));
        assert_eq!(
            settings.accounts[3].format,
            SourceFormat::Investment { skip_rows: 5 }
        );
    }

    #[test]
    fn missing_config_file_fails() {
        let result = cli::load_import_settings(Path::new("/nonexistent/ledger.ini"));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_config_fails() {
        let fixture = Fixture::new();
        fixture.write("ledger.ini", &LEDGER_INI.replace("table = Visa_7651", "table = Visa 7651"));
        assert!(cli::load_import_settings(&fixture.config()).is_err());
    }
}

#[cfg(feature = "sqlite")]
mod end_to_end {
    use super::*;
    use clap::Parser;
    use ledger_import::adapters::csv_adapter::CsvSourceAdapter;
    use ledger_import::adapters::sqlite_adapter::SqliteAdapter;
    use ledger_import::domain::config_validation::ImportSettings;
    use ledger_import::domain::import::{AccountOutcome, AccountReport, ImportMode};
    use ledger_import::ports::store_port::StorePort;

    fn init_store(fixture: &Fixture) -> (ImportSettings, SqliteAdapter) {
        let config = fixture.config();
        let args = Cli::try_parse_from(["ledger-import", "init", "--config", config.to_str().unwrap()])
            .unwrap();
        let _ = cli::run(args);

        let settings = cli::load_import_settings(&config).unwrap();
        let store = SqliteAdapter::open(&settings.store_path).unwrap();
        store
            .insert_categories(&["Dining", "Groceries", "Income", "Housing"])
            .unwrap();
        (settings, store)
    }

    fn import(
        settings: &ImportSettings,
        store: &SqliteAdapter,
        ui: &mut ScriptedInteraction,
    ) -> Result<Vec<AccountReport>, ImportError> {
        cli::run_import_with(settings, &[], ImportMode::Interactive, &CsvSourceAdapter, store, ui)
    }

    fn count(settings: &ImportSettings, store: &SqliteAdapter, id: &str) -> usize {
        let account = settings.accounts.iter().find(|a| a.id == id).unwrap();
        store.count(&account.target).unwrap()
    }

    #[test]
    fn init_creates_every_account_table() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        assert!(fixture.path("ledger.db").is_file());
        for account in &settings.accounts {
            assert_eq!(store.count(&account.target).unwrap(), 0);
        }
    }

    #[test]
    fn open_without_init_is_unavailable() {
        let fixture = Fixture::new();
        let settings = cli::load_import_settings(&fixture.config()).unwrap();
        let result = SqliteAdapter::open(&settings.store_path);
        assert!(matches!(result, Err(ImportError::StoreUnavailable { .. })));
    }

    #[test]
    fn full_import_then_rerun_is_idempotent() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        let mut ui = ScriptedInteraction::accepting_all(4);
        let reports = import(&settings, &store, &mut ui).unwrap();

        let outcomes: Vec<_> = reports.iter().map(|r| r.outcome.clone()).collect();
        assert_eq!(
            outcomes,
            vec![
                AccountOutcome::Imported { count: 2 },
                AccountOutcome::Imported { count: 2 },
                AccountOutcome::Imported { count: 2 },
                AccountOutcome::Imported { count: 1 },
            ]
        );
        assert_eq!(count(&settings, &store, "investment_1"), 2);

        let visa = &settings.accounts[0];
        let keys = store.fetch_existing(&visa.target).unwrap();
        assert_eq!(
            keys,
            vec![
                rec("2024-03-01", "-4.50", "").key(),
                rec("2024-03-02", "-52.10", "").key(),
            ]
        );

        let mut rerun = ScriptedInteraction::new();
        let reports = import(&settings, &store, &mut rerun).unwrap();
        assert!(reports
            .iter()
            .all(|r| r.outcome == AccountOutcome::NothingToImport));
        assert!(rerun.questions.is_empty());
        assert_eq!(count(&settings, &store, "visa"), 2);
    }

    #[test]
    fn investment_rows_are_imported_oldest_first() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        let mut ui = ScriptedInteraction::accepting_all(4);
        import(&settings, &store, &mut ui).unwrap();

        let inv1 = &settings.accounts[2];
        let keys = store.fetch_existing(&inv1.target).unwrap();
        assert_eq!(
            keys,
            vec![
                rec("2024-03-05", "500", "").key(),
                rec("2024-03-14", "-425.25", "").key(),
            ]
        );
    }

    #[test]
    fn preview_writes_nothing() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        let mut ui = ScriptedInteraction::new();
        let reports = cli::run_import_with(
            &settings,
            &[],
            ImportMode::Preview,
            &CsvSourceAdapter,
            &store,
            &mut ui,
        )
        .unwrap();

        assert!(ui.questions.is_empty());
        assert_eq!(reports[0].outcome, AccountOutcome::Previewed { count: 2 });
        assert_eq!(count(&settings, &store, "visa"), 0);
        let visa_preview = &ui.shown[0].1;
        assert_eq!(visa_preview[0].description, "Blue Bottle");
        assert_eq!(visa_preview[1].category.as_deref(), Some("Groceries"));
    }

    #[test]
    fn account_filter_limits_the_run() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        let mut ui = ScriptedInteraction::accepting_all(1);
        let reports = cli::run_import_with(
            &settings,
            &["checking".to_string()],
            ImportMode::Interactive,
            &CsvSourceAdapter,
            &store,
            &mut ui,
        )
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(count(&settings, &store, "checking"), 2);
        assert_eq!(count(&settings, &store, "visa"), 0);
    }

    #[test]
    fn unknown_account_filter_is_config_error() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);

        let mut ui = ScriptedInteraction::new();
        let err = cli::run_import_with(
            &settings,
            &["amex".to_string()],
            ImportMode::Interactive,
            &CsvSourceAdapter,
            &store,
            &mut ui,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::ConfigInvalid { .. }));
    }

    #[test]
    fn missing_export_is_skipped() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);
        fs::remove_file(fixture.path("exports/visa.csv")).unwrap();

        let mut ui = ScriptedInteraction::accepting_all(3);
        let reports = import(&settings, &store, &mut ui).unwrap();

        assert!(matches!(reports[0].outcome, AccountOutcome::Skipped { .. }));
        assert_eq!(reports[1].outcome, AccountOutcome::Imported { count: 2 });
    }

    #[test]
    fn malformed_rule_file_aborts_before_any_account() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);
        fixture.write("Category rules.csv", "coffee,Dining\nbroken\n");

        let mut ui = ScriptedInteraction::accepting_all(4);
        let err = import(&settings, &store, &mut ui).unwrap_err();

        assert!(matches!(err, ImportError::RuleFormat { .. }));
        assert!(ui.shown.is_empty());
        assert_eq!(count(&settings, &store, "checking"), 0);
    }

    #[test]
    fn unknown_category_fails_one_account_only() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);
        fixture.write("Category rules.csv", "coffee,Coffee Shops\npayroll,Income\nrent,Housing\n");

        let mut ui = ScriptedInteraction::accepting_all(4);
        let reports = import(&settings, &store, &mut ui).unwrap();

        match &reports[0].outcome {
            AccountOutcome::Failed { reason } => assert!(reason.contains("Visa_7651"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(count(&settings, &store, "visa"), 0);
        assert_eq!(reports[1].outcome, AccountOutcome::Imported { count: 2 });
        assert_eq!(cli::summary_status(&reports), 1);
    }

    #[test]
    fn unassigned_sub_account_aborts_the_run() {
        let fixture = Fixture::new();
        let (settings, store) = init_store(&fixture);
        fixture.write(
            "exports/investment_transactions.csv",
            &INVESTMENT_CSV.replace("03/10/2024,ACCOUNT_2", "03/10/2024,ACCOUNT_9"),
        );

        let mut ui = ScriptedInteraction::accepting_all(4);
        let err = import(&settings, &store, &mut ui).unwrap_err();

        assert!(matches!(err, ImportError::UnassignedRecords { ref tags, .. } if tags == "ACCOUNT_9"));
        // Earlier accounts in the run are already committed.
        assert_eq!(count(&settings, &store, "visa"), 2);
        assert_eq!(count(&settings, &store, "investment_1"), 0);
    }
}
