//! Domain error types.

/// Whether an error stops only the current account or the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Account,
    Run,
}

/// Top-level error type for ledger-import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no {account} export found at {location}")]
    SourceNotFound { account: String, location: String },

    #[error("malformed export {location}: {reason}")]
    SourceFormat { location: String, reason: String },

    #[error("malformed rule file {file}: {reason}")]
    RuleFormat { file: String, reason: String },

    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("store query failed for {table}: {reason}")]
    StoreQuery { table: String, reason: String },

    #[error("constraint violation appending to {table}: {reason}")]
    ConstraintViolation { table: String, reason: String },

    #[error("{count} record(s) in {location} are not tied to any configured account: {tags}")]
    UnassignedRecords {
        location: String,
        count: usize,
        tags: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Account-scoped errors never abort sibling accounts.
    pub fn scope(&self) -> ErrorScope {
        match self {
            ImportError::SourceNotFound { .. }
            | ImportError::SourceFormat { .. }
            | ImportError::StoreQuery { .. }
            | ImportError::ConstraintViolation { .. } => ErrorScope::Account,
            ImportError::RuleFormat { .. }
            | ImportError::StoreUnavailable { .. }
            | ImportError::UnassignedRecords { .. }
            | ImportError::ConfigParse { .. }
            | ImportError::ConfigMissing { .. }
            | ImportError::ConfigInvalid { .. }
            | ImportError::Io(_) => ErrorScope::Run,
        }
    }

    pub fn is_account_scoped(&self) -> bool {
        self.scope() == ErrorScope::Account
    }
}

impl From<&ImportError> for std::process::ExitCode {
    fn from(err: &ImportError) -> Self {
        let code: u8 = match err {
            ImportError::Io(_) => 1,
            ImportError::ConfigParse { .. }
            | ImportError::ConfigMissing { .. }
            | ImportError::ConfigInvalid { .. } => 2,
            ImportError::StoreUnavailable { .. }
            | ImportError::StoreQuery { .. }
            | ImportError::ConstraintViolation { .. } => 3,
            ImportError::RuleFormat { .. } => 4,
            ImportError::SourceNotFound { .. } | ImportError::SourceFormat { .. } => 5,
            ImportError::UnassignedRecords { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
