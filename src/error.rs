use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config directory not found at {0}. Run 'erpledger init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Not authorized. Check api_key/api_secret in config.toml")]
    Unauthorized,

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidArgument {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Fiscal year '{0}' not found")]
    FiscalYearNotFound(String),

    #[error("No fiscal years configured on the server. Create one from a reference year first.")]
    NoFiscalYears,

    #[error("Invoice '{0}' is not among the open invoices")]
    InvoiceNotFound(String),

    #[error("No open invoices belong to conciliation '{0}'")]
    ConciliationNotFound(String),

    #[error("Unknown voucher type '{0}'")]
    UnknownVoucherType(String),

    #[error("Aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
