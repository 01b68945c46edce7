mod settings;

pub use settings::{CompanySettings, Config, LedgerSettings, ServerSettings};

use crate::error::{LedgerError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.erpledger/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "erpledger") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = std::env::var_os("HOME").map(PathBuf::from).ok_or_else(|| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".erpledger"))
}

/// Load config.toml from the config directory
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(LedgerError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(LedgerError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })
}

/// Create the config directory and write the template
pub fn init_config_dir(config_dir: &Path) -> Result<PathBuf> {
    if config_dir.exists() {
        return Err(LedgerError::AlreadyInitialized(config_dir.to_path_buf()));
    }
    fs::create_dir_all(config_dir)?;
    let path = config_dir.join("config.toml");
    fs::write(&path, CONFIG_TEMPLATE)?;
    Ok(path)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[server]
base_url = "http://localhost:8000"
# Token credentials, sent as "Authorization: token <key>:<secret>".
# ERPLEDGER_API_KEY / ERPLEDGER_API_SECRET override these when set.
api_key = ""
api_secret = ""
timeout_secs = 15

[company]
# name = "Your Company S.A."     # optional
default_currency = "ARS"
currency_symbol = "$"

[ledger]
page_size = 12         # rows per ledger page
cache_ttl_secs = 300   # lifetime of cached catalogs (currencies, price lists, ...)
"#;
