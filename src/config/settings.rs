use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerSettings,
    #[serde(default)]
    pub company: CompanySettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CompanySettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LedgerSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Seconds a static catalog (currencies, price lists, ...) stays cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl ServerSettings {
    /// Credentials with `ERPLEDGER_API_KEY`/`ERPLEDGER_API_SECRET` taking precedence
    pub fn credentials(&self) -> Option<(String, String)> {
        let key = std::env::var("ERPLEDGER_API_KEY")
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.is_empty())?;
        let secret = std::env::var("ERPLEDGER_API_SECRET")
            .ok()
            .or_else(|| self.api_secret.clone())
            .filter(|s| !s.is_empty())?;
        Some((key, secret))
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_currency() -> String {
    "ARS".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_page_size() -> usize {
    12
}

fn default_cache_ttl() -> u64 {
    300
}
