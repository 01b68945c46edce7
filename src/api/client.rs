use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::cache::TtlCache;
use super::envelope::decode_envelope;
use super::{encode_component, with_query, ApiRequest, Transport};
use crate::accounts::{Account, TrialBalanceRow};
use crate::company::{Address, CompanyDetails, EmailAccount, PriceAutomation};
use crate::error::{LedgerError, Result};
use crate::events::{EventBus, ExchangeRateUpdate, LedgerEvent};
use crate::ledger::{FiscalYear, Movement};
use crate::payments::{ConciliationGroup, OpenInvoice, PartyType, PaymentPayload};
use crate::vouchers::VoucherKind;

const FISCAL_YEARS_KEY: &str = "fiscal-years";
const EXCHANGE_PREFIX: &str = "currency-exchange:";
const PRICE_AUTOMATION_KEY: &str = "price-automation";

/// Reference lists that rarely change and are served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    CustomerGroups,
    SupplierGroups,
    PriceLists,
    Currencies,
    CostCenters,
    ItemGroups,
    Warehouses,
}

impl Catalog {
    pub const ALL: [Catalog; 7] = [
        Catalog::CustomerGroups,
        Catalog::SupplierGroups,
        Catalog::PriceLists,
        Catalog::Currencies,
        Catalog::CostCenters,
        Catalog::ItemGroups,
        Catalog::Warehouses,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Catalog::CustomerGroups => "customer-groups",
            Catalog::SupplierGroups => "supplier-groups",
            Catalog::PriceLists => "price-lists",
            Catalog::Currencies => "currencies",
            Catalog::CostCenters => "cost-centers",
            Catalog::ItemGroups => "item-groups",
            Catalog::Warehouses => "warehouses",
        }
    }

    fn cache_key(self) -> String {
        format!("catalog:{}", self.slug())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Catalog {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| LedgerError::InvalidArgument {
                field: "catalog",
                value: s.to_string(),
                reason: format!(
                    "use one of: {}",
                    Self::ALL.map(Catalog::slug).join(", ")
                ),
            })
    }
}

/// The `status` flag of the general ledger endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementStatus {
    Confirmed,
    Draft,
    Cancelled,
}

impl MovementStatus {
    fn as_str(self) -> &'static str {
        match self {
            MovementStatus::Confirmed => "confirmed",
            MovementStatus::Draft => "draft",
            MovementStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for MovementStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "submitted" => Ok(MovementStatus::Confirmed),
            "draft" => Ok(MovementStatus::Draft),
            "cancelled" | "canceled" => Ok(MovementStatus::Cancelled),
            _ => Err(LedgerError::InvalidArgument {
                field: "status",
                value: s.to_string(),
                reason: "use confirmed, draft or cancelled".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneralLedgerFilter {
    pub account: String,
    pub include_cancelled: bool,
    pub status: Option<MovementStatus>,
}

impl GeneralLedgerFilter {
    pub fn for_account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            include_cancelled: false,
            status: None,
        }
    }

    fn path(&self) -> String {
        with_query(
            "/api/general-ledger",
            &[
                ("account", Some(self.account.clone())),
                ("include_cancelled", self.include_cancelled.then(|| "1".to_string())),
                ("status", self.status.map(|s| s.as_str().to_string())),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rate: f64,
    pub date: NaiveDate,
}

impl From<&ExchangeRateUpdate> for ExchangeRate {
    fn from(update: &ExchangeRateUpdate) -> Self {
        Self {
            from_currency: update.from_currency.clone(),
            to_currency: update.to_currency.clone(),
            exchange_rate: update.rate,
            date: update.date,
        }
    }
}

/// Typed access to the backend endpoints, with a cache for static data
pub struct ApiClient<T: Transport> {
    transport: T,
    cache: TtlCache<Value>,
    events: Option<Receiver<LedgerEvent>>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, cache_ttl: Duration) -> Self {
        Self {
            transport,
            cache: TtlCache::new(cache_ttl),
            events: None,
        }
    }

    /// Invalidate cached currency and price automation data whenever an exchange rate is published on `bus`
    pub fn watch(&mut self, bus: &EventBus) {
        self.events = Some(bus.subscribe());
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    fn apply_invalidations(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        for event in events.try_iter() {
            match event {
                LedgerEvent::ExchangeRateUpdated(update) => {
                    let dropped = self.cache.invalidate_prefix(EXCHANGE_PREFIX)
                        + usize::from(self.cache.invalidate(&Catalog::Currencies.cache_key()))
                        + usize::from(self.cache.invalidate(PRICE_AUTOMATION_KEY));
                    debug!(currency = %update.from_currency, dropped, "currency cache invalidated");
                }
            }
        }
    }

    fn request<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let response = self.transport.send(&request)?;
        decode_envelope(&request.path, &response)
    }

    fn cached<R: DeserializeOwned>(&mut self, key: &str, path: String) -> Result<R> {
        self.apply_invalidations();
        let value = match self.cache.get(key) {
            Some(value) => {
                debug!(key, "cache hit");
                value
            }
            None => {
                let value: Value = self.request(ApiRequest::get(path.clone()))?;
                self.cache.insert(key, value.clone());
                value
            }
        };
        serde_json::from_value(value).map_err(|e| LedgerError::Decode { path, source: e })
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.request(ApiRequest::get("/api/accounts"))
    }

    pub fn account(&self, name: &str) -> Result<Account> {
        self.request(ApiRequest::get(format!(
            "/api/accounts/{}",
            encode_component(name)
        )))
    }

    pub fn create_account(&self, account: &Account) -> Result<Account> {
        self.request(ApiRequest::post("/api/accounts", account)?)
    }

    pub fn delete_account(&self, name: &str) -> Result<()> {
        self.request::<Option<Value>>(ApiRequest::delete(format!(
            "/api/accounts/{}",
            encode_component(name)
        )))?;
        info!(account = name, "account deleted");
        Ok(())
    }

    pub fn general_ledger(&self, filter: &GeneralLedgerFilter) -> Result<Vec<Movement>> {
        self.request(ApiRequest::get(filter.path()))
    }

    pub fn trial_balance(&self, fiscal_year: &str) -> Result<Vec<TrialBalanceRow>> {
        self.request(ApiRequest::get(with_query(
            "/api/trial-balance",
            &[("fiscal_year", Some(fiscal_year.to_string()))],
        )))
    }

    pub fn fiscal_years(&mut self) -> Result<Vec<FiscalYear>> {
        self.cached(FISCAL_YEARS_KEY, "/api/fiscal-years".to_string())
    }

    pub fn create_fiscal_year(&mut self, year: &FiscalYear) -> Result<FiscalYear> {
        let created = self.request(ApiRequest::post("/api/fiscal-years", year)?)?;
        self.cache.invalidate(FISCAL_YEARS_KEY);
        Ok(created)
    }

    pub fn delete_fiscal_year(&mut self, name: &str) -> Result<()> {
        self.request::<Option<Value>>(ApiRequest::delete(format!(
            "/api/fiscal-years/{}",
            encode_component(name)
        )))?;
        self.cache.invalidate(FISCAL_YEARS_KEY);
        Ok(())
    }

    pub fn catalog(&mut self, catalog: Catalog) -> Result<Vec<Value>> {
        self.cached(&catalog.cache_key(), format!("/api/{}", catalog.slug()))
    }

    /// Create or replace the rate for `(from, to, date)`
    pub fn upsert_exchange_rate(&mut self, update: &ExchangeRateUpdate) -> Result<ExchangeRate> {
        let saved = self.request(ApiRequest::post(
            "/api/currency-exchange",
            &ExchangeRate::from(update),
        )?)?;
        self.cache.invalidate_prefix(EXCHANGE_PREFIX);
        Ok(saved)
    }

    pub fn latest_exchange_rate(&mut self, from: &str, to: &str) -> Result<Option<ExchangeRate>> {
        let key = format!("{}latest:{}:{}", EXCHANGE_PREFIX, from, to);
        let path = with_query(
            "/api/currency-exchange/latest",
            &[("from", Some(from.to_string())), ("to", Some(to.to_string()))],
        );
        self.cached(&key, path)
    }

    pub fn exchange_rate_history(&mut self, from: &str, to: &str) -> Result<Vec<ExchangeRate>> {
        let key = format!("{}history:{}:{}", EXCHANGE_PREFIX, from, to);
        let path = with_query(
            "/api/currency-exchange/history",
            &[("from", Some(from.to_string())), ("to", Some(to.to_string()))],
        );
        self.cached(&key, path)
    }

    pub fn outstanding_invoices(&self, party_type: PartyType, party: &str) -> Result<Vec<OpenInvoice>> {
        self.request(ApiRequest::get(with_query(
            "/api/pagos/outstanding",
            &[
                ("party_type", Some(party_type.as_str().to_string())),
                ("party", Some(party.to_string())),
            ],
        )))
    }

    pub fn conciliation_groups(
        &self,
        party_type: PartyType,
        party: &str,
    ) -> Result<Vec<ConciliationGroup>> {
        self.request(ApiRequest::get(with_query(
            "/api/pagos/conciliations",
            &[
                ("party_type", Some(party_type.as_str().to_string())),
                ("party", Some(party.to_string())),
            ],
        )))
    }

    /// Returns the created document as the server echoes it
    pub fn create_payment(&self, payload: &PaymentPayload) -> Result<Value> {
        let created: Value = self.request(ApiRequest::post("/api/pagos", payload)?)?;
        info!(party = %payload.party, invoices = payload.invoices.len(), "payment created");
        Ok(created)
    }

    pub fn update_payment(&self, name: &str, payload: &PaymentPayload) -> Result<Value> {
        self.request(ApiRequest::put(
            format!("/api/pagos/{}", encode_component(name)),
            payload,
        )?)
    }

    pub fn delete_payment(&self, name: &str) -> Result<()> {
        self.request::<Option<Value>>(ApiRequest::delete(format!(
            "/api/pagos/{}",
            encode_component(name)
        )))?;
        info!(payment = name, "payment deleted");
        Ok(())
    }

    pub fn company(&self, name: &str) -> Result<CompanyDetails> {
        self.request(ApiRequest::get(format!(
            "/api/companies/{}",
            encode_component(name)
        )))
    }

    pub fn company_addresses(&self, company: &str) -> Result<Vec<Address>> {
        self.request(ApiRequest::get(format!(
            "/api/companies/{}/addresses",
            encode_component(company)
        )))
    }

    pub fn email_accounts(&self) -> Result<Vec<EmailAccount>> {
        self.request(ApiRequest::get("/api/email-accounts"))
    }

    pub fn create_email_account(&self, account: &EmailAccount) -> Result<EmailAccount> {
        account.validate()?;
        self.request(ApiRequest::post("/api/email-accounts", account)?)
    }

    pub fn update_email_account(&self, name: &str, account: &EmailAccount) -> Result<EmailAccount> {
        account.validate()?;
        self.request(ApiRequest::put(
            format!("/api/email-accounts/{}", encode_component(name)),
            account,
        )?)
    }

    pub fn delete_email_account(&self, name: &str) -> Result<()> {
        self.request::<Option<Value>>(ApiRequest::delete(format!(
            "/api/email-accounts/{}",
            encode_component(name)
        )))?;
        info!(email_account = name, "email account deleted");
        Ok(())
    }

    pub fn price_automation(&mut self) -> Result<PriceAutomation> {
        self.cached(PRICE_AUTOMATION_KEY, "/api/price-automation".to_string())
    }

    /// Nothing is sent when the settings do not validate
    pub fn save_price_automation(&mut self, settings: &PriceAutomation) -> Result<PriceAutomation> {
        settings.validate()?;
        let saved = self.request(ApiRequest::put("/api/price-automation", settings)?)?;
        self.cache.invalidate(PRICE_AUTOMATION_KEY);
        Ok(saved)
    }

    pub fn voucher_detail(&self, kind: VoucherKind, name: &str) -> Result<Value> {
        self.request(ApiRequest::get(kind.detail_path(name)))
    }
}
