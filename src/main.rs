use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use erpledger::accounts::{balances_by_account, build_account_tree, flatten_tree, Account, AccountBalance};
use erpledger::api::{ApiClient, Catalog, GeneralLedgerFilter, HttpTransport, MovementStatus};
use erpledger::config::{config_dir, init_config_dir, load_config, Config};
use erpledger::error::{LedgerError, Result};
use erpledger::events::{EventBus, ExchangeRateUpdate, LedgerEvent};
use erpledger::format::format_money;
use erpledger::ledger::{
    BalanceMode, FiscalYear, LedgerQuery, LedgerView, Movement, SortDirection, SortField,
};
use erpledger::payments::{AllocationSession, OpenInvoice, PartyType, Withholding};
use erpledger::vouchers::VoucherKind;

#[derive(Parser)]
#[command(name = "erpledger")]
#[command(
    version,
    about = "Ledger, reconciliation and payment allocation client for ERPNext-style backends",
    long_about = None
)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.erpledger)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log requests and engine decisions to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show configuration in use
    Status,

    /// Show the chart of accounts as a tree
    Accounts {
        /// Read account records from a JSON file instead of the server
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Show debit, credit and balance per account for a fiscal year
    TrialBalance {
        /// Fiscal year name (default: latest)
        #[arg(long)]
        fiscal_year: Option<String>,
    },

    /// Show the movements of an account with running balances
    Ledger {
        /// Account name (required unless --snapshot is given)
        account: Option<String>,

        /// Read movements from a JSON file instead of the server
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Restrict to a fiscal year by name (default: latest, unless --audit)
        #[arg(long, conflicts_with = "period")]
        fiscal_year: Option<String>,

        /// Restrict to an explicit range, e.g. 2024-01-01..2024-12-31
        #[arg(long, value_name = "START..END")]
        period: Option<String>,

        /// Case-insensitive text filter
        #[arg(short, long)]
        search: Option<String>,

        /// Sort field: posting_date, movement_type, debit, credit
        #[arg(long, default_value = "posting_date")]
        sort: String,

        /// Sort ascending (default: descending)
        #[arg(long)]
        asc: bool,

        /// Page number (1-based, clamped into range)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Audit view: drafts and cancelled movements count toward the balance,
        /// no date restriction unless one is given
        #[arg(long)]
        audit: bool,

        /// Ask the server for one status only: confirmed, draft or cancelled
        #[arg(long, conflicts_with = "snapshot")]
        status: Option<String>,
    },

    /// Show company details and addresses
    Company {
        /// Company name (default: [company] name in config.toml)
        name: Option<String>,
    },

    /// Manage fiscal years
    FiscalYears {
        #[command(subcommand)]
        action: FiscalYearCommand,
    },

    /// List a reference catalog (currencies, price-lists, warehouses, ...)
    Catalog {
        /// One of: customer-groups, supplier-groups, price-lists, currencies,
        /// cost-centers, item-groups, warehouses
        kind: String,
    },

    /// Read and write currency exchange rates
    Rates {
        #[command(subcommand)]
        action: RateCommand,
    },

    /// Draft, allocate and submit customer or supplier payments
    Payment {
        #[command(subcommand)]
        action: PaymentCommand,
    },

    /// Show a voucher by doctype and name (e.g. "Sales Invoice" ACC-SINV-0001)
    Voucher { doctype: String, name: String },
}

#[derive(Subcommand)]
enum FiscalYearCommand {
    /// List fiscal years
    List,

    /// Create the year following a reference year
    Create {
        /// Reference fiscal year (default: latest)
        #[arg(long)]
        from: Option<String>,
    },

    /// Delete a fiscal year
    Delete {
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum RateCommand {
    /// Store a rate and notify listeners
    Set {
        /// Currency being priced, e.g. USD
        from: String,

        /// Rate in the target currency
        rate: f64,

        /// Target currency (default: company currency)
        #[arg(long)]
        to: Option<String>,

        /// Rate date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show the latest stored rate
    Latest {
        from: String,
        #[arg(long)]
        to: Option<String>,
    },

    /// Show stored rates over time
    History {
        from: String,
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
enum PaymentCommand {
    /// Allocate a payment over open invoices (preview, or --submit to save)
    Allocate {
        /// customer or supplier
        #[arg(long)]
        party_type: String,

        /// Customer or supplier name
        #[arg(long)]
        party: String,

        /// Read open invoices from a JSON file instead of the server
        #[arg(long)]
        invoices: Option<PathBuf>,

        /// Invoice to settle in full (can be repeated; order is allocation order)
        #[arg(short, long, value_name = "INVOICE")]
        select: Vec<String>,

        /// Settle every invoice of an existing conciliation batch
        #[arg(long, value_name = "CONCILIATION_ID")]
        group: Option<String>,

        /// Partial amount for an invoice (can be repeated)
        #[arg(long, value_name = "INVOICE=AMOUNT")]
        apply: Vec<String>,

        /// Payment line (can be repeated)
        #[arg(short, long, value_name = "ACCOUNT:AMOUNT[:YYYY-MM-DD]")]
        method: Vec<String>,

        /// Tax withheld (can be repeated)
        #[arg(short, long, value_name = "TAX:AMOUNT")]
        withholding: Vec<String>,

        /// Posting date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Send the payment to the server
        #[arg(long)]
        submit: bool,
    },

    /// Delete a payment
    Delete {
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "erpledger=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    debug!(config_dir = %cfg_dir.display(), "using config directory");

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Accounts { snapshot } => cmd_accounts(&cfg_dir, snapshot),
        Commands::TrialBalance { fiscal_year } => cmd_trial_balance(&cfg_dir, fiscal_year),
        Commands::Ledger {
            account,
            snapshot,
            fiscal_year,
            period,
            search,
            sort,
            asc,
            page,
            audit,
            status,
        } => cmd_ledger(
            &cfg_dir,
            LedgerArgs {
                account,
                snapshot,
                fiscal_year,
                period,
                search,
                sort,
                asc,
                page,
                audit,
                status,
            },
        ),
        Commands::Company { name } => cmd_company(&cfg_dir, name),
        Commands::FiscalYears { action } => cmd_fiscal_years(&cfg_dir, action),
        Commands::Catalog { kind } => cmd_catalog(&cfg_dir, &kind),
        Commands::Rates { action } => cmd_rates(&cfg_dir, action),
        Commands::Payment { action } => match action {
            PaymentCommand::Allocate {
                party_type,
                party,
                invoices,
                select,
                group,
                apply,
                method,
                withholding,
                date,
                submit,
            } => cmd_allocate(
                &cfg_dir,
                AllocateArgs {
                    party_type,
                    party,
                    invoices,
                    select,
                    group,
                    apply,
                    method,
                    withholding,
                    date,
                    submit,
                },
            ),
            PaymentCommand::Delete { name, yes } => cmd_delete_payment(&cfg_dir, &name, yes),
        },
        Commands::Voucher { doctype, name } => cmd_voucher(&cfg_dir, &doctype, &name),
    }
}

fn connect(cfg_dir: &Path) -> Result<(Config, ApiClient<HttpTransport>)> {
    let config = load_config(cfg_dir)?;
    let transport = HttpTransport::new(&config.server);
    let client = ApiClient::new(transport, Duration::from_secs(config.ledger.cache_ttl_secs));
    Ok((config, client))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile<T> {
    Bare(T),
    Envelope { data: T },
}

/// Read a JSON export, either the bare `data` or the whole `{success, data}` reply
fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let file: SnapshotFile<T> =
        serde_json::from_str(&content).map_err(|e| LedgerError::Snapshot {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(match file {
        SnapshotFile::Bare(data) | SnapshotFile::Envelope { data } => data,
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| LedgerError::InvalidArgument {
        field,
        value: value.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

fn parse_amount(field: &'static str, value: &str) -> Result<f64> {
    let amount: f64 = value.trim().parse().map_err(|_| LedgerError::InvalidArgument {
        field,
        value: value.to_string(),
        reason: "must be a number".to_string(),
    })?;
    if !amount.is_finite() {
        return Err(LedgerError::InvalidArgument {
            field,
            value: value.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(amount)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Ask on stderr and read a y/N answer from stdin
fn confirm(prompt: &str, assume_yes: bool) -> Result<()> {
    if assume_yes {
        return Ok(());
    }
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "s" | "si" => Ok(()),
        _ => Err(LedgerError::Aborted),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    let path = init_config_dir(cfg_dir)?;

    println!("Initialized erpledger config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Point it at your server:  $EDITOR {}", path.display());
    println!("  2. Add api_key/api_secret, or export ERPLEDGER_API_KEY and ERPLEDGER_API_SECRET");
    println!();
    println!("Then look at your chart of accounts:");
    println!("  erpledger accounts");

    Ok(())
}

fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let config = load_config(cfg_dir)?;

    println!("erpledger Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Server:           {}", config.server.base_url);
    println!(
        "Credentials:      {}",
        if config.server.credentials().is_some() {
            "configured"
        } else {
            "missing"
        }
    );
    if let Some(name) = &config.company.name {
        println!("Company:          {}", name);
    }
    println!(
        "Currency:         {} ({})",
        config.company.default_currency, config.company.currency_symbol
    );
    println!("Ledger page size: {}", config.ledger.page_size);
    println!("Cache TTL:        {}s", config.ledger.cache_ttl_secs);

    Ok(())
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "ACCOUNT")]
    account: String,
    #[tabled(rename = "TYPE")]
    account_type: String,
    #[tabled(rename = "GROUP")]
    group: String,
}

fn indented(account: &Account, level: usize) -> String {
    format!("{}{}", "  ".repeat(level), account.display_name())
}

fn cmd_accounts(cfg_dir: &Path, snapshot: Option<PathBuf>) -> Result<()> {
    let accounts: Vec<Account> = match snapshot {
        Some(path) => {
            load_config(cfg_dir)?;
            read_snapshot(&path)?
        }
        None => connect(cfg_dir)?.1.accounts()?,
    };

    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    let forest = build_account_tree(&accounts);
    let nodes = flatten_tree(&forest);
    let rows: Vec<AccountRow> = nodes
        .iter()
        .map(|node| AccountRow {
            number: node.account.account_number.clone().unwrap_or_default(),
            account: indented(&node.account, node.level),
            account_type: node
                .account
                .account_type
                .clone()
                .or_else(|| node.account.root_type.clone())
                .unwrap_or_default(),
            group: if node.account.is_group { "yes" } else { "" }.to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} accounts in {} root(s)", nodes.len(), forest.len());

    Ok(())
}

#[derive(Tabled)]
struct TrialBalanceRow {
    #[tabled(rename = "ACCOUNT")]
    account: String,
    #[tabled(rename = "DEBIT")]
    debit: String,
    #[tabled(rename = "CREDIT")]
    credit: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

fn resolve_fiscal_year(
    client: &mut ApiClient<HttpTransport>,
    name: Option<&str>,
) -> Result<FiscalYear> {
    let years = client.fiscal_years()?;
    match name {
        Some(name) => FiscalYear::find(&years, name).cloned(),
        None => FiscalYear::latest(&years)
            .cloned()
            .ok_or(LedgerError::NoFiscalYears),
    }
}

fn cmd_trial_balance(cfg_dir: &Path, fiscal_year: Option<String>) -> Result<()> {
    let (config, mut client) = connect(cfg_dir)?;
    let year = resolve_fiscal_year(&mut client, fiscal_year.as_deref())?;
    let accounts = client.accounts()?;
    let balances = balances_by_account(&client.trial_balance(&year.name)?);

    let forest = build_account_tree(&accounts);
    let symbol = &config.company.currency_symbol;
    let rows: Vec<TrialBalanceRow> = flatten_tree(&forest)
        .into_iter()
        .map(|node| {
            let totals = node.totals(&balances);
            TrialBalanceRow {
                account: indented(&node.account, node.level),
                debit: format_money(totals.debit, symbol),
                credit: format_money(totals.credit, symbol),
                balance: format_money(totals.balance, symbol),
            }
        })
        .collect();

    let mut grand = AccountBalance::default();
    for root in &forest {
        grand += root.totals(&balances);
    }

    println!(
        "Trial balance {} ({} to {})",
        year.name, year.year_start_date, year.year_end_date
    );
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!(
        "Total debit {}  credit {}  balance {}",
        format_money(grand.debit, symbol),
        format_money(grand.credit, symbol),
        format_money(grand.balance, symbol)
    );

    Ok(())
}

struct LedgerArgs {
    account: Option<String>,
    snapshot: Option<PathBuf>,
    fiscal_year: Option<String>,
    period: Option<String>,
    search: Option<String>,
    sort: String,
    asc: bool,
    page: usize,
    audit: bool,
    status: Option<String>,
}

/// `2024-01-01..2024-12-31` as an ad-hoc fiscal year
fn parse_period(value: &str) -> Result<FiscalYear> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| LedgerError::InvalidArgument {
            field: "period",
            value: value.to_string(),
            reason: "expected START..END".to_string(),
        })?;
    let year_start_date = parse_date("period start", start)?;
    let year_end_date = parse_date("period end", end)?;
    if year_end_date < year_start_date {
        return Err(LedgerError::InvalidArgument {
            field: "period",
            value: value.to_string(),
            reason: "end is before start".to_string(),
        });
    }
    Ok(FiscalYear {
        name: value.to_string(),
        year_start_date,
        year_end_date,
    })
}

#[derive(Tabled)]
struct MovementRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "TYPE")]
    voucher_type: String,
    #[tabled(rename = "VOUCHER")]
    voucher: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "DEBIT")]
    debit: String,
    #[tabled(rename = "CREDIT")]
    credit: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

fn cmd_ledger(cfg_dir: &Path, args: LedgerArgs) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let sort: SortField = args.sort.parse()?;
    let status: Option<MovementStatus> = args
        .status
        .as_deref()
        .map(str::parse::<MovementStatus>)
        .transpose()?;
    let explicit_scope = match &args.period {
        Some(period) => Some(parse_period(period)?),
        None => None,
    };

    let (movements, scope): (Vec<Movement>, Option<FiscalYear>) = match &args.snapshot {
        Some(_) if args.fiscal_year.is_some() => {
            return Err(LedgerError::Validation(
                "Fiscal years are looked up on the server; use --period with --snapshot".to_string(),
            ));
        }
        Some(path) => (read_snapshot(path)?, explicit_scope),
        None => {
            let account = args.account.clone().ok_or_else(|| {
                LedgerError::Validation("An account is required unless --snapshot is given".to_string())
            })?;
            let (_, mut client) = connect(cfg_dir)?;
            let scope = match (explicit_scope, args.fiscal_year.as_deref()) {
                (Some(period), _) => Some(period),
                (None, Some(name)) => Some(resolve_fiscal_year(&mut client, Some(name))?),
                (None, None) if args.audit => None,
                (None, None) => Some(resolve_fiscal_year(&mut client, None)?),
            };
            let mut filter = GeneralLedgerFilter::for_account(account);
            filter.include_cancelled = args.audit || status == Some(MovementStatus::Cancelled);
            filter.status = status;
            (client.general_ledger(&filter)?, scope)
        }
    };

    let query = LedgerQuery {
        fiscal_year: scope,
        search: args.search,
        sort,
        direction: if args.asc {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        },
        page: args.page,
        page_size: config.ledger.page_size,
        balance_mode: if args.audit {
            BalanceMode::Audit
        } else {
            BalanceMode::ConfirmedOnly
        },
    };
    let view = LedgerView::build(&movements, &query);

    if view.total_rows == 0 {
        println!("No movements found.");
        return Ok(());
    }

    let symbol = &config.company.currency_symbol;
    let rows: Vec<MovementRow> = view
        .rows
        .iter()
        .map(|row| {
            let m = &row.movement;
            let marker = if row.counted { "" } else { " *" };
            MovementRow {
                date: m.posting_date.clone().unwrap_or_default(),
                voucher_type: m
                    .kind()
                    .map(|k| k.doctype().to_string())
                    .or_else(|| m.voucher_type.clone())
                    .unwrap_or_default(),
                voucher: m.voucher_no.clone().unwrap_or_else(|| m.name.clone()),
                description: format!(
                    "{}{}",
                    m.title.clone().or_else(|| m.remarks.clone()).unwrap_or_default(),
                    marker
                ),
                debit: format_money(m.debit, symbol),
                credit: format_money(m.credit, symbol),
                balance: format_money(row.running_balance, symbol),
            }
        })
        .collect();

    if let Some(year) = &query.fiscal_year {
        println!(
            "Period: {} ({} to {})",
            year.name, year.year_start_date, year.year_end_date
        );
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!(
        "Page {}/{} ({} movements)",
        view.page, view.total_pages, view.total_rows
    );
    println!(
        "Opening: {}  Closing: {}  Balance: {}",
        format_money(view.opening_balance, symbol),
        format_money(view.closing_balance, symbol),
        format_money(view.final_balance, symbol)
    );
    if view.rows.iter().any(|r| !r.counted) {
        println!("* draft or cancelled, not included in the balance (use --audit to include)");
    }

    Ok(())
}

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "TYPE")]
    address_type: String,
    #[tabled(rename = "ADDRESS")]
    address: String,
    #[tabled(rename = "CITY")]
    city: String,
    #[tabled(rename = "")]
    primary: String,
}

fn cmd_company(cfg_dir: &Path, name: Option<String>) -> Result<()> {
    let (config, client) = connect(cfg_dir)?;
    let name = name.or(config.company.name).ok_or_else(|| {
        LedgerError::Validation(
            "No company given; pass a name or set [company] name in config.toml".to_string(),
        )
    })?;

    let company = client.company(&name)?;
    println!("{}", company.company_name.as_deref().unwrap_or(&company.name));
    println!("{}", "-".repeat(50));
    if let Some(abbr) = &company.abbr {
        println!("Abbreviation: {}", abbr);
    }
    if let Some(tax_id) = &company.tax_id {
        println!("Tax id:       {}", tax_id);
    }
    if let Some(currency) = &company.default_currency {
        println!("Currency:     {}", currency);
    }
    if let Some(country) = &company.country {
        println!("Country:      {}", country);
    }

    let addresses = client.company_addresses(&company.name)?;
    println!();
    if addresses.is_empty() {
        println!("No addresses registered.");
        return Ok(());
    }
    let rows: Vec<AddressRow> = addresses
        .iter()
        .map(|a| AddressRow {
            address_type: a.address_type.clone().unwrap_or_default(),
            address: match &a.address_line2 {
                Some(line2) => format!("{}, {}", a.address_line1, line2),
                None => a.address_line1.clone(),
            },
            city: a.city.clone(),
            primary: if a.is_primary_address { "primary" } else { "" }.to_string(),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

#[derive(Tabled)]
struct FiscalYearRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "START")]
    start: String,
    #[tabled(rename = "END")]
    end: String,
    #[tabled(rename = "")]
    latest: String,
}

fn cmd_fiscal_years(cfg_dir: &Path, action: FiscalYearCommand) -> Result<()> {
    let (_, mut client) = connect(cfg_dir)?;

    match action {
        FiscalYearCommand::List => {
            let mut years = client.fiscal_years()?;
            if years.is_empty() {
                println!("No fiscal years configured.");
                return Ok(());
            }
            let latest = FiscalYear::latest(&years).map(|y| y.name.clone());
            years.sort_by_key(|y| std::cmp::Reverse(y.year_end_date));
            let rows: Vec<FiscalYearRow> = years
                .iter()
                .map(|y| FiscalYearRow {
                    name: y.name.clone(),
                    start: y.year_start_date.to_string(),
                    end: y.year_end_date.to_string(),
                    latest: if latest.as_deref() == Some(y.name.as_str()) {
                        "latest"
                    } else {
                        ""
                    }
                    .to_string(),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
        FiscalYearCommand::Create { from } => {
            let years = client.fiscal_years()?;
            let reference = match from.as_deref() {
                Some(name) => FiscalYear::find(&years, name)?,
                None => FiscalYear::latest(&years).ok_or(LedgerError::NoFiscalYears)?,
            };
            let next = reference.following()?;
            if years.iter().any(|y| y.name == next.name) {
                return Err(LedgerError::Validation(format!(
                    "Fiscal year '{}' already exists",
                    next.name
                )));
            }
            let created = client.create_fiscal_year(&next)?;
            println!(
                "Created fiscal year {} ({} to {})",
                created.name, created.year_start_date, created.year_end_date
            );
        }
        FiscalYearCommand::Delete { name, yes } => {
            confirm(&format!("Delete fiscal year '{name}'?"), yes)?;
            client.delete_fiscal_year(&name)?;
            println!("Deleted fiscal year {name}");
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "NAME")]
    name: String,
}

fn cmd_catalog(cfg_dir: &Path, kind: &str) -> Result<()> {
    let catalog: Catalog = kind.parse()?;
    let (_, mut client) = connect(cfg_dir)?;
    let entries = client.catalog(catalog)?;

    if entries.is_empty() {
        println!("No {catalog} found.");
        return Ok(());
    }

    let rows: Vec<CatalogRow> = entries
        .iter()
        .map(|entry| CatalogRow {
            name: entry
                .get("name")
                .and_then(|v| v.as_str())
                .or_else(|| entry.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

#[derive(Tabled)]
struct RateRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "FROM")]
    from: String,
    #[tabled(rename = "TO")]
    to: String,
    #[tabled(rename = "RATE")]
    rate: String,
}

fn cmd_rates(cfg_dir: &Path, action: RateCommand) -> Result<()> {
    let (config, mut client) = connect(cfg_dir)?;
    let default_to = config.company.default_currency.clone();

    match action {
        RateCommand::Set {
            from,
            rate,
            to,
            date,
        } => {
            if !(rate > 0.0) || !rate.is_finite() {
                return Err(LedgerError::Validation(
                    "The exchange rate must be greater than zero".to_string(),
                ));
            }
            let date = match date {
                Some(d) => parse_date("date", &d)?,
                None => today(),
            };
            let update = ExchangeRateUpdate {
                from_currency: from.to_uppercase(),
                to_currency: to.unwrap_or(default_to).to_uppercase(),
                rate,
                date,
            };

            let bus = EventBus::new();
            client.watch(&bus);
            client.upsert_exchange_rate(&update)?;
            bus.publish(LedgerEvent::ExchangeRateUpdated(update.clone()));

            println!(
                "Saved 1 {} = {:.4} {} ({})",
                update.from_currency, update.rate, update.to_currency, update.date
            );
            if let Some(latest) =
                client.latest_exchange_rate(&update.from_currency, &update.to_currency)?
            {
                println!(
                    "Latest on server: {:.4} ({})",
                    latest.exchange_rate, latest.date
                );
            }
        }
        RateCommand::Latest { from, to } => {
            let to = to.unwrap_or(default_to).to_uppercase();
            let from = from.to_uppercase();
            match client.latest_exchange_rate(&from, &to)? {
                Some(rate) => println!(
                    "1 {} = {:.4} {} ({})",
                    rate.from_currency, rate.exchange_rate, rate.to_currency, rate.date
                ),
                None => println!("No rate stored for {from} to {to}."),
            }
        }
        RateCommand::History { from, to } => {
            let to = to.unwrap_or(default_to).to_uppercase();
            let from = from.to_uppercase();
            let history = client.exchange_rate_history(&from, &to)?;
            if history.is_empty() {
                println!("No rates stored for {from} to {to}.");
                return Ok(());
            }
            let rows: Vec<RateRow> = history
                .iter()
                .map(|r| RateRow {
                    date: r.date.to_string(),
                    from: r.from_currency.clone(),
                    to: r.to_currency.clone(),
                    rate: format!("{:.4}", r.exchange_rate),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
    }

    Ok(())
}

struct AllocateArgs {
    party_type: String,
    party: String,
    invoices: Option<PathBuf>,
    select: Vec<String>,
    group: Option<String>,
    apply: Vec<String>,
    method: Vec<String>,
    withholding: Vec<String>,
    date: Option<String>,
    submit: bool,
}

/// `ACCOUNT:AMOUNT[:YYYY-MM-DD]`; the account itself may contain colons
fn parse_method(input: &str, default_date: NaiveDate) -> Result<(String, f64, NaiveDate)> {
    let invalid = || LedgerError::InvalidArgument {
        field: "payment method",
        value: input.to_string(),
        reason: "expected ACCOUNT:AMOUNT[:YYYY-MM-DD]".to_string(),
    };

    let mut parts: Vec<&str> = input.split(':').collect();
    let trailing_date = match parts.last().copied() {
        Some(last) if parts.len() >= 3 => NaiveDate::parse_from_str(last, "%Y-%m-%d").ok(),
        _ => None,
    };
    let date = match trailing_date {
        Some(date) => {
            parts.pop();
            date
        }
        None => default_date,
    };
    let amount_str = parts.pop().ok_or_else(invalid)?;
    let account = parts.join(":");
    if account.trim().is_empty() {
        return Err(invalid());
    }
    let amount = parse_amount("payment amount", amount_str)?;
    Ok((account, amount, date))
}

/// `TAX:AMOUNT`
fn parse_withholding(input: &str) -> Result<Withholding> {
    let (tax_type, amount) = input
        .rsplit_once(':')
        .ok_or_else(|| LedgerError::InvalidArgument {
            field: "withholding",
            value: input.to_string(),
            reason: "expected TAX:AMOUNT".to_string(),
        })?;
    Ok(Withholding {
        tax_type: tax_type.trim().to_string(),
        amount: parse_amount("withholding amount", amount)?,
        certificate_number: None,
    })
}

/// `INVOICE=AMOUNT`
fn parse_apply(input: &str) -> Result<(String, f64)> {
    let (name, amount) = input
        .rsplit_once('=')
        .ok_or_else(|| LedgerError::InvalidArgument {
            field: "applied amount",
            value: input.to_string(),
            reason: "expected INVOICE=AMOUNT".to_string(),
        })?;
    Ok((name.trim().to_string(), parse_amount("applied amount", amount)?))
}

#[derive(Tabled)]
struct AllocationRow {
    #[tabled(rename = "INVOICE")]
    invoice: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "OUTSTANDING")]
    outstanding: String,
    #[tabled(rename = "REQUESTED")]
    requested: String,
    #[tabled(rename = "APPLIED")]
    applied: String,
    #[tabled(rename = "REMAINING")]
    remaining: String,
}

fn cmd_allocate(cfg_dir: &Path, args: AllocateArgs) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let party_type: PartyType = args.party_type.parse()?;
    let posting_date = match &args.date {
        Some(d) => parse_date("date", d)?,
        None => today(),
    };

    let mut client = None;
    let (invoices, groups) = match &args.invoices {
        Some(path) => (read_snapshot::<Vec<OpenInvoice>>(path)?, Vec::new()),
        None => {
            let (_, c) = connect(cfg_dir)?;
            let invoices = c.outstanding_invoices(party_type, &args.party)?;
            let groups = c.conciliation_groups(party_type, &args.party)?;
            client = Some(c);
            (invoices, groups)
        }
    };

    let mut session = AllocationSession::new(party_type, args.party.clone(), invoices)
        .with_groups(groups)
        .with_today(posting_date);

    if let Some(group) = &args.group {
        session.select_group(group)?;
    }
    for name in &args.select {
        session.select_invoice(name)?;
    }
    for input in &args.apply {
        let (name, amount) = parse_apply(input)?;
        let stored = session.set_applied_amount(&name, amount)?;
        if (stored - amount).abs() > f64::EPSILON {
            eprintln!("Note: amount for {name} limited to {stored:.2}");
        }
    }
    for input in &args.method {
        let (account, amount, date) = parse_method(input, posting_date)?;
        session.add_payment_method(account, date, amount);
    }
    for input in &args.withholding {
        session.add_withholding(parse_withholding(input)?);
    }

    let symbol = &config.company.currency_symbol;
    let allocations = session.final_allocations();
    if allocations.is_empty() {
        println!("No invoices selected for {} {}.", party_type, args.party);
    } else {
        let rows: Vec<AllocationRow> = allocations
            .iter()
            .map(|a| {
                let invoice = session.invoices().iter().find(|i| i.name == a.name);
                let requested = session
                    .selection(&a.name)
                    .map(|s| s.saldo_aplicado)
                    .unwrap_or(0.0);
                AllocationRow {
                    invoice: a.name.clone(),
                    date: invoice
                        .and_then(|i| i.posting_date.clone())
                        .unwrap_or_default(),
                    outstanding: format_money(a.saldo_anterior, symbol),
                    requested: format_money(requested, symbol),
                    applied: format_money(a.saldo_aplicado, symbol),
                    remaining: format_money(a.saldo, symbol),
                }
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    let applied: f64 = allocations.iter().map(|a| a.saldo_aplicado).sum();
    println!();
    println!(
        "Payment methods: {}",
        format_money(session.total_payment_methods(), symbol)
    );
    println!(
        "Withholdings:    {}",
        format_money(session.total_withholdings(), symbol)
    );
    println!("Applied:         {}", format_money(applied, symbol));
    println!(
        "Unallocated:     {}",
        format_money((session.budget() - applied).max(0.0), symbol)
    );
    if let (Some(id), Some(source)) = (session.conciliation().id(), session.conciliation().source()) {
        println!("Conciliation:    {} ({})", id, source);
        println!(
            "Net to reconcile: {}",
            format_money(session.net_conciliation_amount(), symbol)
        );
    }

    if !args.submit {
        return Ok(());
    }

    let payload = session.build_payload(posting_date)?;
    let client = match client {
        Some(c) => c,
        None => connect(cfg_dir)?.1,
    };
    let created = client.create_payment(&payload)?;
    let name = created
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("(unnamed)");
    println!();
    println!("Created payment {}", name);

    Ok(())
}

fn cmd_delete_payment(cfg_dir: &Path, name: &str, yes: bool) -> Result<()> {
    let (_, client) = connect(cfg_dir)?;
    confirm(&format!("Delete payment '{name}'?"), yes)?;
    client.delete_payment(name)?;
    println!("Deleted payment {name}");
    Ok(())
}

fn cmd_voucher(cfg_dir: &Path, doctype: &str, name: &str) -> Result<()> {
    let kind: VoucherKind = doctype.parse()?;
    let (_, client) = connect(cfg_dir)?;
    let detail = client.voucher_detail(kind, name)?;
    let pretty = serde_json::to_string_pretty(&detail).map_err(|e| LedgerError::Decode {
        path: kind.detail_path(name),
        source: e,
    })?;
    println!("{kind} {name}");
    println!("{pretty}");
    Ok(())
}
