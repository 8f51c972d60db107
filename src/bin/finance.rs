//! Command-line front end for the finance tracker.
//!
//! Reads `FINANCE_BACKEND_URL` and `FINANCE_SESSION_TOKEN` (and the AI
//! provider keys for `voice`) from the environment or a `.env` file.

use std::io::{self, BufRead as _, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use finance_ai::auth::AuthStore;
use finance_ai::backend::Backend as _;
use finance_ai::client::FinanceClient;
use finance_ai::models::{
    Account, AccountId, AccountType, Category, CategoryId, CategoryType, CreateAccount,
    CreateCategory, CreateTransaction, DeleteAccount, DeleteCategory, DeleteTransaction,
    PaymentMethod, Subscription, Transaction, TransactionId, TransactionType,
};
use finance_ai::reports::{self, Month};
use finance_ai::storage::FileStorage;
use finance_ai::store::{FinanceSnapshot, FinanceStore};
use finance_ai::voice::{
    PlaceholderPolicy, Provider, ProviderKind, TransactionPreview, VoiceCapture, interpret,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Backend base URL variable.
const BACKEND_URL_ENV: &str = "FINANCE_BACKEND_URL";
/// Session cookie variable.
const SESSION_TOKEN_ENV: &str = "FINANCE_SESSION_TOKEN";
/// Provider selection variable.
const PROVIDER_ENV: &str = "FINANCE_AI_PROVIDER";
/// Language tag variable.
const LANGUAGE_ENV: &str = "FINANCE_LANGUAGE";
/// Language used when none is configured.
const DEFAULT_LANGUAGE: &str = "en-US";
/// Placeholder for empty table cells.
const EMPTY: &str = "\u{2014}";

/// Store over the HTTP backend and the on-disk snapshot.
type Store = FinanceStore<FinanceClient, Arc<FileStorage>>;
/// Auth store over the HTTP backend and the on-disk snapshot.
type Auth = AuthStore<FinanceClient, Arc<FileStorage>>;

/// Personal finance tracker CLI.
#[derive(Debug, Parser)]
#[command(name = "finance", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch accounts, categories and transactions from the backend.
    Sync,
    /// List cached accounts.
    Accounts,
    /// List cached categories.
    Categories,
    /// List cached transactions, optionally filtered.
    Transactions(TransactionArgs),
    /// List subscriptions straight from the backend.
    Subscriptions,
    /// Create an account.
    AddAccount {
        /// Display name.
        name: String,
        /// Account type.
        #[arg(long = "type", value_parser = parse_account_type, default_value = "CHECKING")]
        kind: AccountType,
        /// Display color.
        #[arg(long, default_value = "#0088FE")]
        color: String,
    },
    /// Create a category.
    AddCategory {
        /// Display name.
        name: String,
        /// Category type.
        #[arg(long = "type", value_parser = parse_transaction_type, default_value = "EXPENSE")]
        kind: CategoryType,
        /// Display color.
        #[arg(long, default_value = "#FF8042")]
        color: String,
    },
    /// Create a transaction.
    AddTransaction(AddTransactionArgs),
    /// Delete an account no transaction references.
    DeleteAccount {
        /// Account id.
        id: String,
    },
    /// Delete a category no transaction references.
    DeleteCategory {
        /// Category id.
        id: String,
    },
    /// Delete a transaction.
    DeleteTransaction {
        /// Transaction id.
        id: String,
    },
    /// Show the signed-in user.
    Whoami,
    /// Forget the signed-in user locally.
    Logout,
    /// Monthly totals, category breakdown and budget progress.
    Report(ReportArgs),
    /// Turn a spoken (typed) description into transactions.
    Voice(VoiceArgs),
}

/// Arguments for `transactions`.
#[derive(Debug, Args)]
struct TransactionArgs {
    /// Start date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Only this type.
    #[arg(long = "type", value_parser = parse_transaction_type)]
    kind: Option<TransactionType>,
    /// Filter by account name or id.
    #[arg(long)]
    account: Option<String>,
    /// Filter by category name or id.
    #[arg(long)]
    category: Option<String>,
}

/// Arguments for `add-transaction`.
#[derive(Debug, Args)]
struct AddTransactionArgs {
    /// Short description.
    name: String,
    /// Unsigned amount.
    amount: f64,
    /// Income or expense.
    #[arg(long = "type", value_parser = parse_transaction_type, default_value = "EXPENSE")]
    kind: TransactionType,
    /// Account name or id.
    #[arg(long)]
    account: String,
    /// Category name or id.
    #[arg(long)]
    category: String,
    /// Payment method.
    #[arg(long, value_parser = parse_payment_method, default_value = "CREDIT_CARD")]
    payment_method: PaymentMethod,
    /// Date (YYYY-MM-DD, default today).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// Free-form details.
    #[arg(long)]
    details: Option<String>,
}

/// Arguments for `report`.
#[derive(Debug, Args)]
struct ReportArgs {
    /// Month to report on (YYYY-MM, default current).
    #[arg(long, value_parser = parse_month)]
    month: Option<Month>,
    /// Number of months in the overview.
    #[arg(long, default_value_t = 6)]
    months: usize,
    /// Monthly spending budget.
    #[arg(long, default_value_t = 5000.0)]
    budget: f64,
}

/// Arguments for `voice`.
#[derive(Debug, Args)]
struct VoiceArgs {
    /// What you would have said, e.g. "spent 12 on lunch with cash".
    text: String,
    /// Provider to use (openai or gemini). Falls back to FINANCE_AI_PROVIDER.
    #[arg(long, value_parser = parse_provider)]
    provider: Option<ProviderKind>,
    /// Model override.
    #[arg(long)]
    model: Option<String>,
    /// Language for suggested names. Falls back to FINANCE_LANGUAGE.
    #[arg(long)]
    language: Option<String>,
    /// Commit without asking.
    #[arg(long, short)]
    yes: bool,
    /// Keep unresolved "<Name>:ID" references as raw ids instead of failing.
    #[arg(long)]
    keep_raw: bool,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a `YYYY-MM` month for clap.
fn parse_month(s: &str) -> Result<Month, String> {
    s.parse().map_err(|err: finance_ai::error::FinanceError| err.to_string())
}

/// Parses an account type for clap.
fn parse_account_type(s: &str) -> Result<AccountType, String> {
    s.parse()
        .map_err(|_err: finance_ai::models::ValidationErrors| {
            format!("expected one of {}", AccountType::NAMES.join(", "))
        })
}

/// Parses a transaction or category type for clap.
fn parse_transaction_type(s: &str) -> Result<TransactionType, String> {
    s.parse()
        .map_err(|_err: finance_ai::models::ValidationErrors| {
            format!("expected one of {}", TransactionType::NAMES.join(", "))
        })
}

/// Parses a payment method for clap.
fn parse_payment_method(s: &str) -> Result<PaymentMethod, String> {
    s.parse()
        .map_err(|_err: finance_ai::models::ValidationErrors| {
            format!("expected one of {}", PaymentMethod::NAMES.join(", "))
        })
}

/// Parses a provider kind for clap.
fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    s.parse().map_err(|err: finance_ai::error::FinanceError| err.to_string())
}

/// Reads a non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Prints an error line to stderr and returns a failure exit code.
fn fail<E: core::fmt::Display>(context: &str, err: E) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Prints a missing-variable error with a hint.
fn missing_env(name: &str) -> io::Result<ExitCode> {
    let mut err = io::stderr().lock();
    writeln!(
        err,
        "{} {} environment variable is not set",
        "error:".red().bold(),
        name.bold()
    )?;
    writeln!(
        err,
        "  {} create a .env file with {}=<value>",
        "hint:".cyan(),
        name
    )?;
    Ok(ExitCode::FAILURE)
}

/// Creates the storage backend, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_storage(data_dir: Option<PathBuf>) -> finance_ai::error::Result<FileStorage> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileStorage::default_dir()?,
    };
    FileStorage::new(dir)
}

/// Runs the CLI, returning an appropriate exit code.
async fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let Some(base_url) = env_var(BACKEND_URL_ENV) else {
        return missing_env(BACKEND_URL_ENV);
    };
    let mut builder = FinanceClient::builder().base_url(base_url);
    if let Some(token) = env_var(SESSION_TOKEN_ENV) {
        builder = builder.session_token(token);
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(err) => return fail("failed to build client", err),
    };

    let storage = match create_storage(cli.data_dir) {
        Ok(storage) => Arc::new(storage),
        Err(err) => return fail("failed to initialize storage", err),
    };
    let store = match FinanceStore::rehydrate(client.clone(), Arc::clone(&storage)).await {
        Ok(store) => store,
        Err(err) => return fail("failed to load cached data", err),
    };
    let auth = match AuthStore::rehydrate(client, storage).await {
        Ok(auth) => auth,
        Err(err) => return fail("failed to load session", err),
    };

    dispatch(&store, &auth, cli.command).await
}

/// Dispatches to the appropriate subcommand handler.
async fn dispatch(store: &Store, auth: &Auth, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::Sync => cmd_sync(store).await,
        Command::Accounts => print_accounts_table(&store.accounts()),
        Command::Categories => print_categories_table(&store.categories()),
        Command::Transactions(args) => cmd_transactions(store, &args),
        Command::Subscriptions => cmd_subscriptions(store).await,
        Command::AddAccount { name, kind, color } => {
            match store.add_account(&CreateAccount { name, kind, color }).await {
                Ok(account) => created("account", &account.id, &account.name),
                Err(err) => fail("failed to create account", err),
            }
        }
        Command::AddCategory { name, kind, color } => {
            match store.add_category(&CreateCategory { name, kind, color }).await {
                Ok(category) => created("category", &category.id, &category.name),
                Err(err) => fail("failed to create category", err),
            }
        }
        Command::AddTransaction(args) => cmd_add_transaction(store, args).await,
        Command::DeleteAccount { id } => {
            if let Err(err) = ensure_synced(store).await {
                return fail("sync failed", err);
            }
            let delete = DeleteAccount { id: AccountId::new(id) };
            match store.delete_account(&delete).await {
                Ok(()) => deleted("account", &delete.id),
                Err(err) => fail("failed to delete account", err),
            }
        }
        Command::DeleteCategory { id } => {
            if let Err(err) = ensure_synced(store).await {
                return fail("sync failed", err);
            }
            let delete = DeleteCategory { id: CategoryId::new(id) };
            match store.delete_category(&delete).await {
                Ok(()) => deleted("category", &delete.id),
                Err(err) => fail("failed to delete category", err),
            }
        }
        Command::DeleteTransaction { id } => {
            if let Err(err) = ensure_synced(store).await {
                return fail("sync failed", err);
            }
            let delete = DeleteTransaction { id: TransactionId::new(id) };
            match store.delete_transaction(&delete).await {
                Ok(()) => deleted("transaction", &delete.id),
                Err(err) => fail("failed to delete transaction", err),
            }
        }
        Command::Whoami => cmd_whoami(auth).await,
        Command::Logout => match auth.logout().await {
            Ok(()) => {
                writeln!(io::stdout().lock(), "{}", "Signed out locally.".green())?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => fail("failed to sign out", err),
        },
        Command::Report(args) => cmd_report(store, &args),
        Command::Voice(args) => cmd_voice(store, args).await,
    }
}

/// Fetches everything if the local cache is empty.
async fn ensure_synced(store: &Store) -> finance_ai::error::Result<()> {
    let snapshot = store.snapshot();
    if snapshot == FinanceSnapshot::default() {
        let spinner = make_spinner("Loading data...");
        let result = store.initialize().await;
        spinner.finish_and_clear();
        result?;
    }
    Ok(())
}

/// Executes the `sync` subcommand.
async fn cmd_sync(store: &Store) -> io::Result<ExitCode> {
    let spinner = make_spinner("Syncing with the backend...");
    let result = store.initialize().await;
    spinner.finish_and_clear();
    if let Err(err) = result {
        return fail("sync failed", err);
    }

    let snapshot = store.snapshot();
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Sync complete!".green().bold())?;
    writeln!(out)?;
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Entity").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
    ]);
    let rows: &[(&str, usize)] = &[
        ("Accounts", snapshot.accounts.len()),
        ("Categories", snapshot.categories.len()),
        ("Transactions", snapshot.transactions.len()),
    ];
    for &(name, count) in rows {
        let count_cell = if count > 0 {
            Cell::new(count).fg(Color::Green)
        } else {
            Cell::new(count).fg(Color::DarkGrey)
        };
        _ = table.add_row(vec![Cell::new(name), count_cell]);
    }
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Finds an account by id, or by case-insensitive name.
fn find_account<'list>(accounts: &'list [Account], key: &str) -> Option<&'list Account> {
    accounts
        .iter()
        .find(|account| account.id.as_inner() == key)
        .or_else(|| accounts.iter().find(|account| account.name.eq_ignore_ascii_case(key)))
}

/// Finds a category by id, or by case-insensitive name.
fn find_category<'list>(categories: &'list [Category], key: &str) -> Option<&'list Category> {
    categories
        .iter()
        .find(|category| category.id.as_inner() == key)
        .or_else(|| {
            categories
                .iter()
                .find(|category| category.name.eq_ignore_ascii_case(key))
        })
}

/// Executes the `transactions` subcommand.
fn cmd_transactions(store: &Store, args: &TransactionArgs) -> io::Result<ExitCode> {
    let snapshot = store.snapshot();
    let account = match args.account.as_deref() {
        Some(key) => match find_account(&snapshot.accounts, key) {
            Some(account) => Some(account.id.clone()),
            None => return fail("account not found", key),
        },
        None => None,
    };
    let category = match args.category.as_deref() {
        Some(key) => match find_category(&snapshot.categories, key) {
            Some(category) => Some(category.id.clone()),
            None => return fail("category not found", key),
        },
        None => None,
    };

    let filtered: Vec<Transaction> = snapshot
        .transactions
        .iter()
        .filter(|transaction| args.kind.is_none_or(|kind| transaction.kind == kind))
        .filter(|transaction| account.as_ref().is_none_or(|id| transaction.account_id == *id))
        .filter(|transaction| category.as_ref().is_none_or(|id| transaction.category_id == *id))
        .filter(|transaction| {
            let date = finance_ai::models::parse_iso_date(&transaction.date);
            args.from.is_none_or(|from| date.is_some_and(|day| day >= from))
                && args.to.is_none_or(|to| date.is_some_and(|day| day <= to))
        })
        .cloned()
        .collect();
    print_transactions_table(&filtered, &snapshot)
}

/// Executes the `subscriptions` subcommand.
async fn cmd_subscriptions(store: &Store) -> io::Result<ExitCode> {
    let spinner = make_spinner("Fetching subscriptions...");
    let result = store.backend().list_subscriptions().await;
    spinner.finish_and_clear();
    match result {
        Ok(subscriptions) => print_subscriptions_table(&subscriptions),
        Err(err) => fail("failed to list subscriptions", err),
    }
}

/// Executes the `add-transaction` subcommand.
async fn cmd_add_transaction(store: &Store, args: AddTransactionArgs) -> io::Result<ExitCode> {
    if let Err(err) = ensure_synced(store).await {
        return fail("sync failed", err);
    }
    let snapshot = store.snapshot();
    // Unknown keys are sent as raw ids; the backend decides.
    let account_id = find_account(&snapshot.accounts, &args.account)
        .map_or_else(|| AccountId::new(args.account.clone()), |account| account.id.clone());
    let category_id = find_category(&snapshot.categories, &args.category)
        .map_or_else(|| CategoryId::new(args.category.clone()), |category| category.id.clone());
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let create = CreateTransaction {
        name: args.name,
        details: args.details,
        date: date.format("%Y-%m-%d").to_string(),
        kind: args.kind,
        amount: args.amount,
        category_id,
        account_id,
        payment_method: args.payment_method,
    };
    match store.add_transaction(&create).await {
        Ok(transaction) => created("transaction", &transaction.id, &transaction.name),
        Err(err) => fail("failed to create transaction", err),
    }
}

/// Executes the `whoami` subcommand.
async fn cmd_whoami(auth: &Auth) -> io::Result<ExitCode> {
    let spinner = make_spinner("Checking session...");
    let result = auth.authenticate().await;
    spinner.finish_and_clear();
    let authenticated = match result {
        Ok(authenticated) => authenticated,
        Err(err) => return fail("failed to save session", err),
    };

    let mut out = io::stdout().lock();
    match auth.user().filter(|_| authenticated) {
        Some(user) => {
            writeln!(out, "{} {}", "Signed in as".green().bold(), user.name.bold())?;
            writeln!(out, "  {} {}", "Email:".bold(), user.email)?;
            writeln!(out, "  {} {}", "Id:".bold(), user.id)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let state = auth.snapshot();
            let reason = state.error.as_deref().unwrap_or("no session token configured");
            writeln!(out, "{} {reason}", "Not signed in:".yellow().bold())?;
            if let Ok(url) = auth.backend().google_sign_in_url() {
                writeln!(
                    out,
                    "  {} sign in at {url} and set {SESSION_TOKEN_ENV}",
                    "hint:".cyan()
                )?;
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `report` subcommand.
fn cmd_report(store: &Store, args: &ReportArgs) -> io::Result<ExitCode> {
    let snapshot = store.snapshot();
    let today = Local::now().date_naive();
    let month = args.month.unwrap_or_else(|| Month::of(today));
    let totals = reports::month_totals(&snapshot.transactions, month);
    let mut out = io::stdout().lock();

    writeln!(out, "{} {}", "Report for".green().bold(), month.bold())?;
    writeln!(out, "  {} {:.2}", "Income:".bold(), totals.income.green())?;
    writeln!(out, "  {} {:.2}", "Expenses:".bold(), totals.expenses.red())?;
    writeln!(out, "  {} {:.2}", "Net:".bold(), totals.net)?;
    let progress = reports::budget_progress(totals.expenses, args.budget);
    let progress_text = format!("{progress:.1}% of {:.2}", args.budget);
    if progress > 90.0 {
        writeln!(out, "  {} {}", "Budget:".bold(), progress_text.red())?;
    } else {
        writeln!(out, "  {} {progress_text}", "Budget:".bold())?;
    }
    writeln!(out)?;

    let anchor = if Month::of(today) == month { today } else { month.first_day() };
    let mut overview = Table::new();
    _ = overview.load_preset(UTF8_FULL);
    _ = overview.set_header(vec![
        Cell::new("Month").fg(Color::Cyan),
        Cell::new("Income").fg(Color::Cyan),
        Cell::new("Expenses").fg(Color::Cyan),
        Cell::new("Net").fg(Color::Cyan),
    ]);
    for entry in reports::monthly_summary(&snapshot.transactions, anchor, args.months) {
        _ = overview.add_row(vec![
            Cell::new(entry.month),
            Cell::new(format!("{:.2}", entry.totals.income)).fg(Color::Green),
            Cell::new(format!("{:.2}", entry.totals.expenses)).fg(Color::Red),
            Cell::new(format!("{:.2}", entry.totals.net)),
        ]);
    }
    writeln!(out, "{}", "Monthly Overview".green().bold())?;
    writeln!(out, "{overview}")?;
    writeln!(out)?;

    let last_day = month.days().last().copied().unwrap_or_else(|| month.first_day());
    let spending = reports::category_spending(
        &snapshot.transactions,
        &snapshot.categories,
        month.first_day(),
        last_day,
    );
    if spending.is_empty() {
        writeln!(out, "{}", "No categorized spending this month.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }
    let mut breakdown = Table::new();
    _ = breakdown.load_preset(UTF8_FULL);
    _ = breakdown.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Spent").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
    ]);
    for entry in &spending {
        _ = breakdown.add_row(vec![
            Cell::new(&entry.name),
            Cell::new(format!("{:.2}", entry.amount)),
            Cell::new(format!("{:.1}%", entry.share)),
        ]);
    }
    writeln!(out, "{}", "Category Breakdown".green().bold())?;
    writeln!(out, "{breakdown}")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `voice` subcommand: interpret, preview, confirm, commit.
async fn cmd_voice(store: &Store, args: VoiceArgs) -> io::Result<ExitCode> {
    let kind = match args.provider {
        Some(kind) => kind,
        None => match env_var(PROVIDER_ENV).map(|raw| raw.parse::<ProviderKind>()) {
            Some(Ok(kind)) => kind,
            Some(Err(err)) => return fail("invalid provider", err),
            None => ProviderKind::default(),
        },
    };
    let key_env = match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Gemini => "GEMINI_API_KEY",
    };
    let Some(api_key) = env_var(key_env) else {
        return missing_env(key_env);
    };
    let mut builder = Provider::builder().api_key(api_key);
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    let provider = match builder.build(kind) {
        Ok(provider) => provider,
        Err(err) => return fail("failed to build provider", err),
    };
    let language = args
        .language
        .or_else(|| env_var(LANGUAGE_ENV))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned());

    if let Err(err) = ensure_synced(store).await {
        return fail("sync failed", err);
    }

    let mut capture = VoiceCapture::new();
    if let Err(err) = capture.start() {
        return fail("capture failed", err);
    }
    capture.on_result(&args.text, true);
    let Some(transcript) = capture.end() else {
        return fail("nothing to interpret", "the transcript is empty");
    };

    let spinner = make_spinner(&format!("Interpreting with {kind}..."));
    let today = Local::now().date_naive();
    let outcome = interpret(&provider, store, &transcript, &language, today).await;
    spinner.finish_and_clear();
    capture.settle(&outcome);
    let batch = match outcome {
        Ok(batch) => batch,
        Err(err) => {
            let message = capture.error().unwrap_or("interpretation failed").to_owned();
            return fail(&message, err);
        }
    };
    if batch.is_empty() {
        writeln!(io::stdout().lock(), "{}", "Nothing recognised.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    print_preview(&batch.preview(&store.snapshot()))?;
    if !batch.accounts.is_empty() || !batch.categories.is_empty() {
        let accounts: Vec<&str> = batch.accounts.iter().map(|account| account.name.as_str()).collect();
        let categories: Vec<&str> =
            batch.categories.iter().map(|category| category.name.as_str()).collect();
        let mut out = io::stdout().lock();
        if !accounts.is_empty() {
            writeln!(out, "  {} {}", "New accounts:".bold(), accounts.join(", "))?;
        }
        if !categories.is_empty() {
            writeln!(out, "  {} {}", "New categories:".bold(), categories.join(", "))?;
        }
    }

    let snapshot = store.snapshot();
    let unresolved = batch.unresolved(&snapshot);
    if !unresolved.is_empty() {
        writeln!(
            io::stdout().lock(),
            "  {} {}",
            "Unresolved references:".yellow().bold(),
            unresolved.join(", ")
        )?;
    }

    if !args.yes && !confirm("Create these transactions?")? {
        writeln!(io::stdout().lock(), "{}", "Discarded.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let policy = if args.keep_raw {
        PlaceholderPolicy::KeepRaw
    } else {
        PlaceholderPolicy::Reject
    };
    let spinner = make_spinner("Creating transactions...");
    let result = batch.commit(store, policy).await;
    spinner.finish_and_clear();
    match result {
        Ok(summary) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Created".green().bold(),
                format_args!(
                    "{} transaction(s), {} account(s), {} categor(ies)",
                    summary.transactions.len(),
                    summary.accounts.len(),
                    summary.categories.len()
                )
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to create transactions", err),
    }
}

/// Asks a yes/no question on stdin; anything but `y`/`yes` is no.
fn confirm(question: &str) -> io::Result<bool> {
    {
        let mut out = io::stdout().lock();
        write!(out, "{question} [y/N] ")?;
        out.flush()?;
    }
    let mut answer = String::new();
    let _read = io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints a one-line creation confirmation.
fn created<I: core::fmt::Display>(label: &str, id: &I, name: &str) -> io::Result<ExitCode> {
    writeln!(
        io::stdout().lock(),
        "{} {label} {} {}",
        "Created".green().bold(),
        name.bold(),
        format_args!("({id})").dimmed()
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Prints a one-line deletion confirmation.
fn deleted<I: core::fmt::Display>(label: &str, id: &I) -> io::Result<ExitCode> {
    writeln!(io::stdout().lock(), "{} {label} {id}", "Deleted".green().bold())?;
    Ok(ExitCode::SUCCESS)
}

/// Prints accounts in a table.
fn print_accounts_table(accounts: &[Account]) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if accounts.is_empty() {
        writeln!(out, "{}", "No accounts cached. Run `finance sync`.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Color").fg(Color::Cyan),
    ]);
    for account in accounts {
        _ = table.add_row(vec![
            Cell::new(&account.id),
            Cell::new(&account.name),
            Cell::new(account.kind),
            Cell::new(&account.color),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Accounts".green().bold(),
        format_args!("({})", accounts.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints categories in a table.
fn print_categories_table(categories: &[Category]) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if categories.is_empty() {
        writeln!(out, "{}", "No categories cached. Run `finance sync`.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Color").fg(Color::Cyan),
    ]);
    for category in categories {
        _ = table.add_row(vec![
            Cell::new(&category.id),
            Cell::new(&category.name),
            Cell::new(category.kind),
            Cell::new(&category.color),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Categories".green().bold(),
        format_args!("({})", categories.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the colored amount cell for a transaction.
fn amount_cell(kind: TransactionType, amount: f64) -> Cell {
    match kind {
        TransactionType::Income => Cell::new(format!("+{amount:.2}")).fg(Color::Green),
        TransactionType::Expense => Cell::new(format!("-{amount:.2}")).fg(Color::Red),
    }
}

/// Prints transactions in a table with resolved names.
fn print_transactions_table(
    transactions: &[Transaction],
    snapshot: &FinanceSnapshot,
) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if transactions.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Account").fg(Color::Cyan),
        Cell::new("Payment").fg(Color::Cyan),
        Cell::new("Id").fg(Color::Cyan),
    ]);
    for transaction in transactions {
        let category = snapshot
            .categories
            .iter()
            .find(|category| category.id == transaction.category_id)
            .map_or(EMPTY, |category| category.name.as_str());
        let account = snapshot
            .accounts
            .iter()
            .find(|account| account.id == transaction.account_id)
            .map_or(EMPTY, |account| account.name.as_str());
        let date = transaction.date.get(..10).unwrap_or(&transaction.date);
        _ = table.add_row(vec![
            Cell::new(date),
            Cell::new(&transaction.name),
            amount_cell(transaction.kind, transaction.amount),
            Cell::new(category),
            Cell::new(account),
            Cell::new(transaction.payment_method),
            Cell::new(&transaction.id).fg(Color::DarkGrey),
        ]);
    }

    let totals = reports::totals(transactions);
    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", transactions.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    writeln!(
        out,
        "  {} {:.2}   {} {:.2}   {} {:.2}",
        "Income:".bold(),
        totals.income,
        "Expenses:".bold(),
        totals.expenses,
        "Net:".bold(),
        totals.net
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Prints subscriptions in a table.
fn print_subscriptions_table(subscriptions: &[Subscription]) -> io::Result<ExitCode> {
    let mut out = io::stdout().lock();
    if subscriptions.is_empty() {
        writeln!(out, "{}", "No subscriptions found.".dimmed())?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Due day").fg(Color::Cyan),
        Cell::new("Since").fg(Color::Cyan),
        Cell::new("Until").fg(Color::Cyan),
    ]);
    for subscription in subscriptions {
        _ = table.add_row(vec![
            Cell::new(&subscription.name),
            Cell::new(format!("{:.2}", subscription.amount)),
            Cell::new(subscription.due_day),
            Cell::new(&subscription.start_date),
            Cell::new(subscription.end_date.as_deref().unwrap_or(EMPTY)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Subscriptions".green().bold(),
        format_args!("({})", subscriptions.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the suggested transactions before confirmation.
fn print_preview(preview: &[TransactionPreview]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Account").fg(Color::Cyan),
        Cell::new("Payment").fg(Color::Cyan),
        Cell::new("Details").fg(Color::Cyan),
    ]);
    for line in preview {
        _ = table.add_row(vec![
            Cell::new(&line.date),
            Cell::new(&line.name),
            amount_cell(line.kind, line.amount),
            Cell::new(&line.category_name),
            Cell::new(&line.account_name),
            Cell::new(line.payment_method),
            Cell::new(line.details.as_deref().unwrap_or(EMPTY)),
        ]);
    }
    writeln!(out, "{}", "Suggested Transactions".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, name: &str) -> Account {
        Account {
            id: AccountId::from(id),
            name: name.to_owned(),
            kind: AccountType::Checking,
            color: "#0088FE".to_owned(),
        }
    }

    #[test]
    fn cli_parses_voice_flags() {
        let cli = Cli::try_parse_from([
            "finance", "voice", "lunch 12 cash", "--provider", "openai", "--yes", "--keep-raw",
        ])
        .unwrap();
        let Command::Voice(args) = cli.command else {
            unreachable!("expected voice command");
        };
        assert_eq!(args.provider, Some(ProviderKind::OpenAi));
        assert!(args.yes);
        assert!(args.keep_raw);
    }

    #[test]
    fn cli_parses_add_transaction_defaults() {
        let cli = Cli::try_parse_from([
            "finance",
            "add-transaction",
            "Coffee",
            "4.5",
            "--account",
            "Checking",
            "--category",
            "c1",
        ])
        .unwrap();
        let Command::AddTransaction(args) = cli.command else {
            unreachable!("expected add-transaction command");
        };
        assert_eq!(args.kind, TransactionType::Expense);
        assert_eq!(args.payment_method, PaymentMethod::CreditCard);
        assert!(args.date.is_none());
    }

    #[test]
    fn cli_rejects_unknown_enum_values() {
        assert!(Cli::try_parse_from(["finance", "add-account", "X", "--type", "LOAN"]).is_err());
        assert!(Cli::try_parse_from(["finance", "report", "--month", "2024-13"]).is_err());
    }

    #[test]
    fn accounts_resolve_by_id_or_name() {
        let accounts = vec![account("a1", "Checking"), account("a2", "Cash")];
        assert_eq!(find_account(&accounts, "a2").map(|found| found.name.as_str()), Some("Cash"));
        assert_eq!(find_account(&accounts, "cash").map(|found| found.id.as_inner()), Some("a2"));
        assert!(find_account(&accounts, "Savings").is_none());
    }

    #[test]
    fn amount_cell_is_signed() {
        let cell = amount_cell(TransactionType::Income, 12.0);
        assert_eq!(cell.content(), "+12.00");
    }
}
