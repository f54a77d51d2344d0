//! These structs provide the CLI interface for the fintrack CLI.

use crate::model::{Category, TransactionId, TransactionType, UserId};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// fintrack: A command-line client for a personal finance tracker.
///
/// Record income and expenses against categories and see your balance along with your total
/// income and expenses. Transactions are stored by a remote transaction API; run `fintrack init`
/// once to tell the program where that API is.
///
/// Set FINTRACK_IN_TEST_MODE to any non-empty value to run against built-in sample data instead
/// of the API. The sample data belongs to the user `demo_user`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and write the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/fintrack; pass --fintrack-home to put it somewhere else.
    Init(InitArgs),
    /// List a user's transactions, most recent first.
    List(UserArgs),
    /// Show a user's balance, income and expenses.
    Summary(UserArgs),
    /// Record a new income or expense.
    Add(AddArgs),
    /// Delete a transaction.
    Delete(DeleteArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where fintrack configuration is held. Defaults to ~/fintrack
    #[arg(long, env = "FINTRACK_HOME", default_value_t = default_fintrack_home())]
    fintrack_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, fintrack_home: PathBuf) -> Self {
        Self {
            log_level,
            fintrack_home: fintrack_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn fintrack_home(&self) -> &DisplayPath {
        &self.fintrack_home
    }
}

/// Args for the `fintrack init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the transaction API, e.g. http://192.168.1.8:3000/api
    #[arg(long)]
    api_url: String,

    /// The currency symbol used when showing amounts. Defaults to ₹
    #[arg(long)]
    currency_symbol: Option<String>,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>, currency_symbol: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            currency_symbol,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn currency_symbol(&self) -> Option<&str> {
        self.currency_symbol.as_deref()
    }
}

/// Args for commands that only need to know whose ledger to open.
#[derive(Debug, Parser, Clone)]
pub struct UserArgs {
    /// The id of the signed-in user.
    #[arg(long)]
    user_id: String,
}

impl UserArgs {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::new(self.user_id.clone())
    }
}

/// Args for the `fintrack add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The id of the signed-in user.
    #[arg(long)]
    user_id: String,

    /// What the transaction was for, e.g. "Coffee".
    #[arg(long)]
    title: String,

    /// The amount without a sign, e.g. 12.50. Use --type to say whether it is an expense or
    /// income.
    #[arg(long)]
    amount: String,

    /// The category, e.g. "Food & Drinks", "Shopping", "Transportation", "Entertainment",
    /// "Bills", "Income" or "Other".
    #[arg(long)]
    category: String,

    /// Either expense or income.
    #[arg(long = "type", default_value_t = TransactionType::Expense)]
    kind: TransactionType,
}

impl AddArgs {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        amount: impl Into<String>,
        category: impl Into<String>,
        kind: TransactionType,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            amount: amount.into(),
            category: category.into(),
            kind,
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::new(self.user_id.clone())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// The category, or `None` when the argument is blank.
    pub fn category(&self) -> Option<Category> {
        let trimmed = self.category.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Category::from(trimmed))
        }
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }
}

/// Args for the `fintrack delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the signed-in user.
    #[arg(long)]
    user_id: String,

    /// The id of the transaction to delete.
    id: String,
}

impl DeleteArgs {
    pub fn new(user_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            id: id.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::new(self.user_id.clone())
    }

    pub fn id(&self) -> TransactionId {
        TransactionId::new(self.id.clone())
    }
}

fn default_fintrack_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("fintrack"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --fintrack-home or FINTRACK_HOME instead of relying on the \
                default fintrack home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("fintrack")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
