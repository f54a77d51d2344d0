//! Exposes a ledger in the shape a UI renders from: flags instead of a state machine, display
//! strings instead of decimals, and a channel that says when to render again.

use crate::error::LedgerResult;
use crate::ledger::{LedgerStore, Status};
use crate::model::{Summary, Transaction, TransactionDraft, TransactionId, UserId};
use serde::Serialize;
use tokio::sync::watch;

/// Render-friendly access to a `LedgerStore`. Every operation returns its outcome; nothing fails
/// silently.
#[derive(Debug, Clone)]
pub struct LedgerView {
    store: LedgerStore,
}

impl LedgerView {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn user_id(&self) -> &UserId {
        self.store.user_id()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.store.transactions()
    }

    pub fn summary(&self) -> Summary {
        self.store.summary()
    }

    pub fn is_loading(&self) -> bool {
        self.store.status() == Status::Loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.store.is_refreshing()
    }

    pub fn has_error(&self) -> bool {
        self.store.status() == Status::Error
    }

    pub fn error_message(&self) -> Option<String> {
        self.store.last_error().map(|f| f.error().to_string())
    }

    /// Everything needed to render, read at one instant.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.store.read(|state| {
            let status = state.status();
            LedgerSnapshot {
                user_id: self.store.user_id().clone(),
                status,
                is_loading: status == Status::Loading,
                is_refreshing: state.is_refreshing(),
                has_error: status == Status::Error,
                error_message: state.failure().map(|f| f.error().to_string()),
                transactions: state.transactions().to_vec(),
                summary: state.summary(),
                revision: state.revision(),
            }
        })
    }

    /// A receiver whose value changes every time the ledger does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    pub async fn load(&self) -> LedgerResult<()> {
        self.store.load().await
    }

    pub async fn refresh(&self) -> LedgerResult<()> {
        self.store.refresh().await
    }

    pub async fn create(&self, draft: &TransactionDraft) -> LedgerResult<Transaction> {
        self.store.create(draft).await
    }

    pub async fn delete(&self, id: &TransactionId) -> LedgerResult<bool> {
        self.store.delete(id).await
    }
}

/// An immutable copy of a ledger's renderable state.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    pub user_id: UserId,
    pub status: Status,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
    pub revision: u64,
}

impl LedgerSnapshot {
    /// The transactions as display rows, amounts formatted with `currency_symbol`.
    pub fn rows(&self, currency_symbol: &str) -> Vec<TransactionRow> {
        self.transactions
            .iter()
            .map(|t| TransactionRow::new(t, currency_symbol))
            .collect()
    }

    /// The summary as display strings.
    pub fn totals(&self, currency_symbol: &str) -> SummaryRow {
        SummaryRow {
            balance: self.summary.balance().format_balance(currency_symbol),
            income: self.summary.income().format_signed(currency_symbol),
            expenses: self.summary.expenses().format_expense(currency_symbol),
        }
    }
}

/// One line of a transaction listing.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub icon: &'static str,
    pub title: String,
    pub category: String,
    pub date: String,
    pub amount: String,
    pub is_income: bool,
}

impl TransactionRow {
    fn new(t: &Transaction, currency_symbol: &str) -> Self {
        Self {
            id: t.id().clone(),
            icon: t.category().icon(),
            title: t.title().to_string(),
            category: t.category().label().to_string(),
            date: t.display_date(),
            amount: t.amount().format_signed(currency_symbol),
            is_income: t.amount().is_income(),
        }
    }
}

impl std::fmt::Display for TransactionRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} · {} · {}  {}",
            self.icon, self.title, self.category, self.date, self.amount
        )
    }
}

/// The balance card: balance, income and expenses as display strings.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SummaryRow {
    pub balance: String,
    pub income: String,
    pub expenses: String,
}
