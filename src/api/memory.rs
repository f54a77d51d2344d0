//! Implements the `Repository` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a server. Tests use it to inject failures, add latency and count
//! calls.

use crate::api::Repository;
use crate::error::RepositoryError;
use crate::model::{aggregate, NewTransaction, Summary, Transaction, TransactionId, UserId};
use crate::Result;
use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// The user that owns the seed data.
pub const DEMO_USER: &str = "demo_user";

/// The repository calls, used to inject failures and to count calls.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operation {
    FetchTransactions,
    FetchSummary,
    Create,
    Delete,
}

impl Operation {
    const ALL: [Operation; 4] = [
        Operation::FetchTransactions,
        Operation::FetchSummary,
        Operation::Create,
        Operation::Delete,
    ];

    fn index(self) -> usize {
        match self {
            Operation::FetchTransactions => 0,
            Operation::FetchSummary => 1,
            Operation::Create => 2,
            Operation::Delete => 3,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    transactions: Vec<Transaction>,
    next_id: u64,
    failures: HashMap<Operation, String>,
    latency: Duration,
}

/// An implementation of the `Repository` trait that does not use a server. It holds every user's
/// transactions in memory and behaves the way the remote store does: it assigns ids and
/// timestamps, returns transactions most-recent-first and computes summaries itself.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
    calls: [AtomicUsize; 4],
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::with_transactions(Vec::new())
    }

    /// Creates a repository holding `transactions`.
    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        let next_id = transactions
            .iter()
            .filter_map(|t| t.id().as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            store: Mutex::new(Store {
                transactions,
                next_id,
                ..Store::default()
            }),
            calls: Default::default(),
        }
    }

    /// Creates a repository seeded with sample data owned by `demo_user`.
    pub fn seeded() -> Result<Self> {
        Ok(Self::with_transactions(load_csv(SEED_DATA)?))
    }

    /// Every call to `operation` fails with `message` until `recover` is called.
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    pub fn recover(&self, operation: Operation) {
        self.lock().failures.remove(&operation);
    }

    /// Every call waits for `latency` before it is answered.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// The number of times `operation` has been called, including failed calls.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        Operation::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    /// A copy of everything stored for `user_id`, most-recent-first.
    pub fn stored(&self, user_id: &UserId) -> Vec<Transaction> {
        user_rows(&self.lock(), user_id)
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call, waits out the configured latency and returns the injected failure, if
    /// any.
    async fn begin(&self, operation: Operation) -> std::result::Result<(), RepositoryError> {
        self.calls[operation.index()].fetch_add(1, Ordering::SeqCst);
        trace!("memory repository: {operation:?}");
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.lock().failures.get(&operation) {
            Some(message) => Err(RepositoryError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn fetch_transactions(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Vec<Transaction>, RepositoryError> {
        self.begin(Operation::FetchTransactions).await?;
        Ok(user_rows(&self.lock(), user_id))
    }

    async fn fetch_summary(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Summary, RepositoryError> {
        self.begin(Operation::FetchSummary).await?;
        let store = self.lock();
        Ok(aggregate(
            store.transactions.iter().filter(|t| t.user_id() == user_id),
        ))
    }

    async fn create_transaction(
        &self,
        request: &NewTransaction,
    ) -> std::result::Result<Transaction, RepositoryError> {
        self.begin(Operation::Create).await?;
        let mut store = self.lock();
        let id = store.next_id;
        store.next_id += 1;

        // Timestamps are assigned here, after everything already stored.
        let latest = store.transactions.iter().map(Transaction::created_at).max();
        let now = Utc::now();
        let created_at = match latest {
            Some(latest) if latest >= now => latest + ChronoDuration::milliseconds(1),
            _ => now,
        };

        let transaction = Transaction::new(
            id,
            request.user_id().clone(),
            request.title(),
            request.amount(),
            request.category().clone(),
            created_at,
        );
        store.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn delete_transaction(
        &self,
        id: &TransactionId,
    ) -> std::result::Result<(), RepositoryError> {
        self.begin(Operation::Delete).await?;
        let mut store = self.lock();
        match store.transactions.iter().position(|t| t.id() == id) {
            Some(ix) => {
                store.transactions.remove(ix);
                Ok(())
            }
            None => Err(RepositoryError::new("Transaction not found")),
        }
    }
}

fn user_rows(store: &Store, user_id: &UserId) -> Vec<Transaction> {
    let mut rows: Vec<Transaction> = store
        .transactions
        .iter()
        .filter(|t| t.user_id() == user_id)
        .cloned()
        .collect();
    rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    rows
}

/// Loads transactions from a CSV-formatted string with a header row.
fn load_csv(csv_data: &str) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(csv_data.as_bytes()));
    rdr.deserialize::<Transaction>()
        .enumerate()
        .map(|(ix, row)| row.with_context(|| format!("Invalid seed row {}", ix + 1)))
        .collect()
}

/// Seed transaction data.
const SEED_DATA: &str = r##"id,user_id,title,amount,category,created_at
1,demo_user,Salary,5000.00,Income,2025-07-01T09:00:00Z
2,demo_user,Rent,-1200.00,Rent,2025-07-01T10:30:00Z
3,demo_user,Groceries,-87.43,Food & Drinks,2025-07-03T18:12:00Z
4,demo_user,Bus pass,-45.00,Transportation,2025-07-05T08:05:00Z
5,demo_user,Movie night,-24.50,Entertainment,2025-07-06T20:45:00Z
6,demo_user,Phone Bill,-39.99,Bills,2025-07-08T07:00:00Z
7,demo_user,Freelance Work,850.00,Freelance Work,2025-07-10T16:20:00Z
8,demo_user,Coffee,-4.75,Food & Drinks,2025-07-11T08:40:00Z
"##;
