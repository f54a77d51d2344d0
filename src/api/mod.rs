//! Access to the remote transaction store.
//!
//! The `Repository` trait is the seam between the ledger and the network. `HttpRepository` talks
//! to the real HTTP API and `MemoryRepository` keeps everything in process memory so the whole
//! program can run, top-to-bottom, without a server.

mod http;
mod memory;

pub use http::HttpRepository;
pub use memory::{MemoryRepository, Operation, DEMO_USER};

use crate::error::RepositoryError;
use crate::model::{NewTransaction, Summary, Transaction, TransactionId, UserId};
use crate::{Config, Result};
use std::sync::Arc;
use tracing::debug;

/// Environment variable that, when set and non-empty, selects `Mode::Testing`.
pub const TEST_MODE_ENV: &str = "FINTRACK_IN_TEST_MODE";

/// Request/response access to a user's transactions. Implementations hold no cache and do not
/// retry; every call is one round-trip.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Returns all of the user's transactions as ordered by the store.
    async fn fetch_transactions(
        &self,
        user_id: &UserId,
    ) -> std::result::Result<Vec<Transaction>, RepositoryError>;

    /// Returns the store's own computation of the user's totals.
    async fn fetch_summary(&self, user_id: &UserId)
        -> std::result::Result<Summary, RepositoryError>;

    /// Creates a transaction. The store assigns its id and timestamp.
    async fn create_transaction(
        &self,
        request: &NewTransaction,
    ) -> std::result::Result<Transaction, RepositoryError>;

    /// Deletes the transaction with `id`.
    async fn delete_transaction(&self, id: &TransactionId)
        -> std::result::Result<(), RepositoryError>;
}

/// Whether the program talks to the configured server or to an in-memory store.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Live,
    Testing,
}

impl Mode {
    /// Returns `Mode::Testing` when `FINTRACK_IN_TEST_MODE` is set to a non-empty value.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Testing,
            _ => Mode::Live,
        }
    }
}

/// Creates the repository for `mode`.
pub fn repository(config: &Config, mode: Mode) -> Result<Arc<dyn Repository>> {
    match mode {
        Mode::Live => {
            debug!("Using the HTTP repository at {}", config.api_url());
            Ok(Arc::new(HttpRepository::new(
                config.api_url(),
                config.request_timeout(),
            )?))
        }
        Mode::Testing => {
            debug!("Using the seeded in-memory repository");
            Ok(Arc::new(MemoryRepository::seeded()?))
        }
    }
}
