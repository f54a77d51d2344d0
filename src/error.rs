//! Error types.
//!
//! Application plumbing (configuration files, the CLI) uses `anyhow` through [`Result`]. The
//! ledger itself reports failures through [`LedgerError`] so that callers can tell bad input from
//! a failed network call from a broken internal invariant.

use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result type of every ledger operation.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Everything that can go wrong in a ledger operation.
///
/// This is `Clone` because a single coalesced load resolves once and its outcome is handed to
/// every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Bad local input. The network was never contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote store could not be reached or refused the request.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// An internal invariant was violated. Not recoverable by the user; the store resets itself.
    #[error("Ledger state error: {0}")]
    State(String),
}

impl LedgerError {
    pub(crate) fn state(message: impl Into<String>) -> Self {
        LedgerError::State(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }

    pub fn is_repository(&self) -> bool {
        matches!(self, LedgerError::Repository(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, LedgerError::State(_))
    }
}

/// Reasons a transaction draft can be rejected before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A title is required")]
    EmptyTitle,

    #[error("A category is required")]
    MissingCategory,

    #[error("The amount must be greater than zero")]
    NonPositiveAmount,

    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),

    #[error("The amount '{0}' has more than two decimal places")]
    TooManyDecimalPlaces(String),
}

/// A failure talking to the remote transaction store. The message is meant for humans and is
/// passed through from the server when it provides one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RepositoryError {
    message: String,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
