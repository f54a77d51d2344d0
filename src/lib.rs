//! fintrack: the client side of a personal finance tracker.
//!
//! The heart of the crate is the [`ledger::LedgerStore`], an in-memory copy of one user's
//! transactions and their income/expense summary that stays consistent with a remote store while
//! loads, creates and deletes run concurrently. [`view::LedgerView`] puts it in a shape a UI can
//! render from and [`session::Session`] ties it to the signed-in user.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod ledger;
pub mod model;
pub mod session;
mod utils;
pub mod view;


pub use api::{Mode, Repository};
pub use config::Config;
pub use error::{Error, LedgerError, LedgerResult, RepositoryError, Result, ValidationError};
