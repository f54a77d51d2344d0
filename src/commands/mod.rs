//! Command handlers for the fintrack CLI.
//!
//! Each handler signs the requested user in, loads their ledger and runs one operation against
//! it, the same way a UI screen would.

mod add;
mod delete;
mod init;
mod list;

use crate::api::Repository;
use crate::ledger::LedgerOptions;
use crate::model::UserId;
use crate::session::Session;
use crate::view::LedgerView;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use add::add;
pub use delete::delete;
pub use init::init;
pub use list::{list, summary};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Signs `user_id` in and loads their ledger. The returned `Session` must be kept alive for as
/// long as the view is used.
async fn open(
    config: &Config,
    repository: Arc<dyn Repository>,
    user_id: UserId,
) -> Result<(Session, LedgerView)> {
    let mut session = Session::new(repository, LedgerOptions::from(config));
    let view = session.sign_in(user_id);
    view.load()
        .await
        .with_context(|| format!("Unable to load the transactions of '{}'", view.user_id()))?;
    Ok((session, view))
}
