//! Delete command handler.

use crate::api::Repository;
use crate::args::DeleteArgs;
use crate::commands::{open, Out};
use crate::{Config, Result};
use anyhow::{bail, Context};
use std::sync::Arc;

/// Deletes one of the user's transactions by id.
///
/// # Errors
/// - Returns an error if the user has no transaction with that id.
/// - Returns an error if the server refuses the delete. The transaction is kept.
pub async fn delete(
    config: &Config,
    repository: Arc<dyn Repository>,
    args: &DeleteArgs,
) -> Result<Out<String>> {
    let (_session, view) = open(config, repository, args.user_id()).await?;
    let id = args.id();
    let title = view
        .transactions()
        .iter()
        .find(|t| t.id() == &id)
        .map(|t| t.title().to_string());
    let deleted = view
        .delete(&id)
        .await
        .with_context(|| format!("Unable to delete transaction {id}"))?;
    match (deleted, title) {
        (true, Some(title)) => Ok(Out::new(
            format!("Deleted transaction {id} ({title})"),
            id.to_string(),
        )),
        _ => bail!("Transaction {id} was not found"),
    }
}
