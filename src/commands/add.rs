use crate::api::Repository;
use crate::args::AddArgs;
use crate::commands::{open, Out};
use crate::model::TransactionDraft;
use crate::view::TransactionRow;
use crate::{Config, Result};
use anyhow::{anyhow, Context};
use std::sync::Arc;

/// Records a new transaction for the user. The amount is given unsigned; `--type` decides
/// whether it is stored as an expense or as income.
///
/// # Errors
/// - Returns an error if the input is invalid, in which case the server is not contacted.
/// - Returns an error if the server refuses the transaction.
pub async fn add(
    config: &Config,
    repository: Arc<dyn Repository>,
    args: &AddArgs,
) -> Result<Out<TransactionRow>> {
    let (_session, view) = open(config, repository, args.user_id()).await?;
    let draft = TransactionDraft::new(args.title(), args.amount(), args.kind(), args.category());
    let created = view
        .create(&draft)
        .await
        .with_context(|| format!("Unable to add '{}'", args.title()))?;

    let row = view
        .snapshot()
        .rows(config.currency_symbol())
        .into_iter()
        .find(|row| &row.id == created.id())
        .ok_or_else(|| anyhow!("Transaction {} is missing after it was added", created.id()))?;
    Ok(Out::new(
        format!("Added {} {} ({})", row.icon, row.title, row.amount),
        row,
    ))
}
