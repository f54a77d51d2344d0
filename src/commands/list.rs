//! Read-only command handlers.

use crate::api::Repository;
use crate::args::UserArgs;
use crate::commands::{open, Out};
use crate::view::{SummaryRow, TransactionRow};
use crate::{Config, Result};
use std::sync::Arc;

/// Lists the user's transactions, most recent first.
pub async fn list(
    config: &Config,
    repository: Arc<dyn Repository>,
    args: &UserArgs,
) -> Result<Out<Vec<TransactionRow>>> {
    let (_session, view) = open(config, repository, args.user_id()).await?;
    let rows = view.snapshot().rows(config.currency_symbol());
    if rows.is_empty() {
        return Ok(Out::new("No transactions found", rows));
    }
    let lines: Vec<String> = rows.iter().map(ToString::to_string).collect();
    let message = format!(
        "{} transaction{}\n{}",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" },
        lines.join("\n")
    );
    Ok(Out::new(message, rows))
}

/// Shows the user's balance, income and expenses.
pub async fn summary(
    config: &Config,
    repository: Arc<dyn Repository>,
    args: &UserArgs,
) -> Result<Out<SummaryRow>> {
    let (_session, view) = open(config, repository, args.user_id()).await?;
    let totals = view.snapshot().totals(config.currency_symbol());
    let message = format!(
        "Balance: {}\nIncome: {}\nExpenses: {}",
        totals.balance, totals.income, totals.expenses
    );
    Ok(Out::new(message, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Operation, DEMO_USER};
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_list() {
        let env = TestEnv::new().await;
        let out = list(&env.config(), env.repository(), &UserArgs::new(DEMO_USER))
            .await
            .unwrap();
        let rows = out.structure().unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].title, "Coffee");
        assert_eq!(rows[0].amount, "-₹4.75");
        assert!(out.message().starts_with("8 transactions\n🍕 Coffee"));
    }

    #[tokio::test]
    async fn test_list_unknown_user() {
        let env = TestEnv::new().await;
        let out = list(&env.config(), env.repository(), &UserArgs::new("nobody"))
            .await
            .unwrap();
        assert_eq!(out.message(), "No transactions found");
    }

    #[tokio::test]
    async fn test_list_load_failure() {
        let env = TestEnv::new().await;
        env.repository()
            .fail(Operation::FetchTransactions, "Failed to fetch transactions");
        let err = list(&env.config(), env.repository(), &UserArgs::new(DEMO_USER))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unable to load the transactions"));
        assert_eq!(err.root_cause().to_string(), "Failed to fetch transactions");
    }

    #[tokio::test]
    async fn test_summary() {
        let env = TestEnv::new().await;
        let out = summary(&env.config(), env.repository(), &UserArgs::new(DEMO_USER))
            .await
            .unwrap();
        let totals = out.structure().unwrap();
        assert_eq!(totals.income, "+₹5,850.00");
        assert_eq!(totals.expenses, "-₹1,401.67");
        assert_eq!(totals.balance, "₹4,448.33");
        assert!(out.message().starts_with("Balance: ₹4,448.33"));
    }
}
