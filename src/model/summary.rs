//! The income/expense/balance summary and the aggregator that derives it.

use crate::model::{Amount, Transaction};
use serde::{Deserialize, Serialize};

/// Totals for a collection of transactions.
///
/// `expenses` is the signed sum of the negative amounts, so it is never positive, and
/// `balance == income + expenses`.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    #[serde(default)]
    pub(crate) income: Amount,
    #[serde(default)]
    pub(crate) expenses: Amount,
    #[serde(default)]
    pub(crate) balance: Amount,
}

impl Summary {
    pub fn new(income: Amount, expenses: Amount, balance: Amount) -> Self {
        Self {
            income,
            expenses,
            balance,
        }
    }

    pub fn income(&self) -> Amount {
        self.income
    }

    pub fn expenses(&self) -> Amount {
        self.expenses
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Some servers report expenses as a positive magnitude. This puts `expenses` into the signed
    /// form used everywhere else. `income` and `balance` are left as reported.
    pub fn normalized(self) -> Self {
        Self {
            expenses: -self.expenses.abs(),
            ..self
        }
    }
}

/// Computes the summary of `transactions` in a single pass.
///
/// ```
/// # use fintrack::model::{aggregate, Amount, Transaction};
/// let none: Vec<Transaction> = Vec::new();
/// let summary = aggregate(&none);
/// assert_eq!(summary.balance(), Amount::ZERO);
/// ```
pub fn aggregate<'a, I>(transactions: I) -> Summary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let (income, expenses) = transactions.into_iter().map(Transaction::amount).fold(
        (Amount::ZERO, Amount::ZERO),
        |(income, expenses), amount| {
            if amount.is_income() {
                (income + amount, expenses)
            } else if amount.is_expense() {
                (income, expenses + amount)
            } else {
                (income, expenses)
            }
        },
    );
    Summary::new(income, expenses, income + expenses)
}
