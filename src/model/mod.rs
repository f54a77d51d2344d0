//! Types that represent the core data model, such as `Transaction`, `Amount` and `Summary`.
mod amount;
mod category;
mod summary;
mod transaction;

pub use amount::{Amount, AmountError};
pub use category::Category;
pub use summary::{aggregate, Summary};
pub use transaction::{
    NewTransaction, Transaction, TransactionDraft, TransactionId, TransactionType, UserId,
};
