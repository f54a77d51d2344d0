use super::*;
use crate::api::{MemoryRepository, Operation};
use crate::model::{Amount, Category, NewTransaction, TransactionType};
use chrono::{TimeZone, Utc};
use std::str::FromStr;
use std::time::Duration;

fn user() -> UserId {
    UserId::from("u1")
}

fn txn(id: u64, title: &str, amount: &str, day: u32) -> Transaction {
    Transaction::new(
        id,
        user(),
        title,
        Amount::from_str(amount).unwrap(),
        Category::Other,
        Utc.with_ymd_and_hms(2025, 7, day, 12, 0, 0).unwrap(),
    )
}

fn sample() -> Vec<Transaction> {
    vec![
        txn(1, "Salary", "5000.00", 1),
        txn(2, "Rent", "-1200.00", 2),
        txn(3, "Groceries", "-87.43", 3),
        txn(4, "Bus pass", "-45.00", 5),
        txn(5, "Coffee", "-4.75", 8),
    ]
}

fn setup(transactions: Vec<Transaction>) -> (Arc<MemoryRepository>, LedgerStore) {
    setup_with(transactions, LedgerOptions::default())
}

fn setup_with(
    transactions: Vec<Transaction>,
    options: LedgerOptions,
) -> (Arc<MemoryRepository>, LedgerStore) {
    let repo = Arc::new(MemoryRepository::with_transactions(transactions));
    let store = LedgerStore::new(repo.clone(), user(), options);
    (repo, store)
}

fn draft(title: &str, amount: &str, kind: TransactionType) -> TransactionDraft {
    TransactionDraft::new(title, amount, kind, Some(Category::Other))
}

fn titles(store: &LedgerStore) -> Vec<String> {
    store
        .transactions()
        .iter()
        .map(|t| t.title().to_string())
        .collect()
}

#[tokio::test]
async fn test_load_orders_most_recent_first() {
    let (_, store) = setup(sample());
    assert_eq!(store.status(), Status::Idle);
    store.load().await.unwrap();
    assert_eq!(store.status(), Status::Ready);
    assert_eq!(
        titles(&store),
        vec!["Coffee", "Bus pass", "Groceries", "Rent", "Salary"]
    );
    let summary = store.summary();
    assert_eq!(summary.income(), Amount::from(5000));
    assert_eq!(summary.balance(), summary.income() + summary.expenses());
}

#[tokio::test]
async fn test_sequential_loads_yield_identical_state() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let first = (store.transactions(), store.summary());
    store.load().await.unwrap();
    assert_eq!(first, (store.transactions(), store.summary()));
    assert_eq!(repo.calls(Operation::FetchTransactions), 2);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_request() {
    let (repo, store) = setup(sample());
    repo.set_latency(Duration::from_millis(50));
    let (a, b) = tokio::join!(store.load(), store.load());
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(repo.calls(Operation::FetchTransactions), 1);
    assert_eq!(repo.calls(Operation::FetchSummary), 1);
    assert_eq!(store.transactions().len(), 5);

    // Once settled, the next load goes to the server again.
    store.load().await.unwrap();
    assert_eq!(repo.calls(Operation::FetchTransactions), 2);
}

#[tokio::test]
async fn test_refresh_joins_load_and_flags_refreshing() {
    let (repo, store) = setup(sample());
    repo.set_latency(Duration::from_millis(100));
    let observe = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        (store.status(), store.is_refreshing())
    };
    let (a, b, (status, refreshing)) = tokio::join!(store.load(), store.refresh(), observe);
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(status, Status::Loading);
    assert!(refreshing);
    assert!(!store.is_refreshing());
    assert_eq!(repo.calls(Operation::FetchTransactions), 1);
    assert_eq!(repo.calls(Operation::FetchSummary), 1);
}

#[tokio::test]
async fn test_concurrent_load_failure_reaches_every_caller() {
    let (repo, store) = setup(sample());
    repo.set_latency(Duration::from_millis(30));
    repo.fail(Operation::FetchTransactions, "Service unavailable");
    let (a, b) = tokio::join!(store.load(), store.refresh());
    assert_eq!(a, b);
    assert_eq!(a.unwrap_err().to_string(), "Service unavailable");
    assert_eq!(repo.calls(Operation::FetchTransactions), 1);
}

#[tokio::test]
async fn test_failed_load_keeps_previous_data() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let before = (store.transactions(), store.summary());

    repo.fail(Operation::FetchTransactions, "offline");
    let err = store.load().await.unwrap_err();
    assert!(err.is_repository());
    assert_eq!(store.status(), Status::Error);
    assert_eq!(store.last_error().unwrap().action(), Action::Load);
    assert_eq!(before, (store.transactions(), store.summary()));

    repo.recover(Operation::FetchTransactions);
    store.refresh().await.unwrap();
    assert_eq!(store.status(), Status::Ready);
    assert!(store.last_error().is_none());
}

#[tokio::test]
async fn test_summary_failure_fails_the_load() {
    let (repo, store) = setup(sample());
    repo.fail(Operation::FetchSummary, "Failed to fetch summary");
    let err = store.load().await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch summary");
    assert_eq!(store.status(), Status::Error);
    assert!(store.transactions().is_empty());
}

#[tokio::test]
async fn test_summary_fallback_aggregates_locally() {
    let (repo, store) = setup_with(
        sample(),
        LedgerOptions {
            summary_fallback: true,
        },
    );
    repo.fail(Operation::FetchSummary, "Failed to fetch summary");
    store.load().await.unwrap();
    assert_eq!(store.status(), Status::Ready);
    assert_eq!(store.summary(), aggregate(&store.transactions()));
}

#[tokio::test]
async fn test_coffee_then_salary() {
    let (_, store) = setup(vec![txn(1, "Coffee", "-50", 4)]);
    store.load().await.unwrap();
    assert_eq!(
        store.summary(),
        Summary::new(Amount::ZERO, Amount::from(-50), Amount::from(-50))
    );

    let created = store
        .create(&draft("Salary", "5000", TransactionType::Income))
        .await
        .unwrap();
    assert_eq!(created.amount(), Amount::from(5000));
    assert_eq!(titles(&store), vec!["Salary", "Coffee"]);
    assert_eq!(
        store.summary(),
        Summary::new(Amount::from(5000), Amount::from(-50), Amount::from(4950))
    );
}

#[tokio::test]
async fn test_create_expense_is_negated() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let created = store
        .create(&draft("Tea", "2.50", TransactionType::Expense))
        .await
        .unwrap();
    assert_eq!(created.amount(), -Amount::from_str("2.50").unwrap());
    assert_eq!(repo.stored(&user())[0], created);
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_the_server() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let calls = repo.total_calls();
    let revision = store.revision();

    for bad in [
        draft("   ", "10", TransactionType::Expense),
        draft("Bus", "0", TransactionType::Expense),
        draft("Bus", "-3", TransactionType::Income),
        draft("Bus", "abc", TransactionType::Expense),
        TransactionDraft::new("Bus", "10", TransactionType::Expense, None),
    ] {
        let err = store.create(&bad).await.unwrap_err();
        assert!(err.is_validation(), "{bad:?}");
    }
    assert_eq!(repo.total_calls(), calls);
    assert_eq!(store.revision(), revision);
    assert_eq!(store.status(), Status::Ready);
}

#[tokio::test]
async fn test_failed_create_leaves_state_unchanged() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let before = (store.transactions(), store.summary());

    repo.fail(Operation::Create, "Failed to create transaction");
    let attempt = draft("Lunch", "12", TransactionType::Expense);
    let err = store.create(&attempt).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to create transaction");
    assert_eq!(before, (store.transactions(), store.summary()));
    assert_eq!(store.status(), Status::Error);
    assert_eq!(store.last_error().unwrap().action(), Action::Create);

    // The same draft can be submitted again.
    repo.recover(Operation::Create);
    store.create(&attempt).await.unwrap();
    assert_eq!(store.status(), Status::Ready);
    assert_eq!(store.transactions().len(), 6);
}

#[tokio::test]
async fn test_create_then_delete_restores_state() {
    let (_, store) = setup(sample());
    store.load().await.unwrap();
    let before = (store.transactions(), store.summary());

    let created = store
        .create(&draft("Movie", "24.50", TransactionType::Expense))
        .await
        .unwrap();
    assert!(store.delete(created.id()).await.unwrap());
    assert_eq!(before, (store.transactions(), store.summary()));
}

#[tokio::test]
async fn test_delete_is_applied_before_the_server_answers() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    repo.set_latency(Duration::from_millis(50));
    let id = TransactionId::from(3);
    let observe = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        (store.transactions().len(), store.summary().expenses())
    };
    let (deleted, (len, expenses)) = tokio::join!(store.delete(&id), observe);
    assert!(deleted.unwrap());
    assert_eq!(len, 4);
    assert_eq!(expenses, Amount::from_str("-1249.75").unwrap());
    assert!(repo.stored(&user()).iter().all(|t| t.id() != &id));
}

#[tokio::test]
async fn test_failed_delete_restores_position_and_summary() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let before = (store.transactions(), store.summary());

    repo.fail(Operation::Delete, "Server unavailable");
    let err = store.delete(&TransactionId::from(3)).await.unwrap_err();
    assert_eq!(err.to_string(), "Server unavailable");
    assert_eq!(before, (store.transactions(), store.summary()));
    assert_eq!(store.status(), Status::Error);
    assert_eq!(store.last_error().unwrap().action(), Action::Delete);
}

#[tokio::test]
async fn test_concurrent_failed_deletes_roll_back_independently() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let before = store.transactions();

    repo.set_latency(Duration::from_millis(20));
    repo.fail(Operation::Delete, "Server unavailable");
    let (id2, id4) = (TransactionId::from(2), TransactionId::from(4));
    let (a, b) = tokio::join!(store.delete(&id2), store.delete(&id4));
    assert!(a.is_err() && b.is_err());
    assert_eq!(before, store.transactions());
    assert_eq!(store.summary(), aggregate(&before));
}

#[tokio::test]
async fn test_delete_confirmed_after_overlapping_load() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    repo.set_latency(Duration::from_millis(50));
    let id = TransactionId::from(3);
    let delete = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.delete(&id).await
    };
    let (loaded, deleted) = tokio::join!(store.load(), delete);
    loaded.unwrap();
    assert!(deleted.unwrap());

    let server = repo.stored(&user());
    assert_eq!(store.transactions(), server);
    assert_eq!(store.summary(), aggregate(&server));
    assert_eq!(store.status(), Status::Ready);
}

#[tokio::test]
async fn test_delete_absent_id_is_a_no_op() {
    let (repo, store) = setup(sample());
    store.load().await.unwrap();
    let revision = store.revision();
    assert!(!store.delete(&TransactionId::from(999)).await.unwrap());
    assert_eq!(repo.calls(Operation::Delete), 0);
    assert_eq!(store.revision(), revision);
}

#[tokio::test]
async fn test_teardown_drops_late_results() {
    let (repo, store) = setup(sample());
    repo.set_latency(Duration::from_millis(50));
    let close = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.teardown();
    };
    let (loaded, ()) = tokio::join!(store.load(), close);
    assert!(loaded.unwrap_err().is_state());
    assert!(store.transactions().is_empty());
    assert!(!store.is_active());

    assert!(store.load().await.unwrap_err().is_state());
    assert!(store
        .create(&draft("Tea", "1", TransactionType::Expense))
        .await
        .unwrap_err()
        .is_state());
    assert_eq!(repo.calls(Operation::FetchTransactions), 1);
    assert_eq!(repo.calls(Operation::Create), 0);
}

/// Answers every create with a transaction the ledger already holds.
struct DuplicateIds {
    inner: MemoryRepository,
}

#[async_trait::async_trait]
impl Repository for DuplicateIds {
    async fn fetch_transactions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        self.inner.fetch_transactions(user_id).await
    }

    async fn fetch_summary(&self, user_id: &UserId) -> Result<Summary, RepositoryError> {
        self.inner.fetch_summary(user_id).await
    }

    async fn create_transaction(
        &self,
        request: &NewTransaction,
    ) -> Result<Transaction, RepositoryError> {
        Ok(Transaction::new(
            1,
            request.user_id().clone(),
            request.title(),
            request.amount(),
            request.category().clone(),
            Utc::now(),
        ))
    }

    async fn delete_transaction(&self, id: &TransactionId) -> Result<(), RepositoryError> {
        self.inner.delete_transaction(id).await
    }
}

#[tokio::test]
async fn test_duplicate_id_resets_the_ledger() {
    let repo = Arc::new(DuplicateIds {
        inner: MemoryRepository::with_transactions(sample()),
    });
    let store = LedgerStore::new(repo, user(), LedgerOptions::default());
    store.load().await.unwrap();

    let err = store
        .create(&draft("Tea", "1", TransactionType::Expense))
        .await
        .unwrap_err();
    assert!(err.is_state());
    assert_eq!(store.status(), Status::Idle);
    assert!(store.transactions().is_empty());
    assert_eq!(store.summary(), Summary::default());

    store.load().await.unwrap();
    assert_eq!(store.transactions().len(), 5);
}

#[tokio::test]
async fn test_failed_delete_after_reset_waits_for_reload() {
    let repo = Arc::new(DuplicateIds {
        inner: MemoryRepository::with_transactions(sample()),
    });
    let store = LedgerStore::new(repo.clone(), user(), LedgerOptions::default());
    store.load().await.unwrap();

    repo.inner.set_latency(Duration::from_millis(50));
    repo.inner.fail(Operation::Delete, "Server unavailable");
    let id = TransactionId::from(3);
    let create = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store
            .create(&draft("Tea", "1", TransactionType::Expense))
            .await
    };
    let (deleted, created) = tokio::join!(store.delete(&id), create);
    assert!(created.unwrap_err().is_state());
    assert!(deleted.unwrap_err().is_repository());
    assert_eq!(store.status(), Status::Idle);
    assert!(store.transactions().is_empty());
    assert_eq!(store.summary(), Summary::default());

    repo.inner.set_latency(Duration::ZERO);
    store.load().await.unwrap();
    assert_eq!(store.transactions().len(), 5);
    assert_eq!(store.status(), Status::Ready);
}

#[tokio::test]
async fn test_subscribers_see_revisions() {
    let (_, store) = setup(sample());
    let mut rx = store.subscribe();
    assert!(!rx.has_changed().unwrap());
    store.load().await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), store.revision());
}
