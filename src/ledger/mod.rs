//! The ledger store: an in-memory copy of one user's transactions and summary, kept consistent
//! with the remote store across concurrent loads, creates and deletes.
//!
//! - Loads and refreshes coalesce onto a single in-flight request per resource.
//! - Creates are applied only after the server confirms them.
//! - Deletes are applied immediately and rolled back if the server refuses them.
//!
//! Every state change bumps a revision number that is published on a `watch` channel so that a
//! UI can re-render.

mod state;

pub use state::{Action, Failure, Status};

use crate::api::Repository;
use crate::error::{LedgerError, LedgerResult, RepositoryError};
use crate::model::{aggregate, Summary, Transaction, TransactionDraft, TransactionId, UserId};
use crate::Config;
use futures::future::{BoxFuture, FutureExt, Shared};
use state::{prepare, State};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, warn};

const CLOSED: &str = "the ledger has been closed";

type SharedLoad = Shared<BoxFuture<'static, LedgerResult<()>>>;

/// Settings that change how a ledger reconciles with the remote store.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct LedgerOptions {
    /// When only the summary request fails, finish the load with a locally aggregated summary
    /// instead of failing it.
    pub summary_fallback: bool,
}

impl From<&Config> for LedgerOptions {
    fn from(config: &Config) -> Self {
        Self {
            summary_fallback: config.summary_fallback(),
        }
    }
}

/// The ledger of one signed-in user. Cloning is cheap and every clone refers to the same ledger.
#[derive(Clone)]
pub struct LedgerStore {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Arc<dyn Repository>,
    user_id: UserId,
    options: LedgerOptions,
    state: Mutex<State>,
    pending_load: Mutex<Option<SharedLoad>>,
    revision: watch::Sender<u64>,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("LedgerStore")
            .field("user_id", &self.inner.user_id)
            .field("status", &state.status())
            .field("transactions", &state.transactions.len())
            .field("revision", &state.revision)
            .finish()
    }
}

impl LedgerStore {
    pub fn new(repository: Arc<dyn Repository>, user_id: UserId, options: LedgerOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                repository,
                user_id,
                options,
                state: Mutex::new(State::default()),
                pending_load: Mutex::new(None),
                revision,
            }),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Fetches the transactions and the summary and replaces the local copy with them.
    ///
    /// Concurrent calls (including `refresh`) share one in-flight request per resource and all
    /// receive its outcome.
    ///
    /// # Errors
    /// - `LedgerError::Repository` if either request fails. Previously loaded data is kept.
    /// - `LedgerError::State` if the ledger has been closed.
    pub async fn load(&self) -> LedgerResult<()> {
        self.join_load(false)?.await
    }

    /// Same as `load`, but flags the ledger as refreshing while the request is in flight.
    pub async fn refresh(&self) -> LedgerResult<()> {
        self.join_load(true)?.await
    }

    /// Validates `draft` and asks the remote store to create it. The local copy changes only once
    /// the server has confirmed the new transaction. The draft is left untouched so that a failed
    /// attempt can be retried.
    ///
    /// # Errors
    /// - `LedgerError::Validation` if the draft is invalid. The network is not contacted.
    /// - `LedgerError::Repository` if the request fails. Local state is unchanged.
    /// - `LedgerError::State` if the server returns an id that is already present, in which case
    ///   the ledger is reset to `Status::Idle`, or if the ledger has been closed.
    pub async fn create(&self, draft: &TransactionDraft) -> LedgerResult<Transaction> {
        self.inner.ensure_active()?;
        let request = draft.validate(&self.inner.user_id)?;
        let result = self.inner.repository.create_transaction(&request).await;

        let mut state = self.inner.lock_state();
        if !state.active {
            debug!("Dropping the result of a create for a closed ledger");
            return Err(LedgerError::state(CLOSED));
        }
        let created = match result {
            Ok(created) => created,
            Err(e) => {
                warn!("Unable to create transaction '{}': {e}", request.title());
                state.fail(Action::Create, e.clone().into());
                self.inner.publish(&state);
                return Err(e.into());
            }
        };
        if let Err(e) = state.insert_created(created.clone()) {
            error!("{e}. Resetting the ledger for user '{}'", self.inner.user_id);
            state.reset();
            self.inner.publish(&state);
            return Err(e);
        }
        state.mutation_succeeded();
        debug!("Created transaction {}", created.id());
        self.inner.publish(&state);
        Ok(created)
    }

    /// Removes the transaction with `id` right away, then asks the remote store to delete it. If
    /// the server refuses, the transaction is put back where it was, unless a load or a reset has
    /// replaced the collection in the meantime. Once confirmed, the transaction is removed again
    /// if an overlapping load brought it back.
    ///
    /// Returns `Ok(false)` without contacting the server when `id` is not in the ledger.
    ///
    /// # Errors
    /// - `LedgerError::Repository` if the request fails, after the rollback has been applied.
    /// - `LedgerError::State` if the ledger has been closed.
    pub async fn delete(&self, id: &TransactionId) -> LedgerResult<bool> {
        let rollback = {
            let mut state = self.inner.lock_state();
            if !state.active {
                return Err(LedgerError::state(CLOSED));
            }
            let Some(ix) = state.position(id) else {
                debug!("Transaction {id} is not in the ledger, nothing to delete");
                return Ok(false);
            };
            let rollback = state.remove(ix);
            self.inner.publish(&state);
            rollback
        };

        let result = self.inner.repository.delete_transaction(id).await;

        let mut state = self.inner.lock_state();
        if !state.active {
            debug!("Dropping the result of a delete for a closed ledger");
            return Err(LedgerError::state(CLOSED));
        }
        match result {
            Ok(()) => {
                state.confirm_delete(id);
                debug!("Deleted transaction {id}");
                self.inner.publish(&state);
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Unable to delete transaction {id} ('{}'), restoring it: {e}",
                    rollback.removed().title()
                );
                let restored = rollback.apply(&mut state);
                if restored || state.is_loaded() {
                    state.fail(Action::Delete, e.clone().into());
                } else {
                    debug!("The ledger was reset while deleting {id}, leaving it to the next load");
                }
                self.inner.publish(&state);
                Err(e.into())
            }
        }
    }

    /// Closes the ledger. Results of requests still in flight are dropped and new operations
    /// fail with `LedgerError::State`.
    pub fn teardown(&self) {
        let mut state = self.inner.lock_state();
        if state.active {
            debug!("Closing the ledger for user '{}'", self.inner.user_id);
            state.close();
            self.inner.publish(&state);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock_state().active
    }

    pub fn status(&self) -> Status {
        self.inner.lock_state().status()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_state().is_refreshing()
    }

    /// The most recent failure, if the ledger is in `Status::Error`.
    pub fn last_error(&self) -> Option<Failure> {
        self.inner.lock_state().failure()
    }

    /// A copy of the transactions, most-recent-first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock_state().transactions.clone()
    }

    pub fn summary(&self) -> Summary {
        self.inner.lock_state().summary
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock_state().revision
    }

    /// Returns a receiver that sees the revision number change whenever the ledger changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Reads several parts of the state under one lock so that they are consistent with each
    /// other.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&LedgerRead<'_>) -> T) -> T {
        let state = self.inner.lock_state();
        f(&LedgerRead { state: &*state })
    }

    /// Returns the in-flight load, starting one if there is none.
    fn join_load(&self, refreshing: bool) -> LedgerResult<SharedLoad> {
        let mut pending = lock(&self.inner.pending_load);
        {
            let mut state = self.inner.lock_state();
            if !state.active {
                return Err(LedgerError::state(CLOSED));
            }
            if let Some(load) = pending.as_ref() {
                debug!("Joining the load already in flight");
                if refreshing {
                    state.mark_refreshing();
                    self.inner.publish(&state);
                }
                return Ok(load.clone());
            }
            debug!(
                "{} the ledger for user '{}'",
                if refreshing { "Refreshing" } else { "Loading" },
                self.inner.user_id
            );
            state.begin_load(refreshing);
            self.inner.publish(&state);
        }

        let inner = Arc::clone(&self.inner);
        let load = async move {
            let outcome = inner.fetch_and_apply().await;
            *lock(&inner.pending_load) = None;
            outcome
        }
        .boxed()
        .shared();
        *pending = Some(load.clone());
        Ok(load)
    }
}

/// A consistent view of the ledger's state, used by the view layer.
pub(crate) struct LedgerRead<'a> {
    state: &'a State,
}

impl LedgerRead<'_> {
    pub(crate) fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    pub(crate) fn summary(&self) -> Summary {
        self.state.summary
    }

    pub(crate) fn status(&self) -> Status {
        self.state.status()
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.state.is_refreshing()
    }

    pub(crate) fn failure(&self) -> Option<Failure> {
        self.state.failure()
    }

    pub(crate) fn revision(&self) -> u64 {
        self.state.revision
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    fn ensure_active(&self) -> LedgerResult<()> {
        if self.lock_state().active {
            Ok(())
        } else {
            Err(LedgerError::state(CLOSED))
        }
    }

    fn publish(&self, state: &State) {
        self.revision.send_replace(state.revision);
    }

    /// Requests both resources at the same time and applies them together.
    async fn fetch_and_apply(&self) -> LedgerResult<()> {
        let (transactions, summary) = futures::join!(
            self.repository.fetch_transactions(&self.user_id),
            self.repository.fetch_summary(&self.user_id),
        );
        let fetched = self.reconcile(transactions, summary);

        let mut state = self.lock_state();
        if !state.active {
            debug!("Dropping the result of a load for a closed ledger");
            return Err(LedgerError::state(CLOSED));
        }
        let outcome = match fetched {
            Ok((transactions, summary)) => {
                debug!(
                    "Loaded {} transactions for user '{}'",
                    transactions.len(),
                    self.user_id
                );
                state.finish_load(transactions, summary);
                Ok(())
            }
            Err(e) => {
                warn!("Unable to load the ledger for user '{}': {e}", self.user_id);
                state.fail(Action::Load, e.clone());
                Err(e)
            }
        };
        self.publish(&state);
        outcome
    }

    fn reconcile(
        &self,
        transactions: Result<Vec<Transaction>, RepositoryError>,
        summary: Result<Summary, RepositoryError>,
    ) -> LedgerResult<(Vec<Transaction>, Summary)> {
        let transactions = prepare(transactions?)?;
        match summary {
            Ok(summary) => Ok((transactions, summary.normalized())),
            Err(e) if self.options.summary_fallback => {
                warn!("Unable to fetch the summary, computing it locally: {e}");
                let summary = aggregate(&transactions);
                Ok((transactions, summary))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
