//! The data held by a ledger and the transitions between its states. Nothing here is async or
//! locked; `LedgerStore` owns a `State` behind a mutex and applies these transitions atomically.

use crate::error::{LedgerError, LedgerResult, RepositoryError};
use crate::model::{aggregate, Summary, Transaction, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a ledger is in its lifecycle.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Nothing has been loaded yet, or the ledger was reset.
    #[default]
    Idle,
    /// A load or refresh is in flight.
    Loading,
    /// Data is loaded and the last operation succeeded.
    Ready,
    /// The last load failed or the last mutation was rolled back. Data may still be present.
    Error,
}

serde_plain::derive_display_from_serialize!(Status);

/// The ledger operations that can fail and leave the ledger in `Status::Error`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Load,
    Create,
    Delete,
}

serde_plain::derive_display_from_serialize!(Action);

/// The failure behind an `Error` status.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Failure {
    action: Action,
    error: LedgerError,
}

impl Failure {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn error(&self) -> &LedgerError {
        &self.error
    }
}

#[derive(Debug)]
pub(super) struct State {
    pub(super) transactions: Vec<Transaction>,
    pub(super) summary: Summary,
    pub(super) revision: u64,
    pub(super) active: bool,
    /// Bumped whenever the collection is replaced wholesale, by a load or a reset.
    epoch: u64,
    loaded: bool,
    loading: bool,
    refreshing: bool,
    load_error: Option<LedgerError>,
    mutation_error: Option<Failure>,
    /// Mutations confirmed while a load is in flight. The load may have read the server before
    /// they reached it, so they are applied again on top of its result.
    created_during_load: Vec<Transaction>,
    deleted_during_load: HashSet<TransactionId>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            summary: Summary::default(),
            revision: 0,
            active: true,
            epoch: 0,
            loaded: false,
            loading: false,
            refreshing: false,
            load_error: None,
            mutation_error: None,
            created_during_load: Vec::new(),
            deleted_during_load: HashSet::new(),
        }
    }
}

impl State {
    pub(super) fn status(&self) -> Status {
        if self.loading {
            Status::Loading
        } else if self.load_error.is_some() || self.mutation_error.is_some() {
            Status::Error
        } else if self.loaded {
            Status::Ready
        } else {
            Status::Idle
        }
    }

    pub(super) fn is_refreshing(&self) -> bool {
        self.loading && self.refreshing
    }

    /// The most recent failure that has not been cleared by a later success.
    pub(super) fn failure(&self) -> Option<Failure> {
        self.mutation_error.clone().or_else(|| {
            self.load_error.clone().map(|error| Failure {
                action: Action::Load,
                error,
            })
        })
    }

    pub(super) fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(super) fn position(&self, id: &TransactionId) -> Option<usize> {
        self.transactions.iter().position(|t| t.id() == id)
    }

    pub(super) fn begin_load(&mut self, refreshing: bool) {
        self.loading = true;
        self.refreshing = refreshing;
        self.created_during_load.clear();
        self.deleted_during_load.clear();
        self.touch();
    }

    /// A refresh that joins a load already in flight still shows the refreshing indicator.
    pub(super) fn mark_refreshing(&mut self) {
        if self.loading && !self.refreshing {
            self.refreshing = true;
            self.touch();
        }
    }

    /// Replaces the collection and summary together. Creates and deletes confirmed while the
    /// load was in flight are applied on top, in which case the summary is recomputed.
    pub(super) fn finish_load(&mut self, mut transactions: Vec<Transaction>, summary: Summary) {
        let fetched = transactions.len();
        transactions.retain(|t| !self.deleted_during_load.contains(t.id()));
        let mut adjusted = transactions.len() != fetched;
        for created in self.created_during_load.drain(..) {
            if transactions.iter().all(|t| t.id() != created.id()) {
                let ix = transactions.partition_point(|t| t.created_at() > created.created_at());
                transactions.insert(ix, created);
                adjusted = true;
            }
        }
        self.deleted_during_load.clear();
        self.summary = if adjusted {
            aggregate(&transactions)
        } else {
            summary
        };
        self.transactions = transactions;
        self.epoch += 1;
        self.loaded = true;
        self.loading = false;
        self.refreshing = false;
        self.load_error = None;
        self.mutation_error = None;
        self.touch();
    }

    /// Records a failure. A failed load keeps whatever data was already there.
    pub(super) fn fail(&mut self, action: Action, error: LedgerError) {
        match action {
            Action::Load => {
                self.loading = false;
                self.refreshing = false;
                self.created_during_load.clear();
                self.deleted_during_load.clear();
                self.load_error = Some(error);
                self.mutation_error = None;
            }
            Action::Create | Action::Delete => {
                self.mutation_error = Some(Failure { action, error });
            }
        }
        self.touch();
    }

    /// A successful mutation clears an earlier mutation failure but not a load failure.
    pub(super) fn mutation_succeeded(&mut self) {
        self.mutation_error = None;
        self.touch();
    }

    /// Inserts a server-confirmed transaction at its place in the most-recent-first order and
    /// recomputes the summary.
    ///
    /// # Errors
    /// - `LedgerError::State` if a transaction with the same id is already present. The state is
    ///   left untouched; the caller is expected to `reset`.
    pub(super) fn insert_created(&mut self, created: Transaction) -> LedgerResult<()> {
        if self.position(created.id()).is_some() {
            return Err(LedgerError::state(format!(
                "transaction '{}' is already in the ledger",
                created.id()
            )));
        }
        let ix = self
            .transactions
            .partition_point(|t| t.created_at() > created.created_at());
        if self.loading {
            self.created_during_load.push(created.clone());
        }
        self.transactions.insert(ix, created);
        self.summary = aggregate(&self.transactions);
        self.touch();
        Ok(())
    }

    /// Applies a delete the server has confirmed. A load that read the server before the delete
    /// reached it may have brought the transaction back, so it is removed again if present.
    pub(super) fn confirm_delete(&mut self, id: &TransactionId) {
        if let Some(ix) = self.position(id) {
            self.transactions.remove(ix);
            self.summary = aggregate(&self.transactions);
        }
        if self.loading {
            self.created_during_load.retain(|t| t.id() != id);
            self.deleted_during_load.insert(id.clone());
        }
        self.mutation_succeeded();
    }

    /// Optimistically removes the transaction at `ix` and recomputes the summary. The returned
    /// `Rollback` undoes this if the server refuses the delete.
    pub(super) fn remove(&mut self, ix: usize) -> Rollback {
        let snapshot = self.transactions.clone();
        let summary = self.summary;
        self.transactions.remove(ix);
        self.summary = aggregate(&self.transactions);
        self.touch();
        Rollback {
            snapshot,
            summary,
            index: ix,
            revision: self.revision,
            epoch: self.epoch,
        }
    }

    /// Drops all data and returns to `Idle`. Used when the ledger can no longer trust its own
    /// contents.
    pub(super) fn reset(&mut self) {
        let revision = self.revision;
        let active = self.active;
        let epoch = self.epoch + 1;
        *self = State {
            revision,
            active,
            epoch,
            ..State::default()
        };
        self.touch();
    }

    pub(super) fn close(&mut self) {
        self.active = false;
        self.loading = false;
        self.refreshing = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Everything needed to put back a transaction removed by an optimistic delete.
#[derive(Debug)]
pub(super) struct Rollback {
    snapshot: Vec<Transaction>,
    summary: Summary,
    index: usize,
    revision: u64,
    epoch: u64,
}

impl Rollback {
    pub(super) fn removed(&self) -> &Transaction {
        &self.snapshot[self.index]
    }

    /// Restores the removed transaction.
    ///
    /// If nothing changed since the removal, the snapshot is restored as it was, summary included.
    /// Otherwise the transaction is reinserted in front of the nearest transaction that followed it
    /// in the snapshot and is still present, and the summary is recomputed.
    ///
    /// Returns `false` without touching the state if the collection was replaced since the removal
    /// by a load or a reset. A load already reflects the server and a reset waits for one.
    pub(super) fn apply(self, state: &mut State) -> bool {
        if state.epoch != self.epoch {
            return false;
        }
        if state.revision == self.revision {
            state.transactions = self.snapshot;
            state.summary = self.summary;
            state.touch();
            return true;
        }
        if state.position(self.removed().id()).is_some() {
            return true;
        }
        let ix = self.snapshot[self.index + 1..]
            .iter()
            .find_map(|successor| state.position(successor.id()))
            .unwrap_or(state.transactions.len());
        let mut snapshot = self.snapshot;
        let removed = snapshot.swap_remove(self.index);
        state.transactions.insert(ix, removed);
        state.summary = aggregate(&state.transactions);
        state.touch();
        true
    }
}

/// Puts a freshly fetched collection into most-recent-first order.
///
/// # Errors
/// - `LedgerError::Repository` if two transactions share an id.
pub(super) fn prepare(mut transactions: Vec<Transaction>) -> LedgerResult<Vec<Transaction>> {
    {
        let mut seen = HashSet::with_capacity(transactions.len());
        if let Some(dup) = transactions.iter().find(|t| !seen.insert(t.id())) {
            return Err(RepositoryError::new(format!(
                "Received more than one transaction with id '{}'",
                dup.id()
            ))
            .into());
        }
    }
    transactions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(transactions)
}
