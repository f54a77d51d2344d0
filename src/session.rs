//! Ties the signed-in user to exactly one ledger.

use crate::api::Repository;
use crate::ledger::{LedgerOptions, LedgerStore};
use crate::model::UserId;
use crate::view::LedgerView;
use std::sync::Arc;
use tracing::debug;

/// Owns the ledger of whoever is signed in. A ledger is created when a user id becomes available
/// and torn down when the user id changes or goes away, so data never leaks from one user to
/// the next.
pub struct Session {
    repository: Arc<dyn Repository>,
    options: LedgerOptions,
    current: Option<LedgerView>,
}

impl Session {
    pub fn new(repository: Arc<dyn Repository>, options: LedgerOptions) -> Self {
        Self {
            repository,
            options,
            current: None,
        }
    }

    /// Returns the ledger for `user_id`. Signing in again as the current user keeps the existing
    /// ledger; signing in as someone else tears the old one down first.
    pub fn sign_in(&mut self, user_id: UserId) -> LedgerView {
        if let Some(view) = &self.current {
            if view.user_id() == &user_id {
                return view.clone();
            }
        }
        self.sign_out();
        debug!("Opening a ledger for user '{user_id}'");
        let store = LedgerStore::new(Arc::clone(&self.repository), user_id, self.options);
        let view = LedgerView::new(store);
        self.current = Some(view.clone());
        view
    }

    /// Tears down the current ledger, if any.
    pub fn sign_out(&mut self) {
        if let Some(view) = self.current.take() {
            view.store().teardown();
        }
    }

    /// Follows the identity provider: `Some` is a signed-in user, `None` is signed out.
    pub fn set_user(&mut self, user_id: Option<UserId>) -> Option<LedgerView> {
        match user_id {
            Some(user_id) => Some(self.sign_in(user_id)),
            None => {
                self.sign_out();
                None
            }
        }
    }

    pub fn current(&self) -> Option<&LedgerView> {
        self.current.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.sign_out();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("current", &self.current)
            .finish()
    }
}
