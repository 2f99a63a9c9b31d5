//! Interaction state of one shopper's cart screen.
//!
//! ```text
//! Idle --load--> Loaded --toggle/delete--> Loaded --commit--> Committing
//! Committing --ok--> Idle (cleared)
//! Committing --err--> Loaded (selection kept, error recorded)
//! ```
//!
//! Commit is split into [`CheckoutSession::begin_commit`] and
//! [`CheckoutSession::finish_commit`] so [`Sessions`] can release its lock
//! during the remote call; the `Committing` state is the in-flight flag that
//! turns away a second submission and any reload of the same cart.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::sync::Mutex;

use super::{
    cart_service,
    checkout_service::{self, CommitReceipt},
    store::DocumentStore,
};
use crate::{
    error::{CheckoutError, Result},
    models::{LineItem, Selection, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Loaded,
    Committing,
}

/// Snapshot handed to the committer while the session is `Committing`.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub items: Vec<LineItem>,
    pub selection: Selection,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    state: SessionState,
    items: Vec<LineItem>,
    selection: Selection,
    last_error: Option<String>,
}

impl CheckoutSession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn in_flight(&self) -> bool {
        self.state == SessionState::Committing
    }

    /// Whether the checkout control should be enabled.
    pub fn can_commit(&self) -> bool {
        self.state == SessionState::Loaded && !self.selection.is_empty()
    }

    fn ensure_loaded(&self) -> Result<()> {
        match self.state {
            SessionState::Idle => Err(CheckoutError::NotLoaded),
            SessionState::Committing => Err(CheckoutError::CommitInFlight),
            SessionState::Loaded => Ok(()),
        }
    }

    /// Installs a freshly loaded cart with an empty selection.
    pub fn replace_items(&mut self, items: Vec<LineItem>) -> Result<()> {
        if self.in_flight() {
            return Err(CheckoutError::CommitInFlight);
        }
        self.items = items;
        self.selection = Selection::new();
        self.last_error = None;
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Only loaded entries can be selected.
    pub fn toggle(&mut self, entry_id: &str) -> Result<bool> {
        self.check_entry(entry_id)?;
        Ok(self.selection.toggle(entry_id))
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.selection.clear();
        Ok(())
    }

    /// Fails unless `entry_id` is loaded and the session accepts edits.
    pub fn check_entry(&self, entry_id: &str) -> Result<()> {
        self.ensure_loaded()?;
        if !self.items.iter().any(|it| it.entry_id == entry_id) {
            return Err(CheckoutError::UnknownEntry(entry_id.to_string()));
        }
        Ok(())
    }

    /// Local half of a delete: drops the line and its selection mark.
    pub fn remove_entry(&mut self, entry_id: &str) {
        self.items.retain(|it| it.entry_id != entry_id);
        self.selection.retain_loaded(&self.items);
    }

    pub fn record_error(&mut self, e: &CheckoutError) {
        self.last_error = Some(e.to_string());
    }

    /// Enters `Committing`. `Ok(None)` means there is nothing to commit and
    /// the session is left untouched.
    pub fn begin_commit(&mut self) -> Result<Option<CommitPlan>> {
        self.ensure_loaded()?;
        if self.selection.is_empty() {
            return Ok(None);
        }

        self.state = SessionState::Committing;
        Ok(Some(CommitPlan {
            items: self.items.clone(),
            selection: self.selection.clone(),
        }))
    }

    pub fn finish_commit(&mut self, outcome: &Result<CommitReceipt>) {
        if self.state != SessionState::Committing {
            return;
        }

        match outcome {
            Ok(_) => {
                self.items.clear();
                self.selection.clear();
                self.last_error = None;
                self.state = SessionState::Idle;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.state = SessionState::Loaded;
            }
        }
    }
}

/// Every signed-in user's cart screen. The lock is only held for state
/// transitions, never across a store call.
#[derive(Debug, Clone, Default)]
pub struct Sessions {
    inner: Arc<Mutex<HashMap<UserId, CheckoutSession>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the user's session, if the cart was ever opened.
    pub async fn snapshot(&self, user_id: &UserId) -> Option<CheckoutSession> {
        self.inner.lock().await.get(user_id).cloned()
    }

    /// Runs a synchronous transition on a session that already exists.
    pub async fn update<T>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&mut CheckoutSession) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(user_id).ok_or(CheckoutError::NotLoaded)?;
        f(session)
    }

    /// Screen entry: fresh items, fresh selection. Refused while a commit is
    /// running so the reload cannot reconcile that commit's writes.
    pub async fn load(&self, store: &dyn DocumentStore, user_id: &UserId) -> Result<CheckoutSession> {
        if self.inner.lock().await.get(user_id).is_some_and(CheckoutSession::in_flight) {
            return Err(CheckoutError::CommitInFlight);
        }

        let loaded = cart_service::load_cart(store, Some(user_id)).await;

        let mut sessions = self.inner.lock().await;
        let session = sessions.entry(user_id.clone()).or_default();
        match loaded {
            Ok(items) => {
                session.replace_items(items)?;
                Ok(session.clone())
            }
            Err(e) => {
                session.record_error(&e);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, store: &dyn DocumentStore, user_id: &UserId, entry_id: &str) -> Result<CheckoutSession> {
        self.update(user_id, |s| s.check_entry(entry_id)).await?;

        let outcome = cart_service::delete_entry(store, Some(user_id), entry_id).await;

        self.update(user_id, |s| match outcome {
            Ok(()) => {
                s.remove_entry(entry_id);
                Ok(s.clone())
            }
            Err(e) => {
                s.record_error(&e);
                Err(e)
            }
        })
        .await
    }

    /// `Ok(None)` when nothing is selected; the store is not touched then.
    pub async fn commit(&self, store: &dyn DocumentStore, user_id: &UserId) -> Result<Option<CommitReceipt>> {
        let Some(plan) = self.update(user_id, CheckoutSession::begin_commit).await? else {
            return Ok(None);
        };

        let outcome = checkout_service::commit(store, Some(user_id), &plan.items, &plan.selection).await;

        if let Some(session) = self.inner.lock().await.get_mut(user_id) {
            session.finish_commit(&outcome);
        }
        outcome.map(Some)
    }
}
