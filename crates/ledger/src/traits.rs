//! Ledger abstraction consumed by the reducer.
//!
//! The ledger owns an account's action state and its two reducer pointers.
//! Dispatch is append-only; consumption reads the pointers as a precondition
//! and writes them back through [`ActionLedger::commit_pointers`].

use async_trait::async_trait;
use zk::Fp254;

use crate::types::{AccountId, AccountView, ActionPage, PointerUpdate, RawUpdate, ReducerPointers};

/// Page size used by [`ActionLedger::fetch_pending_actions`].
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Errors surfaced by ledger implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("fetching actions failed: {0}")]
    FetchFailed(String),

    #[error("pointer precondition failed: expected {expected:?}, found {actual:?}")]
    PreconditionFailed {
        expected: ReducerPointers,
        actual: ReducerPointers,
    },

    #[error("ledger lock was poisoned")]
    LockPoisoned,

    #[error("invalid page request: {0}")]
    InvalidPage(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[async_trait]
pub trait ActionLedger: Send + Sync {
    /// Current action state of the account.
    async fn read_action_state(&self, account: &AccountId) -> Result<Fp254>;

    /// Current `(processed_action_state, stack)` pair.
    async fn read_pointers(&self, account: &AccountId) -> Result<ReducerPointers>;

    /// Recent action states a prepared batch may still be anchored to.
    ///
    /// Default: only the current one.
    async fn recent_action_states(&self, account: &AccountId) -> Result<Vec<Fp254>> {
        Ok(vec![self.read_action_state(account).await?])
    }

    /// Read the full precondition snapshot.
    async fn read_view(&self, account: &AccountId) -> Result<AccountView> {
        let action_state = self.read_action_state(account).await?;
        let mut recent_action_states = self.recent_action_states(account).await?;
        if !recent_action_states.contains(&action_state) {
            recent_action_states.push(action_state);
        }
        let pointers = self.read_pointers(account).await?;
        Ok(AccountView {
            action_state,
            recent_action_states,
            pointers,
        })
    }

    /// Up to `limit` updates appended after `from_state`, oldest first.
    async fn fetch_action_page(
        &self,
        account: &AccountId,
        from_state: Fp254,
        limit: usize,
    ) -> Result<ActionPage>;

    /// Every update appended after `from_state`, following pages until exhausted.
    async fn fetch_pending_actions(
        &self,
        account: &AccountId,
        from_state: Fp254,
    ) -> Result<Vec<RawUpdate>> {
        let mut updates = Vec::new();
        let mut cursor = from_state;
        loop {
            let page = self
                .fetch_action_page(account, cursor, DEFAULT_PAGE_LIMIT)
                .await?;
            let has_more = page.has_more;
            if has_more && page.updates.is_empty() {
                return Err(LedgerError::InvalidPage(
                    "page reports more updates but returned none".to_string(),
                ));
            }
            cursor = page.end_state;
            updates.extend(page.updates);
            if !has_more {
                return Ok(updates);
            }
        }
    }

    /// Append one update; returns the new action state.
    ///
    /// An update with no actions leaves the action state unchanged.
    async fn append_actions(&self, account: &AccountId, actions: RawUpdate) -> Result<Fp254>;

    /// Install `update.new` iff the pointers still equal `update.expected`.
    async fn commit_pointers(&self, update: &PointerUpdate) -> Result<()>;
}
