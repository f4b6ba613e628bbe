//! In-memory ledger for testing without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use zk::Fp254;
use zk::commitment::short_hex;

use crate::actions::{action_list_hash, empty_action_state, push_action_list};
use crate::traits::{ActionLedger, LedgerError, Result};
use crate::types::{AccountId, ActionPage, PointerUpdate, RawUpdate, ReducerPointers};

/// Number of past action states a batch may be anchored to.
pub const RECENT_ACTION_STATES: usize = 5;

#[derive(Debug, Clone)]
struct AppendedUpdate {
    actions: RawUpdate,
    state_after: Fp254,
}

#[derive(Debug, Clone)]
struct AccountRecord {
    history: Vec<AppendedUpdate>,
    action_state: Fp254,
    recent: VecDeque<Fp254>,
    pointers: ReducerPointers,
}

impl AccountRecord {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            action_state: empty_action_state(),
            recent: VecDeque::from([empty_action_state()]),
            pointers: ReducerPointers::initial(),
        }
    }

    /// Index of the first update appended after `state`.
    fn start_after(&self, state: Fp254) -> Option<usize> {
        if state == empty_action_state() {
            return Some(0);
        }
        self.history
            .iter()
            .position(|update| update.state_after == state)
            .map(|index| index + 1)
    }
}

/// Mock ledger simulating account action state in memory.
#[derive(Clone)]
pub struct InMemoryLedger {
    accounts: Arc<Mutex<HashMap<AccountId, AccountRecord>>>,
    page_size: usize,
    fetch_failure: Arc<Mutex<Option<String>>>,
    page_fetches: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            page_size: 16,
            fetch_failure: Arc::new(Mutex::new(None)),
            page_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cap every page at `page_size` updates (at least one).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register an account with empty action state and initial pointers.
    pub fn create_account(&self, account: &AccountId) -> Result<()> {
        self.lock_accounts()?
            .entry(account.clone())
            .or_insert_with(AccountRecord::new);
        Ok(())
    }

    /// Make the next page fetch fail with `message`.
    pub fn fail_next_fetch(&self, message: impl Into<String>) -> Result<()> {
        *self
            .fetch_failure
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)? = Some(message.into());
        Ok(())
    }

    /// Number of `fetch_action_page` calls served so far, across clones.
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    /// Overwrite the pointers without any precondition.
    pub fn force_pointers(&self, account: &AccountId, pointers: ReducerPointers) -> Result<()> {
        self.with_account(account, |record| {
            record.pointers = pointers;
            Ok(())
        })
    }

    fn lock_accounts(&self) -> Result<MutexGuard<'_, HashMap<AccountId, AccountRecord>>> {
        self.accounts.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    fn with_account<T>(
        &self,
        account: &AccountId,
        f: impl FnOnce(&mut AccountRecord) -> Result<T>,
    ) -> Result<T> {
        let mut accounts = self.lock_accounts()?;
        let record = accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))?;
        f(record)
    }

    fn take_fetch_failure(&self) -> Result<Option<String>> {
        Ok(self
            .fetch_failure
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .take())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionLedger for InMemoryLedger {
    async fn read_action_state(&self, account: &AccountId) -> Result<Fp254> {
        self.with_account(account, |record| Ok(record.action_state))
    }

    async fn read_pointers(&self, account: &AccountId) -> Result<ReducerPointers> {
        self.with_account(account, |record| Ok(record.pointers))
    }

    async fn recent_action_states(&self, account: &AccountId) -> Result<Vec<Fp254>> {
        self.with_account(account, |record| Ok(record.recent.iter().copied().collect()))
    }

    async fn fetch_action_page(
        &self,
        account: &AccountId,
        from_state: Fp254,
        limit: usize,
    ) -> Result<ActionPage> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.take_fetch_failure()? {
            return Err(LedgerError::FetchFailed(message));
        }
        if limit == 0 {
            return Err(LedgerError::InvalidPage("limit must be positive".to_string()));
        }

        let page_size = self.page_size;
        self.with_account(account, |record| {
            let start = record.start_after(from_state).ok_or_else(|| {
                LedgerError::InvalidPage(format!(
                    "unknown action state {}",
                    short_hex(&from_state)
                ))
            })?;
            let end = (start + limit.min(page_size)).min(record.history.len());
            let page = &record.history[start..end];

            Ok(ActionPage {
                updates: page.iter().map(|update| update.actions.clone()).collect(),
                end_state: page.last().map_or(from_state, |update| update.state_after),
                has_more: end < record.history.len(),
            })
        })
    }

    async fn append_actions(&self, account: &AccountId, actions: RawUpdate) -> Result<Fp254> {
        self.with_account(account, |record| {
            if actions.is_empty() {
                return Ok(record.action_state);
            }

            let state_after = push_action_list(record.action_state, action_list_hash(&actions));
            debug!(
                account = %account,
                actions = actions.len(),
                state = %short_hex(&state_after),
                "appended update"
            );
            record.history.push(AppendedUpdate {
                actions,
                state_after,
            });
            record.action_state = state_after;
            record.recent.push_back(state_after);
            while record.recent.len() > RECENT_ACTION_STATES {
                record.recent.pop_front();
            }
            Ok(state_after)
        })
    }

    async fn commit_pointers(&self, update: &PointerUpdate) -> Result<()> {
        self.with_account(&update.account, |record| {
            if record.pointers != update.expected {
                return Err(LedgerError::PreconditionFailed {
                    expected: update.expected,
                    actual: record.pointers,
                });
            }
            record.pointers = update.new;
            debug!(
                account = %update.account,
                processed = %short_hex(&update.new.processed_action_state),
                stack = %short_hex(&update.new.stack),
                "committed reducer pointers"
            );
            Ok(())
        })
    }
}
