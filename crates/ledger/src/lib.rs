//! Ledger abstraction for hash-committed action reducers.
//!
//! # Architecture
//!
//! ```text
//! callers ── append_actions ──►  ActionLedger  ◄── read_view / fetch_pending_actions ── reducer
//!                                   │
//!                                   └── commit_pointers (compare-and-swap) ◄── reducer
//! ```
//!
//! - [`actions`]: the commitment scheme (action hash, action list,
//!   action-state chain, stack) and its typed list codecs
//! - [`traits`]: the async [`ActionLedger`] interface and [`LedgerError`]
//! - [`types`]: account ids, pointers, page and snapshot types
//! - `mock` (feature `mock`): [`InMemoryLedger`](mock::InMemoryLedger)

pub mod actions;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use actions::{
    ActionCodec, ActionList, ActionStack, ActionStackCodec, ActionStackHashes, ActionState,
    ActionStateCodec, ActionStateHashes, action_list_hash, decode_update, empty_action_state,
    empty_actions, empty_stack, hash_action, push_action, push_action_list, push_stack,
};
pub use traits::{ActionLedger, DEFAULT_PAGE_LIMIT, LedgerError};
pub use types::{
    AccountId, AccountView, ActionPage, PointerUpdate, RawAction, RawUpdate, ReducerPointers,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{InMemoryLedger, RECENT_ACTION_STATES};
