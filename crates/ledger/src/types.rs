//! Common types for ledger interactions.

use std::fmt;

use serde::{Deserialize, Serialize};
use zk::Fp254;
use zk::commitment::{serde_field, short_hex};

use crate::actions::{empty_action_state, empty_stack};

/// One action as the ledger stores it: its field encoding.
pub type RawAction = Vec<Fp254>;

/// One caller's update: the actions it dispatched, in order.
pub type RawUpdate = Vec<RawAction>;

/// Identifier of the account whose action state a reducer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Vec<u8>);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The two field-element pointers a reducer keeps in its account.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducerPointers {
    /// Action state up to which every action has been handed to a consumer
    /// (or moved onto the stack).
    #[serde(with = "serde_field")]
    pub processed_action_state: Fp254,

    /// Commitment of the remaining backlog, oldest update on top.
    #[serde(with = "serde_field")]
    pub stack: Fp254,
}

impl ReducerPointers {
    pub fn new(processed_action_state: Fp254, stack: Fp254) -> Self {
        Self {
            processed_action_state,
            stack,
        }
    }

    /// Pointers of an account that has never been reduced.
    pub fn initial() -> Self {
        Self::new(empty_action_state(), empty_stack())
    }
}

impl Default for ReducerPointers {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Debug for ReducerPointers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerPointers")
            .field("processed_action_state", &short_hex(&self.processed_action_state))
            .field("stack", &short_hex(&self.stack))
            .finish()
    }
}

/// Write postcondition of one processed batch.
///
/// Applied as a compare-and-swap: the ledger only installs `new` if its
/// pointers still equal `expected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerUpdate {
    pub account: AccountId,
    pub expected: ReducerPointers,
    pub new: ReducerPointers,
}

impl PointerUpdate {
    pub fn is_noop(&self) -> bool {
        self.expected == self.new
    }
}

/// Snapshot of everything a consumer reads from the account before processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountView {
    pub action_state: Fp254,
    /// Most recent action states, newest last; always contains `action_state`.
    pub recent_action_states: Vec<Fp254>,
    pub pointers: ReducerPointers,
}

impl AccountView {
    pub fn is_recent_action_state(&self, state: &Fp254) -> bool {
        self.recent_action_states.contains(state)
    }
}

/// One page of pending updates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionPage {
    pub updates: Vec<RawUpdate>,
    /// Action state after the last update of this page (the request's
    /// starting state when the page is empty).
    pub end_state: Fp254,
    pub has_more: bool,
}
