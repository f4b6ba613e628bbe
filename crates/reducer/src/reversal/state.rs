//! Public state of the reversal walk and native execution of one chunk.

use std::fmt;

use ledger_core::{ActionStackHashes, ActionState, ActionStateHashes};
use serde::{Deserialize, Serialize};
use zk::commitment::{serde_field, short_hex};
use zk::error::{ConstraintError, Result};
use zk::list::ListWitness;
use zk::{FieldCodec, Fp254, HashCommittedList};

/// Running state of the reversal: the not-yet-reversed chain and the stack so far.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStackState {
    #[serde(with = "serde_field")]
    pub actions: Fp254,
    #[serde(with = "serde_field")]
    pub stack: Fp254,
}

impl ActionStackState {
    pub fn new(actions: Fp254, stack: Fp254) -> Self {
        Self { actions, stack }
    }

    /// Public-input encoding used by proofs.
    pub fn to_fields(&self) -> [Fp254; 2] {
        [self.actions, self.stack]
    }
}

impl fmt::Debug for ActionStackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStackState")
            .field("actions", &short_hex(&self.actions))
            .field("stack", &short_hex(&self.stack))
            .finish()
    }
}

/// Witness for one pop off the action-state chain.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStackLink {
    /// Chain commitment before the popped update was appended.
    #[serde(with = "serde_field")]
    pub previous_action_state: Fp254,
    /// Commitment of the popped update's action list.
    #[serde(with = "serde_field")]
    pub list_hash: Fp254,
}

impl fmt::Debug for ActionStackLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStackLink")
            .field("previous_action_state", &short_hex(&self.previous_action_state))
            .field("list_hash", &short_hex(&self.list_hash))
            .finish()
    }
}

/// Links of a chain in pop order (newest update first).
pub fn links_in_pop_order<A: FieldCodec>(chain: &ActionState<A>) -> Vec<ActionStackLink> {
    chain
        .shadow()
        .iter()
        .rev()
        .map(|witness| ActionStackLink {
            previous_action_state: witness.previous_hash,
            list_hash: witness.element.hash(),
        })
        .collect()
}

/// Where a chunk stops popping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkMode {
    /// Pop once per supplied link (recursive proof steps).
    Links,
    /// Pop while the chain has not reached this commitment (the direct final chunk).
    UntilReached(Fp254),
}

/// Run one chunk of `chunk_size` slots natively.
///
/// `links` are in pop order. Every pop is checked against the chain
/// commitment; every popped list hash is pushed onto the stack.
pub fn stack_chunk(
    chunk_size: usize,
    input: ActionStackState,
    links: &[ActionStackLink],
    mode: ChunkMode,
) -> Result<ActionStackState> {
    if links.len() > chunk_size {
        return Err(ConstraintError::violation(format!(
            "{} links exceed the chunk size {chunk_size}",
            links.len()
        )));
    }

    let shadow = links
        .iter()
        .rev()
        .map(|link| ListWitness::new(link.previous_action_state, link.list_hash))
        .collect();
    let mut actions = HashCommittedList::<ActionStateHashes>::from_parts(input.actions, shadow);
    let mut stack = HashCommittedList::<ActionStackHashes>::from_hash(input.stack);

    for slot in 0..chunk_size {
        let should_pop = match mode {
            ChunkMode::Links => slot < links.len(),
            ChunkMode::UntilReached(stop) => actions.hash() != stop,
        };
        let list_hash = actions.pop_if_unsafe(should_pop)?;
        stack.push_if(should_pop, list_hash);
    }

    Ok(ActionStackState::new(actions.hash(), stack.hash()))
}
