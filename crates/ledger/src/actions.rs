//! Action commitment scheme.
//!
//! Three structural roles, each with its own codec and prefix:
//!
//! ```text
//! action list   (one update)   EMPTY_ACTIONS       -- "ActionListPush"  --> list hash
//! action state  (all updates)  EMPTY_ACTION_STATE  -- "ActionStatePush" --> chain hash
//! stack         (reversed)     EMPTY_STACK = 0     -- "ActionStackPush" --> stack hash
//! ```
//!
//! Actions are hashed under `"ActionEvent"` before they enter an action list.
//! The raw helpers work on field elements so the ledger never needs to know
//! the payload type; the typed codecs produce the same commitments.

use std::marker::PhantomData;
use std::sync::OnceLock;

use zk::commitment::{hash_with_prefix, salt, zero};
use zk::{FieldCodec, Fp254, HashCommittedList, ListCodec};

pub const ACTION_HASH_PREFIX: &str = "ActionEvent";
pub const ACTIONS_EMPTY_SALT: &str = "ActionsEmpty";
pub const ACTION_LIST_PUSH_PREFIX: &str = "ActionListPush";
pub const ACTION_STATE_EMPTY_SALT: &str = "ActionStateEmpty";
pub const ACTION_STATE_PUSH_PREFIX: &str = "ActionStatePush";
pub const ACTION_STACK_PUSH_PREFIX: &str = "ActionStackPush";

static EMPTY_ACTIONS: OnceLock<Fp254> = OnceLock::new();
static EMPTY_ACTION_STATE: OnceLock<Fp254> = OnceLock::new();

/// Commitment of an update with no actions.
pub fn empty_actions() -> Fp254 {
    *EMPTY_ACTIONS.get_or_init(|| salt(ACTIONS_EMPTY_SALT))
}

/// Action state of an account nothing was ever dispatched to.
pub fn empty_action_state() -> Fp254 {
    *EMPTY_ACTION_STATE.get_or_init(|| salt(ACTION_STATE_EMPTY_SALT))
}

/// Commitment of the empty stack.
pub fn empty_stack() -> Fp254 {
    zero()
}

pub fn hash_action(fields: &[Fp254]) -> Fp254 {
    hash_with_prefix(ACTION_HASH_PREFIX, fields)
}

pub fn push_action(list: Fp254, action_hash: Fp254) -> Fp254 {
    hash_with_prefix(ACTION_LIST_PUSH_PREFIX, &[list, action_hash])
}

pub fn push_action_list(state: Fp254, list_hash: Fp254) -> Fp254 {
    hash_with_prefix(ACTION_STATE_PUSH_PREFIX, &[state, list_hash])
}

pub fn push_stack(stack: Fp254, list_hash: Fp254) -> Fp254 {
    hash_with_prefix(ACTION_STACK_PUSH_PREFIX, &[stack, list_hash])
}

/// Commitment of one update given as raw field-encoded actions.
pub fn action_list_hash(actions: &[Vec<Fp254>]) -> Fp254 {
    actions
        .iter()
        .fold(empty_actions(), |list, action| push_action(list, hash_action(action)))
}

// ============================================================================
// Typed codecs
// ============================================================================

/// Codec of one update's action list.
pub struct ActionCodec<A>(PhantomData<A>);

impl<A: FieldCodec> ListCodec for ActionCodec<A> {
    type Element = A;

    fn empty_hash() -> Fp254 {
        empty_actions()
    }

    fn empty_element() -> A {
        A::empty()
    }

    fn next_hash(previous: Fp254, element: &A) -> Fp254 {
        push_action(previous, hash_action(&element.to_fields()))
    }
}

/// Action-state chain whose elements are full action lists.
pub struct ActionStateCodec<A>(PhantomData<A>);

impl<A: FieldCodec> ListCodec for ActionStateCodec<A> {
    type Element = ActionList<A>;

    fn empty_hash() -> Fp254 {
        empty_action_state()
    }

    fn empty_element() -> ActionList<A> {
        ActionList::empty()
    }

    fn next_hash(previous: Fp254, element: &ActionList<A>) -> Fp254 {
        push_action_list(previous, element.hash())
    }
}

/// Stack of full action lists; pops yield the oldest update first.
pub struct ActionStackCodec<A>(PhantomData<A>);

impl<A: FieldCodec> ListCodec for ActionStackCodec<A> {
    type Element = ActionList<A>;

    fn empty_hash() -> Fp254 {
        empty_stack()
    }

    fn empty_element() -> ActionList<A> {
        ActionList::empty()
    }

    fn next_hash(previous: Fp254, element: &ActionList<A>) -> Fp254 {
        push_stack(previous, element.hash())
    }
}

/// Action-state chain over list hashes only (what the reversal proof sees).
pub struct ActionStateHashes;

impl ListCodec for ActionStateHashes {
    type Element = Fp254;

    fn empty_hash() -> Fp254 {
        empty_action_state()
    }

    fn empty_element() -> Fp254 {
        empty_actions()
    }

    fn next_hash(previous: Fp254, list_hash: &Fp254) -> Fp254 {
        push_action_list(previous, *list_hash)
    }
}

/// Stack over list hashes only.
pub struct ActionStackHashes;

impl ListCodec for ActionStackHashes {
    type Element = Fp254;

    fn empty_hash() -> Fp254 {
        empty_stack()
    }

    fn empty_element() -> Fp254 {
        empty_actions()
    }

    fn next_hash(previous: Fp254, list_hash: &Fp254) -> Fp254 {
        push_stack(previous, *list_hash)
    }
}

pub type ActionList<A> = HashCommittedList<ActionCodec<A>>;
pub type ActionState<A> = HashCommittedList<ActionStateCodec<A>>;
pub type ActionStack<A> = HashCommittedList<ActionStackCodec<A>>;

/// Decode one raw update into a typed action list.
pub fn decode_update<A: FieldCodec>(actions: &[Vec<Fp254>]) -> zk::error::Result<ActionList<A>> {
    let decoded = actions
        .iter()
        .map(|fields| A::from_fields(fields))
        .collect::<zk::error::Result<Vec<A>>>()?;
    Ok(ActionList::from_elements(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_constants_are_distinct() {
        assert_ne!(empty_actions(), empty_action_state());
        assert_ne!(empty_actions(), empty_stack());
        assert_ne!(empty_action_state(), empty_stack());
    }

    #[test]
    fn test_typed_list_matches_raw_hash() {
        let list = ActionList::<u64>::from_elements([3, 4]);
        let raw = vec![vec![Fp254::from(3u64)], vec![Fp254::from(4u64)]];
        assert_eq!(list.hash(), action_list_hash(&raw));
        assert_eq!(decode_update::<u64>(&raw).unwrap().hash(), list.hash());
    }

    #[test]
    fn test_roles_never_collide() {
        let list_hash = action_list_hash(&[vec![Fp254::from(1u64)]]);
        assert_ne!(
            push_action_list(empty_action_state(), list_hash),
            push_stack(empty_action_state(), list_hash)
        );
    }

    #[test]
    fn test_state_codecs_agree() {
        let a = ActionList::<u64>::from_elements([1]);
        let b = ActionList::<u64>::from_elements([2, 3]);
        let typed = ActionState::<u64>::from_elements([a.clone(), b.clone()]);
        let hashes = HashCommittedList::<ActionStateHashes>::from_elements([a.hash(), b.hash()]);
        assert_eq!(typed.hash(), hashes.hash());

        let stack = ActionStack::<u64>::from_elements([b.clone(), a.clone()]);
        let stack_hashes =
            HashCommittedList::<ActionStackHashes>::from_elements([b.hash(), a.hash()]);
        assert_eq!(stack.hash(), stack_hashes.hash());
    }
}
