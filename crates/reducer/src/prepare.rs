//! Batch planning.
//!
//! Turns the pending updates fetched from the ledger into a sequence of
//! [`PreparedBatch`]es. Planning simulates every pop with the same code the
//! processor runs, so each batch's `onchain_stack` is exactly what the
//! pointer will hold once the batches before it are committed.

use ledger_core::{
    AccountView, ActionList, ActionStack, ActionState, RawUpdate, decode_update,
    empty_action_state, empty_stack, push_action_list,
};
use tracing::{debug, info};
use zk::commitment::short_hex;
use zk::error::{ConstraintError, assert_equal};
use zk::{FieldCodec, Fp254};

use crate::batch::{ActionBatch, PreparedBatch, pop_fitting_lists};
use crate::config::ReducerConfig;
use crate::error::{ReducerError, Result};
use crate::reversal::{
    ActionStackProof, ActionStackProver, ActionStackState, links_in_pop_order, prove_reversal,
};

/// Decode every raw update, oldest first.
pub(crate) fn decode_updates<A: FieldCodec>(raw: &[RawUpdate]) -> Result<Vec<ActionList<A>>> {
    raw.iter()
        .map(|update| decode_update::<A>(update).map_err(ReducerError::from))
        .collect()
}

/// Rebuild the chain from `processed` up to `target`.
///
/// Updates appended after `target` (the ledger moved on while fetching) are
/// ignored; failing to reach `target` means the fetched history is not the
/// account's.
pub(crate) fn chain_to<A: FieldCodec>(
    processed: Fp254,
    target: Fp254,
    pending: Vec<ActionList<A>>,
) -> Result<ActionState<A>> {
    let mut chain = ActionState::from_hash(processed);
    for list in pending {
        if chain.hash() == target {
            break;
        }
        chain.push(list);
    }
    assert_equal(
        chain.hash(),
        target,
        "fetched updates do not lead to the on-chain action state",
    )?;
    Ok(chain)
}

/// Split the full account history at `processed` into the on-chain stack's
/// content and the updates still pending after it.
///
/// The stack always holds the newest updates before `processed`, oldest on
/// top. Pushing history backwards from `processed` until the commitment
/// matches finds them.
pub(crate) fn split_history<A: FieldCodec>(
    mut history: Vec<ActionList<A>>,
    processed: Fp254,
    stack_hash: Fp254,
) -> Result<(ActionStack<A>, Vec<ActionList<A>>)> {
    let mut state = empty_action_state();
    let mut reached = (state == processed).then_some(0);
    if reached.is_none() {
        for (index, list) in history.iter().enumerate() {
            state = push_action_list(state, list.hash());
            if state == processed {
                reached = Some(index + 1);
                break;
            }
        }
    }
    let reached = reached.ok_or_else(|| {
        ConstraintError::violation(format!(
            "processed action state {} is not in the account history",
            short_hex(&processed)
        ))
    })?;

    let pending = history.split_off(reached);
    let mut stack = ActionStack::empty();
    for list in history.into_iter().rev() {
        if stack.hash() == stack_hash {
            break;
        }
        stack.push(list);
    }
    assert_equal(
        stack.hash(),
        stack_hash,
        "on-chain stack does not match the account history",
    )?;
    debug!(
        updates = stack.len_unconstrained(),
        pending = pending.len(),
        "reconstructed on-chain stack"
    );
    Ok((stack, pending))
}

/// Simulate one batch on a non-empty `stack` and record it.
fn emit<A: FieldCodec>(
    batches: &mut Vec<PreparedBatch<A>>,
    config: &ReducerConfig,
    batch: ActionBatch<A>,
    proof: Option<ActionStackProof>,
    stack: &mut ActionStack<A>,
) -> Result<()> {
    let popped = pop_fitting_lists(stack, config)?;
    // A validated config always fits the first update into an empty batch.
    if popped.is_empty() {
        return Err(ConstraintError::violation(format!(
            "next update does not fit into a batch of {}",
            config.batch_size
        ))
        .into());
    }

    let actions: usize = popped.iter().map(Vec::len).sum();
    info!(
        index = batches.len(),
        use_onchain_stack = batch.use_onchain_stack,
        is_recursive = batch.is_recursive,
        updates = popped.len(),
        actions,
        "prepared batch"
    );
    batches.push(PreparedBatch { batch, proof });
    Ok(())
}

/// Batches draining `stack`, which is (or will be) installed on-chain.
fn drain<A: FieldCodec>(
    batches: &mut Vec<PreparedBatch<A>>,
    config: &ReducerConfig,
    processed: Fp254,
    onchain_action_state: Fp254,
    stack: &mut ActionStack<A>,
) -> Result<()> {
    while !stack.is_empty() {
        let batch = ActionBatch {
            use_onchain_stack: true,
            processed_action_state: processed,
            onchain_action_state,
            onchain_stack: stack.hash(),
            stack: stack.clone(),
            is_recursive: false,
            witnesses: Vec::new(),
        };
        emit(batches, config, batch, None, stack)?;
    }
    Ok(())
}

/// Plan every batch needed to consume the account up to `view.action_state`.
///
/// `pending` are the updates after the processed pointer; `backlog` is the
/// on-chain stack's content when the stack pointer is non-empty. The backlog
/// is drained first, then the pending updates are reversed (with a proof
/// when they exceed `max_updates_final_proof`) and drained in turn.
pub fn plan_batches<A: FieldCodec>(
    config: &ReducerConfig,
    prover: &dyn ActionStackProver,
    view: &AccountView,
    pending: Vec<ActionList<A>>,
    backlog: Option<ActionStack<A>>,
) -> Result<Vec<PreparedBatch<A>>> {
    let processed = view.pointers.processed_action_state;
    let onchain_action_state = view.action_state;
    let chain = chain_to(processed, onchain_action_state, pending)?;
    let mut batches = Vec::new();

    if let Some(mut backlog) = backlog {
        backlog.assert_equals(view.pointers.stack)?;
        drain(&mut batches, config, processed, onchain_action_state, &mut backlog)?;
    }

    if chain.hash() == processed {
        return Ok(batches);
    }

    let links = links_in_pop_order(&chain);
    let split = links.len().saturating_sub(config.max_updates_final_proof);
    let origin = ActionStackState::new(onchain_action_state, empty_stack());
    let proof = prove_reversal(prover, origin, &links[..split])?;
    if let Some(proof) = &proof {
        debug!(
            steps = proof.steps,
            output = %short_hex(&proof.output.actions),
            "reversal proof ready"
        );
    }

    let mut stack = ActionStack::from_elements(chain.to_vec_unconstrained().into_iter().rev());
    let batch = ActionBatch {
        use_onchain_stack: false,
        processed_action_state: processed,
        onchain_action_state,
        onchain_stack: empty_stack(),
        stack: stack.clone(),
        is_recursive: proof.is_some(),
        witnesses: links[split..].to_vec(),
    };
    emit(&mut batches, config, batch, proof, &mut stack)?;

    drain(&mut batches, config, onchain_action_state, onchain_action_state, &mut stack)?;
    Ok(batches)
}
