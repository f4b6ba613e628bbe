//! Batch consumption.
//!
//! [`process_batch`] is the bounded computation run once per batch: it checks
//! the read preconditions, re-derives the stack (verifying the reversal proof
//! when there is one), pops whole updates while they fit the batch, and hands
//! every slot to the callback. Its result is the pointer write postcondition.

use ledger_core::{
    AccountId, AccountView, ActionList, ActionStack, PointerUpdate, ReducerPointers, empty_stack,
};
use tracing::{debug, info};
use zk::commitment::short_hex;
use zk::error::{ConstraintError, assert_equal, assert_true};
use zk::{FieldCodec, FieldList, Fp254};

use crate::config::ReducerConfig;
use crate::error::{ReducerError, Result};
use crate::reversal::{
    ActionStackLink, ActionStackProof, ActionStackProver, ActionStackState, ChunkMode, stack_chunk,
};

/// Hints for processing one batch, produced by `prepare_batches`.
#[derive(Clone, Debug)]
pub struct ActionBatch<A: FieldCodec> {
    /// Pop from the stack already installed on-chain instead of a rebuilt one.
    pub use_onchain_stack: bool,
    pub processed_action_state: Fp254,
    /// Action state the rebuilt stack reverses up to.
    pub onchain_action_state: Fp254,
    /// Stack pointer expected on-chain when the batch is processed.
    pub onchain_stack: Fp254,
    /// Stack to pop from, with replay data.
    pub stack: ActionStack<A>,
    /// A reversal proof covers the older part of the walk.
    pub is_recursive: bool,
    /// Links of the final chunk, re-executed while processing (pop order).
    pub witnesses: Vec<ActionStackLink>,
}

/// A batch together with its reversal proof, if any.
#[derive(Clone, Debug)]
pub struct PreparedBatch<A: FieldCodec> {
    pub batch: ActionBatch<A>,
    pub proof: Option<ActionStackProof>,
}

/// Result of processing one batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Pointer write to commit atomically with the callback's effects.
    pub update: PointerUpdate,
    /// Real (non-dummy) actions handed to the callback.
    pub processed_actions: usize,
    /// Updates popped off the stack.
    pub popped_updates: usize,
}

/// Pop whole updates off `stack` while they fit `batch_size`.
///
/// Runs exactly `max_updates_per_batch` iterations. Once an update does not
/// fit, nothing after it is taken, so chronological order is preserved.
/// Returns the popped updates oldest-first.
pub(crate) fn pop_fitting_lists<A: FieldCodec>(
    stack: &mut ActionStack<A>,
    config: &ReducerConfig,
) -> zk::error::Result<Vec<Vec<A>>> {
    let mut popped = Vec::new();
    let mut total = 0usize;
    let mut blocked = false;

    for _ in 0..config.max_updates_per_batch {
        let candidate = stack.pop_option()?;
        let present = candidate.is_some();
        let list = candidate.unwrap_or_else(ActionList::empty);

        let mut actions = Vec::new();
        list.for_each(config.max_actions_per_update, |action, is_dummy, _| {
            if !is_dummy {
                actions.push(action);
            }
        })?;
        actions.reverse();

        let fits = present && !blocked && total + actions.len() <= config.batch_size;
        blocked |= present && !fits;
        stack.push_if(present && !fits, list);

        if fits {
            total += actions.len();
            popped.push(actions);
        }
    }

    Ok(popped)
}

/// Process one prepared batch against a snapshot of the account.
///
/// `callback(action, is_dummy, index)` runs exactly `batch_size` times in
/// chronological order; slots past the popped actions are dummies. Effects of
/// the callback must only be applied together with the returned
/// [`PointerUpdate`].
pub fn process_batch<A, F>(
    config: &ReducerConfig,
    prover: &dyn ActionStackProver,
    account: &AccountId,
    view: &AccountView,
    prepared: PreparedBatch<A>,
    mut callback: F,
) -> Result<BatchOutcome>
where
    A: FieldCodec,
    F: FnMut(A, bool, usize) -> Result<()>,
{
    let PreparedBatch { batch, proof } = prepared;

    // Read preconditions.
    if view.pointers.stack != batch.onchain_stack {
        return Err(ReducerError::StaleStack {
            expected: batch.onchain_stack,
            actual: view.pointers.stack,
        });
    }
    assert_equal(
        view.pointers.processed_action_state,
        batch.processed_action_state,
        "processed action state moved since the batch was prepared",
    )?;
    assert_true(
        view.is_recent_action_state(&batch.onchain_action_state),
        "batch is anchored to an action state outside the recent window",
    )?;

    let new_processed = if batch.use_onchain_stack {
        batch.stack.assert_equals(batch.onchain_stack)?;
        batch.processed_action_state
    } else {
        assert_equal(
            batch.onchain_stack,
            empty_stack(),
            "on-chain stack must be drained before a rebuilt stack is used",
        )?;

        let origin = ActionStackState::new(batch.onchain_action_state, empty_stack());
        let start = if batch.is_recursive {
            let proof = proof.as_ref().ok_or_else(|| {
                ConstraintError::violation("recursive batch carries no reversal proof")
            })?;
            prover.verify(proof)?;
            if proof.origin != origin {
                return Err(ConstraintError::violation(
                    "reversal proof does not start at the on-chain action state",
                )
                .into());
            }
            proof.output
        } else {
            origin
        };

        let end = stack_chunk(
            config.max_updates_final_proof,
            start,
            &batch.witnesses,
            ChunkMode::UntilReached(batch.processed_action_state),
        )?;
        assert_equal(
            end.actions,
            batch.processed_action_state,
            "reversal did not reach the processed action state",
        )?;
        assert_equal(
            end.stack,
            batch.stack.hash(),
            "stack does not reverse the on-chain action state",
        )?;
        batch.onchain_action_state
    };

    let mut stack = batch.stack;
    let popped = pop_fitting_lists(&mut stack, config)?;
    let popped_updates = popped.len();
    // Pushed newest-first so the newest-first walk hands them out oldest-first.
    let actions = FieldList::<A>::from_elements(popped.into_iter().flatten().rev());

    let mut processed_actions = 0usize;
    actions.try_for_each(config.batch_size, |action, is_dummy, index| {
        if !is_dummy {
            processed_actions += 1;
        }
        callback(action, is_dummy, index)
    })?;

    let update = PointerUpdate {
        account: account.clone(),
        expected: ReducerPointers::new(batch.processed_action_state, batch.onchain_stack),
        new: ReducerPointers::new(new_processed, stack.hash()),
    };

    if popped_updates == 0 {
        debug!("batch popped no updates");
    }
    info!(
        account = %account,
        use_onchain_stack = batch.use_onchain_stack,
        updates = popped_updates,
        actions = processed_actions,
        stack = %short_hex(&update.new.stack),
        "processed batch"
    );

    Ok(BatchOutcome {
        update,
        processed_actions,
        popped_updates,
    })
}
