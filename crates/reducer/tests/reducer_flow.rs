//! End-to-end reducer flows against the in-memory ledger.

use batch_reducer::{
    ActionUpdate, BatchReducer, ConfigError, PreparedBatch, ReducerConfig, ReducerError,
    StubStackProver,
};
use ledger_core::{
    AccountId, ActionLedger, InMemoryLedger, LedgerError, ReducerPointers,
    RECENT_ACTION_STATES, empty_stack,
};
use zk::Fp254;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn account() -> AccountId {
    AccountId::from_bytes(b"reducer-test".to_vec())
}

fn setup(config: ReducerConfig) -> (InMemoryLedger, BatchReducer<u64>) {
    init_tracing();
    let ledger = InMemoryLedger::new().with_page_size(3);
    ledger.create_account(&account()).unwrap();
    let reducer = BatchReducer::builder()
        .prover(StubStackProver::new(config.max_updates_per_proof))
        .config(config)
        .ledger(ledger.clone())
        .account(account())
        .build()
        .unwrap();
    (ledger, reducer)
}

async fn submit(reducer: &BatchReducer<u64>, actions: &[u64]) {
    let update: ActionUpdate<u64> = actions.iter().copied().collect();
    reducer.submit_update(&update).await.unwrap();
}

/// Process every batch in order, returning the real actions seen.
async fn process_all(reducer: &BatchReducer<u64>, batches: Vec<PreparedBatch<u64>>) -> Vec<u64> {
    let mut seen = Vec::new();
    for batch in batches {
        reducer
            .process_batch(batch, |action, is_dummy, _| {
                if !is_dummy {
                    seen.push(action);
                }
                Ok(())
            })
            .await
            .unwrap();
    }
    seen
}

async fn assert_fully_processed(ledger: &InMemoryLedger) {
    let action_state = ledger.read_action_state(&account()).await.unwrap();
    let pointers = ledger.read_pointers(&account()).await.unwrap();
    assert_eq!(pointers, ReducerPointers::new(action_state, empty_stack()));
}

#[tokio::test]
async fn test_actions_are_processed_in_dispatch_order() {
    let (ledger, reducer) = setup(ReducerConfig::default());
    reducer.dispatch(1).await.unwrap();
    reducer.dispatch(2).await.unwrap();
    reducer.dispatch(3).await.unwrap();

    let batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 1);
    assert!(!batches[0].batch.use_onchain_stack);
    assert!(!batches[0].batch.is_recursive);

    let mut calls = Vec::new();
    let outcome = reducer
        .process_batch(batches[0].clone(), |action, is_dummy, index| {
            calls.push((action, is_dummy, index));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(calls.len(), 10);
    assert_eq!(&calls[..3], &[(1, false, 0), (2, false, 1), (3, false, 2)]);
    assert!(calls[3..].iter().all(|(action, is_dummy, _)| *is_dummy && *action == 0));
    assert_eq!(outcome.processed_actions, 3);
    assert_eq!(outcome.popped_updates, 3);
    assert_fully_processed(&ledger).await;

    assert!(reducer.prepare_batches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nothing_pending() {
    let (ledger, reducer) = setup(ReducerConfig::default());
    assert!(reducer.prepare_batches().await.unwrap().is_empty());
    assert_eq!(
        ledger.read_pointers(&account()).await.unwrap(),
        ReducerPointers::initial()
    );
}

#[tokio::test]
async fn test_prepare_is_deterministic() {
    let (_ledger, reducer) = setup(ReducerConfig::new(2));
    for update in [&[1, 2][..], &[3], &[4, 5]] {
        submit(&reducer, update).await;
    }

    let first = reducer.prepare_batches().await.unwrap();
    let second = reducer.prepare_batches().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.batch.stack.hash(), b.batch.stack.hash());
        assert_eq!(a.batch.onchain_stack, b.batch.onchain_stack);
        assert_eq!(a.batch.processed_action_state, b.batch.processed_action_state);
        assert_eq!(a.batch.witnesses, b.batch.witnesses);
        assert_eq!(a.proof, b.proof);
    }
}

#[tokio::test]
async fn test_updates_are_never_split() {
    let (ledger, reducer) = setup(ReducerConfig::new(3).with_max_actions_per_update(3));
    for update in [&[1, 2][..], &[3, 4], &[5], &[6, 7, 8]] {
        submit(&reducer, update).await;
    }

    let batches = reducer.prepare_batches().await.unwrap();
    // [1,2] | [3,4],[5] | [6,7,8]
    assert_eq!(batches.len(), 3);
    let seen = process_all(&reducer, batches).await;
    assert_eq!(seen, (1..=8).collect::<Vec<_>>());
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_chunked_reversal_with_proof() {
    let config = ReducerConfig::new(4)
        .with_max_updates_per_proof(2)
        .with_max_updates_final_proof(1);
    let (ledger, reducer) = setup(config);
    for action in 1..=6 {
        reducer.dispatch(action).await.unwrap();
    }

    let batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 2);

    let first = &batches[0];
    assert!(first.batch.is_recursive);
    assert_eq!(first.batch.witnesses.len(), 1);
    let proof = first.proof.as_ref().unwrap();
    // Five proven pops in chunks of two.
    assert_eq!(proof.steps, 3);
    assert_eq!(proof.origin.stack, empty_stack());

    let seen = process_all(&reducer, batches).await;
    assert_eq!(seen, (1..=6).collect::<Vec<_>>());
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_forged_proof_is_rejected() {
    let config = ReducerConfig::new(4)
        .with_max_updates_per_proof(2)
        .with_max_updates_final_proof(1);
    let (ledger, reducer) = setup(config);
    for action in 1..=4 {
        reducer.dispatch(action).await.unwrap();
    }

    let mut batch = reducer.prepare_batches().await.unwrap().remove(0);
    if let Some(proof) = batch.proof.as_mut() {
        proof.output.stack = Fp254::from(99u64);
    }
    let err = reducer.process_batch(batch, |_, _, _| Ok(())).await.unwrap_err();
    assert!(matches!(err, ReducerError::Proof(_)));
    assert_eq!(
        ledger.read_pointers(&account()).await.unwrap(),
        ReducerPointers::initial()
    );
}

#[tokio::test]
async fn test_forged_stack_is_rejected() {
    let (_ledger, reducer) = setup(ReducerConfig::default());
    for action in 1..=3 {
        reducer.dispatch(action).await.unwrap();
    }

    let mut batch = reducer.prepare_batches().await.unwrap().remove(0);
    let mut forged = batch.batch.stack.clone();
    forged.pop().unwrap();
    batch.batch.stack = forged;

    let err = reducer.process_batch(batch, |_, _, _| Ok(())).await.unwrap_err();
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn test_out_of_order_batch_is_stale() {
    let (ledger, reducer) = setup(ReducerConfig::new(1));
    reducer.dispatch(1).await.unwrap();
    reducer.dispatch(2).await.unwrap();

    let mut batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 2);
    let second = batches.pop().unwrap();
    let first = batches.pop().unwrap();

    let err = reducer
        .process_batch(second.clone(), |_, _, _| Ok(()))
        .await
        .unwrap_err();
    assert!(matches!(err, ReducerError::StaleStack { .. }));

    reducer.process_batch(first.clone(), |_, _, _| Ok(())).await.unwrap();

    // Replaying a committed batch no longer matches the pointers.
    let err = reducer.process_batch(first, |_, _, _| Ok(())).await.unwrap_err();
    assert!(matches!(err, ReducerError::StaleStack { .. }));

    reducer.process_batch(second, |_, _, _| Ok(())).await.unwrap();
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_concurrent_pointer_write_is_stale() {
    let (ledger, reducer) = setup(ReducerConfig::new(1));
    reducer.dispatch(1).await.unwrap();
    reducer.dispatch(2).await.unwrap();
    let batch = reducer.prepare_batches().await.unwrap().remove(0);

    // Another consumer installs its own stack while the callback runs.
    let mut racing = Some(ledger.clone());
    let err = reducer
        .process_batch(batch, |_, _, _| {
            if let Some(other) = racing.take() {
                let pointers = ReducerPointers::new(Fp254::from(0u64), Fp254::from(1u64));
                other
                    .force_pointers(&account(), pointers)
                    .map_err(ReducerError::Ledger)?;
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReducerError::StaleStack { .. }));
}

#[tokio::test]
async fn test_fetch_failure_propagates() {
    let (ledger, reducer) = setup(ReducerConfig::default());
    reducer.dispatch(1).await.unwrap();
    ledger.fail_next_fetch("indexer offline").unwrap();

    let err = reducer.prepare_batches().await.unwrap_err();
    assert_eq!(
        err,
        ReducerError::ExternalFetch(LedgerError::FetchFailed("indexer offline".into()))
    );
    assert!(!err.is_constraint_violation());
}

#[test]
fn test_update_larger_than_batch_is_rejected_at_build() {
    let err = BatchReducer::<u64>::builder()
        .prover(StubStackProver::new(300))
        .config(ReducerConfig::new(2).with_max_actions_per_update(5))
        .ledger(InMemoryLedger::new())
        .account(account())
        .build()
        .err();
    assert_eq!(
        err,
        Some(ConfigError::BudgetBelowUpdate {
            batch_size: 2,
            max_actions_per_update: 5
        })
    );
}

#[tokio::test]
async fn test_full_batch_update_is_processed() {
    let (ledger, reducer) = setup(ReducerConfig::new(3).with_max_actions_per_update(3));
    submit(&reducer, &[1, 2, 3]).await;
    submit(&reducer, &[4]).await;

    let batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 2);
    let seen = process_all(&reducer, batches).await;
    assert_eq!(seen, vec![1, 2, 3, 4]);
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_resume_from_onchain_stack() {
    let (ledger, reducer) = setup(ReducerConfig::new(1));
    for action in 1..=3 {
        reducer.dispatch(action).await.unwrap();
    }

    let mut batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 3);
    let seen = process_all(&reducer, vec![batches.remove(0)]).await;
    assert_eq!(seen, vec![1]);

    // New activity arrives while the backlog is still on-chain.
    reducer.dispatch(4).await.unwrap();

    let batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(batches.len(), 3);
    assert!(batches[0].batch.use_onchain_stack);
    assert!(batches[1].batch.use_onchain_stack);
    assert!(!batches[2].batch.use_onchain_stack);
    assert_eq!(batches[2].batch.onchain_stack, empty_stack());

    let seen = process_all(&reducer, batches).await;
    assert_eq!(seen, vec![2, 3, 4]);
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_backlog_and_pending_come_from_one_fetch() {
    let (ledger, reducer) = setup(ReducerConfig::new(1));
    for action in 1..=3 {
        reducer.dispatch(action).await.unwrap();
    }
    let mut batches = reducer.prepare_batches().await.unwrap();
    process_all(&reducer, vec![batches.remove(0)]).await;

    // Three updates fit one page, so a single history walk is one page.
    let before = ledger.page_fetches();
    let batches = reducer.prepare_batches().await.unwrap();
    assert_eq!(ledger.page_fetches() - before, 1);
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.batch.use_onchain_stack));

    let seen = process_all(&reducer, batches).await;
    assert_eq!(seen, vec![2, 3]);
    assert_fully_processed(&ledger).await;
}

#[tokio::test]
async fn test_batch_expires_outside_recent_window() {
    let (_ledger, reducer) = setup(ReducerConfig::default());
    reducer.dispatch(1).await.unwrap();
    let batch = reducer.prepare_batches().await.unwrap().remove(0);

    for action in 0..RECENT_ACTION_STATES as u64 {
        reducer.dispatch(10 + action).await.unwrap();
    }

    let err = reducer.process_batch(batch, |_, _, _| Ok(())).await.unwrap_err();
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn test_callback_error_aborts_commit() {
    let (ledger, reducer) = setup(ReducerConfig::default());
    reducer.dispatch(1).await.unwrap();
    let batch = reducer.prepare_batches().await.unwrap().remove(0);

    let err = reducer
        .process_batch(batch, |_, _, _| {
            Err(ReducerError::Ledger(LedgerError::FetchFailed("callback".into())))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReducerError::Ledger(_)));
    assert_eq!(
        ledger.read_pointers(&account()).await.unwrap(),
        ReducerPointers::initial()
    );
}
