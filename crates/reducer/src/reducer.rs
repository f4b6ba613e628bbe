//! The reducer service: dispatch, preparation and processing against a ledger.

use std::marker::PhantomData;
use std::sync::Arc;

use ledger_core::{AccountId, ActionLedger, LedgerError, empty_action_state, empty_stack};
use tracing::{debug, info};
use zk::commitment::short_hex;
use zk::{FieldCodec, Fp254};

use crate::batch::{self, BatchOutcome, PreparedBatch};
use crate::config::ReducerConfig;
use crate::dispatch::ActionUpdate;
use crate::error::{ConfigError, ReducerError, Result};
use crate::prepare::{decode_updates, plan_batches, split_history};
use crate::reversal::ActionStackProver;

/// Batched consumer of one account's actions.
///
/// Cheap to clone; the ledger and prover are shared.
pub struct BatchReducer<A> {
    config: ReducerConfig,
    account: AccountId,
    ledger: Arc<dyn ActionLedger>,
    prover: Arc<dyn ActionStackProver>,
    _action: PhantomData<fn() -> A>,
}

impl<A> Clone for BatchReducer<A> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            account: self.account.clone(),
            ledger: Arc::clone(&self.ledger),
            prover: Arc::clone(&self.prover),
            _action: PhantomData,
        }
    }
}

impl<A: FieldCodec> BatchReducer<A> {
    pub fn builder() -> BatchReducerBuilder<A> {
        BatchReducerBuilder::new()
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Append a single action as its own update.
    pub async fn dispatch(&self, action: A) -> Result<Fp254> {
        self.submit_update(&ActionUpdate::from_iter([action])).await
    }

    /// Append one caller's update; returns the new action state.
    pub async fn submit_update(&self, update: &ActionUpdate<A>) -> Result<Fp254> {
        if update.len() > self.config.max_actions_per_update {
            return Err(ConfigError::UpdateTooLarge {
                len: update.len(),
                max: self.config.max_actions_per_update,
            }
            .into());
        }
        self.ledger
            .append_actions(&self.account, update.to_raw())
            .await
            .map_err(ReducerError::Ledger)
    }

    /// Plan the batches that consume every pending action.
    ///
    /// Empty when nothing is pending. Generates the reversal proof when the
    /// pending updates exceed `max_updates_final_proof`.
    pub async fn prepare_batches(&self) -> Result<Vec<PreparedBatch<A>>> {
        let view = self
            .ledger
            .read_view(&self.account)
            .await
            .map_err(ReducerError::Ledger)?;
        let processed = view.pointers.processed_action_state;
        let has_backlog = view.pointers.stack != empty_stack();

        // A non-empty stack needs the history before `processed` as well, so
        // fetch everything once and split it.
        let from_state = if has_backlog {
            empty_action_state()
        } else {
            processed
        };
        let raw = self
            .ledger
            .fetch_pending_actions(&self.account, from_state)
            .await
            .map_err(ReducerError::ExternalFetch)?;
        let fetched = decode_updates::<A>(&raw)?;

        let (backlog, pending) = if has_backlog {
            let (backlog, pending) = split_history(fetched, processed, view.pointers.stack)?;
            (Some(backlog), pending)
        } else {
            (None, fetched)
        };
        debug!(
            account = %self.account,
            pending = pending.len(),
            processed = %short_hex(&processed),
            action_state = %short_hex(&view.action_state),
            "fetched pending updates"
        );

        let batches = plan_batches(
            &self.config,
            self.prover.as_ref(),
            &view,
            pending,
            backlog,
        )?;
        info!(account = %self.account, batches = batches.len(), "prepared batches");
        Ok(batches)
    }

    /// Process one prepared batch and commit the pointer update.
    ///
    /// The callback runs `batch_size` times, before the commit. Stage its
    /// effects and apply them only when this returns `Ok`; a concurrent
    /// consumer that committed first surfaces as [`ReducerError::StaleStack`].
    pub async fn process_batch<F>(
        &self,
        prepared: PreparedBatch<A>,
        callback: F,
    ) -> Result<BatchOutcome>
    where
        F: FnMut(A, bool, usize) -> Result<()>,
    {
        let view = self
            .ledger
            .read_view(&self.account)
            .await
            .map_err(ReducerError::Ledger)?;
        let outcome = batch::process_batch(
            &self.config,
            self.prover.as_ref(),
            &self.account,
            &view,
            prepared,
            callback,
        )?;

        match self.ledger.commit_pointers(&outcome.update).await {
            Ok(()) => Ok(outcome),
            Err(LedgerError::PreconditionFailed { expected, actual }) => {
                Err(ReducerError::StaleStack {
                    expected: expected.stack,
                    actual: actual.stack,
                })
            }
            Err(e) => Err(ReducerError::Ledger(e)),
        }
    }
}

/// Builder for [`BatchReducer`].
pub struct BatchReducerBuilder<A> {
    config: ReducerConfig,
    account: Option<AccountId>,
    ledger: Option<Arc<dyn ActionLedger>>,
    prover: Option<Arc<dyn ActionStackProver>>,
    _action: PhantomData<fn() -> A>,
}

impl<A: FieldCodec> BatchReducerBuilder<A> {
    pub fn new() -> Self {
        Self {
            config: ReducerConfig::default(),
            account: None,
            ledger: None,
            prover: None,
            _action: PhantomData,
        }
    }

    pub fn config(mut self, config: ReducerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    pub fn ledger(mut self, ledger: impl ActionLedger + 'static) -> Self {
        self.ledger = Some(Arc::new(ledger));
        self
    }

    pub fn shared_ledger(mut self, ledger: Arc<dyn ActionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn prover(mut self, prover: impl ActionStackProver + 'static) -> Self {
        self.prover = Some(Arc::new(prover));
        self
    }

    pub fn build(self) -> std::result::Result<BatchReducer<A>, ConfigError> {
        self.config.validate()?;
        let ledger = self.ledger.ok_or(ConfigError::Missing("ledger"))?;
        let account = self.account.ok_or(ConfigError::Missing("account"))?;
        let prover = self.prover.ok_or(ConfigError::Missing("prover"))?;

        if prover.chunk_size() != self.config.max_updates_per_proof {
            return Err(ConfigError::ChunkSizeMismatch {
                expected: self.config.max_updates_per_proof,
                actual: prover.chunk_size(),
            });
        }

        debug!(
            account = %account,
            backend = ?prover.backend(),
            batch_size = self.config.batch_size,
            "built batch reducer"
        );
        Ok(BatchReducer {
            config: self.config,
            account,
            ledger,
            prover,
            _action: PhantomData,
        })
    }
}

impl<A: FieldCodec> Default for BatchReducerBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::InMemoryLedger;

    use crate::reversal::StubStackProver;

    fn account() -> AccountId {
        AccountId::from_bytes(vec![1, 2, 3])
    }

    #[test]
    fn test_build_requires_all_parts() {
        let err = BatchReducer::<u64>::builder().build().err();
        assert_eq!(err, Some(ConfigError::Missing("ledger")));

        let err = BatchReducer::<u64>::builder()
            .ledger(InMemoryLedger::new())
            .account(account())
            .build()
            .err();
        assert_eq!(err, Some(ConfigError::Missing("prover")));
    }

    #[test]
    fn test_build_checks_chunk_size() {
        let err = BatchReducer::<u64>::builder()
            .ledger(InMemoryLedger::new())
            .account(account())
            .prover(StubStackProver::new(7))
            .build()
            .err();
        assert_eq!(
            err,
            Some(ConfigError::ChunkSizeMismatch {
                expected: 300,
                actual: 7
            })
        );
    }

    #[test]
    fn test_build_rejects_update_larger_than_batch() {
        let err = BatchReducer::<u64>::builder()
            .config(ReducerConfig::new(2).with_max_actions_per_update(5))
            .ledger(InMemoryLedger::new())
            .account(account())
            .prover(StubStackProver::new(300))
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
    async fn test_submit_rejects_oversized_update() {
        let ledger = InMemoryLedger::new();
        ledger.create_account(&account()).unwrap();
        let reducer = BatchReducer::<u64>::builder()
            .config(ReducerConfig::new(4).with_max_actions_per_update(2))
            .ledger(ledger)
            .account(account())
            .prover(StubStackProver::new(300))
            .build()
            .unwrap();

        let update: ActionUpdate<u64> = [1, 2, 3].into_iter().collect();
        let err = reducer.submit_update(&update).await.unwrap_err();
        assert_eq!(
            err,
            ReducerError::Configuration(ConfigError::UpdateTooLarge { len: 3, max: 2 })
        );
    }
}
