//! Batched, hash-committed action reducer.
//!
//! Callers append updates (lists of actions) to an account's action-state
//! chain. A reducer consumes them in chronological order, a bounded batch at
//! a time, keeping two pointers on the ledger: the processed action state and
//! a stack holding the not-yet-consumed updates with the oldest on top.
//!
//! # Architecture
//!
//! ```text
//!  submit_update ──► ActionLedger ──► prepare_batches ──► [PreparedBatch, ...]
//!                                          │                     │
//!                                  reversal proof          process_batch(callback)
//!                                  (ActionStackProver)           │
//!                                                         commit_pointers (CAS)
//! ```
//!
//! - [`config`]: loop bounds and `REDUCER_*` environment overrides
//! - [`dispatch`]: building one caller's [`ActionUpdate`]
//! - [`reversal`]: chunked stack reversal and its provers
//! - [`batch`]: the per-batch computation ([`batch::process_batch`])
//! - [`prepare`]: planning batches from the ledger's pending updates
//! - [`reducer`]: [`BatchReducer`], tying the above to a ledger
//!
//! # Example
//!
//! ```no_run
//! use batch_reducer::{BatchReducer, ReducerConfig, StubStackProver};
//! use ledger_core::{AccountId, InMemoryLedger};
//!
//! # async fn run() -> Result<(), batch_reducer::ReducerError> {
//! let account = AccountId::from_bytes(vec![1]);
//! let ledger = InMemoryLedger::new();
//! ledger.create_account(&account).map_err(batch_reducer::ReducerError::Ledger)?;
//!
//! let config = ReducerConfig::default();
//! let reducer = BatchReducer::<u64>::builder()
//!     .prover(StubStackProver::new(config.max_updates_per_proof))
//!     .config(config)
//!     .ledger(ledger)
//!     .account(account)
//!     .build()?;
//!
//! reducer.dispatch(7).await?;
//! let mut total = 0;
//! for batch in reducer.prepare_batches().await? {
//!     reducer
//!         .process_batch(batch, |action, is_dummy, _| {
//!             if !is_dummy {
//!                 total += action;
//!             }
//!             Ok(())
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod prepare;
pub mod reducer;
pub mod reversal;

pub use batch::{ActionBatch, BatchOutcome, PreparedBatch, process_batch};
pub use config::ReducerConfig;
pub use dispatch::ActionUpdate;
pub use error::{ConfigError, ReducerError, Result};
pub use prepare::plan_batches;
pub use reducer::{BatchReducer, BatchReducerBuilder};
pub use reversal::{
    ActionStackLink, ActionStackProof, ActionStackProver, ActionStackState, StubStackProver,
    prove_reversal,
};

#[cfg(feature = "arkworks")]
pub use reversal::Groth16StackProver;
