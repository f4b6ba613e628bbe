//! Action-stack reversal.
//!
//! The action-state chain can only be popped newest-first. Walking it from
//! the on-chain action state back to the processed pointer and pushing every
//! popped list hash onto a second commitment (the stack) leaves the oldest
//! update on top, so popping the stack yields chronological order.
//!
//! ```text
//! walk (pop order):  newest ───────────────────────────────► oldest (processed)
//!                    [ chunk 0 | chunk 1 | ... | chunk k ]  [ final chunk ]
//!                      proven, each step verifies the last   re-executed directly
//! ```
//!
//! Recursive chunks hold `max_updates_per_proof` pops; the final chunk holds
//! at most `max_updates_final_proof` pops and is re-executed while processing
//! the batch, saving one proof.

#[cfg(feature = "arkworks")]
pub mod groth16;
pub mod prover;
pub mod state;

#[cfg(feature = "arkworks")]
pub use groth16::{ActionStackCircuit, ChunkSlot, Groth16StackProver};
pub use prover::{ActionStackProof, ActionStackProver, StubStackProver, prove_reversal};
pub use state::{
    ActionStackLink, ActionStackState, ChunkMode, links_in_pop_order, stack_chunk,
};
