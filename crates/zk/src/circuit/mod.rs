//! Arkworks circuit backend.
//!
//! Hand-written R1CS gadgets for hash-committed lists plus Groth16 key and
//! proof helpers over BN254. Circuits themselves live with the code that owns
//! the statement (the stack reversal circuit lives in `batch-reducer`).
//!
//! ```text
//! native list op  ──►  gadget (same relation)  ──►  ConstraintSynthesizer
//!                                                         │
//!                                                   Groth16Keys / prove / verify
//! ```

pub mod gadgets;
pub mod groth16;

pub use gadgets::{
    hash_with_prefix_gadget, next_hash_gadget, pop_if_unsafe_gadget, push_if_gadget,
};
pub use groth16::Groth16Keys;
