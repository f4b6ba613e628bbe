//! Hash-committed data structures over BN254.
//!
//! This crate provides the primitives the reducer is built on:
//! - **Commitments**: domain-separated Poseidon hashing of field elements
//! - **Codecs**: how values are laid out as field elements
//! - **Lists**: [`HashCommittedList`] and its bidirectional [`ListCursor`]
//! - **Proofs**: backend-tagged proof envelopes and errors
//!
//! # Feature Flags
//!
//! - `arkworks`: R1CS gadgets mirroring the list operations plus Groth16
//!   helpers (`circuit` module)
//!
//! # Examples
//!
//! ```toml
//! # Native list engine
//! zk = { path = "../zk" }
//!
//! # With the Groth16 circuit backend
//! zk = { path = "../zk", features = ["arkworks"] }
//! ```

pub mod codec;
pub mod commitment;
pub mod error;
pub mod list;
pub mod prover;

#[cfg(feature = "arkworks")]
pub mod circuit;

pub use codec::{FieldCodec, field_to_u64};
pub use commitment::{Fp254, hash_with_prefix, salt, short_hex};
pub use error::ConstraintError;
pub use list::{
    FieldList, HashCommittedList, ListCodec, ListCursor, ListOf, ListWitness, Step,
};
pub use prover::{ProofBackend, ProofData, ProofError};
