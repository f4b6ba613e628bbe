//! Stack reversal proofs.
//!
//! A proof states: "starting from `origin`, `steps` valid chunks reach
//! `output`". Each new chunk is proven against the previous proof, so the
//! chain grows one chunk at a time, oldest walk position first.

use serde::{Deserialize, Serialize};
use tracing::debug;
use zk::commitment::{hash_with_prefix, short_hex};
use zk::{Fp254, ProofBackend, ProofData, ProofError};

use super::state::{ActionStackLink, ActionStackState, ChunkMode, stack_chunk};
use crate::error::{ReducerError, Result};

/// Proof that a number of reversal chunks lead from `origin` to `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStackProof {
    pub origin: ActionStackState,
    pub output: ActionStackState,
    pub steps: u64,
    pub proof: ProofData,
}

/// Proving backend for reversal chunks.
pub trait ActionStackProver: Send + Sync {
    fn backend(&self) -> ProofBackend;

    /// Number of pop slots per chunk.
    fn chunk_size(&self) -> usize;

    /// Prove one chunk starting at `input`, extending `previous` if given.
    ///
    /// `previous` must verify and end at `input`.
    fn prove_chunk(
        &self,
        input: ActionStackState,
        previous: Option<&ActionStackProof>,
        links: &[ActionStackLink],
    ) -> Result<ActionStackProof>;

    fn verify(&self, proof: &ActionStackProof) -> std::result::Result<(), ProofError>;
}

/// Check that `previous` can be extended from `input`.
pub(crate) fn check_previous(
    prover: &dyn ActionStackProver,
    input: ActionStackState,
    previous: Option<&ActionStackProof>,
) -> Result<(ActionStackState, u64)> {
    match previous {
        None => Ok((input, 0)),
        Some(proof) => {
            prover.verify(proof)?;
            if proof.output != input {
                return Err(ProofError::StateInconsistency(format!(
                    "previous proof ends at {:?}, chunk starts at {input:?}",
                    proof.output
                ))
                .into());
            }
            Ok((proof.origin, proof.steps))
        }
    }
}

/// Prove the whole walk `links` (pop order) from `input` in chunks.
///
/// Returns `None` when `links` is empty.
pub fn prove_reversal(
    prover: &dyn ActionStackProver,
    input: ActionStackState,
    links: &[ActionStackLink],
) -> Result<Option<ActionStackProof>> {
    let mut proof: Option<ActionStackProof> = None;
    let mut state = input;
    for chunk in links.chunks(prover.chunk_size().max(1)) {
        let next = prover.prove_chunk(state, proof.as_ref(), chunk)?;
        debug!(
            step = next.steps,
            pops = chunk.len(),
            actions = %short_hex(&next.output.actions),
            "proved reversal chunk"
        );
        state = next.output;
        proof = Some(next);
    }
    Ok(proof)
}

// ============================================================================
// Stub Prover
// ============================================================================

const STUB_DIGEST_PREFIX: &str = "StubStackProof";

#[derive(Serialize, Deserialize)]
struct StubAttestation {
    origin: ActionStackState,
    output: ActionStackState,
    steps: u64,
    #[serde(with = "zk::commitment::serde_field")]
    digest: Fp254,
}

fn stub_digest(origin: &ActionStackState, output: &ActionStackState, steps: u64) -> Fp254 {
    let [origin_actions, origin_stack] = origin.to_fields();
    let [output_actions, output_stack] = output.to_fields();
    hash_with_prefix(
        STUB_DIGEST_PREFIX,
        &[
            origin_actions,
            origin_stack,
            output_actions,
            output_stack,
            Fp254::from(steps),
        ],
    )
}

/// Stub prover for testing and development.
///
/// Re-executes every chunk natively, so invalid witnesses are still rejected,
/// and emits an attestation bound to the statement by a Poseidon digest.
///
/// **Warning**: Provides no cryptographic guarantees - do not use in production.
#[derive(Debug, Clone)]
pub struct StubStackProver {
    chunk_size: usize,
}

impl StubStackProver {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

impl ActionStackProver for StubStackProver {
    fn backend(&self) -> ProofBackend {
        ProofBackend::Stub
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn prove_chunk(
        &self,
        input: ActionStackState,
        previous: Option<&ActionStackProof>,
        links: &[ActionStackLink],
    ) -> Result<ActionStackProof> {
        let (origin, steps) = check_previous(self, input, previous)?;
        let output = stack_chunk(self.chunk_size, input, links, ChunkMode::Links)?;
        let steps = steps + 1;

        let attestation = StubAttestation {
            origin,
            output,
            steps,
            digest: stub_digest(&origin, &output, steps),
        };
        let bytes = bincode::serialize(&attestation)
            .map_err(|e| ReducerError::Proof(ProofError::SerializationError(e.to_string())))?;

        Ok(ActionStackProof {
            origin,
            output,
            steps,
            proof: ProofData::new(ProofBackend::Stub, bytes),
        })
    }

    fn verify(&self, proof: &ActionStackProof) -> std::result::Result<(), ProofError> {
        proof.proof.expect_backend(ProofBackend::Stub)?;
        let attestation: StubAttestation = bincode::deserialize(&proof.proof.bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;

        if attestation.origin != proof.origin
            || attestation.output != proof.output
            || attestation.steps != proof.steps
        {
            return Err(ProofError::Verification(
                "attestation does not match the claimed statement".to_string(),
            ));
        }
        if attestation.digest != stub_digest(&proof.origin, &proof.output, proof.steps) {
            return Err(ProofError::Verification(
                "attestation digest mismatch".to_string(),
            ));
        }
        Ok(())
    }
}
