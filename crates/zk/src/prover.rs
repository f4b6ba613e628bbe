//! Proof containers shared by every proving backend.
//!
//! A proof is carried around as opaque bytes tagged with the backend that
//! produced it. The statement a proof attests to is owned by the caller
//! (see the stack prover in `batch-reducer`); this module only fixes the
//! envelope and the error vocabulary.

/// ZK proof data container.
///
/// Contains serialized proof bytes and backend identifier.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProofData {
    pub bytes: Vec<u8>,
    pub backend: ProofBackend,
}

impl ProofData {
    pub fn new(backend: ProofBackend, bytes: Vec<u8>) -> Self {
        Self { bytes, backend }
    }

    /// Fail unless this proof was produced by `expected`.
    pub fn expect_backend(&self, expected: ProofBackend) -> Result<(), ProofError> {
        if self.backend == expected {
            Ok(())
        } else {
            Err(ProofError::BackendMismatch {
                expected,
                actual: self.backend,
            })
        }
    }
}

/// Identifies which proving backend generated a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProofBackend {
    /// Attestation-only backend. Re-checks the statement natively and binds it
    /// with a Poseidon digest; no zero-knowledge guarantees.
    Stub,

    /// Groth16 over BN254.
    #[cfg(feature = "arkworks")]
    Arkworks,
}

/// Errors that can occur during proof generation or verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("proof verification failed: {0}")]
    Verification(String),

    #[error("proof backend mismatch: expected {expected:?}, got {actual:?}")]
    BackendMismatch {
        expected: ProofBackend,
        actual: ProofBackend,
    },

    #[error("proof chain inconsistency: {0}")]
    StateInconsistency(String),

    #[cfg(feature = "arkworks")]
    #[error("circuit proof generation failed: {0}")]
    CircuitProofError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
