//! Error types for configuring and running a batch reducer.

use ledger_core::LedgerError;
use zk::commitment::short_hex;
use zk::{ConstraintError, Fp254, ProofError};

/// Invalid or incomplete reducer setup. Raised before any commitment work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be at least 1")]
    ZeroBound { name: &'static str },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("reducer builder is missing {0}")]
    Missing(&'static str),

    #[error("batch_size {batch_size} is smaller than max_actions_per_update {max_actions_per_update}")]
    BudgetBelowUpdate {
        batch_size: usize,
        max_actions_per_update: usize,
    },

    #[error("prover chunk size {actual} does not match max_updates_per_proof {expected}")]
    ChunkSizeMismatch { expected: usize, actual: usize },

    #[error("update holds {len} actions, at most {max} allowed per update")]
    UpdateTooLarge { len: usize, max: usize },
}

/// Errors surfaced by reducer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReducerError {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(
        "stale stack: batch expects {}, ledger holds {}",
        short_hex(.expected),
        short_hex(.actual)
    )]
    StaleStack { expected: Fp254, actual: Fp254 },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("fetching pending actions failed: {0}")]
    ExternalFetch(LedgerError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("proof error: {0}")]
    Proof(#[from] ProofError),
}

impl ReducerError {
    /// True for every failure that makes the computation unsatisfiable.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::Constraint(_) | Self::StaleStack { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReducerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_stack_is_constraint_violation() {
        let err = ReducerError::StaleStack {
            expected: Fp254::from(1u64),
            actual: Fp254::from(2u64),
        };
        assert!(err.is_constraint_violation());
        assert!(err.to_string().starts_with("stale stack"));

        let err = ReducerError::from(ConstraintError::violation("boom"));
        assert!(err.is_constraint_violation());

        let err = ReducerError::ExternalFetch(LedgerError::FetchFailed("down".into()));
        assert!(!err.is_constraint_violation());
    }
}
