//! Constraint failures raised while building a bounded computation.
//!
//! Every equality or boolean assertion in the list engine is a hard failure of
//! the current attempt. Natively it surfaces as a [`ConstraintError`]; inside a
//! circuit the same condition makes the constraint system unsatisfiable.

use crate::commitment::{Fp254, short_hex};

/// Errors surfaced by list operations and element codecs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("constraint violated: {0}")]
    Violation(String),

    #[error("could not decode element: {0}")]
    Decode(String),
}

impl ConstraintError {
    pub fn violation(message: impl Into<String>) -> Self {
        Self::Violation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConstraintError>;

/// Assert that two field elements are equal.
pub fn assert_equal(actual: Fp254, expected: Fp254, message: &str) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConstraintError::Violation(format!(
            "{message} (got {}, expected {})",
            short_hex(&actual),
            short_hex(&expected)
        )))
    }
}

/// Assert that a boolean condition holds.
pub fn assert_true(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ConstraintError::Violation(message.to_string()))
    }
}

/// Field-level select: `if condition { when_true } else { when_false }`.
///
/// Kept as a function so native code reads like its gadget counterpart.
#[inline]
pub fn select<T>(condition: bool, when_true: T, when_false: T) -> T {
    if condition { when_true } else { when_false }
}
