//! Element codecs: how a value is laid out as field elements.
//!
//! A [`FieldCodec`] type can be hashed into a list commitment, sent to the
//! ledger as a flat field array, and decoded back. Each codec also names its
//! dummy value, which bounded loops return once they run past the real data.

use ark_ff::{PrimeField, Zero};

use crate::commitment::Fp254;
use crate::error::{ConstraintError, Result};

/// Field-element encoding for list elements and action payloads.
pub trait FieldCodec: Clone + std::fmt::Debug + Sized {
    /// Encode as field elements.
    fn to_fields(&self) -> Vec<Fp254>;

    /// Decode from field elements produced by [`FieldCodec::to_fields`].
    fn from_fields(fields: &[Fp254]) -> Result<Self>;

    /// The designated dummy value.
    fn empty() -> Self;
}

fn expect_len(fields: &[Fp254], expected: usize, type_name: &str) -> Result<()> {
    if fields.len() == expected {
        Ok(())
    } else {
        Err(ConstraintError::Decode(format!(
            "{type_name} expects {expected} field element(s), got {}",
            fields.len()
        )))
    }
}

/// Convert a field element to `u64`, failing if it does not fit.
pub fn field_to_u64(value: &Fp254) -> Result<u64> {
    let bigint = value.into_bigint();
    let limbs = bigint.as_ref();
    if limbs.iter().skip(1).any(|limb| *limb != 0) {
        return Err(ConstraintError::Decode(
            "field element does not fit in u64".to_string(),
        ));
    }
    Ok(limbs.first().copied().unwrap_or(0))
}

impl FieldCodec for Fp254 {
    fn to_fields(&self) -> Vec<Fp254> {
        vec![*self]
    }

    fn from_fields(fields: &[Fp254]) -> Result<Self> {
        expect_len(fields, 1, "Fp254")?;
        Ok(fields[0])
    }

    fn empty() -> Self {
        Fp254::zero()
    }
}

impl FieldCodec for u64 {
    fn to_fields(&self) -> Vec<Fp254> {
        vec![Fp254::from(*self)]
    }

    fn from_fields(fields: &[Fp254]) -> Result<Self> {
        expect_len(fields, 1, "u64")?;
        field_to_u64(&fields[0])
    }

    fn empty() -> Self {
        0
    }
}

impl FieldCodec for bool {
    fn to_fields(&self) -> Vec<Fp254> {
        vec![Fp254::from(*self as u64)]
    }

    fn from_fields(fields: &[Fp254]) -> Result<Self> {
        expect_len(fields, 1, "bool")?;
        match field_to_u64(&fields[0])? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ConstraintError::Decode(format!(
                "bool expects 0 or 1, got {other}"
            ))),
        }
    }

    fn empty() -> Self {
        false
    }
}

impl<const N: usize> FieldCodec for [Fp254; N] {
    fn to_fields(&self) -> Vec<Fp254> {
        self.to_vec()
    }

    fn from_fields(fields: &[Fp254]) -> Result<Self> {
        expect_len(fields, N, "field array")?;
        let mut out = [Fp254::zero(); N];
        out.copy_from_slice(fields);
        Ok(out)
    }

    fn empty() -> Self {
        [Fp254::zero(); N]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_rejects_large_field() {
        let large = -Fp254::from(1u64);
        assert!(matches!(
            u64::from_fields(&[large]),
            Err(ConstraintError::Decode(_))
        ));
        assert_eq!(u64::from_fields(&[Fp254::from(42u64)]), Ok(42));
    }

    #[test]
    fn test_bool_rejects_non_binary() {
        assert_eq!(bool::from_fields(&[Fp254::from(1u64)]), Ok(true));
        assert!(bool::from_fields(&[Fp254::from(2u64)]).is_err());
    }

    #[test]
    fn test_array_length_checked() {
        let fields = vec![Fp254::from(1u64), Fp254::from(2u64)];
        assert!(<[Fp254; 3]>::from_fields(&fields).is_err());
        assert_eq!(
            <[Fp254; 2]>::from_fields(&fields),
            Ok([Fp254::from(1u64), Fp254::from(2u64)])
        );
    }
}
