//! R1CS gadgets mirroring the native list operations.
//!
//! Each gadget enforces the same relation its native counterpart asserts:
//!
//! - `commitment::hash_with_prefix()` ↔ [`hash_with_prefix_gadget`]
//! - `HashCommittedList::push_if()` ↔ [`push_if_gadget`]
//! - `HashCommittedList::pop_if_unsafe()` ↔ [`pop_if_unsafe_gadget`]
//!
//! The list gadgets work on any codec whose fold is
//! `hash_with_prefix(prefix, [previous, element_fields..])`.

use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::FieldVar;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::select::CondSelectGadget;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::commitment::{Fp254, get_poseidon_config, prefix_to_field};

/// Poseidon hash of `inputs` under `prefix`, fully constrained.
pub fn hash_with_prefix_gadget(
    cs: ConstraintSystemRef<Fp254>,
    prefix: &str,
    inputs: &[FpVar<Fp254>],
) -> Result<FpVar<Fp254>, SynthesisError> {
    let mut absorbed = Vec::with_capacity(inputs.len() + 1);
    absorbed.push(FpVar::constant(prefix_to_field(prefix)));
    absorbed.extend_from_slice(inputs);

    let mut sponge = PoseidonSpongeVar::new(cs, get_poseidon_config());
    sponge.absorb(&absorbed)?;
    let mut output = sponge.squeeze_field_elements(1)?;
    output.pop().ok_or(SynthesisError::Unsatisfiable)
}

/// Fold one element onto `previous`.
pub fn next_hash_gadget(
    cs: ConstraintSystemRef<Fp254>,
    prefix: &str,
    previous: &FpVar<Fp254>,
    element: &[FpVar<Fp254>],
) -> Result<FpVar<Fp254>, SynthesisError> {
    let mut inputs = Vec::with_capacity(element.len() + 1);
    inputs.push(previous.clone());
    inputs.extend_from_slice(element);
    hash_with_prefix_gadget(cs, prefix, &inputs)
}

/// `hash' = condition ? H(hash, element) : hash`.
pub fn push_if_gadget(
    cs: ConstraintSystemRef<Fp254>,
    prefix: &str,
    hash: &FpVar<Fp254>,
    condition: &Boolean<Fp254>,
    element: &[FpVar<Fp254>],
) -> Result<FpVar<Fp254>, SynthesisError> {
    let pushed = next_hash_gadget(cs, prefix, hash, element)?;
    FpVar::conditionally_select(condition, &pushed, hash)
}

/// Pop iff `should_pop`, returning the new commitment.
///
/// Enforces `hash == (should_pop ? H(previous, element) : hash)`; the new
/// commitment is `previous` when popping and `hash` otherwise. The caller
/// supplies `(previous, element)` as witnesses.
pub fn pop_if_unsafe_gadget(
    cs: ConstraintSystemRef<Fp254>,
    prefix: &str,
    hash: &FpVar<Fp254>,
    should_pop: &Boolean<Fp254>,
    previous: &FpVar<Fp254>,
    element: &[FpVar<Fp254>],
) -> Result<FpVar<Fp254>, SynthesisError> {
    let folded = next_hash_gadget(cs, prefix, previous, element)?;
    let required = FpVar::conditionally_select(should_pop, &folded, hash)?;
    hash.enforce_equal(&required)?;
    FpVar::conditionally_select(should_pop, previous, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::R1CSVar;
    use ark_r1cs_std::alloc::AllocVar;
    use ark_relations::r1cs::ConstraintSystem;

    use crate::commitment::hash_with_prefix;

    const PREFIX: &str = "GadgetTest";

    fn witness(cs: &ConstraintSystemRef<Fp254>, value: u64) -> FpVar<Fp254> {
        FpVar::new_witness(cs.clone(), || Ok(Fp254::from(value))).unwrap()
    }

    #[test]
    fn test_pop_if_unsafe_gadget_accepts_valid_witness() {
        let cs = ConstraintSystem::<Fp254>::new_ref();
        let previous = Fp254::from(3u64);
        let element = Fp254::from(8u64);
        let hash = hash_with_prefix(PREFIX, &[previous, element]);

        let hash_var = FpVar::new_witness(cs.clone(), || Ok(hash)).unwrap();
        let should_pop = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let prev_var = witness(&cs, 3);
        let elem_var = witness(&cs, 8);

        let out = pop_if_unsafe_gadget(
            cs.clone(),
            PREFIX,
            &hash_var,
            &should_pop,
            &prev_var,
            &[elem_var],
        )
        .unwrap();

        assert_eq!(out.value().unwrap(), previous);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_pop_if_unsafe_gadget_rejects_forged_witness() {
        let cs = ConstraintSystem::<Fp254>::new_ref();
        let hash = hash_with_prefix(PREFIX, &[Fp254::from(3u64), Fp254::from(8u64)]);

        let hash_var = FpVar::new_witness(cs.clone(), || Ok(hash)).unwrap();
        let should_pop = Boolean::new_witness(cs.clone(), || Ok(true)).unwrap();
        let prev_var = witness(&cs, 3);
        let elem_var = witness(&cs, 9);

        pop_if_unsafe_gadget(
            cs.clone(),
            PREFIX,
            &hash_var,
            &should_pop,
            &prev_var,
            &[elem_var],
        )
        .unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_skipped_pop_keeps_hash() {
        let cs = ConstraintSystem::<Fp254>::new_ref();
        let hash_var = witness(&cs, 77);
        let should_pop = Boolean::new_witness(cs.clone(), || Ok(false)).unwrap();
        let junk = witness(&cs, 1);

        let out = pop_if_unsafe_gadget(
            cs.clone(),
            PREFIX,
            &hash_var,
            &should_pop,
            &junk,
            &[junk.clone()],
        )
        .unwrap();

        assert_eq!(out.value().unwrap(), Fp254::from(77u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_push_if_gadget() {
        let cs = ConstraintSystem::<Fp254>::new_ref();
        let hash_var = witness(&cs, 5);
        let element = witness(&cs, 6);

        let pushed = push_if_gadget(
            cs.clone(),
            PREFIX,
            &hash_var,
            &Boolean::TRUE,
            &[element.clone()],
        )
        .unwrap();
        let kept = push_if_gadget(cs.clone(), PREFIX, &hash_var, &Boolean::FALSE, &[element])
            .unwrap();

        assert_eq!(
            pushed.value().unwrap(),
            hash_with_prefix(PREFIX, &[Fp254::from(5u64), Fp254::from(6u64)])
        );
        assert_eq!(kept.value().unwrap(), Fp254::from(5u64));
        assert!(cs.is_satisfied().unwrap());
    }
}
