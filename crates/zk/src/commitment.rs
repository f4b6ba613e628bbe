//! Poseidon hash functions for BN254 field elements.
//!
//! Every commitment in the workspace is a single field element produced by
//! [`hash_with_prefix`]: the prefix is packed into a field element and absorbed
//! ahead of the inputs, so commitments built for different structural roles
//! (action lists, action states, stacks, generic lists) never collide.
//!
//! # Performance
//!
//! Uses a globally cached Poseidon config (OnceLock). The round constants and
//! MDS matrix are derived once on first use.
//!
//! # Security Parameters
//!
//! - Field: BN254 scalar field (254-bit prime)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - Rate 2, capacity 1, alpha 5
//!
//! # Consistency with Circuit
//!
//! Must match the gadget counterparts in `circuit::gadgets`:
//! - `hash_with_prefix()` ↔ `hash_with_prefix_gadget()`
//!
//! Validated by `tests/poseidon_consistency.rs` (feature `arkworks`).

use std::sync::OnceLock;

use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInteger, PrimeField, Zero};

/// BN254 scalar field element. The only unit commitments are expressed in.
pub type Fp254 = ark_bn254::Fr;

/// Maximum number of prefix bytes packed into one field element.
pub const MAX_PREFIX_LEN: usize = 31;

/// Cached Poseidon config (initialized once).
static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fp254>> = OnceLock::new();

/// Get cached Poseidon config (8/57 rounds, 128-bit security).
pub fn get_poseidon_config() -> &'static PoseidonConfig<Fp254> {
    POSEIDON_CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fp254>(254, 2, 8, 57, 0);
        PoseidonConfig::new(8, 57, 5, mds, ark, 2, 1)
    })
}

/// Pack an ASCII domain prefix into a field element.
///
/// Bytes are read little-endian; prefixes longer than [`MAX_PREFIX_LEN`] are
/// truncated so the packed value always fits below the modulus.
pub fn prefix_to_field(prefix: &str) -> Fp254 {
    let bytes = prefix.as_bytes();
    let len = bytes.len().min(MAX_PREFIX_LEN);
    Fp254::from_le_bytes_mod_order(&bytes[..len])
}

/// Poseidon hash of `inputs` under the domain `prefix`.
pub fn hash_with_prefix(prefix: &str, inputs: &[Fp254]) -> Fp254 {
    let mut absorbed = Vec::with_capacity(inputs.len() + 1);
    absorbed.push(prefix_to_field(prefix));
    absorbed.extend_from_slice(inputs);

    let mut sponge = PoseidonSponge::<Fp254>::new(get_poseidon_config());
    sponge.absorb(&absorbed);
    // A single-element squeeze always yields exactly one element.
    sponge.squeeze_field_elements::<Fp254>(1)[0]
}

/// Domain constant derived from a prefix alone (`hash_with_prefix(prefix, [])`).
pub fn salt(prefix: &str) -> Fp254 {
    hash_with_prefix(prefix, &[])
}

/// The zero element, used as the default empty commitment for generic lists.
#[inline]
pub fn zero() -> Fp254 {
    Fp254::zero()
}

/// Short hex rendering of a field element for log lines (first 8 bytes, big-endian).
pub fn short_hex(value: &Fp254) -> String {
    let bytes = value.into_bigint().to_bytes_be();
    hex::encode(&bytes[..8.min(bytes.len())])
}

/// Serde adapter for field elements (canonical compressed encoding).
///
/// Use with `#[serde(with = "zk::commitment::serde_field")]`.
pub mod serde_field {
    use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Fp254;

    pub fn serialize<S: Serializer>(value: &Fp254, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::with_capacity(32);
        value
            .serialize_compressed(&mut bytes)
            .map_err(|e| S::Error::custom(e.to_string()))?;
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fp254, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Fp254::deserialize_compressed(bytes.as_slice()).map_err(|e| D::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let inputs = [Fp254::from(3u64), Fp254::from(4u64)];
        let result1 = hash_with_prefix("Test", &inputs);
        let result2 = hash_with_prefix("Test", &inputs);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_prefix_separates_domains() {
        let inputs = [Fp254::from(3u64), Fp254::from(4u64)];
        assert_ne!(
            hash_with_prefix("DomainA", &inputs),
            hash_with_prefix("DomainB", &inputs)
        );
    }

    #[test]
    fn test_input_order_matters() {
        let (left, right) = (Fp254::from(3u64), Fp254::from(4u64));
        assert_ne!(
            hash_with_prefix("Test", &[left, right]),
            hash_with_prefix("Test", &[right, left])
        );
    }

    #[test]
    fn test_salt_is_nonzero_and_distinct() {
        let a = salt("ActionsEmpty");
        let b = salt("ActionStateEmpty");
        assert_ne!(a, zero());
        assert_ne!(a, b);
    }

    #[test]
    fn test_long_prefix_is_truncated() {
        let long = "A".repeat(64);
        let truncated = "A".repeat(MAX_PREFIX_LEN);
        assert_eq!(prefix_to_field(&long), prefix_to_field(&truncated));
    }

    #[test]
    fn test_serde_field_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper(#[serde(with = "serde_field")] Fp254);

        let value = hash_with_prefix("Test", &[Fp254::from(9u64)]);
        let bytes = bincode::serialize(&Wrapper(value)).expect("serialize");
        let decoded: Wrapper = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(decoded.0, value);
    }
}
