//! Groth16 proving and verification on BN254 curve.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::RngCore;

use crate::commitment::Fp254;
use crate::prover::ProofError;

/// Groth16 proving and verifying keys for one circuit shape.
#[derive(Clone)]
pub struct Groth16Keys {
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
    pub prepared_verifying_key: PreparedVerifyingKey<Bn254>,
}

impl Groth16Keys {
    /// Circuit-specific setup from a template instance.
    ///
    /// The setup randomness must not be retained; production deployments
    /// should load keys from a ceremony instead.
    pub fn generate<C, R>(circuit: C, rng: &mut R) -> Result<Self, ProofError>
    where
        C: ConstraintSynthesizer<Fp254>,
        R: RngCore,
    {
        let proving_key = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
            .map_err(|e| {
                ProofError::CircuitProofError(format!("Groth16 key generation failed: {e:?}"))
            })?;
        tracing::debug!(
            public_inputs = proving_key.vk.gamma_abc_g1.len().saturating_sub(1),
            "Groth16 setup complete"
        );
        Ok(Self::from_proving_key(proving_key))
    }

    fn from_proving_key(proving_key: ProvingKey<Bn254>) -> Self {
        let verifying_key = proving_key.vk.clone();
        let prepared_verifying_key = ark_groth16::prepare_verifying_key(&verifying_key);
        Self {
            proving_key,
            verifying_key,
            prepared_verifying_key,
        }
    }

    /// Serialize the proving key (which embeds the verifying key).
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(Self::from_proving_key(proving_key))
    }
}

/// Generate a Groth16 proof for a circuit carrying its witness values.
pub fn prove<C, R>(circuit: C, keys: &Groth16Keys, rng: &mut R) -> Result<Proof<Bn254>, ProofError>
where
    C: ConstraintSynthesizer<Fp254>,
    R: RngCore,
{
    Groth16::<Bn254>::create_random_proof_with_reduction(circuit, &keys.proving_key, rng)
        .map_err(|e| ProofError::CircuitProofError(format!("Groth16 proving failed: {e:?}")))
}

/// Verify a proof against its public inputs.
pub fn verify(
    proof: &Proof<Bn254>,
    public_inputs: &[Fp254],
    keys: &Groth16Keys,
) -> Result<bool, ProofError> {
    Groth16::<Bn254>::verify_proof(&keys.prepared_verifying_key, proof, public_inputs)
        .map_err(|e| ProofError::CircuitProofError(format!("Groth16 verification failed: {e:?}")))
}

pub fn serialize_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ProofError> {
    let mut bytes = Vec::new();
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| ProofError::SerializationError(e.to_string()))?;
    Ok(bytes)
}

pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ProofError> {
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ProofError::SerializationError(e.to_string()))
}
