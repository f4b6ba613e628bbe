//! Groth16 backend for reversal chunks.
//!
//! Every chunk is proven by one Groth16 proof over [`ActionStackCircuit`] with
//! public inputs `[in.actions, in.stack, out.actions, out.stack]`. A multi-chunk
//! proof carries the ordered list of step proofs; verification checks each
//! step and that consecutive steps share their boundary state.

use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ledger_core::actions::{ACTION_STACK_PUSH_PREFIX, ACTION_STATE_PUSH_PREFIX};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zk::circuit::groth16::{self, Groth16Keys};
use zk::circuit::{pop_if_unsafe_gadget, push_if_gadget};
use zk::{Fp254, ProofBackend, ProofData, ProofError};

use super::prover::{ActionStackProof, ActionStackProver, check_previous};
use super::state::{ActionStackLink, ActionStackState, ChunkMode, stack_chunk};
use crate::error::{ReducerError, Result};

/// One pop slot of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSlot {
    pub is_pop: bool,
    pub previous_action_state: Fp254,
    pub list_hash: Fp254,
}

impl ChunkSlot {
    fn skipped() -> Self {
        Self {
            is_pop: false,
            previous_action_state: Fp254::from(0u64),
            list_hash: Fp254::from(0u64),
        }
    }
}

/// R1CS statement of one reversal chunk.
#[derive(Clone, Debug)]
pub struct ActionStackCircuit {
    pub input: ActionStackState,
    pub output: ActionStackState,
    pub slots: Vec<ChunkSlot>,
}

impl ActionStackCircuit {
    /// Circuit for a real chunk; the output is computed natively first.
    pub fn new(
        chunk_size: usize,
        input: ActionStackState,
        links: &[ActionStackLink],
    ) -> Result<Self> {
        let output = stack_chunk(chunk_size, input, links, ChunkMode::Links)?;
        let slots = (0..chunk_size)
            .map(|slot| match links.get(slot) {
                Some(link) => ChunkSlot {
                    is_pop: true,
                    previous_action_state: link.previous_action_state,
                    list_hash: link.list_hash,
                },
                None => ChunkSlot::skipped(),
            })
            .collect();
        Ok(Self {
            input,
            output,
            slots,
        })
    }

    /// Shape-only instance used for key generation.
    pub fn template(chunk_size: usize) -> Self {
        let zero = ActionStackState::new(Fp254::from(0u64), Fp254::from(0u64));
        Self {
            input: zero,
            output: zero,
            slots: vec![ChunkSlot::skipped(); chunk_size],
        }
    }

    pub fn public_inputs(&self) -> Vec<Fp254> {
        public_inputs(&self.input, &self.output)
    }
}

fn public_inputs(input: &ActionStackState, output: &ActionStackState) -> Vec<Fp254> {
    let mut inputs = input.to_fields().to_vec();
    inputs.extend(output.to_fields());
    inputs
}

impl ConstraintSynthesizer<Fp254> for ActionStackCircuit {
    fn generate_constraints(
        self,
        cs: ConstraintSystemRef<Fp254>,
    ) -> std::result::Result<(), SynthesisError> {
        let input_actions = FpVar::new_input(cs.clone(), || Ok(self.input.actions))?;
        let input_stack = FpVar::new_input(cs.clone(), || Ok(self.input.stack))?;
        let output_actions = FpVar::new_input(cs.clone(), || Ok(self.output.actions))?;
        let output_stack = FpVar::new_input(cs.clone(), || Ok(self.output.stack))?;

        let mut actions = input_actions;
        let mut stack = input_stack;
        for slot in &self.slots {
            let is_pop = Boolean::new_witness(cs.clone(), || Ok(slot.is_pop))?;
            let previous = FpVar::new_witness(cs.clone(), || Ok(slot.previous_action_state))?;
            let list_hash = FpVar::new_witness(cs.clone(), || Ok(slot.list_hash))?;

            actions = pop_if_unsafe_gadget(
                cs.clone(),
                ACTION_STATE_PUSH_PREFIX,
                &actions,
                &is_pop,
                &previous,
                std::slice::from_ref(&list_hash),
            )?;
            stack = push_if_gadget(
                cs.clone(),
                ACTION_STACK_PUSH_PREFIX,
                &stack,
                &is_pop,
                std::slice::from_ref(&list_hash),
            )?;
        }

        actions.enforce_equal(&output_actions)?;
        stack.enforce_equal(&output_stack)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Groth16Step {
    input: ActionStackState,
    output: ActionStackState,
    proof: Vec<u8>,
}

/// Groth16 prover for reversal chunks.
pub struct Groth16StackProver {
    chunk_size: usize,
    keys: Groth16Keys,
}

impl Groth16StackProver {
    /// Circuit-specific setup for `chunk_size` slots.
    pub fn setup(chunk_size: usize) -> std::result::Result<Self, ProofError> {
        Self::setup_with_rng(chunk_size, &mut StdRng::from_entropy())
    }

    pub fn setup_with_rng<R: rand::RngCore>(
        chunk_size: usize,
        rng: &mut R,
    ) -> std::result::Result<Self, ProofError> {
        let keys = Groth16Keys::generate(ActionStackCircuit::template(chunk_size), rng)?;
        Ok(Self { chunk_size, keys })
    }

    pub fn keys(&self) -> &Groth16Keys {
        &self.keys
    }

    fn decode_steps(proof: &ActionStackProof) -> std::result::Result<Vec<Groth16Step>, ProofError> {
        bincode::deserialize(&proof.proof.bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))
    }
}

impl ActionStackProver for Groth16StackProver {
    fn backend(&self) -> ProofBackend {
        ProofBackend::Arkworks
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
        let (origin, _) = check_previous(self, input, previous)?;
        let mut steps = match previous {
            Some(proof) => Self::decode_steps(proof)?,
            None => Vec::new(),
        };

        let circuit = ActionStackCircuit::new(self.chunk_size, input, links)?;
        let output = circuit.output;
        let proof = groth16::prove(circuit, &self.keys, &mut StdRng::from_entropy())?;
        steps.push(Groth16Step {
            input,
            output,
            proof: groth16::serialize_proof(&proof)?,
        });
        debug!(step = steps.len(), pops = links.len(), "Groth16 chunk proof generated");

        let bytes = bincode::serialize(&steps)
            .map_err(|e| ReducerError::Proof(ProofError::SerializationError(e.to_string())))?;
        Ok(ActionStackProof {
            origin,
            output,
            steps: steps.len() as u64,
            proof: ProofData::new(ProofBackend::Arkworks, bytes),
        })
    }

    fn verify(&self, proof: &ActionStackProof) -> std::result::Result<(), ProofError> {
        proof.proof.expect_backend(ProofBackend::Arkworks)?;
        let steps = Self::decode_steps(proof)?;

        if steps.len() as u64 != proof.steps {
            return Err(ProofError::Verification(format!(
                "proof claims {} steps, carries {}",
                proof.steps,
                steps.len()
            )));
        }
        let (Some(first), Some(last)) = (steps.first(), steps.last()) else {
            return Err(ProofError::Verification("proof carries no steps".to_string()));
        };
        if first.input != proof.origin || last.output != proof.output {
            return Err(ProofError::Verification(
                "step chain does not match the claimed statement".to_string(),
            ));
        }
        if steps.windows(2).any(|pair| pair[0].output != pair[1].input) {
            return Err(ProofError::Verification(
                "consecutive steps do not share their boundary state".to_string(),
            ));
        }

        for (index, step) in steps.iter().enumerate() {
            let groth16_proof = groth16::deserialize_proof(&step.proof)?;
            let inputs = public_inputs(&step.input, &step.output);
            if !groth16::verify(&groth16_proof, &inputs, &self.keys)? {
                return Err(ProofError::Verification(format!(
                    "Groth16 step {index} failed to verify"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reversal::prover::prove_reversal;
    use crate::reversal::state::links_in_pop_order;
    use ark_relations::r1cs::ConstraintSystem;
    use ledger_core::{ActionList, ActionState, empty_action_state, empty_stack};

    fn chain(len: u64) -> ActionState<u64> {
        ActionState::from_elements((0..len).map(|i| ActionList::from_elements([i, i + 1])))
    }

    fn satisfied(circuit: ActionStackCircuit) -> bool {
        let cs = ConstraintSystem::<Fp254>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_circuit_satisfied_for_valid_chunk() {
        let chain = chain(3);
        let links = links_in_pop_order(&chain);
        let input = ActionStackState::new(chain.hash(), empty_stack());

        let circuit = ActionStackCircuit::new(4, input, &links).unwrap();
        assert_eq!(circuit.output.actions, empty_action_state());
        assert!(satisfied(circuit));
    }

    #[test]
    fn test_circuit_rejects_forged_slot() {
        let chain = chain(2);
        let links = links_in_pop_order(&chain);
        let input = ActionStackState::new(chain.hash(), empty_stack());

        let mut circuit = ActionStackCircuit::new(2, input, &links).unwrap();
        circuit.slots[0].list_hash = Fp254::from(5u64);
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_circuit_rejects_wrong_output() {
        let chain = chain(2);
        let links = links_in_pop_order(&chain);
        let input = ActionStackState::new(chain.hash(), empty_stack());

        let mut circuit = ActionStackCircuit::new(2, input, &links).unwrap();
        circuit.output.stack = empty_stack();
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_groth16_chain_proves_and_verifies() {
        let mut rng = StdRng::seed_from_u64(11);
        let prover = Groth16StackProver::setup_with_rng(2, &mut rng).unwrap();

        let chain = chain(3);
        let links = links_in_pop_order(&chain);
        let input = ActionStackState::new(chain.hash(), empty_stack());

        let proof = prove_reversal(&prover, input, &links).unwrap().unwrap();
        assert_eq!(proof.steps, 2);
        assert_eq!(proof.output.actions, empty_action_state());
        assert!(prover.verify(&proof).is_ok());

        let mut forged = proof.clone();
        forged.output.stack = Fp254::from(3u64);
        assert!(prover.verify(&forged).is_err());
    }
}
