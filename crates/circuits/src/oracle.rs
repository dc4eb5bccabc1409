//! Witness oracle: the independent computation a witness must agree with.

use primitives::Fp;

use crate::{replay_batch, replay_tally, BatchUpdateWitness, TallyCircuitInputs, WitnessError};

pub trait WitnessOracle {
    /// New state root implied by a batch-update witness.
    fn batch_root(&self, witness: &BatchUpdateWitness) -> Result<Fp, WitnessError>;

    /// New results commitment implied by tally inputs.
    fn tally_commitment(&self, inputs: &TallyCircuitInputs) -> Result<Fp, WitnessError>;
}

/// Replays witnesses through the same transition and tally rules the engine
/// uses, from the witness data alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplayOracle;

impl WitnessOracle for ReplayOracle {
    fn batch_root(&self, witness: &BatchUpdateWitness) -> Result<Fp, WitnessError> {
        replay_batch(witness)
    }

    fn tally_commitment(&self, inputs: &TallyCircuitInputs) -> Result<Fp, WitnessError> {
        replay_tally(inputs)
    }
}
