//! Tally circuit inputs and their replay.

use ff::Field;
use primitives::{fp_from_u128, salted_commitment, serde_fp, Fp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tree::{params, verify_merkle_path, IncrementalTree, MerklePath};

use domain::StateLeaf;

use crate::{tally_public_signals, Transcript, WitnessError};

/// Root of the quinary tally tree over `results`, zero-padded to `5^depth`.
pub fn tally_tree_root(results: &[u128], depth: usize) -> Result<Fp, WitnessError> {
    let mut tree = IncrementalTree::new(params::QUINARY, depth, Fp::ZERO)?;
    for r in results {
        tree.insert(fp_from_u128(*r))?;
    }
    Ok(tree.root())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyCircuitInputs {
    pub vote_option_tree_depth: usize,
    #[serde(with = "serde_fp")]
    pub state_root: Fp,
    /// Root of the `state_leaves.len()` leaves starting at `batch_start_index`.
    #[serde(with = "serde_fp")]
    pub intermediate_state_root: Fp,
    pub intermediate_path_index: u64,
    pub intermediate_path: MerklePath,
    pub batch_start_index: u64,
    pub state_leaves: Vec<StateLeaf>,
    /// Every vote-option weight of each leaf in the batch.
    pub vote_leaves: Vec<Vec<u64>>,
    pub current_results: Vec<u128>,
    #[serde(with = "serde_fp")]
    pub current_salt: Fp,
    #[serde(with = "serde_fp")]
    pub current_results_commitment: Fp,
    pub new_results: Vec<u128>,
    #[serde(with = "serde_fp")]
    pub new_salt: Fp,
    #[serde(with = "serde_fp")]
    pub new_results_commitment: Fp,
}

impl TallyCircuitInputs {
    pub fn public_signals(&self) -> Vec<Fp> {
        tally_public_signals(
            self.new_results_commitment,
            self.state_root,
            self.intermediate_path_index,
            self.intermediate_state_root,
            self.current_results_commitment,
        )
    }

    /// Binding digest over the public signals and the tallied leaves.
    pub fn digest(&self) -> [u8; 32] {
        let mut t = Transcript::new(b"qv/tally-inputs");
        t.absorb_fields(&self.public_signals());
        t.absorb_u64(self.batch_start_index);
        for leaf in &self.state_leaves {
            t.absorb_field(&leaf.hash());
        }
        t.absorb_field(&self.new_salt);
        t.challenge_bytes(b"digest")
    }
}

/// Re-derive the new results commitment from the inputs alone.
pub fn replay_tally(inputs: &TallyCircuitInputs) -> Result<Fp, WitnessError> {
    let depth = inputs.vote_option_tree_depth;
    let batch = inputs.state_leaves.len();
    if !batch.is_power_of_two() || inputs.vote_leaves.len() != batch {
        return Err(WitnessError::Shape(format!("batch of {batch} leaves")));
    }
    let width = params::QUINARY.checked_pow(depth as u32).ok_or(WitnessError::Shape("vote-option depth".into()))?;
    if inputs.current_results.len() != width || inputs.new_results.len() != width {
        return Err(WitnessError::Shape(format!("results must have {width} entries")));
    }

    let current = salted_commitment(tally_tree_root(&inputs.current_results, depth)?, inputs.current_salt);
    if current != inputs.current_results_commitment {
        return Err(WitnessError::CurrentCommitment);
    }

    // Batch subtree: a full binary tree over the leaf hashes.
    let mut subtree = IncrementalTree::new(params::BINARY, batch.trailing_zeros() as usize, Fp::ZERO)?;
    for leaf in &inputs.state_leaves {
        subtree.insert(leaf.hash())?;
    }
    if subtree.root() != inputs.intermediate_state_root {
        return Err(WitnessError::IntermediateRoot);
    }
    if inputs.intermediate_path.index() != inputs.intermediate_path_index
        || inputs.batch_start_index != inputs.intermediate_path_index * batch as u64
        || !verify_merkle_path(inputs.intermediate_state_root, &inputs.intermediate_path, &inputs.state_root)
    {
        return Err(WitnessError::IntermediatePath);
    }

    // The zeroth leaf holds no votes.
    let counted: Vec<(u64, &StateLeaf, &Vec<u64>)> = inputs
        .state_leaves
        .iter()
        .zip(inputs.vote_leaves.iter())
        .enumerate()
        .map(|(i, (leaf, votes))| (inputs.batch_start_index + i as u64, leaf, votes))
        .filter(|(index, _, _)| *index != 0)
        .collect();

    counted.par_iter().try_for_each(|(index, leaf, votes)| {
        if votes.len() != width {
            return Err(WitnessError::Shape(format!("leaf {index} has {} vote leaves", votes.len())));
        }
        let weights: Vec<u128> = votes.iter().map(|w| u128::from(*w)).collect();
        if tally_tree_root(&weights, depth)? != leaf.vote_option_tree_root {
            return Err(WitnessError::VoteRoot { index: *index });
        }
        Ok(())
    })?;

    let mut totals = inputs.current_results.clone();
    for (_, _, votes) in &counted {
        for (total, w) in totals.iter_mut().zip(votes.iter()) {
            *total = total.checked_add(u128::from(*w)).ok_or(WitnessError::Overflow)?;
        }
    }
    if totals != inputs.new_results {
        return Err(WitnessError::Results);
    }
    Ok(salted_commitment(tally_tree_root(&totals, depth)?, inputs.new_salt))
}
