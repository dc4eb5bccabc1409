//! Quadratic vote tally over contiguous state-leaf ranges.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use circuits::{tally_tree_root, TallyCircuitInputs};
use primitives::{salted_commitment, serde_fp, Fp};

use crate::batch::batch_end;
use crate::{EngineError, StateRegistry};

/// Per-option sums of vote weights.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Tally {
    pub results: Vec<u128>,
}

impl Tally {
    pub fn zero(options: usize) -> Self {
        Self { results: vec![0; options] }
    }

    /// `hash(tallyRoot, salt)` over the quinary tally tree.
    pub fn commitment(&self, salt: Fp, depth: usize) -> Result<Fp, EngineError> {
        Ok(salted_commitment(tally_tree_root(&self.results, depth)?, salt))
    }
}

/// Results with the salt that opens their commitment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PublishedTally {
    pub tally: Tally,
    #[serde(with = "serde_fp")]
    pub salt: Fp,
    #[serde(with = "serde_fp")]
    pub commitment: Fp,
}

/// `current` plus every participant's weights in `[start, start + size)`.
/// The zeroth leaf and unassigned slots add nothing.
pub(crate) fn accumulate(
    registry: &StateRegistry,
    current: &Tally,
    start: u64,
    size: u64,
) -> Result<Tally, EngineError> {
    let end = batch_end(start, size)?.min(registry.len());
    let first = start.max(1);
    let width = current.results.len();

    let batch = (first..end.max(first))
        .into_par_iter()
        .map(|index| {
            let weights = registry.vote_options(index).map(|v| v.weights()).unwrap_or(&[]);
            let mut sums = vec![0u128; width];
            for (s, w) in sums.iter_mut().zip(weights.iter()) {
                *s = u128::from(*w);
            }
            sums
        })
        .reduce(|| vec![0u128; width], |mut a, b| {
            for (x, y) in a.iter_mut().zip(b) {
                *x = x.saturating_add(y);
            }
            a
        });

    let mut results = current.results.clone();
    for (option, (r, b)) in results.iter_mut().zip(batch).enumerate() {
        *r = r.checked_add(b).ok_or(EngineError::TallyOverflow { option })?;
    }
    Ok(Tally { results })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn circuit_inputs(
    registry: &StateRegistry,
    vote_option_tree_depth: usize,
    current: &Tally,
    start: u64,
    size: u64,
    current_salt: Fp,
    new_salt: Fp,
) -> Result<TallyCircuitInputs, EngineError> {
    if !size.is_power_of_two() || size > registry.capacity() {
        return Err(EngineError::Config(format!("tally batch size {size}")));
    }
    if start % size != 0 {
        return Err(EngineError::BatchOutOfOrder { expected: start - start % size, got: start });
    }
    let end = batch_end(start, size)?;
    let level = size.trailing_zeros() as usize;
    let path_index = start / size;
    let tree = registry.tree();
    let width = current.results.len();

    let state_leaves: Vec<_> = (start..end).map(|i| registry.leaf_or_blank(i)).collect();
    let vote_leaves: Vec<Vec<u64>> = (start..end)
        .map(|i| match registry.vote_options(i) {
            Some(v) if i != 0 => v.weights().to_vec(),
            _ => vec![0; width],
        })
        .collect();

    let new = accumulate(registry, current, start, size)?;
    Ok(TallyCircuitInputs {
        vote_option_tree_depth,
        state_root: registry.root(),
        intermediate_state_root: tree.node(level, path_index as usize)?,
        intermediate_path_index: path_index,
        intermediate_path: tree.gen_merkle_subpath(level, path_index as usize)?,
        batch_start_index: start,
        state_leaves,
        vote_leaves,
        current_results: current.results.clone(),
        current_salt,
        current_results_commitment: current.commitment(current_salt, vote_option_tree_depth)?,
        new_results_commitment: new.commitment(new_salt, vote_option_tree_depth)?,
        new_results: new.results,
        new_salt,
    })
}
