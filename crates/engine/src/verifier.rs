//! Tally result verification.
//!
//! A result is checked against a salted commitment to the quinary tally tree.
//! Per-option proofs use the full tree; aggregated proofs hash each group of
//! five adjacent results into one leaf of a tree one level shallower, whose
//! root is the same.

use ff::Field;
use primitives::{fp_from_u128, hash5_padded, salted_commitment, serde_fp, verify_salted_commitment, Fp};
use serde::{Deserialize, Serialize};
use tree::{compute_root, params, IncrementalTree, MerklePath, TreeError};

/// Inclusion proof for one (possibly aggregated) tally leaf.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TallyResultProof {
    pub depth: usize,
    pub index: usize,
    #[serde(with = "serde_fp")]
    pub leaf: Fp,
    pub path: MerklePath,
}

/// Whether `leaf` at `index` of a quinary tree of `depth` opens `claimed`
/// under `salt`.
pub fn verify_tally_result(depth: usize, index: usize, leaf: Fp, path: &MerklePath, salt: Fp, claimed: &Fp) -> bool {
    if path.depth() != depth || path.index() != index as u64 {
        return false;
    }
    if path.path_elements.iter().any(|s| s.len() != params::QUINARY - 1) {
        return false;
    }
    match compute_root(leaf, path) {
        Ok(root) => verify_salted_commitment(root, salt, claimed),
        Err(_) => false,
    }
}

/// Hash each group of five adjacent results; a short last group is
/// zero-padded.
pub fn aggregate_tally_leaves(results: &[Fp]) -> Vec<Fp> {
    results.chunks(params::QUINARY).map(hash5_padded).collect()
}

/// Leaves of the tally tree at `depth`, aggregating as many times as needed.
fn leaves_at_depth(results: &[u128], depth: usize) -> Result<Vec<Fp>, TreeError> {
    let capacity = params::QUINARY
        .checked_pow(depth as u32)
        .ok_or(TreeError::InvalidDepth { arity: params::QUINARY, depth })?;
    let mut leaves: Vec<Fp> = results.iter().map(|r| fp_from_u128(*r)).collect();
    // Zero-pad to a whole number of groups so every aggregation matches the
    // full tree's interior nodes.
    while leaves.len() > capacity {
        let width = leaves.len().div_ceil(params::QUINARY) * params::QUINARY;
        leaves.resize(width, Fp::ZERO);
        leaves = aggregate_tally_leaves(&leaves);
    }
    Ok(leaves)
}

fn tally_tree(results: &[u128], depth: usize) -> Result<IncrementalTree, TreeError> {
    let leaves = leaves_at_depth(results, depth)?;
    let mut tree = IncrementalTree::new(params::QUINARY, depth, Fp::ZERO)?;
    for leaf in leaves {
        tree.insert(leaf)?;
    }
    Ok(tree)
}

/// `hash(root, salt)` of the tally tree at `depth`.
pub fn tally_result_commitment(results: &[u128], salt: Fp, depth: usize) -> Result<Fp, TreeError> {
    Ok(salted_commitment(tally_tree(results, depth)?.root(), salt))
}

pub fn gen_tally_result_proof(results: &[u128], index: usize, depth: usize) -> Result<TallyResultProof, TreeError> {
    let tree = tally_tree(results, depth)?;
    Ok(TallyResultProof { depth, index, leaf: tree.leaf(index)?, path: tree.gen_merkle_path(index)? })
}

impl TallyResultProof {
    pub fn verify(&self, salt: Fp, claimed: &Fp) -> bool {
        verify_tally_result(self.depth, self.index, self.leaf, &self.path, salt, claimed)
    }
}
