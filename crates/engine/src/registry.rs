//! State registry: the state tree, each participant's leaf, and their
//! vote-option trees.

use ff::Field;
use primitives::{Fp, PubKey};
use tree::{params, IncrementalTree, MerklePath, TreeError};

use domain::{StateLeaf, Transition};

use crate::EngineError;

/// One participant's vote-option tree, prefilled with zero weights.
#[derive(Clone, Debug)]
pub struct VoteOptions {
    tree: IncrementalTree,
    weights: Vec<u64>,
}

impl VoteOptions {
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        let mut tree = IncrementalTree::new(params::QUINARY, depth, Fp::ZERO)?;
        let capacity = tree.capacity() as usize;
        for _ in 0..capacity {
            tree.insert(Fp::ZERO)?;
        }
        Ok(Self { tree, weights: vec![0; capacity] })
    }

    pub fn root(&self) -> Fp {
        self.tree.root()
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    pub fn weight(&self, option: u64) -> Option<u64> {
        self.weights.get(option as usize).copied()
    }

    pub fn path(&self, option: u64) -> Result<MerklePath, TreeError> {
        self.tree.gen_merkle_path(option as usize)
    }

    fn set(&mut self, option: u64, weight: u64) -> Result<(), TreeError> {
        self.tree.update(option as usize, Fp::from(weight))?;
        self.weights[option as usize] = weight;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct StateRegistry {
    tree: IncrementalTree,
    leaves: Vec<StateLeaf>,
    votes: Vec<VoteOptions>,
    empty_votes: VoteOptions,
}

impl StateRegistry {
    /// Empty registry holding only the blank zeroth leaf.
    pub fn new(state_tree_depth: usize, vote_option_tree_depth: usize) -> Result<Self, TreeError> {
        let empty_votes = VoteOptions::new(vote_option_tree_depth)?;
        let blank = StateLeaf::blank(empty_votes.root());
        let mut tree = IncrementalTree::new(params::BINARY, state_tree_depth, blank.hash())?;
        tree.insert(blank.hash())?;
        Ok(Self { tree, leaves: vec![blank], votes: vec![empty_votes.clone()], empty_votes })
    }

    pub fn root(&self) -> Fp {
        self.tree.root()
    }

    /// Assigned leaves, the zeroth included.
    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.len() <= 1
    }

    pub fn capacity(&self) -> u64 {
        self.tree.capacity()
    }

    pub fn tree(&self) -> &IncrementalTree {
        &self.tree
    }

    pub fn empty_vote_option_root(&self) -> Fp {
        self.empty_votes.root()
    }

    pub fn blank_leaf(&self) -> StateLeaf {
        StateLeaf::blank(self.empty_votes.root())
    }

    pub fn leaf(&self, index: u64) -> Option<&StateLeaf> {
        self.leaves.get(index as usize)
    }

    /// The leaf at `index`, or the blank leaf for unassigned slots.
    pub fn leaf_or_blank(&self, index: u64) -> StateLeaf {
        self.leaf(index).copied().unwrap_or_else(|| self.blank_leaf())
    }

    pub fn vote_options(&self, index: u64) -> Option<&VoteOptions> {
        self.votes.get(index as usize)
    }

    pub fn path(&self, index: u64) -> Result<MerklePath, TreeError> {
        self.tree.gen_merkle_path(index as usize)
    }

    /// Register a participant and return their state index.
    pub fn sign_up(&mut self, pub_key: PubKey, voice_credit_balance: u64) -> Result<u64, EngineError> {
        if self.len() >= self.capacity() {
            return Err(EngineError::RegistryFull { capacity: self.capacity() });
        }
        let leaf = StateLeaf::new(pub_key, self.empty_votes.root(), voice_credit_balance);
        let index = self.tree.insert(leaf.hash())?;
        self.leaves.push(leaf);
        self.votes.push(self.empty_votes.clone());
        Ok(index as u64)
    }

    /// Overwrite the zeroth leaf.
    pub fn set_zeroth(&mut self, leaf: StateLeaf) -> Result<(), TreeError> {
        self.tree.update(0, leaf.hash())?;
        self.leaves[0] = leaf;
        Ok(())
    }

    /// Write an accepted transition: vote weight first, then the leaf.
    pub fn apply(&mut self, t: &Transition) -> Result<StateLeaf, TreeError> {
        let index = t.state_index as usize;
        let len = self.leaves.len() as u64;
        let votes = self
            .votes
            .get_mut(index)
            .ok_or(TreeError::IndexOutOfRange { index: t.state_index, len })?;
        votes.set(t.vote_option_index, t.new_vote_weight)?;
        let leaf = t.next_leaf(votes.root());
        self.tree.update(index, leaf.hash())?;
        self.leaves[index] = leaf;
        Ok(leaf)
    }
}
