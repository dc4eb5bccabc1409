//! Incremental k-ary Merkle tree over Poseidon.
//!
//! Append-only, fixed depth, index-stable. Used for the state tree (binary),
//! the message tree (binary), per-participant vote-option trees (quinary) and
//! the tally tree (quinary).

use primitives::{hash_nodes, is_supported_arity, serde_fp_nested, Fp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tree parameters commonly used by the engine.
pub mod params {
    /// State and message trees are binary.
    pub const BINARY: usize = 2;
    /// Vote-option and tally trees are quinary.
    pub const QUINARY: usize = 5;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },
    #[error("index {index} out of range ({len} assigned)")]
    IndexOutOfRange { index: u64, len: u64 },
    #[error("arity {0} unsupported (expected 2..=5)")]
    UnsupportedArity(usize),
    #[error("depth {depth} invalid for arity {arity}")]
    InvalidDepth { arity: usize, depth: usize },
    #[error("level {level} above depth {depth}")]
    LevelOutOfRange { level: usize, depth: usize },
    #[error("malformed merkle path: {0}")]
    MalformedPath(String),
}

/// Sibling values per level (k-1 each, leaf to root) and the position of the
/// path node among its siblings at each level.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct MerklePath {
    #[serde(with = "serde_fp_nested")]
    pub path_elements: Vec<Vec<Fp>>,
    pub path_indices: Vec<usize>,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.path_indices.len()
    }

    /// Node index encoded by the positions (most significant level last).
    pub fn index(&self) -> u64 {
        self.path_elements
            .iter()
            .zip(self.path_indices.iter())
            .rev()
            .fold(0u64, |acc, (siblings, &pos)| acc * (siblings.len() as u64 + 1) + pos as u64)
    }
}

/// Recompute the root reached from `leaf` along `path`.
pub fn compute_root(leaf: Fp, path: &MerklePath) -> Result<Fp, TreeError> {
    if path.path_elements.len() != path.path_indices.len() {
        return Err(TreeError::MalformedPath("elements and indices differ in length".into()));
    }
    let mut current = leaf;
    for (siblings, &pos) in path.path_elements.iter().zip(path.path_indices.iter()) {
        let arity = siblings.len() + 1;
        if pos >= arity {
            return Err(TreeError::MalformedPath(format!("position {pos} for arity {arity}")));
        }
        let mut children = Vec::with_capacity(arity);
        children.extend_from_slice(&siblings[..pos]);
        children.push(current);
        children.extend_from_slice(&siblings[pos..]);
        current = hash_nodes(&children).ok_or(TreeError::UnsupportedArity(arity))?;
    }
    Ok(current)
}

/// Whether `path` leads from `leaf` to `root`. Malformed paths never verify.
pub fn verify_merkle_path(leaf: Fp, path: &MerklePath, root: &Fp) -> bool {
    matches!(compute_root(leaf, path), Ok(r) if r == *root)
}

#[derive(Clone, Debug)]
pub struct IncrementalTree {
    arity: usize,
    depth: usize,
    capacity: u64,
    /// zeros[l] is the root of an empty subtree of height l.
    zeros: Vec<Fp>,
    /// levels[l] holds every node at height l that covers an assigned leaf.
    levels: Vec<Vec<Fp>>,
}

impl IncrementalTree {
    pub fn new(arity: usize, depth: usize, zero_value: Fp) -> Result<Self, TreeError> {
        if !is_supported_arity(arity) {
            return Err(TreeError::UnsupportedArity(arity));
        }
        let capacity = u32::try_from(depth)
            .ok()
            .and_then(|d| (arity as u64).checked_pow(d))
            .filter(|c| usize::try_from(*c).is_ok())
            .ok_or(TreeError::InvalidDepth { arity, depth })?;
        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(zero_value);
        for level in 0..depth {
            let children = vec![zeros[level]; arity];
            zeros.push(hash_nodes(&children).ok_or(TreeError::UnsupportedArity(arity))?);
        }
        Ok(Self { arity, depth, capacity, zeros, levels: vec![Vec::new(); depth + 1] })
    }

    pub fn arity(&self) -> usize { self.arity }

    pub fn depth(&self) -> usize { self.depth }

    pub fn capacity(&self) -> u64 { self.capacity }

    pub fn len(&self) -> usize { self.levels[0].len() }

    pub fn is_empty(&self) -> bool { self.levels[0].is_empty() }

    pub fn leaves(&self) -> &[Fp] { &self.levels[0] }

    pub fn zero_value(&self, level: usize) -> Option<Fp> { self.zeros.get(level).copied() }

    pub fn root(&self) -> Fp {
        self.node_or_zero(self.depth, 0)
    }

    pub fn leaf(&self, index: usize) -> Result<Fp, TreeError> {
        self.levels[0].get(index).copied().ok_or(TreeError::IndexOutOfRange {
            index: index as u64,
            len: self.len() as u64,
        })
    }

    /// Node at `level` (0 = leaves); the empty-subtree constant when unfilled.
    pub fn node(&self, level: usize, index: usize) -> Result<Fp, TreeError> {
        self.check_level(level)?;
        Ok(self.node_or_zero(level, index))
    }

    /// Append a leaf at the next free index and return that index.
    pub fn insert(&mut self, leaf: Fp) -> Result<usize, TreeError> {
        let index = self.len();
        if index as u64 >= self.capacity {
            return Err(TreeError::CapacityExceeded { capacity: self.capacity });
        }
        self.levels[0].push(leaf);
        self.recompute_from(index)?;
        Ok(index)
    }

    /// Overwrite an assigned leaf.
    pub fn update(&mut self, index: usize, leaf: Fp) -> Result<(), TreeError> {
        if index >= self.len() {
            return Err(TreeError::IndexOutOfRange { index: index as u64, len: self.len() as u64 });
        }
        self.levels[0][index] = leaf;
        self.recompute_from(index)
    }

    /// Inclusion path for an assigned leaf.
    pub fn gen_merkle_path(&self, index: usize) -> Result<MerklePath, TreeError> {
        if index >= self.len() {
            return Err(TreeError::IndexOutOfRange { index: index as u64, len: self.len() as u64 });
        }
        self.gen_merkle_subpath(0, index)
    }

    /// Path from the node at (`level`, `index`) up to the root.
    pub fn gen_merkle_subpath(&self, level: usize, index: usize) -> Result<MerklePath, TreeError> {
        self.check_level(level)?;
        let width = self.capacity / (self.arity as u64).pow(level as u32);
        if index as u64 >= width {
            return Err(TreeError::IndexOutOfRange { index: index as u64, len: width });
        }
        let mut path = MerklePath::default();
        let mut idx = index;
        for l in level..self.depth {
            let pos = idx % self.arity;
            let start = idx - pos;
            let siblings = (start..start + self.arity)
                .filter(|&i| i != idx)
                .map(|i| self.node_or_zero(l, i))
                .collect();
            path.path_elements.push(siblings);
            path.path_indices.push(pos);
            idx /= self.arity;
        }
        Ok(path)
    }

    fn check_level(&self, level: usize) -> Result<(), TreeError> {
        if level > self.depth {
            return Err(TreeError::LevelOutOfRange { level, depth: self.depth });
        }
        Ok(())
    }

    fn node_or_zero(&self, level: usize, index: usize) -> Fp {
        self.levels[level].get(index).copied().unwrap_or(self.zeros[level])
    }

    fn recompute_from(&mut self, leaf_index: usize) -> Result<(), TreeError> {
        let mut idx = leaf_index;
        for level in 0..self.depth {
            let parent = idx / self.arity;
            let start = parent * self.arity;
            let children: Vec<Fp> = (start..start + self.arity).map(|i| self.node_or_zero(level, i)).collect();
            let value = hash_nodes(&children).ok_or(TreeError::UnsupportedArity(self.arity))?;
            let row = &mut self.levels[level + 1];
            if parent == row.len() {
                row.push(value);
            } else {
                row[parent] = value;
            }
            idx = parent;
        }
        Ok(())
    }
}
