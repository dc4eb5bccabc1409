use ff::Field;
use primitives::Fp;
use rand::{rngs::StdRng, SeedableRng};
use tree::{compute_root, params, verify_merkle_path, IncrementalTree, MerklePath, TreeError};

fn filled(arity: usize, depth: usize, n: usize, seed: u64) -> IncrementalTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut t = IncrementalTree::new(arity, depth, Fp::ZERO).unwrap();
    for _ in 0..n {
        t.insert(Fp::random(&mut rng)).unwrap();
    }
    t
}

#[test]
fn every_inserted_leaf_has_a_valid_path() {
    for (arity, depth, n) in [(2, 4, 11), (3, 3, 20), (5, 2, 25)] {
        let t = filled(arity, depth, n, 5);
        let root = t.root();
        for i in 0..n {
            let path = t.gen_merkle_path(i).unwrap();
            assert_eq!(path.depth(), depth);
            assert!(verify_merkle_path(t.leaf(i).unwrap(), &path, &root), "arity {arity} leaf {i}");
        }
    }
}

#[test]
fn corrupted_paths_fail() {
    let t = filled(params::QUINARY, 3, 17, 6);
    let root = t.root();
    let leaf = t.leaf(8).unwrap();
    let path = t.gen_merkle_path(8).unwrap();

    for level in 0..path.depth() {
        for j in 0..path.path_elements[level].len() {
            let mut bad = path.clone();
            bad.path_elements[level][j] += Fp::ONE;
            assert!(!verify_merkle_path(leaf, &bad, &root));
        }
    }

    let mut moved = path.clone();
    moved.path_indices[0] = (moved.path_indices[0] + 1) % 5;
    assert!(!verify_merkle_path(leaf, &moved, &root));
    assert!(!verify_merkle_path(leaf + Fp::ONE, &path, &root));
}

#[test]
fn malformed_paths_are_errors_not_panics() {
    let leaf = Fp::ONE;
    let uneven = MerklePath { path_elements: vec![vec![Fp::ZERO]], path_indices: vec![] };
    assert!(matches!(compute_root(leaf, &uneven), Err(TreeError::MalformedPath(_))));
    let bad_pos = MerklePath { path_elements: vec![vec![Fp::ZERO]], path_indices: vec![2] };
    assert!(matches!(compute_root(leaf, &bad_pos), Err(TreeError::MalformedPath(_))));
    let too_wide = MerklePath { path_elements: vec![vec![Fp::ZERO; 6]], path_indices: vec![0] };
    assert_eq!(compute_root(leaf, &too_wide), Err(TreeError::UnsupportedArity(7)));
}

#[test]
fn unassigned_indices_are_rejected() {
    let mut t = filled(params::BINARY, 3, 3, 7);
    assert_eq!(t.gen_merkle_path(3), Err(TreeError::IndexOutOfRange { index: 3, len: 3 }));
    assert_eq!(t.update(5, Fp::ONE), Err(TreeError::IndexOutOfRange { index: 5, len: 3 }));
    assert!(t.gen_merkle_subpath(4, 0).is_err());
}

#[test]
fn update_moves_root_and_invalidates_old_paths() {
    let mut t = filled(params::BINARY, 4, 9, 8);
    let before = t.root();
    let old_path = t.gen_merkle_path(2).unwrap();
    let old_leaf = t.leaf(2).unwrap();

    t.update(2, Fp::from(1234u64)).unwrap();
    assert_ne!(t.root(), before);
    assert!(!verify_merkle_path(old_leaf, &old_path, &t.root()));
    assert!(verify_merkle_path(Fp::from(1234u64), &t.gen_merkle_path(2).unwrap(), &t.root()));

    t.update(2, old_leaf).unwrap();
    assert_eq!(t.root(), before);
}

#[test]
fn insertion_order_matters() {
    let mut a = IncrementalTree::new(params::BINARY, 3, Fp::ZERO).unwrap();
    let mut b = a.clone();
    a.insert(Fp::from(1u64)).unwrap();
    a.insert(Fp::from(2u64)).unwrap();
    b.insert(Fp::from(2u64)).unwrap();
    b.insert(Fp::from(1u64)).unwrap();
    assert_ne!(a.root(), b.root());
}

#[test]
fn subtree_roots_chain_to_the_root() {
    let t = filled(params::BINARY, 5, 13, 9);
    // Subtree of 4 leaves covering indices 8..12.
    let sub = t.node(2, 2).unwrap();
    let path = t.gen_merkle_subpath(2, 2).unwrap();
    assert_eq!(path.depth(), 3);
    assert!(verify_merkle_path(sub, &path, &t.root()));

    // A fully empty subtree is the zero constant for its height.
    assert_eq!(t.node(2, 7).unwrap(), t.zero_value(2).unwrap());
    assert!(verify_merkle_path(t.zero_value(2).unwrap(), &t.gen_merkle_subpath(2, 7).unwrap(), &t.root()));
}

#[test]
fn path_serializes_to_hex_json() {
    let t = filled(params::QUINARY, 2, 6, 10);
    let path = t.gen_merkle_path(5).unwrap();
    let json = serde_json::to_string(&path).unwrap();
    let back: MerklePath = serde_json::from_str(&json).unwrap();
    assert_eq!(back, path);
}
