use circuits::{
    replay_batch, replay_tally, tally_tree_root, BatchStep, BatchUpdateWitness, LeafWitness, ReplayOracle,
    SealStep, TallyCircuitInputs, WitnessError, WitnessOracle,
};
use domain::{MessageOutcome, SkipReason, StateLeaf, TransitionParams};
use ff::Field;
use primitives::{salted_commitment, Fp, Keypair};
use rand::{rngs::StdRng, SeedableRng};
use tree::{params, IncrementalTree};

const VOTE_DEPTH: usize = 1;

fn state_tree(leaves: &[StateLeaf]) -> IncrementalTree {
    let empty_votes = tally_tree_root(&[], VOTE_DEPTH).unwrap();
    let mut t = IncrementalTree::new(params::BINARY, 3, StateLeaf::blank(empty_votes).hash()).unwrap();
    for leaf in leaves {
        t.insert(leaf.hash()).unwrap();
    }
    t
}

fn padding_witness(rng: &mut StdRng) -> BatchUpdateWitness {
    let empty_votes = tally_tree_root(&[], VOTE_DEPTH).unwrap();
    let user = Keypair::random(rng);
    let mut leaves = vec![StateLeaf::blank(empty_votes), StateLeaf::new(user.pub_key, empty_votes, 100)];
    let mut tree = state_tree(&leaves);
    let random_leaf = StateLeaf::random(rng);
    let state_root_before = tree.root();

    let mut steps = Vec::new();
    for i in 0..2u64 {
        let zeroth = LeafWitness { index: 0, leaf: leaves[0], path: tree.gen_merkle_path(0).unwrap() };
        let root_before = tree.root();
        tree.update(0, random_leaf.hash()).unwrap();
        leaves[0] = random_leaf;
        steps.push(BatchStep {
            message_index: i,
            message: None,
            plaintext: None,
            target: None,
            zeroth: Some(zeroth),
            outcome: MessageOutcome::Padding,
            root_before,
            root_after: tree.root(),
        });
    }
    let seal = SealStep {
        zeroth: LeafWitness { index: 0, leaf: random_leaf, path: tree.gen_merkle_path(0).unwrap() },
        root_before: tree.root(),
        root_after: tree.root(),
    };

    BatchUpdateWitness {
        coordinator: Keypair::random(rng),
        params: TransitionParams { vote_options_max_index: 4 },
        message_root: Fp::ZERO,
        message_count: 0,
        message_start_index: 0,
        state_root_before,
        state_leaf_count: 2,
        random_leaf,
        steps,
        seal,
        new_state_root: tree.root(),
    }
}

#[test]
fn padding_batch_replays_to_sealed_root() {
    let mut rng = StdRng::seed_from_u64(40);
    let w = padding_witness(&mut rng);
    let root = replay_batch(&w).unwrap();
    assert_eq!(root, w.new_state_root);
    assert_ne!(root, w.state_root_before);
    assert_eq!(ReplayOracle.batch_root(&w).unwrap(), root);

    let signals = w.public_signals();
    assert_eq!(signals.len(), 7 + 4);
    assert_eq!(signals[0], root);
}

#[test]
fn tampered_batch_witness_is_rejected() {
    let mut rng = StdRng::seed_from_u64(41);
    let w = padding_witness(&mut rng);

    let mut bad = w.clone();
    bad.steps[1].outcome = MessageOutcome::Skipped(SkipReason::Undecryptable);
    assert_eq!(replay_batch(&bad), Err(WitnessError::Outcome { step: 1 }));

    let mut bad = w.clone();
    bad.random_leaf = StateLeaf::random(&mut rng);
    assert_eq!(replay_batch(&bad), Err(WitnessError::RootMismatch { step: 0 }));

    let mut bad = w.clone();
    bad.state_root_before += Fp::ONE;
    assert_eq!(replay_batch(&bad), Err(WitnessError::RootMismatch { step: 0 }));

    let mut bad = w;
    bad.steps[0].zeroth = None;
    assert!(matches!(replay_batch(&bad), Err(WitnessError::Missing { step: 0, .. })));
}

fn tally_inputs(rng: &mut StdRng) -> TallyCircuitInputs {
    let votes = vec![vec![0u64; 5], vec![3, 0, 1, 0, 0]];
    let user = Keypair::random(rng);
    let zeroth = StateLeaf::random(rng);
    let weights: Vec<u128> = votes[1].iter().map(|w| u128::from(*w)).collect();
    let voter = StateLeaf::new(user.pub_key, tally_tree_root(&weights, VOTE_DEPTH).unwrap(), 90);
    let tree = state_tree(&[zeroth, voter]);

    let current_results = vec![0u128; 5];
    let current_commitment = salted_commitment(tally_tree_root(&current_results, VOTE_DEPTH).unwrap(), Fp::ZERO);
    let new_results = vec![3u128, 0, 1, 0, 0];
    let new_salt = Fp::random(&mut *rng);

    TallyCircuitInputs {
        vote_option_tree_depth: VOTE_DEPTH,
        state_root: tree.root(),
        intermediate_state_root: tree.node(1, 0).unwrap(),
        intermediate_path_index: 0,
        intermediate_path: tree.gen_merkle_subpath(1, 0).unwrap(),
        batch_start_index: 0,
        state_leaves: vec![zeroth, voter],
        vote_leaves: votes,
        current_results,
        current_salt: Fp::ZERO,
        current_results_commitment: current_commitment,
        new_results: new_results.clone(),
        new_salt,
        new_results_commitment: salted_commitment(tally_tree_root(&new_results, VOTE_DEPTH).unwrap(), new_salt),
    }
}

#[test]
fn tally_replay_skips_zeroth_leaf() {
    let mut rng = StdRng::seed_from_u64(42);
    let inputs = tally_inputs(&mut rng);
    assert_eq!(replay_tally(&inputs).unwrap(), inputs.new_results_commitment);
    assert_eq!(inputs.public_signals()[0], inputs.new_results_commitment);
}

#[test]
fn tampered_tally_inputs_are_rejected() {
    let mut rng = StdRng::seed_from_u64(43);
    let inputs = tally_inputs(&mut rng);

    let mut bad = inputs.clone();
    bad.vote_leaves[1][0] = 4;
    assert_eq!(replay_tally(&bad), Err(WitnessError::VoteRoot { index: 1 }));

    let mut bad = inputs.clone();
    bad.new_results[2] = 0;
    assert_eq!(replay_tally(&bad), Err(WitnessError::Results));

    let mut bad = inputs.clone();
    bad.current_salt = Fp::ONE;
    assert_eq!(replay_tally(&bad), Err(WitnessError::CurrentCommitment));

    let mut bad = inputs.clone();
    bad.intermediate_state_root += Fp::ONE;
    assert_eq!(replay_tally(&bad), Err(WitnessError::IntermediateRoot));

    let mut bad = inputs;
    bad.state_root += Fp::ONE;
    assert_eq!(replay_tally(&bad), Err(WitnessError::IntermediatePath));
}
