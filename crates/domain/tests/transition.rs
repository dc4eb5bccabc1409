use domain::{
    check_state_index, decrypt_message, process_command, Command, Message, SkipReason, StateLeaf,
    TransitionParams,
};
use ff::Field;
use primitives::{gen_random_salt, Fp, Keypair, PubKey};
use rand::{rngs::StdRng, SeedableRng};

const PARAMS: TransitionParams = TransitionParams { vote_options_max_index: 24 };

fn command(state_index: u64, key: PubKey, option: u64, weight: u64, nonce: u64, rng: &mut StdRng) -> Command {
    Command {
        state_index,
        new_pub_key: key,
        vote_option_index: option,
        new_vote_weight: weight,
        nonce,
        salt: gen_random_salt(rng),
    }
}

#[test]
fn decrypt_inverts_encrypt() {
    let mut rng = StdRng::seed_from_u64(1);
    let user = Keypair::random(&mut rng);
    let coordinator = Keypair::random(&mut rng);
    let ephemeral = Keypair::random(&mut rng);

    let cmd = command(3, user.pub_key, 4, 9, 1, &mut rng);
    let sig = cmd.sign(&user, &mut rng);
    let shared = Keypair::gen_ecdh_shared_key(&ephemeral.priv_key, &coordinator.pub_key);
    let msg = cmd.encrypt(&sig, shared);

    let (back, back_sig) = decrypt_message(&msg, &coordinator.priv_key, &ephemeral.pub_key).unwrap();
    assert_eq!(back, cmd);
    assert_eq!(back_sig, sig);
    assert!(back.verify_signature(&back_sig, &user.pub_key));
}

#[test]
fn wrong_key_never_yields_a_valid_command() {
    let mut rng = StdRng::seed_from_u64(2);
    let user = Keypair::random(&mut rng);
    let coordinator = Keypair::random(&mut rng);
    let stranger = Keypair::random(&mut rng);
    let ephemeral = Keypair::random(&mut rng);

    let cmd = command(1, user.pub_key, 0, 1, 1, &mut rng);
    let sig = cmd.sign(&user, &mut rng);
    let msg = cmd.encrypt(&sig, Keypair::gen_ecdh_shared_key(&ephemeral.priv_key, &coordinator.pub_key));

    match decrypt_message(&msg, &stranger.priv_key, &ephemeral.pub_key) {
        Err(SkipReason::Undecryptable) => {}
        Ok((c, s)) => assert!(!c.verify_signature(&s, &user.pub_key)),
        Err(other) => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        decrypt_message(&Message::padding(), &coordinator.priv_key, &PubKey::blank()),
        Err(SkipReason::Undecryptable)
    );
}

#[test]
fn valid_command_updates_every_field() {
    let mut rng = StdRng::seed_from_u64(3);
    let user = Keypair::random(&mut rng);
    let rotated = Keypair::random(&mut rng);
    let leaf = StateLeaf::new(user.pub_key, Fp::ZERO, 100);

    let cmd = command(1, rotated.pub_key, 2, 7, 1, &mut rng);
    let sig = cmd.sign(&user, &mut rng);
    let t = process_command(&leaf, 0, &cmd, &sig, &PARAMS).unwrap();
    assert_eq!(t.new_balance, 51);
    assert_eq!(t.new_nonce, 1);
    assert_eq!(t.new_pub_key, rotated.pub_key);

    let root = Fp::from(5u64);
    let next = t.next_leaf(root);
    assert_eq!(next.vote_option_tree_root, root);
    assert_ne!(next.hash(), leaf.hash());

    // The rotated key now controls the leaf; the old one does not.
    let follow = command(1, rotated.pub_key, 2, 3, 2, &mut rng);
    let stale = follow.sign(&user, &mut rng);
    assert_eq!(process_command(&next, 7, &follow, &stale, &PARAMS), Err(SkipReason::InvalidSignature));
    let fresh = follow.sign(&rotated, &mut rng);
    let t2 = process_command(&next, 7, &follow, &fresh, &PARAMS).unwrap();
    assert_eq!(t2.new_balance, 51 + 49 - 9);
}

#[test]
fn each_check_skips_with_its_reason() {
    let mut rng = StdRng::seed_from_u64(4);
    let user = Keypair::random(&mut rng);
    let leaf = StateLeaf::new(user.pub_key, Fp::ZERO, 25);

    let replay = command(1, user.pub_key, 0, 1, 2, &mut rng);
    let sig = replay.sign(&user, &mut rng);
    assert_eq!(
        process_command(&leaf, 0, &replay, &sig, &PARAMS),
        Err(SkipReason::NonceMismatch { expected: 1, got: 2 })
    );

    let wide = command(1, user.pub_key, 25, 1, 1, &mut rng);
    let sig = wide.sign(&user, &mut rng);
    assert_eq!(process_command(&leaf, 0, &wide, &sig, &PARAMS), Err(SkipReason::VoteOptionOutOfRange(25)));

    let greedy = command(1, user.pub_key, 0, 6, 1, &mut rng);
    let sig = greedy.sign(&user, &mut rng);
    assert_eq!(process_command(&leaf, 0, &greedy, &sig, &PARAMS), Err(SkipReason::InsufficientCredits));

    let blank = StateLeaf::blank(Fp::ZERO);
    let sig = greedy.sign(&user, &mut rng);
    assert_eq!(process_command(&blank, 0, &greedy, &sig, &PARAMS), Err(SkipReason::InvalidSignature));

    assert_eq!(check_state_index(0, 2), Err(SkipReason::StateIndexOutOfRange(0)));
}

#[test]
fn message_hash_binds_ciphertext() {
    let mut rng = StdRng::seed_from_u64(5);
    let user = Keypair::random(&mut rng);
    let cmd = command(1, user.pub_key, 0, 1, 1, &mut rng);
    let sig = cmd.sign(&user, &mut rng);
    let msg = cmd.encrypt(&sig, Fp::random(&mut rng));
    let mut tampered = msg;
    tampered.data[3] += Fp::ONE;
    assert_ne!(msg.hash(), tampered.hash());

    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}
