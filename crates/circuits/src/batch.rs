//! Batch-update witness and its replay.
//!
//! Every step carries Merkle paths against the running state root, so replay
//! needs no trees: it walks the steps, re-runs the transition rule on the
//! witnessed leaves, and folds each write back into the root the same way the
//! batch-update circuit does.

use domain::{
    check_state_index, decrypt_message, plaintext, process_command, Message, MessageOutcome,
    SkipReason, StateLeaf, TransitionParams, MESSAGE_DATA_LEN,
};
use primitives::{Fp, Keypair, PubKey};
use tree::{compute_root, MerklePath};

use crate::{batch_public_signals, Transcript, WitnessError};

/// A state leaf as read against the running root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafWitness {
    pub index: u64,
    pub leaf: StateLeaf,
    pub path: MerklePath,
}

impl LeafWitness {
    fn opens_to(&self, root: &Fp) -> bool {
        opens(self.leaf.hash(), self.index, &self.path, root)
    }
}

/// The leaf a decrypted command names, with the weight currently recorded
/// for the targeted option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetLeaf {
    pub state: LeafWitness,
    /// Absent when the option index is outside the vote-option tree.
    pub vote_option_path: Option<MerklePath>,
    pub prev_vote_weight: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepMessage {
    pub message: Message,
    pub ecdh_pub_key: PubKey,
    pub path: MerklePath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchStep {
    pub message_index: u64,
    /// `None` for padding steps past the end of the log.
    pub message: Option<StepMessage>,
    pub plaintext: Option<[Fp; MESSAGE_DATA_LEN]>,
    pub target: Option<TargetLeaf>,
    /// Zeroth leaf, present whenever the step writes the random leaf.
    pub zeroth: Option<LeafWitness>,
    pub outcome: MessageOutcome,
    pub root_before: Fp,
    pub root_after: Fp,
}

impl BatchStep {
    /// Ephemeral key exposed in the public signals; blank for padding.
    pub fn ecdh_pub_key(&self) -> PubKey {
        self.message.as_ref().map(|m| m.ecdh_pub_key).unwrap_or_else(PubKey::blank)
    }
}

/// Final write of the random leaf into the zeroth slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealStep {
    pub zeroth: LeafWitness,
    pub root_before: Fp,
    pub root_after: Fp,
}

#[derive(Clone, Debug)]
pub struct BatchUpdateWitness {
    pub coordinator: Keypair,
    pub params: TransitionParams,
    pub message_root: Fp,
    pub message_count: u64,
    pub message_start_index: u64,
    pub state_root_before: Fp,
    pub state_leaf_count: u64,
    pub random_leaf: StateLeaf,
    pub steps: Vec<BatchStep>,
    pub seal: SealStep,
    pub new_state_root: Fp,
}

impl BatchUpdateWitness {
    pub fn ecdh_pub_keys(&self) -> Vec<PubKey> {
        self.steps.iter().map(BatchStep::ecdh_pub_key).collect()
    }

    pub fn public_signals(&self) -> Vec<Fp> {
        batch_public_signals(
            self.new_state_root,
            self.state_root_before,
            self.message_root,
            &self.coordinator.pub_key,
            self.params.vote_options_max_index,
            self.message_start_index,
            &self.ecdh_pub_keys(),
        )
    }

    /// Binding digest over the public signals and every intermediate root.
    pub fn digest(&self) -> [u8; 32] {
        let mut t = Transcript::new(b"qv/batch-witness");
        t.absorb_fields(&self.public_signals());
        for step in &self.steps {
            t.absorb_field(&step.root_after);
            t.absorb_field(&step.message.as_ref().map(|m| m.message.hash()).unwrap_or(Fp::from(0u64)));
        }
        t.absorb_field(&self.random_leaf.hash());
        t.challenge_bytes(b"digest")
    }
}

fn opens(leaf: Fp, index: u64, path: &MerklePath, root: &Fp) -> bool {
    path.index() == index && matches!(compute_root(leaf, path), Ok(r) if r == *root)
}

/// Recompute the new state root from the witness alone.
pub fn replay_batch(w: &BatchUpdateWitness) -> Result<Fp, WitnessError> {
    let random_hash = w.random_leaf.hash();
    let mut root = w.state_root_before;

    for (i, step) in w.steps.iter().enumerate() {
        if step.root_before != root {
            return Err(WitnessError::RootMismatch { step: i });
        }
        if step.message_index != w.message_start_index + i as u64 {
            return Err(WitnessError::Shape(format!("step {i} has message index {}", step.message_index)));
        }

        let applied = if step.message_index < w.message_count {
            let msg = step.message.as_ref().ok_or(WitnessError::Missing { step: i, what: "message" })?;
            if !opens(msg.message.hash(), step.message_index, &msg.path, &w.message_root) {
                return Err(WitnessError::MessagePath { step: i });
            }
            replay_message(w, i, step, msg, root)?
        } else {
            if step.message.is_some() {
                return Err(WitnessError::Shape(format!("step {i} is padding but carries a message")));
            }
            Replayed::Padding
        };

        let (outcome, next_root) = match applied {
            Replayed::Applied { state_index, root } => (MessageOutcome::Applied { state_index }, root),
            other => {
                let zeroth = step.zeroth.as_ref().ok_or(WitnessError::Missing { step: i, what: "zeroth leaf" })?;
                if zeroth.index != 0 || !zeroth.opens_to(&root) {
                    return Err(WitnessError::StatePath { step: i });
                }
                let outcome = match other {
                    Replayed::Skipped(reason) => MessageOutcome::Skipped(reason),
                    _ => MessageOutcome::Padding,
                };
                (outcome, compute_root(random_hash, &zeroth.path)?)
            }
        };

        if outcome != step.outcome {
            return Err(WitnessError::Outcome { step: i });
        }
        if next_root != step.root_after {
            return Err(WitnessError::RootMismatch { step: i });
        }
        root = next_root;
    }

    if w.seal.root_before != root {
        return Err(WitnessError::Seal);
    }
    if w.seal.zeroth.index != 0 || !w.seal.zeroth.opens_to(&root) {
        return Err(WitnessError::Seal);
    }
    root = compute_root(random_hash, &w.seal.zeroth.path)?;
    if root != w.seal.root_after {
        return Err(WitnessError::Seal);
    }
    Ok(root)
}

enum Replayed {
    Applied { state_index: u64, root: Fp },
    Skipped(SkipReason),
    Padding,
}

fn replay_message(
    w: &BatchUpdateWitness,
    i: usize,
    step: &BatchStep,
    msg: &StepMessage,
    root: Fp,
) -> Result<Replayed, WitnessError> {
    let (command, signature) = match decrypt_message(&msg.message, &w.coordinator.priv_key, &msg.ecdh_pub_key) {
        Ok(opened) => opened,
        Err(reason) => {
            if step.plaintext.is_some() {
                return Err(WitnessError::Plaintext { step: i });
            }
            return Ok(Replayed::Skipped(reason));
        }
    };
    if step.plaintext != Some(plaintext(&command, &signature)) {
        return Err(WitnessError::Plaintext { step: i });
    }
    if let Err(reason) = check_state_index(command.state_index, w.state_leaf_count) {
        return Ok(Replayed::Skipped(reason));
    }

    let target = step.target.as_ref().ok_or(WitnessError::Missing { step: i, what: "target leaf" })?;
    if target.state.index != command.state_index || !target.state.opens_to(&root) {
        return Err(WitnessError::StatePath { step: i });
    }
    let leaf = &target.state.leaf;
    let prev_weight = if command.vote_option_index <= w.params.vote_options_max_index {
        let path = target.vote_option_path.as_ref().ok_or(WitnessError::Missing { step: i, what: "vote-option path" })?;
        if !opens(Fp::from(target.prev_vote_weight), command.vote_option_index, path, &leaf.vote_option_tree_root) {
            return Err(WitnessError::VotePath { step: i });
        }
        target.prev_vote_weight
    } else {
        0
    };

    let transition = match process_command(leaf, prev_weight, &command, &signature, &w.params) {
        Ok(t) => t,
        Err(reason) => return Ok(Replayed::Skipped(reason)),
    };
    let vote_path = target.vote_option_path.as_ref().ok_or(WitnessError::Missing { step: i, what: "vote-option path" })?;
    let vote_root = compute_root(Fp::from(transition.new_vote_weight), vote_path)?;
    let next = transition.next_leaf(vote_root);
    Ok(Replayed::Applied {
        state_index: transition.state_index,
        root: compute_root(next.hash(), &target.state.path)?,
    })
}
