//! The state-transition rule for a single message.
//!
//! Both the batch engine and witness replay go through these functions, so
//! the two can only disagree if their inputs do.

use primitives::{Fp, Keypair, PrivKey, PubKey, Signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Command, Message, StateLeaf};

/// Why a message had no effect. Skips are never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[error("message does not decrypt to a well-formed command")]
    Undecryptable,
    #[error("state index {0} is not a registered participant")]
    StateIndexOutOfRange(u64),
    #[error("signature does not match the current public key")]
    InvalidSignature,
    #[error("nonce {got}, expected {expected}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("vote option {0} out of range")]
    VoteOptionOutOfRange(u64),
    #[error("insufficient voice credits")]
    InsufficientCredits,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionParams {
    pub vote_options_max_index: u64,
}

/// Result of one batch step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageOutcome {
    Applied { state_index: u64 },
    Skipped(SkipReason),
    /// Step past the end of the message log.
    Padding,
}

impl MessageOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MessageOutcome::Applied { .. })
    }
}

/// Accepted effect of a command on its state leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state_index: u64,
    pub vote_option_index: u64,
    pub new_vote_weight: u64,
    pub new_balance: u64,
    pub new_nonce: u64,
    pub new_pub_key: PubKey,
}

impl Transition {
    /// The updated leaf, given the participant's vote-option root after the
    /// weight has been written.
    pub fn next_leaf(&self, new_vote_option_tree_root: Fp) -> StateLeaf {
        StateLeaf {
            pub_key: self.new_pub_key,
            vote_option_tree_root: new_vote_option_tree_root,
            voice_credit_balance: self.new_balance,
            nonce: self.new_nonce,
        }
    }
}

/// Open a message with the coordinator key and the sender's ephemeral key.
pub fn decrypt_message(
    message: &Message,
    coordinator: &PrivKey,
    ecdh_pub_key: &PubKey,
) -> Result<(Command, Signature), SkipReason> {
    if ecdh_pub_key.is_blank() {
        return Err(SkipReason::Undecryptable);
    }
    let shared = Keypair::gen_ecdh_shared_key(coordinator, ecdh_pub_key);
    message.decrypt(shared).map_err(|_| SkipReason::Undecryptable)
}

/// Participants live at `1..leaf_count`; index 0 is reserved.
pub fn check_state_index(state_index: u64, leaf_count: u64) -> Result<(), SkipReason> {
    if state_index == 0 || state_index >= leaf_count {
        return Err(SkipReason::StateIndexOutOfRange(state_index));
    }
    Ok(())
}

/// Validate `command` against the participant's current leaf and the weight
/// currently recorded for the targeted option.
///
/// Checks run in a fixed order: signature, nonce, option range, credits. The
/// new weight replaces the old one, refunding `prev_weight²`.
pub fn process_command(
    leaf: &StateLeaf,
    prev_weight: u64,
    command: &Command,
    signature: &Signature,
    params: &TransitionParams,
) -> Result<Transition, SkipReason> {
    if !command.verify_signature(signature, &leaf.pub_key) {
        return Err(SkipReason::InvalidSignature);
    }
    let expected = leaf.nonce.checked_add(1).ok_or(SkipReason::NonceMismatch {
        expected: u64::MAX,
        got: command.nonce,
    })?;
    if command.nonce != expected {
        return Err(SkipReason::NonceMismatch { expected, got: command.nonce });
    }
    if command.vote_option_index > params.vote_options_max_index {
        return Err(SkipReason::VoteOptionOutOfRange(command.vote_option_index));
    }
    let new_balance = remaining_credits(leaf.voice_credit_balance, prev_weight, command.new_vote_weight)
        .ok_or(SkipReason::InsufficientCredits)?;
    Ok(Transition {
        state_index: command.state_index,
        vote_option_index: command.vote_option_index,
        new_vote_weight: command.new_vote_weight,
        new_balance,
        new_nonce: command.nonce,
        new_pub_key: command.new_pub_key,
    })
}

/// `balance + prev² - new²`, or `None` when negative.
pub fn remaining_credits(balance: u64, prev_weight: u64, new_weight: u64) -> Option<u64> {
    let prev = u128::from(prev_weight) * u128::from(prev_weight);
    let new = u128::from(new_weight) * u128::from(new_weight);
    let available = u128::from(balance).checked_add(prev)?;
    u64::try_from(available.checked_sub(new)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_refund_previous_weight() {
        assert_eq!(remaining_credits(100, 0, 10), Some(0));
        assert_eq!(remaining_credits(100, 0, 11), None);
        assert_eq!(remaining_credits(0, 10, 6), Some(64));
        assert_eq!(remaining_credits(0, 0, 0), Some(0));
        assert_eq!(remaining_credits(u64::MAX, 0, u64::MAX), None);
    }

    #[test]
    fn zeroth_leaf_is_never_a_participant() {
        assert_eq!(check_state_index(0, 5), Err(SkipReason::StateIndexOutOfRange(0)));
        assert_eq!(check_state_index(5, 5), Err(SkipReason::StateIndexOutOfRange(5)));
        assert!(check_state_index(4, 5).is_ok());
    }
}
