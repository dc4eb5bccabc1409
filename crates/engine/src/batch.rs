//! Batch state transitions.
//!
//! Messages `[start, start + size)` are applied in forward order to a copy
//! of the registry. Steps past the end of the log are padding. Every step
//! that does not apply a command writes the random leaf into the zeroth
//! slot, and a final seal step writes it once more, so real and padded
//! steps look alike from the outside.

use tracing::{debug, warn};

use circuits::{BatchStep, BatchUpdateWitness, LeafWitness, SealStep, StepMessage, TargetLeaf};
use domain::{
    check_state_index, decrypt_message, plaintext, process_command, MessageOutcome, StateLeaf, TransitionParams,
};
use primitives::{Fp, Keypair};

use crate::{EngineError, MessageLog, StateRegistry};

/// A processed batch, ready to be checked and committed.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub state_root_before: Fp,
    pub new_state_root: Fp,
    pub outcomes: Vec<MessageOutcome>,
    pub witness: BatchUpdateWitness,
}

impl BatchOutcome {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }
}

/// Run the batch against `registry` (mutated in place) and record the witness.
/// End of `[start, start + size)`, rejecting ranges past `u64::MAX`.
pub(crate) fn batch_end(start: u64, size: u64) -> Result<u64, EngineError> {
    start
        .checked_add(size)
        .ok_or(EngineError::BatchOutOfOrder { expected: u64::MAX - size, got: start })
}

pub(crate) fn build_batch(
    registry: &mut StateRegistry,
    log: &MessageLog,
    coordinator: &Keypair,
    params: TransitionParams,
    start: u64,
    size: u64,
    random_leaf: StateLeaf,
) -> Result<BatchOutcome, EngineError> {
    let end = batch_end(start, size)?;
    let state_root_before = registry.root();
    let state_leaf_count = registry.len();
    let mut steps = Vec::with_capacity(size as usize);

    for message_index in start..end {
        let root_before = registry.root();
        let mut step = BatchStep {
            message_index,
            message: None,
            plaintext: None,
            target: None,
            zeroth: None,
            outcome: MessageOutcome::Padding,
            root_before,
            root_after: root_before,
        };

        if let Some(entry) = log.entry(message_index) {
            step.message = Some(StepMessage {
                message: entry.message,
                ecdh_pub_key: entry.ecdh_pub_key,
                path: log.path(message_index)?,
            });
            step.outcome = apply_message(registry, coordinator, &params, &mut step, entry)?;
        }

        match step.outcome {
            MessageOutcome::Applied { state_index } => {
                debug!(message_index, state_index, "applied");
            }
            other => {
                if let MessageOutcome::Skipped(reason) = other {
                    warn!(message_index, %reason, "skipped");
                } else {
                    debug!(message_index, "padding");
                }
                step.zeroth = Some(zeroth_witness(registry)?);
                registry.set_zeroth(random_leaf)?;
            }
        }
        step.root_after = registry.root();
        steps.push(step);
    }

    let seal_before = registry.root();
    let zeroth = zeroth_witness(registry)?;
    registry.set_zeroth(random_leaf)?;
    let new_state_root = registry.root();
    let outcomes = steps.iter().map(|s| s.outcome).collect();

    let witness = BatchUpdateWitness {
        coordinator: coordinator.clone(),
        params,
        message_root: log.root(),
        message_count: log.len(),
        message_start_index: start,
        state_root_before,
        state_leaf_count,
        random_leaf,
        steps,
        seal: SealStep { zeroth, root_before: seal_before, root_after: new_state_root },
        new_state_root,
    };
    Ok(BatchOutcome { state_root_before, new_state_root, outcomes, witness })
}

fn zeroth_witness(registry: &StateRegistry) -> Result<LeafWitness, EngineError> {
    Ok(LeafWitness { index: 0, leaf: registry.leaf_or_blank(0), path: registry.path(0)? })
}

fn apply_message(
    registry: &mut StateRegistry,
    coordinator: &Keypair,
    params: &TransitionParams,
    step: &mut BatchStep,
    entry: &crate::LogEntry,
) -> Result<MessageOutcome, EngineError> {
    let (command, signature) = match decrypt_message(&entry.message, &coordinator.priv_key, &entry.ecdh_pub_key) {
        Ok(opened) => opened,
        Err(reason) => return Ok(MessageOutcome::Skipped(reason)),
    };
    step.plaintext = Some(plaintext(&command, &signature));
    if let Err(reason) = check_state_index(command.state_index, registry.len()) {
        return Ok(MessageOutcome::Skipped(reason));
    }

    let index = command.state_index;
    let leaf = registry.leaf_or_blank(index);
    let (vote_option_path, prev_weight) = match registry.vote_options(index) {
        Some(votes) if command.vote_option_index <= params.vote_options_max_index => {
            let weight = votes.weight(command.vote_option_index).unwrap_or(0);
            (Some(votes.path(command.vote_option_index)?), weight)
        }
        _ => (None, 0),
    };
    step.target = Some(TargetLeaf {
        state: LeafWitness { index, leaf, path: registry.path(index)? },
        vote_option_path,
        prev_vote_weight: prev_weight,
    });

    match process_command(&leaf, prev_weight, &command, &signature, params) {
        Ok(transition) => {
            registry.apply(&transition)?;
            Ok(MessageOutcome::Applied { state_index: index })
        }
        Err(reason) => Ok(MessageOutcome::Skipped(reason)),
    }
}
