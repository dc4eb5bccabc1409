//! Circuit-facing side of the engine: witness and input structures for the
//! batch-update and tally statements, their public-signal layouts, a replay
//! oracle that recomputes each statement's output from the witness alone,
//! and the proof-backend seam.

pub mod backend;
pub mod batch;
pub mod oracle;
pub mod signals;
pub mod tally;
pub mod transcript;

use thiserror::Error;
use tree::TreeError;

pub use backend::{DigestBackend, Proof, ProofBackend, ProofKind, VerifyingKey};
pub use batch::{replay_batch, BatchStep, BatchUpdateWitness, LeafWitness, SealStep, StepMessage, TargetLeaf};
pub use oracle::{ReplayOracle, WitnessOracle};
pub use signals::{batch_public_signals, tally_public_signals, BATCH_SIGNAL_PREFIX_LEN, TALLY_SIGNAL_LEN};
pub use tally::{replay_tally, tally_tree_root, TallyCircuitInputs};
pub use transcript::Transcript;

/// A witness that does not reproduce the statement it claims.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WitnessError {
    #[error("step {step}: state root does not match the running root")]
    RootMismatch { step: usize },
    #[error("step {step}: message is not in the message tree at its index")]
    MessagePath { step: usize },
    #[error("step {step}: state leaf is not in the state tree at its index")]
    StatePath { step: usize },
    #[error("step {step}: vote weight is not in the vote-option tree")]
    VotePath { step: usize },
    #[error("step {step}: missing {what}")]
    Missing { step: usize, what: &'static str },
    #[error("step {step}: decrypted plaintext differs")]
    Plaintext { step: usize },
    #[error("step {step}: recorded outcome differs from replay")]
    Outcome { step: usize },
    #[error("seal step does not target the zeroth leaf")]
    Seal,
    #[error("vote-option leaves of state leaf {index} do not match its root")]
    VoteRoot { index: u64 },
    #[error("intermediate root does not match the batch of state leaves")]
    IntermediateRoot,
    #[error("intermediate path does not lead to the state root")]
    IntermediatePath,
    #[error("results commitment does not open to the current results")]
    CurrentCommitment,
    #[error("new results differ from the recomputed tally")]
    Results,
    #[error("tally overflow")]
    Overflow,
    #[error("malformed witness: {0}")]
    Shape(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}
