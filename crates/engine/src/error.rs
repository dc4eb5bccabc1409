use circuits::WitnessError;
use primitives::{fp_to_hex, PrimitiveError};
use thiserror::Error;
use tree::TreeError;

use crate::Phase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{op} is not allowed in the {phase} phase")]
    PhaseViolation { op: &'static str, phase: Phase },
    #[error("batch starts at {got}, expected {expected}")]
    BatchOutOfOrder { expected: u64, got: u64 },
    #[error("batch size {got}, expected {expected}")]
    InvalidBatchSize { expected: u64, got: u64 },
    #[error("state root mismatch: engine {}, witness {}", fp_to_hex(.engine), fp_to_hex(.witness))]
    StateRootMismatch { engine: primitives::Fp, witness: primitives::Fp },
    #[error("results commitment mismatch: engine {}, witness {}", fp_to_hex(.engine), fp_to_hex(.witness))]
    CommitmentMismatch { engine: primitives::Fp, witness: primitives::Fp },
    #[error("state registry is full ({capacity} leaves)")]
    RegistryFull { capacity: u64 },
    #[error("no published messages left to process")]
    NoPendingMessages,
    #[error("tally for option {option} overflows")]
    TallyOverflow { option: usize },
    #[error("{0} has unprocessed data")]
    Incomplete(&'static str),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("witness rejected: {0}")]
    Witness(#[from] WitnessError),
    #[error(transparent)]
    Key(#[from] PrimitiveError),
    #[error("invalid config: {0}")]
    Config(String),
}
