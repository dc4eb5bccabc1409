//! Anti-collusion quadratic voting engine: participant registry, encrypted
//! message log, batched state transitions checked against a witness replay,
//! salted tally commitments, and result verification.

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod message_log;
pub mod phase;
pub mod registry;
pub mod tally;
pub mod verifier;

pub use batch::BatchOutcome;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use ledger::{InMemoryLedger, Ledger};
pub use message_log::{message_tree_zero, LogEntry, MessageLog};
pub use phase::{Phase, Timeline};
pub use registry::{StateRegistry, VoteOptions};
pub use tally::{PublishedTally, Tally};
pub use verifier::{
    aggregate_tally_leaves, gen_tally_result_proof, tally_result_commitment, verify_tally_result, TallyResultProof,
};
