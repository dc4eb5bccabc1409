//! The coordinator-side engine.

use ff::Field;
use tracing::{error, info};

use circuits::{BatchUpdateWitness, ReplayOracle, TallyCircuitInputs, WitnessOracle};
use domain::{Message, StateLeaf, TransitionParams};
use primitives::{fp_to_hex, Fp, Keypair, PubKey};

use crate::batch::{build_batch, BatchOutcome};
use crate::tally::{accumulate, circuit_inputs, PublishedTally, Tally};
use crate::{EngineConfig, EngineError, MessageLog, Phase, StateRegistry};

pub struct Engine {
    config: EngineConfig,
    coordinator: Keypair,
    oracle: Box<dyn WitnessOracle + Send + Sync>,
    phase: Phase,
    registry: StateRegistry,
    log: MessageLog,
    processed_messages: u64,
    tallied_leaves: u64,
    tally: Tally,
    results_salt: Fp,
    results_commitment: Fp,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_oracle(config, ReplayOracle)
    }

    pub fn with_oracle<O: WitnessOracle + Send + Sync + 'static>(
        config: EngineConfig,
        oracle: O,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let coordinator = config.coordinator_keypair()?;
        let tally = Tally::zero(config.vote_option_capacity() as usize);
        let results_salt = Fp::ZERO;
        let results_commitment = tally.commitment(results_salt, config.vote_option_tree_depth)?;
        Ok(Self {
            registry: StateRegistry::new(config.state_tree_depth, config.vote_option_tree_depth)?,
            log: MessageLog::new(config.message_tree_depth)?,
            config,
            coordinator,
            oracle: Box::new(oracle),
            phase: Phase::SignUp,
            processed_messages: 0,
            tallied_leaves: 0,
            tally,
            results_salt,
            results_commitment,
        })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn coordinator_pub_key(&self) -> PubKey { self.coordinator.pub_key }

    pub fn state_root(&self) -> Fp { self.registry.root() }

    pub fn message_root(&self) -> Fp { self.log.root() }

    pub fn registry(&self) -> &StateRegistry { &self.registry }

    pub fn message_log(&self) -> &MessageLog { &self.log }

    pub fn processed_messages(&self) -> u64 { self.processed_messages }

    pub fn tallied_leaves(&self) -> u64 { self.tallied_leaves }

    pub fn tally(&self) -> &Tally { &self.tally }

    pub fn results_commitment(&self) -> Fp { self.results_commitment }

    pub fn results_salt(&self) -> Fp { self.results_salt }

    fn params(&self) -> TransitionParams {
        TransitionParams { vote_options_max_index: self.config.vote_options_max_index }
    }

    fn check_message_batch_size(&self, size: u64) -> Result<(), EngineError> {
        if size != self.config.message_batch_size {
            return Err(EngineError::InvalidBatchSize { expected: self.config.message_batch_size, got: size });
        }
        Ok(())
    }

    fn require(&self, op: &'static str, phase: Phase) -> Result<(), EngineError> {
        if self.phase != phase {
            return Err(EngineError::PhaseViolation { op, phase: self.phase });
        }
        Ok(())
    }

    /// Move to the next phase. Processing and tallying close only once
    /// every message, respectively every state leaf, has been consumed.
    pub fn advance_phase(&mut self) -> Result<Phase, EngineError> {
        let next = self
            .phase
            .next()
            .ok_or(EngineError::PhaseViolation { op: "advance_phase", phase: self.phase })?;
        match self.phase {
            Phase::Processing if self.processed_messages < self.log.len() => {
                return Err(EngineError::Incomplete("message processing"));
            }
            Phase::Tallying if self.tallied_leaves < self.registry.len() => {
                return Err(EngineError::Incomplete("tallying"));
            }
            _ => {}
        }
        info!(from = %self.phase, to = %next, "phase advanced");
        self.phase = next;
        Ok(next)
    }

    /// Apply the time-gated transitions the clock has reached. Never moves
    /// past `Processing`.
    pub fn observe_clock(&mut self, now: u64) -> Result<Phase, EngineError> {
        let target = self.config.timeline.phase_at(now);
        while self.phase < target {
            self.advance_phase()?;
        }
        Ok(self.phase)
    }

    pub fn sign_up(&mut self, pub_key: PubKey) -> Result<u64, EngineError> {
        self.require("sign_up", Phase::SignUp)?;
        let index = self.registry.sign_up(pub_key, self.config.initial_voice_credit_balance)?;
        info!(index, root = %fp_to_hex(&self.registry.root()), "signed up");
        Ok(index)
    }

    pub fn publish_message(&mut self, message: Message, ecdh_pub_key: PubKey) -> Result<u64, EngineError> {
        self.require("publish_message", Phase::Voting)?;
        let index = self.log.publish(message, ecdh_pub_key)?;
        info!(index, root = %fp_to_hex(&self.log.root()), "message published");
        Ok(index)
    }

    /// Witness for `[start, start + size)` against the current state, without
    /// changing it.
    pub fn gen_batch_update_state_tree_inputs(
        &self,
        start: u64,
        size: u64,
        random_leaf: StateLeaf,
    ) -> Result<BatchUpdateWitness, EngineError> {
        self.check_message_batch_size(size)?;
        let mut scratch = self.registry.clone();
        Ok(build_batch(&mut scratch, &self.log, &self.coordinator, self.params(), start, size, random_leaf)?.witness)
    }

    /// Process the next message batch. The batch is computed on a copy of the
    /// registry and committed only if the witness replays to the same root.
    pub fn process_batch(
        &mut self,
        start: u64,
        size: u64,
        random_leaf: StateLeaf,
    ) -> Result<BatchOutcome, EngineError> {
        self.require("process_batch", Phase::Processing)?;
        self.check_message_batch_size(size)?;
        if start != self.processed_messages {
            return Err(EngineError::BatchOutOfOrder { expected: self.processed_messages, got: start });
        }
        // A batch must start inside the published log.
        if start >= self.log.len() {
            return Err(EngineError::NoPendingMessages);
        }

        let mut next = self.registry.clone();
        let outcome = build_batch(&mut next, &self.log, &self.coordinator, self.params(), start, size, random_leaf)?;
        let replayed = self.oracle.batch_root(&outcome.witness)?;
        if replayed != next.root() {
            error!(start, engine = %fp_to_hex(&next.root()), witness = %fp_to_hex(&replayed), "state root mismatch");
            return Err(EngineError::StateRootMismatch { engine: next.root(), witness: replayed });
        }

        self.registry = next;
        self.processed_messages += size;
        info!(
            start,
            applied = outcome.applied(),
            root = %fp_to_hex(&outcome.new_state_root),
            "batch processed"
        );
        Ok(outcome)
    }

    /// Committed results plus the participants in `[start, start + size)`.
    pub fn compute_batch_tally(&self, start: u64, size: u64) -> Result<Tally, EngineError> {
        accumulate(&self.registry, &self.tally, start, size)
    }

    pub fn gen_tally_circuit_inputs(
        &self,
        start: u64,
        size: u64,
        previous_salt: Fp,
        new_salt: Fp,
    ) -> Result<TallyCircuitInputs, EngineError> {
        circuit_inputs(
            &self.registry,
            self.config.vote_option_tree_depth,
            &self.tally,
            start,
            size,
            previous_salt,
            new_salt,
        )
    }

    /// Tally the next batch of state leaves and commit to the new results.
    pub fn tally_batch(&mut self, start: u64, size: u64, new_salt: Fp) -> Result<TallyCircuitInputs, EngineError> {
        self.require("tally_batch", Phase::Tallying)?;
        if size != self.config.tally_batch_size {
            return Err(EngineError::InvalidBatchSize { expected: self.config.tally_batch_size, got: size });
        }
        if start != self.tallied_leaves {
            return Err(EngineError::BatchOutOfOrder { expected: self.tallied_leaves, got: start });
        }

        let inputs = self.gen_tally_circuit_inputs(start, size, self.results_salt, new_salt)?;
        let replayed = self.oracle.tally_commitment(&inputs)?;
        if replayed != inputs.new_results_commitment {
            error!(start, "results commitment mismatch");
            return Err(EngineError::CommitmentMismatch { engine: inputs.new_results_commitment, witness: replayed });
        }

        self.tally = Tally { results: inputs.new_results.clone() };
        self.results_salt = new_salt;
        self.results_commitment = inputs.new_results_commitment;
        self.tallied_leaves += size;
        info!(start, commitment = %fp_to_hex(&self.results_commitment), "tally batch committed");
        Ok(inputs)
    }

    /// Final results with their revealing salt, once tallying has closed.
    pub fn published_tally(&self) -> Result<PublishedTally, EngineError> {
        self.require("published_tally", Phase::Finalized)?;
        Ok(PublishedTally {
            tally: self.tally.clone(),
            salt: self.results_salt,
            commitment: self.results_commitment,
        })
    }
}
