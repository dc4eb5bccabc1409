//! Ledger interface and an in-memory mirror of the on-chain contract.
//!
//! The ledger keeps its own trees and never sees witnesses. It rebuilds the
//! public signals from what it has recorded and accepts a state root or a
//! tally commitment only when the proof verifies against those signals.

use anyhow::{bail, ensure, Result};
use tracing::info;

use circuits::{batch_public_signals, tally_public_signals, Proof, ProofBackend, ProofKind};
use domain::{Message, StateLeaf};
use primitives::{fp_to_hex, Fp, PubKey};
use tree::{params, IncrementalTree, MerklePath};

use crate::{verifier, EngineConfig, MessageLog, StateRegistry, Tally};

pub trait Ledger {
    fn state_root(&self) -> Fp;

    fn message_root(&self) -> Fp;

    /// Root of a vote-option tree with no votes.
    fn empty_vote_option_tree_root(&self) -> Fp;

    /// Hash of the blank state leaf, the zero value of the state tree.
    fn hashed_blank_state_leaf(&self) -> Fp;

    fn sign_up(&mut self, pub_key: PubKey, voice_credit_balance: u64) -> Result<u64>;

    fn publish_message(&mut self, message: Message, ecdh_pub_key: PubKey) -> Result<u64>;

    /// Accept the next message batch's state root.
    fn batch_process_message(&mut self, new_state_root: Fp, ecdh_pub_keys: &[PubKey], proof: &Proof) -> Result<()>;

    /// Accept the next tally batch's results commitment.
    fn prove_vote_tally_batch(
        &mut self,
        intermediate_state_root: Fp,
        new_results_commitment: Fp,
        proof: &Proof,
    ) -> Result<()>;

    fn current_results_commitment(&self) -> Fp;

    fn verify_tally_result(&self, depth: usize, index: usize, leaf: Fp, path: &MerklePath, salt: Fp) -> bool;
}

pub struct InMemoryLedger<B: ProofBackend> {
    backend: B,
    coordinator_pub_key: PubKey,
    vote_options_max_index: u64,
    message_batch_size: u64,
    tally_batch_size: u64,
    empty_vote_option_tree_root: Fp,
    hashed_blank_state_leaf: Fp,
    registry: StateRegistry,
    log: MessageLog,
    /// Root after the latest accepted batch; `None` until the first one.
    processed_state_root: Option<Fp>,
    processed_messages: u64,
    tallied_leaves: u64,
    results_commitment: Fp,
}

impl<B: ProofBackend> InMemoryLedger<B> {
    pub fn new(config: &EngineConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let coordinator = config.coordinator_keypair()?;
        let options = config.vote_option_capacity() as usize;
        let empty_vote_option_tree_root =
            IncrementalTree::new(params::QUINARY, config.vote_option_tree_depth, Fp::from(0u64))?.root();
        Ok(Self {
            backend,
            coordinator_pub_key: coordinator.pub_key,
            vote_options_max_index: config.vote_options_max_index,
            message_batch_size: config.message_batch_size,
            tally_batch_size: config.tally_batch_size,
            empty_vote_option_tree_root,
            hashed_blank_state_leaf: StateLeaf::blank(empty_vote_option_tree_root).hash(),
            registry: StateRegistry::new(config.state_tree_depth, config.vote_option_tree_depth)?,
            log: MessageLog::new(config.message_tree_depth)?,
            processed_state_root: None,
            processed_messages: 0,
            tallied_leaves: 0,
            results_commitment: Tally::zero(options).commitment(Fp::from(0u64), config.vote_option_tree_depth)?,
        })
    }

    pub fn processed_messages(&self) -> u64 {
        self.processed_messages
    }

    pub fn tallied_leaves(&self) -> u64 {
        self.tallied_leaves
    }

    pub fn sign_up_count(&self) -> u64 {
        self.registry.len() - 1
    }

    /// Sign-up and voting close with the first accepted proof.
    fn closed(&self) -> bool {
        self.processed_state_root.is_some() || self.tallied_leaves > 0
    }
}

impl<B: ProofBackend> Ledger for InMemoryLedger<B> {
    fn state_root(&self) -> Fp {
        self.processed_state_root.unwrap_or_else(|| self.registry.root())
    }

    fn message_root(&self) -> Fp {
        self.log.root()
    }

    fn empty_vote_option_tree_root(&self) -> Fp {
        self.empty_vote_option_tree_root
    }

    fn hashed_blank_state_leaf(&self) -> Fp {
        self.hashed_blank_state_leaf
    }

    fn sign_up(&mut self, pub_key: PubKey, voice_credit_balance: u64) -> Result<u64> {
        ensure!(!self.closed(), "sign-up closed");
        Ok(self.registry.sign_up(pub_key, voice_credit_balance)?)
    }

    fn publish_message(&mut self, message: Message, ecdh_pub_key: PubKey) -> Result<u64> {
        ensure!(!self.closed(), "voting closed");
        Ok(self.log.publish(message, ecdh_pub_key)?)
    }

    fn batch_process_message(&mut self, new_state_root: Fp, ecdh_pub_keys: &[PubKey], proof: &Proof) -> Result<()> {
        ensure!(self.processed_messages < self.log.len(), "no messages left to process");
        ensure!(
            ecdh_pub_keys.len() as u64 == self.message_batch_size,
            "expected {} ephemeral keys, got {}",
            self.message_batch_size,
            ecdh_pub_keys.len()
        );
        let signals = batch_public_signals(
            new_state_root,
            self.state_root(),
            self.log.root(),
            &self.coordinator_pub_key,
            self.vote_options_max_index,
            self.processed_messages,
            ecdh_pub_keys,
        );
        let vk = self.backend.verifying_key(ProofKind::BatchUpdate);
        if !self.backend.verify(&vk, proof, &signals)? {
            bail!("invalid batch-update proof for messages starting at {}", self.processed_messages);
        }
        self.processed_state_root = Some(new_state_root);
        self.processed_messages += self.message_batch_size;
        info!(root = %fp_to_hex(&new_state_root), processed = self.processed_messages, "ledger accepted batch");
        Ok(())
    }

    fn prove_vote_tally_batch(
        &mut self,
        intermediate_state_root: Fp,
        new_results_commitment: Fp,
        proof: &Proof,
    ) -> Result<()> {
        // With no published messages the sign-up root is final.
        ensure!(self.processed_messages >= self.log.len(), "messages not fully processed");
        let state_root = self.state_root();
        ensure!(self.tallied_leaves < self.registry.len(), "all state leaves tallied");
        let signals = tally_public_signals(
            new_results_commitment,
            state_root,
            self.tallied_leaves / self.tally_batch_size,
            intermediate_state_root,
            self.results_commitment,
        );
        let vk = self.backend.verifying_key(ProofKind::Tally);
        if !self.backend.verify(&vk, proof, &signals)? {
            bail!("invalid tally proof for leaves starting at {}", self.tallied_leaves);
        }
        self.results_commitment = new_results_commitment;
        self.tallied_leaves += self.tally_batch_size;
        info!(commitment = %fp_to_hex(&new_results_commitment), tallied = self.tallied_leaves, "ledger accepted tally");
        Ok(())
    }

    fn current_results_commitment(&self) -> Fp {
        self.results_commitment
    }

    fn verify_tally_result(&self, depth: usize, index: usize, leaf: Fp, path: &MerklePath, salt: Fp) -> bool {
        verifier::verify_tally_result(depth, index, leaf, path, salt, &self.results_commitment)
    }
}
