//! Engine configuration.
//!
//! Loaded from JSON. The coordinator key is an explicit value here and is
//! handed to the engine at construction; nothing reads it from ambient state.

use anyhow::Context;
use primitives::{Keypair, PrivKey};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Timeline};

/// Deepest trees the in-memory registry will build.
pub const MAX_BINARY_DEPTH: usize = 32;
pub const MAX_QUINARY_DEPTH: usize = 8;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct EngineConfig {
    pub state_tree_depth: usize,
    pub message_tree_depth: usize,
    pub vote_option_tree_depth: usize,
    pub vote_options_max_index: u64,
    pub message_batch_size: u64,
    pub tally_batch_size: u64,
    pub initial_voice_credit_balance: u64,
    pub timeline: Timeline,
    /// Hex of the 32-byte private-key repr.
    pub coordinator_priv_key: String,
}

impl EngineConfig {
    /// Small trees suitable for tests and local runs.
    pub fn with_coordinator(coordinator: &PrivKey) -> Self {
        Self {
            state_tree_depth: 4,
            message_tree_depth: 4,
            vote_option_tree_depth: 2,
            vote_options_max_index: 24,
            message_batch_size: 4,
            tally_batch_size: 4,
            initial_voice_credit_balance: 100,
            timeline: Timeline { sign_up_deadline: 3_600, voting_deadline: 7_200 },
            coordinator_priv_key: hex::encode(coordinator.to_bytes()),
        }
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(s).context("parse engine config")?;
        config.validate().context("validate engine config")?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn state_tree_capacity(&self) -> u64 {
        1u64 << self.state_tree_depth
    }

    pub fn message_tree_capacity(&self) -> u64 {
        1u64 << self.message_tree_depth
    }

    pub fn vote_option_capacity(&self) -> u64 {
        5u64.pow(self.vote_option_tree_depth as u32)
    }

    pub fn coordinator_keypair(&self) -> Result<Keypair, EngineError> {
        let raw = hex::decode(self.coordinator_priv_key.trim_start_matches("0x"))
            .map_err(|e| EngineError::Config(format!("coordinator key: {e}")))?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::Config(format!("coordinator key is {} bytes", raw.len())))?;
        Ok(Keypair::from_priv_key(PrivKey::from_bytes(bytes)?)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: String| Err(EngineError::Config(msg));
        if self.state_tree_depth == 0 || self.state_tree_depth > MAX_BINARY_DEPTH {
            return bad(format!("state tree depth {}", self.state_tree_depth));
        }
        if self.message_tree_depth == 0 || self.message_tree_depth > MAX_BINARY_DEPTH {
            return bad(format!("message tree depth {}", self.message_tree_depth));
        }
        if self.vote_option_tree_depth == 0 || self.vote_option_tree_depth > MAX_QUINARY_DEPTH {
            return bad(format!("vote-option tree depth {}", self.vote_option_tree_depth));
        }
        if self.vote_options_max_index >= self.vote_option_capacity() {
            return bad(format!(
                "vote_options_max_index {} does not fit {} options",
                self.vote_options_max_index,
                self.vote_option_capacity()
            ));
        }
        if self.message_batch_size == 0 || self.message_batch_size > self.message_tree_capacity() {
            return bad(format!("message batch size {}", self.message_batch_size));
        }
        if !self.tally_batch_size.is_power_of_two() || self.tally_batch_size > self.state_tree_capacity() {
            return bad(format!("tally batch size {} must be a power of two within the state tree", self.tally_batch_size));
        }
        if self.timeline.sign_up_deadline > self.timeline.voting_deadline {
            return bad("sign-up deadline is after the voting deadline".into());
        }
        self.coordinator_keypair().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn config() -> EngineConfig {
        let mut rng = StdRng::seed_from_u64(50);
        EngineConfig::with_coordinator(&PrivKey::random(&mut rng))
    }

    #[test]
    fn json_roundtrip_validates() {
        let c = config();
        let json = c.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), c);
        assert!(c.coordinator_keypair().is_ok());
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut c = config();
        c.vote_options_max_index = 25;
        assert!(matches!(c.validate(), Err(EngineError::Config(_))));

        let mut c = config();
        c.tally_batch_size = 3;
        assert!(c.validate().is_err());

        let mut c = config();
        c.timeline.sign_up_deadline = c.timeline.voting_deadline + 1;
        assert!(c.validate().is_err());

        let mut c = config();
        c.coordinator_priv_key = "00".repeat(32);
        assert!(matches!(c.validate(), Err(EngineError::Key(_))));

        let mut c = config();
        c.coordinator_priv_key = "zz".into();
        assert!(EngineConfig::from_json_str(&serde_json::to_string(&c).unwrap()).is_err());
    }
}
