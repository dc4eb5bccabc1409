//! Append-only log of encrypted messages and their ephemeral keys.

use primitives::{nothing_up_my_sleeve, Fp, PubKey};
use serde::{Deserialize, Serialize};
use tree::{params, IncrementalTree, MerklePath, TreeError};

use domain::Message;

/// Zero value of the message tree.
pub fn message_tree_zero() -> Fp {
    nothing_up_my_sleeve(b"qv:message-tree")
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct LogEntry {
    pub message: Message,
    pub ecdh_pub_key: PubKey,
}

#[derive(Clone, Debug)]
pub struct MessageLog {
    tree: IncrementalTree,
    entries: Vec<LogEntry>,
}

impl MessageLog {
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        Ok(Self { tree: IncrementalTree::new(params::BINARY, depth, message_tree_zero())?, entries: Vec::new() })
    }

    pub fn root(&self) -> Fp {
        self.tree.root()
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: u64) -> Option<&LogEntry> {
        self.entries.get(index as usize)
    }

    pub fn path(&self, index: u64) -> Result<MerklePath, TreeError> {
        self.tree.gen_merkle_path(index as usize)
    }

    pub fn publish(&mut self, message: Message, ecdh_pub_key: PubKey) -> Result<u64, TreeError> {
        let index = self.tree.insert(message.hash())?;
        self.entries.push(LogEntry { message, ecdh_pub_key });
        Ok(index as u64)
    }
}
