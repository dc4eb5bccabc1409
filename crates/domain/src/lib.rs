//! Protocol domain objects: signed commands, encrypted messages, state leaves,
//! and the pure state-transition rule shared by the engine and witness replay.

pub mod command;
pub mod message;
pub mod state_leaf;
pub mod transition;

// Re-export all public items from modules for convenience
pub use command::*;
pub use message::*;
pub use state_leaf::*;
pub use transition::*;
