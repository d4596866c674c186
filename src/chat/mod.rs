//! The messaging core: who may see a conversation, the conversation
//! directory, the append-only message log and read-state tracking.

pub mod access;
pub mod directory;
pub mod log;
pub mod read_state;
