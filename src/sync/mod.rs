//! Client-side synchronization for the chat views.
//!
//! There is no push channel: the [`SyncClient`] polls the conversation list
//! on a coarse interval and the open thread on a fine one, replacing its
//! local [`ViewState`] with each server snapshot.

pub mod api;
pub mod client;
pub mod state;

pub use api::{ChatApi, HttpChatApi};
pub use client::SyncClient;
pub use state::{PendingMessage, ViewState};

use thiserror::Error;
use uuid::Uuid;

use crate::models::messages::MessageResponse;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("conversation not found")]
    NotFound,

    #[error("message is empty")]
    EmptyMessage,

    #[error("no conversation is open")]
    NoThreadSelected,

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether retrying the same request later can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Which loop a poll failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    Conversations,
    Thread(Uuid),
}

/// Notifications for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    ConversationsUpdated { count: usize, unread: u64 },
    ThreadOpened(Uuid),
    ThreadUpdated { conversation_id: Uuid, messages: usize },
    ThreadClosed(Uuid),
    MessageSent(MessageResponse),
    SendFailed { conversation_id: Uuid, error: String },
    PollFailed { target: PollTarget, error: String, transient: bool },
}
