use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::{access, read_state};
use crate::db::messages as message_db;
use crate::db::users as user_db;
use crate::error::{ChatError, FieldErrors};
use crate::models::messages::{CreateMessage, MessageResponse, MessageType, SendMessage};
use crate::models::users::{self, SenderRef};

/// A send request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSend {
    pub message: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
}

/// Check a send request before anything is written.
///
/// The body must contain something other than whitespace; `message_type`
/// defaults to text. An empty `attachment_url` is treated as absent.
pub fn validate_send(input: SendMessage) -> Result<ValidatedSend, ChatError> {
    let mut errors = FieldErrors::new();

    let message = match input.message {
        Some(m) if !m.trim().is_empty() => Some(m),
        _ => {
            errors.add("message", "The message field is required.");
            None
        }
    };

    let message_type = match input.message_type.as_deref() {
        None | Some("") => Some(MessageType::Text),
        Some(raw) => match raw.parse::<MessageType>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                errors.add("message_type", e);
                None
            }
        },
    };

    let attachment_url = input.attachment_url.filter(|url| !url.trim().is_empty());

    match (message, message_type) {
        (Some(message), Some(message_type)) if errors.is_empty() => Ok(ValidatedSend {
            message,
            message_type,
            attachment_url,
        }),
        _ => Err(ChatError::Validation(errors)),
    }
}

/// The history of a conversation, oldest first, as seen by `viewer_id`.
///
/// Reading a thread acknowledges it: the other participant's messages are
/// marked read before the history is loaded, so the returned rows already
/// carry the new read state.
pub async fn list_messages(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    viewer_id: Uuid,
) -> Result<Vec<MessageResponse>, ChatError> {
    let conversation = access::authorize_participant(db, conversation_id, viewer_id).await?;
    read_state::sweep(db, &conversation, viewer_id).await?;

    let rows = message_db::get_messages_by_conversation(db, conversation.id).await?;

    let senders: HashMap<Uuid, SenderRef> = user_db::get_users_by_ids(
        db,
        vec![conversation.responder_id, conversation.patient_id],
    )
    .await?
    .iter()
    .map(|u| (u.id, SenderRef::from(u)))
    .collect();

    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(sender) = senders.get(&row.sender_id).cloned() else {
            warn!(message_id = %row.id, sender_id = %row.sender_id, "sender missing, skipping message");
            continue;
        };
        history.push(MessageResponse::new(row, viewer_id, sender));
    }

    Ok(history)
}

/// Append a message from `sender` to the conversation.
///
/// The conversation's `last_message_at` moves to the new message's timestamp
/// in the same transaction.
pub async fn append(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    sender: &users::Model,
    input: SendMessage,
) -> Result<MessageResponse, ChatError> {
    let conversation = access::authorize_participant(db, conversation_id, sender.id).await?;
    let valid = validate_send(input)?;

    let saved = message_db::append_message(
        db,
        CreateMessage {
            conversation_id: conversation.id,
            sender_id: sender.id,
            message: valid.message,
            message_type: valid.message_type,
            attachment_url: valid.attachment_url,
        },
    )
    .await?;

    info!(
        conversation_id = %conversation.id,
        message_id = %saved.id,
        sender_id = %sender.id,
        message_type = saved.message_type.as_str(),
        "message appended"
    );

    Ok(MessageResponse::new(saved, sender.id, SenderRef::from(sender)))
}
