use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db::conversations as conversation_db;
use crate::error::ChatError;
use crate::models::conversations;

/// Whether `user_id` is the responder or the patient of the conversation.
pub fn is_participant(conversation: &conversations::Model, user_id: Uuid) -> bool {
    user_id == conversation.responder_id || user_id == conversation.patient_id
}

/// The id of the other participant, seen from `caller_id`.
pub fn counterpart(conversation: &conversations::Model, caller_id: Uuid) -> Uuid {
    if conversation.responder_id == caller_id {
        conversation.patient_id
    } else {
        conversation.responder_id
    }
}

/// Load a conversation on behalf of `user_id`.
///
/// A missing conversation and one the caller does not take part in both
/// produce [`ChatError::NotFound`], so non-participants learn nothing about
/// which ids exist.
pub async fn authorize_participant(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<conversations::Model, ChatError> {
    let conversation = conversation_db::get_conversation_by_id(db, conversation_id)
        .await?
        .ok_or(ChatError::NotFound)?;

    if !is_participant(&conversation, user_id) {
        tracing::debug!(%conversation_id, %user_id, "non-participant access rejected");
        return Err(ChatError::NotFound);
    }

    Ok(conversation)
}
