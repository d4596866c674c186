use sea_orm::DatabaseConnection;
use tracing::debug;
use uuid::Uuid;

use crate::chat::access;
use crate::db::messages as message_db;
use crate::error::ChatError;
use crate::models::conversations;

/// Flip every unread message from the other participant to read.
///
/// This is the only way read state changes: a watermark over the whole
/// conversation, never a single message. Repeating it is a no-op.
pub async fn sweep(
    db: &DatabaseConnection,
    conversation: &conversations::Model,
    reader_id: Uuid,
) -> Result<u64, ChatError> {
    let flipped =
        message_db::mark_all_read_for_conversation(db, conversation.id, reader_id).await?;

    if flipped > 0 {
        debug!(conversation_id = %conversation.id, %reader_id, flipped, "marked messages read");
    }

    Ok(flipped)
}

/// Guarded mark-all-read for the `mark-read` endpoint.
pub async fn mark_all_read(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    reader_id: Uuid,
) -> Result<u64, ChatError> {
    let conversation = access::authorize_participant(db, conversation_id, reader_id).await?;
    sweep(db, &conversation, reader_id).await
}

/// Number of messages from the other participant that `user_id` has not read.
pub async fn unread_count(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<u64, ChatError> {
    let conversation = access::authorize_participant(db, conversation_id, user_id).await?;
    Ok(message_db::count_unread_for_conversation(db, conversation.id, user_id).await?)
}
