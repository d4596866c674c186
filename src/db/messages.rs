use sea_orm::prelude::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::conversations as conversation_db;
use crate::models::messages::{self, CreateMessage};

/// Append a message and advance the conversation's `last_message_at` in one
/// transaction. Either both writes land or neither does.
pub async fn append_message(
    db: &DatabaseConnection,
    input: CreateMessage,
) -> Result<messages::Model, DbErr> {
    let txn = db.begin().await?;

    let created_at = super::now();
    let new_message = messages::ActiveModel {
        // v7 ids sort by creation time, which breaks `created_at` ties in
        // insertion order.
        id: Set(Uuid::now_v7()),
        conversation_id: Set(input.conversation_id),
        sender_id: Set(input.sender_id),
        message: Set(input.message),
        message_type: Set(input.message_type),
        attachment_url: Set(input.attachment_url),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(created_at),
    };

    let saved = new_message.insert(&txn).await?;
    conversation_db::advance_last_message_at(&txn, saved.conversation_id, saved.created_at)
        .await?;

    txn.commit().await?;
    Ok(saved)
}

/// Full history of a conversation, oldest first.
pub async fn get_messages_by_conversation(
    db: &DatabaseConnection,
    conversation_id: Uuid,
) -> Result<Vec<messages::Model>, DbErr> {
    messages::Entity::find()
        .filter(messages::Column::ConversationId.eq(conversation_id))
        .order_by_asc(messages::Column::CreatedAt)
        .order_by_asc(messages::Column::Id)
        .all(db)
        .await
}

/// Mark every unread message in a conversation as read for a reader
/// (i.e., messages NOT sent by them). Returns the number of rows flipped.
pub async fn mark_all_read_for_conversation(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    reader_id: Uuid,
) -> Result<u64, DbErr> {
    let result = messages::Entity::update_many()
        .col_expr(messages::Column::IsRead, Expr::value(true))
        .col_expr(messages::Column::ReadAt, Expr::value(super::now()))
        .filter(messages::Column::ConversationId.eq(conversation_id))
        .filter(messages::Column::SenderId.ne(reader_id))
        .filter(messages::Column::IsRead.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Count unread messages in a conversation for a user (messages sent by the other party).
pub async fn count_unread_for_conversation(
    db: &DatabaseConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<u64, DbErr> {
    messages::Entity::find()
        .filter(messages::Column::ConversationId.eq(conversation_id))
        .filter(messages::Column::SenderId.ne(user_id))
        .filter(messages::Column::IsRead.eq(false))
        .count(db)
        .await
}

/// Count unread messages for many conversations in one query and return a
/// conversation_id -> unread_count map. Conversations with nothing unread are absent.
pub async fn count_unread_for_conversations(
    db: &DatabaseConnection,
    conversation_ids: Vec<Uuid>,
    user_id: Uuid,
) -> Result<HashMap<Uuid, u64>, DbErr> {
    if conversation_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let unread: Vec<Uuid> = messages::Entity::find()
        .select_only()
        .column(messages::Column::ConversationId)
        .filter(messages::Column::ConversationId.is_in(conversation_ids))
        .filter(messages::Column::SenderId.ne(user_id))
        .filter(messages::Column::IsRead.eq(false))
        .into_tuple()
        .all(db)
        .await?;

    let mut counts: HashMap<Uuid, u64> = HashMap::new();
    for conversation_id in unread {
        *counts.entry(conversation_id).or_insert(0) += 1;
    }

    Ok(counts)
}

/// Get latest messages for many conversations in one query and return a
/// conversation_id -> message map.
pub async fn get_latest_messages_for_conversations(
    db: &DatabaseConnection,
    conversation_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, messages::Model>, DbErr> {
    if conversation_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = messages::Entity::find()
        .filter(messages::Column::ConversationId.is_in(conversation_ids))
        .order_by_desc(messages::Column::CreatedAt)
        .order_by_desc(messages::Column::Id)
        .all(db)
        .await?;

    let mut latest: HashMap<Uuid, messages::Model> = HashMap::new();
    for row in rows {
        latest.entry(row.conversation_id).or_insert(row);
    }

    Ok(latest)
}
