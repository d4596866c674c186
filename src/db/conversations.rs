use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::debug;
use uuid::Uuid;

use crate::models::conversations::{self, ConversationStatus};

/// Fetch a single conversation by ID.
pub async fn get_conversation_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<conversations::Model>, DbErr> {
    conversations::Entity::find_by_id(id).one(db).await
}

/// Fetch the conversation for an exact (responder, patient) pair.
pub async fn find_by_pair(
    db: &DatabaseConnection,
    responder_id: Uuid,
    patient_id: Uuid,
) -> Result<Option<conversations::Model>, DbErr> {
    conversations::Entity::find()
        .filter(conversations::Column::ResponderId.eq(responder_id))
        .filter(conversations::Column::PatientId.eq(patient_id))
        .one(db)
        .await
}

/// Insert a new, empty, active conversation.
pub async fn insert_conversation(
    db: &DatabaseConnection,
    responder_id: Uuid,
    patient_id: Uuid,
) -> Result<conversations::Model, DbErr> {
    let new_conversation = conversations::ActiveModel {
        id: Set(Uuid::new_v4()),
        responder_id: Set(responder_id),
        patient_id: Set(patient_id),
        status: Set(ConversationStatus::Active),
        last_message_at: Set(None),
        created_at: Set(super::now()),
        updated_at: Set(None),
    };

    new_conversation.insert(db).await
}

/// Return the conversation for the pair, creating it if needed.
///
/// The boolean is `true` when this call inserted the row. Two concurrent
/// callers may both miss the lookup; the unique index on the pair makes the
/// second insert fail, and that caller re-reads the winner's row.
pub async fn get_or_create(
    db: &DatabaseConnection,
    responder_id: Uuid,
    patient_id: Uuid,
) -> Result<(conversations::Model, bool), DbErr> {
    if let Some(existing) = find_by_pair(db, responder_id, patient_id).await? {
        return Ok((existing, false));
    }

    match insert_conversation(db, responder_id, patient_id).await {
        Ok(created) => Ok((created, true)),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            debug!(%responder_id, %patient_id, "lost get-or-create race, re-selecting");
            find_by_pair(db, responder_id, patient_id)
                .await?
                .map(|existing| (existing, false))
                .ok_or(err)
        }
        Err(err) => Err(err),
    }
}

/// All conversations a user takes part in, newest first.
pub async fn get_conversations_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<conversations::Model>, DbErr> {
    conversations::Entity::find()
        .filter(
            Condition::any()
                .add(conversations::Column::ResponderId.eq(user_id))
                .add(conversations::Column::PatientId.eq(user_id)),
        )
        .order_by_desc(conversations::Column::CreatedAt)
        .all(db)
        .await
}

/// Advance `last_message_at` to `at`, never moving it backwards.
pub async fn advance_last_message_at<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    at: chrono::DateTime<chrono::Utc>,
) -> Result<u64, DbErr> {
    let result = conversations::Entity::update_many()
        .col_expr(conversations::Column::LastMessageAt, Expr::value(at))
        .col_expr(conversations::Column::UpdatedAt, Expr::value(at))
        .filter(conversations::Column::Id.eq(id))
        .filter(
            Condition::any()
                .add(conversations::Column::LastMessageAt.is_null())
                .add(conversations::Column::LastMessageAt.lt(at)),
        )
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
