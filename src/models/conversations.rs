use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::users::UserRef;

/// Conversation status stored as a lowercase string in the database.
///
/// The chat core only ever creates `Active` conversations; the other states
/// are set by moderation tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// SeaORM entity for the `conversations` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub responder_id: Uuid,
    pub patient_id: Uuid,
    pub status: ConversationStatus,
    pub last_message_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ResponderId",
        to = "super::users::Column::Id"
    )]
    Responder,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::PatientId",
        to = "super::users::Column::Id"
    )]
    Patient,
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for `POST /api/chat/conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversation {
    pub responder_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

/// A conversation together with both participants, returned by get-or-create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub responder_id: Uuid,
    pub patient_id: Uuid,
    pub status: ConversationStatus,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub responder: UserRef,
    pub patient: UserRef,
}

impl ConversationResponse {
    pub fn new(m: Model, responder: UserRef, patient: UserRef) -> Self {
        Self {
            id: m.id,
            responder_id: m.responder_id,
            patient_id: m.patient_id,
            status: m.status,
            last_message_at: m.last_message_at,
            created_at: m.created_at,
            responder,
            patient,
        }
    }
}

/// Preview of the most recent message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMessage {
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_sender: bool,
}

/// One row of the conversation list, from the point of view of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub status: ConversationStatus,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: u64,
    pub participant: UserRef,
    pub latest_message: Option<LatestMessage>,
}

/// Order summaries most recent first, conversations without messages last.
///
/// Shared by the server listing and the sync client's optimistic updates so
/// both produce the same order.
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
        (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
