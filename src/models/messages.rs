use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::users::SenderRef;

/// Kind of payload a message carries. Non-text kinds usually come with an
/// `attachment_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "image")]
    Image,
    #[sea_orm(string_value = "file")]
    File,
    #[sea_orm(string_value = "location")]
    Location,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::Location => "location",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "file" => Ok(MessageType::File),
            "location" => Ok(MessageType::Location),
            other => Err(format!(
                "The selected message type '{other}' is invalid (expected text, image, file or location)"
            )),
        }
    }
}

/// SeaORM entity for the `messages` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversations::Entity",
        from = "Column::ConversationId",
        to = "super::conversations::Column::Id"
    )]
    Conversation,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SenderId",
        to = "super::users::Column::Id"
    )]
    Sender,
}

impl Related<super::conversations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for `POST /api/chat/conversations/{id}/messages`.
///
/// `message_type` stays a raw string so an unknown value is reported as a
/// field error instead of a body deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

/// Validated input for the message log (used internally by the chat service).
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
}

/// Response DTO for messages, relative to the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_sender: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sender: SenderRef,
}

impl MessageResponse {
    pub fn new(m: Model, viewer_id: Uuid, sender: SenderRef) -> Self {
        Self {
            is_sender: m.sender_id == viewer_id,
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            message: m.message,
            message_type: m.message_type,
            attachment_url: m.attachment_url,
            is_read: m.is_read,
            read_at: m.read_at,
            created_at: m.created_at,
            sender,
        }
    }
}
