use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `Roles` enum maps to a TEXT column stored as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Roles {
    #[sea_orm(string_value = "responder")]
    Responder,
    #[sea_orm(string_value = "patient")]
    Patient,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "logistics")]
    Logistics,
}

impl Roles {
    /// Roles allowed to use the chat endpoints.
    pub fn can_chat(self) -> bool {
        matches!(self, Roles::Responder | Roles::Patient | Roles::Admin)
    }
}

/// SeaORM entity for the `users` table.
///
/// Rows are owned by the identity service; the chat core only reads them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub role: Roles,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Public view of a chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub role: Roles,
    pub profile_image: Option<String>,
}

impl From<Model> for UserRef {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            role: m.role,
            profile_image: m.profile_image,
        }
    }
}

/// Sender block embedded in every message response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    pub id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
}

impl From<&Model> for SenderRef {
    fn from(m: &Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            profile_image: m.profile_image.clone(),
        }
    }
}
