use sea_orm::sea_query::Query;
use sea_orm::*;
use uuid::Uuid;

use crate::models::conversations;
use crate::models::users::{self, Roles};

/// Fetch a single user by ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

/// Fetch several users at once (participants, message senders).
pub async fn get_users_by_ids(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<Vec<users::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await
}

/// Active responders a patient can start a chat with.
pub async fn get_available_responders(
    db: &DatabaseConnection,
) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Role.eq(Roles::Responder))
        .filter(users::Column::IsActive.eq(true))
        .order_by_asc(users::Column::Name)
        .all(db)
        .await
}

/// Active patients who have at least one conversation with this responder.
pub async fn get_active_patients_for_responder(
    db: &DatabaseConnection,
    responder_id: Uuid,
) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Role.eq(Roles::Patient))
        .filter(users::Column::IsActive.eq(true))
        .filter(
            users::Column::Id.in_subquery(
                Query::select()
                    .column(conversations::Column::PatientId)
                    .from(conversations::Entity)
                    .and_where(conversations::Column::ResponderId.eq(responder_id))
                    .to_owned(),
            ),
        )
        .order_by_asc(users::Column::Name)
        .all(db)
        .await
}
