use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::ChatUser;
use crate::chat::{directory, log, read_state};
use crate::db::users as user_db;
use crate::error::ChatError;
use crate::models::conversations::CreateConversation;
use crate::models::messages::SendMessage;
use crate::models::users::{Roles, UserRef};

/// GET /api/chat/conversations
///
/// Conversations the caller takes part in, most recent activity first, with
/// the other participant, a latest-message preview and the unread count.
pub async fn get_conversations(
    user: ChatUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ChatError> {
    let summaries = directory::list_conversations(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(summaries))
}

/// POST /api/chat/conversations
///
/// Get-or-create the conversation for a (responder, patient) pair.
/// Answers 201 when a conversation was created, 200 when it already existed.
pub async fn create_conversation(
    _user: ChatUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateConversation>,
) -> Result<HttpResponse, ChatError> {
    let (conversation, created) = directory::get_or_create(db.get_ref(), body.into_inner()).await?;

    if created {
        Ok(HttpResponse::Created().json(conversation))
    } else {
        Ok(HttpResponse::Ok().json(conversation))
    }
}

/// GET /api/chat/conversations/{id}/messages
///
/// Full history, oldest first. Marks the other participant's messages read.
pub async fn get_messages(
    user: ChatUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    let history = log::list_messages(db.get_ref(), path.into_inner(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// POST /api/chat/conversations/{id}/messages
pub async fn send_message(
    user: ChatUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<SendMessage>,
) -> Result<HttpResponse, ChatError> {
    let message = log::append(db.get_ref(), path.into_inner(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(message))
}

/// POST /api/chat/conversations/{id}/mark-read
pub async fn mark_read(
    user: ChatUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ChatError> {
    read_state::mark_all_read(db.get_ref(), path.into_inner(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Conversation marked as read",
    })))
}

/// GET /api/chat/available-responders
pub async fn get_available_responders(
    _user: ChatUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ChatError> {
    let responders: Vec<UserRef> = user_db::get_available_responders(db.get_ref())
        .await?
        .into_iter()
        .map(UserRef::from)
        .collect();
    Ok(HttpResponse::Ok().json(responders))
}

/// GET /api/chat/active-patients
///
/// Patients who have a conversation with the calling responder. Callers that
/// are not responders never have any.
pub async fn get_active_patients(
    user: ChatUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ChatError> {
    if user.0.role == Roles::Patient {
        return Ok(HttpResponse::Ok().json(Vec::<UserRef>::new()));
    }

    let patients: Vec<UserRef> = user_db::get_active_patients_for_responder(db.get_ref(), user.0.id)
        .await?
        .into_iter()
        .map(UserRef::from)
        .collect();
    Ok(HttpResponse::Ok().json(patients))
}
