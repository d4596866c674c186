use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::access;
use crate::db::conversations as conversation_db;
use crate::db::messages as message_db;
use crate::db::users as user_db;
use crate::error::{ChatError, FieldErrors};
use crate::models::conversations::{
    ConversationResponse, ConversationSummary, CreateConversation, LatestMessage, sort_summaries,
};
use crate::models::users::{self, UserRef};

/// Every conversation the principal takes part in, most recently active
/// first, each seen from the principal's side.
pub async fn list_conversations(
    db: &DatabaseConnection,
    principal: &users::Model,
) -> Result<Vec<ConversationSummary>, ChatError> {
    let conversations = conversation_db::get_conversations_for_user(db, principal.id).await?;
    if conversations.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
    let counterpart_ids: Vec<Uuid> = conversations
        .iter()
        .map(|c| access::counterpart(c, principal.id))
        .collect();

    let (mut latest, unread, participants) = futures_util::try_join!(
        message_db::get_latest_messages_for_conversations(db, ids.clone()),
        message_db::count_unread_for_conversations(db, ids, principal.id),
        user_db::get_users_by_ids(db, counterpart_ids),
    )?;
    let participants: HashMap<Uuid, users::Model> =
        participants.into_iter().map(|u| (u.id, u)).collect();

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let other_id = access::counterpart(&conversation, principal.id);
        let participant = match participants.get(&other_id) {
            Some(user) => UserRef::from(user.clone()),
            None => {
                warn!(conversation_id = %conversation.id, %other_id, "participant missing, skipping conversation");
                continue;
            }
        };

        let latest_message = latest.remove(&conversation.id).map(|m| LatestMessage {
            is_sender: m.sender_id == principal.id,
            message: m.message,
            created_at: m.created_at,
        });

        summaries.push(ConversationSummary {
            id: conversation.id,
            status: conversation.status,
            last_message_at: conversation.last_message_at,
            unread_count: unread.get(&conversation.id).copied().unwrap_or(0),
            participant,
            latest_message,
        });
    }

    sort_summaries(&mut summaries);
    Ok(summaries)
}

/// Find the conversation for the exact (responder, patient) pair, creating
/// it when absent. Returns the conversation with both participants and
/// whether it was created by this call.
pub async fn get_or_create(
    db: &DatabaseConnection,
    input: CreateConversation,
) -> Result<(ConversationResponse, bool), ChatError> {
    let (responder_id, patient_id) = match (input.responder_id, input.patient_id) {
        (Some(responder_id), Some(patient_id)) => (responder_id, patient_id),
        (responder_id, patient_id) => {
            let mut errors = FieldErrors::new();
            if responder_id.is_none() {
                errors.add("responder_id", "The responder id field is required.");
            }
            if patient_id.is_none() {
                errors.add("patient_id", "The patient id field is required.");
            }
            return Err(ChatError::Validation(errors));
        }
    };

    if responder_id == patient_id {
        return Err(ChatError::field(
            "patient_id",
            "The patient id and responder id must be different.",
        ));
    }

    let found: HashMap<Uuid, users::Model> =
        user_db::get_users_by_ids(db, vec![responder_id, patient_id])
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

    let (Some(responder), Some(patient)) = (
        found.get(&responder_id).cloned(),
        found.get(&patient_id).cloned(),
    ) else {
        let mut errors = FieldErrors::new();
        if !found.contains_key(&responder_id) {
            errors.add("responder_id", "The selected responder id is invalid.");
        }
        if !found.contains_key(&patient_id) {
            errors.add("patient_id", "The selected patient id is invalid.");
        }
        return Err(ChatError::Validation(errors));
    };

    let (conversation, created) =
        conversation_db::get_or_create(db, responder_id, patient_id).await?;
    if created {
        info!(conversation_id = %conversation.id, %responder_id, %patient_id, "conversation created");
    }

    Ok((
        ConversationResponse::new(conversation, responder.into(), patient.into()),
        created,
    ))
}
