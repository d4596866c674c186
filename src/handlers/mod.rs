pub mod chat;

use actix_web::{error, web};

use crate::error::ChatError;

/// JSON extractor config: malformed bodies become field-level validation
/// errors instead of actix's plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let message = match &err {
                error::JsonPayloadError::Deserialize(e) => e.to_string(),
                other => other.to_string(),
            };
            ChatError::field("body", message).into()
        })
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());

    // ── Chat routes (JWT + role in {responder, patient, admin}) ──
    cfg.service(
        web::scope("/chat")
            .route("/conversations", web::get().to(chat::get_conversations))
            .route("/conversations", web::post().to(chat::create_conversation))
            .route(
                "/conversations/{id}/messages",
                web::get().to(chat::get_messages),
            )
            .route(
                "/conversations/{id}/messages",
                web::post().to(chat::send_message),
            )
            .route(
                "/conversations/{id}/mark-read",
                web::post().to(chat::mark_read),
            )
            .route(
                "/available-responders",
                web::get().to(chat::get_available_responders),
            )
            .route("/active-patients", web::get().to(chat::get_active_patients)),
    );
}
