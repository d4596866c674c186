//! Error taxonomy for the chat endpoints.
//!
//! Handlers return `Result<_, ChatError>`; the [`ResponseError`] impl turns
//! each variant into the JSON error body clients expect. Storage failures are
//! logged with full detail and answered with a generic message.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// Field name -> list of messages, in the shape the frontend renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed or missing input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The conversation does not exist or the caller is not a participant.
    /// Both cases produce the same response.
    #[error("conversation not found")]
    NotFound,

    /// The caller's role may not use the chat endpoints.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ChatError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        ChatError::Validation(errors)
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::NotFound => StatusCode::NOT_FOUND,
            ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
            ChatError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ChatError::Validation(fields) => serde_json::json!({
                "error": "validation failed",
                "fields": fields,
            }),
            ChatError::NotFound => serde_json::json!({
                "error": "Conversation not found",
            }),
            ChatError::Forbidden(message) => serde_json::json!({
                "error": message,
            }),
            ChatError::Database(e) => {
                error!(error = %e, "database error");
                serde_json::json!({
                    "error": "internal server error",
                })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
