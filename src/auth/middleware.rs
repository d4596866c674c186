use actix_web::FromRequest;
use actix_web::{Error, HttpRequest, dev::Payload, web};
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::auth::jwt;
use crate::auth::principal::PrincipalCache;
use crate::error::ChatError;
use crate::models::users;

/// Wrapper type to store the JWT secret in Actix app data.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Any caller holding a valid token for a known user.
pub struct AuthenticatedUser(pub users::Model);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token from the Authorization header.
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    actix_web::error::ErrorUnauthorized("Missing Authorization header")
                })?;

            let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
                actix_web::error::ErrorUnauthorized("Authorization header must be: Bearer <token>")
            })?;

            // 2. Validate the JWT against the shared secret.
            let secret = req.app_data::<web::Data<JwtSecret>>().ok_or_else(|| {
                actix_web::error::ErrorInternalServerError("JWT secret not configured")
            })?;

            let claims = jwt::validate_token(token, &secret.0)
                .map_err(|e| actix_web::error::ErrorUnauthorized(format!("Invalid token: {e}")))?;

            let user_id = claims
                .user_id()
                .map_err(actix_web::error::ErrorUnauthorized)?;

            // 3. Resolve the user row (cached).
            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("Database not configured")
                })?;

            let principals = req
                .app_data::<web::Data<Arc<PrincipalCache>>>()
                .ok_or_else(|| {
                    actix_web::error::ErrorInternalServerError("Principal cache not configured")
                })?;

            let user = principals
                .resolve(db.get_ref(), user_id)
                .await
                .map_err(ChatError::from)?
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("Unknown user"))?;

            Ok(AuthenticatedUser(user))
        })
    }
}

/// An authenticated caller whose role may use chat (responder, patient, admin).
pub struct ChatUser(pub users::Model);

impl FromRequest for ChatUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let authenticated = AuthenticatedUser::from_request(req, payload);

        Box::pin(async move {
            let AuthenticatedUser(user) = authenticated.await?;

            if !user.role.can_chat() {
                return Err(ChatError::Forbidden(
                    "Chat is only available to responders, patients and admins".to_string(),
                )
                .into());
            }

            Ok(ChatUser(user))
        })
    }
}
