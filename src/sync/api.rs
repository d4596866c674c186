use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::models::conversations::{ConversationResponse, ConversationSummary, CreateConversation};
use crate::models::messages::{MessageResponse, SendMessage};
use crate::models::users::UserRef;
use crate::sync::SyncError;

/// The chat REST surface as seen by the sync client.
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, SyncError>;

    async fn get_or_create_conversation(
        &self,
        responder_id: Uuid,
        patient_id: Uuid,
    ) -> Result<ConversationResponse, SyncError>;

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<MessageResponse>, SyncError>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &SendMessage,
    ) -> Result<MessageResponse, SyncError>;

    async fn mark_read(&self, conversation_id: Uuid) -> Result<(), SyncError>;

    async fn available_responders(&self) -> Result<Vec<UserRef>, SyncError>;

    async fn active_patients(&self) -> Result<Vec<UserRef>, SyncError>;
}

/// [`ChatApi`] over HTTP with a bearer token.
#[derive(Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpChatApi {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        debug!("GET {path}");
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SyncError> {
        debug!("POST {path}");
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, SyncError> {
        self.get("/chat/conversations").await
    }

    async fn get_or_create_conversation(
        &self,
        responder_id: Uuid,
        patient_id: Uuid,
    ) -> Result<ConversationResponse, SyncError> {
        let body = CreateConversation {
            responder_id: Some(responder_id),
            patient_id: Some(patient_id),
        };
        self.post("/chat/conversations", &body).await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<MessageResponse>, SyncError> {
        self.get(&format!("/chat/conversations/{conversation_id}/messages"))
            .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &SendMessage,
    ) -> Result<MessageResponse, SyncError> {
        self.post(&format!("/chat/conversations/{conversation_id}/messages"), body)
            .await
    }

    async fn mark_read(&self, conversation_id: Uuid) -> Result<(), SyncError> {
        let _: serde_json::Value = self
            .post(
                &format!("/chat/conversations/{conversation_id}/mark-read"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    async fn available_responders(&self) -> Result<Vec<UserRef>, SyncError> {
        self.get("/chat/available-responders").await
    }

    async fn active_patients(&self) -> Result<Vec<UserRef>, SyncError> {
        self.get("/chat/active-patients").await
    }
}
