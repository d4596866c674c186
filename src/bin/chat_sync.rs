use dotenv::dotenv;
use relief_chat_backend::config::SyncConfig;
use relief_chat_backend::sync::{HttpChatApi, SyncClient, SyncEvent};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = SyncConfig::from_env().expect("Invalid configuration");
    let (mut client, mut events) = SyncClient::new(HttpChatApi::new(&config), &config);
    client.start();

    match client.available_responders().await {
        Ok(responders) => tracing::info!("{} responders available", responders.len()),
        Err(e) => tracing::warn!("Could not load responders: {e}"),
    }
    match client.active_patients().await {
        Ok(patients) => tracing::info!("{} active patients", patients.len()),
        Err(e) => tracing::warn!("Could not load patients: {e}"),
    }

    if let Ok(raw) = std::env::var("CHAT_OPEN_CONVERSATION") {
        match raw.parse::<Uuid>() {
            Ok(id) => {
                if let Err(e) = client.open_thread(id).await {
                    tracing::warn!("Could not load conversation {id}: {e}");
                }
            }
            Err(_) => tracing::warn!("CHAT_OPEN_CONVERSATION is not a UUID: {raw}"),
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = events.recv() => match event {
                SyncEvent::ConversationsUpdated { count, unread } => {
                    tracing::info!("{count} conversations, {unread} unread");
                }
                SyncEvent::ThreadUpdated { conversation_id, messages } => {
                    let state = client.snapshot().await;
                    if let Some(last) = state.messages.last() {
                        tracing::info!(
                            "[{conversation_id}] {messages} messages, latest from {}: {}",
                            last.sender.name,
                            last.message
                        );
                    }
                }
                SyncEvent::PollFailed { target, error, transient } => {
                    tracing::warn!("Poll of {target:?} failed (transient: {transient}): {error}");
                }
                other => tracing::debug!("{other:?}"),
            },
        }
    }

    client.shutdown();
}
