use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use relief_chat_backend::config::SyncConfig;
use relief_chat_backend::models::conversations::{
    ConversationResponse, ConversationStatus, ConversationSummary,
};
use relief_chat_backend::models::messages::{MessageResponse, MessageType, SendMessage};
use relief_chat_backend::models::users::{Roles, SenderRef, UserRef};
use relief_chat_backend::sync::{ChatApi, PollTarget, SyncClient, SyncError, SyncEvent};
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Default)]
struct FakeApi {
    conversations: Mutex<Vec<ConversationSummary>>,
    threads: Mutex<HashMap<Uuid, Vec<MessageResponse>>>,
    list_calls: AtomicUsize,
    thread_calls: AtomicUsize,
    mark_read_calls: AtomicUsize,
    fail_lists: AtomicBool,
    fail_sends: AtomicBool,
    hold_sends: AtomicBool,
    release_send: Notify,
    hold_threads: AtomicBool,
    release_thread: Notify,
    reject_lists: AtomicBool,
    pairs: Mutex<HashMap<(Uuid, Uuid), Uuid>>,
}

impl FakeApi {
    fn with_conversation(summary: ConversationSummary) -> Self {
        let api = Self::default();
        api.conversations.lock().unwrap().push(summary);
        api
    }
}

fn user(name: &str, role: Roles) -> UserRef {
    UserRef {
        id: Uuid::new_v4(),
        name: name.to_string(),
        role,
        profile_image: None,
    }
}

fn summary(id: Uuid, unread_count: u64) -> ConversationSummary {
    ConversationSummary {
        id,
        status: ConversationStatus::Active,
        last_message_at: None,
        unread_count,
        participant: user("Pat", Roles::Patient),
        latest_message: None,
    }
}

fn delivered(conversation_id: Uuid, text: &str) -> MessageResponse {
    let sender_id = Uuid::new_v4();
    MessageResponse {
        id: Uuid::now_v7(),
        conversation_id,
        sender_id,
        message: text.to_string(),
        message_type: MessageType::Text,
        attachment_url: None,
        is_read: false,
        read_at: None,
        is_sender: true,
        created_at: Utc::now(),
        sender: SenderRef {
            id: sender_id,
            name: "Rita".to_string(),
            profile_image: None,
        },
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, SyncError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_lists.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn get_or_create_conversation(
        &self,
        responder_id: Uuid,
        patient_id: Uuid,
    ) -> Result<ConversationResponse, SyncError> {
        let id = *self
            .pairs
            .lock()
            .unwrap()
            .entry((responder_id, patient_id))
            .or_insert_with(Uuid::new_v4);

        let mut conversations = self.conversations.lock().unwrap();
        if !conversations.iter().any(|c| c.id == id) {
            conversations.push(summary(id, 0));
        }

        Ok(ConversationResponse {
            id,
            responder_id,
            patient_id,
            status: ConversationStatus::Active,
            last_message_at: None,
            created_at: Utc::now(),
            responder: UserRef {
                id: responder_id,
                ..user("Rita", Roles::Responder)
            },
            patient: UserRef {
                id: patient_id,
                ..user("Pat", Roles::Patient)
            },
        })
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<MessageResponse>, SyncError> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot = self
            .threads
            .lock()
            .unwrap()
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        if self.hold_threads.load(Ordering::SeqCst) {
            self.release_thread.notified().await;
        }
        Ok(snapshot)
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &SendMessage,
    ) -> Result<MessageResponse, SyncError> {
        if self.hold_sends.load(Ordering::SeqCst) {
            self.release_send.notified().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        let message = delivered(conversation_id, body.message.as_deref().unwrap_or_default());
        self.threads
            .lock()
            .unwrap()
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, _conversation_id: Uuid) -> Result<(), SyncError> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn available_responders(&self) -> Result<Vec<UserRef>, SyncError> {
        Ok(vec![user("Rita", Roles::Responder)])
    }

    async fn active_patients(&self) -> Result<Vec<UserRef>, SyncError> {
        Ok(vec![user("Pat", Roles::Patient), user("Sam", Roles::Patient)])
    }
}

fn config() -> SyncConfig {
    SyncConfig::new("http://localhost:8080/api", "token")
}

#[tokio::test(start_paused = true)]
async fn test_conversation_list_polls_every_ten_seconds() {
    let id = Uuid::new_v4();
    let (mut client, _events) = SyncClient::new(FakeApi::with_conversation(summary(id, 1)), &config());

    client.start();
    tokio::time::sleep(Duration::from_secs(25)).await;

    // Ticks at 0s, 10s and 20s.
    assert_eq!(client.api().list_calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.snapshot().await.conversations.len(), 1);

    client.shutdown();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(client.api().list_calls.load(Ordering::SeqCst), 3);
    assert!(!client.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_open_thread_marks_read_once_and_polls_until_closed() {
    let id = Uuid::new_v4();
    let api = FakeApi::with_conversation(summary(id, 4));
    api.threads
        .lock()
        .unwrap()
        .insert(id, vec![delivered(id, "Hello")]);
    let (mut client, mut events) = SyncClient::new(api, &config());
    client.refresh_conversations().await.unwrap();

    client.open_thread(id).await.unwrap();

    let state = client.snapshot().await;
    assert_eq!(state.selected, Some(id));
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.unread_total(), 0);
    assert!(client.is_polling_thread());

    tokio::time::sleep(Duration::from_secs(7)).await;
    // Immediate fetch plus ticks at 3s and 6s; mark-read only on open.
    assert_eq!(client.api().thread_calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.api().mark_read_calls.load(Ordering::SeqCst), 1);

    client.close_thread().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.api().thread_calls.load(Ordering::SeqCst), 3);
    assert!(!client.is_polling_thread());

    let mut opened = 0;
    let mut closed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            SyncEvent::ThreadOpened(opened_id) if opened_id == id => opened += 1,
            SyncEvent::ThreadClosed(closed_id) if closed_id == id => closed += 1,
            _ => {}
        }
    }
    assert_eq!(opened, 1);
    assert_eq!(closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_switching_threads_stops_previous_loop() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let api = FakeApi::default();
    api.threads
        .lock()
        .unwrap()
        .insert(first, vec![delivered(first, "first thread")]);
    let (mut client, _events) = SyncClient::new(api, &config());

    client.open_thread(first).await.unwrap();
    client.open_thread(second).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    // Two immediate fetches plus one tick for the second thread only.
    assert_eq!(client.api().thread_calls.load(Ordering::SeqCst), 3);
    let state = client.snapshot().await;
    assert_eq!(state.selected, Some(second));
    assert!(state.messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_last_known_list() {
    let id = Uuid::new_v4();
    let (mut client, mut events) =
        SyncClient::new(FakeApi::with_conversation(summary(id, 2)), &config());

    client.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    client.api().fail_lists.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let state = client.snapshot().await;
    assert_eq!(state.conversations.len(), 1);
    assert_eq!(state.unread_total(), 2);
    assert!(state.last_error.is_some());

    let mut failures = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::PollFailed { target, transient, .. } = event {
            failures.push((target, transient));
        }
    }
    assert_eq!(failures, vec![(PollTarget::Conversations, true)]);

    client.api().fail_lists.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(client.snapshot().await.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_send_is_optimistic_then_reconciled() {
    let id = Uuid::new_v4();
    let api = FakeApi::with_conversation(summary(id, 0));
    api.hold_sends.store(true, Ordering::SeqCst);
    let (mut client, _events) = SyncClient::new(api, &config());
    client.refresh_conversations().await.unwrap();
    client.open_thread(id).await.unwrap();
    let client = Arc::new(client);

    let sending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.send("On my way").await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let state = client.snapshot().await;
    assert_eq!(state.pending.len(), 1);
    assert_eq!(state.pending[0].message, "On my way");
    assert!(state.messages.is_empty());

    client.api().release_send.notify_one();
    let sent = sending.await.unwrap().unwrap();

    let state = client.snapshot().await;
    assert!(state.pending.is_empty());
    assert_eq!(state.messages, vec![sent.clone()]);
    let summary = &state.conversations[0];
    assert_eq!(summary.last_message_at, Some(sent.created_at));
    assert_eq!(
        summary.latest_message.as_ref().map(|m| m.message.as_str()),
        Some("On my way")
    );

    // The next poll delivers the same message; it must not be duplicated.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(client.snapshot().await.messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_restores_draft() {
    let id = Uuid::new_v4();
    let api = FakeApi::default();
    api.fail_sends.store(true, Ordering::SeqCst);
    let (mut client, mut events) = SyncClient::new(api, &config());
    client.open_thread(id).await.unwrap();

    let err = client.send("Hello").await.unwrap_err();
    assert!(err.is_transient());

    let state = client.snapshot().await;
    assert!(state.pending.is_empty());
    assert_eq!(state.draft, "Hello");
    assert!(state.last_error.is_some());

    let mut send_failures = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SyncEvent::SendFailed { conversation_id, .. } if conversation_id == id) {
            send_failures += 1;
        }
    }
    assert_eq!(send_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_rejects_blank_text_and_missing_thread() {
    let (mut client, _events) = SyncClient::new(FakeApi::default(), &config());

    assert!(matches!(
        client.send("hi").await,
        Err(SyncError::NoThreadSelected)
    ));

    client.open_thread(Uuid::new_v4()).await.unwrap();
    assert!(matches!(
        client.send("   ").await,
        Err(SyncError::EmptyMessage)
    ));
    assert!(client.snapshot().await.pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_poll_is_reported_as_permanent_and_retried() {
    let (mut client, mut events) = SyncClient::new(FakeApi::default(), &config());
    client.api().reject_lists.store(true, Ordering::SeqCst);

    client.start();
    tokio::time::sleep(Duration::from_secs(15)).await;

    // Ticks at 0s and 10s both ran despite the rejection.
    assert_eq!(client.api().list_calls.load(Ordering::SeqCst), 2);
    let mut transient_flags = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::PollFailed { transient, .. } = event {
            transient_flags.push(transient);
        }
    }
    assert_eq!(transient_flags, vec![false, false]);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_send_survives_thread_poll_started_before_it() {
    let id = Uuid::new_v4();
    let api = FakeApi::with_conversation(summary(id, 0));
    let (mut client, _events) = SyncClient::new(api, &config());
    client.open_thread(id).await.unwrap();

    // The 3s tick fetches the empty thread and stalls before answering.
    client.api().hold_threads.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(client.api().thread_calls.load(Ordering::SeqCst), 2);

    let sent = client.send("On my way").await.unwrap();
    assert_eq!(client.snapshot().await.messages, vec![sent.clone()]);

    client.api().hold_threads.store(false, Ordering::SeqCst);
    client.api().release_thread.notify_one();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let state = client.snapshot().await;
    assert!(state.pending.is_empty());
    assert_eq!(state.messages, vec![sent.clone()]);

    // The next poll carries the message itself; still exactly one copy.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(client.snapshot().await.messages, vec![sent]);
}

#[tokio::test(start_paused = true)]
async fn test_send_trims_surrounding_whitespace() {
    let (mut client, _events) = SyncClient::new(FakeApi::default(), &config());
    client.open_thread(Uuid::new_v4()).await.unwrap();

    let sent = client.send("  On my way \n").await.unwrap();

    assert_eq!(sent.message, "On my way");
}

#[tokio::test(start_paused = true)]
async fn test_start_conversation_opens_the_thread() {
    let responder_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let (mut client, mut events) = SyncClient::new(FakeApi::default(), &config());

    let first = client
        .start_conversation(responder_id, patient_id)
        .await
        .unwrap();
    let again = client
        .start_conversation(responder_id, patient_id)
        .await
        .unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(first.patient.id, patient_id);
    let state = client.snapshot().await;
    assert_eq!(state.selected, Some(first.id));
    assert_eq!(state.conversations.len(), 1);
    assert!(client.is_polling_thread());
    assert_eq!(client.api().mark_read_calls.load(Ordering::SeqCst), 2);

    let mut opened = 0;
    while let Ok(event) = events.try_recv() {
        if event == SyncEvent::ThreadOpened(first.id) {
            opened += 1;
        }
    }
    assert_eq!(opened, 2);
}

#[tokio::test]
async fn test_picker_lists_come_from_the_api() {
    let (client, _events) = SyncClient::new(FakeApi::default(), &config());

    let responders = client.available_responders().await.unwrap();
    let patients = client.active_patients().await.unwrap();

    assert_eq!(responders.len(), 1);
    assert_eq!(responders[0].role, Roles::Responder);
    let names: Vec<&str> = patients.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Pat", "Sam"]);
}
