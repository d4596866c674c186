use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::models::conversations::ConversationResponse;
use crate::models::messages::{MessageResponse, SendMessage};
use crate::models::users::UserRef;
use crate::sync::api::ChatApi;
use crate::sync::state::{PendingMessage, ViewState};
use crate::sync::{PollTarget, SyncError, SyncEvent};

/// A background poll loop. Aborted when dropped.
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Run `tick` every `period`, first at `start`.
    fn spawn<F, Fut>(start: Instant, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Keeps a [`ViewState`] in step with the server by polling.
pub struct SyncClient<A: ChatApi> {
    api: Arc<A>,
    state: Arc<RwLock<ViewState>>,
    events: UnboundedSender<SyncEvent>,
    list_interval: Duration,
    thread_interval: Duration,
    list_task: Option<PollTask>,
    thread_task: Option<PollTask>,
}

impl<A: ChatApi> SyncClient<A> {
    pub fn new(api: A, config: &SyncConfig) -> (Self, UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let client = Self {
            api: Arc::new(api),
            state: Arc::new(RwLock::new(ViewState::default())),
            events,
            list_interval: config.list_interval,
            thread_interval: config.thread_interval,
            list_task: None,
            thread_task: None,
        };
        (client, receiver)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> Arc<RwLock<ViewState>> {
        Arc::clone(&self.state)
    }

    pub async fn snapshot(&self) -> ViewState {
        self.state.read().await.clone()
    }

    /// Start the conversation-list loop. The first poll runs immediately.
    pub fn start(&mut self) {
        if self.list_task.is_some() {
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        self.list_task = Some(PollTask::spawn(Instant::now(), self.list_interval, move || {
            let api = Arc::clone(&api);
            let state = Arc::clone(&state);
            let events = events.clone();
            async move {
                let _ = sync_conversations(api.as_ref(), &state, &events).await;
            }
        }));
        info!(interval = ?self.list_interval, "conversation polling started");
    }

    pub async fn refresh_conversations(&self) -> Result<(), SyncError> {
        sync_conversations(self.api.as_ref(), &self.state, &self.events).await
    }

    /// Open a thread: fetch it, mark it read once, then poll it.
    ///
    /// The thread loop keeps running when the first fetch fails; the error is
    /// returned so the caller can surface it.
    pub async fn open_thread(&mut self, conversation_id: Uuid) -> Result<(), SyncError> {
        self.thread_task = None;
        self.state.write().await.select(conversation_id);
        let _ = self.events.send(SyncEvent::ThreadOpened(conversation_id));

        let first = sync_thread(self.api.as_ref(), &self.state, &self.events, conversation_id).await;

        match self.api.mark_read(conversation_id).await {
            Ok(()) => self.state.write().await.clear_unread(conversation_id),
            Err(e) => warn!(conversation_id = %conversation_id, error = %e, "mark read failed"),
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        self.thread_task = Some(PollTask::spawn(
            Instant::now() + self.thread_interval,
            self.thread_interval,
            move || {
                let api = Arc::clone(&api);
                let state = Arc::clone(&state);
                let events = events.clone();
                async move {
                    let _ = sync_thread(api.as_ref(), &state, &events, conversation_id).await;
                }
            },
        ));
        debug!(conversation_id = %conversation_id, "thread polling started");

        first
    }

    pub async fn close_thread(&mut self) {
        self.thread_task = None;
        if let Some(closed) = self.state.write().await.deselect() {
            let _ = self.events.send(SyncEvent::ThreadClosed(closed));
        }
    }

    pub fn is_polling(&self) -> bool {
        self.list_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn is_polling_thread(&self) -> bool {
        self.thread_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Send `text` to the open thread, showing it optimistically until the
    /// server confirms it.
    pub async fn send(&self, text: impl Into<String>) -> Result<MessageResponse, SyncError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(SyncError::EmptyMessage);
        }

        let (conversation_id, local_id) = {
            let mut state = self.state.write().await;
            let conversation_id = state.selected.ok_or(SyncError::NoThreadSelected)?;
            let pending = PendingMessage::text(conversation_id, text.clone());
            let local_id = pending.local_id;
            state.draft.clear();
            state.push_pending(pending);
            (conversation_id, local_id)
        };

        let body = SendMessage {
            message: Some(text),
            ..SendMessage::default()
        };
        match self.api.send_message(conversation_id, &body).await {
            Ok(message) => {
                self.state.write().await.settle_sent(local_id, message.clone());
                let _ = self.events.send(SyncEvent::MessageSent(message.clone()));
                Ok(message)
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "send failed; draft restored");
                self.state
                    .write()
                    .await
                    .fail_pending(local_id, e.to_string());
                let _ = self.events.send(SyncEvent::SendFailed {
                    conversation_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Get-or-create the conversation for a pair, then open it.
    pub async fn start_conversation(
        &mut self,
        responder_id: Uuid,
        patient_id: Uuid,
    ) -> Result<ConversationResponse, SyncError> {
        let conversation = self
            .api
            .get_or_create_conversation(responder_id, patient_id)
            .await?;
        info!(conversation_id = %conversation.id, "conversation ready");

        // A failed refresh is already reported; the next list tick retries.
        let _ = self.refresh_conversations().await;
        self.open_thread(conversation.id).await?;
        Ok(conversation)
    }

    /// Responders a patient can start a conversation with.
    pub async fn available_responders(&self) -> Result<Vec<UserRef>, SyncError> {
        self.api.available_responders().await
    }

    /// Patients the signed-in responder is already talking to.
    pub async fn active_patients(&self) -> Result<Vec<UserRef>, SyncError> {
        self.api.active_patients().await
    }

    /// Stop both loops. Called on logout.
    pub fn shutdown(&mut self) {
        self.thread_task = None;
        self.list_task = None;
        info!("chat polling stopped");
    }
}

async fn sync_conversations<A: ChatApi + ?Sized>(
    api: &A,
    state: &RwLock<ViewState>,
    events: &UnboundedSender<SyncEvent>,
) -> Result<(), SyncError> {
    match api.list_conversations().await {
        Ok(snapshot) => {
            let mut state = state.write().await;
            state.replace_conversations(snapshot);
            state.last_error = None;
            let _ = events.send(SyncEvent::ConversationsUpdated {
                count: state.conversations.len(),
                unread: state.unread_total(),
            });
            Ok(())
        }
        Err(e) => {
            report_poll_failure(state, events, PollTarget::Conversations, &e).await;
            Err(e)
        }
    }
}

async fn sync_thread<A: ChatApi + ?Sized>(
    api: &A,
    state: &RwLock<ViewState>,
    events: &UnboundedSender<SyncEvent>,
    conversation_id: Uuid,
) -> Result<(), SyncError> {
    match api.list_messages(conversation_id).await {
        Ok(snapshot) => {
            let mut state = state.write().await;
            if state.apply_thread_snapshot(conversation_id, snapshot) {
                state.last_error = None;
                let _ = events.send(SyncEvent::ThreadUpdated {
                    conversation_id,
                    messages: state.messages.len(),
                });
            } else {
                debug!(conversation_id = %conversation_id, "dropped snapshot for closed thread");
            }
            Ok(())
        }
        Err(e) => {
            report_poll_failure(state, events, PollTarget::Thread(conversation_id), &e).await;
            Err(e)
        }
    }
}

/// Record a failed poll. The last good data stays and the loop keeps its
/// cadence either way.
async fn report_poll_failure(
    state: &RwLock<ViewState>,
    events: &UnboundedSender<SyncEvent>,
    target: PollTarget,
    e: &SyncError,
) {
    let transient = e.is_transient();
    if transient {
        warn!(?target, error = %e, "poll failed; retrying next tick");
    } else {
        error!(?target, error = %e, "poll rejected by server");
    }

    state.write().await.last_error = Some(e.to_string());
    let _ = events.send(SyncEvent::PollFailed {
        target,
        error: e.to_string(),
        transient,
    });
}
