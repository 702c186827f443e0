use std::sync::Arc;

use shared::{
    domain::{MessagePair, TranscriptEntry},
    error::{ChatFailure, FailureKind},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod error;
pub mod provider;
pub mod settings;
pub mod store;

pub use error::{ConfigError, ReplyError, SubmitError};
pub use provider::{
    HistoryResponder, ReplyProvider, SessionResponder, SimulatedResponder, CANNED_RESPONSES,
};
pub use settings::{load_settings, ProviderMode, Settings};
pub use store::ConversationStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// State changes broadcast to the rendering layer, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    PendingChanged(bool),
    ExchangeAppended(TranscriptEntry),
    InputCleared,
    Failed(ChatFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Skipped,
    Replied(TranscriptEntry),
}

/// A submission that has entered Pending but whose call has not been issued.
#[derive(Debug)]
pub struct PendingTurn {
    text: String,
    history: Vec<MessagePair>,
}

impl PendingTurn {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Runs conversation turns against a [`ReplyProvider`], allowing at most one
/// outstanding call at a time.
pub struct ChatController {
    provider: Arc<dyn ReplyProvider>,
    inner: Mutex<ConversationStore>,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatController {
    pub fn new(provider: Arc<dyn ReplyProvider>) -> Arc<Self> {
        Self::with_transcript(provider, Vec::new())
    }

    /// Starts the session with `seed` already in the transcript.
    pub fn with_transcript(provider: Arc<dyn ReplyProvider>, seed: Vec<MessagePair>) -> Arc<Self> {
        let mut store = ConversationStore::new();
        for pair in seed {
            store.append_exchange(pair);
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            provider,
            inner: Mutex::new(store),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ConversationStore {
        self.inner.lock().await.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.inner.lock().await.is_pending()
    }

    /// Replaces the input buffer. Refused (returns `false`) while a reply is
    /// pending, matching a disabled input field.
    pub async fn set_input(&self, text: impl Into<String>) -> bool {
        let mut store = self.inner.lock().await;
        if store.is_pending() {
            return false;
        }
        store.set_input(text);
        true
    }

    pub async fn submit_input(&self) -> Result<SubmitOutcome, SubmitError> {
        let text = self.inner.lock().await.input().to_string();
        self.submit(&text).await
    }

    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, SubmitError> {
        match self.begin(text).await? {
            Some(turn) => self.complete(turn).await,
            None => Ok(SubmitOutcome::Skipped),
        }
    }

    /// Takes `text` as the input and moves Idle to Pending in one step.
    /// Returns `None` for blank text, leaving the state untouched.
    pub async fn begin(&self, text: impl Into<String>) -> Result<Option<PendingTurn>, SubmitError> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("ignoring blank submission");
            return Ok(None);
        }

        let history = {
            let mut store = self.inner.lock().await;
            if store.is_pending() {
                debug!("refusing submission while a reply is pending");
                return Err(SubmitError::Busy);
            }
            store.set_input(text.as_str());
            store.set_pending(true);
            store.set_failure(None);
            store.history()
        };
        self.emit(ChatEvent::PendingChanged(true));
        debug!(history_len = history.len(), "submitting message");

        Ok(Some(PendingTurn { text, history }))
    }

    /// Issues the outbound call for a started turn and settles it.
    pub async fn complete(&self, turn: PendingTurn) -> Result<SubmitOutcome, SubmitError> {
        let PendingTurn { text, history } = turn;
        let result = self.provider.reply(&text, &history).await;

        let mut settled = Vec::with_capacity(3);
        let outcome = {
            let mut store = self.inner.lock().await;
            let outcome = match result {
                Ok(reply) => {
                    let entry = store
                        .append_exchange(MessagePair::new(text, reply))
                        .clone();
                    info!(exchange_id = entry.exchange_id.0, "reply received");
                    settled.push(ChatEvent::ExchangeAppended(entry.clone()));
                    Ok(SubmitOutcome::Replied(entry))
                }
                Err(err) => {
                    warn!(error = %err, "reply failed");
                    let failure = ChatFailure::new(FailureKind::Transport, err.to_string());
                    store.set_failure(Some(failure.clone()));
                    settled.push(ChatEvent::Failed(failure));
                    Err(SubmitError::Reply(err))
                }
            };
            store.clear_input();
            store.set_pending(false);
            outcome
        };
        settled.push(ChatEvent::InputCleared);
        settled.push(ChatEvent::PendingChanged(false));
        for event in settled {
            self.emit(event);
        }

        outcome
    }

    fn emit(&self, event: ChatEvent) {
        // Send only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
