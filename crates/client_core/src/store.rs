use chrono::Utc;
use shared::{
    domain::{ExchangeId, MessagePair, TranscriptEntry},
    error::ChatFailure,
};

/// In-memory conversation state. Performs no validation; the controller owns
/// every precondition.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    transcript: Vec<TranscriptEntry>,
    pending: bool,
    input: String,
    last_failure: Option<ChatFailure>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Wire-level history: the pairs only, in display order.
    pub fn history(&self) -> Vec<MessagePair> {
        self.transcript
            .iter()
            .map(|entry| entry.pair.clone())
            .collect()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn last_failure(&self) -> Option<&ChatFailure> {
        self.last_failure.as_ref()
    }

    pub fn append_exchange(&mut self, pair: MessagePair) -> &TranscriptEntry {
        let exchange_id = ExchangeId(self.transcript.len() as i64 + 1);
        self.transcript.push(TranscriptEntry {
            exchange_id,
            pair,
            settled_at: Utc::now(),
        });
        &self.transcript[self.transcript.len() - 1]
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    pub fn set_failure(&mut self, failure: Option<ChatFailure>) {
        self.last_failure = failure;
    }
}
