use super::*;
use async_trait::async_trait;
use shared::domain::ExchangeId;
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::oneshot;

use crate::error::ReplyError;

/// Replies from a script and records every call it receives.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Arc<Mutex<Vec<(String, Vec<MessagePair>)>>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ReplyProvider for ScriptedProvider {
    async fn reply(&self, message: &str, history: &[MessagePair]) -> Result<String, ReplyError> {
        self.calls
            .lock()
            .await
            .push((message.to_string(), history.to_vec()));
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(err)) => Err(ReplyError::Decode(err)),
            None => Err(ReplyError::Decode("script exhausted".to_string())),
        }
    }
}

/// Holds the call open until released so tests can observe the pending state.
struct GatedProvider {
    started: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl GatedProvider {
    fn new() -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let provider = Self {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(Some(release_rx)),
            calls: AtomicUsize::new(0),
        };
        (provider, started_rx, release_tx)
    }
}

#[async_trait]
impl ReplyProvider for GatedProvider {
    async fn reply(&self, _message: &str, _history: &[MessagePair]) -> Result<String, ReplyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.started.lock().await.take() {
            let _ = tx.send(());
        }
        let release = self.release.lock().await.take();
        if let Some(rx) = release {
            let _ = rx.await;
        }
        Ok("released".to_string())
    }
}

fn drain(rx: &mut broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn submit_appends_one_pair_with_submitted_text() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("hello there")]));
    let controller = ChatController::new(provider);

    let outcome = controller.submit("hi bot").await.expect("submit");

    let SubmitOutcome::Replied(entry) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(entry.pair, MessagePair::new("hi bot", "hello there"));

    let store = controller.snapshot().await;
    assert_eq!(store.transcript().len(), 1);
    assert_eq!(store.transcript()[0].pair.message, "hi bot");
    assert!(!store.is_pending());
}

#[tokio::test]
async fn blank_submission_is_a_no_op() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("unused")]));
    let calls = provider.calls.clone();
    let controller = ChatController::new(provider);
    let mut rx = controller.subscribe_events();
    assert!(controller.set_input("   \t").await);

    for text in ["", "   ", "\n\t "] {
        let outcome = controller.submit(text).await.expect("submit");
        assert_eq!(outcome, SubmitOutcome::Skipped);
    }
    assert_eq!(
        controller.submit_input().await.expect("submit"),
        SubmitOutcome::Skipped
    );

    let store = controller.snapshot().await;
    assert!(store.transcript().is_empty());
    assert!(!store.is_pending());
    assert_eq!(store.input(), "   \t");
    assert!(calls.lock().await.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn pending_holds_until_settlement_and_refuses_second_submission() {
    let (provider, started_rx, release_tx) = GatedProvider::new();
    let provider = Arc::new(provider);
    let controller = ChatController::new(provider.clone());
    assert!(controller.set_input("first").await);

    let task = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_input().await }
    });
    started_rx.await.expect("provider started");

    assert!(controller.is_pending().await);
    assert!(matches!(
        controller.submit("second").await,
        Err(SubmitError::Busy)
    ));
    assert!(!controller.set_input("typed while pending").await);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    release_tx.send(()).expect("release");
    let outcome = task.await.expect("join").expect("submit");
    assert!(matches!(outcome, SubmitOutcome::Replied(_)));

    let store = controller.snapshot().await;
    assert!(!store.is_pending());
    assert_eq!(store.input(), "");
    assert_eq!(store.history(), vec![MessagePair::new("first", "released")]);
}

#[tokio::test]
async fn transcript_keeps_insertion_order_and_sends_prior_history() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("reply A"), Ok("reply B")]));
    let calls = provider.calls.clone();
    let controller = ChatController::new(provider);

    controller.submit("A").await.expect("submit A");
    controller.submit("B").await.expect("submit B");

    let store = controller.snapshot().await;
    assert_eq!(
        store.history(),
        vec![
            MessagePair::new("A", "reply A"),
            MessagePair::new("B", "reply B"),
        ]
    );
    let ids: Vec<_> = store.transcript().iter().map(|e| e.exchange_id).collect();
    assert_eq!(ids, vec![ExchangeId(1), ExchangeId(2)]);

    let calls = calls.lock().await;
    assert!(calls[0].1.is_empty());
    assert_eq!(calls[1].0, "B");
    assert_eq!(calls[1].1, vec![MessagePair::new("A", "reply A")]);
}

#[tokio::test]
async fn failed_reply_surfaces_error_and_still_unlocks() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err("backend down"), Ok("recovered")]));
    let controller = ChatController::new(provider);
    let mut rx = controller.subscribe_events();
    assert!(controller.set_input("hello?").await);

    let err = controller.submit_input().await.expect_err("reply should fail");
    assert!(matches!(err, SubmitError::Reply(ReplyError::Decode(_))));

    let store = controller.snapshot().await;
    assert!(store.transcript().is_empty());
    assert!(!store.is_pending());
    assert_eq!(store.input(), "");
    let failure = store.last_failure().expect("failure banner");
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(failure.message.contains("backend down"));

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&ChatEvent::PendingChanged(true)));
    assert!(matches!(events.get(1), Some(ChatEvent::Failed(_))));
    assert_eq!(
        &events[2..],
        &[ChatEvent::InputCleared, ChatEvent::PendingChanged(false)]
    );

    controller.submit("again").await.expect("retry by user");
    let store = controller.snapshot().await;
    assert!(store.last_failure().is_none());
    assert_eq!(store.transcript().len(), 1);
}

#[tokio::test]
async fn success_broadcasts_events_in_settlement_order() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("pong")]));
    let controller = ChatController::new(provider);
    let mut rx = controller.subscribe_events();

    controller.submit("ping").await.expect("submit");

    let events = drain(&mut rx);
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], ChatEvent::PendingChanged(true));
    match &events[1] {
        ChatEvent::ExchangeAppended(entry) => {
            assert_eq!(entry.pair, MessagePair::new("ping", "pong"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(events[2], ChatEvent::InputCleared);
    assert_eq!(events[3], ChatEvent::PendingChanged(false));
}

#[tokio::test]
async fn seeded_transcript_is_sent_as_history() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("sure")]));
    let calls = provider.calls.clone();
    let controller = ChatController::with_transcript(
        provider,
        vec![MessagePair::new("Hi there!", "Hello! How can I help you today?")],
    );

    controller.submit("tell me more").await.expect("submit");

    let calls = calls.lock().await;
    assert_eq!(calls[0].1.len(), 1);
    let store = controller.snapshot().await;
    assert_eq!(store.transcript()[1].exchange_id, ExchangeId(2));
}

#[tokio::test(start_paused = true)]
async fn simulated_controller_replies_with_canned_response() {
    let responder = SimulatedResponder::new(Duration::from_millis(1000), Duration::from_millis(3000))
        .expect("bounds")
        .with_seed(7);
    let controller = ChatController::new(Arc::new(responder));

    let started = tokio::time::Instant::now();
    let outcome = controller.submit("anything").await.expect("submit");
    let elapsed = started.elapsed();

    let SubmitOutcome::Replied(entry) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert!(CANNED_RESPONSES.contains(&entry.pair.assistant_response.as_str()));
    assert!(elapsed >= Duration::from_millis(1000), "settled after {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3000), "settled after {elapsed:?}");
    assert!(!controller.is_pending().await);
}

#[tokio::test]
async fn begin_enters_pending_before_returning_and_keeps_first_text() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok("reply A"), Ok("unused")]));
    let calls = provider.calls.clone();
    let controller = ChatController::new(provider);

    let turn = controller
        .begin("A")
        .await
        .expect("begin")
        .expect("non-blank turn");
    assert!(controller.is_pending().await);
    assert_eq!(controller.snapshot().await.input(), "A");

    assert!(matches!(controller.begin("B").await, Err(SubmitError::Busy)));
    assert_eq!(controller.snapshot().await.input(), "A");
    assert!(calls.lock().await.is_empty());

    let outcome = controller.complete(turn).await.expect("complete");
    let SubmitOutcome::Replied(entry) = outcome else {
        panic!("expected a reply, got {outcome:?}");
    };
    assert_eq!(entry.pair, MessagePair::new("A", "reply A"));
    assert_eq!(calls.lock().await.len(), 1);
    assert!(controller.begin("  ").await.expect("blank").is_none());
    assert!(!controller.is_pending().await);
}
