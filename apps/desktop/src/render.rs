//! Plain-text rendering of the transcript and controller events.

use client_core::ChatEvent;
use shared::{
    domain::{ChatLine, MessagePair, Speaker, TranscriptEntry},
    error::{ChatFailure, FailureKind},
};

pub const HEADER: &str = "AI Assistant (online). Type a message and press Enter; /quit to leave.";
pub const OPENING_LINE: &str = "bot > Hello! How can I help you today?";
pub const TYPING_INDICATOR: &str = "bot is typing...";

/// Canned demo conversation shown by `--seed-greeting`.
pub fn greeting_transcript() -> Vec<MessagePair> {
    vec![
        MessagePair::new(
            "Hi there! I'm looking for information about your services.",
            "I'd be happy to help you learn about our services! We offer a wide range of solutions including web development, mobile apps, and AI integration. What specific area interests you most?",
        ),
        MessagePair::new(
            "I'm particularly interested in AI integration. Can you tell me more?",
            "Great choice! Our AI integration services include chatbots, natural language processing, machine learning models, and automated workflows. We can help you implement AI solutions that streamline your business processes and enhance user experiences.",
        ),
    ]
}

pub fn render_line(line: &ChatLine<'_>, time: &str) -> String {
    let who = match line.speaker {
        Speaker::User => "you",
        Speaker::Bot => "bot",
    };
    format!("[{time}] {who} > {}", line.content)
}

pub fn render_entry(entry: &TranscriptEntry) -> Vec<String> {
    let time = entry.display_time();
    entry
        .lines()
        .iter()
        .map(|line| render_line(line, &time))
        .collect()
}

/// The user's own line is already on screen, so an appended exchange only
/// prints the reply.
pub fn render_event(event: &ChatEvent) -> Option<String> {
    match event {
        ChatEvent::PendingChanged(true) => Some(TYPING_INDICATOR.to_string()),
        ChatEvent::ExchangeAppended(entry) => {
            let [_, reply] = entry.lines();
            Some(render_line(&reply, &entry.display_time()))
        }
        ChatEvent::Failed(failure) => Some(format!("! {}", failure.banner())),
        ChatEvent::PendingChanged(false) | ChatEvent::InputCleared => None,
    }
}

pub fn busy_notice() -> String {
    format!(
        "! {}",
        ChatFailure::new(FailureKind::Busy, "reply pending").banner()
    )
}
