use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(ExchangeId);

/// Query parameter the chat page carries its session token in.
pub const SESSION_ID_QUERY_PARAM: &str = "session_id";

/// Opaque token scoping a conversation to one backend-tracked session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Returns `None` for blank input; a blank token is treated as absent.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn from_page_url(page_url: &Url) -> Option<Self> {
        page_url
            .query_pairs()
            .find(|(key, _)| key == SESSION_ID_QUERY_PARAM)
            .and_then(|(_, value)| Self::new(value.into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user utterance and the assistant reply it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePair {
    pub message: String,
    pub assistant_response: String,
}

impl MessagePair {
    pub fn new(message: impl Into<String>, assistant_response: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            assistant_response: assistant_response.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine<'a> {
    pub speaker: Speaker,
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub exchange_id: ExchangeId,
    pub pair: MessagePair,
    pub settled_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// User line first, then the bot reply.
    pub fn lines(&self) -> [ChatLine<'_>; 2] {
        [
            ChatLine {
                speaker: Speaker::User,
                content: &self.pair.message,
            },
            ChatLine {
                speaker: Speaker::Bot,
                content: &self.pair.assistant_response,
            },
        ]
    }

    pub fn display_time(&self) -> String {
        self.settled_at.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_blank_tokens() {
        assert!(SessionId::new("   ").is_none());
        assert_eq!(
            SessionId::new(" abc ").map(|id| id.as_str().to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn session_id_is_read_from_page_query() {
        let url = Url::parse("http://localhost:3000/?theme=dark&session_id=s-42").expect("url");
        assert_eq!(
            SessionId::from_page_url(&url).map(|id| id.to_string()),
            Some("s-42".to_string())
        );

        let url = Url::parse("http://localhost:3000/?session_id=").expect("url");
        assert!(SessionId::from_page_url(&url).is_none());
    }

    #[test]
    fn entry_renders_user_line_before_bot_line() {
        let entry = TranscriptEntry {
            exchange_id: ExchangeId(1),
            pair: MessagePair::new("hi", "hello"),
            settled_at: "2024-01-01T09:05:00Z".parse().expect("timestamp"),
        };
        let [first, second] = entry.lines();
        assert_eq!(first.speaker, Speaker::User);
        assert_eq!(first.content, "hi");
        assert_eq!(second.speaker, Speaker::Bot);
        assert_eq!(entry.display_time(), "09:05");
    }
}
