use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::{Client, Response};
use shared::{
    domain::{MessagePair, SessionId},
    protocol::{ChatCompletionBody, SessionCompletionForm, SimpleResponse, CHAT_COMPLETION_PATH},
};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ReplyError};

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(3000);

pub const CANNED_RESPONSES: [&str; 7] = [
    "That's a great question! Let me help you with that.",
    "I understand what you're looking for. Here's what I can tell you...",
    "Thanks for asking! I'd be happy to provide more information.",
    "That's an interesting point. Let me elaborate on that for you.",
    "I see what you mean. Here's my perspective on that topic.",
    "I can definitely help you with that request.",
    "That's a common question, and I'm glad you asked!",
];

/// Turns one submission into the assistant's reply text.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn reply(&self, message: &str, history: &[MessagePair]) -> Result<String, ReplyError>;
}

/// Local stand-in for a backend: sleeps a random delay, then answers with a
/// canned response.
pub struct SimulatedResponder {
    min_delay: Duration,
    max_delay: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedResponder {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Result<Self, ConfigError> {
        if min_delay > max_delay {
            return Err(ConfigError::InvalidDelayBounds {
                min_ms: min_delay.as_millis() as u64,
                max_ms: max_delay.as_millis() as u64,
            });
        }
        Ok(Self {
            min_delay,
            max_delay,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (self.min_delay, self.max_delay)
    }

    async fn draw(&self) -> (Duration, &'static str) {
        let mut rng = self.rng.lock().await;
        let delay_ms = rng.gen_range(
            self.min_delay.as_millis() as u64..=self.max_delay.as_millis() as u64,
        );
        let delay = Duration::from_millis(delay_ms);
        let response = CANNED_RESPONSES[rng.gen_range(0..CANNED_RESPONSES.len())];
        (delay, response)
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

#[async_trait]
impl ReplyProvider for SimulatedResponder {
    async fn reply(&self, _message: &str, _history: &[MessagePair]) -> Result<String, ReplyError> {
        let (delay, response) = self.draw().await;
        debug!(delay_ms = delay.as_millis() as u64, "simulating reply");
        tokio::time::sleep(delay).await;
        Ok(response.to_string())
    }
}

fn completion_endpoint(base_url: &Url) -> String {
    format!(
        "{}{CHAT_COMPLETION_PATH}",
        base_url.as_str().trim_end_matches('/')
    )
}

async fn read_reply(res: Response) -> Result<String, ReplyError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ReplyError::Status { status, body });
    }
    let raw = res.text().await.map_err(|err| ReplyError::Decode(err.to_string()))?;
    let body: SimpleResponse =
        serde_json::from_str(&raw).map_err(|err| ReplyError::Decode(err.to_string()))?;
    Ok(body.detail)
}

/// Sends the submitted text together with the full prior transcript as JSON.
pub struct HistoryResponder {
    http: Client,
    endpoint: String,
}

impl HistoryResponder {
    pub fn new(http: Client, base_url: &Url) -> Self {
        Self {
            http,
            endpoint: completion_endpoint(base_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReplyProvider for HistoryResponder {
    async fn reply(&self, message: &str, history: &[MessagePair]) -> Result<String, ReplyError> {
        let body = ChatCompletionBody {
            message: message.to_string(),
            history: history.to_vec(),
        };
        let res = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|source| ReplyError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;
        read_reply(res).await
    }
}

/// Sends the submitted text form-encoded with a backend session identifier;
/// the backend tracks history itself.
pub struct SessionResponder {
    http: Client,
    endpoint: String,
    session_id: SessionId,
}

impl SessionResponder {
    pub fn new(
        http: Client,
        base_url: &Url,
        session_id: Option<SessionId>,
    ) -> Result<Self, ConfigError> {
        let session_id = session_id.ok_or(ConfigError::MissingSessionId)?;
        Ok(Self {
            http,
            endpoint: completion_endpoint(base_url),
            session_id,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}

#[async_trait]
impl ReplyProvider for SessionResponder {
    async fn reply(&self, message: &str, _history: &[MessagePair]) -> Result<String, ReplyError> {
        let form = SessionCompletionForm {
            message: message.to_string(),
            session_id: self.session_id.clone(),
        };
        let res = self
            .http
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|source| ReplyError::Transport {
                url: self.endpoint.clone(),
                source,
            })?;
        read_reply(res).await
    }
}

#[cfg(test)]
#[path = "tests/provider_tests.rs"]
mod tests;
