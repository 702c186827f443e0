//! Request and response bodies for `POST /chat/completion`.

use serde::{Deserialize, Serialize};

use crate::domain::{MessagePair, SessionId};

pub const CHAT_COMPLETION_PATH: &str = "/chat/completion";

/// JSON body carrying the full prior transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionBody {
    pub message: String,
    pub history: Vec<MessagePair>,
}

/// Form-encoded body scoped to a backend session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompletionForm {
    pub message: String,
    pub session_id: SessionId,
}

/// Reply body. `detail` is the canonical reply field for both request variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleResponse {
    pub detail: String,
}
