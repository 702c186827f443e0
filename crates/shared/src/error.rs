use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Transport,
    Busy,
}

/// Failure state handed to the rendering layer, e.g. for an error banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ChatFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn banner(&self) -> String {
        match self.kind {
            FailureKind::Transport => {
                format!("Could not reach the assistant: {}", self.message)
            }
            FailureKind::Busy => "Still waiting for the previous reply".to_string(),
            FailureKind::Configuration => format!("Configuration error: {}", self.message),
        }
    }
}
