use std::{collections::HashMap, fs, path::Path, str::FromStr, sync::Arc, time::Duration};

use reqwest::Client;
use shared::domain::SessionId;
use tracing::warn;
use url::Url;

use crate::{
    error::ConfigError,
    provider::{HistoryResponder, ReplyProvider, SessionResponder, SimulatedResponder},
};

pub const DEFAULT_API_URL: &str = "http://192.168.213.82:8000";
pub const SETTINGS_FILE: &str = "chat.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderMode {
    #[default]
    Simulated,
    History,
    Session,
}

impl FromStr for ProviderMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simulated" | "demo" => Ok(Self::Simulated),
            "history" | "json" => Ok(Self::History),
            "session" | "form" => Ok(Self::Session),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub mode: ProviderMode,
    pub session_id: Option<String>,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rng_seed: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            mode: ProviderMode::Simulated,
            session_id: None,
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            rng_seed: None,
            request_timeout_secs: None,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => settings.apply(|key| file_cfg.get(key).cloned()),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("NEXT_PUBLIC_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("CHAT_API_URL") {
        settings.api_url = v;
    }
    settings.apply(|key| env(&format!("APP__{}", key.to_ascii_uppercase())));

    settings
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring non-numeric setting");
            None
        }
    }
}

impl Settings {
    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("api_url") {
            self.api_url = v;
        }
        if let Some(v) = lookup("mode") {
            match v.parse() {
                Ok(mode) => self.mode = mode,
                Err(err) => warn!(error = %err, "ignoring mode setting"),
            }
        }
        if let Some(v) = lookup("session_id") {
            self.session_id = Some(v);
        }
        if let Some(v) = parse_number(&lookup, "min_delay_ms") {
            self.min_delay_ms = v;
        }
        if let Some(v) = parse_number(&lookup, "max_delay_ms") {
            self.max_delay_ms = v;
        }
        if let Some(v) = parse_number(&lookup, "rng_seed") {
            self.rng_seed = Some(v);
        }
        if let Some(v) = parse_number(&lookup, "request_timeout_secs") {
            self.request_timeout_secs = Some(v);
        }
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.api_url.trim();
        let url = Url::parse(raw).map_err(|err| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.clone().and_then(SessionId::new)
    }

    fn http_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().map_err(ConfigError::HttpClient)
    }

    /// Fails for session mode when no session identifier is configured.
    pub fn build_provider(&self) -> Result<Arc<dyn ReplyProvider>, ConfigError> {
        match self.mode {
            ProviderMode::Simulated => {
                let mut responder = SimulatedResponder::new(
                    Duration::from_millis(self.min_delay_ms),
                    Duration::from_millis(self.max_delay_ms),
                )?;
                if let Some(seed) = self.rng_seed {
                    responder = responder.with_seed(seed);
                }
                Ok(Arc::new(responder))
            }
            ProviderMode::History => Ok(Arc::new(HistoryResponder::new(
                self.http_client()?,
                &self.base_url()?,
            ))),
            ProviderMode::Session => Ok(Arc::new(SessionResponder::new(
                self.http_client()?,
                &self.base_url()?,
                self.session_id(),
            )?)),
        }
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
