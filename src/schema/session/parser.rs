//! Turning the raw session string into a [`SessionInfoMessage`].

use tracing::{debug, trace};

use super::SessionInfoMessage;
use crate::yaml_utils::preprocess_iracing_yaml;
use crate::{Result, TelemetryError};

/// Parses a session string.
///
/// Clients hold one behind an `Arc` so hosts can substitute their own, and so
/// tests can count how often parsing actually happens.
pub trait SessionInfoParser: Send + Sync {
    fn parse(&self, yaml: &str) -> Result<SessionInfoMessage>;
}

impl<F> SessionInfoParser for F
where
    F: Fn(&str) -> Result<SessionInfoMessage> + Send + Sync,
{
    fn parse(&self, yaml: &str) -> Result<SessionInfoMessage> {
        self(yaml)
    }
}

/// The default parser: cleans the sim's YAML quirks, then deserializes.
///
/// In strict mode a message without a track name or without any session is
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSessionInfoParser {
    strict: bool,
}

impl YamlSessionInfoParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    fn validate(message: &SessionInfoMessage) -> Result<()> {
        let track = message.weekend_info.as_ref().and_then(|w| w.track_name.as_deref());
        if track.is_none_or(str::is_empty) {
            return Err(TelemetryError::parse_error("Session validation", "Missing track name"));
        }
        if message.session_info.as_ref().is_none_or(|s| s.sessions.is_empty()) {
            return Err(TelemetryError::parse_error("Session validation", "No sessions found"));
        }
        Ok(())
    }
}

impl SessionInfoParser for YamlSessionInfoParser {
    fn parse(&self, yaml: &str) -> Result<SessionInfoMessage> {
        if yaml.trim().is_empty() {
            return Err(TelemetryError::parse_error("Session YAML", "Session string is empty"));
        }
        let cleaned = preprocess_iracing_yaml(yaml);
        trace!(raw = yaml.len(), cleaned = cleaned.len(), "Preprocessed session YAML");

        let message = SessionInfoMessage::from_yaml(&cleaned)?;
        if self.strict {
            Self::validate(&message)?;
        }
        debug!(
            track = message.weekend_info.as_ref().and_then(|w| w.track_name.as_deref()),
            sessions = message.session_info.as_ref().map_or(0, |s| s.sessions.len()),
            "Parsed session info"
        );
        Ok(message)
    }
}
