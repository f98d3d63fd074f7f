use std::fmt::Display;

use jiff::Timestamp;
use tracing::{Level, event};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    Rotated,
    Failed,
}

/// Structured events for one refresh episode.
///
/// Every event carries the episode id so the single physical refresh can be
/// correlated with the callers that joined it.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    episode_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(episode_id: Uuid, context: impl Into<String>) -> Self {
        Self {
            episode_id,
            context: context.into(),
        }
    }

    pub fn episode_id(&self) -> Uuid {
        self.episode_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            episode_id = %self.episode_id,
            context = %self.context,
            timestamp = %Timestamp::now(),
            "refresh.start"
        );
    }

    pub fn emit_joined(&self) {
        event!(
            Level::DEBUG,
            episode_id = %self.episode_id,
            context = %self.context,
            "refresh.joined"
        );
    }

    pub fn emit_success(&self, outcome: RefreshOutcome) {
        event!(
            Level::INFO,
            episode_id = %self.episode_id,
            context = %self.context,
            timestamp = %Timestamp::now(),
            outcome = ?outcome,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &dyn Display) {
        event!(
            Level::ERROR,
            episode_id = %self.episode_id,
            context = %self.context,
            timestamp = %Timestamp::now(),
            outcome = ?RefreshOutcome::Failed,
            error = %error,
            "refresh.failure"
        );
    }
}
