use std::time::Duration;

use tracing::Level;
use tracing::event;

use crate::request::Method;

/// Summary of one logical call through the coordinator.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub method: Method,
    pub path: String,
    pub attempts: u8,
    pub refreshed: bool,
    pub success: bool,
    pub elapsed: Duration,
}

impl RequestOutcome {
    pub fn log(&self) {
        event!(
            Level::INFO,
            method = %self.method,
            path = %self.path,
            attempts = self.attempts,
            refreshed = self.refreshed,
            success = self.success,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "request.outcome"
        );
    }
}
