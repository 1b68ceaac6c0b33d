//! Transient on-screen alerts
//!
//! Alerts mirror spoken feedback for a fixed display window and then
//! expire. They are advisory: nothing reads them back as state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Default display window in seconds
pub const DEFAULT_ALERT_SECONDS: u64 = 5;

/// Alerts kept before the oldest is dropped regardless of age
const MAX_ALERTS: usize = 20;

/// Upper bound on the configurable display window (one hour)
const MAX_DISPLAY_SECONDS: u64 = 3600;

/// A short advisory message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Alert queue with time-based expiry
#[derive(Debug)]
pub struct AlertCenter {
    alerts: VecDeque<Alert>,
    display_window: Duration,
}

impl Default for AlertCenter {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_SECONDS)
    }
}

impl AlertCenter {
    pub fn new(display_seconds: u64) -> Self {
        Self {
            alerts: VecDeque::new(),
            display_window: Duration::seconds(display_seconds.min(MAX_DISPLAY_SECONDS) as i64),
        }
    }

    /// Add an alert created at `now`
    pub fn push(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            message: message.into(),
            created_at: now,
        };

        if self.alerts.len() == MAX_ALERTS {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert.clone());
        alert
    }

    /// Drop alerts older than the display window, returning how many went
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.alerts.len();
        let window = self.display_window;
        self.alerts.retain(|a| now - a.created_at < window);
        before - self.alerts.len()
    }

    /// Alerts still inside their display window, oldest first
    pub fn visible(&self, now: DateTime<Utc>) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| now - a.created_at < self.display_window)
            .cloned()
            .collect()
    }

    /// Dismiss an alert early
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        before != self.alerts.len()
    }
}
