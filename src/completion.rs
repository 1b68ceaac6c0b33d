//! Cooking history boundary
//!
//! When a session's last step is completed the engine hands a
//! [`CompletionRecord`] to the caller's recorder on a background thread.
//! Failures are logged and never undo the completed state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::session::SessionId;

/// A finished cooking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub session: SessionId,
    pub recipe_id: String,
    pub recipe_title: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// Persists finished sessions (cooking history)
pub trait CompletionRecorder: Send + Sync {
    fn record(&self, record: &CompletionRecord) -> anyhow::Result<()>;
}

/// Record `record` without blocking the caller
pub fn record_in_background(
    recorder: Arc<dyn CompletionRecorder>,
    record: CompletionRecord,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || match recorder.record(&record) {
        Ok(()) => {
            tracing::info!(
                "Recorded completion of {} ({} min)",
                record.recipe_id,
                record.duration_minutes
            );
        }
        Err(e) => {
            tracing::warn!("Failed to record completion of {}: {:#}", record.recipe_id, e);
        }
    })
}
