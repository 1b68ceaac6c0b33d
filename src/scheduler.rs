//! Countdown timer registry
//!
//! Every step timer of every session and every free-standing timer lives in
//! one registry driven by a single periodic [`TimerScheduler::tick`]. A tick
//! decrements every running timer before reporting any completion, so timers
//! that reach zero together are all reported by the same tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::session::SessionId;

/// Identifier of a free-standing timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(Uuid);

impl TimerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry key: a session's step, or a free-standing timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerKey {
    Step { session: SessionId, step: usize },
    Global { id: TimerId },
}

impl TimerKey {
    pub fn step(session: SessionId, step: usize) -> Self {
        TimerKey::Step { session, step }
    }

    /// Owning session, for step timers
    pub fn session(&self) -> Option<SessionId> {
        match self {
            TimerKey::Step { session, .. } => Some(*session),
            TimerKey::Global { .. } => None,
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKey::Step { session, step } => write!(f, "session {} step {}", session, step),
            TimerKey::Global { id } => write!(f, "timer {}", id),
        }
    }
}

/// What `start_timer` does when the key already has a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Overwrite the existing timer and start again from the full duration
    #[default]
    Restart,
    /// Keep the existing countdown running; restart only if it had finished
    ResumeExisting,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new timer was created
    Started,
    /// An existing timer was reset to a fresh countdown
    Restarted,
    /// An existing timer continued from where it was
    Resumed,
}

/// Scheduler error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("No timer for {0}")]
    UnknownTimer(TimerKey),

    #[error("Timer duration must be at least one second")]
    ZeroDuration,
}

/// Name and category of a free-standing timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerLabel {
    pub name: String,
    pub category: String,
}

/// Read-only view of a timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub key: TimerKey,
    pub total_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<TimerLabel>,
}

impl TimerSnapshot {
    pub fn is_finished(&self) -> bool {
        self.remaining_seconds == 0
    }
}

#[derive(Debug, Clone)]
struct TimerEntry {
    key: TimerKey,
    total: u32,
    remaining: u32,
    running: bool,
    label: Option<TimerLabel>,
}

impl TimerEntry {
    fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            key: self.key,
            total_seconds: self.total,
            remaining_seconds: self.remaining,
            running: self.running,
            label: self.label.clone(),
        }
    }

    fn restart(&mut self, seconds: u32) {
        self.total = seconds;
        self.remaining = seconds;
        self.running = true;
    }
}

/// Single registry of all countdowns
///
/// Entries are kept in insertion order, which breaks ties in
/// [`TimerScheduler::active_timers`].
#[derive(Debug, Default)]
pub struct TimerScheduler {
    entries: Vec<TimerEntry>,
    policy: StartPolicy,
}

impl TimerScheduler {
    pub fn new(policy: StartPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> StartPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: StartPolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &TimerKey) -> Option<&TimerEntry> {
        self.entries.iter().find(|e| e.key == *key)
    }

    fn entry_mut(&mut self, key: &TimerKey) -> Result<&mut TimerEntry, SchedulerError> {
        self.entries
            .iter_mut()
            .find(|e| e.key == *key)
            .ok_or(SchedulerError::UnknownTimer(*key))
    }

    /// Start a countdown for `key`
    ///
    /// An existing timer is handled according to the [`StartPolicy`]; it
    /// keeps its place in insertion order either way.
    pub fn start_timer(
        &mut self,
        key: TimerKey,
        seconds: u32,
    ) -> Result<StartOutcome, SchedulerError> {
        if seconds == 0 {
            return Err(SchedulerError::ZeroDuration);
        }

        let policy = self.policy;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            let outcome = match policy {
                StartPolicy::ResumeExisting if entry.remaining > 0 => {
                    entry.running = true;
                    StartOutcome::Resumed
                }
                _ => {
                    entry.restart(seconds);
                    StartOutcome::Restarted
                }
            };
            tracing::debug!("Timer {} {:?} ({}s)", key, outcome, entry.remaining);
            return Ok(outcome);
        }

        self.entries.push(TimerEntry {
            key,
            total: seconds,
            remaining: seconds,
            running: true,
            label: None,
        });
        tracing::debug!("Timer {} started ({}s)", key, seconds);
        Ok(StartOutcome::Started)
    }

    /// Create and start a free-standing timer
    pub fn create_global_timer(
        &mut self,
        name: impl Into<String>,
        category: impl Into<String>,
        seconds: u32,
    ) -> Result<TimerId, SchedulerError> {
        if seconds == 0 {
            return Err(SchedulerError::ZeroDuration);
        }

        let id = TimerId::new();
        let label = TimerLabel {
            name: name.into(),
            category: category.into(),
        };
        tracing::info!(
            "Global timer {} ({}, {}) started for {}s",
            id,
            label.name,
            label.category,
            seconds
        );
        self.entries.push(TimerEntry {
            key: TimerKey::Global { id },
            total: seconds,
            remaining: seconds,
            running: true,
            label: Some(label),
        });
        Ok(id)
    }

    /// Flip running state; returns whether the timer is now running
    ///
    /// A finished timer cannot be resumed and stays stopped.
    pub fn toggle(&mut self, key: &TimerKey) -> Result<bool, SchedulerError> {
        let entry = self.entry_mut(key)?;
        entry.running = !entry.running && entry.remaining > 0;
        Ok(entry.running)
    }

    /// Stop a timer without losing progress
    pub fn pause(&mut self, key: &TimerKey) -> Result<(), SchedulerError> {
        self.entry_mut(key)?.running = false;
        Ok(())
    }

    /// Resume a paused timer; returns whether it is now running
    pub fn resume(&mut self, key: &TimerKey) -> Result<bool, SchedulerError> {
        let entry = self.entry_mut(key)?;
        if entry.remaining > 0 {
            entry.running = true;
        }
        Ok(entry.running)
    }

    /// Back to the full duration, stopped
    pub fn reset(&mut self, key: &TimerKey) -> Result<(), SchedulerError> {
        let entry = self.entry_mut(key)?;
        entry.remaining = entry.total;
        entry.running = false;
        Ok(())
    }

    /// Remove a timer, returning its last state
    pub fn delete(&mut self, key: &TimerKey) -> Result<TimerSnapshot, SchedulerError> {
        let position = self
            .entries
            .iter()
            .position(|e| e.key == *key)
            .ok_or(SchedulerError::UnknownTimer(*key))?;
        Ok(self.entries.remove(position).snapshot())
    }

    /// Remove every timer owned by `session`
    pub fn delete_session(&mut self, session: SessionId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key.session() != Some(session));
        before - self.entries.len()
    }

    pub fn pause_all(&mut self) {
        for entry in &mut self.entries {
            entry.running = false;
        }
    }

    /// Resume every timer that still has time left
    pub fn resume_all(&mut self) {
        for entry in &mut self.entries {
            entry.running = entry.remaining > 0;
        }
    }

    pub fn get(&self, key: &TimerKey) -> Option<TimerSnapshot> {
        self.entry(key).map(TimerEntry::snapshot)
    }

    /// Every timer, in insertion order
    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        self.entries.iter().map(TimerEntry::snapshot).collect()
    }

    pub fn timers_for_session(&self, session: SessionId) -> Vec<TimerSnapshot> {
        self.entries
            .iter()
            .filter(|e| e.key.session() == Some(session))
            .map(TimerEntry::snapshot)
            .collect()
    }

    /// Timers with time left, shortest first, insertion order on ties
    pub fn active_timers(&self) -> Vec<TimerSnapshot> {
        let mut active: Vec<TimerSnapshot> = self
            .entries
            .iter()
            .filter(|e| e.remaining > 0)
            .map(TimerEntry::snapshot)
            .collect();
        // Stable sort keeps insertion order for equal remaining times
        active.sort_by_key(|t| t.remaining_seconds);
        active
    }

    /// Advance every running timer by one second
    ///
    /// Returns the keys of timers that reached zero on this tick.
    pub fn tick(&mut self) -> Vec<TimerKey> {
        for entry in self.entries.iter_mut().filter(|e| e.running) {
            entry.remaining = entry.remaining.saturating_sub(1);
        }

        let mut finished = Vec::new();
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.running && e.remaining == 0)
        {
            entry.running = false;
            finished.push(entry.key);
        }

        if !finished.is_empty() {
            tracing::info!("{} timer(s) finished", finished.len());
        }
        finished
    }
}
