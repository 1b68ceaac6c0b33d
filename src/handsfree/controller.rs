//! Hands-free controller
//!
//! Owns the state machine and the wake lock, drives the shared recognition
//! channel, and tracks which cooking session hands-free mode narrates. It
//! never speaks: the engine turns the transitions returned here into
//! spoken confirmations and events.

use super::state::{
    HandsFreeEvent, HandsFreeState, HandsFreeStateMachine, TransitionReason, TransitionResult,
};
use crate::config::HandsFreeConfig;
use crate::recognition::{
    ListeningMode, RecognitionChannel, RecognitionError, RecognitionFault,
};
use crate::session::SessionId;
use crate::wake_lock::WakeLock;
use serde::{Deserialize, Serialize};

/// What happened when hands-free mode was activated
#[derive(Debug, Clone)]
pub struct ActivationReport {
    /// `None` when hands-free was already active and only re-bound
    pub transition: Option<TransitionResult>,
    /// Manual listening was stopped to make room
    pub preempted_manual: bool,
    /// Recognition is missing and this is the first time it was noticed
    pub recognition_degraded: bool,
    pub wake_lock_held: bool,
}

/// Outcome of the recogniser ending on its own
#[derive(Debug, Clone)]
pub enum RecognitionEnd {
    /// Hands-free was not listening
    Ignored,
    Restarted,
    Suspended(TransitionResult),
}

/// Current status of hands-free mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandsFreeStatus {
    pub state: HandsFreeState,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    pub listening: bool,
    pub wake_lock_held: bool,
    pub seconds_in_state: u64,
}

/// Hands-free controller
pub struct HandsFreeController {
    machine: HandsFreeStateMachine,
    wake_lock: WakeLock,
    session: Option<SessionId>,
    /// Ticks left before the current step is announced
    settle_remaining: Option<u32>,
    settle_ticks: u32,
    auto_restart: bool,
    keep_screen_awake: bool,
}

impl HandsFreeController {
    pub fn new(wake_lock: WakeLock, settings: &HandsFreeConfig, tick_interval_ms: u64) -> Self {
        Self {
            machine: HandsFreeStateMachine::new(),
            wake_lock,
            session: None,
            settle_remaining: None,
            settle_ticks: settle_ticks(settings.settle_delay_seconds, tick_interval_ms),
            auto_restart: settings.auto_restart,
            keep_screen_awake: settings.keep_screen_awake,
        }
    }

    pub fn state(&self) -> HandsFreeState {
        self.machine.state()
    }

    /// Session hands-free mode is bound to
    pub fn bound_session(&self) -> Option<SessionId> {
        self.session
    }

    /// Whether step moves in `session` should be narrated in full
    pub fn is_narrating(&self, session: SessionId) -> bool {
        self.machine.state() == HandsFreeState::Active && self.session == Some(session)
    }

    pub fn status(&self, channel: &RecognitionChannel) -> HandsFreeStatus {
        let state = self.machine.state();
        HandsFreeStatus {
            state,
            description: state.description().to_string(),
            session: self.session,
            listening: channel.is_held_by(ListeningMode::HandsFree),
            wake_lock_held: self.wake_lock.is_held(),
            seconds_in_state: self.machine.time_in_state().as_secs(),
        }
    }

    /// Start hands-free mode for `session`
    ///
    /// A missing recogniser does not prevent activation; the mode then only
    /// narrates and keeps the screen awake.
    pub fn activate(
        &mut self,
        session: SessionId,
        channel: &mut RecognitionChannel,
    ) -> Result<ActivationReport, RecognitionError> {
        let preempted_manual = channel.release(ListeningMode::Manual);
        if preempted_manual {
            tracing::info!("Manual listening stopped for hands-free mode");
        }

        let mut recognition_degraded = false;
        match channel.acquire(ListeningMode::HandsFree) {
            Ok(_) => {}
            Err(RecognitionError::Unavailable) => {
                tracing::warn!("Speech recognition unavailable, hands-free will not listen");
                recognition_degraded = channel.take_degradation_report();
            }
            Err(e) => return Err(e),
        }

        if self.keep_screen_awake {
            self.wake_lock.acquire();
        }

        let transition = self.machine.process_event(HandsFreeEvent::Activate);
        if transition.is_none() && self.session != Some(session) {
            tracing::info!("Hands-free mode re-bound to session {}", session);
        }
        self.session = Some(session);
        self.settle_remaining = Some(self.settle_ticks);

        Ok(ActivationReport {
            transition,
            preempted_manual,
            recognition_degraded,
            wake_lock_held: self.wake_lock.is_held(),
        })
    }

    /// Stop hands-free mode and release every capability
    pub fn deactivate(&mut self, channel: &mut RecognitionChannel) -> Option<TransitionResult> {
        let result = self.machine.process_event(HandsFreeEvent::Deactivate)?;
        self.release_all(channel);
        self.session = None;
        Some(result)
    }

    /// Called when the recogniser stopped without being asked to
    pub fn on_recognition_ended(&mut self, channel: &mut RecognitionChannel) -> RecognitionEnd {
        if self.machine.state() != HandsFreeState::Active {
            return RecognitionEnd::Ignored;
        }

        let error = if self.auto_restart {
            match channel.restart(ListeningMode::HandsFree) {
                Ok(()) => return RecognitionEnd::Restarted,
                Err(e) => {
                    tracing::warn!("Failed to restart speech recognition: {}", e);
                    e.to_string()
                }
            }
        } else {
            "recognition ended".to_string()
        };

        self.release_all(channel);
        match self
            .machine
            .process_event(HandsFreeEvent::RecognitionLost { error })
        {
            Some(result) => RecognitionEnd::Suspended(result),
            None => RecognitionEnd::Ignored,
        }
    }

    /// Called when the recogniser reports an error
    pub fn on_recognition_fault(
        &mut self,
        fault: &RecognitionFault,
        channel: &mut RecognitionChannel,
    ) -> Option<TransitionResult> {
        if !fault.is_hard() {
            tracing::debug!("Ignoring soft recognition fault: {}", fault);
            return None;
        }
        if self.machine.state() != HandsFreeState::Active {
            return None;
        }

        tracing::warn!("Speech recognition fault: {}", fault);
        self.release_all(channel);
        self.machine.process_event(HandsFreeEvent::RecognitionFault {
            error: fault.to_string(),
        })
    }

    /// Advance the settle delay; true on the tick the current step is due
    pub fn on_tick(&mut self) -> bool {
        if self.machine.state() != HandsFreeState::Active {
            self.settle_remaining = None;
            return false;
        }
        match self.settle_remaining {
            Some(0) | Some(1) => {
                self.settle_remaining = None;
                true
            }
            Some(n) => {
                self.settle_remaining = Some(n - 1);
                false
            }
            None => false,
        }
    }

    /// Called when a cooking session is closed
    pub fn session_closed(
        &mut self,
        session: SessionId,
        channel: &mut RecognitionChannel,
    ) -> Option<TransitionResult> {
        if self.session != Some(session) {
            return None;
        }
        self.release_all(channel);
        self.session = None;
        self.machine.process_event(HandsFreeEvent::SessionClosed)
    }

    fn release_all(&mut self, channel: &mut RecognitionChannel) {
        channel.release(ListeningMode::HandsFree);
        self.wake_lock.release();
        self.settle_remaining = None;
    }
}

/// Whether a transition was caused by lost listening
pub fn is_suspension(reason: &TransitionReason) -> bool {
    matches!(
        reason,
        TransitionReason::RecognitionLost { .. } | TransitionReason::RecognitionFault { .. }
    )
}

fn settle_ticks(settle_delay_seconds: u64, tick_interval_ms: u64) -> u32 {
    let tick_ms = tick_interval_ms.max(1);
    let ticks = (settle_delay_seconds.saturating_mul(1000)).div_ceil(tick_ms);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}
