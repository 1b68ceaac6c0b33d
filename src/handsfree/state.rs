//! Hands-free mode state machine
//!
//! Defines the states and transitions for hands-free cooking. The machine is
//! pure: it does not touch recognition or the wake lock, the controller does
//! that in response to the transitions it returns.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Hands-free mode state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandsFreeState {
    /// Not listening
    #[default]
    Idle,
    /// Listening continuously and narrating the bound session
    Active,
    /// Listening was lost and needs manual reactivation
    Suspended,
}

impl HandsFreeState {
    /// Returns a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            HandsFreeState::Idle => "Hands-free mode off",
            HandsFreeState::Active => "Listening for commands",
            HandsFreeState::Suspended => "Listening lost, reactivate to continue",
        }
    }

    /// Returns whether recognition should be running in this state
    pub fn is_listening(&self) -> bool {
        matches!(self, HandsFreeState::Active)
    }

    /// Returns whether the user can activate from this state
    pub fn can_activate(&self) -> bool {
        !matches!(self, HandsFreeState::Active)
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone)]
pub enum HandsFreeEvent {
    /// User turned hands-free mode on
    Activate,
    /// User turned hands-free mode off
    Deactivate,
    /// Recognition ended and could not be restarted
    RecognitionLost { error: String },
    /// Recognition reported an unrecoverable error
    RecognitionFault { error: String },
    /// The bound cooking session was closed
    SessionClosed,
}

/// Reason for entering a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionReason {
    /// Activated from Idle
    UserActivation,
    /// Activated again after listening was lost
    Reactivation,
    UserDeactivation,
    RecognitionLost { message: String },
    RecognitionFault { message: String },
    SessionClosed,
}

/// Result of a state transition
#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// The state before the transition
    pub previous_state: HandsFreeState,
    /// The new state after the transition
    pub new_state: HandsFreeState,
    /// Reason for the transition
    pub reason: TransitionReason,
}

/// Hands-free state machine
pub struct HandsFreeStateMachine {
    state: HandsFreeState,
    state_entered_at: Instant,
}

impl HandsFreeStateMachine {
    /// Creates a new state machine in the Idle state
    pub fn new() -> Self {
        Self {
            state: HandsFreeState::Idle,
            state_entered_at: Instant::now(),
        }
    }

    /// Returns the current state
    pub fn state(&self) -> HandsFreeState {
        self.state
    }

    /// Returns how long the machine has been in the current state
    pub fn time_in_state(&self) -> std::time::Duration {
        self.state_entered_at.elapsed()
    }

    /// Process an event and return the transition result if a transition occurred
    ///
    /// Returns `None` if the event is not valid for the current state.
    pub fn process_event(&mut self, event: HandsFreeEvent) -> Option<TransitionResult> {
        let transition = match (self.state, event) {
            // IDLE
            (HandsFreeState::Idle, HandsFreeEvent::Activate) => {
                Some((HandsFreeState::Active, TransitionReason::UserActivation))
            }

            // ACTIVE
            (HandsFreeState::Active, HandsFreeEvent::Deactivate) => {
                Some((HandsFreeState::Idle, TransitionReason::UserDeactivation))
            }
            (HandsFreeState::Active, HandsFreeEvent::RecognitionLost { error }) => Some((
                HandsFreeState::Suspended,
                TransitionReason::RecognitionLost { message: error },
            )),
            (HandsFreeState::Active, HandsFreeEvent::RecognitionFault { error }) => Some((
                HandsFreeState::Suspended,
                TransitionReason::RecognitionFault { message: error },
            )),
            (HandsFreeState::Active, HandsFreeEvent::SessionClosed) => {
                Some((HandsFreeState::Idle, TransitionReason::SessionClosed))
            }

            // SUSPENDED
            (HandsFreeState::Suspended, HandsFreeEvent::Activate) => {
                Some((HandsFreeState::Active, TransitionReason::Reactivation))
            }
            (HandsFreeState::Suspended, HandsFreeEvent::Deactivate) => {
                Some((HandsFreeState::Idle, TransitionReason::UserDeactivation))
            }
            (HandsFreeState::Suspended, HandsFreeEvent::SessionClosed) => {
                Some((HandsFreeState::Idle, TransitionReason::SessionClosed))
            }

            // Invalid transitions
            _ => None,
        };

        let (new_state, reason) = transition?;
        let result = TransitionResult {
            previous_state: self.state,
            new_state,
            reason,
        };
        self.apply_transition(&result);
        Some(result)
    }

    fn apply_transition(&mut self, result: &TransitionResult) {
        self.state = result.new_state;
        self.state_entered_at = Instant::now();

        tracing::info!(
            "Hands-free state transition: {:?} -> {:?} (reason: {:?})",
            result.previous_state,
            result.new_state,
            result.reason
        );
    }

    /// Reset the state machine to Idle
    pub fn reset(&mut self) {
        self.state = HandsFreeState::Idle;
        self.state_entered_at = Instant::now();
        tracing::info!("Hands-free state machine reset to Idle");
    }
}

impl Default for HandsFreeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
