//! Engine notifications
//!
//! Everything the engine wants the outside world to know is sent as an
//! [`EngineEvent`] on a crossbeam channel. Consumers may drop the receiver;
//! the engine keeps working without it.

use crate::alerts::Alert;
use crate::handsfree::{HandsFreeState, TransitionReason};
use crate::scheduler::{TimerKey, TimerLabel};
use crate::session::SessionId;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// A platform capability the engine can run without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SpeechSynthesis,
    SpeechRecognition,
}

/// Notification emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionOpened {
        session: SessionId,
        recipe_id: String,
    },
    SessionClosed {
        session: SessionId,
    },
    /// The current step of a session changed
    StepChanged {
        session: SessionId,
        step: usize,
    },
    /// A countdown reached zero
    TimerFinished {
        key: TimerKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<TimerLabel>,
    },
    /// The last step was completed; fires once per session
    SessionCompleted {
        session: SessionId,
        recipe_id: String,
        minutes: u32,
    },
    Alert(Alert),
    /// A capability is missing; fires once per capability
    CapabilityDegraded {
        capability: Capability,
    },
    HandsFreeChanged {
        previous: HandsFreeState,
        state: HandsFreeState,
        reason: TransitionReason,
    },
}

/// Sending half of the event stream
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<EngineEvent>,
}

impl EventSink {
    /// Create an unbounded event channel
    pub fn channel() -> (Self, Receiver<EngineEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        tracing::debug!("Engine event: {:?}", event);
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}
