//! Cookalong - voice-guided cooking sessions
//!
//! Runs one or many step-by-step cooking sessions with parallel countdown
//! timers, turns spoken transcripts into session commands, arbitrates spoken
//! feedback and manages hands-free mode. Speech synthesis, recognition, the
//! screen wake lock and cooking history are reached through traits supplied
//! by the host application.

pub mod alerts;
pub mod command;
pub mod completion;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod events;
pub mod handsfree;
pub mod logging;
pub mod phrases;
pub mod recipe;
pub mod recognition;
pub mod scheduler;
pub mod session;
pub mod speech;
pub mod ticker;
pub mod wake_lock;

pub use command::VoiceCommand;
pub use config::Config;
pub use engine::{Capabilities, CommandOutcome, CookingEngine, TimerFeedback};
pub use error::EngineError;
pub use events::{Capability, EngineEvent};
pub use phrases::PhraseTable;
pub use recipe::{Recipe, Step};
pub use session::SessionId;
