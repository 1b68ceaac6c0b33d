//! Hands-free cooking mode
//!
//! Continuous voice control of one cooking session plus a display-awake
//! guarantee. The user activates the mode; every transcript is then routed
//! through the command interpreter and the current step is narrated.
//!
//! ## States
//!
//! 1. **IDLE** - Not listening
//! 2. **ACTIVE** - Recognition running, wake lock held, session bound
//! 3. **SUSPENDED** - Listening was lost and the user must reactivate
//!
//! ## State Transitions
//!
//! ```text
//!              activate                 lost / fault
//! ┌──────┐ ─────────────────► ┌────────┐ ─────────────► ┌───────────┐
//! │ IDLE │                    │ ACTIVE │                │ SUSPENDED │
//! └──────┘ ◄───────────────── └────────┘ ◄───────────── └───────────┘
//!    ▲     deactivate / closed              activate          │
//!    │                                                        │
//!    └────────────────────────────────────────────────────────┘
//!                       deactivate / closed
//! ```
//!
//! When recognition ends on its own while active, one restart is attempted.
//! If that fails the mode is suspended; there is no retry loop.

pub mod controller;
pub mod state;

pub use controller::{ActivationReport, HandsFreeController, HandsFreeStatus, RecognitionEnd};
pub use state::{HandsFreeEvent, HandsFreeState, TransitionReason, TransitionResult};
