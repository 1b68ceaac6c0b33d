//! Speech recognition channel
//!
//! The platform recogniser is a singleton: hands-free mode and the manual
//! listening toggle both need it, but only one may hold it at a time. The
//! channel tracks the holder, makes re-acquisition by the holder a no-op and
//! stops recognition when it is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Who is holding the recognition channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningMode {
    /// Continuous recognition driven by hands-free mode
    HandsFree,
    /// One-off listening toggled by the user
    Manual,
}

impl fmt::Display for ListeningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListeningMode::HandsFree => write!(f, "hands-free"),
            ListeningMode::Manual => write!(f, "manual"),
        }
    }
}

/// Recognition error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    #[error("Speech recognition is not available")]
    Unavailable,

    #[error("Speech recognition is already held by {0} listening")]
    Busy(ListeningMode),

    #[error("Failed to start speech recognition: {0}")]
    StartFailed(String),
}

/// Error reported by the recogniser while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFault {
    /// Nothing was said before the recogniser gave up
    NoSpeech,
    /// Microphone permission refused
    NotAllowed,
    Network(String),
    Other(String),
}

impl RecognitionFault {
    /// Whether listening must stop until the user reactivates it
    pub fn is_hard(&self) -> bool {
        !matches!(self, RecognitionFault::NoSpeech)
    }
}

impl fmt::Display for RecognitionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionFault::NoSpeech => write!(f, "no speech"),
            RecognitionFault::NotAllowed => write!(f, "microphone not allowed"),
            RecognitionFault::Network(e) => write!(f, "network error: {}", e),
            RecognitionFault::Other(e) => write!(f, "{}", e),
        }
    }
}

/// Platform speech recognition capability
///
/// Transcripts and end-of-recognition notices flow back through the
/// engine's `handle_transcript`, `handle_recognition_ended` and
/// `handle_recognition_fault`.
pub trait SpeechRecognizer: Send + Sync {
    /// Begin continuous recognition
    fn start(&self) -> Result<(), RecognitionError>;

    /// Stop recognition
    fn stop(&self);
}

/// Outcome of an acquire request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Started,
    AlreadyHeld,
}

/// Singleton recognition resource
pub struct RecognitionChannel {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    holder: Option<ListeningMode>,
    degradation_reported: bool,
}

impl RecognitionChannel {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            holder: None,
            degradation_reported: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn holder(&self) -> Option<ListeningMode> {
        self.holder
    }

    pub fn is_held_by(&self, mode: ListeningMode) -> bool {
        self.holder == Some(mode)
    }

    /// Start recognition on behalf of `mode`
    pub fn acquire(&mut self, mode: ListeningMode) -> Result<Acquired, RecognitionError> {
        match self.holder {
            Some(holder) if holder == mode => return Ok(Acquired::AlreadyHeld),
            Some(holder) => return Err(RecognitionError::Busy(holder)),
            None => {}
        }

        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(RecognitionError::Unavailable)?;
        recognizer.start()?;
        self.holder = Some(mode);
        tracing::info!("Speech recognition started ({})", mode);
        Ok(Acquired::Started)
    }

    /// Start again after the recogniser ended on its own
    pub fn restart(&mut self, mode: ListeningMode) -> Result<(), RecognitionError> {
        if let Some(holder) = self.holder.filter(|h| *h != mode) {
            return Err(RecognitionError::Busy(holder));
        }

        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(RecognitionError::Unavailable)?;
        match recognizer.start() {
            Ok(()) => {
                self.holder = Some(mode);
                tracing::debug!("Speech recognition restarted ({})", mode);
                Ok(())
            }
            Err(e) => {
                self.holder = None;
                Err(e)
            }
        }
    }

    /// Stop recognition if `mode` holds it
    pub fn release(&mut self, mode: ListeningMode) -> bool {
        if self.holder != Some(mode) {
            return false;
        }
        if let Some(recognizer) = &self.recognizer {
            recognizer.stop();
        }
        self.holder = None;
        tracing::info!("Speech recognition stopped ({})", mode);
        true
    }

    /// True the first time recognition is found missing
    pub fn take_degradation_report(&mut self) -> bool {
        if self.degradation_reported {
            return false;
        }
        self.degradation_reported = true;
        true
    }
}

impl Drop for RecognitionChannel {
    fn drop(&mut self) {
        if let Some(mode) = self.holder {
            self.release(mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct FakeRecognizer {
        starts: AtomicU32,
        stops: AtomicU32,
        fail: AtomicBool,
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&self) -> Result<(), RecognitionError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RecognitionError::StartFailed("busy microphone".to_string()));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_reacquire_by_holder_is_noop() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let mut channel = RecognitionChannel::new(Some(recognizer.clone()));

        assert_eq!(channel.acquire(ListeningMode::HandsFree), Ok(Acquired::Started));
        assert_eq!(
            channel.acquire(ListeningMode::HandsFree),
            Ok(Acquired::AlreadyHeld)
        );
        assert_eq!(recognizer.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_holder_is_refused() {
        let mut channel = RecognitionChannel::new(Some(Arc::new(FakeRecognizer::default())));
        channel.acquire(ListeningMode::HandsFree).unwrap();
        assert_eq!(
            channel.acquire(ListeningMode::Manual),
            Err(RecognitionError::Busy(ListeningMode::HandsFree))
        );
    }

    #[test]
    fn test_missing_recognizer() {
        let mut channel = RecognitionChannel::new(None);
        assert_eq!(
            channel.acquire(ListeningMode::Manual),
            Err(RecognitionError::Unavailable)
        );
        assert!(channel.take_degradation_report());
        assert!(!channel.take_degradation_report());
    }

    #[test]
    fn test_failed_restart_clears_holder() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let mut channel = RecognitionChannel::new(Some(recognizer.clone()));
        channel.acquire(ListeningMode::HandsFree).unwrap();

        recognizer.fail.store(true, Ordering::SeqCst);
        assert!(channel.restart(ListeningMode::HandsFree).is_err());
        assert_eq!(channel.holder(), None);
    }

    #[test]
    fn test_release_only_by_holder() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let mut channel = RecognitionChannel::new(Some(recognizer.clone()));
        channel.acquire(ListeningMode::Manual).unwrap();

        assert!(!channel.release(ListeningMode::HandsFree));
        assert!(channel.release(ListeningMode::Manual));
        assert_eq!(recognizer.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_recognition() {
        let recognizer = Arc::new(FakeRecognizer::default());
        {
            let mut channel = RecognitionChannel::new(Some(recognizer.clone()));
            channel.acquire(ListeningMode::HandsFree).unwrap();
        }
        assert_eq!(recognizer.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_speech_is_soft() {
        assert!(!RecognitionFault::NoSpeech.is_hard());
        assert!(RecognitionFault::NotAllowed.is_hard());
        assert!(RecognitionFault::Other("aborted".to_string()).is_hard());
    }
}
