//! Spoken feedback arbitration
//!
//! A single-slot mailbox in front of the platform speech synthesizer. Each
//! new utterance cancels the one in flight (barge-in) through its
//! [`CancellationToken`] before being dispatched, so at most one utterance
//! is ever active. Without a synthesizer the arbiter goes silent and reports
//! the degradation once.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Speaking rate used unless configured otherwise (slightly slower than normal)
pub const DEFAULT_SPEECH_RATE: f32 = 0.9;

/// Name words suggesting a female synthetic voice
const FEMALE_VOICE_HINTS: &[&str] = &[
    "female", "femme", "woman", "amélie", "amelie", "audrey", "aurélie", "aurelie", "marie",
    "julie", "virginie", "hortense", "denise", "céline", "celine", "samantha", "victoria",
    "karen", "zira", "susan", "moira", "tessa",
];

/// Name words suggesting a male synthetic voice
const MALE_VOICE_HINTS: &[&str] = &[
    "male", "homme", "thomas", "nicolas", "henri", "paul", "claude", "jacques", "daniel",
    "david", "mark", "alex", "fred", "george", "guy", "rishi",
];

/// Persisted voice gender preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoicePreference {
    #[default]
    Female,
    Male,
    /// No preference; first voice in the target language
    Any,
}

impl VoicePreference {
    /// Pitch multiplier for this preference
    pub fn pitch(&self) -> f32 {
        match self {
            VoicePreference::Female => 1.1,
            VoicePreference::Male => 0.9,
            VoicePreference::Any => 1.0,
        }
    }

    fn hints(&self) -> &'static [&'static str] {
        match self {
            VoicePreference::Female => FEMALE_VOICE_HINTS,
            VoicePreference::Male => MALE_VOICE_HINTS,
            VoicePreference::Any => &[],
        }
    }
}

/// A synthetic voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    /// Language tag, e.g. "fr-FR"
    pub language: String,
}

/// One unit of synthesised speech
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    /// Selected voice; `None` lets the platform pick its default
    pub voice: Option<VoiceInfo>,
    pub language: String,
    pub pitch: f32,
    pub rate: f32,
}

/// Speech synthesis error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech synthesis is not available")]
    Unavailable,

    #[error("Speech synthesis failed: {0}")]
    Failed(String),
}

/// Platform speech synthesis capability
///
/// `speak` must start playback and return without waiting for it to finish.
/// Implementations watch the token to stop early and report completion via
/// the engine's `handle_utterance_finished`.
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices available on this platform
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Begin speaking an utterance
    fn speak(&self, utterance: Utterance, cancel: CancellationToken) -> Result<(), SpeechError>;

    /// Stop whatever is queued or playing
    fn stop(&self) {}
}

/// Result of asking the arbiter to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechDispatch {
    /// The utterance is now the active one
    Started(u64),
    /// Speech is disabled or already known to be degraded
    Silent,
    /// Synthesis is unavailable; returned only the first time
    Degraded,
}

/// The utterance currently holding the slot
#[derive(Debug)]
struct ActiveUtterance {
    id: u64,
    text: String,
    token: CancellationToken,
}

/// Single-slot, cancel-and-replace speech dispatcher
pub struct SpeechArbiter {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    preference: VoicePreference,
    language: String,
    rate: f32,
    enabled: bool,
    slot: Option<ActiveUtterance>,
    next_id: u64,
    degraded: bool,
    degradation_reported: bool,
}

impl SpeechArbiter {
    pub fn new(
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        preference: VoicePreference,
        language: impl Into<String>,
    ) -> Self {
        Self {
            synthesizer,
            preference,
            language: language.into(),
            rate: DEFAULT_SPEECH_RATE,
            enabled: true,
            slot: None,
            next_id: 1,
            degraded: false,
            degradation_reported: false,
        }
    }

    /// Override the speaking rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Enable or disable speech output entirely
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.cancel();
        }
        self.enabled = enabled;
    }

    pub fn set_preference(&mut self, preference: VoicePreference) {
        self.preference = preference;
    }

    pub fn preference(&self) -> VoicePreference {
        self.preference
    }

    /// Whether synthesis has been found unavailable
    pub fn is_degraded(&self) -> bool {
        self.degraded || self.synthesizer.is_none()
    }

    /// Id and text of the active utterance
    pub fn active(&self) -> Option<(u64, &str)> {
        self.slot.as_ref().map(|a| (a.id, a.text.as_str()))
    }

    /// Speak `text`, cancelling any utterance in flight
    pub fn speak(&mut self, text: &str) -> SpeechDispatch {
        if !self.enabled || text.trim().is_empty() {
            return SpeechDispatch::Silent;
        }

        let Some(synthesizer) = self.synthesizer.clone().filter(|_| !self.degraded) else {
            return self.degrade();
        };

        self.cancel();

        let id = self.next_id;
        self.next_id += 1;

        let voices = synthesizer.voices();
        let utterance = Utterance {
            id,
            text: text.to_string(),
            voice: select_voice(&voices, self.preference, &self.language),
            language: self.language.clone(),
            pitch: self.preference.pitch(),
            rate: self.rate,
        };

        let token = CancellationToken::new();
        match synthesizer.speak(utterance, token.clone()) {
            Ok(()) => {
                tracing::debug!("Speaking utterance {}: {}", id, text);
                self.slot = Some(ActiveUtterance {
                    id,
                    text: text.to_string(),
                    token,
                });
                SpeechDispatch::Started(id)
            }
            Err(SpeechError::Unavailable) => {
                self.degraded = true;
                self.degrade()
            }
            Err(e) => {
                tracing::warn!("Failed to speak utterance {}: {}", id, e);
                SpeechDispatch::Silent
            }
        }
    }

    /// Cancel the active utterance, if any
    pub fn cancel(&mut self) {
        if let Some(active) = self.slot.take() {
            active.token.cancel();
            if let Some(synthesizer) = &self.synthesizer {
                synthesizer.stop();
            }
            tracing::debug!("Cancelled utterance {}", active.id);
        }
    }

    /// Release the slot when the synthesizer reports an utterance finished
    ///
    /// Ids other than the active one are stale and ignored.
    pub fn finished(&mut self, id: u64) -> bool {
        if self.slot.as_ref().is_some_and(|a| a.id == id) {
            self.slot = None;
            true
        } else {
            false
        }
    }

    fn degrade(&mut self) -> SpeechDispatch {
        if self.degradation_reported {
            return SpeechDispatch::Silent;
        }
        self.degradation_reported = true;
        tracing::warn!("Speech synthesis unavailable, continuing without spoken feedback");
        SpeechDispatch::Degraded
    }
}

impl Drop for SpeechArbiter {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Whether `voice` belongs to `language`, comparing primary subtags
fn same_language(voice: &VoiceInfo, language: &str) -> bool {
    let primary = |tag: &str| {
        tag.split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    };
    primary(&voice.language) == primary(language)
}

/// Choose a voice for the preference within the target language
///
/// Prefers a voice whose name hints at the requested gender, then the first
/// voice in the language. Returns `None` when no voice speaks the language.
pub fn select_voice(
    voices: &[VoiceInfo],
    preference: VoicePreference,
    language: &str,
) -> Option<VoiceInfo> {
    let in_language: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| same_language(v, language))
        .collect();

    let matches_hint = |voice: &&VoiceInfo| {
        let tokens = name_tokens(&voice.name);
        preference
            .hints()
            .iter()
            .any(|hint| tokens.iter().any(|token| token == hint))
    };

    in_language
        .iter()
        .copied()
        .find(|v| matches_hint(v))
        .or_else(|| in_language.first().copied())
        .cloned()
}

/// Lower-cased name words, split on punctuation and camel case
///
/// "fr-FR-DeniseNeural" yields `fr`, `fr`, `denise`, `neural`.
fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeSynth {
        spoken: Mutex<Vec<(Utterance, CancellationToken)>>,
        stops: Mutex<u32>,
        unavailable: bool,
    }

    impl SpeechSynthesizer for FakeSynth {
        fn voices(&self) -> Vec<VoiceInfo> {
            vec![
                voice("Thomas", "fr-FR"),
                voice("Amélie", "fr-CA"),
                voice("Samantha", "en-US"),
            ]
        }

        fn speak(
            &self,
            utterance: Utterance,
            cancel: CancellationToken,
        ) -> Result<(), SpeechError> {
            if self.unavailable {
                return Err(SpeechError::Unavailable);
            }
            self.spoken.lock().push((utterance, cancel));
            Ok(())
        }

        fn stop(&self) {
            *self.stops.lock() += 1;
        }
    }

    fn voice(name: &str, language: &str) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            language: language.to_string(),
        }
    }

    #[test]
    fn test_barge_in_cancels_previous_utterance() {
        let synth = Arc::new(FakeSynth::default());
        let mut arbiter = SpeechArbiter::new(Some(synth.clone()), VoicePreference::Female, "fr-FR");

        assert_eq!(arbiter.speak("Étape 1"), SpeechDispatch::Started(1));
        assert_eq!(arbiter.speak("Étape 2"), SpeechDispatch::Started(2));

        let spoken = synth.spoken.lock();
        assert!(spoken[0].1.is_cancelled());
        assert!(!spoken[1].1.is_cancelled());
        assert_eq!(*synth.stops.lock(), 1);
        assert_eq!(arbiter.active(), Some((2, "Étape 2")));
    }

    #[test]
    fn test_finished_clears_only_matching_slot() {
        let synth = Arc::new(FakeSynth::default());
        let mut arbiter = SpeechArbiter::new(Some(synth), VoicePreference::Any, "fr-FR");

        arbiter.speak("un");
        arbiter.speak("deux");
        assert!(!arbiter.finished(1));
        assert!(arbiter.active().is_some());
        assert!(arbiter.finished(2));
        assert!(arbiter.active().is_none());
    }

    #[test]
    fn test_missing_synthesizer_degrades_once() {
        let mut arbiter = SpeechArbiter::new(None, VoicePreference::Female, "fr-FR");

        assert_eq!(arbiter.speak("bonjour"), SpeechDispatch::Degraded);
        assert_eq!(arbiter.speak("encore"), SpeechDispatch::Silent);
        assert!(arbiter.is_degraded());
    }

    #[test]
    fn test_unavailable_synthesizer_degrades_once() {
        let synth = Arc::new(FakeSynth {
            unavailable: true,
            ..Default::default()
        });
        let mut arbiter = SpeechArbiter::new(Some(synth), VoicePreference::Female, "fr-FR");

        assert_eq!(arbiter.speak("bonjour"), SpeechDispatch::Degraded);
        assert_eq!(arbiter.speak("encore"), SpeechDispatch::Silent);
        assert!(arbiter.active().is_none());
    }

    #[test]
    fn test_disabled_speech_is_silent_not_degraded() {
        let synth = Arc::new(FakeSynth::default());
        let mut arbiter = SpeechArbiter::new(Some(synth.clone()), VoicePreference::Female, "fr-FR");
        arbiter.set_enabled(false);

        assert_eq!(arbiter.speak("bonjour"), SpeechDispatch::Silent);
        assert!(!arbiter.is_degraded());
        assert!(synth.spoken.lock().is_empty());
    }

    #[test]
    fn test_utterance_carries_voice_pitch_and_rate() {
        let synth = Arc::new(FakeSynth::default());
        let mut arbiter = SpeechArbiter::new(Some(synth.clone()), VoicePreference::Male, "fr-FR")
            .with_rate(0.8);

        arbiter.speak("Étape 1");

        let spoken = synth.spoken.lock();
        let utterance = &spoken[0].0;
        assert_eq!(utterance.voice.as_ref().unwrap().name, "Thomas");
        assert_eq!(utterance.pitch, 0.9);
        assert_eq!(utterance.rate, 0.8);
        assert_eq!(utterance.language, "fr-FR");
    }

    #[test]
    fn test_select_voice_by_hint_then_language() {
        let voices = vec![
            voice("Thomas", "fr-FR"),
            voice("Amélie", "fr-CA"),
            voice("Microsoft Zira", "en-US"),
        ];

        let female = select_voice(&voices, VoicePreference::Female, "fr-FR").unwrap();
        assert_eq!(female.name, "Amélie");

        let male = select_voice(&voices, VoicePreference::Male, "fr-FR").unwrap();
        assert_eq!(male.name, "Thomas");

        let any = select_voice(&voices, VoicePreference::Any, "fr").unwrap();
        assert_eq!(any.name, "Thomas");

        // No male hint in English: first English voice
        let fallback = select_voice(&voices, VoicePreference::Male, "en-GB").unwrap();
        assert_eq!(fallback.name, "Microsoft Zira");

        assert!(select_voice(&voices, VoicePreference::Female, "de-DE").is_none());
    }

    #[test]
    fn test_female_voice_is_not_taken_as_male() {
        let voices = vec![voice("Google female", "fr-FR"), voice("Google male", "fr-FR")];
        let male = select_voice(&voices, VoicePreference::Male, "fr-FR").unwrap();
        assert_eq!(male.name, "Google male");
    }

    #[test]
    fn test_hints_match_whole_name_words() {
        let voices = vec![
            voice("Alexandra", "fr-FR"),
            voice("Paulina", "fr-FR"),
            voice("Alex", "fr-FR"),
        ];
        let male = select_voice(&voices, VoicePreference::Male, "fr-FR").unwrap();
        assert_eq!(male.name, "Alex");

        let neural = vec![
            voice("fr-FR-HenriNeural", "fr-FR"),
            voice("fr-FR-DeniseNeural", "fr-FR"),
        ];
        let female = select_voice(&neural, VoicePreference::Female, "fr-FR").unwrap();
        assert_eq!(female.name, "fr-FR-DeniseNeural");
    }

    #[test]
    fn test_name_tokens() {
        assert_eq!(
            name_tokens("Microsoft Zira - English"),
            vec!["microsoft", "zira", "english"]
        );
        assert_eq!(name_tokens("fr-FR-DeniseNeural"), vec!["fr", "fr", "denise", "neural"]);
        assert_eq!(name_tokens("Amélie"), vec!["amélie"]);
    }

    #[test]
    fn test_pitch_per_preference() {
        assert_eq!(VoicePreference::Female.pitch(), 1.1);
        assert_eq!(VoicePreference::Male.pitch(), 0.9);
        assert_eq!(VoicePreference::Any.pitch(), 1.0);
    }
}
