//! Cooking engine integration tests.
//!
//! Drives the engine end to end with in-memory capabilities: a synthesizer
//! that records what it was asked to say, a recogniser and wake lock that
//! count acquisitions, and a recorder that forwards completions to a channel.

use cookalong::completion::{CompletionRecord, CompletionRecorder};
use cookalong::handsfree::{HandsFreeState, TransitionReason};
use cookalong::recognition::{
    ListeningMode, RecognitionError, RecognitionFault, SpeechRecognizer,
};
use cookalong::scheduler::TimerKey;
use cookalong::session::{CompletionOutcome, StepMove};
use cookalong::speech::{SpeechError, SpeechSynthesizer, Utterance, VoiceInfo};
use cookalong::wake_lock::{WakeLockError, WakeLockProvider};
use cookalong::{
    Capabilities, Capability, CommandOutcome, Config, CookingEngine, EngineError, EngineEvent,
    PhraseTable, Recipe, Step,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Mock capabilities
// =============================================================================

#[derive(Default)]
struct RecordingSynth {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSynth {
    fn count(&self) -> usize {
        self.spoken.lock().len()
    }

    fn last(&self) -> String {
        self.spoken.lock().last().cloned().unwrap_or_default()
    }
}

impl SpeechSynthesizer for RecordingSynth {
    fn voices(&self) -> Vec<VoiceInfo> {
        vec![VoiceInfo {
            name: "Amélie".to_string(),
            language: "fr-CA".to_string(),
        }]
    }

    fn speak(&self, utterance: Utterance, _cancel: CancellationToken) -> Result<(), SpeechError> {
        self.spoken.lock().push(utterance.text);
        Ok(())
    }
}

#[derive(Default)]
struct CountingRecognizer {
    starts: AtomicU32,
    stops: AtomicU32,
    fail: AtomicBool,
}

impl SpeechRecognizer for CountingRecognizer {
    fn start(&self) -> Result<(), RecognitionError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RecognitionError::StartFailed("microphone busy".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FlagLock {
    held: AtomicBool,
}

impl WakeLockProvider for FlagLock {
    fn acquire(&self) -> Result<(), WakeLockError> {
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

struct ChannelRecorder {
    tx: Sender<CompletionRecord>,
}

impl CompletionRecorder for ChannelRecorder {
    fn record(&self, record: &CompletionRecord) -> anyhow::Result<()> {
        self.tx.send(record.clone())?;
        Ok(())
    }
}

struct Harness {
    engine: CookingEngine,
    events: Receiver<EngineEvent>,
    synth: Arc<RecordingSynth>,
    recognizer: Arc<CountingRecognizer>,
    lock: Arc<FlagLock>,
}

fn harness() -> Harness {
    let synth = Arc::new(RecordingSynth::default());
    let recognizer = Arc::new(CountingRecognizer::default());
    let lock = Arc::new(FlagLock::default());
    let capabilities = Capabilities::none()
        .with_synthesizer(synth.clone())
        .with_recognizer(recognizer.clone())
        .with_wake_lock(lock.clone());
    let (engine, events) =
        CookingEngine::new(&Config::default(), PhraseTable::french(), capabilities);
    Harness {
        engine,
        events,
        synth,
        recognizer,
        lock,
    }
}

fn tarte() -> Recipe {
    Recipe::new(
        "tarte",
        "Tarte aux pommes",
        vec![
            Step::new("Étaler la pâte"),
            Step::new("Précuire 10 minutes"),
            Step::with_duration("Cuire la tarte", "35 minutes"),
        ],
    )
}

fn soupe() -> Recipe {
    Recipe::new(
        "soupe",
        "Soupe de légumes",
        vec![
            Step::new("Éplucher les légumes"),
            Step::new("Mijoter à feu doux pendant 3 heures"),
        ],
    )
}

fn drain(events: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
    events.try_iter().collect()
}

// =============================================================================
// Timer Tests
// =============================================================================

#[test]
fn test_simultaneous_completions_are_spoken_once() {
    let mut h = harness();
    let tarte = h.engine.open_session(tarte()).unwrap();
    let soupe = h.engine.open_session(soupe()).unwrap();
    h.engine.start_timer(tarte, 1, 2).unwrap();
    h.engine.start_timer(soupe, 1, 2).unwrap();
    drain(&h.events);

    assert!(h.engine.tick().is_empty());
    let spoken_before = h.synth.count();
    let finished = h.engine.tick();

    assert_eq!(finished.len(), 2);
    assert_eq!(h.synth.count(), spoken_before + 1);
    let utterance = h.synth.last();
    assert!(utterance.contains("étape 2 de Tarte aux pommes"));
    assert!(utterance.contains("étape 2 de Soupe de légumes"));

    let timer_events = drain(&h.events)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::TimerFinished { .. }))
        .count();
    assert_eq!(timer_events, 2);
    assert_eq!(h.engine.visible_alerts().len(), 2);
}

#[test]
fn test_pause_all_and_resume_all_cover_every_timer() {
    let mut h = harness();
    let tarte = h.engine.open_session(tarte()).unwrap();
    let soupe = h.engine.open_session(soupe()).unwrap();
    h.engine.start_timer(tarte, 0, 1).unwrap();
    h.engine.start_timer(soupe, 1, 30).unwrap();
    let oven = h.engine.create_global_timer("Four", "préchauffage", 60).unwrap();

    h.engine.tick();
    let finished_key = TimerKey::step(tarte, 0);
    assert!(!h.engine.timer(&finished_key).unwrap().running);

    h.engine.pause_all();
    h.engine.tick();
    assert!(h.engine.active_timers().iter().all(|t| !t.running));
    assert_eq!(
        h.engine
            .timer(&TimerKey::Global { id: oven })
            .unwrap()
            .remaining_seconds,
        59
    );

    h.engine.resume_all();
    assert!(!h.engine.timer(&finished_key).unwrap().running);
    let running: Vec<_> = h.engine.active_timers();
    assert_eq!(running.len(), 2);
    assert!(running.iter().all(|t| t.running));
}

#[test]
fn test_active_timers_sorted_by_remaining() {
    let mut h = harness();
    let tarte = h.engine.open_session(tarte()).unwrap();
    h.engine.start_timer(tarte, 2, 300).unwrap();
    h.engine.create_global_timer("Oeufs", "cuisson", 60).unwrap();
    h.engine.start_timer(tarte, 1, 60).unwrap();

    let remaining: Vec<u32> = h
        .engine
        .active_timers()
        .iter()
        .map(|t| t.remaining_seconds)
        .collect();
    assert_eq!(remaining, vec![60, 60, 300]);

    let first = &h.engine.active_timers()[0];
    assert!(first.label.is_some());
}

#[test]
fn test_timer_from_voice_uses_step_duration() {
    let mut h = harness();
    let soupe = h.engine.open_session(soupe()).unwrap();

    h.engine.handle_transcript("suivant").unwrap();
    let outcome = h.engine.handle_transcript("lance le minuteur").unwrap();
    assert!(matches!(outcome, CommandOutcome::Timer(_)));

    let timer = h.engine.timer(&TimerKey::step(soupe, 1)).unwrap();
    assert_eq!(timer.total_seconds, 10_800);
    assert_eq!(h.synth.last(), "Minuteur lancé pour 3 heures.");

    h.engine.tick();
    let outcome = h.engine.handle_transcript("combien de temps il reste").unwrap();
    assert_eq!(outcome, CommandOutcome::Remaining(Some(10_799)));
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_session_completes_exactly_once() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let capabilities = Capabilities::none().with_recorder(Arc::new(ChannelRecorder { tx }));
    let (mut engine, events) =
        CookingEngine::new(&Config::default(), PhraseTable::french(), capabilities);
    let id = engine.open_session(tarte()).unwrap();

    engine.mark_step_complete(id).unwrap();
    engine.mark_step_complete(id).unwrap();
    let outcome = engine.mark_step_complete(id).unwrap();
    assert_eq!(outcome, CompletionOutcome::Finished { completed: 2 });
    assert_eq!(
        engine.mark_step_complete(id).unwrap(),
        CompletionOutcome::AlreadyFinished
    );

    let completions: Vec<u32> = drain(&events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::SessionCompleted { minutes, .. } => Some(minutes),
            _ => None,
        })
        .collect();
    assert_eq!(completions.len(), 1);
    assert!(completions[0] >= 1);
    assert!((engine.completion_ratio(id).unwrap() - 1.0).abs() < f32::EPSILON);

    let record = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(record.recipe_id, "tarte");
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_commands_target_selected_session() {
    let mut h = harness();
    let tarte = h.engine.open_session(tarte()).unwrap();
    let soupe = h.engine.open_session(soupe()).unwrap();

    h.engine.handle_transcript("étape suivante").unwrap();
    assert_eq!(h.engine.session(soupe).unwrap().current_index(), 1);
    assert_eq!(h.engine.session(tarte).unwrap().current_index(), 0);

    h.engine.select_session(tarte).unwrap();
    h.engine.handle_transcript("suivant").unwrap();
    assert_eq!(h.engine.session(tarte).unwrap().current_index(), 1);

    let outcome = h.engine.dispatch_to(soupe, cookalong::VoiceCommand::Next).unwrap();
    assert_eq!(outcome, CommandOutcome::Step(StepMove::AtLast));
    assert_eq!(h.synth.last(), PhraseTable::french().last_step);
}

// =============================================================================
// Hands-Free Tests
// =============================================================================

#[test]
fn test_hands_free_lifecycle() {
    let mut h = harness();
    let id = h.engine.open_session(tarte()).unwrap();

    let report = h.engine.activate_hands_free().unwrap();
    assert!(report.wake_lock_held);
    assert!(h.lock.held.load(Ordering::SeqCst));
    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 1);
    assert!(h.synth.last().contains("Tarte aux pommes"));

    // Current step is announced after the settle delay
    h.engine.tick();
    h.engine.tick();
    assert!(!h.synth.last().starts_with("Étape"));
    h.engine.tick();
    assert_eq!(h.synth.last(), "Étape 1 sur 3. Étaler la pâte");

    // Moves are narrated in full while hands-free
    h.engine.handle_transcript("suivant").unwrap();
    assert_eq!(h.synth.last(), "Étape 2 sur 3. Précuire 10 minutes");

    // Recognition ended once: restarted
    h.engine.handle_recognition_ended();
    assert_eq!(h.recognizer.starts.load(Ordering::SeqCst), 2);
    assert_eq!(h.engine.hands_free_status().state, HandsFreeState::Active);

    h.engine.deactivate_hands_free().unwrap();
    assert!(!h.lock.held.load(Ordering::SeqCst));
    assert!(!h.engine.hands_free_status().listening);
    assert_eq!(h.synth.last(), PhraseTable::french().hands_free_deactivated);

    // Outside hands-free only the step number is spoken
    h.engine.next_step(id).unwrap();
    assert_eq!(h.synth.last(), "Étape 3");
}

#[test]
fn test_failed_restart_suspends_until_reactivated() {
    let mut h = harness();
    h.engine.open_session(soupe()).unwrap();
    h.engine.activate_hands_free().unwrap();
    drain(&h.events);

    h.recognizer.fail.store(true, Ordering::SeqCst);
    h.engine.handle_recognition_ended();

    let status = h.engine.hands_free_status();
    assert_eq!(status.state, HandsFreeState::Suspended);
    assert!(!status.listening);
    assert!(!h.lock.held.load(Ordering::SeqCst));
    assert_eq!(h.synth.last(), PhraseTable::french().listening_lost);

    let events = drain(&h.events);
    assert!(events.iter().any(|e| matches!(e, EngineEvent::Alert(_))));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::HandsFreeChanged {
            state: HandsFreeState::Suspended,
            ..
        }
    )));

    // No retry loop
    h.engine.handle_recognition_ended();
    assert_eq!(h.engine.hands_free_status().state, HandsFreeState::Suspended);

    h.recognizer.fail.store(false, Ordering::SeqCst);
    let report = h.engine.activate_hands_free().unwrap();
    let transition = report.transition.unwrap();
    assert_eq!(transition.reason, TransitionReason::Reactivation);
    assert!(h.engine.hands_free_status().listening);
}

#[test]
fn test_hard_fault_suspends_soft_fault_does_not() {
    let mut h = harness();
    h.engine.open_session(tarte()).unwrap();
    h.engine.activate_hands_free().unwrap();

    h.engine.handle_recognition_fault(RecognitionFault::NoSpeech);
    assert_eq!(h.engine.hands_free_status().state, HandsFreeState::Active);

    h.engine.handle_recognition_fault(RecognitionFault::NotAllowed);
    assert_eq!(h.engine.hands_free_status().state, HandsFreeState::Suspended);
    assert_eq!(h.recognizer.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_manual_listening_is_busy_during_hands_free() {
    let mut h = harness();
    h.engine.open_session(tarte()).unwrap();

    assert!(h.engine.toggle_manual_listening().unwrap());
    h.engine.activate_hands_free().unwrap();
    assert_eq!(h.recognizer.stops.load(Ordering::SeqCst), 1);

    let result = h.engine.toggle_manual_listening();
    assert!(matches!(
        result,
        Err(EngineError::Recognition(RecognitionError::Busy(
            ListeningMode::HandsFree
        )))
    ));
}

#[test]
fn test_closing_bound_session_turns_hands_free_off() {
    let mut h = harness();
    let id = h.engine.open_session(tarte()).unwrap();
    h.engine.activate_hands_free().unwrap();

    h.engine.close_session(id).unwrap();
    assert_eq!(h.engine.hands_free_status().state, HandsFreeState::Idle);
    assert!(!h.lock.held.load(Ordering::SeqCst));
    assert_eq!(h.recognizer.stops.load(Ordering::SeqCst), 1);
    assert!(h.engine.active_session_id().is_none());
}

#[test]
fn test_dropping_engine_releases_capabilities() {
    let h = harness();
    let Harness {
        mut engine,
        recognizer,
        lock,
        ..
    } = h;
    engine.open_session(tarte()).unwrap();
    engine.activate_hands_free().unwrap();

    drop(engine);
    assert!(!lock.held.load(Ordering::SeqCst));
    assert_eq!(recognizer.stops.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Degraded Capability Tests
// =============================================================================

#[test]
fn test_missing_capabilities_degrade_once() {
    let (mut engine, events) =
        CookingEngine::new(&Config::default(), PhraseTable::french(), Capabilities::none());
    let id = engine.open_session(tarte()).unwrap();

    engine.next_step(id).unwrap();
    engine.next_step(id).unwrap();
    engine.help();
    let report = engine.activate_hands_free().unwrap();
    assert!(report.recognition_degraded);
    assert!(!report.wake_lock_held);
    assert!(engine.toggle_manual_listening().is_err());

    let degraded: Vec<Capability> = drain(&events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::CapabilityDegraded { capability } => Some(capability),
            _ => None,
        })
        .collect();
    assert_eq!(
        degraded,
        vec![Capability::SpeechSynthesis, Capability::SpeechRecognition]
    );

    // Session still works silently
    assert_eq!(engine.session(id).unwrap().current_index(), 2);
    assert_eq!(engine.hands_free_status().state, HandsFreeState::Active);
}

#[test]
fn test_speech_disabled_is_silent_not_degraded() {
    let mut config = Config::default();
    config.speech.enabled = false;
    let synth = Arc::new(RecordingSynth::default());
    let (mut engine, events) = CookingEngine::new(
        &config,
        PhraseTable::french(),
        Capabilities::none().with_synthesizer(synth.clone()),
    );
    let id = engine.open_session(tarte()).unwrap();
    engine.next_step(id).unwrap();

    assert_eq!(synth.count(), 0);
    assert!(!drain(&events)
        .iter()
        .any(|e| matches!(e, EngineEvent::CapabilityDegraded { .. })));
}

#[test]
fn test_english_phrases() {
    let synth = Arc::new(RecordingSynth::default());
    let (mut engine, _events) = CookingEngine::new(
        &Config::default(),
        PhraseTable::english(),
        Capabilities::none().with_synthesizer(synth.clone()),
    );
    engine.open_session(soupe()).unwrap();

    assert_eq!(
        engine.handle_transcript("ok go on").unwrap(),
        CommandOutcome::Step(StepMove::Moved { index: 1 })
    );
    assert_eq!(synth.last(), "Step 2");
}
