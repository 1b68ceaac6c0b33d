//! Multi-recipe cooking orchestrator
//!
//! [`CookingEngine`] owns every open cooking session, the shared timer
//! registry, the speech arbiter, the alert centre, the recognition channel
//! and the hands-free controller. All state changes go through its methods;
//! the countdown only moves when [`CookingEngine::tick`] is called.
//!
//! Voice commands target the active session: the one most recently opened
//! or selected, or the session hands-free mode is bound to.

use chrono::Utc;
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::{Alert, AlertCenter};
use crate::command::{CommandInterpreter, VoiceCommand};
use crate::completion::{record_in_background, CompletionRecord, CompletionRecorder};
use crate::config::Config;
use crate::error::EngineError;
use crate::events::{Capability, EngineEvent, EventSink};
use crate::handsfree::{
    ActivationReport, HandsFreeController, HandsFreeState, HandsFreeStatus, RecognitionEnd,
    TransitionResult,
};
use crate::phrases::PhraseTable;
use crate::recipe::Recipe;
use crate::recognition::{
    ListeningMode, RecognitionChannel, RecognitionError, RecognitionFault, SpeechRecognizer,
};
use crate::scheduler::{
    StartOutcome, StartPolicy, TimerId, TimerKey, TimerScheduler, TimerSnapshot,
};
use crate::session::{CompletionOutcome, CookingSession, SessionId, SessionSummary, StepMove};
use crate::speech::{SpeechArbiter, SpeechDispatch, SpeechSynthesizer, VoicePreference};
use crate::wake_lock::{WakeLock, WakeLockProvider};

/// Optional platform capabilities handed to the engine
#[derive(Clone, Default)]
pub struct Capabilities {
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    pub wake_lock: Option<Arc<dyn WakeLockProvider>>,
    pub recorder: Option<Arc<dyn CompletionRecorder>>,
}

impl Capabilities {
    /// No capabilities at all; the engine runs silent and deaf
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_wake_lock(mut self, wake_lock: Arc<dyn WakeLockProvider>) -> Self {
        self.wake_lock = Some(wake_lock);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CompletionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

/// Result of a timer request on the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerFeedback {
    Started(StartOutcome),
    Paused,
    Resumed,
    /// The step timer already reached zero
    AlreadyFinished,
    /// The step text carries no duration; nothing changed
    NoDuration,
    /// The step has no timer yet
    NoTimer,
}

/// What a dispatched command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Step(StepMove),
    Completion(CompletionOutcome),
    Timer(TimerFeedback),
    /// The current step was read out
    Announced,
    /// Seconds left on the current step timer, if there is one
    Remaining(Option<u32>),
    Help,
    NotUnderstood,
}

/// Cooking sessions, timers and voice control
pub struct CookingEngine {
    sessions: Vec<CookingSession>,
    active: Option<SessionId>,
    scheduler: TimerScheduler,
    hands_free: HandsFreeController,
    recognition: RecognitionChannel,
    arbiter: SpeechArbiter,
    alerts: AlertCenter,
    interpreter: CommandInterpreter,
    phrases: Arc<PhraseTable>,
    recorder: Option<Arc<dyn CompletionRecorder>>,
    events: EventSink,
}

impl CookingEngine {
    /// Build an engine and the receiving end of its event stream
    pub fn new(
        config: &Config,
        phrases: PhraseTable,
        capabilities: Capabilities,
    ) -> (Self, Receiver<EngineEvent>) {
        let (events, rx) = EventSink::channel();

        let mut arbiter = SpeechArbiter::new(
            capabilities.synthesizer,
            config.speech.voice_preference,
            phrases.language.clone(),
        )
        .with_rate(config.speech.rate);
        arbiter.set_enabled(config.speech.enabled);

        let hands_free = HandsFreeController::new(
            WakeLock::new(capabilities.wake_lock),
            &config.hands_free,
            config.timers.tick_interval_ms,
        );

        let engine = Self {
            sessions: Vec::new(),
            active: None,
            scheduler: TimerScheduler::new(config.timers.start_policy),
            hands_free,
            recognition: RecognitionChannel::new(capabilities.recognizer),
            arbiter,
            alerts: AlertCenter::new(config.timers.alert_display_seconds),
            interpreter: CommandInterpreter::new(phrases.keywords.clone()),
            phrases: Arc::new(phrases),
            recorder: capabilities.recorder,
            events,
        };

        tracing::info!(
            "Cooking engine ready (language: {}, policy: {:?})",
            engine.phrases.language,
            engine.scheduler.policy()
        );
        (engine, rx)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Start cooking `recipe`; the new session becomes the active one
    pub fn open_session(&mut self, recipe: impl Into<Arc<Recipe>>) -> Result<SessionId, EngineError> {
        let session = CookingSession::new(recipe.into())?;
        let id = session.id();
        let recipe_id = session.recipe().id.clone();

        tracing::info!(
            "Opened session {} for {} ({} steps)",
            id,
            recipe_id,
            session.total_steps()
        );
        self.sessions.push(session);
        self.active = Some(id);
        self.events.emit(EngineEvent::SessionOpened {
            session: id,
            recipe_id,
        });
        Ok(id)
    }

    /// Stop cooking a session, dropping its timers
    ///
    /// Hands-free mode bound to it is turned off. The most recently opened
    /// remaining session becomes active.
    pub fn close_session(&mut self, id: SessionId) -> Result<SessionSummary, EngineError> {
        let position = self
            .sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or(EngineError::UnknownSession(id))?;

        if let Some(result) = self.hands_free.session_closed(id, &mut self.recognition) {
            self.emit_hands_free(&result);
        }

        let removed = self.scheduler.delete_session(id);
        let session = self.sessions.remove(position);
        if self.active == Some(id) {
            self.active = self.sessions.last().map(CookingSession::id);
        }

        tracing::info!("Closed session {} ({} timer(s) removed)", id, removed);
        self.events.emit(EngineEvent::SessionClosed { session: id });
        Ok(session.summary())
    }

    /// Make `id` the target of voice commands
    pub fn select_session(&mut self, id: SessionId) -> Result<(), EngineError> {
        self.session_ref(id)?;
        self.active = Some(id);
        tracing::debug!("Active session is now {}", id);
        Ok(())
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn session(&self, id: SessionId) -> Option<&CookingSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    /// Summaries of every open session, in opening order
    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(CookingSession::summary).collect()
    }

    pub fn completion_ratio(&self, id: SessionId) -> Result<f32, EngineError> {
        Ok(self.session_ref(id)?.completion_ratio())
    }

    fn session_ref(&self, id: SessionId) -> Result<&CookingSession, EngineError> {
        self.session(id).ok_or(EngineError::UnknownSession(id))
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut CookingSession, EngineError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(EngineError::UnknownSession(id))
    }

    // =========================================================================
    // Step operations
    // =========================================================================

    pub fn next_step(&mut self, id: SessionId) -> Result<StepMove, EngineError> {
        let step_move = self.session_mut(id)?.next();
        self.report_move(id, step_move);
        Ok(step_move)
    }

    pub fn previous_step(&mut self, id: SessionId) -> Result<StepMove, EngineError> {
        let step_move = self.session_mut(id)?.previous();
        self.report_move(id, step_move);
        Ok(step_move)
    }

    /// Mark the current step done
    ///
    /// Completing the last step finishes the session: the completion is
    /// announced, reported as an event and recorded exactly once.
    pub fn mark_step_complete(&mut self, id: SessionId) -> Result<CompletionOutcome, EngineError> {
        let now = Utc::now();
        let outcome = self.session_mut(id)?.mark_complete_at(now);

        match outcome {
            CompletionOutcome::Advanced { index, .. } => {
                self.report_move(id, StepMove::Moved { index });
            }
            CompletionOutcome::Finished { .. } => self.finish_session(id, now)?,
            CompletionOutcome::AlreadyFinished => {
                tracing::debug!("Session {} already finished", id);
            }
        }
        Ok(outcome)
    }

    fn finish_session(&mut self, id: SessionId, now: chrono::DateTime<Utc>) -> Result<(), EngineError> {
        let session = self.session_ref(id)?;
        let minutes = session.elapsed_minutes(now);
        let recipe = session.recipe();
        let record = CompletionRecord {
            session: id,
            recipe_id: recipe.id.clone(),
            recipe_title: recipe.title.clone(),
            started_at: session.started(),
            finished_at: session.finished().unwrap_or(now),
            duration_minutes: minutes,
        };

        tracing::info!("Session {} finished in {} min", id, minutes);
        self.events.emit(EngineEvent::SessionCompleted {
            session: id,
            recipe_id: record.recipe_id.clone(),
            minutes,
        });

        let phrases = Arc::clone(&self.phrases);
        let text = PhraseTable::render(
            &phrases.session_completed,
            &[
                ("recipe", record.recipe_title.as_str()),
                ("minutes", &minutes.to_string()),
            ],
        );
        self.say(&text);

        if let Some(recorder) = &self.recorder {
            record_in_background(Arc::clone(recorder), record);
        }
        Ok(())
    }

    /// Start (or restart) the countdown for the current step
    pub fn start_current_timer(&mut self, id: SessionId) -> Result<TimerFeedback, EngineError> {
        let Some((key, seconds)) = self.current_timer(id)? else {
            return Ok(self.no_duration());
        };

        let outcome = self.scheduler.start_timer(key, seconds)?;
        let phrases = Arc::clone(&self.phrases);
        let text = match outcome {
            StartOutcome::Resumed => phrases.timer_resumed.clone(),
            StartOutcome::Started | StartOutcome::Restarted => PhraseTable::render(
                &phrases.timer_started,
                &[("duration", &phrases.spoken_duration(seconds))],
            ),
        };
        self.say(&text);
        Ok(TimerFeedback::Started(outcome))
    }

    pub fn pause_current_timer(&mut self, id: SessionId) -> Result<TimerFeedback, EngineError> {
        let Some((key, _)) = self.current_timer(id)? else {
            return Ok(self.no_duration());
        };
        let phrases = Arc::clone(&self.phrases);

        if self.scheduler.get(&key).is_none() {
            self.say(&phrases.no_timer);
            return Ok(TimerFeedback::NoTimer);
        }
        self.scheduler.pause(&key)?;
        self.say(&phrases.timer_paused);
        Ok(TimerFeedback::Paused)
    }

    pub fn resume_current_timer(&mut self, id: SessionId) -> Result<TimerFeedback, EngineError> {
        let Some((key, _)) = self.current_timer(id)? else {
            return Ok(self.no_duration());
        };
        let phrases = Arc::clone(&self.phrases);

        if self.scheduler.get(&key).is_none() {
            self.say(&phrases.no_timer);
            return Ok(TimerFeedback::NoTimer);
        }
        if self.scheduler.resume(&key)? {
            self.say(&phrases.timer_resumed);
            Ok(TimerFeedback::Resumed)
        } else {
            let text = PhraseTable::render(
                &phrases.time_remaining,
                &[("duration", &phrases.spoken_duration(0))],
            );
            self.say(&text);
            Ok(TimerFeedback::AlreadyFinished)
        }
    }

    /// Timer key and parsed duration of the current step
    fn current_timer(&self, id: SessionId) -> Result<Option<(TimerKey, u32)>, EngineError> {
        let session = self.session_ref(id)?;
        let key = TimerKey::step(id, session.current_index());
        Ok(session.current_duration_seconds().map(|s| (key, s)))
    }

    fn no_duration(&mut self) -> TimerFeedback {
        let phrases = Arc::clone(&self.phrases);
        self.say(&phrases.no_duration);
        self.raise_alert(&phrases.no_duration);
        TimerFeedback::NoDuration
    }

    /// Read out the current step; returns the text spoken
    pub fn announce_current_step(&mut self, id: SessionId) -> Result<String, EngineError> {
        let text = announcement(&self.phrases, self.session_ref(id)?);
        self.say(&text);
        Ok(text)
    }

    /// Speak the time left on the current step timer
    pub fn query_remaining(&mut self, id: SessionId) -> Result<Option<u32>, EngineError> {
        let session = self.session_ref(id)?;
        let key = TimerKey::step(id, session.current_index());
        let remaining = self.scheduler.get(&key).map(|t| t.remaining_seconds);

        let phrases = Arc::clone(&self.phrases);
        let text = match remaining {
            Some(seconds) => PhraseTable::render(
                &phrases.time_remaining,
                &[("duration", &phrases.spoken_duration(seconds))],
            ),
            None => phrases.no_timer.clone(),
        };
        self.say(&text);
        Ok(remaining)
    }

    /// Speak the list of commands
    pub fn help(&mut self) {
        let phrases = Arc::clone(&self.phrases);
        self.say(&phrases.help);
    }

    fn report_move(&mut self, id: SessionId, step_move: StepMove) {
        let phrases = Arc::clone(&self.phrases);
        match step_move {
            StepMove::Moved { index } => {
                self.events
                    .emit(EngineEvent::StepChanged { session: id, step: index });
                let text = match self.session(id) {
                    Some(session) if self.hands_free.is_narrating(id) => {
                        announcement(&phrases, session)
                    }
                    _ => PhraseTable::render(
                        &phrases.step_number,
                        &[("number", &(index + 1).to_string())],
                    ),
                };
                self.say(&text);
            }
            StepMove::AtFirst => {
                self.say(&phrases.first_step);
            }
            StepMove::AtLast => {
                self.say(&phrases.last_step);
            }
        }
    }

    // =========================================================================
    // Voice commands
    // =========================================================================

    pub fn interpret(&self, transcript: &str) -> VoiceCommand {
        self.interpreter.interpret(transcript)
    }

    /// Apply a command to the active session
    pub fn dispatch(&mut self, command: VoiceCommand) -> Result<CommandOutcome, EngineError> {
        match command {
            VoiceCommand::Help | VoiceCommand::Unrecognized(_) => {
                self.dispatch_sessionless(&command)
            }
            _ => {
                let id = self.active.ok_or(EngineError::NoActiveSession)?;
                self.dispatch_to(id, command)
            }
        }
    }

    /// Apply a command to a specific session
    pub fn dispatch_to(
        &mut self,
        id: SessionId,
        command: VoiceCommand,
    ) -> Result<CommandOutcome, EngineError> {
        tracing::debug!("Dispatching {} to session {}", command.name(), id);
        self.session_ref(id)?;

        let outcome = match command {
            VoiceCommand::Next => CommandOutcome::Step(self.next_step(id)?),
            VoiceCommand::Previous => CommandOutcome::Step(self.previous_step(id)?),
            VoiceCommand::StartTimer => CommandOutcome::Timer(self.start_current_timer(id)?),
            VoiceCommand::PauseTimer => CommandOutcome::Timer(self.pause_current_timer(id)?),
            VoiceCommand::ResumeTimer => CommandOutcome::Timer(self.resume_current_timer(id)?),
            VoiceCommand::Repeat => {
                self.announce_current_step(id)?;
                CommandOutcome::Announced
            }
            VoiceCommand::Complete => CommandOutcome::Completion(self.mark_step_complete(id)?),
            VoiceCommand::QueryRemaining => CommandOutcome::Remaining(self.query_remaining(id)?),
            VoiceCommand::Help | VoiceCommand::Unrecognized(_) => {
                self.dispatch_sessionless(&command)?
            }
        };
        Ok(outcome)
    }

    fn dispatch_sessionless(&mut self, command: &VoiceCommand) -> Result<CommandOutcome, EngineError> {
        match command {
            VoiceCommand::Unrecognized(raw) => {
                tracing::debug!("Command not understood: {:?}", raw);
                let phrases = Arc::clone(&self.phrases);
                self.say(&phrases.not_understood);
                Ok(CommandOutcome::NotUnderstood)
            }
            _ => {
                self.help();
                Ok(CommandOutcome::Help)
            }
        }
    }

    /// Route a recognised transcript
    ///
    /// While hands-free mode is active, transcripts go to its bound session;
    /// otherwise to the active session.
    pub fn handle_transcript(&mut self, transcript: &str) -> Result<CommandOutcome, EngineError> {
        let command = self.interpret(transcript);
        tracing::info!("Transcript {:?} -> {}", transcript, command.name());

        let target = match self.hands_free.state() {
            HandsFreeState::Active => self.hands_free.bound_session().or(self.active),
            _ => self.active,
        };
        match target {
            Some(id) => self.dispatch_to(id, command),
            None => self.dispatch(command),
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Start a countdown on step `step` of session `id`
    pub fn start_timer(
        &mut self,
        id: SessionId,
        step: usize,
        seconds: u32,
    ) -> Result<StartOutcome, EngineError> {
        if step >= self.session_ref(id)?.total_steps() {
            return Err(EngineError::StepOutOfRange { session: id, step });
        }
        Ok(self.scheduler.start_timer(TimerKey::step(id, step), seconds)?)
    }

    /// Flip a timer between running and paused; returns whether it runs
    pub fn toggle_timer(&mut self, key: &TimerKey) -> Result<bool, EngineError> {
        Ok(self.scheduler.toggle(key)?)
    }

    pub fn reset_timer(&mut self, key: &TimerKey) -> Result<(), EngineError> {
        Ok(self.scheduler.reset(key)?)
    }

    pub fn delete_timer(&mut self, key: &TimerKey) -> Result<TimerSnapshot, EngineError> {
        Ok(self.scheduler.delete(key)?)
    }

    /// Create and start a timer not bound to any session
    pub fn create_global_timer(
        &mut self,
        name: &str,
        category: &str,
        seconds: u32,
    ) -> Result<TimerId, EngineError> {
        Ok(self.scheduler.create_global_timer(name, category, seconds)?)
    }

    pub fn pause_all(&mut self) {
        self.scheduler.pause_all();
        tracing::info!("All timers paused");
    }

    pub fn resume_all(&mut self) {
        self.scheduler.resume_all();
        tracing::info!("All unfinished timers resumed");
    }

    pub fn timer(&self, key: &TimerKey) -> Option<TimerSnapshot> {
        self.scheduler.get(key)
    }

    /// Timers with time left, shortest first
    pub fn active_timers(&self) -> Vec<TimerSnapshot> {
        self.scheduler.active_timers()
    }

    pub fn timers_for_session(&self, id: SessionId) -> Vec<TimerSnapshot> {
        self.scheduler.timers_for_session(id)
    }

    pub fn set_start_policy(&mut self, policy: StartPolicy) {
        self.scheduler.set_policy(policy);
    }

    // =========================================================================
    // Hands-free mode
    // =========================================================================

    /// Turn hands-free mode on for the active session
    ///
    /// The current step is announced after the settle delay.
    pub fn activate_hands_free(&mut self) -> Result<ActivationReport, EngineError> {
        let id = self.active.ok_or(EngineError::NoActiveSession)?;
        let title = self.session_ref(id)?.recipe().title.clone();

        let report = self.hands_free.activate(id, &mut self.recognition)?;
        if report.recognition_degraded {
            self.events.emit(EngineEvent::CapabilityDegraded {
                capability: Capability::SpeechRecognition,
            });
        }
        if let Some(result) = &report.transition {
            self.emit_hands_free(result);
        }

        let phrases = Arc::clone(&self.phrases);
        let text = PhraseTable::render(&phrases.hands_free_activated, &[("recipe", &title)]);
        self.say(&text);
        Ok(report)
    }

    /// Turn hands-free mode off; `None` if it was not on
    pub fn deactivate_hands_free(&mut self) -> Option<TransitionResult> {
        let result = self.hands_free.deactivate(&mut self.recognition)?;
        self.emit_hands_free(&result);

        let phrases = Arc::clone(&self.phrases);
        self.say(&phrases.hands_free_deactivated);
        Some(result)
    }

    pub fn hands_free_status(&self) -> HandsFreeStatus {
        self.hands_free.status(&self.recognition)
    }

    /// Start or stop manual listening; returns whether it is now on
    ///
    /// Fails with a busy error while hands-free mode holds recognition.
    pub fn toggle_manual_listening(&mut self) -> Result<bool, EngineError> {
        if self.recognition.release(ListeningMode::Manual) {
            return Ok(false);
        }

        match self.recognition.acquire(ListeningMode::Manual) {
            Ok(_) => Ok(true),
            Err(RecognitionError::Unavailable) => {
                if self.recognition.take_degradation_report() {
                    self.events.emit(EngineEvent::CapabilityDegraded {
                        capability: Capability::SpeechRecognition,
                    });
                }
                Err(RecognitionError::Unavailable.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The recogniser stopped without being asked to
    pub fn handle_recognition_ended(&mut self) {
        if self.recognition.release(ListeningMode::Manual) {
            tracing::debug!("Manual listening ended");
            return;
        }

        match self.hands_free.on_recognition_ended(&mut self.recognition) {
            RecognitionEnd::Suspended(result) => self.report_suspension(&result),
            RecognitionEnd::Restarted | RecognitionEnd::Ignored => {}
        }
    }

    /// The recogniser reported an error
    pub fn handle_recognition_fault(&mut self, fault: RecognitionFault) {
        if fault.is_hard() && self.recognition.release(ListeningMode::Manual) {
            tracing::warn!("Manual listening stopped: {}", fault);
            return;
        }

        if let Some(result) = self
            .hands_free
            .on_recognition_fault(&fault, &mut self.recognition)
        {
            self.report_suspension(&result);
        }
    }

    fn report_suspension(&mut self, result: &TransitionResult) {
        self.emit_hands_free(result);
        let phrases = Arc::clone(&self.phrases);
        self.say(&phrases.listening_lost);
        self.raise_alert(&phrases.listening_lost);
    }

    fn emit_hands_free(&self, result: &TransitionResult) {
        self.events.emit(EngineEvent::HandsFreeChanged {
            previous: result.previous_state,
            state: result.new_state,
            reason: result.reason.clone(),
        });
    }

    // =========================================================================
    // Speech and alerts
    // =========================================================================

    /// The synthesizer finished utterance `id`
    pub fn handle_utterance_finished(&mut self, id: u64) -> bool {
        self.arbiter.finished(id)
    }

    /// Id and text of the utterance being spoken
    pub fn current_utterance(&self) -> Option<(u64, &str)> {
        self.arbiter.active()
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        self.arbiter.set_enabled(enabled);
    }

    pub fn set_voice_preference(&mut self, preference: VoicePreference) {
        self.arbiter.set_preference(preference);
    }

    pub fn visible_alerts(&self) -> Vec<Alert> {
        self.alerts.visible(Utc::now())
    }

    pub fn dismiss_alert(&mut self, id: uuid::Uuid) -> bool {
        self.alerts.dismiss(id)
    }

    fn say(&mut self, text: &str) -> SpeechDispatch {
        let dispatch = self.arbiter.speak(text);
        if dispatch == SpeechDispatch::Degraded {
            self.events.emit(EngineEvent::CapabilityDegraded {
                capability: Capability::SpeechSynthesis,
            });
        }
        dispatch
    }

    fn raise_alert(&mut self, message: &str) {
        let alert = self.alerts.push(message, Utc::now());
        self.events.emit(EngineEvent::Alert(alert));
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance every running timer by one second
    ///
    /// Timers reaching zero are reported together and spoken as a single
    /// utterance, followed by a pending hands-free step announcement.
    /// Expired alerts are dropped. Returns the keys of finished timers.
    pub fn tick(&mut self) -> Vec<TimerKey> {
        let finished = self.scheduler.tick();
        let phrases = Arc::clone(&self.phrases);

        let mut spoken = Vec::with_capacity(finished.len());
        for key in &finished {
            let label = self.scheduler.get(key).and_then(|t| t.label);
            let label_text = match (&label, key) {
                (Some(label), _) => label.name.clone(),
                (None, TimerKey::Step { session, step }) => {
                    let recipe = self
                        .session(*session)
                        .map(|s| s.recipe().title.clone())
                        .unwrap_or_default();
                    PhraseTable::render(
                        &phrases.step_timer_label,
                        &[("number", &(step + 1).to_string()), ("recipe", &recipe)],
                    )
                }
                (None, TimerKey::Global { id }) => id.to_string(),
            };

            self.events.emit(EngineEvent::TimerFinished { key: *key, label });
            let message = PhraseTable::render(&phrases.timer_finished, &[("label", &label_text)]);
            self.raise_alert(&message);
            spoken.push(message);
        }

        // The settle announcement shares the utterance so it cannot cut off
        // a completion message
        if self.hands_free.on_tick() {
            if let Some(id) = self.hands_free.bound_session() {
                match self.session_ref(id) {
                    Ok(session) => spoken.push(announcement(&phrases, session)),
                    Err(e) => tracing::warn!("Failed to announce step for hands-free mode: {}", e),
                }
            }
        }
        if !spoken.is_empty() {
            self.say(&spoken.join(" "));
        }

        let expired = self.alerts.prune(Utc::now());
        if expired > 0 {
            tracing::trace!("{} alert(s) expired", expired);
        }

        finished
    }
}

impl Drop for CookingEngine {
    fn drop(&mut self) {
        if self.hands_free.deactivate(&mut self.recognition).is_some() {
            tracing::info!("Hands-free mode stopped on shutdown");
        }
        self.recognition.release(ListeningMode::Manual);
        self.arbiter.cancel();
    }
}

/// Full read-out of a session's current step
fn announcement(phrases: &PhraseTable, session: &CookingSession) -> String {
    let step = session.current_step();
    let mut text = PhraseTable::render(
        &phrases.step_announcement,
        &[
            ("number", &(session.current_index() + 1).to_string()),
            ("total", &session.total_steps().to_string()),
            ("instruction", &step.instruction),
        ],
    );
    if let Some(duration) = &step.duration {
        text.push(' ');
        text.push_str(&PhraseTable::render(
            &phrases.step_duration,
            &[("duration", duration)],
        ));
    }
    text
}
