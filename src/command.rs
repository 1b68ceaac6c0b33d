//! Voice command interpretation
//!
//! Maps a recognised transcript to a discrete [`VoiceCommand`] by keyword
//! containment. Categories are checked in a fixed priority order and the
//! first category with a matching synonym wins, so disfluent speech such as
//! "euh donc on passe à la suivante" still resolves.

use serde::{Deserialize, Serialize};

/// A discrete command understood by cooking sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "raw", rename_all = "snake_case")]
pub enum VoiceCommand {
    Next,
    Previous,
    StartTimer,
    PauseTimer,
    ResumeTimer,
    Repeat,
    Complete,
    QueryRemaining,
    Help,
    /// Nothing matched; carries the raw transcript
    Unrecognized(String),
}

impl VoiceCommand {
    /// Short stable name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            VoiceCommand::Next => "next",
            VoiceCommand::Previous => "previous",
            VoiceCommand::StartTimer => "start_timer",
            VoiceCommand::PauseTimer => "pause_timer",
            VoiceCommand::ResumeTimer => "resume_timer",
            VoiceCommand::Repeat => "repeat",
            VoiceCommand::Complete => "complete",
            VoiceCommand::QueryRemaining => "query_remaining",
            VoiceCommand::Help => "help",
            VoiceCommand::Unrecognized(_) => "unrecognized",
        }
    }

    /// Whether this command changes session or timer state
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            VoiceCommand::Next
                | VoiceCommand::Previous
                | VoiceCommand::StartTimer
                | VoiceCommand::PauseTimer
                | VoiceCommand::ResumeTimer
                | VoiceCommand::Complete
        )
    }
}

/// Synonym lists per command category
///
/// Supplied by the caller as part of the phrase table. Entries are matched
/// as lower-case substrings of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandKeywords {
    pub next: Vec<String>,
    pub previous: Vec<String>,
    pub start_timer: Vec<String>,
    pub pause_timer: Vec<String>,
    pub resume_timer: Vec<String>,
    pub repeat: Vec<String>,
    pub complete: Vec<String>,
    pub query_remaining: Vec<String>,
    pub help: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl CommandKeywords {
    /// Built-in French synonyms
    pub fn french() -> Self {
        Self {
            next: words(&["suivant", "suivante", "prochaine étape", "étape d'après", "avance"]),
            previous: words(&["précédent", "précédente", "revenir", "reviens", "recule"]),
            start_timer: words(&[
                "lance",
                "lancer",
                "démarre",
                "démarrer",
                "mets un minuteur",
            ]),
            pause_timer: words(&["pause", "arrête", "arrêter", "stop"]),
            resume_timer: words(&["reprends", "reprendre", "reprise", "continue le minuteur"]),
            repeat: words(&["répète", "répéter", "repete", "redis", "encore une fois"]),
            complete: words(&["terminé", "termine", "c'est fait", "fini", "j'ai fini"]),
            query_remaining: words(&[
                "combien de temps",
                "temps restant",
                "il reste",
                "reste combien",
            ]),
            help: words(&["aide", "quelles commandes", "que puis-je dire"]),
        }
    }

    /// Built-in English synonyms
    pub fn english() -> Self {
        Self {
            next: words(&["next", "go on", "forward"]),
            previous: words(&["previous", "go back", "back up", "last step"]),
            start_timer: words(&["start timer", "start the timer", "set a timer", "set timer"]),
            pause_timer: words(&["pause", "stop", "hold"]),
            resume_timer: words(&["resume", "continue", "unpause"]),
            repeat: words(&["repeat", "again", "say that"]),
            complete: words(&["done", "complete", "finished"]),
            query_remaining: words(&["how long", "time left", "remaining"]),
            help: words(&["help", "what can i say", "commands"]),
        }
    }

    /// Categories in the order they are checked
    fn ordered(&self) -> [(VoiceCommand, &[String]); 9] {
        [
            (VoiceCommand::Next, &self.next),
            (VoiceCommand::Previous, &self.previous),
            (VoiceCommand::StartTimer, &self.start_timer),
            (VoiceCommand::PauseTimer, &self.pause_timer),
            (VoiceCommand::ResumeTimer, &self.resume_timer),
            (VoiceCommand::Repeat, &self.repeat),
            (VoiceCommand::Complete, &self.complete),
            (VoiceCommand::QueryRemaining, &self.query_remaining),
            (VoiceCommand::Help, &self.help),
        ]
    }
}

impl Default for CommandKeywords {
    fn default() -> Self {
        Self::french()
    }
}

/// Keyword-priority interpreter
#[derive(Debug, Clone, Default)]
pub struct CommandInterpreter {
    keywords: CommandKeywords,
}

impl CommandInterpreter {
    /// Create an interpreter over the given synonym lists
    ///
    /// Synonyms are lower-cased and blank entries dropped so that a
    /// misconfigured empty string cannot match every transcript.
    pub fn new(keywords: CommandKeywords) -> Self {
        let clean = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            keywords: CommandKeywords {
                next: clean(keywords.next),
                previous: clean(keywords.previous),
                start_timer: clean(keywords.start_timer),
                pause_timer: clean(keywords.pause_timer),
                resume_timer: clean(keywords.resume_timer),
                repeat: clean(keywords.repeat),
                complete: clean(keywords.complete),
                query_remaining: clean(keywords.query_remaining),
                help: clean(keywords.help),
            },
        }
    }

    pub fn keywords(&self) -> &CommandKeywords {
        &self.keywords
    }

    /// Map a transcript to a command
    pub fn interpret(&self, transcript: &str) -> VoiceCommand {
        let normalised = transcript.trim().to_lowercase();
        if normalised.is_empty() {
            return VoiceCommand::Unrecognized(transcript.to_string());
        }

        for (command, synonyms) in self.keywords.ordered() {
            if synonyms.iter().any(|s| normalised.contains(s.as_str())) {
                tracing::debug!("Interpreted {:?} as {}", normalised, command.name());
                return command;
            }
        }

        tracing::debug!("No command matched {:?}", normalised);
        VoiceCommand::Unrecognized(transcript.to_string())
    }
}
