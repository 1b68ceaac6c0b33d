//! Localised phrase tables
//!
//! Everything the engine says out loud, plus the command synonym lists, is
//! supplied through a [`PhraseTable`]. Templates use `{name}` placeholders
//! filled by [`PhraseTable::render`]. French and English tables are built in;
//! callers may deserialise their own.

use serde::{Deserialize, Serialize};

use crate::command::CommandKeywords;

/// Unit words used when speaking a duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationWords {
    pub hour: String,
    pub hours: String,
    pub minute: String,
    pub minutes: String,
    pub second: String,
    pub seconds: String,
    /// Joins the last two parts ("1 heure et 30 minutes")
    pub conjunction: String,
}

impl Default for DurationWords {
    fn default() -> Self {
        PhraseTable::french().duration_words
    }
}

/// Spoken confirmations and command synonyms for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseTable {
    /// Language tag, e.g. "fr-FR"
    pub language: String,
    pub keywords: CommandKeywords,
    pub duration_words: DurationWords,
    /// `{recipe}`
    pub hands_free_activated: String,
    pub hands_free_deactivated: String,
    /// `{number}`
    pub step_number: String,
    /// `{number}`, `{total}`, `{instruction}`
    pub step_announcement: String,
    /// `{duration}`
    pub step_duration: String,
    pub first_step: String,
    pub last_step: String,
    pub no_duration: String,
    pub no_timer: String,
    /// `{duration}`
    pub timer_started: String,
    pub timer_paused: String,
    pub timer_resumed: String,
    /// `{label}`
    pub timer_finished: String,
    /// `{number}`, `{recipe}`
    pub step_timer_label: String,
    /// `{duration}`
    pub time_remaining: String,
    /// `{recipe}`, `{minutes}`
    pub session_completed: String,
    pub not_understood: String,
    pub help: String,
    pub listening_lost: String,
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self::french()
    }
}

impl PhraseTable {
    /// Built-in French table
    pub fn french() -> Self {
        Self {
            language: "fr-FR".to_string(),
            keywords: CommandKeywords::french(),
            duration_words: DurationWords {
                hour: "heure".to_string(),
                hours: "heures".to_string(),
                minute: "minute".to_string(),
                minutes: "minutes".to_string(),
                second: "seconde".to_string(),
                seconds: "secondes".to_string(),
                conjunction: "et".to_string(),
            },
            hands_free_activated:
                "Mode mains libres activé pour {recipe}. Dites « aide » pour connaître les commandes."
                    .to_string(),
            hands_free_deactivated: "Mode mains libres désactivé.".to_string(),
            step_number: "Étape {number}".to_string(),
            step_announcement: "Étape {number} sur {total}. {instruction}".to_string(),
            step_duration: "Durée : {duration}.".to_string(),
            first_step: "Vous êtes déjà à la première étape.".to_string(),
            last_step: "Vous êtes déjà à la dernière étape.".to_string(),
            no_duration: "Aucune durée détectée pour cette étape.".to_string(),
            no_timer: "Aucun minuteur pour cette étape.".to_string(),
            timer_started: "Minuteur lancé pour {duration}.".to_string(),
            timer_paused: "Minuteur en pause.".to_string(),
            timer_resumed: "Minuteur relancé.".to_string(),
            timer_finished: "Minuteur terminé : {label}.".to_string(),
            step_timer_label: "étape {number} de {recipe}".to_string(),
            time_remaining: "Il reste {duration}.".to_string(),
            session_completed: "Bravo ! {recipe} est terminé en {minutes} minutes.".to_string(),
            not_understood: "Je n'ai pas compris. Dites « aide » pour connaître les commandes."
                .to_string(),
            help: "Vous pouvez dire : suivant, précédent, lance le minuteur, pause, reprends, \
                   répète, c'est fait, combien de temps, ou aide."
                .to_string(),
            listening_lost:
                "L'écoute s'est interrompue. Réactivez le mode mains libres pour continuer."
                    .to_string(),
        }
    }

    /// Built-in English table
    pub fn english() -> Self {
        Self {
            language: "en-US".to_string(),
            keywords: CommandKeywords::english(),
            duration_words: DurationWords {
                hour: "hour".to_string(),
                hours: "hours".to_string(),
                minute: "minute".to_string(),
                minutes: "minutes".to_string(),
                second: "second".to_string(),
                seconds: "seconds".to_string(),
                conjunction: "and".to_string(),
            },
            hands_free_activated: "Hands-free mode on for {recipe}. Say help to hear the commands."
                .to_string(),
            hands_free_deactivated: "Hands-free mode off.".to_string(),
            step_number: "Step {number}".to_string(),
            step_announcement: "Step {number} of {total}. {instruction}".to_string(),
            step_duration: "Duration: {duration}.".to_string(),
            first_step: "You are already on the first step.".to_string(),
            last_step: "You are already on the last step.".to_string(),
            no_duration: "No duration found for this step.".to_string(),
            no_timer: "There is no timer for this step.".to_string(),
            timer_started: "Timer set for {duration}.".to_string(),
            timer_paused: "Timer paused.".to_string(),
            timer_resumed: "Timer resumed.".to_string(),
            timer_finished: "Timer done: {label}.".to_string(),
            step_timer_label: "step {number} of {recipe}".to_string(),
            time_remaining: "{duration} left.".to_string(),
            session_completed: "Well done! {recipe} finished in {minutes} minutes.".to_string(),
            not_understood: "Sorry, I did not catch that. Say help to hear the commands."
                .to_string(),
            help: "You can say: next, previous, start the timer, pause, resume, repeat, done, \
                   how long, or help."
                .to_string(),
            listening_lost: "Listening stopped. Turn hands-free mode back on to continue."
                .to_string(),
        }
    }

    /// Pick a built-in table from a language tag ("fr", "en-GB", ...)
    ///
    /// Unknown languages fall back to French.
    pub fn for_language(language: &str) -> Self {
        let primary = language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match primary.as_str() {
            "en" => Self::english(),
            _ => Self::french(),
        }
    }

    /// Fill `{name}` placeholders in a template
    pub fn render(template: &str, values: &[(&str, &str)]) -> String {
        values
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            })
    }

    /// Speak a number of seconds ("1 heure et 30 minutes", "45 secondes")
    pub fn spoken_duration(&self, seconds: u32) -> String {
        let words = &self.duration_words;
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let secs = seconds % 60;

        let unit = |n: u32, one: &str, many: &str| {
            format!("{} {}", n, if n == 1 { one } else { many })
        };

        let mut parts = Vec::new();
        if hours > 0 {
            parts.push(unit(hours, &words.hour, &words.hours));
        }
        if minutes > 0 {
            parts.push(unit(minutes, &words.minute, &words.minutes));
        }
        if secs > 0 || parts.is_empty() {
            parts.push(unit(secs, &words.second, &words.seconds));
        }

        match parts.len() {
            1 => parts.remove(0),
            _ => {
                let last = parts.pop().unwrap_or_default();
                format!("{} {} {}", parts.join(" "), words.conjunction, last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let text = PhraseTable::render(
            "Étape {number} sur {total}",
            &[("number", "2"), ("total", "5")],
        );
        assert_eq!(text, "Étape 2 sur 5");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(PhraseTable::render("{a} {b}", &[("a", "x")]), "x {b}");
    }

    #[test]
    fn test_spoken_duration_french() {
        let phrases = PhraseTable::french();
        assert_eq!(phrases.spoken_duration(45), "45 secondes");
        assert_eq!(phrases.spoken_duration(60), "1 minute");
        assert_eq!(phrases.spoken_duration(5400), "1 heure et 30 minutes");
        assert_eq!(
            phrases.spoken_duration(7325),
            "2 heures 2 minutes et 5 secondes"
        );
        assert_eq!(phrases.spoken_duration(0), "0 secondes");
    }

    #[test]
    fn test_spoken_duration_english() {
        assert_eq!(
            PhraseTable::english().spoken_duration(3601),
            "1 hour and 1 second"
        );
    }

    #[test]
    fn test_for_language() {
        assert_eq!(PhraseTable::for_language("en-GB").language, "en-US");
        assert_eq!(PhraseTable::for_language("fr_CA").language, "fr-FR");
        assert_eq!(PhraseTable::for_language("de").language, "fr-FR");
    }

    #[test]
    fn test_partial_table_deserialisation() {
        let json = r#"{"language": "fr-BE", "timer_paused": "Minuterie en pause."}"#;
        let table: PhraseTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.language, "fr-BE");
        assert_eq!(table.timer_paused, "Minuterie en pause.");
        assert_eq!(table.first_step, PhraseTable::french().first_step);
    }
}
