//! Console driver: cook a recipe from a JSON file, typing what you would say.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use cookalong::duration::format_clock;
use cookalong::handsfree::HandsFreeState;
use cookalong::recognition::{RecognitionError, SpeechRecognizer};
use cookalong::speech::{SpeechError, SpeechSynthesizer, Utterance, VoiceInfo};
use cookalong::ticker::{self, SharedEngine};
use cookalong::{config, logging};
use cookalong::{Capabilities, CookingEngine, EngineEvent, PhraseTable, Recipe};

/// Prints utterances instead of speaking them
struct ConsoleSynthesizer {
    language: String,
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        vec![VoiceInfo {
            name: "console".to_string(),
            language: self.language.clone(),
        }]
    }

    fn speak(&self, utterance: Utterance, _cancel: CancellationToken) -> Result<(), SpeechError> {
        println!("» {}", utterance.text);
        Ok(())
    }
}

/// Standard input stands in for the microphone
struct ConsoleRecognizer;

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&self) -> Result<(), RecognitionError> {
        tracing::debug!("Console listening on stdin");
        Ok(())
    }

    fn stop(&self) {}
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::TimerFinished { key, .. } => println!("⏰ timer finished ({})", key),
        EngineEvent::SessionCompleted { minutes, .. } => {
            println!("✔ recipe completed in {} min", minutes)
        }
        EngineEvent::Alert(alert) => println!("! {}", alert.message),
        EngineEvent::CapabilityDegraded { capability } => {
            println!("(running without {:?})", capability)
        }
        EngineEvent::HandsFreeChanged { state, .. } => {
            println!("[hands-free: {}]", state.description())
        }
        _ => tracing::debug!("Event: {:?}", event),
    }
}

fn print_timers(engine: &SharedEngine) {
    let timers = engine.lock().active_timers();
    if timers.is_empty() {
        println!("No timers running");
    }
    for timer in timers {
        println!(
            "{} {} ({})",
            format_clock(timer.remaining_seconds),
            if timer.running { "running" } else { "paused" },
            timer.key
        );
    }
}

fn toggle_hands_free(engine: &SharedEngine) -> anyhow::Result<()> {
    let mut engine = engine.lock();
    if engine.hands_free_status().state == HandsFreeState::Active {
        engine.deactivate_hands_free();
    } else {
        engine.activate_hands_free()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging(Some(&logging::default_log_dir()));

    let path = std::env::args()
        .nth(1)
        .context("usage: cookalong <recipe.json>")?;
    let contents =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let recipe: Recipe =
        serde_json::from_str(&contents).with_context(|| format!("Invalid recipe in {}", path))?;

    let config = config::get_config();
    let phrases = PhraseTable::for_language(&config.speech.language);
    let capabilities = Capabilities::none()
        .with_synthesizer(Arc::new(ConsoleSynthesizer {
            language: phrases.language.clone(),
        }))
        .with_recognizer(Arc::new(ConsoleRecognizer));

    let (engine, events) = CookingEngine::new(&config, phrases, capabilities);
    let engine = ticker::shared(engine);
    let session = engine.lock().open_session(recipe)?;
    engine.lock().announce_current_step(session)?;

    let printer = std::thread::spawn(move || {
        for event in events.iter() {
            print_event(&event);
        }
    });

    let cancel = CancellationToken::new();
    let ticker = ticker::spawn_ticker(
        engine.clone(),
        Duration::from_millis(config.timers.tick_interval_ms),
        cancel.clone(),
    );

    println!("Type what you would say. :timers, :handsfree and :quit are also understood.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            ":quit" => break,
            ":timers" => print_timers(&engine),
            ":handsfree" => {
                if let Err(e) = toggle_hands_free(&engine) {
                    eprintln!("{:#}", e);
                }
            }
            transcript => {
                if let Err(e) = engine.lock().handle_transcript(transcript) {
                    eprintln!("{}", e);
                }
            }
        }
    }

    cancel.cancel();
    let ticks = ticker.await?;
    tracing::info!("Stopped after {} ticks", ticks);

    // Dropping the last engine handle closes the event stream
    drop(engine);
    printer
        .join()
        .map_err(|_| anyhow::anyhow!("Event printer thread panicked"))?;
    Ok(())
}
