//! Configuration management for Cookalong
//!
//! Provides persistent settings storage with schema versioning and migrations.
//! Configuration is stored in `~/.cookalong/config.json`.

use crate::alerts::DEFAULT_ALERT_SECONDS;
use crate::scheduler::StartPolicy;
use crate::speech::{VoicePreference, DEFAULT_SPEECH_RATE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Current config schema version
const CURRENT_VERSION: u32 = 2;

/// Global config instance for caching
static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config version: {0}")]
    UnknownVersion(u32),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    /// Spoken feedback settings
    pub speech: SpeechConfig,
    /// Countdown settings
    pub timers: TimerConfig,
    /// Hands-free mode settings
    pub hands_free: HandsFreeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            speech: SpeechConfig::default(),
            timers: TimerConfig::default(),
            hands_free: HandsFreeConfig::default(),
        }
    }
}

/// Spoken feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak confirmations at all
    pub enabled: bool,
    pub voice_preference: VoicePreference,
    /// BCP 47 tag; also selects the built-in phrase table
    pub language: String,
    /// Speaking rate (1.0 is the synthesizer default)
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice_preference: VoicePreference::default(),
            language: "fr-FR".to_string(),
            rate: DEFAULT_SPEECH_RATE,
        }
    }
}

/// Timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Period of the countdown tick in milliseconds
    pub tick_interval_ms: u64,
    /// What starting an existing step timer does
    pub start_policy: StartPolicy,
    /// How long alerts stay visible
    pub alert_display_seconds: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            start_policy: StartPolicy::default(),
            alert_display_seconds: DEFAULT_ALERT_SECONDS,
        }
    }
}

/// Hands-free mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsFreeConfig {
    /// Delay between the activation message and the step announcement
    pub settle_delay_seconds: u64,
    /// Restart recognition once when it ends on its own
    pub auto_restart: bool,
    /// Hold a screen wake lock while active
    pub keep_screen_awake: bool,
}

impl Default for HandsFreeConfig {
    fn default() -> Self {
        Self {
            settle_delay_seconds: 3,
            auto_restart: true,
            keep_screen_awake: true,
        }
    }
}

// =============================================================================
// Disk persistence
// =============================================================================

/// Get the path to the config file (~/.cookalong/config.json)
pub fn get_config_path() -> PathBuf {
    home_dir_or_fallback().join(".cookalong").join("config.json")
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Load configuration from `path`, running migrations
///
/// A missing file yields the defaults. A migrated config is written back.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_json::from_str(&contents)?;

    let original_version = config.version;
    let migrated = migrate_config(config)?;
    if migrated.version != original_version {
        save_to_path(path, &migrated)?;
    }

    Ok(migrated)
}

/// Save configuration to `path` as pretty JSON, creating parent directories
pub fn save_to_path(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
    }

    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(write_err)?;

    tracing::info!("Config saved to {}", path.display());
    Ok(())
}

/// Migrate configuration from older schema versions
pub fn migrate_config(mut config: Config) -> Result<Config, ConfigError> {
    let original_version = config.version;

    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }

    if config.version != original_version {
        tracing::info!(
            "Migrated config from version {} to {}",
            original_version,
            config.version
        );
    }

    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: Config) -> Result<Config, ConfigError> {
    match config.version {
        // Version 0 -> 1: initial schema
        0 => Ok(Config {
            version: 1,
            ..config
        }),
        // Version 1 -> 2: tick period below 100 ms was never meant to be honoured
        1 => {
            let mut migrated = config;
            migrated.version = 2;
            migrated.timers.tick_interval_ms = migrated.timers.tick_interval_ms.max(100);
            Ok(migrated)
        }
        v => Err(ConfigError::UnknownVersion(v)),
    }
}

// =============================================================================
// Cached global config
// =============================================================================

fn get_config_instance() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| {
        let config = load_from_path(&get_config_path()).unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {}", e);
            Config::default()
        });
        tracing::info!(
            "Config loaded: language={}, tick={}ms",
            config.speech.language,
            config.timers.tick_interval_ms
        );
        RwLock::new(config)
    })
}

/// Get the current configuration
///
/// The config is cached in memory and loaded from disk on first access.
pub fn get_config() -> Config {
    get_config_instance().read().clone()
}

/// Replace the configuration and persist it
pub fn set_config(mut config: Config) -> Result<(), ConfigError> {
    config.version = CURRENT_VERSION;
    save_to_path(&get_config_path(), &config)?;

    let mut cached = get_config_instance().write();
    *cached = config;
    tracing::info!("Configuration updated");
    Ok(())
}

/// Reset configuration to defaults and persist it
pub fn reset_config() -> Result<Config, ConfigError> {
    let default_config = Config::default();
    save_to_path(&get_config_path(), &default_config)?;

    let mut cached = get_config_instance().write();
    *cached = default_config.clone();
    tracing::info!("Configuration reset to defaults");
    Ok(default_config)
}
